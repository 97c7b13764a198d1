use std::cmp::Reverse;

use chrono::NaiveDate;

use crate::domain::{ExcuseRequest, ExcuseStatus, ExcuseType};

/// Admin list filters; `None` fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExcuseFilter {
    pub status: Option<ExcuseStatus>,
    pub excuse_type: Option<ExcuseType>,
    /// Inclusive bounds on the submission date.
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    /// Case-insensitive match on student name, student id, or excuse id.
    pub search: Option<String>,
}

impl ExcuseFilter {
    pub fn matches(&self, excuse: &ExcuseRequest) -> bool {
        if self.status.is_some_and(|status| status != excuse.status) {
            return false;
        }
        if self
            .excuse_type
            .is_some_and(|excuse_type| excuse.excuse_type != Some(excuse_type))
        {
            return false;
        }

        if self.from.is_some() || self.to.is_some() {
            let Some(submitted) = excuse.date.map(|stamp| stamp.date()) else {
                return false;
            };
            if self.from.is_some_and(|from| submitted < from) {
                return false;
            }
            if self.to.is_some_and(|to| submitted > to) {
                return false;
            }
        }

        match self.search.as_deref().map(str::trim) {
            Some(needle) if !needle.is_empty() => {
                let needle = needle.to_lowercase();
                [&excuse.student_name, &excuse.student_id, &excuse.id.0]
                    .iter()
                    .any(|haystack| haystack.to_lowercase().contains(&needle))
            }
            _ => true,
        }
    }

    pub fn apply<'a>(&self, excuses: &'a [ExcuseRequest]) -> Vec<&'a ExcuseRequest> {
        excuses.iter().filter(|excuse| self.matches(excuse)).collect()
    }
}

/// Newest submission first; records without a timestamp go last.
pub fn sort_newest_first(excuses: &mut [ExcuseRequest]) {
    excuses.sort_by_key(|excuse| (excuse.date.is_none(), Reverse(excuse.date)));
}

/// One page of a list. `page` is 1-based and already clamped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<'a, T> {
    pub items: &'a [T],
    pub page: usize,
    pub total_pages: usize,
    pub total_items: usize,
}

/// Slice `items` into pages of `per_page`, clamping `page` into range.
pub fn paginate<T>(items: &[T], page: usize, per_page: usize) -> Page<'_, T> {
    let per_page = per_page.max(1);
    let total_items = items.len();
    let total_pages = total_items.div_ceil(per_page).max(1);
    let page = page.clamp(1, total_pages);

    let start = (page - 1) * per_page;
    let end = (start + per_page).min(total_items);

    Page {
        items: &items[start.min(total_items)..end],
        page,
        total_pages,
        total_items,
    }
}
