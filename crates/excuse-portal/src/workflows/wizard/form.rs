use chrono::NaiveDate;

use crate::domain::{AffectedCourse, ExcuseType, HospitalLocation, Relationship, StudentProfile};

/// Snapshot of the submitter shown read-only on the first step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StudentIdentity {
    pub id: String,
    pub name: String,
    pub major: String,
    pub level: String,
}

impl From<&StudentProfile> for StudentIdentity {
    fn from(profile: &StudentProfile) -> Self {
        Self {
            id: profile.id.clone(),
            name: profile.name.clone(),
            major: profile.major.clone(),
            level: profile.level.clone(),
        }
    }
}

/// One row of the affected-courses table. Values are lookup ids; an empty
/// string means nothing was chosen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CourseRow {
    pub course: String,
    pub reason: String,
}

impl CourseRow {
    pub fn new(course: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            course: course.into(),
            reason: reason.into(),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.course.trim().is_empty() && self.reason.trim().is_empty()
    }

    pub fn is_complete(&self) -> bool {
        !self.course.trim().is_empty() && !self.reason.trim().is_empty()
    }
}

/// Field values collected across steps two and three.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WizardForm {
    excuse_type: Option<ExcuseType>,
    pub hospital: String,
    pub location: Option<HospitalLocation>,
    pub relationship: Option<Relationship>,
    pub excuse_date: Option<NaiveDate>,
    pub num_days: String,
    pub reason: String,
    pub courses: Vec<CourseRow>,
}

impl Default for WizardForm {
    fn default() -> Self {
        Self {
            excuse_type: None,
            hospital: String::new(),
            location: None,
            relationship: None,
            excuse_date: None,
            num_days: String::new(),
            reason: String::new(),
            courses: vec![CourseRow::default()],
        }
    }
}

impl WizardForm {
    pub fn excuse_type(&self) -> Option<ExcuseType> {
        self.excuse_type
    }

    /// Changing the type clears the fields of the branch that no longer
    /// applies.
    pub fn set_excuse_type(&mut self, excuse_type: Option<ExcuseType>) {
        if self.excuse_type == excuse_type {
            return;
        }
        self.excuse_type = excuse_type;

        match excuse_type {
            Some(ExcuseType::Health) => self.relationship = None,
            Some(ExcuseType::Death) => self.clear_health_fields(),
            None => {
                self.clear_health_fields();
                self.relationship = None;
            }
        }
    }

    fn clear_health_fields(&mut self) {
        self.hospital.clear();
        self.location = None;
    }

    pub fn add_course_row(&mut self) -> usize {
        self.courses.push(CourseRow::default());
        self.courses.len() - 1
    }

    pub fn remove_course_row(&mut self, index: usize) -> Option<CourseRow> {
        (index < self.courses.len()).then(|| self.courses.remove(index))
    }

    /// Fully populated rows in table order; blank rows are dropped.
    pub fn affected_courses(&self) -> Vec<AffectedCourse> {
        self.courses
            .iter()
            .filter(|row| row.is_complete())
            .map(|row| AffectedCourse {
                course: row.course.trim().to_string(),
                reason: row.reason.trim().to_string(),
            })
            .collect()
    }
}
