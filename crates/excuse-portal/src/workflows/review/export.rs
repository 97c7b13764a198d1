use std::io::Write;

use super::ReviewError;
use crate::domain::{ExcuseDetails, ExcuseRequest};
use crate::lookup::LookupTables;

pub const CSV_HEADERS: [&str; 14] = [
    "id",
    "submitted_at",
    "student_id",
    "student_name",
    "student_major",
    "student_level",
    "excuse_type",
    "excuse_date",
    "num_days",
    "details",
    "affected_courses",
    "status",
    "employee_decision",
    "committee_decision",
];

/// Write `excuses` as CSV with lookup ids resolved to names. Returns the
/// number of data rows written.
pub fn export_csv<W: Write>(
    writer: W,
    excuses: &[&ExcuseRequest],
    lookups: &LookupTables,
) -> Result<usize, ReviewError> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(CSV_HEADERS)?;

    for excuse in excuses {
        let submitted_at = excuse
            .date
            .map(|stamp| stamp.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default();
        let excuse_date = excuse
            .excuse_date
            .map(|date| date.to_string())
            .unwrap_or_default();

        csv.write_record([
            excuse.id.0.as_str(),
            submitted_at.as_str(),
            excuse.student_id.as_str(),
            excuse.student_name.as_str(),
            excuse.student_major.as_str(),
            excuse.student_level.as_str(),
            excuse.type_title(),
            excuse_date.as_str(),
            excuse.num_days.as_str(),
            details(excuse, lookups).as_str(),
            courses(excuse, lookups).as_str(),
            excuse.status.title(),
            excuse.employee_decision.title(),
            excuse.committee_decision.title(),
        ])?;
    }

    csv.flush().map_err(csv::Error::from)?;
    Ok(excuses.len())
}

fn details(excuse: &ExcuseRequest, lookups: &LookupTables) -> String {
    match excuse.details() {
        Some(ExcuseDetails::Health { hospital, location }) => {
            let location = location.map(|l| l.title()).unwrap_or("-");
            format!("{} / {}", lookups.hospital_name(&hospital), location)
        }
        Some(ExcuseDetails::Death { relationship }) => relationship
            .map(|r| r.title().to_string())
            .unwrap_or_else(|| "-".to_string()),
        None => "-".to_string(),
    }
}

fn courses(excuse: &ExcuseRequest, lookups: &LookupTables) -> String {
    excuse
        .affected_courses
        .iter()
        .map(|row| {
            format!(
                "{} ({})",
                lookups.course_name(&row.course),
                lookups.reason_name(&row.reason)
            )
        })
        .collect::<Vec<_>>()
        .join("; ")
}
