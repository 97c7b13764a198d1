use excuse_portal::api::SettingsData;
use excuse_portal::domain::{AttachmentSlot, ExcuseDetails, ExcuseRequest, Signature, StudentProfile};
use excuse_portal::lookup::LookupTables;
use excuse_portal::workflows::review::{
    CommitteePanel, DecisionView, EmployeePanel, Page, SavedDecision,
};
use excuse_portal::workflows::wizard::{FieldId, ValidationReport};

pub(crate) fn print_profile(profile: &StudentProfile) {
    println!("{} ({})", profile.name, profile.id);
    println!("- major: {} | level: {}", profile.major, profile.level);
    println!(
        "- terms accepted: {}",
        if profile.terms_agreed { "yes" } else { "no" }
    );
}

fn submitted(excuse: &ExcuseRequest) -> String {
    excuse
        .date
        .map(|stamp| stamp.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

pub(crate) fn print_excuse_page(page: &Page<'_, ExcuseRequest>) {
    if page.total_items == 0 {
        println!("No requests found.");
        return;
    }

    println!(
        "Page {} of {} ({} requests)",
        page.page, page.total_pages, page.total_items
    );
    for excuse in page.items {
        println!(
            "  #{:<6} {:<16} {:<10} {:<22} {:<14} {}",
            excuse.id,
            submitted(excuse),
            excuse.student_id,
            excuse.student_name,
            excuse.type_title(),
            excuse.status.title()
        );
    }
}

pub(crate) fn print_excuse_detail(excuse: &ExcuseRequest, lookups: &LookupTables) {
    println!("Excuse #{} submitted {}", excuse.id, submitted(excuse));
    println!(
        "- student: {} ({}) | {} level {}",
        excuse.student_name, excuse.student_id, excuse.student_major, excuse.student_level
    );
    let excuse_date = excuse
        .excuse_date
        .map(|date| date.to_string())
        .unwrap_or_else(|| "-".to_string());
    println!(
        "- {} on {} for {} day(s)",
        excuse.type_title(),
        excuse_date,
        excuse.num_days
    );

    match excuse.details() {
        Some(ExcuseDetails::Health { hospital, location }) => println!(
            "- hospital: {} ({})",
            lookups.hospital_name(&hospital),
            location.map(|l| l.title()).unwrap_or("-")
        ),
        Some(ExcuseDetails::Death { relationship }) => println!(
            "- relationship: {}",
            relationship.map(|r| r.title()).unwrap_or("-")
        ),
        None => {}
    }
    if !excuse.reason.trim().is_empty() {
        println!("- reason: {}", excuse.reason.trim());
    }

    println!("Affected courses:");
    for row in &excuse.affected_courses {
        println!(
            "  - {}: {}",
            lookups.course_name(&row.course),
            lookups.reason_name(&row.reason)
        );
    }

    println!("Documents:");
    for slot in AttachmentSlot::ALL {
        println!(
            "  - {}: {}",
            slot.title(),
            excuse.attachment_link(*slot).unwrap_or("-")
        );
    }
}

pub(crate) fn print_saved_decision(saved: &SavedDecision) {
    println!("Decision saved.");
    if !saved.refreshed {
        println!("The list could not be refreshed; showing the saved decision.");
    }
    print_decision_view(&saved.view);
}

pub(crate) fn print_decision_view(view: &DecisionView) {
    println!("Review phase: {}", view.phase);
    match &view.employee {
        EmployeePanel::Editable { choices } => {
            let labels: Vec<_> = choices.iter().map(|c| c.label()).collect();
            println!("- employee decision: open ({})", labels.join(" | "));
        }
        EmployeePanel::Locked(decision) => println!("- employee decision: {}", decision.title()),
    }

    match &view.committee {
        CommitteePanel::Hidden => {}
        CommitteePanel::Editable {
            choices,
            max_signatures,
        } => {
            let labels: Vec<_> = choices.iter().map(|c| c.label()).collect();
            println!(
                "- committee decision: open ({}), up to {} signature(s)",
                labels.join(" | "),
                max_signatures
            );
        }
        CommitteePanel::Locked {
            decision,
            comment,
            signatures,
        } => {
            println!("- committee decision: {}", decision.title());
            if !comment.is_empty() {
                println!("- committee comment: {comment}");
            }
            for badge in signatures {
                if badge.position.is_empty() {
                    println!("  * {}", badge.name);
                } else {
                    println!("  * {} ({})", badge.name, badge.position);
                }
            }
        }
    }
}

fn field_name(field: FieldId) -> String {
    match field {
        FieldId::ExcuseType => "excuse type".to_string(),
        FieldId::Hospital => "hospital".to_string(),
        FieldId::Location => "hospital location".to_string(),
        FieldId::Relationship => "relationship".to_string(),
        FieldId::ExcuseDate => "excuse date".to_string(),
        FieldId::NumDays => "number of days".to_string(),
        FieldId::CourseCell { row, cell } => format!("course row {} {:?}", row + 1, cell).to_lowercase(),
        FieldId::Attachment(slot) => slot.title().to_string(),
    }
}

pub(crate) fn print_validation_report(report: &ValidationReport) {
    eprintln!("Step {} ({}) is incomplete:", report.step.number(), report.step.label());
    for mark in &report.marks {
        let focus = if report.focus == Some(mark.field) { " <" } else { "" };
        eprintln!("  - {}: {}{focus}", field_name(mark.field), mark.issue.message());
    }
}

pub(crate) fn print_signatures(signatures: &[Signature]) {
    if signatures.is_empty() {
        println!("No signatures configured.");
        return;
    }
    for signature in signatures {
        println!(
            "  [{}] {} - {}",
            signature.id, signature.name, signature.position
        );
    }
}

pub(crate) fn print_settings(data: &SettingsData) {
    for (title, entries) in [
        ("Hospitals", &data.hospitals),
        ("Courses", &data.courses),
        ("Reasons", &data.reasons),
    ] {
        println!("{title}:");
        for entry in entries {
            println!("  [{}] {}", entry.id, entry.name);
        }
    }
    println!("Terms:\n{}", data.terms);
}
