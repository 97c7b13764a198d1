use std::fmt;

use super::attachments::{is_allowed_mime, AttachmentSlots, SlotState, MAX_ATTACHMENT_BYTES};
use super::form::WizardForm;
use crate::domain::{AttachmentSlot, ExcuseType};

/// Position in the four-step wizard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum WizardStep {
    Identity,
    Classification,
    Schedule,
    Attachments,
}

impl WizardStep {
    pub const FIRST: WizardStep = WizardStep::Identity;
    pub const LAST: WizardStep = WizardStep::Attachments;
    pub const TOTAL: u8 = 4;

    pub const fn number(self) -> u8 {
        match self {
            WizardStep::Identity => 1,
            WizardStep::Classification => 2,
            WizardStep::Schedule => 3,
            WizardStep::Attachments => 4,
        }
    }

    pub fn from_number(number: u8) -> Option<Self> {
        match number {
            1 => Some(WizardStep::Identity),
            2 => Some(WizardStep::Classification),
            3 => Some(WizardStep::Schedule),
            4 => Some(WizardStep::Attachments),
            _ => None,
        }
    }

    pub fn next(self) -> Option<Self> {
        Self::from_number(self.number() + 1)
    }

    pub const fn label(self) -> &'static str {
        match self {
            WizardStep::Identity => "identity",
            WizardStep::Classification => "classification",
            WizardStep::Schedule => "schedule",
            WizardStep::Attachments => "attachments",
        }
    }
}

impl fmt::Display for WizardStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "step {} ({})", self.number(), self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CourseCell {
    Course,
    Reason,
}

/// Inputs that can carry an invalid marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldId {
    ExcuseType,
    Hospital,
    Location,
    Relationship,
    ExcuseDate,
    NumDays,
    CourseCell { row: usize, cell: CourseCell },
    Attachment(AttachmentSlot),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldIssue {
    Required,
    FileRequired,
    FileTooLarge,
    UnsupportedFormat,
    StillProcessing,
    ReadFailed,
}

impl FieldIssue {
    pub const fn message(self) -> &'static str {
        match self {
            FieldIssue::Required => "This field is required.",
            FieldIssue::FileRequired => "Please upload the file.",
            FieldIssue::FileTooLarge => "The file is too large (maximum 10MB).",
            FieldIssue::UnsupportedFormat => "Unsupported file format (PNG, JPG, PDF only).",
            FieldIssue::StillProcessing => "The file is still being processed.",
            FieldIssue::ReadFailed => "The file could not be processed. Please select it again.",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldMark {
    pub field: FieldId,
    pub issue: FieldIssue,
}

/// Outcome of checking one step: every invalid field is marked, and at most
/// one receives focus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    pub step: WizardStep,
    pub marks: Vec<FieldMark>,
    pub focus: Option<FieldId>,
}

impl ValidationReport {
    fn new(step: WizardStep) -> Self {
        Self {
            step,
            marks: Vec::new(),
            focus: None,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.marks.is_empty()
    }

    pub fn is_marked(&self, field: FieldId) -> bool {
        self.issue_for(field).is_some()
    }

    pub fn issue_for(&self, field: FieldId) -> Option<FieldIssue> {
        self.marks
            .iter()
            .find(|mark| mark.field == field)
            .map(|mark| mark.issue)
    }

    /// Marks the field; the first marked field in traversal order takes focus.
    fn mark(&mut self, field: FieldId, issue: FieldIssue) {
        if self.marks.is_empty() {
            self.focus = Some(field);
        }
        self.marks.push(FieldMark { field, issue });
    }

    /// Upload controls show a red border and text but never take focus.
    fn mark_without_focus(&mut self, field: FieldId, issue: FieldIssue) {
        self.marks.push(FieldMark { field, issue });
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "{} is complete", self.step)
        } else {
            write!(f, "{} has {} invalid field(s)", self.step, self.marks.len())
        }
    }
}

/// Per-step completeness rules. Pure: it reads the form and slots and never
/// mutates them.
#[derive(Debug, Clone, Copy, Default)]
pub struct StepValidator;

impl StepValidator {
    pub fn validate(
        &self,
        step: WizardStep,
        form: &WizardForm,
        attachments: &AttachmentSlots,
    ) -> ValidationReport {
        let mut report = ValidationReport::new(step);
        match step {
            WizardStep::Identity => {}
            WizardStep::Classification => check_classification(form, &mut report),
            WizardStep::Schedule => check_schedule(form, &mut report),
            WizardStep::Attachments => check_attachments(attachments, &mut report),
        }
        report
    }
}

fn check_classification(form: &WizardForm, report: &mut ValidationReport) {
    match form.excuse_type() {
        None => report.mark(FieldId::ExcuseType, FieldIssue::Required),
        Some(ExcuseType::Health) => {
            if form.hospital.trim().is_empty() {
                report.mark(FieldId::Hospital, FieldIssue::Required);
            }
            if form.location.is_none() {
                report.mark(FieldId::Location, FieldIssue::Required);
            }
        }
        Some(ExcuseType::Death) => {
            if form.relationship.is_none() {
                report.mark(FieldId::Relationship, FieldIssue::Required);
            }
        }
    }
}

fn check_schedule(form: &WizardForm, report: &mut ValidationReport) {
    if form.excuse_date.is_none() {
        report.mark(FieldId::ExcuseDate, FieldIssue::Required);
    }
    if form.num_days.trim().is_empty() {
        report.mark(FieldId::NumDays, FieldIssue::Required);
    }

    // Partial rows mark only the missing cell.
    for (row, entry) in form.courses.iter().enumerate() {
        if entry.is_blank() || entry.is_complete() {
            continue;
        }
        if entry.course.trim().is_empty() {
            report.mark(
                FieldId::CourseCell {
                    row,
                    cell: CourseCell::Course,
                },
                FieldIssue::Required,
            );
        }
        if entry.reason.trim().is_empty() {
            report.mark(
                FieldId::CourseCell {
                    row,
                    cell: CourseCell::Reason,
                },
                FieldIssue::Required,
            );
        }
    }
}

fn check_attachments(attachments: &AttachmentSlots, report: &mut ValidationReport) {
    for slot in AttachmentSlot::ALL {
        if let Some(issue) = slot_issue(attachments.state(*slot)) {
            report.mark_without_focus(FieldId::Attachment(*slot), issue);
        }
    }
}

/// Existence, then size, then type, then read state.
fn slot_issue(state: &SlotState) -> Option<FieldIssue> {
    let file = match state.file() {
        Some(file) => file,
        None => return Some(FieldIssue::FileRequired),
    };

    if file.size > MAX_ATTACHMENT_BYTES {
        return Some(FieldIssue::FileTooLarge);
    }
    if !is_allowed_mime(&file.mime) {
        return Some(FieldIssue::UnsupportedFormat);
    }

    match state {
        SlotState::Ready { .. } => None,
        SlotState::Reading { .. } => Some(FieldIssue::StillProcessing),
        SlotState::Failed { .. } => Some(FieldIssue::ReadFailed),
        SlotState::Empty => Some(FieldIssue::FileRequired),
    }
}
