use std::sync::{Arc, Mutex};

use chrono::NaiveDate;

use crate::api::{PortalClient, ScriptedTransport};
use crate::domain::{AttachmentSlot, EncodedAttachment, ExcuseType, HospitalLocation};
use crate::workflows::wizard::attachments::lock_slots;
use crate::workflows::wizard::{
    AttachmentSlots, CourseRow, SelectedFile, StudentIdentity, WizardController, WizardForm,
};

pub(super) fn identity() -> StudentIdentity {
    StudentIdentity {
        id: "441200".to_string(),
        name: "Sara Alharbi".to_string(),
        major: "Nursing".to_string(),
        level: "3".to_string(),
    }
}

pub(super) fn scripted_client() -> (ScriptedTransport, PortalClient) {
    let transport = ScriptedTransport::new();
    let client = PortalClient::new(Arc::new(transport.clone()));
    (transport, client)
}

pub(super) fn pdf(name: &str, size: u64) -> SelectedFile {
    SelectedFile::new(name, size, mime::APPLICATION_PDF)
}

pub(super) fn encoded(name: &str) -> EncodedAttachment {
    EncodedAttachment {
        name: name.to_string(),
        mime_type: "application/pdf".to_string(),
        data: "JVBERi0xLjQ=".to_string(),
    }
}

/// Select and finish a read for every slot.
pub(super) fn fill_slots(slots: &Mutex<AttachmentSlots>) {
    let mut slots = lock_slots(slots);
    for slot in AttachmentSlot::ALL {
        let name = format!("{}.pdf", slot.label());
        let ticket = slots.select(*slot, pdf(&name, 2048));
        assert!(slots.complete(ticket, encoded(&name)));
    }
}

pub(super) fn health_form(form: &mut WizardForm) {
    form.set_excuse_type(Some(ExcuseType::Health));
    form.hospital = "H1".to_string();
    form.location = Some(HospitalLocation::InsideJeddah);
    form.excuse_date = NaiveDate::from_ymd_opt(2025, 3, 2);
    form.num_days = "2".to_string();
    form.courses = vec![CourseRow::new("C1", "R1"), CourseRow::new("C2", "R2")];
}

/// A wizard filled in and standing on the final step.
pub(super) async fn wizard_on_final_step(client: PortalClient) -> WizardController {
    let mut wizard = WizardController::new(client);
    wizard.open(identity());
    health_form(wizard.form_mut());
    fill_slots(&wizard.attachments());

    for _ in 0..3 {
        let outcome = wizard.advance().await.expect("advance succeeds");
        assert!(outcome.advanced(), "expected to move, got {outcome:?}");
    }
    wizard
}
