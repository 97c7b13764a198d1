use serde_json::{json, Value};

use super::common::*;
use crate::domain::{AttachmentSlot, ExcuseType, Relationship};
use crate::workflows::wizard::{
    AdvanceOutcome, CourseRow, FieldId, SlotState, WizardController, WizardError, WizardStep,
};

#[tokio::test]
async fn empty_type_blocks_step_two_without_moving() {
    let (_, client) = scripted_client();
    let mut wizard = WizardController::new(client);
    wizard.open(identity());

    let first = wizard.advance().await.expect("step one advances");
    assert_eq!(first, AdvanceOutcome::Moved(WizardStep::Classification));

    let outcome = wizard.advance().await.expect("validation is not an error");
    assert!(!outcome.advanced());
    assert_eq!(wizard.current_step(), WizardStep::Classification);
    let markers = wizard.markers().expect("markers recorded");
    assert!(markers.is_marked(FieldId::ExcuseType));
}

#[tokio::test]
async fn markers_clear_once_the_step_passes() {
    let (_, client) = scripted_client();
    let mut wizard = WizardController::new(client);
    wizard.open(identity());
    wizard.advance().await.expect("step one");
    wizard.advance().await.expect("blocked on step two");
    assert!(wizard.markers().is_some());

    wizard.form_mut().set_excuse_type(Some(ExcuseType::Death));
    wizard.form_mut().relationship = Some(Relationship::Sibling);
    let outcome = wizard.advance().await.expect("step two passes");
    assert_eq!(outcome, AdvanceOutcome::Moved(WizardStep::Schedule));
    assert!(wizard.markers().is_none());
}

#[tokio::test]
async fn retreat_on_later_steps_closes_the_wizard() {
    let (_, client) = scripted_client();
    let mut wizard = WizardController::new(client);
    wizard.open(identity());

    assert!(!wizard.retreat(), "step one has no back control");
    assert!(wizard.is_open());

    wizard.advance().await.expect("step one");
    wizard.form_mut().reason = "fever".to_string();
    assert!(wizard.retreat());
    assert!(!wizard.is_open());
    assert_eq!(wizard.current_step(), WizardStep::Identity);
    assert!(wizard.form().reason.is_empty());
}

#[tokio::test]
async fn submit_is_rejected_before_the_final_step() {
    let (transport, client) = scripted_client();
    let mut wizard = WizardController::new(client);
    wizard.open(identity());

    let err = wizard.submit().await.expect_err("not on final step");
    assert!(matches!(
        err,
        WizardError::NotOnFinalStep {
            step: WizardStep::Identity
        }
    ));
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn advancing_from_the_last_step_submits_and_resets() {
    let (transport, client) = scripted_client();
    let mut wizard = wizard_on_final_step(client).await;
    assert_eq!(wizard.current_step(), WizardStep::Attachments);

    transport.push_success(json!({ "id": 31 }));
    let outcome = wizard.advance().await.expect("submission succeeds");

    match outcome {
        AdvanceOutcome::Submitted(receipt) => {
            assert_eq!(receipt.id.map(|id| id.0), Some("31".to_string()))
        }
        other => panic!("expected submission, got {other:?}"),
    }
    assert!(!wizard.is_open());
    assert_eq!(wizard.current_step(), WizardStep::Identity);
    let slots = wizard.attachments();
    let slots = slots.lock().expect("slots lock");
    assert_eq!(slots.state(AttachmentSlot::Medical), &SlotState::Empty);
}

#[tokio::test]
async fn payload_carries_only_the_chosen_branch() {
    let (transport, client) = scripted_client();
    let mut wizard = wizard_on_final_step(client).await;
    transport.push_success(json!({}));
    wizard.submit().await.expect("submitted");

    let body = transport.requests().pop().expect("request recorded");
    assert_eq!(body["action"], "submit_request");
    assert_eq!(body["student_id"], "441200");
    assert_eq!(body["excuse_type"], "health");
    assert_eq!(body["excuse_date"], "2025-03-02");
    assert_eq!(body["hospital"], "H1");
    assert_eq!(body["location"], "inside_jeddah");
    assert!(body.get("relationship_type").is_none());
    assert_eq!(body["files"]["sehaty"]["mimeType"], "application/pdf");

    let courses: Value = serde_json::from_str(
        body["affected_courses"].as_str().expect("courses travel as a string"),
    )
    .expect("courses decode");
    assert_eq!(
        courses,
        json!([
            { "course": "C1", "reason": "R1" },
            { "course": "C2", "reason": "R2" }
        ])
    );
}

#[tokio::test]
async fn failed_submission_keeps_everything_for_retry() {
    let (transport, client) = scripted_client();
    let mut wizard = wizard_on_final_step(client).await;
    transport.push_error("Drive quota exceeded");

    let err = wizard.submit().await.expect_err("backend rejects");
    match err {
        WizardError::Api(api) => assert_eq!(api.user_message(), "Drive quota exceeded"),
        other => panic!("expected api error, got {other:?}"),
    }
    assert!(wizard.is_open());
    assert_eq!(wizard.current_step(), WizardStep::Attachments);
    assert_eq!(wizard.form().courses.len(), 2);

    transport.push_success(json!({}));
    wizard.submit().await.expect("retry succeeds");
    assert!(!wizard.is_open());
}

#[tokio::test]
async fn blank_course_rows_are_left_out_of_the_payload() {
    let (transport, client) = scripted_client();
    let mut wizard = wizard_on_final_step(client).await;
    wizard.form_mut().courses.insert(1, CourseRow::default());
    transport.push_success(json!({}));
    wizard.submit().await.expect("submitted");

    let body = transport.requests().pop().expect("request recorded");
    let courses: Vec<Value> =
        serde_json::from_str(body["affected_courses"].as_str().expect("string")).expect("decode");
    assert_eq!(courses.len(), 2);
}

#[tokio::test]
async fn closed_wizard_cannot_advance() {
    let (_, client) = scripted_client();
    let mut wizard = WizardController::new(client);
    assert!(matches!(wizard.advance().await, Err(WizardError::Closed)));
}
