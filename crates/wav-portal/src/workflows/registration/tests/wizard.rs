use super::common::*;
use serde_json::json;

use crate::workflows::registration::domain::IdentityPatch;
use crate::workflows::registration::validation::ErrorMap;
use crate::workflows::registration::wizard::{RegistrationWizard, WizardCursor};

#[test]
fn new_wizard_starts_on_identity_step() {
    let wizard = RegistrationWizard::new();
    let view = wizard.view();

    assert_eq!(wizard.cursor(), WizardCursor::Identity);
    assert_eq!(view.progress_percent, 50);
    assert_eq!(view.title, "Basic Information");
    assert!(!view.loading);
    assert!(!view.account_created);
}

#[test]
fn editing_a_field_clears_only_its_error() {
    let mut wizard = RegistrationWizard::new();
    let mut errors = ErrorMap::new();
    errors.insert("firstName", "First name is required");
    errors.insert("email", "Email is required");
    wizard.replace_errors(errors);

    wizard.edit_identity(IdentityPatch {
        first_name: Some("Aminata".to_string()),
        ..IdentityPatch::default()
    });

    assert_eq!(wizard.errors().get("firstName"), None);
    assert_eq!(wizard.errors().get("email"), Some("Email is required"));
    assert_eq!(wizard.identity().first_name, "Aminata");
}

#[tokio::test]
async fn going_back_clears_errors_and_keeps_values() {
    let (service, _) = build_service();
    let mut wizard = wizard_on_application_step(&service).await;
    wizard.replace_errors(ErrorMap::general("Failed to submit application. Please try again."));
    let identity_before = wizard.identity().clone();
    let application_before = wizard.application().clone();

    let cursor = wizard.previous_step();

    assert_eq!(cursor, WizardCursor::Identity);
    assert!(wizard.errors().is_empty());
    assert_eq!(wizard.identity(), &identity_before);
    assert_eq!(wizard.application(), &application_before);
    assert!(wizard.account_id().is_some());
}

#[test]
fn going_back_on_first_step_keeps_errors() {
    let mut wizard = RegistrationWizard::new();
    wizard.replace_errors(ErrorMap::general("Email is required"));

    assert_eq!(wizard.previous_step(), WizardCursor::Identity);
    assert!(!wizard.errors().is_empty());
}

#[test]
fn only_one_submission_may_be_in_flight() {
    let mut wizard = filled_wizard();

    assert!(wizard.begin_submission());
    assert!(!wizard.begin_submission());
    assert!(wizard.view().loading);

    wizard.finish_submission();
    assert!(wizard.begin_submission());
}

#[test]
fn view_never_exposes_passwords() {
    let wizard = filled_wizard();
    let value = serde_json::to_value(wizard.view()).expect("serialise view");

    assert_eq!(value["step"], json!(1));
    assert_eq!(value["identity"]["firstName"], json!("Aminata"));
    assert!(value["identity"].get("password").is_none());
    assert!(value["identity"].get("confirmPassword").is_none());
    assert!(!format!("{:?}", wizard.identity()).contains("freetown24"));
}
