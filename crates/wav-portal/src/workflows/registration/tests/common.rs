use std::sync::Arc;

use axum::body::to_bytes;
use axum::http::StatusCode;
use axum::response::Response;
use chrono::NaiveDate;
use serde_json::Value;

use crate::backend::InMemoryBackend;
use crate::state::PortalState;
use crate::workflows::registration::domain::{
    ApplicationPatch, ApplicationRecord, EducationLevel, Gender, IdentityPatch, IdentityRecord,
    ProgrammingExperience,
};
use crate::workflows::registration::service::{RegistrationService, StepOutcome};
use crate::workflows::registration::wizard::{RegistrationWizard, WizardCursor};

pub(super) fn identity() -> IdentityRecord {
    IdentityRecord {
        first_name: "Aminata".to_string(),
        last_name: "Sesay".to_string(),
        email: "aminata@example.com".to_string(),
        phone: "+23276555123".to_string(),
        password: "freetown24".to_string(),
        confirm_password: "freetown24".to_string(),
        gender: Some(Gender::Female),
        date_of_birth: NaiveDate::from_ymd_opt(2002, 6, 21),
    }
}

pub(super) fn identity_patch() -> IdentityPatch {
    let record = identity();
    IdentityPatch {
        first_name: Some(record.first_name),
        last_name: Some(record.last_name),
        email: Some(record.email),
        phone: Some(record.phone),
        password: Some(record.password),
        confirm_password: Some(record.confirm_password),
        gender: record.gender,
        date_of_birth: record.date_of_birth,
    }
}

pub(super) fn application() -> ApplicationRecord {
    ApplicationRecord {
        address: "12 Wilkinson Road, Freetown".to_string(),
        school_university: "Fourah Bay College".to_string(),
        current_course: "Computer Science".to_string(),
        education_level: Some(EducationLevel::Bachelor),
        programming_experience: Some(ProgrammingExperience::Beginner),
        web_dev_challenges: "Laying out pages that work on phones".to_string(),
        bootcamp_goals: "Ship a full-stack project I can show employers".to_string(),
        previous_projects: String::new(),
        has_laptop: true,
        availability_confirmed: true,
        agree_terms: true,
    }
}

pub(super) fn application_patch() -> ApplicationPatch {
    let record = application();
    ApplicationPatch {
        address: Some(record.address),
        school_university: Some(record.school_university),
        current_course: Some(record.current_course),
        education_level: record.education_level,
        programming_experience: record.programming_experience,
        web_dev_challenges: Some(record.web_dev_challenges),
        bootcamp_goals: Some(record.bootcamp_goals),
        previous_projects: None,
        has_laptop: Some(record.has_laptop),
        availability_confirmed: Some(record.availability_confirmed),
        agree_terms: Some(record.agree_terms),
    }
}

pub(super) fn build_service() -> (RegistrationService<InMemoryBackend>, Arc<InMemoryBackend>) {
    let backend = Arc::new(InMemoryBackend::default());
    (RegistrationService::new(Arc::clone(&backend)), backend)
}

pub(super) fn filled_wizard() -> RegistrationWizard {
    let mut wizard = RegistrationWizard::new();
    wizard.edit_identity(identity_patch());
    wizard
}

/// Wizard that already passed step 1 against `service`.
pub(super) async fn wizard_on_application_step(
    service: &RegistrationService<InMemoryBackend>,
) -> RegistrationWizard {
    let mut wizard = filled_wizard();
    let outcome = service
        .submit_identity(&mut wizard)
        .await
        .expect("identity step accepted");
    assert_eq!(outcome, StepOutcome::Advanced(WizardCursor::Application));
    wizard.edit_application(application_patch());
    wizard
}

pub(super) fn portal_state() -> (PortalState<InMemoryBackend>, Arc<InMemoryBackend>) {
    let backend = Arc::new(InMemoryBackend::default());
    (PortalState::new(Arc::clone(&backend)), backend)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("body bytes");
    serde_json::from_slice(&bytes).expect("json body")
}

pub(super) fn assert_status(response: &Response, status: StatusCode) {
    assert_eq!(response.status(), status, "unexpected status");
}
