//! Two-step bootcamp registration: identity and credentials first, then the application
//! assessment. Each step is validated locally, submitted to the backend, and only advances
//! once the backend accepted it.

pub mod domain;
pub mod router;
pub mod service;
pub mod store;
pub mod validation;
pub mod wizard;

#[cfg(test)]
mod tests;

pub use domain::{
    ApplicationField, ApplicationPatch, ApplicationRecord, ApplicationStatus, EducationLevel,
    Gender, IdentityField, IdentityPatch, IdentityRecord, ProgrammingExperience,
};
pub use router::registration_router;
pub use service::{Prepared, RegistrationError, RegistrationService, StepOutcome};
pub use store::{RegistrationId, WizardStore, DEFAULT_WIZARD_TTL};
pub use validation::{validate_application, validate_identity, ErrorMap, GENERAL_KEY};
pub use wizard::{RegistrationWizard, WizardCursor, WizardView};
