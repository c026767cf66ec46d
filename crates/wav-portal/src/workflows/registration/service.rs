use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::domain::IdentityRecord;
use super::validation::{validate_application, validate_identity, ErrorMap};
use super::wizard::{CapturedAccount, RegistrationWizard, WizardCursor};
use crate::backend::{
    AccountId, AccountMetadata, ApplicationRow, Backend, BackendError, BackendErrorKind, Session,
};
use crate::navigation::Page;

pub const ACCOUNT_EXISTS_MESSAGE: &str =
    "An account with this email already exists. Please try logging in instead.";
pub const INVALID_EMAIL_MESSAGE: &str = "Please enter a valid email address.";
pub const WEAK_PASSWORD_MESSAGE: &str = "Password is too weak. Please use at least 6 characters.";
pub const FIELD_TOO_LONG_MESSAGE: &str =
    "One of your entries is too long. Please shorten your phone number or other fields.";
pub const PROFILE_SAVE_FAILED_MESSAGE: &str = "Failed to save profile data. Please try again.";
pub const APPLICATION_SAVE_FAILED_MESSAGE: &str =
    "Failed to submit application. Please try again.";
pub const UNEXPECTED_MESSAGE: &str = "An unexpected error occurred. Please try again.";

/// Result of submitting one wizard step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// The step was accepted and the cursor moved forward.
    Advanced(WizardCursor),
    /// Validation or a remote call failed; the map is what the form now shows.
    Blocked(ErrorMap),
    /// The application was stored; the client leaves the wizard.
    Completed { redirect: Page },
    /// Precondition unmet; nothing was sent and nothing changed.
    Refused,
}

/// Either work to send to the backend, or an outcome settled without it.
#[derive(Debug)]
pub enum Prepared<T> {
    Ready(T),
    Settled(StepOutcome),
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RegistrationError {
    #[error("a submission for this registration is already in progress")]
    InFlight,
    #[error("step {actual} is active; step {expected} cannot be submitted")]
    WrongStep { expected: u8, actual: u8 },
    #[error("registration not found")]
    NotFound,
    #[error("registration state unavailable")]
    StatePoisoned,
}

/// Snapshot of step 1 taken when the submission starts.
#[derive(Clone)]
pub struct IdentitySubmission {
    email: String,
    password: String,
    record: IdentityRecord,
    reuse: Option<CapturedAccount>,
}

impl fmt::Debug for IdentitySubmission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentitySubmission")
            .field("email", &self.email)
            .field("record", &self.record)
            .field("reuse", &self.reuse)
            .finish_non_exhaustive()
    }
}

/// What happened remotely during a step 1 submission.
#[derive(Debug)]
pub struct IdentityAttempt {
    captured: Option<CapturedAccount>,
    result: Result<(), ErrorMap>,
}

#[derive(Debug, Clone)]
pub struct ApplicationSubmission {
    row: Option<ApplicationRow>,
    session: Option<Session>,
}

#[derive(Debug)]
pub struct ApplicationAttempt {
    result: Result<(), ErrorMap>,
}

/// Validates wizard steps and sequences the account, profile and application calls.
pub struct RegistrationService<B> {
    backend: Arc<B>,
}

impl<B> Clone for RegistrationService<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
        }
    }
}

impl<B> RegistrationService<B>
where
    B: Backend + 'static,
{
    pub fn new(backend: Arc<B>) -> Self {
        Self { backend }
    }

    /// Runs step 1 end to end on a wizard the caller owns exclusively.
    pub async fn submit_identity(
        &self,
        wizard: &mut RegistrationWizard,
    ) -> Result<StepOutcome, RegistrationError> {
        match self.prepare_identity(wizard)? {
            Prepared::Settled(outcome) => Ok(outcome),
            Prepared::Ready(submission) => {
                let attempt = self.execute_identity(submission).await;
                Ok(self.apply_identity(wizard, attempt))
            }
        }
    }

    /// Runs step 2 end to end on a wizard the caller owns exclusively.
    pub async fn submit_application(
        &self,
        wizard: &mut RegistrationWizard,
    ) -> Result<StepOutcome, RegistrationError> {
        match self.prepare_application(wizard)? {
            Prepared::Settled(outcome) => Ok(outcome),
            Prepared::Ready(submission) => {
                let attempt = self.execute_application(submission).await;
                Ok(self.apply_application(wizard, attempt))
            }
        }
    }

    /// Validates step 1 and, when it passes, marks the wizard as loading.
    pub fn prepare_identity(
        &self,
        wizard: &mut RegistrationWizard,
    ) -> Result<Prepared<IdentitySubmission>, RegistrationError> {
        if wizard.is_loading() {
            return Err(RegistrationError::InFlight);
        }
        if wizard.cursor() != WizardCursor::Identity {
            return Err(RegistrationError::WrongStep {
                expected: WizardCursor::Identity.step(),
                actual: wizard.cursor().step(),
            });
        }

        let errors = validate_identity(wizard.identity());
        wizard.replace_errors(errors.clone());
        if !errors.is_empty() {
            debug!(fields = errors.len(), "identity step failed validation");
            return Ok(Prepared::Settled(StepOutcome::Blocked(errors)));
        }

        let record = wizard.identity().clone();
        // A profile write that failed after sign-up is retried against the same account,
        // provided the credentials it was created with are unchanged.
        let reuse = wizard
            .captured()
            .filter(|captured| captured.matches(record.email.trim(), &record.password))
            .cloned();

        if !wizard.begin_submission() {
            return Err(RegistrationError::InFlight);
        }

        Ok(Prepared::Ready(IdentitySubmission {
            email: record.email.trim().to_string(),
            password: record.password.clone(),
            record,
            reuse,
        }))
    }

    /// Creates the account (unless one was already captured) and stores the profile.
    pub async fn execute_identity(&self, submission: IdentitySubmission) -> IdentityAttempt {
        let IdentitySubmission {
            email,
            password,
            record,
            reuse,
        } = submission;

        let Some(metadata) = record.metadata() else {
            return IdentityAttempt {
                captured: None,
                result: Err(ErrorMap::general(UNEXPECTED_MESSAGE)),
            };
        };

        let captured = match reuse {
            Some(captured) => captured,
            None => match self.create_account(&email, &password, &metadata).await {
                Ok(captured) => captured,
                Err(errors) => {
                    return IdentityAttempt {
                        captured: None,
                        result: Err(errors),
                    }
                }
            },
        };

        let result = self
            .insert_profile(&record, &captured.account.id, captured.session.as_ref())
            .await;
        IdentityAttempt {
            captured: Some(captured),
            result,
        }
    }

    /// Records the remote result on the wizard and re-enables the form.
    pub fn apply_identity(
        &self,
        wizard: &mut RegistrationWizard,
        attempt: IdentityAttempt,
    ) -> StepOutcome {
        wizard.finish_submission();
        if let Some(captured) = attempt.captured {
            wizard.capture(captured);
        }

        match attempt.result {
            Ok(()) => {
                wizard.replace_errors(ErrorMap::new());
                let cursor = wizard.advance();
                info!(step = cursor.step(), "registration advanced");
                StepOutcome::Advanced(cursor)
            }
            Err(errors) => {
                wizard.replace_errors(errors.clone());
                StepOutcome::Blocked(errors)
            }
        }
    }

    /// Checks the step 2 preconditions and validation, marking the wizard as loading.
    pub fn prepare_application(
        &self,
        wizard: &mut RegistrationWizard,
    ) -> Result<Prepared<ApplicationSubmission>, RegistrationError> {
        if wizard.is_loading() {
            return Err(RegistrationError::InFlight);
        }
        let Some(account_id) = wizard.account_id().cloned() else {
            debug!("application submitted without a captured account; ignoring");
            return Ok(Prepared::Settled(StepOutcome::Refused));
        };
        if wizard.cursor() != WizardCursor::Application {
            return Err(RegistrationError::WrongStep {
                expected: WizardCursor::Application.step(),
                actual: wizard.cursor().step(),
            });
        }

        let errors = validate_application(wizard.application());
        wizard.replace_errors(errors.clone());
        if !errors.is_empty() {
            debug!(fields = errors.len(), "application step failed validation");
            return Ok(Prepared::Settled(StepOutcome::Blocked(errors)));
        }

        if !wizard.begin_submission() {
            return Err(RegistrationError::InFlight);
        }

        Ok(Prepared::Ready(ApplicationSubmission {
            row: wizard.application().application_row(&account_id),
            session: wizard.session().cloned(),
        }))
    }

    pub async fn execute_application(
        &self,
        submission: ApplicationSubmission,
    ) -> ApplicationAttempt {
        let ApplicationSubmission { row, session } = submission;
        let Some(row) = row else {
            return ApplicationAttempt {
                result: Err(ErrorMap::general(UNEXPECTED_MESSAGE)),
            };
        };

        let result = match self
            .backend
            .insert_application(&row, session.as_ref())
            .await
        {
            Ok(()) => {
                info!(account_id = %row.user_id, "bootcamp application stored");
                Ok(())
            }
            Err(err) => {
                warn!(kind = ?err.kind, error = %err, "application insert failed");
                Err(ErrorMap::general(APPLICATION_SAVE_FAILED_MESSAGE))
            }
        };
        ApplicationAttempt { result }
    }

    pub fn apply_application(
        &self,
        wizard: &mut RegistrationWizard,
        attempt: ApplicationAttempt,
    ) -> StepOutcome {
        wizard.finish_submission();
        match attempt.result {
            Ok(()) => {
                wizard.replace_errors(ErrorMap::new());
                StepOutcome::Completed {
                    redirect: Page::Dashboard,
                }
            }
            Err(errors) => {
                wizard.replace_errors(errors.clone());
                StepOutcome::Blocked(errors)
            }
        }
    }

    async fn create_account(
        &self,
        email: &str,
        password: &str,
        metadata: &AccountMetadata,
    ) -> Result<CapturedAccount, ErrorMap> {
        match self.backend.create_account(email, password, metadata).await {
            Ok(created) => {
                info!(account_id = %created.account.id, "account created");
                Ok(CapturedAccount::new(
                    created.account,
                    created.session,
                    password,
                ))
            }
            Err(err) => {
                warn!(kind = ?err.kind, error = %err, "account creation failed");
                Err(ErrorMap::general(account_failure_message(&err)))
            }
        }
    }

    async fn insert_profile(
        &self,
        record: &IdentityRecord,
        account_id: &AccountId,
        session: Option<&Session>,
    ) -> Result<(), ErrorMap> {
        let Some(row) = record.profile_row(account_id) else {
            return Err(ErrorMap::general(UNEXPECTED_MESSAGE));
        };

        match self.backend.insert_profile(&row, session).await {
            Ok(()) => Ok(()),
            Err(err) => {
                warn!(kind = ?err.kind, error = %err, %account_id, "profile insert failed");
                Err(ErrorMap::general(profile_failure_message(&err)))
            }
        }
    }
}

/// User-facing text for a failed sign-up.
pub fn account_failure_message(err: &BackendError) -> String {
    match err.kind {
        BackendErrorKind::AlreadyRegistered => ACCOUNT_EXISTS_MESSAGE.to_string(),
        BackendErrorKind::InvalidEmail => INVALID_EMAIL_MESSAGE.to_string(),
        BackendErrorKind::WeakPassword => WEAK_PASSWORD_MESSAGE.to_string(),
        _ => err.message.clone(),
    }
}

/// User-facing text for a failed profile write.
pub fn profile_failure_message(err: &BackendError) -> &'static str {
    match err.kind {
        BackendErrorKind::ValueTooLong => FIELD_TOO_LONG_MESSAGE,
        _ => PROFILE_SAVE_FAILED_MESSAGE,
    }
}
