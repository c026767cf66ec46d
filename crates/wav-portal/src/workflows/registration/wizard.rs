use std::fmt;

use serde::{Serialize, Serializer};

use super::domain::{ApplicationPatch, ApplicationRecord, IdentityPatch, IdentityRecord};
use super::validation::ErrorMap;
use crate::backend::{Account, AccountId, Session};

/// Which step of the two-step registration form is visible.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum WizardCursor {
    #[default]
    Identity,
    Application,
}

impl WizardCursor {
    pub const fn step(self) -> u8 {
        match self {
            WizardCursor::Identity => 1,
            WizardCursor::Application => 2,
        }
    }

    pub const fn title(self) -> &'static str {
        match self {
            WizardCursor::Identity => "Basic Information",
            WizardCursor::Application => "Application Assessment",
        }
    }
}

impl Serialize for WizardCursor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.step())
    }
}

/// Account captured by a successful sign-up, kept for the rest of the attempt.
#[derive(Clone, PartialEq, Eq)]
pub struct CapturedAccount {
    pub account: Account,
    pub session: Option<Session>,
    password: String,
}

impl CapturedAccount {
    pub fn new(account: Account, session: Option<Session>, password: impl Into<String>) -> Self {
        Self {
            account,
            session,
            password: password.into(),
        }
    }

    /// True when step 1 would sign up with the same email and password again.
    pub fn matches(&self, email: &str, password: &str) -> bool {
        self.account.email.eq_ignore_ascii_case(email) && self.password == password
    }
}

impl fmt::Debug for CapturedAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapturedAccount")
            .field("account", &self.account)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

/// State of one registration attempt: both step records, the error map, the cursor
/// and the in-flight flag.
#[derive(Debug, Default)]
pub struct RegistrationWizard {
    identity: IdentityRecord,
    application: ApplicationRecord,
    errors: ErrorMap,
    cursor: WizardCursor,
    captured: Option<CapturedAccount>,
    loading: bool,
}

impl RegistrationWizard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn identity(&self) -> &IdentityRecord {
        &self.identity
    }

    pub fn application(&self) -> &ApplicationRecord {
        &self.application
    }

    pub fn errors(&self) -> &ErrorMap {
        &self.errors
    }

    pub fn cursor(&self) -> WizardCursor {
        self.cursor
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn captured(&self) -> Option<&CapturedAccount> {
        self.captured.as_ref()
    }

    pub fn account_id(&self) -> Option<&AccountId> {
        self.captured.as_ref().map(|captured| &captured.account.id)
    }

    pub fn session(&self) -> Option<&Session> {
        self.captured
            .as_ref()
            .and_then(|captured| captured.session.as_ref())
    }

    /// Applies user input and clears the message of every edited field.
    pub fn edit_identity(&mut self, patch: IdentityPatch) {
        for field in self.identity.apply(patch) {
            self.errors.clear_field(field.key());
        }
    }

    pub fn edit_application(&mut self, patch: ApplicationPatch) {
        for field in self.application.apply(patch) {
            self.errors.clear_field(field.key());
        }
    }

    /// Steps back to the identity form. Entered values survive; messages do not.
    pub fn previous_step(&mut self) -> WizardCursor {
        if self.cursor == WizardCursor::Application {
            self.cursor = WizardCursor::Identity;
            self.errors.clear();
        }
        self.cursor
    }

    pub fn view(&self) -> WizardView {
        WizardView {
            step: self.cursor,
            title: self.cursor.title(),
            progress_percent: self.cursor.step() * 50,
            loading: self.loading,
            identity: self.identity.clone(),
            application: self.application.clone(),
            errors: self.errors.clone(),
            account_created: self.captured.is_some(),
        }
    }

    pub(crate) fn begin_submission(&mut self) -> bool {
        if self.loading {
            return false;
        }
        self.loading = true;
        true
    }

    pub(crate) fn finish_submission(&mut self) {
        self.loading = false;
    }

    pub(crate) fn replace_errors(&mut self, errors: ErrorMap) {
        self.errors = errors;
    }

    pub(crate) fn capture(&mut self, captured: CapturedAccount) {
        self.captured = Some(captured);
    }

    pub(crate) fn advance(&mut self) -> WizardCursor {
        self.cursor = WizardCursor::Application;
        self.cursor
    }
}

/// Client-facing snapshot of a wizard. Passwords are never included.
#[derive(Debug, Clone, Serialize)]
pub struct WizardView {
    pub step: WizardCursor,
    pub title: &'static str,
    pub progress_percent: u8,
    pub loading: bool,
    pub identity: IdentityRecord,
    pub application: ApplicationRecord,
    pub errors: ErrorMap,
    pub account_created: bool,
}
