//! Contract with the hosted backend that owns accounts and persistence.
//!
//! The portal never stores credentials or rows itself; every workflow talks to an
//! implementation of [`Backend`]. Failures come back as a [`BackendError`] carrying a
//! [`BackendErrorKind`], so callers pick user-facing text by kind rather than by
//! inspecting provider wording.

pub mod memory;
pub mod rest;

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::workflows::registration::domain::{
    ApplicationStatus, EducationLevel, Gender, ProgrammingExperience,
};

pub use memory::{InMemoryBackend, Operation};
pub use rest::RestBackend;

/// Opaque identifier assigned by the account service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(pub String);

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub email: String,
}

/// Authenticated session issued by the backend.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    pub account: Account,
    pub access_token: String,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("account", &self.account)
            .field("access_token", &"<redacted>")
            .finish()
    }
}

/// Result of account creation. Providers that require e-mail confirmation return no session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountCreated {
    pub account: Account,
    pub session: Option<Session>,
}

/// Personal details attached to the account at sign-up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountMetadata {
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub gender: Gender,
    pub date_of_birth: NaiveDate,
}

/// Row of the `user_profiles` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileRow {
    pub id: AccountId,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub gender: Gender,
    pub date_of_birth: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl ProfileRow {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Row of the `bootcamp_applications` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationRow {
    pub user_id: AccountId,
    pub address: String,
    pub school_university: String,
    pub current_course: String,
    pub education_level: EducationLevel,
    pub programming_experience: ProgrammingExperience,
    pub web_dev_challenges: String,
    pub bootcamp_goals: String,
    pub previous_projects: Option<String>,
    pub has_laptop: bool,
    pub availability_confirmed: bool,
    pub terms_agreed: bool,
    pub application_status: ApplicationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<DateTime<Utc>>,
}

/// Tables the portal writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Profiles,
    Applications,
}

impl Table {
    pub const fn name(self) -> &'static str {
        match self {
            Table::Profiles => "user_profiles",
            Table::Applications => "bootcamp_applications",
        }
    }
}

/// Structured failure category reported by a backend adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendErrorKind {
    AlreadyRegistered,
    InvalidEmail,
    WeakPassword,
    ValueTooLong,
    InvalidCredentials,
    Unauthorized,
    Conflict,
    Unavailable,
    Other,
}

impl BackendErrorKind {
    /// Derives a kind from provider wording. Only adapters for text-only providers use this.
    pub fn classify(message: &str) -> Self {
        let lowered = message.to_ascii_lowercase();
        if lowered.contains("already registered") {
            Self::AlreadyRegistered
        } else if lowered.contains("invalid email") {
            Self::InvalidEmail
        } else if lowered.contains("weak password") {
            Self::WeakPassword
        } else if lowered.contains("value too long") {
            Self::ValueTooLong
        } else if lowered.contains("invalid login credentials") {
            Self::InvalidCredentials
        } else {
            Self::Other
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct BackendError {
    pub kind: BackendErrorKind,
    pub message: String,
}

impl BackendError {
    pub fn new(kind: BackendErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::Unavailable, message)
    }

    /// Builds an error whose kind is inferred from the provider message.
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(BackendErrorKind::classify(&message), message)
    }
}

/// Remote account and persistence operations used by the portal workflows.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn create_account(
        &self,
        email: &str,
        password: &str,
        metadata: &AccountMetadata,
    ) -> Result<AccountCreated, BackendError>;

    /// Row writes and reads run as the signed-in user when a session is given, and with
    /// the anonymous key otherwise.
    async fn insert_profile(
        &self,
        profile: &ProfileRow,
        session: Option<&Session>,
    ) -> Result<(), BackendError>;

    async fn insert_application(
        &self,
        application: &ApplicationRow,
        session: Option<&Session>,
    ) -> Result<(), BackendError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, BackendError>;

    async fn sign_out(&self, session: &Session) -> Result<(), BackendError>;

    /// Returns the account behind the session, or `None` once the session is no longer valid.
    async fn current_user(&self, session: &Session) -> Result<Option<Account>, BackendError>;

    async fn fetch_profile(
        &self,
        id: &AccountId,
        session: Option<&Session>,
    ) -> Result<Option<ProfileRow>, BackendError>;

    async fn fetch_application(
        &self,
        user_id: &AccountId,
        session: Option<&Session>,
    ) -> Result<Option<ApplicationRow>, BackendError>;
}
