use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::{
    Account, AccountCreated, AccountId, AccountMetadata, ApplicationRow, Backend, BackendError,
    BackendErrorKind, ProfileRow, Session, Table,
};
use crate::workflows::registration::domain::ApplicationStatus;

const DEFAULT_MAX_PHONE_CHARS: usize = 20;
const DEFAULT_MAX_TEXT_CHARS: usize = 255;
const MIN_PASSWORD_CHARS: usize = 6;

/// Backend operations, used to count calls and script failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CreateAccount,
    InsertProfile,
    InsertApplication,
    SignIn,
    SignOut,
    CurrentUser,
    FetchProfile,
    FetchApplication,
}

#[derive(Debug)]
struct StoredAccount {
    account: Account,
    password: String,
}

#[derive(Debug, Default)]
struct MemoryState {
    next_account: u64,
    accounts: HashMap<String, StoredAccount>,
    sessions: HashMap<String, AccountId>,
    profiles: HashMap<AccountId, ProfileRow>,
    applications: HashMap<AccountId, ApplicationRow>,
    scripted: HashMap<Operation, BackendError>,
    calls: HashMap<Operation, usize>,
}

/// Process-local stand-in for the hosted backend, used for development and tests.
#[derive(Debug, Clone)]
pub struct InMemoryBackend {
    state: Arc<Mutex<MemoryState>>,
    max_phone_chars: usize,
    max_text_chars: usize,
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self {
            state: Arc::default(),
            max_phone_chars: DEFAULT_MAX_PHONE_CHARS,
            max_text_chars: DEFAULT_MAX_TEXT_CHARS,
        }
    }
}

impl InMemoryBackend {
    pub fn with_limits(max_phone_chars: usize, max_text_chars: usize) -> Self {
        Self {
            max_phone_chars,
            max_text_chars,
            ..Self::default()
        }
    }

    /// Makes the next call of `operation` fail with `error`.
    pub fn fail_next(&self, operation: Operation, error: BackendError) {
        if let Ok(mut state) = self.state.lock() {
            state.scripted.insert(operation, error);
        }
    }

    pub fn calls(&self, operation: Operation) -> usize {
        self.state
            .lock()
            .map(|state| state.calls.get(&operation).copied().unwrap_or_default())
            .unwrap_or_default()
    }

    /// Changes the review state of a stored application, as staff would.
    pub fn set_application_status(
        &self,
        user_id: &AccountId,
        status: ApplicationStatus,
    ) -> Result<(), BackendError> {
        let mut state = self.lock()?;
        let row = state.applications.get_mut(user_id).ok_or_else(|| {
            BackendError::new(BackendErrorKind::Other, "application not found")
        })?;
        row.application_status = status;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, BackendError> {
        self.state
            .lock()
            .map_err(|_| BackendError::unavailable("in-memory backend lock poisoned"))
    }

    /// Records the call and returns the state, or the scripted failure for it.
    fn begin(&self, operation: Operation) -> Result<MutexGuard<'_, MemoryState>, BackendError> {
        let mut state = self.lock()?;
        *state.calls.entry(operation).or_default() += 1;
        if let Some(error) = state.scripted.remove(&operation) {
            return Err(error);
        }
        Ok(state)
    }

    fn check_length(&self, value: &str, limit: usize) -> Result<(), BackendError> {
        if value.chars().count() > limit {
            return Err(BackendError::new(
                BackendErrorKind::ValueTooLong,
                format!("value too long for type character varying({limit})"),
            ));
        }
        Ok(())
    }
}

/// Resolves the account a supplied session acts for. `None` means the anonymous key.
fn session_owner<'a>(
    state: &'a MemoryState,
    session: Option<&Session>,
) -> Result<Option<&'a AccountId>, BackendError> {
    let Some(session) = session else {
        return Ok(None);
    };
    match state.sessions.get(&session.access_token) {
        Some(owner) => Ok(Some(owner)),
        None => Err(BackendError::new(
            BackendErrorKind::Unauthorized,
            "invalid JWT: session not found",
        )),
    }
}

fn check_owner(
    state: &MemoryState,
    session: Option<&Session>,
    row_owner: &AccountId,
    table: Table,
) -> Result<(), BackendError> {
    match session_owner(state, session)? {
        Some(owner) if owner != row_owner => Err(BackendError::new(
            BackendErrorKind::Unauthorized,
            format!(
                "new row violates row-level security policy for table \"{}\"",
                table.name()
            ),
        )),
        _ => Ok(()),
    }
}

fn readable_by(
    state: &MemoryState,
    session: Option<&Session>,
    row_owner: &AccountId,
) -> Result<bool, BackendError> {
    Ok(session_owner(state, session)?.map_or(true, |owner| owner == row_owner))
}

fn email_key(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

fn issue_session(state: &mut MemoryState, account: &Account) -> Session {
    let access_token = Uuid::new_v4().simple().to_string();
    state
        .sessions
        .insert(access_token.clone(), account.id.clone());
    Session {
        account: account.clone(),
        access_token,
    }
}

#[async_trait]
impl Backend for InMemoryBackend {
    async fn create_account(
        &self,
        email: &str,
        password: &str,
        _metadata: &AccountMetadata,
    ) -> Result<AccountCreated, BackendError> {
        let mut state = self.begin(Operation::CreateAccount)?;

        if !email.contains('@') {
            return Err(BackendError::new(
                BackendErrorKind::InvalidEmail,
                "Unable to validate email address: invalid format",
            ));
        }
        if password.chars().count() < MIN_PASSWORD_CHARS {
            return Err(BackendError::new(
                BackendErrorKind::WeakPassword,
                "Password should be at least 6 characters",
            ));
        }

        let key = email_key(email);
        if state.accounts.contains_key(&key) {
            return Err(BackendError::new(
                BackendErrorKind::AlreadyRegistered,
                "User already registered",
            ));
        }

        state.next_account += 1;
        let account = Account {
            id: AccountId(format!("acct-{:06}", state.next_account)),
            email: email.trim().to_string(),
        };
        state.accounts.insert(
            key,
            StoredAccount {
                account: account.clone(),
                password: password.to_string(),
            },
        );
        let session = issue_session(&mut state, &account);

        Ok(AccountCreated {
            account,
            session: Some(session),
        })
    }

    async fn insert_profile(
        &self,
        profile: &ProfileRow,
        session: Option<&Session>,
    ) -> Result<(), BackendError> {
        let mut state = self.begin(Operation::InsertProfile)?;
        check_owner(&state, session, &profile.id, Table::Profiles)?;

        self.check_length(&profile.first_name, self.max_text_chars)?;
        self.check_length(&profile.last_name, self.max_text_chars)?;
        self.check_length(&profile.phone, self.max_phone_chars)?;

        if state.profiles.contains_key(&profile.id) {
            return Err(BackendError::new(
                BackendErrorKind::Conflict,
                "duplicate key value violates unique constraint \"user_profiles_pkey\"",
            ));
        }

        let mut row = profile.clone();
        row.created_at = Some(Utc::now());
        state.profiles.insert(row.id.clone(), row);
        Ok(())
    }

    async fn insert_application(
        &self,
        application: &ApplicationRow,
        session: Option<&Session>,
    ) -> Result<(), BackendError> {
        let mut state = self.begin(Operation::InsertApplication)?;
        check_owner(&state, session, &application.user_id, Table::Applications)?;

        for value in [
            &application.address,
            &application.school_university,
            &application.current_course,
        ] {
            self.check_length(value, self.max_text_chars)?;
        }

        if state.applications.contains_key(&application.user_id) {
            return Err(BackendError::new(
                BackendErrorKind::Conflict,
                "duplicate key value violates unique constraint \"bootcamp_applications_user_id_key\"",
            ));
        }

        let mut row = application.clone();
        row.submitted_at = Some(Utc::now());
        state.applications.insert(row.user_id.clone(), row);
        Ok(())
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, BackendError> {
        let mut state = self.begin(Operation::SignIn)?;

        let account = match state.accounts.get(&email_key(email)) {
            Some(stored) if stored.password == password => stored.account.clone(),
            _ => {
                return Err(BackendError::new(
                    BackendErrorKind::InvalidCredentials,
                    "Invalid login credentials",
                ))
            }
        };

        Ok(issue_session(&mut state, &account))
    }

    async fn sign_out(&self, session: &Session) -> Result<(), BackendError> {
        let mut state = self.begin(Operation::SignOut)?;
        state.sessions.remove(&session.access_token);
        Ok(())
    }

    async fn current_user(&self, session: &Session) -> Result<Option<Account>, BackendError> {
        let state = self.begin(Operation::CurrentUser)?;
        let Some(id) = state.sessions.get(&session.access_token) else {
            return Ok(None);
        };
        Ok(state
            .accounts
            .values()
            .find(|stored| &stored.account.id == id)
            .map(|stored| stored.account.clone()))
    }

    async fn fetch_profile(
        &self,
        id: &AccountId,
        session: Option<&Session>,
    ) -> Result<Option<ProfileRow>, BackendError> {
        let state = self.begin(Operation::FetchProfile)?;
        if !readable_by(&state, session, id)? {
            return Ok(None);
        }
        Ok(state.profiles.get(id).cloned())
    }

    async fn fetch_application(
        &self,
        user_id: &AccountId,
        session: Option<&Session>,
    ) -> Result<Option<ApplicationRow>, BackendError> {
        let state = self.begin(Operation::FetchApplication)?;
        if !readable_by(&state, session, user_id)? {
            return Ok(None);
        }
        Ok(state.applications.get(user_id).cloned())
    }
}
