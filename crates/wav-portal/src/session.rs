//! Explicit session state handed to the workflows that need to know who is signed in.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use axum::http::{header, HeaderMap};
use tracing::debug;

use crate::backend::{Account, AccountId, Backend, BackendError, Session};

/// Who the current client is, if anyone. Cloned out of the [`SessionStore`] per request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionContext {
    session: Option<Session>,
}

impl SessionContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn established(session: Session) -> Self {
        Self {
            session: Some(session),
        }
    }

    pub fn current(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn account(&self) -> Option<&Account> {
        self.session.as_ref().map(|session| &session.account)
    }

    pub fn account_id(&self) -> Option<&AccountId> {
        self.account().map(|account| &account.id)
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    /// Re-checks the session with the backend and drops it when the backend no longer
    /// recognises it.
    pub async fn refresh<B>(&mut self, backend: &B) -> Result<Option<&Account>, BackendError>
    where
        B: Backend + ?Sized,
    {
        let Some(session) = self.session.as_ref() else {
            return Ok(None);
        };

        match backend.current_user(session).await? {
            Some(account) => {
                if let Some(session) = self.session.as_mut() {
                    session.account = account;
                }
            }
            None => {
                debug!("backend no longer recognises session; clearing it");
                self.session = None;
            }
        }

        Ok(self.account())
    }

    /// Signs out remotely. Local state is cleared even when the remote call fails.
    pub async fn invalidate<B>(&mut self, backend: &B) -> Result<(), BackendError>
    where
        B: Backend + ?Sized,
    {
        match self.session.take() {
            Some(session) => backend.sign_out(&session).await,
            None => Ok(()),
        }
    }
}

/// Sessions issued to clients, keyed by their bearer token.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    sessions: Arc<Mutex<HashMap<String, Session>>>,
}

#[derive(Debug, thiserror::Error)]
#[error("session store unavailable")]
pub struct SessionStoreError;

impl SessionStore {
    /// Remembers the session and returns the token the client presents from now on.
    pub fn insert(&self, session: Session) -> Result<String, SessionStoreError> {
        let token = session.access_token.clone();
        self.map()?.insert(token.clone(), session);
        Ok(token)
    }

    pub fn context(&self, token: &str) -> Result<SessionContext, SessionStoreError> {
        Ok(self
            .map()?
            .get(token)
            .cloned()
            .map(SessionContext::established)
            .unwrap_or_default())
    }

    /// Writes a refreshed context back, forgetting the token once the context is anonymous.
    pub fn sync(&self, token: &str, context: &SessionContext) -> Result<(), SessionStoreError> {
        let mut map = self.map()?;
        match context.current() {
            Some(session) => {
                map.insert(token.to_string(), session.clone());
            }
            None => {
                map.remove(token);
            }
        }
        Ok(())
    }

    pub fn remove(&self, token: &str) -> Result<(), SessionStoreError> {
        self.map()?.remove(token);
        Ok(())
    }

    fn map(&self) -> Result<MutexGuard<'_, HashMap<String, Session>>, SessionStoreError> {
        self.sessions.lock().map_err(|_| SessionStoreError)
    }
}

/// Extracts the token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then(|| token.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{AccountMetadata, InMemoryBackend, Operation};
    use crate::workflows::registration::domain::Gender;
    use axum::http::HeaderValue;
    use chrono::NaiveDate;

    async fn signed_in(backend: &InMemoryBackend) -> Session {
        let metadata = AccountMetadata {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            phone: "+23276000000".to_string(),
            gender: Gender::Female,
            date_of_birth: NaiveDate::from_ymd_opt(1999, 12, 10).expect("valid date"),
        };
        backend
            .create_account("ada@example.com", "analytical", &metadata)
            .await
            .expect("account created");
        backend
            .sign_in("ada@example.com", "analytical")
            .await
            .expect("sign in succeeds")
    }

    #[tokio::test]
    async fn refresh_keeps_live_sessions() {
        let backend = InMemoryBackend::default();
        let session = signed_in(&backend).await;
        let mut context = SessionContext::established(session.clone());

        let account = context
            .refresh(&backend)
            .await
            .expect("refresh succeeds")
            .cloned();

        assert_eq!(account, Some(session.account));
        assert!(context.is_authenticated());
    }

    #[tokio::test]
    async fn refresh_drops_sessions_the_backend_forgot() {
        let backend = InMemoryBackend::default();
        let session = signed_in(&backend).await;
        backend.sign_out(&session).await.expect("remote sign out");

        let mut context = SessionContext::established(session);
        let account = context.refresh(&backend).await.expect("refresh succeeds");

        assert!(account.is_none());
        assert!(!context.is_authenticated());
    }

    #[tokio::test]
    async fn invalidate_signs_out_and_clears_state() {
        let backend = InMemoryBackend::default();
        let session = signed_in(&backend).await;
        let mut context = SessionContext::established(session.clone());

        context.invalidate(&backend).await.expect("sign out");

        assert!(!context.is_authenticated());
        assert_eq!(backend.calls(Operation::SignOut), 1);
        assert_eq!(backend.current_user(&session).await.expect("lookup"), None);
    }

    #[tokio::test]
    async fn anonymous_invalidate_skips_backend() {
        let backend = InMemoryBackend::default();
        let mut context = SessionContext::anonymous();

        context.invalidate(&backend).await.expect("no-op");

        assert_eq!(backend.calls(Operation::SignOut), 0);
    }

    #[tokio::test]
    async fn store_forgets_tokens_of_anonymous_contexts() {
        let backend = InMemoryBackend::default();
        let store = SessionStore::default();
        let token = store
            .insert(signed_in(&backend).await)
            .expect("store available");

        assert!(store.context(&token).expect("lookup").is_authenticated());

        store
            .sync(&token, &SessionContext::anonymous())
            .expect("store available");
        assert!(!store.context(&token).expect("lookup").is_authenticated());
    }

    #[test]
    fn bearer_token_requires_bearer_scheme() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer token-123"),
        );
        assert_eq!(bearer_token(&headers), Some("token-123".to_string()));
    }
}
