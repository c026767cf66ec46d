//! Email and password sign-in, plus the session endpoints built on it.

use std::fmt;
use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use crate::backend::{Account, Backend, BackendError, BackendErrorKind, Session};
use crate::navigation::Page;
use crate::session::{bearer_token, SessionContext, SessionStoreError};
use crate::state::PortalState;

#[derive(Clone, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoginError {
    #[error("Please fill in all fields")]
    MissingFields,
    #[error("Please enter a valid email address")]
    InvalidEmail,
    /// The provider refused the sign-in; its message is shown as-is.
    #[error("{0}")]
    Rejected(BackendError),
}

/// Cheap local checks run before the provider is contacted.
pub fn validate_credentials(credentials: &Credentials) -> Result<(), LoginError> {
    if credentials.email.is_empty() || credentials.password.is_empty() {
        return Err(LoginError::MissingFields);
    }
    if !credentials.email.contains('@') {
        return Err(LoginError::InvalidEmail);
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginSuccess {
    pub session: Session,
    /// Where the client goes next; `None` when a login callback took over.
    pub redirect: Option<Page>,
}

pub type LoginCallback<'a> = &'a (dyn Fn(&Credentials) + Sync);

pub struct LoginService<B> {
    backend: Arc<B>,
}

impl<B> Clone for LoginService<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
        }
    }
}

impl<B> LoginService<B>
where
    B: Backend + 'static,
{
    pub fn new(backend: Arc<B>) -> Self {
        Self { backend }
    }

    /// Signs in. A supplied callback replaces the default redirect to the dashboard.
    pub async fn submit(
        &self,
        credentials: &Credentials,
        on_login: Option<LoginCallback<'_>>,
    ) -> Result<LoginSuccess, LoginError> {
        validate_credentials(credentials)?;

        let session = self
            .backend
            .sign_in(&credentials.email, &credentials.password)
            .await
            .map_err(|err| {
                warn!(kind = ?err.kind, error = %err, "sign in rejected");
                LoginError::Rejected(err)
            })?;
        info!(account_id = %session.account.id, "signed in");

        let redirect = match on_login {
            Some(callback) => {
                callback(credentials);
                None
            }
            None => Some(Page::Dashboard),
        };
        Ok(LoginSuccess { session, redirect })
    }

    /// Account behind the context, after confirming it with the backend.
    pub async fn current(
        &self,
        context: &mut SessionContext,
    ) -> Result<Option<Account>, BackendError> {
        Ok(context.refresh(self.backend.as_ref()).await?.cloned())
    }

    /// Ends the session and names the page the client lands on.
    pub async fn sign_out(&self, context: &mut SessionContext) -> Result<Page, BackendError> {
        if let Some(account_id) = context.account_id() {
            info!(%account_id, "signing out");
        }
        context.invalidate(self.backend.as_ref()).await?;
        Ok(Page::Landing)
    }
}

pub fn login_router<B>(state: PortalState<B>) -> Router
where
    B: Backend + 'static,
{
    Router::new()
        .route(
            "/api/v1/session",
            post(login_handler::<B>)
                .get(session_handler::<B>)
                .delete(logout_handler::<B>),
        )
        .with_state(state)
}

pub(crate) async fn login_handler<B>(
    State(state): State<PortalState<B>>,
    Json(credentials): Json<Credentials>,
) -> Response
where
    B: Backend + 'static,
{
    let success = match state.login().submit(&credentials, None).await {
        Ok(success) => success,
        Err(err) => return login_error_response(err),
    };

    let account = success.session.account.clone();
    match state.sessions.insert(success.session) {
        Ok(token) => (
            StatusCode::OK,
            Json(json!({
                "session_token": token,
                "account": account,
                "redirect": success.redirect,
            })),
        )
            .into_response(),
        Err(err) => store_error_response(err),
    }
}

pub(crate) async fn session_handler<B>(
    State(state): State<PortalState<B>>,
    headers: HeaderMap,
) -> Response
where
    B: Backend + 'static,
{
    let Some(token) = bearer_token(&headers) else {
        return unauthenticated_response();
    };
    let mut context = match state.sessions.context(&token) {
        Ok(context) => context,
        Err(err) => return store_error_response(err),
    };

    let account = match state.login().current(&mut context).await {
        Ok(account) => account,
        Err(err) => return backend_error_response(err),
    };
    if let Err(err) = state.sessions.sync(&token, &context) {
        return store_error_response(err);
    }

    match account {
        Some(account) => (StatusCode::OK, Json(json!({ "account": account }))).into_response(),
        None => unauthenticated_response(),
    }
}

pub(crate) async fn logout_handler<B>(
    State(state): State<PortalState<B>>,
    headers: HeaderMap,
) -> Response
where
    B: Backend + 'static,
{
    let Some(token) = bearer_token(&headers) else {
        return (StatusCode::OK, Json(json!({ "redirect": Page::Landing }))).into_response();
    };
    let mut context = match state.sessions.context(&token) {
        Ok(context) => context,
        Err(err) => return store_error_response(err),
    };

    let redirect = match state.login().sign_out(&mut context).await {
        Ok(page) => page,
        Err(err) => {
            // Local state is already gone; the client still leaves.
            warn!(kind = ?err.kind, error = %err, "remote sign out failed");
            Page::Landing
        }
    };
    if let Err(err) = state.sessions.remove(&token) {
        return store_error_response(err);
    }

    (StatusCode::OK, Json(json!({ "redirect": redirect }))).into_response()
}

fn login_error_response(err: LoginError) -> Response {
    let status = match &err {
        LoginError::MissingFields | LoginError::InvalidEmail => StatusCode::BAD_REQUEST,
        LoginError::Rejected(inner) if inner.kind == BackendErrorKind::Unavailable => {
            StatusCode::BAD_GATEWAY
        }
        LoginError::Rejected(_) => StatusCode::UNAUTHORIZED,
    };
    (status, Json(json!({ "error": err.to_string() }))).into_response()
}

pub(crate) fn unauthenticated_response() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "error": "not signed in", "redirect": Page::Login })),
    )
        .into_response()
}

pub(crate) fn backend_error_response(err: BackendError) -> Response {
    warn!(kind = ?err.kind, error = %err, "backend call failed");
    (
        StatusCode::BAD_GATEWAY,
        Json(json!({ "error": err.to_string() })),
    )
        .into_response()
}

pub(crate) fn store_error_response(err: SessionStoreError) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": err.to_string() })),
    )
        .into_response()
}
