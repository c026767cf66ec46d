//! Signed-in student's view: profile, application review state and payment instructions.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use tracing::debug;

use super::login::{backend_error_response, store_error_response, unauthenticated_response};
use crate::backend::{Account, ApplicationRow, Backend, BackendError, ProfileRow};
use crate::session::{bearer_token, SessionContext};
use crate::state::PortalState;
use crate::workflows::registration::domain::ApplicationStatus;

pub const BOOTCAMP_FEE: &str = "Le 450.00";
pub const PAYMENT_METHOD: &str = "Orange Money";
pub const PAYMENT_RECIPIENT: &str = "232 75053663";

const PENDING_NOTICE: &str =
    "Your application is under review. You'll receive an email notification once it's processed.";
const APPROVED_NOTICE: &str = "Congratulations! Your application has been approved. \
     Please complete your payment to secure your spot.";

/// Banner text for an application state; rejected applications get none.
pub fn status_notice(status: ApplicationStatus) -> Option<&'static str> {
    match status {
        ApplicationStatus::Pending => Some(PENDING_NOTICE),
        ApplicationStatus::Approved => Some(APPROVED_NOTICE),
        ApplicationStatus::Rejected => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentInstructions {
    pub method: &'static str,
    pub amount: &'static str,
    pub recipient: &'static str,
    pub reference: String,
}

impl PaymentInstructions {
    pub fn for_payer(name: &str) -> Self {
        Self {
            method: PAYMENT_METHOD,
            amount: BOOTCAMP_FEE,
            recipient: PAYMENT_RECIPIENT,
            reference: format!("{name} Bootcamp Fee"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardView {
    pub welcome: String,
    pub account: Account,
    pub profile: Option<ProfileRow>,
    pub application: Option<ApplicationRow>,
    pub status: ApplicationStatus,
    pub status_notice: Option<&'static str>,
    pub payment: PaymentInstructions,
}

impl DashboardView {
    fn assemble(
        account: Account,
        profile: Option<ProfileRow>,
        application: Option<ApplicationRow>,
    ) -> Self {
        let welcome = match &profile {
            Some(profile) => format!("Welcome, {}!", profile.first_name),
            None => "Welcome!".to_string(),
        };
        let payer = profile
            .as_ref()
            .map(ProfileRow::full_name)
            .unwrap_or_else(|| account.email.clone());
        // A signed-in student without a stored row has not been reviewed yet.
        let status = application
            .as_ref()
            .map(|row| row.application_status)
            .unwrap_or(ApplicationStatus::Pending);

        Self {
            welcome,
            account,
            profile,
            application,
            status,
            status_notice: status_notice(status),
            payment: PaymentInstructions::for_payer(&payer),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DashboardError {
    #[error("not signed in")]
    Unauthenticated,
    #[error("failed to load dashboard: {0}")]
    Backend(#[from] BackendError),
}

pub struct DashboardService<B> {
    backend: Arc<B>,
}

impl<B> Clone for DashboardService<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
        }
    }
}

impl<B> DashboardService<B>
where
    B: Backend + 'static,
{
    pub fn new(backend: Arc<B>) -> Self {
        Self { backend }
    }

    /// Confirms the session, then reads the student's profile and application rows.
    pub async fn load(
        &self,
        context: &mut SessionContext,
    ) -> Result<DashboardView, DashboardError> {
        let account = context
            .refresh(self.backend.as_ref())
            .await?
            .cloned()
            .ok_or(DashboardError::Unauthenticated)?;

        let session = context.current();
        let profile = self.backend.fetch_profile(&account.id, session).await?;
        let application = self
            .backend
            .fetch_application(&account.id, session)
            .await?;
        debug!(
            account_id = %account.id,
            has_profile = profile.is_some(),
            has_application = application.is_some(),
            "dashboard loaded"
        );

        Ok(DashboardView::assemble(account, profile, application))
    }
}

pub fn dashboard_router<B>(state: PortalState<B>) -> Router
where
    B: Backend + 'static,
{
    Router::new()
        .route("/api/v1/dashboard", get(dashboard_handler::<B>))
        .with_state(state)
}

pub(crate) async fn dashboard_handler<B>(
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

    let loaded = state.dashboard().load(&mut context).await;
    if let Err(err) = state.sessions.sync(&token, &context) {
        return store_error_response(err);
    }

    match loaded {
        Ok(view) => (StatusCode::OK, Json(json!({ "dashboard": view }))).into_response(),
        Err(DashboardError::Unauthenticated) => unauthenticated_response(),
        Err(DashboardError::Backend(err)) => backend_error_response(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{AccountMetadata, InMemoryBackend, Operation};
    use crate::workflows::registration::domain::{EducationLevel, Gender, ProgrammingExperience};
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request};
    use chrono::NaiveDate;
    use serde_json::Value;
    use tower::ServiceExt;

    async fn enrolled(backend: &InMemoryBackend, with_application: bool) -> SessionContext {
        let metadata = AccountMetadata {
            first_name: "Isatu".to_string(),
            last_name: "Conteh".to_string(),
            phone: "+23278123000".to_string(),
            gender: Gender::Female,
            date_of_birth: NaiveDate::from_ymd_opt(2003, 1, 30).expect("valid date"),
        };
        let created = backend
            .create_account("isatu@example.com", "kissy-road", &metadata)
            .await
            .expect("account created");
        let id = created.account.id.clone();
        let session = created.session.expect("session issued");
        backend
            .insert_profile(
                &ProfileRow {
                    id: id.clone(),
                    first_name: metadata.first_name,
                    last_name: metadata.last_name,
                    phone: metadata.phone,
                    gender: metadata.gender,
                    date_of_birth: metadata.date_of_birth,
                    created_at: None,
                },
                Some(&session),
            )
            .await
            .expect("profile stored");
        if with_application {
            backend
                .insert_application(
                    &ApplicationRow {
                        user_id: id,
                        address: "Kissy Road, Freetown".to_string(),
                        school_university: "Njala University".to_string(),
                        current_course: "Information Systems".to_string(),
                        education_level: EducationLevel::Diploma,
                        programming_experience: ProgrammingExperience::Intermediate,
                        web_dev_challenges: "State management".to_string(),
                        bootcamp_goals: "Freelance as a web developer".to_string(),
                        previous_projects: Some("School results portal".to_string()),
                        has_laptop: true,
                        availability_confirmed: true,
                        terms_agreed: true,
                        application_status: ApplicationStatus::Pending,
                        submitted_at: None,
                    },
                    Some(&session),
                )
                .await
                .expect("application stored");
        }
        SessionContext::established(session)
    }

    #[tokio::test]
    async fn anonymous_context_is_unauthenticated() {
        let backend = Arc::new(InMemoryBackend::default());
        let service = DashboardService::new(Arc::clone(&backend));

        let err = service
            .load(&mut SessionContext::anonymous())
            .await
            .expect_err("needs a session");

        assert_eq!(err, DashboardError::Unauthenticated);
        assert_eq!(backend.calls(Operation::FetchProfile), 0);
    }

    #[tokio::test]
    async fn pending_application_shows_review_notice() {
        let backend = Arc::new(InMemoryBackend::default());
        let mut context = enrolled(&backend, true).await;
        let service = DashboardService::new(Arc::clone(&backend));

        let view = service.load(&mut context).await.expect("dashboard loads");

        assert_eq!(view.welcome, "Welcome, Isatu!");
        assert_eq!(view.status, ApplicationStatus::Pending);
        assert_eq!(view.status_notice, Some(PENDING_NOTICE));
        assert_eq!(view.payment.reference, "Isatu Conteh Bootcamp Fee");
        assert_eq!(view.payment.amount, "Le 450.00");
        assert_eq!(view.payment.recipient, "232 75053663");
        assert_eq!(
            view.application.expect("application loaded").school_university,
            "Njala University"
        );
    }

    #[tokio::test]
    async fn approval_changes_the_notice() {
        let backend = Arc::new(InMemoryBackend::default());
        let mut context = enrolled(&backend, true).await;
        let account_id = context.account_id().cloned().expect("signed in");
        backend
            .set_application_status(&account_id, ApplicationStatus::Approved)
            .expect("status updated");

        let view = DashboardService::new(Arc::clone(&backend))
            .load(&mut context)
            .await
            .expect("dashboard loads");

        assert_eq!(view.status, ApplicationStatus::Approved);
        assert_eq!(view.status_notice, Some(APPROVED_NOTICE));
    }

    #[test]
    fn rejected_applications_have_no_notice() {
        assert_eq!(status_notice(ApplicationStatus::Rejected), None);
    }

    #[tokio::test]
    async fn missing_application_reads_as_pending() {
        let backend = Arc::new(InMemoryBackend::default());
        let mut context = enrolled(&backend, false).await;

        let view = DashboardService::new(Arc::clone(&backend))
            .load(&mut context)
            .await
            .expect("dashboard loads");

        assert_eq!(view.application, None);
        assert_eq!(view.status, ApplicationStatus::Pending);
    }

    #[tokio::test]
    async fn fetch_failures_surface_as_backend_errors() {
        let backend = Arc::new(InMemoryBackend::default());
        let mut context = enrolled(&backend, true).await;
        backend.fail_next(
            Operation::FetchApplication,
            BackendError::unavailable("connection reset"),
        );

        let err = DashboardService::new(Arc::clone(&backend))
            .load(&mut context)
            .await
            .expect_err("fetch failed");

        assert!(matches!(err, DashboardError::Backend(_)));
        assert!(context.is_authenticated());
    }

    #[tokio::test]
    async fn route_requires_a_known_bearer_token() {
        let backend = Arc::new(InMemoryBackend::default());
        let context = enrolled(&backend, true).await;
        let state = PortalState::new(Arc::clone(&backend));
        let token = state
            .sessions
            .insert(context.current().cloned().expect("session"))
            .expect("store available");
        let router = dashboard_router(state);

        let response = router
            .clone()
            .oneshot(
                Request::get("/api/v1/dashboard")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("route responds");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = router
            .oneshot(
                Request::get("/api/v1/dashboard")
                    .header(header::AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("route responds");
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), 64 * 1024)
            .await
            .expect("body bytes");
        let body: Value = serde_json::from_slice(&bytes).expect("json body");
        assert_eq!(body["dashboard"]["status"], json!("pending"));
        assert_eq!(body["dashboard"]["payment"]["method"], json!("Orange Money"));
    }
}
