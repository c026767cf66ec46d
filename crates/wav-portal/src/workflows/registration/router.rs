use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use serde_json::json;
use tracing::error;
use uuid::Uuid;

use super::domain::{ApplicationPatch, IdentityPatch};
use super::service::{Prepared, RegistrationError, StepOutcome};
use super::store::{lock_wizard, RegistrationId, SharedWizard};
use super::validation::{ErrorMap, GENERAL_KEY};
use crate::backend::Backend;
use crate::state::PortalState;

/// Router builder exposing the two-step registration wizard.
pub fn registration_router<B>(state: PortalState<B>) -> Router
where
    B: Backend + 'static,
{
    Router::new()
        .route("/api/v1/registrations", post(start_handler::<B>))
        .route(
            "/api/v1/registrations/:registration_id",
            get(view_handler::<B>),
        )
        .route(
            "/api/v1/registrations/:registration_id/identity",
            patch(edit_identity_handler::<B>),
        )
        .route(
            "/api/v1/registrations/:registration_id/application",
            patch(edit_application_handler::<B>),
        )
        .route(
            "/api/v1/registrations/:registration_id/identity/submit",
            post(submit_identity_handler::<B>),
        )
        .route(
            "/api/v1/registrations/:registration_id/application/submit",
            post(submit_application_handler::<B>),
        )
        .route(
            "/api/v1/registrations/:registration_id/back",
            post(previous_step_handler::<B>),
        )
        .with_state(state)
}

pub(crate) async fn start_handler<B>(State(state): State<PortalState<B>>) -> Response
where
    B: Backend + 'static,
{
    let created = state.wizards.create().and_then(|(id, wizard)| {
        let view = lock_wizard(&wizard)?.view();
        Ok((id, view))
    });

    match created {
        Ok((id, view)) => (
            StatusCode::CREATED,
            Json(json!({
                "registration_id": id,
                "step": view.step,
                "wizard": view,
            })),
        )
            .into_response(),
        Err(err) => registration_error_response(err),
    }
}

pub(crate) async fn view_handler<B>(
    State(state): State<PortalState<B>>,
    Path(registration_id): Path<Uuid>,
) -> Response
where
    B: Backend + 'static,
{
    let id = RegistrationId(registration_id);
    let view = state.wizards.get(&id).and_then(|wizard| {
        let guard = lock_wizard(&wizard)?;
        Ok(guard.view())
    });

    match view {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(err) => registration_error_response(err),
    }
}

pub(crate) async fn edit_identity_handler<B>(
    State(state): State<PortalState<B>>,
    Path(registration_id): Path<Uuid>,
    Json(patch): Json<IdentityPatch>,
) -> Response
where
    B: Backend + 'static,
{
    let id = RegistrationId(registration_id);
    let view = state.wizards.get(&id).and_then(|wizard| {
        let mut guard = lock_wizard(&wizard)?;
        guard.edit_identity(patch);
        Ok(guard.view())
    });

    match view {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(err) => registration_error_response(err),
    }
}

pub(crate) async fn edit_application_handler<B>(
    State(state): State<PortalState<B>>,
    Path(registration_id): Path<Uuid>,
    Json(patch): Json<ApplicationPatch>,
) -> Response
where
    B: Backend + 'static,
{
    let id = RegistrationId(registration_id);
    let view = state.wizards.get(&id).and_then(|wizard| {
        let mut guard = lock_wizard(&wizard)?;
        guard.edit_application(patch);
        Ok(guard.view())
    });

    match view {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(err) => registration_error_response(err),
    }
}

pub(crate) async fn previous_step_handler<B>(
    State(state): State<PortalState<B>>,
    Path(registration_id): Path<Uuid>,
) -> Response
where
    B: Backend + 'static,
{
    let id = RegistrationId(registration_id);
    let view = state.wizards.get(&id).and_then(|wizard| {
        let mut guard = lock_wizard(&wizard)?;
        guard.previous_step();
        Ok(guard.view())
    });

    match view {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(err) => registration_error_response(err),
    }
}

pub(crate) async fn submit_identity_handler<B>(
    State(state): State<PortalState<B>>,
    Path(registration_id): Path<Uuid>,
) -> Response
where
    B: Backend + 'static,
{
    let id = RegistrationId(registration_id);
    let wizard = match state.wizards.get(&id) {
        Ok(wizard) => wizard,
        Err(err) => return registration_error_response(err),
    };

    let service = state.registration();
    let prepared = lock_wizard(&wizard).and_then(|mut guard| service.prepare_identity(&mut guard));

    let outcome = match prepared {
        Ok(Prepared::Settled(outcome)) => outcome,
        Ok(Prepared::Ready(submission)) => {
            // The remote phase runs on its own task so a dropped client cannot strand the
            // wizard in the loading state.
            let task_wizard = Arc::clone(&wizard);
            let task = tokio::spawn(async move {
                let attempt = service.execute_identity(submission).await;
                let mut guard = lock_wizard(&task_wizard)?;
                Ok::<_, RegistrationError>(service.apply_identity(&mut guard, attempt))
            });
            match join_submission(task).await {
                Ok(outcome) => outcome,
                Err(err) => return registration_error_response(err),
            }
        }
        Err(err) => return registration_error_response(err),
    };

    match outcome {
        StepOutcome::Advanced(cursor) => {
            let session_token = match issue_session_token(&state, &wizard) {
                Ok(token) => token,
                Err(err) => return registration_error_response(err),
            };
            (
                StatusCode::OK,
                Json(json!({
                    "step": cursor,
                    "session_token": session_token,
                })),
            )
                .into_response()
        }
        other => outcome_response(other),
    }
}

pub(crate) async fn submit_application_handler<B>(
    State(state): State<PortalState<B>>,
    Path(registration_id): Path<Uuid>,
) -> Response
where
    B: Backend + 'static,
{
    let id = RegistrationId(registration_id);
    let wizard = match state.wizards.get(&id) {
        Ok(wizard) => wizard,
        Err(err) => return registration_error_response(err),
    };

    let service = state.registration();
    let prepared =
        lock_wizard(&wizard).and_then(|mut guard| service.prepare_application(&mut guard));

    let outcome = match prepared {
        Ok(Prepared::Settled(outcome)) => outcome,
        Ok(Prepared::Ready(submission)) => {
            let task_wizard = Arc::clone(&wizard);
            let task = tokio::spawn(async move {
                let attempt = service.execute_application(submission).await;
                let mut guard = lock_wizard(&task_wizard)?;
                Ok::<_, RegistrationError>(service.apply_application(&mut guard, attempt))
            });
            match join_submission(task).await {
                Ok(outcome) => outcome,
                Err(err) => return registration_error_response(err),
            }
        }
        Err(err) => return registration_error_response(err),
    };

    if matches!(outcome, StepOutcome::Completed { .. }) {
        if let Err(err) = state.wizards.remove(&id) {
            return registration_error_response(err);
        }
    }

    outcome_response(outcome)
}

async fn join_submission(
    task: tokio::task::JoinHandle<Result<StepOutcome, RegistrationError>>,
) -> Result<StepOutcome, RegistrationError> {
    match task.await {
        Ok(result) => result,
        Err(err) => {
            error!(error = %err, "registration submission task failed");
            Err(RegistrationError::StatePoisoned)
        }
    }
}

/// Hands the session captured at sign-up to the session store.
fn issue_session_token<B>(
    state: &PortalState<B>,
    wizard: &SharedWizard,
) -> Result<Option<String>, RegistrationError> {
    let session = lock_wizard(wizard)?.session().cloned();
    match session {
        Some(session) => state
            .sessions
            .insert(session)
            .map(Some)
            .map_err(|_| RegistrationError::StatePoisoned),
        None => Ok(None),
    }
}

fn outcome_response(outcome: StepOutcome) -> Response {
    match outcome {
        StepOutcome::Advanced(cursor) => {
            (StatusCode::OK, Json(json!({ "step": cursor }))).into_response()
        }
        StepOutcome::Blocked(errors) => blocked_response(errors),
        StepOutcome::Completed { redirect } => {
            (StatusCode::OK, Json(json!({ "redirect": redirect }))).into_response()
        }
        StepOutcome::Refused => StatusCode::NO_CONTENT.into_response(),
    }
}

/// Field errors are the client's to fix; a general message means the backend refused.
fn blocked_response(errors: ErrorMap) -> Response {
    let status = if errors.contains(GENERAL_KEY) {
        StatusCode::BAD_GATEWAY
    } else {
        StatusCode::UNPROCESSABLE_ENTITY
    };
    (status, Json(json!({ "errors": errors }))).into_response()
}

fn registration_error_response(err: RegistrationError) -> Response {
    let status = match err {
        RegistrationError::NotFound => StatusCode::NOT_FOUND,
        RegistrationError::InFlight | RegistrationError::WrongStep { .. } => StatusCode::CONFLICT,
        RegistrationError::StatePoisoned => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(json!({ "error": err.to_string() }))).into_response()
}
