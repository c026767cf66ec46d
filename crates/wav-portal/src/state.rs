use std::sync::Arc;
use std::time::Duration;

use axum::Router;

use crate::backend::Backend;
use crate::session::SessionStore;
use crate::workflows::dashboard::{dashboard_router, DashboardService};
use crate::workflows::login::{login_router, LoginService};
use crate::workflows::registration::{
    registration_router, RegistrationService, WizardStore, DEFAULT_WIZARD_TTL,
};

/// Everything the portal routes share: the backend handle, live wizards and issued sessions.
pub struct PortalState<B> {
    pub backend: Arc<B>,
    pub wizards: WizardStore,
    pub sessions: SessionStore,
}

impl<B> Clone for PortalState<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            wizards: self.wizards.clone(),
            sessions: self.sessions.clone(),
        }
    }
}

impl<B> PortalState<B>
where
    B: Backend + 'static,
{
    pub fn new(backend: Arc<B>) -> Self {
        Self::with_wizard_ttl(backend, DEFAULT_WIZARD_TTL)
    }

    /// Builds the state with a custom idle limit for unfinished registrations.
    pub fn with_wizard_ttl(backend: Arc<B>, wizard_ttl: Duration) -> Self {
        Self {
            backend,
            wizards: WizardStore::with_ttl(wizard_ttl),
            sessions: SessionStore::default(),
        }
    }

    pub fn registration(&self) -> RegistrationService<B> {
        RegistrationService::new(Arc::clone(&self.backend))
    }

    pub fn login(&self) -> LoginService<B> {
        LoginService::new(Arc::clone(&self.backend))
    }

    pub fn dashboard(&self) -> DashboardService<B> {
        DashboardService::new(Arc::clone(&self.backend))
    }
}

/// All student-facing routes: registration wizard, session and dashboard.
pub fn portal_router<B>(state: PortalState<B>) -> Router
where
    B: Backend + 'static,
{
    registration_router(state.clone())
        .merge(login_router(state.clone()))
        .merge(dashboard_router(state))
}
