//! Registration, login and student dashboard service for the Code with WAV bootcamp.
//!
//! Accounts and rows live in a hosted backend reached through [`backend::Backend`]; this
//! crate owns the workflows, their validation and the HTTP routes in front of them.

pub mod backend;
pub mod config;
pub mod error;
pub mod navigation;
pub mod session;
pub mod state;
pub mod telemetry;
pub mod workflows;

pub use state::{portal_router, PortalState};
