pub mod dashboard;
pub mod login;
pub mod program;
pub mod registration;
