//! Middleware modules.

pub mod error;
pub mod error_report;

pub use error_report::{ErrorContext, ErrorReporting, error_id};
