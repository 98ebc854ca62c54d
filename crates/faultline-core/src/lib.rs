//! # Faultline Core
//!
//! The domain layer of Faultline.
//! This crate holds the notice model, ignore patterns, per-request context and
//! the `Notifier` port. It has no HTTP or I/O dependencies.

pub mod config;
pub mod domain;
pub mod error;
pub mod ports;

pub use config::ReporterConfig;
pub use error::{ConfigError, NotifierError};
