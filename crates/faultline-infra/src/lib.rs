//! # Faultline Infrastructure
//!
//! Concrete implementations of the `Notifier` port defined in `faultline-core`.
//!
//! ## Feature Flags
//!
//! - `webhook` (default) - HTTP delivery via reqwest

pub mod notifier;

// Re-exports
pub use notifier::{InMemoryNotifier, TracingNotifier};

#[cfg(feature = "webhook")]
pub use notifier::{WebhookConfig, WebhookNotifier};
