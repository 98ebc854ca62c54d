//! Notifier implementations - webhook delivery, log-only and in-memory.

mod logging;
mod memory;

#[cfg(feature = "webhook")]
mod webhook;

pub use logging::TracingNotifier;
pub use memory::InMemoryNotifier;

#[cfg(feature = "webhook")]
pub use webhook::{WebhookConfig, WebhookNotifier};
