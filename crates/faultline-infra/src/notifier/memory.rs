//! In-memory notifier - records notices instead of sending them.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use faultline_core::NotifierError;
use faultline_core::domain::{ErrorNotice, ReportId};
use faultline_core::ports::Notifier;

/// Notifier that keeps every notice in memory.
///
/// Useful in development and tests. Data is lost on process restart.
#[derive(Default)]
pub struct InMemoryNotifier {
    notices: RwLock<Vec<(ReportId, ErrorNotice)>>,
    failing: AtomicBool,
}

impl InMemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// A notifier whose deliveries all fail with a transport error.
    pub fn failing() -> Self {
        let notifier = Self::new();
        notifier.set_failing(true);
        notifier
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Recorded notices with the ids handed out for them.
    pub async fn notices(&self) -> Vec<(ReportId, ErrorNotice)> {
        self.notices.read().await.clone()
    }

    pub async fn count(&self) -> usize {
        self.notices.read().await.len()
    }
}

#[async_trait]
impl Notifier for InMemoryNotifier {
    async fn notify(&self, notice: ErrorNotice) -> Result<Option<ReportId>, NotifierError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(NotifierError::Transport("notifier unavailable".to_string()));
        }

        let id = ReportId::generate();
        self.notices.write().await.push((id.clone(), notice));
        Ok(Some(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use faultline_core::domain::ReportableError;

    fn notice() -> ErrorNotice {
        ErrorNotice::new(
            ReportableError::new("RuntimeError", "boom"),
            serde_json::Value::Null,
        )
    }

    #[tokio::test]
    async fn test_records_notices() {
        let notifier = InMemoryNotifier::new();
        let id = notifier.notify(notice()).await.unwrap().unwrap();

        let notices = notifier.notices().await;
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].0, id);
        assert_eq!(notices[0].1.error.message, "boom");
    }

    #[tokio::test]
    async fn test_failing_mode() {
        let notifier = InMemoryNotifier::failing();
        let result = notifier.notify(notice()).await;
        assert!(matches!(result, Err(NotifierError::Transport(_))));
        assert_eq!(notifier.count().await, 0);
    }
}
