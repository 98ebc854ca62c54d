use async_trait::async_trait;

use crate::domain::{ErrorNotice, ReportId};
use crate::error::NotifierError;

/// Notifier trait - abstraction over error tracking backends.
///
/// May be called zero or more times per request.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver a notice.
    ///
    /// Returns `Ok(None)` when the notifier decided to ignore it.
    async fn notify(&self, notice: ErrorNotice) -> Result<Option<ReportId>, NotifierError>;
}
