//! Log-only notifier - writes notices to the tracing pipeline.

use async_trait::async_trait;

use faultline_core::NotifierError;
use faultline_core::domain::{ErrorNotice, ReportId};
use faultline_core::ports::Notifier;

/// Notifier that emits each notice as an ERROR event (for development).
#[derive(Debug, Default)]
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn notify(&self, notice: ErrorNotice) -> Result<Option<ReportId>, NotifierError> {
        let id = ReportId::generate();
        let request = serde_json::to_string(&notice.request)
            .map_err(|e| NotifierError::Serialization(e.to_string()))?;

        tracing::error!(
            report_id = %id,
            class = %notice.error.class,
            status = ?notice.error.status,
            framework = notice.framework.as_deref().unwrap_or("unknown"),
            context_keys = notice.context.len(),
            request = %request,
            "{}",
            notice.error.message
        );

        Ok(Some(id))
    }
}
