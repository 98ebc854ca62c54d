//! Request-side state the reporting middleware reads and writes.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Value, json};

use super::notice::{ReportId, ReportableError};

/// Serializable copy of the request attribute bag.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RequestSnapshot {
    pub method: String,
    pub uri: String,
    pub path: String,
    pub query_string: String,
    pub version: String,
    pub headers: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peer_addr: Option<String>,
    pub match_info: BTreeMap<String, String>,
}

impl RequestSnapshot {
    /// Default request data when no controller provides its own.
    pub fn into_payload(self) -> Value {
        json!({ "raw_request": self })
    }
}

/// Capability of producing rich diagnostic data about the current request.
pub trait RequestDiagnostics: Send + Sync {
    fn request_data(&self) -> Value;
}

/// The controller a downstream layer handled the request with, if any.
///
/// Handlers insert this into the request extensions. Only the
/// `Diagnostics` variant changes what gets reported.
#[derive(Clone, Default)]
pub enum Controller {
    #[default]
    None,
    Plain,
    Diagnostics(Arc<dyn RequestDiagnostics>),
}

impl Controller {
    pub fn diagnostics(diagnostics: impl RequestDiagnostics + 'static) -> Self {
        Self::Diagnostics(Arc::new(diagnostics))
    }

    /// Build the request data for a notice.
    ///
    /// The snapshot is only taken when the controller can't describe the
    /// request itself.
    pub fn request_payload<F>(controller: Option<&Controller>, snapshot: F) -> Value
    where
        F: FnOnce() -> RequestSnapshot,
    {
        match controller {
            Some(Controller::Diagnostics(diagnostics)) => diagnostics.request_data(),
            Some(Controller::None) | Some(Controller::Plain) | None => snapshot().into_payload(),
        }
    }
}

impl fmt::Debug for Controller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Controller::None => f.write_str("Controller::None"),
            Controller::Plain => f.write_str("Controller::Plain"),
            Controller::Diagnostics(_) => f.write_str("Controller::Diagnostics(..)"),
        }
    }
}

/// Error stored by a dispatch layer that rescued it instead of propagating.
#[derive(Debug, Clone)]
pub struct DispatchException(pub ReportableError);

/// Error stored by the transport layer.
#[derive(Debug, Clone)]
pub struct TransportException(pub ReportableError);

/// Error stored by a handler that rendered its own error page.
#[derive(Debug, Clone)]
pub struct HandlerError(pub ReportableError);

/// Where an in-band error was found, in lookup priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InBandSource {
    Dispatch,
    Transport,
    Handler,
}

impl InBandSource {
    pub const PRIORITY: [InBandSource; 3] = [Self::Dispatch, Self::Transport, Self::Handler];

    pub fn key(&self) -> &'static str {
        match self {
            Self::Dispatch => "framework-dispatch-exception",
            Self::Transport => "transport-exception",
            Self::Handler => "lightweight-framework-error",
        }
    }
}

impl fmt::Display for InBandSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Report id attached to a request after its error was reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorId(pub ReportId);

#[cfg(test)]
mod tests {
    use super::*;

    struct CheckoutController;

    impl RequestDiagnostics for CheckoutController {
        fn request_data(&self) -> Value {
            json!({ "controller": "checkout", "action": "pay" })
        }
    }

    fn snapshot() -> RequestSnapshot {
        RequestSnapshot {
            method: "GET".to_string(),
            path: "/orders".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_payload_falls_back_to_raw_request() {
        for controller in [None, Some(Controller::None), Some(Controller::Plain)] {
            let payload = Controller::request_payload(controller.as_ref(), snapshot);
            assert_eq!(payload["raw_request"]["path"], "/orders");
            assert_eq!(payload.as_object().map(|o| o.len()), Some(1));
        }
    }

    #[test]
    fn test_payload_uses_controller_diagnostics_verbatim() {
        let controller = Controller::diagnostics(CheckoutController);
        let payload = Controller::request_payload(Some(&controller), || {
            panic!("snapshot must not be taken")
        });
        assert_eq!(payload, json!({ "controller": "checkout", "action": "pay" }));
    }

    #[test]
    fn test_in_band_priority_keys() {
        let keys: Vec<_> = InBandSource::PRIORITY.iter().map(|s| s.key()).collect();
        assert_eq!(
            keys,
            [
                "framework-dispatch-exception",
                "transport-exception",
                "lightweight-framework-error"
            ]
        );
    }
}
