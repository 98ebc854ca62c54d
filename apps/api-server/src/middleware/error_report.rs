//! Error reporting middleware - reports unhandled errors and re-raises them.
//!
//! Errors are observed on three paths:
//!
//! - the inner service returns `Err`,
//! - the inner service panics,
//! - the inner service returns a response but left an in-band error behind
//!   (a request extension, or a handler error the framework rendered into the
//!   response).
//!
//! Qualifying errors go to the configured [`Notifier`]; the caller always gets
//! the original response, error or panic back unchanged. The per-request
//! [`RequestContext`] is cleared on every exit path.
//!
//! No `HttpRequest` handle is kept while the inner service runs: the router
//! needs the only reference to resolve path parameters. Whatever the raised
//! and panic paths need is captured up front or shared through a [`ReportSlot`].

use actix_web::{
    Error, FromRequest, HttpMessage, HttpRequest,
    dev::{Payload, Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
    http::header,
};
use futures::FutureExt;
use std::cell::RefCell;
use std::future::{Future, Ready, ready};
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::rc::Rc;
use std::sync::Arc;

use faultline_core::ReporterConfig;
use faultline_core::domain::{
    Controller, DispatchException, ErrorId, ErrorNotice, HandlerError, InBandSource, ReportId,
    ReportableError, RequestContext, RequestSnapshot, TransportException,
};
use faultline_core::ports::Notifier;

/// Framework identity recorded into the reporter configuration.
pub static FRAMEWORK_IDENTITY: &str = "actix-web 4";

/// Error reporting middleware factory.
pub struct ErrorReporting {
    notifier: Arc<dyn Notifier>,
    config: Arc<ReporterConfig>,
}

impl ErrorReporting {
    pub fn new(notifier: Arc<dyn Notifier>, config: Arc<ReporterConfig>) -> Self {
        config.record_framework(FRAMEWORK_IDENTITY);
        Self { notifier, config }
    }
}

impl<S, B> Transform<S, ServiceRequest> for ErrorReporting
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = ErrorReportingService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(ErrorReportingService {
            service,
            notifier: self.notifier.clone(),
            config: self.config.clone(),
        }))
    }
}

pub struct ErrorReportingService<S> {
    service: S,
    notifier: Arc<dyn Notifier>,
    config: Arc<ReporterConfig>,
}

impl<S, B> Service<ServiceRequest> for ErrorReportingService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let context = RequestContext::new();
        let slot = ReportSlot::default();
        {
            let mut extensions = req.extensions_mut();
            extensions.insert(context.clone());
            extensions.insert(slot.clone());
        }

        // Armed before the inner call so even a synchronous panic clears it.
        let guard = context.guard();

        let reporter = Reporter {
            notifier: self.notifier.clone(),
            config: self.config.clone(),
            context,
            slot,
            user_agent: req
                .headers()
                .get(header::USER_AGENT)
                .and_then(|v| v.to_str().ok())
                .map(String::from),
            snapshot: snapshot(req.request()),
        };

        let fut = panic::catch_unwind(AssertUnwindSafe(|| self.service.call(req)));

        Box::pin(async move {
            let _guard = guard;

            let outcome = match fut {
                Ok(fut) => AssertUnwindSafe(fut).catch_unwind().await,
                Err(payload) => Err(payload),
            };

            match outcome {
                Ok(Ok(res)) => {
                    if let Some((source, error)) = in_band_error(&res) {
                        tracing::debug!(source = %source, "In-band error found");
                        reporter.report(error, Some(res.request())).await;
                    }
                    Ok(res)
                }
                Ok(Err(err)) => {
                    reporter.report(describe(&err), None).await;
                    Err(err)
                }
                Err(payload) => {
                    reporter
                        .report(ReportableError::from_panic(payload.as_ref()), None)
                        .await;
                    panic::resume_unwind(payload)
                }
            }
        })
    }
}

#[derive(Default)]
struct SlotState {
    controller: Option<Controller>,
    error_id: Option<ReportId>,
}

/// Shared per-request state that survives the request itself.
///
/// Inserted into the request extensions by the middleware. Downstream layers
/// set the controller here when an error may escape as `Err` or a panic; the
/// middleware writes the report id back after reporting.
#[derive(Clone, Default)]
pub struct ReportSlot(Rc<RefCell<SlotState>>);

impl ReportSlot {
    pub fn set_controller(&self, controller: Controller) {
        self.0.borrow_mut().controller = Some(controller);
    }

    pub fn controller(&self) -> Option<Controller> {
        self.0.borrow().controller.clone()
    }

    pub fn error_id(&self) -> Option<ReportId> {
        self.0.borrow().error_id.clone()
    }

    fn set_error_id(&self, id: ReportId) {
        self.0.borrow_mut().error_id = Some(id);
    }
}

struct Reporter {
    notifier: Arc<dyn Notifier>,
    config: Arc<ReporterConfig>,
    context: RequestContext,
    slot: ReportSlot,
    user_agent: Option<String>,
    /// Taken before routing, so it has no match info.
    snapshot: RequestSnapshot,
}

impl Reporter {
    /// Notify about `error` unless the user agent is ignored, and record the
    /// resulting id.
    ///
    /// `request` is the routed request when it is still around (in-band
    /// path). Notifier failures are logged and swallowed.
    async fn report(&self, error: ReportableError, request: Option<&HttpRequest>) {
        if self.config.ignores_user_agent(self.user_agent.as_deref()) {
            tracing::debug!(
                user_agent = ?self.user_agent,
                "Skipping report for ignored user agent"
            );
            return;
        }

        let payload = match request {
            Some(req) => {
                let extensions = req.extensions();
                let controller = extensions
                    .get::<Controller>()
                    .cloned()
                    .or_else(|| self.slot.controller());
                Controller::request_payload(controller.as_ref(), || snapshot(req))
            }
            None => Controller::request_payload(self.slot.controller().as_ref(), || {
                self.snapshot.clone()
            }),
        };

        let notice = ErrorNotice::new(error, payload)
            .with_context(self.context.snapshot())
            .with_framework(self.config.framework());
        let class = notice.error.class.clone();

        match self.notifier.notify(notice).await {
            Ok(Some(id)) => {
                tracing::info!(
                    report_id = %id,
                    class = %class,
                    path = %self.snapshot.path,
                    "Error reported"
                );
                if let Some(req) = request {
                    req.extensions_mut().insert(ErrorId(id.clone()));
                }
                self.slot.set_error_id(id);
            }
            Ok(None) => {
                tracing::debug!(class = %class, "Notifier ignored error");
            }
            Err(e) => {
                tracing::warn!(class = %class, "Failed to report error: {}", e);
            }
        }
    }
}

/// First in-band error in priority order, if any.
fn in_band_error<B>(res: &ServiceResponse<B>) -> Option<(InBandSource, ReportableError)> {
    let extensions = res.request().extensions();

    InBandSource::PRIORITY.iter().find_map(|source| {
        let error = match source {
            InBandSource::Dispatch => extensions.get::<DispatchException>().map(|e| e.0.clone()),
            InBandSource::Transport => extensions
                .get::<TransportException>()
                .map(|e| e.0.clone())
                .or_else(|| rendered_error(res)),
            InBandSource::Handler => extensions.get::<HandlerError>().map(|e| e.0.clone()),
        };
        error.map(|e| (*source, e))
    })
}

/// A handler error the framework already turned into a response.
///
/// Reported regardless of status; filtering by class or status is up to the
/// notifier.
fn rendered_error<B>(res: &ServiceResponse<B>) -> Option<ReportableError> {
    res.response().error().map(describe)
}

/// Describe an actix error without consuming it.
///
/// The class is the leading identifier of the underlying error's `Debug`
/// output, which is the type name for structs and the variant for enums.
fn describe(err: &Error) -> ReportableError {
    let inner = err.as_response_error();
    let debug = format!("{:?}", inner);
    let class: String = debug
        .chars()
        .take_while(|c| c.is_alphanumeric() || *c == '_')
        .collect();
    let class = if class.is_empty() {
        "actix_web::Error".to_string()
    } else {
        class
    };

    ReportableError::new(class, inner.to_string()).with_status(inner.status_code().as_u16())
}

/// Copy of the request attributes.
fn snapshot(req: &HttpRequest) -> RequestSnapshot {
    let mut headers = std::collections::BTreeMap::<String, String>::new();
    for (name, value) in req.headers().iter() {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        headers
            .entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert(value);
    }

    RequestSnapshot {
        method: req.method().to_string(),
        uri: req.uri().to_string(),
        path: req.path().to_string(),
        query_string: req.query_string().to_string(),
        version: format!("{:?}", req.version()),
        headers,
        peer_addr: req.peer_addr().map(|addr| addr.to_string()),
        match_info: req
            .match_info()
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
    }
}

/// Report id attached to the request, if its error was reported.
pub fn error_id(req: &HttpRequest) -> Option<ReportId> {
    let extensions = req.extensions();
    extensions
        .get::<ErrorId>()
        .map(|id| id.0.clone())
        .or_else(|| extensions.get::<ReportSlot>().and_then(ReportSlot::error_id))
}

/// Extractor giving handlers access to the per-request error context.
///
/// ```ignore
/// async fn checkout(context: ErrorContext) -> impl Responder {
///     context.insert("cart_id", 42);
///     // ...
/// }
/// ```
#[derive(Clone)]
pub struct ErrorContext {
    context: RequestContext,
    slot: ReportSlot,
}

impl ErrorContext {
    /// Set the controller whose diagnostics describe this request, on every
    /// error path.
    pub fn set_controller(&self, controller: Controller) {
        self.slot.set_controller(controller);
    }

    pub fn context(&self) -> &RequestContext {
        &self.context
    }
}

impl std::ops::Deref for ErrorContext {
    type Target = RequestContext;

    fn deref(&self) -> &Self::Target {
        &self.context
    }
}

impl FromRequest for ErrorContext {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        // Without the middleware the context is simply never reported.
        let extensions = req.extensions();
        let context = extensions
            .get::<RequestContext>()
            .cloned()
            .unwrap_or_default();
        let slot = extensions.get::<ReportSlot>().cloned().unwrap_or_default();

        ready(Ok(ErrorContext { context, slot }))
    }
}
