//! Domain types - notices, request state and ignore patterns.

mod context;
mod notice;
mod pattern;
mod request;

pub use context::{ContextGuard, RequestContext};
pub use notice::{ErrorNotice, ReportId, ReportableError};
pub use pattern::{IgnoreList, UserAgentPattern};
pub use request::{
    Controller, DispatchException, ErrorId, HandlerError, InBandSource, RequestDiagnostics,
    RequestSnapshot, TransportException,
};
