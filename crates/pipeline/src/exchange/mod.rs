//! Core data model of an exchange: the request and response messages, the
//! body they carry, the threaded [`PipelineState`] and the [`Error`] type.
//!
//! Requests and responses are plain [`http`] messages over our [`Body`], so
//! everything the `http` crate offers for headers, methods, uris and status
//! codes applies unchanged. The pipeline itself only adds the state that is
//! threaded between interceptor invocations and the error shape handed to
//! the error phase.

mod body;
mod error;
mod state;

use http::{Method, Uri};

pub use body::Body;
pub use error::{BoxError, Error, ErrorKind};
pub use state::{Action, PipelineState};

/// An outgoing request travelling down the pipeline.
pub type Request = http::Request<Body>;

/// An incoming response travelling back up the pipeline.
pub type Response = http::Response<Body>;

/// Method and uri of the exchange, captured once on entry.
///
/// The request itself is moved into interceptors and may be consumed by a
/// failure, so the pipeline keeps this little snapshot around for error
/// stamping and logging.
#[derive(Debug, Clone)]
pub(crate) struct ExchangeContext {
    method: Method,
    uri: Uri,
}

impl ExchangeContext {
    pub(crate) fn of(request: &Request) -> Self {
        Self { method: request.method().clone(), uri: request.uri().clone() }
    }

    pub(crate) fn method(&self) -> &Method {
        &self.method
    }

    pub(crate) fn uri(&self) -> &Uri {
        &self.uri
    }
}
