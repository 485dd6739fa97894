use http::{Method, Uri};
use thiserror::Error as ThisError;

use crate::exchange::{ExchangeContext, Response};

/// Boxed error type accepted at the edges of the pipeline.
///
/// Transports and interceptor failure decisions take `Into<BoxError>` so
/// callers can hand over whatever concrete error they already have.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Broad classification of a pipeline failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request could not be constructed in the first place.
    Build,
    /// The transport failed to produce a response.
    Transport,
    /// An interceptor decided to fail the exchange.
    Interceptor,
    /// An interceptor misused its continuation handle.
    Contract,
}

/// The error threaded through the error phase and returned to the caller.
///
/// Besides the failure itself, an error records which exchange it belongs to
/// (method and uri, stamped by the pipeline) and optionally the response that
/// was on hand when the failure was raised.
#[derive(Debug, ThisError)]
#[error("{message}")]
pub struct Error {
    kind: ErrorKind,
    message: String,
    #[source]
    source: Option<BoxError>,
    method: Option<Method>,
    uri: Option<Uri>,
    response: Option<Response>,
}

impl Error {
    fn new(kind: ErrorKind, message: String, source: Option<BoxError>) -> Self {
        Self { kind, message, source, method: None, uri: None, response: None }
    }

    pub fn build<E: Into<BoxError>>(e: E) -> Self {
        let source = e.into();
        let message = format!("invalid request: {source}");
        Self::new(ErrorKind::Build, message, Some(source))
    }

    pub fn transport<E: Into<BoxError>>(e: E) -> Self {
        let source = e.into();
        let message = format!("transport failed: {source}");
        Self::new(ErrorKind::Transport, message, Some(source))
    }

    pub fn interceptor<E: Into<BoxError>>(e: E) -> Self {
        let source = e.into();
        let message = format!("interceptor failed: {source}");
        Self::new(ErrorKind::Interceptor, message, Some(source))
    }

    pub fn contract<S: ToString>(reason: S) -> Self {
        Self::new(ErrorKind::Contract, format!("interceptor contract violated: {}", reason.to_string()), None)
    }

    /// Reuses `source` untouched when it already is an [`Error`], otherwise
    /// wraps it under `kind` and stamps the exchange onto it.
    ///
    /// Interceptors that carry an [`Error`] across a failure decision keep
    /// their kind, message and attached response this way instead of being
    /// re-wrapped on every hop.
    pub(crate) fn coerce(source: BoxError, kind: ErrorKind, context: &ExchangeContext) -> Self {
        match source.downcast::<Self>() {
            Ok(error) => *error,
            Err(source) => {
                let error = match kind {
                    ErrorKind::Build => Self::build(source),
                    ErrorKind::Transport => Self::transport(source),
                    ErrorKind::Interceptor => Self::interceptor(source),
                    ErrorKind::Contract => Self::contract(source),
                };
                error.with_exchange(context)
            }
        }
    }

    /// Stamps the exchange's method and uri onto the error. The first stamp
    /// wins so an error forwarded through several hops keeps its origin.
    pub(crate) fn with_exchange(mut self, context: &ExchangeContext) -> Self {
        if self.method.is_none() {
            self.message = format!("{} for {} {}", self.message, context.method(), context.uri());
            self.method = Some(context.method().clone());
            self.uri = Some(context.uri().clone());
        }
        self
    }

    /// Attaches the response that was on hand when the failure was raised,
    /// e.g. when an interceptor turns an unwelcome status code into an error.
    #[must_use]
    pub fn with_response(mut self, response: Response) -> Self {
        self.response = Some(response);
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn method(&self) -> Option<&Method> {
        self.method.as_ref()
    }

    pub fn uri(&self) -> Option<&Uri> {
        self.uri.as_ref()
    }

    pub fn response(&self) -> Option<&Response> {
        self.response.as_ref()
    }

    pub fn take_response(&mut self) -> Option<Response> {
        self.response.take()
    }
}
