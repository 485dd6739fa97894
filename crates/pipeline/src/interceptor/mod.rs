//! Interceptors observe and steer an exchange at three points: before the
//! transport sees the request, after a response arrived, and when the
//! exchange has failed.
//!
//! Each hook receives ownership of the in-flight value together with a
//! one-shot continuation handle and records exactly one decision on it:
//! proceed to the next interceptor, short-circuit with a response, or fail
//! with an error. Implement [`Interceptor`] for a type when the hooks share
//! state, or assemble one from closures with [`FnInterceptor`] when they do
//! not. Wrap either in [`Sequential`] to serialize its invocations across
//! concurrently in-flight exchanges.

use async_trait::async_trait;
use futures::FutureExt;
use futures::future::BoxFuture;
use std::fmt;

use crate::exchange::{Error, Request, Response};

mod handle;
pub(crate) mod invoke;
mod sequential;

pub use handle::{ErrorHandle, RequestHandle, ResponseHandle};
pub use sequential::Sequential;

/// A hook into the request, response and error phases of the pipeline.
///
/// All three methods default to passing the value through unchanged, so an
/// implementation only spells out the phases it cares about. Every method
/// must resolve its handle exactly once before the exchange can move on;
/// see [`RequestHandle`] for the contract.
#[async_trait]
pub trait Interceptor: Send + Sync {
    async fn on_request(&self, request: Request, handle: RequestHandle) {
        handle.proceed(request);
    }

    async fn on_response(&self, response: Response, handle: ResponseHandle) {
        handle.proceed(response);
    }

    async fn on_error(&self, error: Error, handle: ErrorHandle) {
        handle.proceed(error);
    }
}

type RequestFn = Box<dyn Fn(Request, RequestHandle) -> BoxFuture<'static, ()> + Send + Sync>;
type ResponseFn = Box<dyn Fn(Response, ResponseHandle) -> BoxFuture<'static, ()> + Send + Sync>;
type ErrorFn = Box<dyn Fn(Error, ErrorHandle) -> BoxFuture<'static, ()> + Send + Sync>;

/// An [`Interceptor`] assembled from closures, one per phase.
///
/// ```
/// use waylay_pipeline::FnInterceptor;
///
/// let trace = FnInterceptor::new()
///     .request(|mut request, handle| async move {
///         request.headers_mut().insert("x-trace", "on".parse().unwrap());
///         handle.proceed(request);
///     })
///     .response(|response, handle| async move {
///         println!("got {}", response.status());
///         handle.proceed(response);
///     });
/// ```
///
/// Phases without a closure pass the value through unchanged.
#[derive(Default)]
pub struct FnInterceptor {
    request: Option<RequestFn>,
    response: Option<ResponseFn>,
    error: Option<ErrorFn>,
}

impl FnInterceptor {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn request<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Request, RequestHandle) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.request = Some(Box::new(move |request, handle| f(request, handle).boxed()));
        self
    }

    #[must_use]
    pub fn response<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Response, ResponseHandle) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.response = Some(Box::new(move |response, handle| f(response, handle).boxed()));
        self
    }

    #[must_use]
    pub fn error<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Error, ErrorHandle) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.error = Some(Box::new(move |error, handle| f(error, handle).boxed()));
        self
    }
}

#[async_trait]
impl Interceptor for FnInterceptor {
    async fn on_request(&self, request: Request, handle: RequestHandle) {
        match &self.request {
            Some(f) => f(request, handle).await,
            None => handle.proceed(request),
        }
    }

    async fn on_response(&self, response: Response, handle: ResponseHandle) {
        match &self.response {
            Some(f) => f(response, handle).await,
            None => handle.proceed(response),
        }
    }

    async fn on_error(&self, error: Error, handle: ErrorHandle) {
        match &self.error {
            Some(f) => f(error, handle).await,
            None => handle.proceed(error),
        }
    }
}

impl fmt::Debug for FnInterceptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnInterceptor")
            .field("request", &self.request.is_some())
            .field("response", &self.response.is_some())
            .field("error", &self.error.is_some())
            .finish()
    }
}
