//! The seam between the pipeline and whatever actually carries a request to
//! a server: a socket, a connection pool, an in-memory fake in tests.
//!
//! The pipeline runs every transport through [`Transport::send`] after the
//! request phase and feeds the outcome into the response or error phase. A
//! closure is often all a transport needs to be; see [`transport_fn`].

use async_trait::async_trait;

use crate::exchange::{BoxError, Request, Response};

/// Sends a request to its destination and produces the response.
///
/// An `Err` is coerced into a transport [`Error`](crate::Error) and handed to
/// the error phase; return an [`Error`](crate::Error) directly to keep
/// control over kind and attached response.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: Request) -> Result<Response, BoxError>;
}

#[derive(Debug)]
pub struct TransportFn<F> {
    f: F,
}

#[async_trait]
impl<F, Fut, Err> Transport for TransportFn<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Err: Into<BoxError>,
    Fut: Future<Output = Result<Response, Err>> + Send,
{
    async fn send(&self, request: Request) -> Result<Response, BoxError> {
        (self.f)(request).await.map_err(Into::into)
    }
}

/// Wraps an async closure as a [`Transport`].
///
/// ```
/// use waylay_pipeline::{transport_fn, BoxError, Response};
///
/// let echo = transport_fn(|request: waylay_pipeline::Request| async move {
///     Ok::<_, BoxError>(Response::new(request.into_body()))
/// });
/// ```
pub fn transport_fn<F, Fut, Err>(f: F) -> TransportFn<F>
where
    Err: Into<BoxError>,
    Fut: Future<Output = Result<Response, Err>>,
    F: Fn(Request) -> Fut,
{
    TransportFn { f }
}

#[cfg(test)]
mod tests {
    use crate::exchange::{Body, Request};
    use crate::transport::{Transport, transport_fn};

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_transport_fn_adapts_a_closure() {
        let echo = transport_fn(|request: Request| async move {
            Ok::<_, std::io::Error>(http::Response::new(request.into_body()))
        });

        let request = http::Request::builder().uri("http://example.com/").body(Body::from("ping")).unwrap();
        let response = echo.send(request).await.unwrap();

        assert_eq!(response.into_body().as_bytes(), Some("ping".as_bytes()));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_transport_fn_boxes_the_error() {
        let flaky = transport_fn(|_request: Request| async move {
            Err::<crate::Response, _>(std::io::Error::other("connection refused"))
        });

        let request = http::Request::builder().uri("http://example.com/").body(Body::empty()).unwrap();
        let error = flaky.send(request).await.unwrap_err();

        assert_eq!(error.to_string(), "connection refused");
    }
}
