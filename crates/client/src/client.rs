use std::fmt;
use std::sync::Arc;

use http::{Method, Uri};
use thiserror::Error as ThisError;
use tracing::debug;

use waylay_pipeline::{Body, Error, Interceptor, Pipeline, Request, Response, Transport};

/// An HTTP client that runs every exchange through an interceptor
/// [`Pipeline`].
///
/// Cheap to clone; clones share the pipeline and therefore the interceptor
/// instances, which is what lets a [`Sequential`](waylay_pipeline::Sequential)
/// interceptor serialize exchanges fired from different tasks.
#[derive(Clone, Debug)]
pub struct Client {
    pipeline: Pipeline,
}

impl Client {
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Sends an already built request through the pipeline.
    pub async fn send(&self, request: Request) -> Result<Response, Error> {
        self.pipeline.send(request).await
    }

    pub async fn get<U>(&self, uri: U) -> Result<Response, Error>
    where
        Uri: TryFrom<U>,
        <Uri as TryFrom<U>>::Error: Into<http::Error>,
    {
        self.request(Method::GET, uri, Body::empty()).await
    }

    pub async fn head<U>(&self, uri: U) -> Result<Response, Error>
    where
        Uri: TryFrom<U>,
        <Uri as TryFrom<U>>::Error: Into<http::Error>,
    {
        self.request(Method::HEAD, uri, Body::empty()).await
    }

    pub async fn delete<U>(&self, uri: U) -> Result<Response, Error>
    where
        Uri: TryFrom<U>,
        <Uri as TryFrom<U>>::Error: Into<http::Error>,
    {
        self.request(Method::DELETE, uri, Body::empty()).await
    }

    pub async fn post<U, B>(&self, uri: U, body: B) -> Result<Response, Error>
    where
        Uri: TryFrom<U>,
        <Uri as TryFrom<U>>::Error: Into<http::Error>,
        B: Into<Body>,
    {
        self.request(Method::POST, uri, body.into()).await
    }

    pub async fn put<U, B>(&self, uri: U, body: B) -> Result<Response, Error>
    where
        Uri: TryFrom<U>,
        <Uri as TryFrom<U>>::Error: Into<http::Error>,
        B: Into<Body>,
    {
        self.request(Method::PUT, uri, body.into()).await
    }

    pub async fn patch<U, B>(&self, uri: U, body: B) -> Result<Response, Error>
    where
        Uri: TryFrom<U>,
        <Uri as TryFrom<U>>::Error: Into<http::Error>,
        B: Into<Body>,
    {
        self.request(Method::PATCH, uri, body.into()).await
    }

    async fn request<U>(&self, method: Method, uri: U, body: Body) -> Result<Response, Error>
    where
        Uri: TryFrom<U>,
        <Uri as TryFrom<U>>::Error: Into<http::Error>,
    {
        let request = http::Request::builder().method(method).uri(uri).body(body).map_err(Error::build)?;
        self.send(request).await
    }
}

/// Assembles a [`Client`]: a transport plus any number of interceptors.
///
/// Interceptors run in the order they were added, for every phase.
pub struct ClientBuilder {
    interceptors: Vec<Arc<dyn Interceptor>>,
    transport: Option<Arc<dyn Transport>>,
}

impl ClientBuilder {
    fn new() -> Self {
        Self { interceptors: Vec::new(), transport: None }
    }

    pub fn transport<T: Transport + 'static>(mut self, transport: T) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Appends `interceptor` to the end of the chain.
    pub fn interceptor<I: Interceptor + 'static>(mut self, interceptor: I) -> Self {
        self.interceptors.push(Arc::new(interceptor));
        self
    }

    /// Appends an already shared interceptor, e.g. one whose handle the
    /// caller keeps for closing it later.
    pub fn shared_interceptor(mut self, interceptor: Arc<dyn Interceptor>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    /// # Errors
    ///
    /// Returns [`ClientBuildError::MissingTransport`] if no transport was
    /// configured.
    pub fn build(self) -> Result<Client, ClientBuildError> {
        let transport = self.transport.ok_or(ClientBuildError::MissingTransport)?;
        debug!(interceptors = self.interceptors.len(), "client built");
        Ok(Client { pipeline: Pipeline::new(self.interceptors, transport) })
    }
}

impl fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("interceptors", &self.interceptors.len())
            .field("transport", &self.transport.is_some())
            .finish()
    }
}

#[derive(ThisError, Debug)]
pub enum ClientBuildError {
    #[error("transport must be set")]
    MissingTransport,
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::Arc;
    use std::sync::Mutex;

    use bytes::Bytes;
    use http_body::Frame;
    use http_body_util::StreamBody;

    use waylay_pipeline::{Body, BoxError, ErrorKind, FnInterceptor, Request, Response, transport_fn};

    use crate::client::{Client, ClientBuildError};

    /// Answers with the request's method and path in the response body.
    fn introspect() -> impl waylay_pipeline::Transport {
        transport_fn(|request: Request| async move {
            let line = format!("{} {}", request.method(), request.uri().path());
            Ok::<_, BoxError>(Response::new(Body::from(line)))
        })
    }

    #[test]
    fn test_builder_requires_a_transport() {
        let error = Client::builder().build().unwrap_err();
        assert!(matches!(error, ClientBuildError::MissingTransport));
        assert_eq!(error.to_string(), "transport must be set");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_verb_helpers_build_the_right_request() {
        let client = Client::builder().transport(introspect()).build().unwrap();

        let response = client.get("http://example.com/users").await.unwrap();
        assert_eq!(response.into_body().as_bytes(), Some("GET /users".as_bytes()));

        let response = client.head("http://example.com/users").await.unwrap();
        assert_eq!(response.into_body().as_bytes(), Some("HEAD /users".as_bytes()));

        let response = client.delete("http://example.com/users/7").await.unwrap();
        assert_eq!(response.into_body().as_bytes(), Some("DELETE /users/7".as_bytes()));

        let response = client.post("http://example.com/users", "name=waylay").await.unwrap();
        assert_eq!(response.into_body().as_bytes(), Some("POST /users".as_bytes()));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_post_carries_the_body() {
        let echo = transport_fn(|request: Request| async move {
            Ok::<_, BoxError>(Response::new(request.into_body()))
        });
        let client = Client::builder().transport(echo).build().unwrap();

        let response = client.put("http://example.com/users/7", "renamed").await.unwrap();

        assert_eq!(response.into_body().as_bytes(), Some("renamed".as_bytes()));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_delivered_bodies_are_buffered() {
        let streaming = transport_fn(|_request: Request| async move {
            let chunks: Vec<Result<_, io::Error>> =
                vec![Ok(Frame::data(Bytes::from("page one, "))), Ok(Frame::data(Bytes::from("page two")))];
            Ok::<_, BoxError>(Response::new(Body::stream(StreamBody::new(futures::stream::iter(chunks)))))
        });
        let client = Client::builder().transport(streaming).build().unwrap();

        let response = client.get("http://example.com/feed").await.unwrap();

        let body = response.into_body();
        assert!(body.is_full());
        assert_eq!(body.as_bytes(), Some("page one, page two".as_bytes()));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_invalid_uri_is_a_build_error() {
        let client = Client::builder().transport(introspect()).build().unwrap();

        let error = client.get("http://[broken").await.unwrap_err();

        assert_eq!(error.kind(), ErrorKind::Build);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_interceptors_run_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));

        let first_log = Arc::clone(&log);
        let first = FnInterceptor::new().request(move |request, handle| {
            first_log.lock().unwrap().push("first");
            async move { handle.proceed(request) }
        });
        let second_log = Arc::clone(&log);
        let second = FnInterceptor::new().request(move |request, handle| {
            second_log.lock().unwrap().push("second");
            async move { handle.proceed(request) }
        });

        let client =
            Client::builder().transport(introspect()).interceptor(first).interceptor(second).build().unwrap();

        client.get("http://example.com/").await.unwrap();

        assert_eq!(*log.lock().unwrap(), vec!["first", "second"]);
    }
}
