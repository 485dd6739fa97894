use async_trait::async_trait;
use http::header::{HeaderMap, HeaderName, HeaderValue};

use waylay_pipeline::{Interceptor, Request, RequestHandle};

/// Fills in headers on every outgoing request.
///
/// A header already present on the request wins; the defaults only close
/// the gaps. Typical use is a `user-agent` or an `accept` shared by every
/// call of a client.
///
/// ```
/// use waylay_client::interceptor::DefaultHeaders;
///
/// let defaults = DefaultHeaders::new()
///     .header(http::header::USER_AGENT, "waylay/0.1".parse().unwrap())
///     .header(http::header::ACCEPT, "application/json".parse().unwrap());
/// ```
#[derive(Debug, Clone, Default)]
pub struct DefaultHeaders {
    headers: HeaderMap,
}

impl DefaultHeaders {
    pub fn new() -> Self {
        Self { headers: HeaderMap::new() }
    }

    #[must_use]
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

#[async_trait]
impl Interceptor for DefaultHeaders {
    async fn on_request(&self, mut request: Request, handle: RequestHandle) {
        for (name, value) in &self.headers {
            if !request.headers().contains_key(name) {
                request.headers_mut().insert(name, value.clone());
            }
        }
        handle.proceed(request);
    }
}

#[cfg(test)]
mod tests {
    use waylay_pipeline::{Body, BoxError, Request, Response, transport_fn};

    use crate::Client;
    use crate::interceptor::DefaultHeaders;

    fn reflecting_client(defaults: DefaultHeaders) -> Client {
        // answers with the user-agent the transport actually saw
        let transport = transport_fn(|request: Request| async move {
            let agent = request
                .headers()
                .get(http::header::USER_AGENT)
                .map(|value| value.to_str().unwrap_or("<opaque>").to_owned())
                .unwrap_or_else(|| "<none>".to_owned());
            Ok::<_, BoxError>(Response::new(Body::from(agent)))
        });
        Client::builder().transport(transport).interceptor(defaults).build().unwrap()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_missing_header_is_filled_in() {
        let defaults = DefaultHeaders::new().header(http::header::USER_AGENT, "waylay/0.1".parse().unwrap());
        let client = reflecting_client(defaults);

        let response = client.get("http://example.com/").await.unwrap();

        assert_eq!(response.into_body().as_bytes(), Some("waylay/0.1".as_bytes()));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_existing_header_wins() {
        let defaults = DefaultHeaders::new().header(http::header::USER_AGENT, "waylay/0.1".parse().unwrap());
        let client = reflecting_client(defaults);

        let request = http::Request::builder()
            .uri("http://example.com/")
            .header(http::header::USER_AGENT, "custom-agent/2.0")
            .body(Body::empty())
            .unwrap();
        let response = client.send(request).await.unwrap();

        assert_eq!(response.into_body().as_bytes(), Some("custom-agent/2.0".as_bytes()));
    }
}
