use async_trait::async_trait;
use tracing::{debug, trace, warn};

use waylay_pipeline::{Error, ErrorHandle, Interceptor, Request, RequestHandle, Response, ResponseHandle};

/// Logs every exchange as it passes: requests and responses at debug level,
/// failures at warn level. With [`with_headers`](Self::with_headers) the
/// individual headers are traced as well.
///
/// The interceptor never touches the exchange, it only observes, so it can
/// sit anywhere in the chain; put it first to see what the rest of the chain
/// made of a request.
#[derive(Debug, Clone, Copy)]
pub struct LogInterceptor {
    headers: bool,
}

impl LogInterceptor {
    pub fn new() -> Self {
        Self { headers: false }
    }

    /// Additionally trace each header of every request and response.
    #[must_use]
    pub fn with_headers(mut self) -> Self {
        self.headers = true;
        self
    }
}

impl Default for LogInterceptor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Interceptor for LogInterceptor {
    async fn on_request(&self, request: Request, handle: RequestHandle) {
        debug!(method = %request.method(), uri = %request.uri(), "sending request");
        if self.headers {
            for (name, value) in request.headers() {
                trace!(header = %name, value = ?value, "request header");
            }
        }
        handle.proceed(request);
    }

    async fn on_response(&self, response: Response, handle: ResponseHandle) {
        debug!(status = %response.status(), "received response");
        if self.headers {
            for (name, value) in response.headers() {
                trace!(header = %name, value = ?value, "response header");
            }
        }
        handle.proceed(response);
    }

    async fn on_error(&self, error: Error, handle: ErrorHandle) {
        warn!(cause = %error, "exchange failed");
        handle.proceed(error);
    }
}
