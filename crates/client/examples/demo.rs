use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use waylay_client::interceptor::{DefaultHeaders, LogInterceptor};
use waylay_client::{Client, transport_fn};
use waylay_pipeline::{Body, BoxError, FnInterceptor, Interceptor, Request, RequestHandle, Response, Sequential};

/// Attaches a bearer token, fetching one first when none is cached.
///
/// Wrapped in `Sequential` below so concurrent requests do not race the
/// refresh: the first exchange fetches, the rest reuse the cached token.
struct TokenRefresh {
    token: Mutex<Option<String>>,
    refreshes: AtomicUsize,
}

impl TokenRefresh {
    fn new() -> Self {
        Self { token: Mutex::new(None), refreshes: AtomicUsize::new(0) }
    }
}

#[async_trait]
impl Interceptor for TokenRefresh {
    async fn on_request(&self, mut request: Request, handle: RequestHandle) {
        let mut token = self.token.lock().await;
        if token.is_none() {
            // stand-in for a round trip to an auth server
            tokio::time::sleep(Duration::from_millis(100)).await;
            let count = self.refreshes.fetch_add(1, Ordering::SeqCst) + 1;
            info!(count, "refreshed access token");
            *token = Some(format!("token-{count}"));
        }

        let bearer = format!("Bearer {}", token.as_ref().unwrap());
        request.headers_mut().insert(http::header::AUTHORIZATION, bearer.parse().unwrap());
        handle.proceed(request);
    }
}

#[tokio::main]
async fn main() {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::DEBUG).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    // in-process upstream: answers /greet, refuses everything else
    let upstream = transport_fn(|request: Request| async move {
        if request.uri().path() == "/greet" {
            let agent = request
                .headers()
                .get(http::header::USER_AGENT)
                .and_then(|value| value.to_str().ok())
                .unwrap_or("stranger");
            Ok(Response::new(Body::from(format!("hello, {agent}!\r\n"))))
        } else {
            Err::<Response, BoxError>(Box::new(std::io::Error::other("no route to host")))
        }
    });

    // recover refused exchanges with a canned answer instead of an error
    let fallback = FnInterceptor::new().error(|error, handle| async move {
        info!(cause = %error, "recovering failed exchange");
        handle.recover(Response::new(Body::from("fallback answer\r\n")));
    });

    let client = Client::builder()
        .transport(upstream)
        .interceptor(LogInterceptor::new().with_headers())
        .interceptor(DefaultHeaders::new().header(http::header::USER_AGENT, "waylay-demo/0.1".parse().unwrap()))
        .interceptor(Sequential::new(TokenRefresh::new()))
        .interceptor(fallback)
        .build()
        .unwrap();

    // concurrent requests share one client; the token refresh runs once
    let (first, second) = tokio::join!(client.get("http://demo.local/greet"), client.get("http://demo.local/greet"));
    print_outcome("first", first);
    print_outcome("second", second);

    // this one misses the route, fails in the transport and gets recovered
    let recovered = client.get("http://demo.local/missing").await;
    print_outcome("recovered", recovered);
}

fn print_outcome(label: &str, outcome: Result<Response, waylay_pipeline::Error>) {
    match outcome {
        Ok(response) => {
            let status = response.status();
            let body = response.into_body();
            let text = body.as_bytes().map(|bytes| String::from_utf8_lossy(bytes).into_owned()).unwrap_or_default();
            info!(label, %status, body = text.trim_end(), "exchange completed");
        }
        Err(error) => {
            info!(label, cause = %error, "exchange failed");
        }
    }
}
