//! An asynchronous, programmable HTTP request/response interceptor pipeline
//!
//! This crate provides the engine that threads an HTTP exchange through an
//! ordered chain of interceptors: every request visits each interceptor
//! before it reaches the transport, every response visits each interceptor
//! on the way back, and every failure is offered to each interceptor for
//! handling or recovery. Interceptors own the in-flight value while they
//! hold it and steer the exchange through an explicit one-shot continuation
//! handle.
//!
//! # Features
//!
//! - Three-phase interception: request, response and error hooks
//! - Ownership-passing hooks, free to rewrite or replace what they hold
//! - Explicit continuations: proceed, short-circuit or fail, decided once
//! - Short-circuits with or without running the response phase
//! - Failures with or without running the error phase, plus recovery
//! - Per-interceptor serialization across concurrent exchanges
//!   ([`Sequential`])
//! - Panic containment: a broken interceptor fails its exchange, not the
//!   process
//! - Transport-agnostic: anything implementing [`Transport`] terminates the
//!   chain
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tracing::{info, Level};
//! use tracing_subscriber::FmtSubscriber;
//! use waylay_pipeline::{transport_fn, Body, BoxError, FnInterceptor, Pipeline, Response};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), waylay_pipeline::Error> {
//!     let subscriber = FmtSubscriber::builder()
//!         .with_max_level(Level::INFO)
//!         .finish();
//!     tracing::subscriber::set_global_default(subscriber)
//!         .expect("setting default subscriber failed");
//!
//!     // a transport that echoes the request body back
//!     let echo = transport_fn(|request: waylay_pipeline::Request| async move {
//!         Ok::<_, BoxError>(Response::new(request.into_body()))
//!     });
//!
//!     // stamp a header on the way out, log the status on the way back
//!     let trace = FnInterceptor::new()
//!         .request(|mut request, handle| async move {
//!             request.headers_mut().insert("x-trace", "on".parse().unwrap());
//!             handle.proceed(request);
//!         })
//!         .response(|response, handle| async move {
//!             info!(status = %response.status(), "response passed through");
//!             handle.proceed(response);
//!         });
//!
//!     let pipeline = Pipeline::new(vec![Arc::new(trace)], Arc::new(echo));
//!
//!     let request = http::Request::builder()
//!         .method(http::Method::POST)
//!         .uri("http://example.com/echo")
//!         .body(Body::from("hello"))
//!         .unwrap();
//!
//!     let response = pipeline.send(request).await?;
//!     info!(status = %response.status(), "exchange finished");
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! The crate is organized into a few focused modules:
//!
//! - [`exchange`]: the data model, [`Request`], [`Response`], [`Body`],
//!   [`Error`] and the threaded [`PipelineState`]
//! - [`interceptor`]: the [`Interceptor`] trait, continuation handles,
//!   [`FnInterceptor`] and [`Sequential`]
//! - [`queue`]: the [`SequentialQueue`] primitive behind [`Sequential`]
//! - [`transport`]: the [`Transport`] seam terminating the chain
//!
//! The [`Pipeline`] itself is a small state machine over these parts; its
//! phase rules are documented on [`Pipeline::send`] and the handles.
//!
//! # Decisions and phases
//!
//! Each hook resolves its handle exactly once:
//!
//! - proceed: hand the value to the next interceptor of the phase
//! - short-circuit: answer with a response now; the `_and_propagate`
//!   variant still runs the remaining response hooks
//! - fail: abort with an error; the `_and_propagate` variant runs the error
//!   hooks first, which may recover the exchange with a response
//!
//! A hook that drops its handle, or panics before resolving it, fails the
//! exchange with a contract error instead of wedging the caller.
//!
//! # Limitations
//!
//! - Delivered response bodies are buffered in full before the caller sees
//!   them; streaming ends at the pipeline boundary
//! - The interceptor chain is fixed when the pipeline is built
//! - Dropping the `send` future abandons the exchange without notifying
//!   interceptors that already hold queued work

pub mod exchange;
pub mod interceptor;
pub mod queue;
pub mod transport;

mod pipeline;

pub use exchange::{Action, Body, BoxError, Error, ErrorKind, PipelineState, Request, Response};
pub use interceptor::{ErrorHandle, FnInterceptor, Interceptor, RequestHandle, ResponseHandle, Sequential};
pub use pipeline::Pipeline;
pub use queue::{Completion, QueueClosed, SequentialQueue, TaskAborted};
pub use transport::{Transport, TransportFn, transport_fn};
