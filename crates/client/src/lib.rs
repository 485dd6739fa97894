//! An HTTP client surface over the waylay interceptor pipeline
//!
//! This crate packages [`waylay_pipeline`] into a client shape: a builder
//! that pairs a transport with a chain of interceptors, verb helpers that
//! construct requests, and a couple of stock interceptors for logging and
//! default headers.
//!
//! # Example
//!
//! ```no_run
//! use waylay_client::interceptor::{DefaultHeaders, LogInterceptor};
//! use waylay_client::{Client, transport_fn};
//! use waylay_pipeline::{Body, BoxError, Request, Response};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // in-process transport; swap in a real connection layer here
//!     let echo = transport_fn(|request: Request| async move {
//!         Ok::<_, BoxError>(Response::new(request.into_body()))
//!     });
//!
//!     let client = Client::builder()
//!         .transport(echo)
//!         .interceptor(LogInterceptor::new())
//!         .interceptor(DefaultHeaders::new().header(
//!             http::header::USER_AGENT,
//!             "waylay/0.1".parse().unwrap(),
//!         ))
//!         .build()?;
//!
//!     let response = client.post("http://example.com/echo", "hello").await?;
//!     println!("{}", response.status());
//!     Ok(())
//! }
//! ```
//!
//! Everything an interceptor author needs, the handles, [`FnInterceptor`],
//! [`Sequential`] and the error types, is re-exported from the pipeline
//! crate so most users depend on this crate alone.

mod client;
pub mod interceptor;

pub use client::{Client, ClientBuildError, ClientBuilder};

pub use waylay_pipeline::{
    Action, Body, BoxError, Error, ErrorHandle, ErrorKind, FnInterceptor, Interceptor, Pipeline, Request,
    RequestHandle, Response, ResponseHandle, Sequential, Transport, TransportFn, transport_fn,
};
