//! The single seam through which interceptor hooks are invoked.
//!
//! Pairs each invocation with a fresh handle, awaits the interceptor and
//! then the recorded decision, and contains panics so one broken
//! interceptor fails its exchange instead of the process.

use std::any::Any;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use tracing::warn;

use crate::exchange::{Error, ExchangeContext, PipelineState, Request, Response};
use crate::interceptor::Interceptor;
use crate::interceptor::handle::{ErrorHandle, RequestHandle, Resolution, ResponseHandle};

pub(crate) async fn request<I>(interceptor: &I, request: Request, context: &ExchangeContext) -> PipelineState
where
    I: Interceptor + ?Sized,
{
    let (handle, resolution) = RequestHandle::channel(context.clone());
    run(interceptor.on_request(request, handle), resolution, context).await
}

pub(crate) async fn response<I>(interceptor: &I, response: Response, context: &ExchangeContext) -> PipelineState
where
    I: Interceptor + ?Sized,
{
    let (handle, resolution) = ResponseHandle::channel(context.clone());
    run(interceptor.on_response(response, handle), resolution, context).await
}

pub(crate) async fn error<I>(interceptor: &I, error: Error, context: &ExchangeContext) -> PipelineState
where
    I: Interceptor + ?Sized,
{
    let (handle, resolution) = ErrorHandle::channel(context.clone());
    run(interceptor.on_error(error, handle), resolution, context).await
}

async fn run<F>(invocation: F, mut resolution: Resolution, context: &ExchangeContext) -> PipelineState
where
    F: Future<Output = ()>,
{
    match AssertUnwindSafe(invocation).catch_unwind().await {
        Ok(()) => resolution.await,
        Err(payload) => {
            let cause = panic_message(payload.as_ref());
            // a decision recorded before the panic still counts
            if let Some(state) = resolution.resolved_now() {
                warn!(cause, "interceptor panicked after resolving its handle");
                state
            } else {
                warn!(cause, "interceptor panicked before resolving its handle");
                let error = Error::contract(format!("interceptor panicked: {cause}")).with_exchange(context);
                PipelineState::failed(error, true)
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "opaque panic payload"
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use crate::exchange::{Action, Body, ErrorKind, ExchangeContext, Request, Response};
    use crate::interceptor::handle::RequestHandle;
    use crate::interceptor::{Interceptor, invoke};

    fn request() -> Request {
        http::Request::builder().uri("http://example.com/").body(Body::empty()).unwrap()
    }

    struct Panics;

    #[async_trait]
    impl Interceptor for Panics {
        async fn on_request(&self, request: Request, handle: RequestHandle) {
            drop((request, handle));
            panic!("interceptor exploded");
        }
    }

    struct ResolveThenPanic;

    #[async_trait]
    impl Interceptor for ResolveThenPanic {
        async fn on_request(&self, request: Request, handle: RequestHandle) {
            drop(request);
            handle.short_circuit(Response::new(Body::from("early")));
            panic!("too late to matter");
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_panic_becomes_a_contract_failure() {
        let request = request();
        let context = ExchangeContext::of(&request);

        let mut state = invoke::request(&Panics, request, &context).await;
        assert_eq!(state.action(), Action::FailContinue);

        let error = state.take_error().unwrap();
        assert_eq!(error.kind(), ErrorKind::Contract);
        assert!(error.to_string().contains("interceptor exploded"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_decision_recorded_before_panic_wins() {
        let request = request();
        let context = ExchangeContext::of(&request);

        let mut state = invoke::request(&ResolveThenPanic, request, &context).await;
        assert_eq!(state.action(), Action::ShortCircuit);

        let body = state.take_response().unwrap().into_body();
        assert_eq!(body.as_bytes(), Some("early".as_bytes()));
    }
}
