use std::pin::Pin;
use std::task::{Context, Poll, ready};

use futures::FutureExt;
use futures::channel::oneshot;
use tracing::warn;

use crate::exchange::{BoxError, Error, ErrorKind, ExchangeContext, PipelineState, Request, Response};

/// Continuation handle given to [`Interceptor::on_request`].
///
/// Every method consumes the handle, so an interceptor decides the fate of
/// the exchange exactly once; the compiler rejects a second decision. An
/// interceptor that returns without calling any method has dropped its
/// handle, which the pipeline converts into a contract violation rather
/// than hanging the exchange.
///
/// [`Interceptor::on_request`]: crate::Interceptor::on_request
#[derive(Debug)]
pub struct RequestHandle {
    context: ExchangeContext,
    sender: oneshot::Sender<PipelineState>,
}

impl RequestHandle {
    pub(crate) fn channel(context: ExchangeContext) -> (Self, Resolution) {
        let (sender, receiver) = oneshot::channel();
        let resolution = Resolution { receiver, context: context.clone() };
        (Self { context, sender }, resolution)
    }

    /// Hands the (possibly rewritten) request to the next interceptor.
    pub fn proceed(self, request: Request) {
        self.finish(PipelineState::continue_request(request));
    }

    /// Answers the exchange with `response`, skipping the transport and the
    /// response phase.
    pub fn short_circuit(self, response: Response) {
        self.finish(PipelineState::short_circuited(response, false));
    }

    /// Answers the exchange with `response`, skipping the transport but
    /// still running the remaining interceptors' response hooks.
    pub fn short_circuit_and_propagate(self, response: Response) {
        self.finish(PipelineState::short_circuited(response, true));
    }

    /// Aborts the exchange with `error`, skipping the error phase.
    pub fn fail(self, error: impl Into<BoxError>) {
        let error = Error::coerce(error.into(), ErrorKind::Interceptor, &self.context);
        self.finish(PipelineState::failed(error, false));
    }

    /// Fails the exchange with `error` and runs the error phase on it.
    pub fn fail_and_propagate(self, error: impl Into<BoxError>) {
        let error = Error::coerce(error.into(), ErrorKind::Interceptor, &self.context);
        self.finish(PipelineState::failed(error, true));
    }

    fn finish(self, state: PipelineState) {
        let _ = self.sender.send(state);
    }

    pub(crate) fn into_parts(self) -> (ExchangeContext, oneshot::Sender<PipelineState>) {
        (self.context, self.sender)
    }
}

/// Continuation handle given to [`Interceptor::on_response`].
///
/// Same one-shot discipline as [`RequestHandle`].
///
/// [`Interceptor::on_response`]: crate::Interceptor::on_response
#[derive(Debug)]
pub struct ResponseHandle {
    context: ExchangeContext,
    sender: oneshot::Sender<PipelineState>,
}

impl ResponseHandle {
    pub(crate) fn channel(context: ExchangeContext) -> (Self, Resolution) {
        let (sender, receiver) = oneshot::channel();
        let resolution = Resolution { receiver, context: context.clone() };
        (Self { context, sender }, resolution)
    }

    /// Hands the (possibly rewritten) response to the next interceptor.
    pub fn proceed(self, response: Response) {
        self.finish(PipelineState::continue_response(response));
    }

    /// Delivers `response` immediately, skipping the rest of the response
    /// phase.
    pub fn short_circuit(self, response: Response) {
        self.finish(PipelineState::short_circuited(response, false));
    }

    /// Aborts the exchange with `error`, skipping the error phase.
    pub fn fail(self, error: impl Into<BoxError>) {
        let error = Error::coerce(error.into(), ErrorKind::Interceptor, &self.context);
        self.finish(PipelineState::failed(error, false));
    }

    /// Fails the exchange with `error` and runs the error phase on it.
    pub fn fail_and_propagate(self, error: impl Into<BoxError>) {
        let error = Error::coerce(error.into(), ErrorKind::Interceptor, &self.context);
        self.finish(PipelineState::failed(error, true));
    }

    fn finish(self, state: PipelineState) {
        let _ = self.sender.send(state);
    }

    pub(crate) fn into_parts(self) -> (ExchangeContext, oneshot::Sender<PipelineState>) {
        (self.context, self.sender)
    }
}

/// Continuation handle given to [`Interceptor::on_error`].
///
/// Same one-shot discipline as [`RequestHandle`].
///
/// [`Interceptor::on_error`]: crate::Interceptor::on_error
#[derive(Debug)]
pub struct ErrorHandle {
    context: ExchangeContext,
    sender: oneshot::Sender<PipelineState>,
}

impl ErrorHandle {
    pub(crate) fn channel(context: ExchangeContext) -> (Self, Resolution) {
        let (sender, receiver) = oneshot::channel();
        let resolution = Resolution { receiver, context: context.clone() };
        (Self { context, sender }, resolution)
    }

    /// Hands the (possibly replaced) error to the next interceptor.
    pub fn proceed(self, error: Error) {
        self.finish(PipelineState::continue_error(error));
    }

    /// Replaces the failure with `response`; the exchange completes
    /// successfully and the remaining error interceptors are skipped.
    pub fn recover(self, response: Response) {
        self.finish(PipelineState::recovered(response));
    }

    /// Aborts the exchange with `error` right away, skipping the remaining
    /// error interceptors.
    pub fn fail(self, error: impl Into<BoxError>) {
        let error = Error::coerce(error.into(), ErrorKind::Interceptor, &self.context);
        self.finish(PipelineState::failed(error, false));
    }

    fn finish(self, state: PipelineState) {
        let _ = self.sender.send(state);
    }

    pub(crate) fn into_parts(self) -> (ExchangeContext, oneshot::Sender<PipelineState>) {
        (self.context, self.sender)
    }
}

/// Receiving side of a handle, owned by the pipeline.
///
/// Resolves to the state the interceptor recorded. A dropped handle resolves
/// to a contract violation that is handed to the error phase, so a forgotten
/// decision shows up as an error instead of a stuck exchange.
#[derive(Debug)]
pub(crate) struct Resolution {
    receiver: oneshot::Receiver<PipelineState>,
    context: ExchangeContext,
}

impl Resolution {
    /// Non-blocking check used after an interceptor panicked: a decision
    /// recorded before the panic still wins.
    pub(crate) fn resolved_now(&mut self) -> Option<PipelineState> {
        self.receiver.try_recv().ok().flatten()
    }
}

impl Future for Resolution {
    type Output = PipelineState;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match ready!(this.receiver.poll_unpin(cx)) {
            Ok(state) => Poll::Ready(state),
            Err(oneshot::Canceled) => {
                warn!(method = %this.context.method(), uri = %this.context.uri(), "interceptor dropped its handle");
                let error =
                    Error::contract("interceptor dropped its handle without deciding").with_exchange(&this.context);
                Poll::Ready(PipelineState::failed(error, true))
            }
        }
    }
}
