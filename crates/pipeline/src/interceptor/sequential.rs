use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::exchange::{Error, ExchangeContext, PipelineState, Request, Response};
use crate::interceptor::handle::{ErrorHandle, RequestHandle, ResponseHandle};
use crate::interceptor::{Interceptor, invoke};
use crate::queue::SequentialQueue;

/// Serializes an interceptor across concurrently in-flight exchanges.
///
/// A pipeline shared by many tasks invokes its interceptors concurrently,
/// one exchange per caller. For an interceptor whose hook must not interleave
/// with itself (think token refresh), wrap it in `Sequential`: each of its
/// three hooks is put on its own [`SequentialQueue`], so per phase the inner
/// interceptor handles one exchange at a time, in arrival order, and has
/// fully resolved its handle before it sees the next one. Phases do not
/// block each other.
///
/// The wrapper is transparent to the pipeline: decisions of the inner
/// interceptor, including short-circuits, failures, panics and forgotten
/// handles, come out of the queue unchanged.
pub struct Sequential<I> {
    inner: Arc<I>,
    request_queue: SequentialQueue<PipelineState>,
    response_queue: SequentialQueue<PipelineState>,
    error_queue: SequentialQueue<PipelineState>,
}

impl<I> Sequential<I>
where
    I: Interceptor + 'static,
{
    pub fn new(inner: I) -> Self {
        Self {
            inner: Arc::new(inner),
            request_queue: SequentialQueue::new(),
            response_queue: SequentialQueue::new(),
            error_queue: SequentialQueue::new(),
        }
    }

    /// Stops accepting exchanges and waits for the already queued ones.
    ///
    /// Exchanges reaching this interceptor afterwards fail with a contract
    /// error.
    pub async fn close(&self) {
        self.request_queue.close().await;
        self.response_queue.close().await;
        self.error_queue.close().await;
    }
}

/// Queues `job` and hands its decision back, turning a rejected or aborted
/// submission into a contract failure on the spot.
async fn run_queued<F>(queue: &SequentialQueue<PipelineState>, context: &ExchangeContext, job: F) -> PipelineState
where
    F: Future<Output = PipelineState> + Send + 'static,
{
    match queue.enqueue(job) {
        Ok(completion) => match completion.await {
            Ok(state) => state,
            Err(aborted) => {
                warn!(method = %context.method(), uri = %context.uri(), "sequential task aborted before deciding");
                PipelineState::failed(Error::contract(aborted).with_exchange(context), false)
            }
        },
        Err(closed) => {
            warn!(method = %context.method(), uri = %context.uri(), "exchange reached a closed sequential interceptor");
            PipelineState::failed(Error::contract(closed).with_exchange(context), false)
        }
    }
}

#[async_trait]
impl<I> Interceptor for Sequential<I>
where
    I: Interceptor + 'static,
{
    async fn on_request(&self, request: Request, handle: RequestHandle) {
        let (context, sender) = handle.into_parts();
        let inner = Arc::clone(&self.inner);
        let job_context = context.clone();
        let job = async move { invoke::request(inner.as_ref(), request, &job_context).await };

        let state = run_queued(&self.request_queue, &context, job).await;
        let _ = sender.send(state);
    }

    async fn on_response(&self, response: Response, handle: ResponseHandle) {
        let (context, sender) = handle.into_parts();
        let inner = Arc::clone(&self.inner);
        let job_context = context.clone();
        let job = async move { invoke::response(inner.as_ref(), response, &job_context).await };

        let state = run_queued(&self.response_queue, &context, job).await;
        let _ = sender.send(state);
    }

    async fn on_error(&self, error: Error, handle: ErrorHandle) {
        let (context, sender) = handle.into_parts();
        let inner = Arc::clone(&self.inner);
        let job_context = context.clone();
        let job = async move { invoke::error(inner.as_ref(), error, &job_context).await };

        let state = run_queued(&self.error_queue, &context, job).await;
        let _ = sender.send(state);
    }
}

impl<I> fmt::Debug for Sequential<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sequential")
            .field("request_queue", &self.request_queue)
            .field("response_queue", &self.response_queue)
            .field("error_queue", &self.error_queue)
            .finish()
    }
}
