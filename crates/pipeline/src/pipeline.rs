use std::fmt;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::exchange::{Action, Body, Error, ErrorKind, ExchangeContext, PipelineState, Request, Response};
use crate::interceptor::{Interceptor, invoke};
use crate::transport::Transport;

/// The engine that walks an exchange through its phases.
///
/// A request first visits every interceptor's request hook in registration
/// order, then the transport, then every response hook, again in
/// registration order. A failure anywhere jumps into the error phase, which
/// visits the error hooks from the first interceptor on. Short-circuit and
/// fail decisions leave a phase early, as described on
/// [`RequestHandle`](crate::RequestHandle).
///
/// `Pipeline` is cheap to clone and a single instance may run any number of
/// exchanges concurrently; interceptors that cannot tolerate that are
/// wrapped in [`Sequential`](crate::Sequential) by their author.
#[derive(Clone)]
pub struct Pipeline {
    interceptors: Arc<[Arc<dyn Interceptor>]>,
    transport: Arc<dyn Transport>,
}

/// Where the exchange currently is. `send` loops over this until the
/// exchange reaches `Done` or `Failed`.
enum Step {
    RequestPhase(PipelineState),
    Transport(PipelineState),
    ResponsePhase(PipelineState),
    ErrorPhase(PipelineState),
    Done(Response),
    Failed(Error),
}

impl Pipeline {
    pub fn new(interceptors: Vec<Arc<dyn Interceptor>>, transport: Arc<dyn Transport>) -> Self {
        Self { interceptors: interceptors.into(), transport }
    }

    /// Runs `request` through the pipeline and returns the final response.
    ///
    /// The delivered response body is always fully buffered: a streaming
    /// body coming out of the last response hook is collected here, so
    /// callers and error hooks never observe a half-consumed stream.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] if:
    /// - an interceptor failed the exchange and no error hook recovered it
    /// - the transport failed and no error hook recovered it
    /// - an interceptor broke the handle contract: dropped it, panicked, or
    ///   resolved a phase without the value that phase needs
    /// - collecting the delivered response body failed
    pub async fn send(&self, request: Request) -> Result<Response, Error> {
        let context = ExchangeContext::of(&request);
        debug!(method = %context.method(), uri = %context.uri(), "exchange entering pipeline");

        let mut step = Step::RequestPhase(PipelineState::enter(request));
        loop {
            step = match step {
                Step::RequestPhase(state) => self.request_phase(state, &context).await,
                Step::Transport(state) => self.dispatch(state, &context).await,
                Step::ResponsePhase(state) => self.response_phase(state, &context).await,
                Step::ErrorPhase(state) => self.error_phase(state, &context).await,
                Step::Done(response) => {
                    debug!(status = %response.status(), "exchange delivered");
                    return buffer(response, &context).await;
                }
                Step::Failed(error) => {
                    debug!(cause = %error, "exchange failed");
                    return Err(error);
                }
            };
        }
    }

    async fn request_phase(&self, mut state: PipelineState, context: &ExchangeContext) -> Step {
        for (index, interceptor) in self.interceptors.iter().enumerate() {
            let request = match state.take_request() {
                Some(request) => request,
                None => return Step::Failed(Error::contract("request phase reached without a request").with_exchange(context)),
            };

            state = invoke::request(interceptor.as_ref(), request, context).await;
            trace!(index, action = ?state.action(), "request hook resolved");

            match state.action() {
                Action::Continue => {}
                Action::ShortCircuit => return done_step(state, context),
                Action::ShortCircuitContinue => return Step::ResponsePhase(state),
                Action::Fail => return failed_step(state, context),
                Action::FailContinue => return Step::ErrorPhase(state),
            }
        }
        Step::Transport(state)
    }

    async fn dispatch(&self, mut state: PipelineState, context: &ExchangeContext) -> Step {
        let request = match state.take_request() {
            Some(request) => request,
            None => return Step::Failed(Error::contract("transport reached without a request").with_exchange(context)),
        };

        match self.transport.send(request).await {
            Ok(response) => {
                trace!(status = %response.status(), "transport produced a response");
                Step::ResponsePhase(PipelineState::continue_response(response))
            }
            Err(source) => {
                let error = Error::coerce(source, ErrorKind::Transport, context);
                trace!(cause = %error, "transport failed");
                Step::ErrorPhase(PipelineState::failed(error, true))
            }
        }
    }

    async fn response_phase(&self, mut state: PipelineState, context: &ExchangeContext) -> Step {
        for (index, interceptor) in self.interceptors.iter().enumerate() {
            let response = match state.take_response() {
                Some(response) => response,
                None => {
                    return Step::Failed(Error::contract("response phase reached without a response").with_exchange(context));
                }
            };

            state = invoke::response(interceptor.as_ref(), response, context).await;
            trace!(index, action = ?state.action(), "response hook resolved");

            match state.action() {
                // a short-circuit that asked for the response phase is, from
                // here on, just a continue
                Action::Continue | Action::ShortCircuitContinue => {}
                Action::ShortCircuit => return done_step(state, context),
                Action::Fail => return failed_step(state, context),
                Action::FailContinue => return Step::ErrorPhase(state),
            }
        }
        done_step(state, context)
    }

    async fn error_phase(&self, mut state: PipelineState, context: &ExchangeContext) -> Step {
        for (index, interceptor) in self.interceptors.iter().enumerate() {
            let error = match state.take_error() {
                Some(error) => error,
                None => return Step::Failed(Error::contract("error phase reached without an error").with_exchange(context)),
            };

            state = invoke::error(interceptor.as_ref(), error, context).await;
            trace!(index, action = ?state.action(), "error hook resolved");

            match state.action() {
                Action::Continue | Action::FailContinue => {}
                Action::ShortCircuit | Action::ShortCircuitContinue => {
                    debug!(index, "error hook recovered the exchange");
                    return done_step(state, context);
                }
                Action::Fail => return failed_step(state, context),
            }
        }
        failed_step(state, context)
    }
}

fn done_step(mut state: PipelineState, context: &ExchangeContext) -> Step {
    match state.take_response() {
        Some(response) => Step::Done(response),
        None => Step::Failed(Error::contract("decision delivered no response").with_exchange(context)),
    }
}

fn failed_step(mut state: PipelineState, context: &ExchangeContext) -> Step {
    match state.take_error() {
        Some(error) => Step::Failed(error.with_exchange(context)),
        None => Step::Failed(Error::contract("failure decision carried no error").with_exchange(context)),
    }
}

async fn buffer(response: Response, context: &ExchangeContext) -> Result<Response, Error> {
    let (parts, body) = response.into_parts();
    let bytes = body.into_bytes().await.map_err(|error| error.with_exchange(context))?;
    Ok(Response::from_parts(parts, Body::full(bytes)))
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline").field("interceptors", &self.interceptors.len()).finish_non_exhaustive()
    }
}
