use crate::exchange::error::Error;
use crate::exchange::{Request, Response};

/// The decision an interceptor records on its continuation handle.
///
/// `Continue` keeps the current phase walking. The short-circuit and fail
/// variants leave the current phase; their `..Continue` forms additionally
/// run the remaining interceptors of the phase they jump into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Hand the value to the next interceptor of the current phase.
    Continue,
    /// Skip straight to delivery with the recorded response.
    ShortCircuit,
    /// Skip the rest of this phase and enter the response phase.
    ShortCircuitContinue,
    /// Abort the exchange with the recorded error.
    Fail,
    /// Leave this phase and enter the error phase.
    FailContinue,
}

/// Snapshot of an in-flight exchange between two pipeline steps.
///
/// Exactly the fields implied by [`Action`] are populated: a `Continue` out
/// of the request phase carries a request, short-circuits carry a response,
/// failures carry an error. The pipeline moves values out of the state as it
/// enters each step, so a hole here means an interceptor broke its contract.
#[derive(Debug)]
pub struct PipelineState {
    request: Option<Request>,
    response: Option<Response>,
    error: Option<Error>,
    action: Action,
}

impl PipelineState {
    /// Initial state for a freshly accepted request.
    pub(crate) fn enter(request: Request) -> Self {
        Self::continue_request(request)
    }

    pub(crate) fn continue_request(request: Request) -> Self {
        Self { request: Some(request), response: None, error: None, action: Action::Continue }
    }

    pub(crate) fn continue_response(response: Response) -> Self {
        Self { request: None, response: Some(response), error: None, action: Action::Continue }
    }

    pub(crate) fn continue_error(error: Error) -> Self {
        Self { request: None, response: None, error: Some(error), action: Action::Continue }
    }

    pub(crate) fn short_circuited(response: Response, propagate: bool) -> Self {
        let action = if propagate { Action::ShortCircuitContinue } else { Action::ShortCircuit };
        Self { request: None, response: Some(response), error: None, action }
    }

    pub(crate) fn failed(error: Error, propagate: bool) -> Self {
        let action = if propagate { Action::FailContinue } else { Action::Fail };
        Self { request: None, response: None, error: Some(error), action }
    }

    /// An error interceptor replaced the failure with a response.
    pub(crate) fn recovered(response: Response) -> Self {
        Self { request: None, response: Some(response), error: None, action: Action::ShortCircuit }
    }

    pub fn action(&self) -> Action {
        self.action
    }

    pub fn request(&self) -> Option<&Request> {
        self.request.as_ref()
    }

    pub fn response(&self) -> Option<&Response> {
        self.response.as_ref()
    }

    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    pub(crate) fn take_request(&mut self) -> Option<Request> {
        self.request.take()
    }

    pub(crate) fn take_response(&mut self) -> Option<Response> {
        self.response.take()
    }

    pub(crate) fn take_error(&mut self) -> Option<Error> {
        self.error.take()
    }
}

#[cfg(test)]
mod tests {
    use crate::exchange::state::{Action, PipelineState};
    use crate::exchange::{Body, Request, Response};

    fn request() -> Request {
        http::Request::builder().uri("http://example.com/").body(Body::empty()).unwrap()
    }

    #[test]
    fn test_continue_states_carry_one_value() {
        let mut state = PipelineState::enter(request());
        assert_eq!(state.action(), Action::Continue);
        assert!(state.take_request().is_some());
        assert!(state.response().is_none());
        assert!(state.error().is_none());

        let mut state = PipelineState::continue_response(Response::new(Body::empty()));
        assert_eq!(state.action(), Action::Continue);
        assert!(state.take_response().is_some());
        assert!(state.request().is_none());
    }

    #[test]
    fn test_propagate_flag_selects_action() {
        let state = PipelineState::short_circuited(Response::new(Body::empty()), false);
        assert_eq!(state.action(), Action::ShortCircuit);

        let state = PipelineState::short_circuited(Response::new(Body::empty()), true);
        assert_eq!(state.action(), Action::ShortCircuitContinue);

        let state = PipelineState::failed(crate::Error::contract("nope"), false);
        assert_eq!(state.action(), Action::Fail);

        let state = PipelineState::failed(crate::Error::contract("nope"), true);
        assert_eq!(state.action(), Action::FailContinue);
    }

    #[test]
    fn test_recovered_short_circuits() {
        let mut state = PipelineState::recovered(Response::new(Body::empty()));
        assert_eq!(state.action(), Action::ShortCircuit);
        assert!(state.take_response().is_some());
        assert!(state.error().is_none());
    }

    #[test]
    fn test_take_moves_the_value_out() {
        let mut state = PipelineState::enter(request());
        assert!(state.take_request().is_some());
        assert!(state.take_request().is_none());
    }
}
