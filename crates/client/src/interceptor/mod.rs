//! Ready-made interceptors for everyday client concerns.

mod default_headers;
mod logging;

pub use default_headers::DefaultHeaders;
pub use logging::LogInterceptor;
