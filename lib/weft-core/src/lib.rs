//! Core types and contracts for the weft interceptor chain.
//!
//! This crate provides the foundational types used by weft:
//! - [`Method`] - HTTP method enum
//! - [`Request`] and [`RequestBuilder`] - outgoing request value
//! - [`Response`] - buffered HTTP response
//! - [`Error`] and [`Result`] - error handling
//! - [`Transport`] - one request/response round trip
//! - [`Interceptor`], [`Flow`], [`RetrySignal`], [`AttemptContext`] - the
//!   contract every interceptor implements
//! - [`ErrorDecoder`] - typed decoding of error responses

mod body;
mod error;
mod interceptor;
mod method;
pub mod prelude;
mod request;
mod response;
mod transport;

pub use body::{ContentType, from_json, to_json};
pub use error::{BoxError, DefaultErrorDecoder, Error, ErrorDecoder, Result};
pub use interceptor::{AttemptContext, Flow, Interceptor, RetrySignal};
pub use method::Method;
pub use request::{Request, RequestBuilder};
pub use response::Response;
pub use transport::Transport;

// Hook signatures use boxed futures
pub use futures_util::future::BoxFuture;
