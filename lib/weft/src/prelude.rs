//! Prelude module for convenient imports.
//!
//! This module re-exports the most commonly used types for easy glob
//! importing:
//!
//! ```ignore
//! use weft::prelude::*;
//! ```

#[cfg(feature = "transport-hyper")]
pub use crate::HyperTransport;
pub use crate::{
    ApiExecutor, ApiRequest, AttemptContext, BoxFuture, Chain, ChainConfig, ClientConfig, Error,
    Flow, Interceptor, Method, Request, RequestBuilder, Response, Result, RetrySignal, Transport,
};
pub use serde::{Deserialize, Serialize};
