//! Prelude module for convenient imports.
//!
//! ```ignore
//! use weft_core::prelude::*;
//! ```

pub use crate::{
    AttemptContext, BoxFuture, Error, Flow, Interceptor, Method, Request, RequestBuilder,
    Response, Result, RetrySignal, Transport,
};
