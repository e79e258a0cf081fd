//! The interceptor contract.
//!
//! An [`Interceptor`] has two hooks:
//! - [`Interceptor::prepare`] runs before the transport, in registration order,
//!   and threads the request from one interceptor to the next;
//! - [`Interceptor::observe`] runs after the transport, in the same order, over
//!   the response and the exact request that produced it.
//!
//! Each hook answers with a [`Flow`]: keep going, restart the whole pipeline
//! ([`Flow::Retry`]), or stop with a terminal error ([`Flow::Fail`]). Retrying
//! is an ordinary outcome, not an error: it never reaches the caller directly.
//!
//! # Example
//!
//! ```
//! use futures_util::future::{BoxFuture, FutureExt, ready};
//! use weft_core::{AttemptContext, Flow, Interceptor, Request};
//!
//! struct RequestId;
//!
//! impl Interceptor for RequestId {
//!     fn prepare<'a>(
//!         &'a self,
//!         ctx: &'a AttemptContext,
//!         mut request: Request,
//!     ) -> BoxFuture<'a, Flow<Request>> {
//!         request.set_header("X-Attempt", ctx.attempt().to_string());
//!         ready(Flow::Continue(request)).boxed()
//!     }
//! }
//! ```

use futures_util::future::{BoxFuture, FutureExt, ready};

use crate::{Error, Request, Response};

/// Outcome of an interceptor hook.
#[derive(Debug)]
#[must_use]
pub enum Flow<T> {
    /// Pass the (possibly modified) value to the next step.
    Continue(T),
    /// Discard the rest of this attempt and restart the pipeline.
    Retry(RetrySignal),
    /// Abort the call with a terminal error; never retried.
    Fail(Error),
}

impl<T> Flow<T> {
    /// Retry without a cause.
    pub const fn retry() -> Self {
        Self::Retry(RetrySignal::new())
    }

    /// Retry, recording why.
    pub fn retry_because(cause: Error) -> Self {
        Self::Retry(RetrySignal::because(cause))
    }

    /// Returns `true` for [`Flow::Continue`].
    #[must_use]
    pub const fn is_continue(&self) -> bool {
        matches!(self, Self::Continue(_))
    }

    /// Returns `true` for [`Flow::Retry`].
    #[must_use]
    pub const fn is_retry(&self) -> bool {
        matches!(self, Self::Retry(_))
    }

    /// Transform the carried value.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Flow<U> {
        match self {
            Self::Continue(value) => Flow::Continue(f(value)),
            Self::Retry(signal) => Flow::Retry(signal),
            Self::Fail(error) => Flow::Fail(error),
        }
    }
}

impl<T> From<crate::Result<T>> for Flow<T> {
    fn from(result: crate::Result<T>) -> Self {
        match result {
            Ok(value) => Self::Continue(value),
            Err(error) => Self::Fail(error),
        }
    }
}

/// Request to re-run the pipeline, with the optional reason.
#[derive(Debug, Default)]
pub struct RetrySignal {
    cause: Option<Error>,
}

impl RetrySignal {
    /// Signal without a cause.
    #[must_use]
    pub const fn new() -> Self {
        Self { cause: None }
    }

    /// Signal carrying the error that precipitated it.
    #[must_use]
    pub const fn because(cause: Error) -> Self {
        Self { cause: Some(cause) }
    }

    /// The recorded cause, if any.
    #[must_use]
    pub const fn cause(&self) -> Option<&Error> {
        self.cause.as_ref()
    }

    /// Consume into the cause.
    #[must_use]
    pub fn into_cause(self) -> Option<Error> {
        self.cause
    }
}

/// Position of the current attempt within a single call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptContext {
    attempt: u32,
    max_retries: u32,
}

impl AttemptContext {
    /// Context for the given 1-based attempt.
    #[must_use]
    pub const fn new(attempt: u32, max_retries: u32) -> Self {
        Self {
            attempt,
            max_retries,
        }
    }

    /// 1-based attempt number.
    #[must_use]
    pub const fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Configured retry budget.
    #[must_use]
    pub const fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Returns `true` on the first attempt.
    #[must_use]
    pub const fn is_first(&self) -> bool {
        self.attempt == 1
    }

    /// Returns `true` when a retry requested now would exhaust the budget.
    #[must_use]
    pub const fn is_last(&self) -> bool {
        self.attempt > self.max_retries
    }
}

/// A unit of cross-cutting behavior applied around every call.
///
/// Both hooks default to pass-through. Side effects (logging, refreshing a
/// shared credential) belong to the interceptor; the chain only reacts to the
/// returned [`Flow`].
pub trait Interceptor: Send + Sync {
    /// Name used in logs and errors.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Inspect or modify the outgoing request.
    fn prepare<'a>(
        &'a self,
        ctx: &'a AttemptContext,
        request: Request,
    ) -> BoxFuture<'a, Flow<Request>> {
        let _ = ctx;
        ready(Flow::Continue(request)).boxed()
    }

    /// Inspect or modify the response produced by `request`.
    fn observe<'a>(
        &'a self,
        ctx: &'a AttemptContext,
        request: &'a Request,
        response: Response,
    ) -> BoxFuture<'a, Flow<Response>> {
        let _ = (ctx, request);
        ready(Flow::Continue(response)).boxed()
    }
}
