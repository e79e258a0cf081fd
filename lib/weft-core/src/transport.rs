//! The transport boundary.
//!
//! A [`Transport`] performs exactly one request/response round trip. It knows
//! nothing about interceptors or retries; its failures are terminal for the
//! chain that drives it.

use std::future::Future;
use std::sync::Arc;

use crate::{Request, Response, Result};

/// Performs one HTTP round trip.
///
/// Implementations should be async-first and may be shared between
/// concurrent calls.
pub trait Transport: Send + Sync {
    /// Send the request and return the fully buffered response.
    ///
    /// # Errors
    ///
    /// Returns an error if the round trip fails:
    /// - Network errors
    /// - TLS errors
    /// - Timeouts
    fn perform(&self, request: Request) -> impl Future<Output = Result<Response>> + Send;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn perform(&self, request: Request) -> impl Future<Output = Result<Response>> + Send {
        (**self).perform(request)
    }
}

impl<T: Transport + ?Sized> Transport for &T {
    fn perform(&self, request: Request) -> impl Future<Output = Result<Response>> + Send {
        (**self).perform(request)
    }
}
