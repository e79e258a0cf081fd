//! Retry policy for raw transport failures.
//!
//! The chain never retries a transport error. When re-issuing on a dropped
//! connection or a timeout is wanted, wrap the transport with tower's
//! [`RetryLayer`](tower::retry::RetryLayer) and this policy.

use std::future;

use tower::retry::Policy;
use tracing::debug;
use weft_core::{Error, Request, Response};

/// Re-issues a request when the transport fails with a connection error or a
/// timeout.
///
/// Responses are never retried here, whatever their status: status-driven
/// retries belong to interceptors.
///
/// # Example
///
/// ```ignore
/// use tower::{ServiceBuilder, retry::RetryLayer};
/// use weft::transport::{HyperTransport, ServiceTransport, TransportRetryPolicy};
///
/// let transport = ServiceTransport::new(
///     ServiceBuilder::new()
///         .layer(RetryLayer::new(TransportRetryPolicy::new(3)))
///         .service(HyperTransport::new()),
/// );
/// ```
#[derive(Debug, Clone)]
pub struct TransportRetryPolicy {
    remaining: u32,
}

impl TransportRetryPolicy {
    /// Create a new policy with the given maximum number of retries.
    #[must_use]
    pub const fn new(max_retries: u32) -> Self {
        Self {
            remaining: max_retries,
        }
    }

    /// Returns `true` if the transport error should be retried.
    fn should_retry_error(error: &Error) -> bool {
        error.is_connection() || error.is_timeout()
    }
}

impl Policy<Request, Response, Error> for TransportRetryPolicy {
    type Future = future::Ready<()>;

    fn retry(
        &mut self,
        _req: &mut Request,
        result: &mut Result<Response, Error>,
    ) -> Option<Self::Future> {
        if self.remaining == 0 {
            return None;
        }

        match result {
            Err(error) if Self::should_retry_error(error) => {
                self.remaining -= 1;
                debug!(%error, remaining = self.remaining, "retrying transport failure");
                Some(future::ready(()))
            }
            _ => None,
        }
    }

    fn clone_request(&mut self, req: &Request) -> Option<Request> {
        Some(req.clone())
    }
}
