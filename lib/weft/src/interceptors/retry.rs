//! Retry on transient HTTP statuses.

use std::time::Duration;

use futures_util::future::{BoxFuture, FutureExt};
use tracing::warn;
use weft_core::{AttemptContext, Error, Flow, Interceptor, Request, Response};

use crate::status::StatusPolicy;

/// Default delay before a retry is signalled.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Signals a retry when the response status is transient.
///
/// The cause recorded with the signal is an [`Error::Http`] carrying the
/// status and the response body, so it becomes the caller's error once the
/// retry budget runs out. The delay is skipped on the last allowed attempt.
///
/// # Example
///
/// ```ignore
/// use weft::interceptors::{StatusPolicy, TransientRetry};
///
/// let retry = TransientRetry::new()
///     .statuses(StatusPolicy::server_errors().with_status(429))
///     .delay(Duration::from_millis(200));
/// ```
#[derive(Debug, Clone)]
pub struct TransientRetry {
    statuses: StatusPolicy,
    delay: Option<Duration>,
}

impl Default for TransientRetry {
    fn default() -> Self {
        Self {
            statuses: StatusPolicy::default(),
            delay: Some(DEFAULT_RETRY_DELAY),
        }
    }
}

impl TransientRetry {
    /// Retry on 5xx after [`DEFAULT_RETRY_DELAY`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the set of transient statuses.
    #[must_use]
    pub fn statuses(mut self, statuses: StatusPolicy) -> Self {
        self.statuses = statuses;
        self
    }

    /// Wait `delay` before signalling a retry.
    #[must_use]
    pub const fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Signal retries immediately.
    #[must_use]
    pub const fn without_delay(mut self) -> Self {
        self.delay = None;
        self
    }
}

impl Interceptor for TransientRetry {
    fn name(&self) -> &'static str {
        "transient_retry"
    }

    fn observe<'a>(
        &'a self,
        ctx: &'a AttemptContext,
        _request: &'a Request,
        response: Response,
    ) -> BoxFuture<'a, Flow<Response>> {
        async move {
            let status = response.status();
            if !self.statuses.contains(status) {
                return Flow::Continue(response);
            }

            if let Some(delay) = self.delay.filter(|_| !ctx.is_last()) {
                tokio::time::sleep(delay).await;
            }

            warn!(status, attempt = ctx.attempt(), "transient status, retrying");
            Flow::retry_because(Error::http_with_body(
                status,
                format!("transient status {status}"),
                response.into_body(),
            ))
        }
        .boxed()
    }
}
