//! The interceptor chain execution engine.
//!
//! A [`Chain`] owns an ordered list of interceptors and a transport. For every
//! call it runs the pre-flight hooks in registration order, performs the round
//! trip, then runs the post-flight hooks in the same order:
//!
//! ```text
//! send ─► prepare₁ … prepareₙ ─► transport ─► observe₁ … observeₙ ─► caller
//!   ▲                                                   │
//!   └────────────── Flow::Retry (within budget) ◄───────┘
//! ```
//!
//! A [`Flow::Retry`] raised by any hook restarts the pipeline from the first
//! pre-flight hook, seeded with the request as it was threaded so far. Once
//! the attempt counter exceeds [`ChainConfig::max_retries`] the most recent
//! retry cause is returned, or [`Error::RetriesExhausted`] if no hook ever gave
//! one. Terminal failures, from a hook or from the transport, are returned
//! immediately and never retried.
//!
//! The chain keeps no per-call state: the attempt counter, the last cause and
//! the in-flight request live in the future returned by [`Chain::send`], so
//! independent calls may run concurrently. Dropping that future cancels the
//! call at whichever await point is active (round trip, retry delay, refresh
//! action) and no new attempt is started.
//!
//! # Example
//!
//! ```ignore
//! use weft::{Chain, HyperTransport};
//! use weft::interceptors::{Logging, TransientRetry};
//!
//! let chain = Chain::builder(HyperTransport::new())
//!     .with(TransientRetry::new())
//!     .with(Logging::new())
//!     .max_retries(2)
//!     .build();
//!
//! let response = chain.send(request).await?;
//! ```

use std::fmt;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;

use tower_service::Service;
use tracing::{Instrument, debug, info_span, warn};
use weft_core::{
    AttemptContext, BoxFuture, Error, Flow, Interceptor, Request, Response, Result, RetrySignal,
    Transport,
};

use crate::config::{ChainConfig, ChainConfigBuilder};

/// How a single attempt ended.
enum Step {
    Done(Response),
    Retry(RetrySignal),
    Fail(Error),
}

/// Interceptor chain around a transport.
///
/// Cheap to clone: interceptors and transport are shared.
pub struct Chain<T> {
    interceptors: Arc<[Arc<dyn Interceptor>]>,
    transport: Arc<T>,
    config: ChainConfig,
}

impl<T> Clone for Chain<T> {
    fn clone(&self) -> Self {
        Self {
            interceptors: Arc::clone(&self.interceptors),
            transport: Arc::clone(&self.transport),
            config: self.config,
        }
    }
}

impl<T> fmt::Debug for Chain<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain")
            .field(
                "interceptors",
                &self.interceptors.iter().map(|i| i.name()).collect::<Vec<_>>(),
            )
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<T: Transport> Chain<T> {
    /// Chain without interceptors and with the default configuration.
    #[must_use]
    pub fn new(transport: T) -> Self {
        Self::builder(transport).build()
    }

    /// Create a new chain builder.
    #[must_use]
    pub fn builder(transport: T) -> ChainBuilder<T> {
        ChainBuilder::new(transport)
    }

    /// Get the chain configuration.
    #[must_use]
    pub const fn config(&self) -> &ChainConfig {
        &self.config
    }

    /// The wrapped transport.
    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Number of registered interceptors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    /// Returns `true` if no interceptor is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }

    /// Send a request through the chain.
    ///
    /// # Errors
    ///
    /// - the terminal error of a hook or of the transport, unchanged;
    /// - on retry exhaustion, the last cause recorded by a retry signal, or
    ///   [`Error::RetriesExhausted`] when none was recorded.
    pub async fn send(&self, request: Request) -> Result<Response> {
        let span = info_span!(
            "interceptor_chain",
            method = %request.method(),
            url = %request.url(),
            max_retries = self.config.max_retries,
        );
        self.run(request).instrument(span).await
    }

    async fn run(&self, mut request: Request) -> Result<Response> {
        let mut attempt: u32 = 0;
        let mut last_cause: Option<Error> = None;
        let started = Instant::now();

        loop {
            attempt = attempt.saturating_add(1);
            let ctx = AttemptContext::new(attempt, self.config.max_retries);
            debug!(attempt, "starting attempt");

            let (carried, step) = self.attempt(&ctx, request).await;
            request = carried;

            let elapsed_ms = started.elapsed().as_millis();
            let signal = match step {
                Step::Done(response) => {
                    debug!(attempt, status = response.status(), elapsed_ms, "call completed");
                    return Ok(response);
                }
                Step::Fail(error) => {
                    debug!(attempt, %error, elapsed_ms, "call failed");
                    return Err(error);
                }
                Step::Retry(signal) => signal,
            };

            if let Some(cause) = signal.into_cause() {
                last_cause = Some(cause);
            }

            if ctx.is_last() {
                warn!(attempts = attempt, cause = ?last_cause, elapsed_ms, "retries exhausted");
                return Err(last_cause.unwrap_or(Error::RetriesExhausted { attempts: attempt }));
            }

            warn!(attempt, cause = ?last_cause, "retry scheduled");
        }
    }

    /// Runs one attempt and returns the request to carry into the next one.
    async fn attempt(&self, ctx: &AttemptContext, mut request: Request) -> (Request, Step) {
        for interceptor in self.interceptors.iter() {
            let flow = interceptor.prepare(ctx, request.clone()).await;
            match flow {
                Flow::Continue(prepared) => request = prepared,
                Flow::Retry(signal) => {
                    debug!(interceptor = interceptor.name(), "retry requested before sending");
                    return (request, Step::Retry(signal));
                }
                Flow::Fail(error) => return (request, Step::Fail(error)),
            }
        }

        let mut response = match self.transport.perform(request.clone()).await {
            Ok(response) => response,
            Err(error) => return (request, Step::Fail(error)),
        };

        for interceptor in self.interceptors.iter() {
            let flow = interceptor.observe(ctx, &request, response).await;
            match flow {
                Flow::Continue(observed) => response = observed,
                Flow::Retry(signal) => {
                    debug!(interceptor = interceptor.name(), "retry requested on response");
                    return (request, Step::Retry(signal));
                }
                Flow::Fail(error) => return (request, Step::Fail(error)),
            }
        }

        (request, Step::Done(response))
    }
}

impl<T: Transport> Transport for Chain<T> {
    fn perform(&self, request: Request) -> impl Future<Output = Result<Response>> + Send {
        self.send(request)
    }
}

impl<T: Transport + 'static> Service<Request> for Chain<T> {
    type Response = Response;
    type Error = Error;
    type Future = BoxFuture<'static, Result<Response>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request) -> Self::Future {
        let chain = self.clone();
        Box::pin(async move { chain.send(request).await })
    }
}

/// Builder for [`Chain`].
///
/// Interceptors run in the order they are added, in both phases.
pub struct ChainBuilder<T> {
    transport: T,
    interceptors: Vec<Arc<dyn Interceptor>>,
    config: ChainConfigBuilder,
}

impl<T> fmt::Debug for ChainBuilder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainBuilder")
            .field("interceptors_count", &self.interceptors.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<T: Transport> ChainBuilder<T> {
    /// Creates a new builder around the transport.
    #[must_use]
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            interceptors: Vec::new(),
            config: ChainConfigBuilder::default(),
        }
    }

    /// Append an interceptor.
    #[must_use]
    pub fn with<I>(self, interceptor: I) -> Self
    where
        I: Interceptor + 'static,
    {
        self.with_arc(Arc::new(interceptor))
    }

    /// Append a shared interceptor.
    #[must_use]
    pub fn with_arc(mut self, interceptor: Arc<dyn Interceptor>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    /// Set the retry budget.
    #[must_use]
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.config = self.config.max_retries(max_retries);
        self
    }

    /// Replace the whole configuration.
    #[must_use]
    pub fn config(mut self, config: ChainConfig) -> Self {
        self.config = ChainConfigBuilder::default().max_retries(config.max_retries);
        self
    }

    /// Build the chain.
    #[must_use]
    pub fn build(self) -> Chain<T> {
        Chain {
            interceptors: self.interceptors.into(),
            transport: Arc::new(self.transport),
            config: self.config.build(),
        }
    }
}
