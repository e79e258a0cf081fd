//! Composable request/response interceptors with a bounded retry loop.
//!
//! A [`Chain`] wraps a [`Transport`] with an ordered list of
//! [`Interceptor`]s. Each call runs every `prepare` hook, performs one round
//! trip, then runs every `observe` hook. Any hook may ask to restart the whole
//! pipeline; restarts are bounded by [`ChainConfig::max_retries`].
//!
//! # Example
//!
//! ```ignore
//! use weft::prelude::*;
//! use weft::interceptors::{Logging, TokenCache, TokenRefresh, TransientRetry};
//!
//! let cache = TokenCache::with_token(initial_token);
//! let refresher = {
//!     let cache = cache.clone();
//!     move || {
//!         let cache = cache.clone();
//!         async move { cache.refresh_with(login).await }
//!     }
//! };
//!
//! let chain = Chain::builder(HyperTransport::new())
//!     .with(TransientRetry::new())
//!     .with(TokenRefresh::new(cache, refresher))
//!     .with(Logging::new())
//!     .max_retries(3)
//!     .build();
//!
//! let users = ApiExecutor::new(chain, "https://api.example.com/")?;
//! let user = users.send(&GetUser(42)).await?;
//! ```

mod chain;
mod config;
pub mod executor;
pub mod interceptors;
pub mod prelude;
mod status;
pub mod transport;

// Re-export engine types
pub use chain::{Chain, ChainBuilder};
pub use config::{
    ChainConfig, ChainConfigBuilder, ClientConfig, ClientConfigBuilder, DEFAULT_MAX_RETRIES,
    DEFAULT_USER_AGENT,
};
pub use executor::{ApiExecutor, ApiRequest};
pub use status::StatusPolicy;
#[cfg(feature = "transport-hyper")]
pub use transport::HyperTransport;
pub use transport::{ServiceTransport, TransportRetryPolicy, transport_fn};

// Re-export tower for transport composition
pub use tower;

// Re-export core types
pub use weft_core::{
    AttemptContext, BoxError, BoxFuture, ContentType, DefaultErrorDecoder, Error, ErrorDecoder,
    Flow, Interceptor, Method, Request, RequestBuilder, Response, Result, RetrySignal, Transport,
    from_json, to_json,
};
