//! Ready-made interceptors.
//!
//! - [`TransientRetry`] - restarts the pipeline on transient statuses (5xx by default)
//! - [`TokenRefresh`] - attaches a token and refreshes it when the server rejects it
//! - [`Authorization`] - places a token in a header, the query string or a form body
//! - [`Logging`] - logs every attempt with `tracing`
//!
//! Credentials are read and renewed through [`TokenProvider`] and
//! [`TokenRefresher`]; [`TokenCache`] is a shared in-memory implementation.

mod authorization;
mod credentials;
mod logging;
mod retry;
mod token_refresh;

pub use authorization::{Authorization, AuthorizationConfig};
pub use credentials::{TokenCache, TokenFormat, TokenProvider, TokenRefresher};
pub use logging::{LogLevel, Logging};
pub use retry::{DEFAULT_RETRY_DELAY, TransientRetry};
pub use token_refresh::{AUTHORIZATION, TokenRefresh};

pub use crate::status::StatusPolicy;
