//! Request/response logging interceptor.
//!
//! This interceptor logs every attempt using the `tracing` crate.

use std::collections::HashMap;

use bytes::Bytes;
use futures_util::future::{BoxFuture, FutureExt, ready};
use tracing::{debug, info, warn};
use weft_core::{AttemptContext, ContentType, Flow, Interceptor, Request, Response};

const REDACTED: &str = "<redacted>";
const SENSITIVE_HEADERS: [&str; 3] = ["authorization", "proxy-authorization", "cookie"];

/// Log level for the logging interceptor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    /// Log at debug level (headers and bodies).
    Debug,
    /// Log at info level (summary only).
    #[default]
    Info,
}

/// Interceptor that logs requests and responses.
///
/// Register it last to log the request as the transport sees it.
///
/// # Example
///
/// ```ignore
/// use weft::interceptors::Logging;
///
/// let chain = Chain::builder(transport)
///     .with(TransientRetry::new())
///     .with(Logging::debug())
///     .build();
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct Logging {
    level: LogLevel,
}

impl Logging {
    /// Create a new logging interceptor with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a logging interceptor that logs at debug level.
    #[must_use]
    pub const fn debug() -> Self {
        Self {
            level: LogLevel::Debug,
        }
    }

    /// Log level in use.
    #[must_use]
    pub const fn level(&self) -> LogLevel {
        self.level
    }
}

/// Copy of `headers` with credentials masked.
fn redact(headers: &HashMap<String, String>) -> HashMap<&str, &str> {
    headers
        .iter()
        .map(|(name, value)| {
            let sensitive = SENSITIVE_HEADERS
                .iter()
                .any(|candidate| name.eq_ignore_ascii_case(candidate));
            (name.as_str(), if sensitive { REDACTED } else { value.as_str() })
        })
        .collect()
}

/// Body as text for JSON and form payloads, its size otherwise.
fn describe_body(content_type: Option<&str>, body: &Bytes) -> String {
    let textual = content_type.is_some_and(|header| {
        ContentType::Json.matches(header) || ContentType::FormUrlEncoded.matches(header)
    });
    if textual {
        String::from_utf8_lossy(body).into_owned()
    } else {
        format!("<{} bytes>", body.len())
    }
}

impl Interceptor for Logging {
    fn name(&self) -> &'static str {
        "logging"
    }

    fn prepare<'a>(
        &'a self,
        ctx: &'a AttemptContext,
        request: Request,
    ) -> BoxFuture<'a, Flow<Request>> {
        let method = request.method();
        let url = request.url();
        let attempt = ctx.attempt();

        match self.level {
            LogLevel::Debug => {
                let body = request
                    .body()
                    .map(|body| describe_body(request.header("Content-Type"), body));
                debug!(
                    %method,
                    %url,
                    attempt,
                    headers = ?redact(request.headers()),
                    body = ?body,
                    "sending request"
                );
            }
            LogLevel::Info => {
                info!(%method, %url, attempt, "sending request");
            }
        }

        ready(Flow::Continue(request)).boxed()
    }

    fn observe<'a>(
        &'a self,
        ctx: &'a AttemptContext,
        request: &'a Request,
        response: Response,
    ) -> BoxFuture<'a, Flow<Response>> {
        let status = response.status();
        let attempt = ctx.attempt();
        let url = request.url();

        if self.level == LogLevel::Debug {
            debug!(
                status,
                %url,
                attempt,
                headers = ?redact(response.headers()),
                body = %describe_body(response.header("Content-Type"), response.body()),
                "response received"
            );
        }

        if response.is_success() {
            info!(status, %url, attempt, "request completed");
        } else {
            warn!(status, %url, attempt, "request failed with HTTP error");
        }

        ready(Flow::Continue(response)).boxed()
    }
}
