//! Credential refresh on authentication failures.

use std::collections::HashSet;

use futures_util::future::{BoxFuture, FutureExt, ready};
use tracing::{info, warn};
use weft_core::{AttemptContext, Error, Flow, Interceptor, Request, Response};

use super::credentials::{TokenFormat, TokenProvider, TokenRefresher};

/// Default header carrying the credential.
pub const AUTHORIZATION: &str = "Authorization";

/// Attaches the current token and refreshes it when the server rejects it.
///
/// Before the transport, the token read from the [`TokenProvider`] is written
/// into the configured header (`Authorization: Bearer <token>` by default).
/// When a response status is in the refresh set (`401` by default), the
/// [`TokenRefresher`] runs:
/// - on success, the pipeline restarts and the new token is attached by the
///   next attempt;
/// - on failure, the call ends with [`Error::CredentialRefresh`], without
///   further attempts.
///
/// # Example
///
/// ```ignore
/// use weft::interceptors::{TokenCache, TokenRefresh};
///
/// let cache = TokenCache::with_token("expired");
/// let refresher = {
///     let cache = cache.clone();
///     move || {
///         let cache = cache.clone();
///         async move { cache.refresh_with(login).await }
///     }
/// };
///
/// let chain = Chain::builder(transport)
///     .with(TokenRefresh::new(cache, refresher))
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct TokenRefresh<P, R> {
    provider: P,
    refresher: R,
    header: Option<String>,
    format: TokenFormat,
    statuses: HashSet<u16>,
}

impl<P, R> TokenRefresh<P, R>
where
    P: TokenProvider,
    R: TokenRefresher,
{
    /// Bearer token in `Authorization`, refreshed on `401`.
    pub fn new(provider: P, refresher: R) -> Self {
        Self {
            provider,
            refresher,
            header: Some(AUTHORIZATION.to_string()),
            format: TokenFormat::default(),
            statuses: HashSet::from([401]),
        }
    }

    /// Write the token into another header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>) -> Self {
        self.header = Some(name.into());
        self
    }

    /// Do not attach the token; only refresh it.
    ///
    /// Useful when an [`Authorization`](super::Authorization) interceptor
    /// places the token itself.
    #[must_use]
    pub fn without_header(mut self) -> Self {
        self.header = None;
        self
    }

    /// Set how the token is written into the header.
    #[must_use]
    pub fn format(mut self, format: TokenFormat) -> Self {
        self.format = format;
        self
    }

    /// Replace the statuses that trigger a refresh.
    #[must_use]
    pub fn refresh_on(mut self, statuses: impl IntoIterator<Item = u16>) -> Self {
        self.statuses = statuses.into_iter().collect();
        self
    }
}

impl<P, R> Interceptor for TokenRefresh<P, R>
where
    P: TokenProvider,
    R: TokenRefresher,
{
    fn name(&self) -> &'static str {
        "token_refresh"
    }

    fn prepare<'a>(
        &'a self,
        _ctx: &'a AttemptContext,
        mut request: Request,
    ) -> BoxFuture<'a, Flow<Request>> {
        if let (Some(header), Some(token)) = (&self.header, self.provider.token()) {
            request.set_header(header.as_str(), self.format.apply(&token));
        }
        ready(Flow::Continue(request)).boxed()
    }

    fn observe<'a>(
        &'a self,
        ctx: &'a AttemptContext,
        _request: &'a Request,
        response: Response,
    ) -> BoxFuture<'a, Flow<Response>> {
        async move {
            let status = response.status();
            if !self.statuses.contains(&status) {
                return Flow::Continue(response);
            }

            info!(status, attempt = ctx.attempt(), "credential rejected, refreshing");
            match self.refresher.refresh().await {
                Ok(()) => Flow::retry_because(Error::http_with_body(
                    status,
                    "credential rejected",
                    response.into_body(),
                )),
                Err(error) => {
                    warn!(%error, "credential refresh failed");
                    Flow::Fail(Error::credential_refresh(error))
                }
            }
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use assert2::{check, let_assert};
    use weft_core::{BoxError, Method};

    use super::*;
    use crate::interceptors::TokenCache;

    fn request() -> Request {
        Request::builder(Method::Get, "https://api.example.com/".parse().expect("url")).build()
    }

    fn counting_refresher(
        cache: TokenCache,
        calls: Arc<AtomicU32>,
    ) -> impl Fn() -> BoxFuture<'static, Result<(), BoxError>> + Send + Sync {
        move || {
            let cache = cache.clone();
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                cache.set("fresh");
                Ok(())
            }
            .boxed()
        }
    }

    #[tokio::test]
    async fn attaches_bearer_token() {
        let cache = TokenCache::with_token("abc");
        let interceptor = TokenRefresh::new(cache.clone(), counting_refresher(cache, Arc::default()));
        let ctx = AttemptContext::new(1, 3);

        let_assert!(Flow::Continue(prepared) = interceptor.prepare(&ctx, request()).await);
        check!(prepared.header("authorization") == Some("Bearer abc"));
    }

    #[tokio::test]
    async fn custom_header_and_format() {
        let cache = TokenCache::with_token("abc");
        let interceptor = TokenRefresh::new(cache.clone(), counting_refresher(cache, Arc::default()))
            .header("X-Api-Key")
            .format(TokenFormat::Raw);
        let ctx = AttemptContext::new(1, 3);

        let_assert!(Flow::Continue(prepared) = interceptor.prepare(&ctx, request()).await);
        check!(prepared.header("X-Api-Key") == Some("abc"));
        check!(prepared.header("Authorization").is_none());
    }

    #[tokio::test]
    async fn missing_token_leaves_request_untouched() {
        let cache = TokenCache::new();
        let interceptor = TokenRefresh::new(cache.clone(), counting_refresher(cache, Arc::default()));
        let ctx = AttemptContext::new(1, 3);

        let_assert!(Flow::Continue(prepared) = interceptor.prepare(&ctx, request()).await);
        check!(prepared == request());
    }

    #[tokio::test]
    async fn without_header_only_refreshes() {
        let cache = TokenCache::with_token("abc");
        let interceptor =
            TokenRefresh::new(cache.clone(), counting_refresher(cache, Arc::default()))
                .without_header();
        let ctx = AttemptContext::new(1, 3);

        let_assert!(Flow::Continue(prepared) = interceptor.prepare(&ctx, request()).await);
        check!(prepared.header("Authorization").is_none());
    }

    #[tokio::test]
    async fn unauthorized_refreshes_then_retries() {
        let cache = TokenCache::with_token("expired");
        let calls = Arc::new(AtomicU32::new(0));
        let interceptor =
            TokenRefresh::new(cache.clone(), counting_refresher(cache.clone(), Arc::clone(&calls)));
        let ctx = AttemptContext::new(1, 3);

        let flow = interceptor
            .observe(&ctx, &request(), Response::with_status(401, "expired"))
            .await;

        let_assert!(Flow::Retry(signal) = flow);
        check!(signal.cause().and_then(Error::status) == Some(401));
        check!(calls.load(Ordering::SeqCst) == 1);
        check!(cache.get().as_deref() == Some("fresh"));
    }

    #[tokio::test]
    async fn other_statuses_pass_through() {
        let cache = TokenCache::with_token("abc");
        let calls = Arc::new(AtomicU32::new(0));
        let interceptor =
            TokenRefresh::new(cache.clone(), counting_refresher(cache, Arc::clone(&calls)));
        let ctx = AttemptContext::new(1, 3);

        let flow = interceptor
            .observe(&ctx, &request(), Response::with_status(403, ""))
            .await;

        check!(flow.is_continue());
        check!(calls.load(Ordering::SeqCst) == 0);
    }

    #[tokio::test]
    async fn refresh_statuses_are_configurable() {
        let cache = TokenCache::with_token("abc");
        let calls = Arc::new(AtomicU32::new(0));
        let interceptor =
            TokenRefresh::new(cache.clone(), counting_refresher(cache, Arc::clone(&calls)))
                .refresh_on([401, 403]);
        let ctx = AttemptContext::new(1, 3);

        let flow = interceptor
            .observe(&ctx, &request(), Response::with_status(403, ""))
            .await;

        check!(flow.is_retry());
        check!(calls.load(Ordering::SeqCst) == 1);
    }

    #[tokio::test]
    async fn failed_refresh_is_terminal() {
        let refresher = || async { Err::<(), _>(std::io::Error::other("invalid grant")) };
        let interceptor = TokenRefresh::new(|| Some("expired".to_string()), refresher);
        let ctx = AttemptContext::new(1, 3);

        let flow = interceptor
            .observe(&ctx, &request(), Response::with_status(401, ""))
            .await;

        let_assert!(Flow::Fail(error) = flow);
        check!(error.is_credential_refresh());
        let_assert!(Some(cause) = error.refresh_error());
        check!(cause.to_string() == "invalid grant");
    }
}
