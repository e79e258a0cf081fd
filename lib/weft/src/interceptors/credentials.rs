//! Credential collaborators shared by the authentication interceptors.
//!
//! Interceptors never own credentials. They read the current one through a
//! [`TokenProvider`] and ask a [`TokenRefresher`] to renew it; whatever sits
//! behind those two traits owns its own storage and locking.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use futures_util::future::{BoxFuture, FutureExt};
use tokio::sync::Mutex;
use weft_core::BoxError;

/// Reads the current credential.
pub trait TokenProvider: Send + Sync {
    /// The current token, or `None` when no credential is available.
    fn token(&self) -> Option<String>;
}

impl<F> TokenProvider for F
where
    F: Fn() -> Option<String> + Send + Sync,
{
    fn token(&self) -> Option<String> {
        self()
    }
}

/// Renews the credential read by a [`TokenProvider`].
pub trait TokenRefresher: Send + Sync {
    /// Refresh the credential.
    fn refresh(&self) -> BoxFuture<'_, Result<(), BoxError>>;
}

impl<F, Fut, E> TokenRefresher for F
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), E>> + Send + 'static,
    E: Into<BoxError>,
{
    fn refresh(&self) -> BoxFuture<'_, Result<(), BoxError>> {
        self().map(|result| result.map_err(Into::into)).boxed()
    }
}

/// How a token is written into a header value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TokenFormat {
    /// `Bearer <token>`.
    #[default]
    Bearer,
    /// The token as is.
    Raw,
    /// `<scheme> <token>`, e.g. `Token abc`.
    Scheme(String),
}

impl TokenFormat {
    /// Format the token.
    #[must_use]
    pub fn apply(&self, token: &str) -> String {
        match self {
            Self::Bearer => format!("Bearer {token}"),
            Self::Raw => token.to_string(),
            Self::Scheme(scheme) => format!("{scheme} {token}"),
        }
    }
}

/// Shared in-memory token with coalesced refreshes.
///
/// Clones share the same token. When several calls ask for a refresh at the
/// same time, only the first runs the fetch; the others wait for it and
/// reuse its result.
///
/// # Example
///
/// ```ignore
/// let cache = TokenCache::with_token("old");
/// let refresher = {
///     let cache = cache.clone();
///     move || {
///         let cache = cache.clone();
///         async move { cache.refresh_with(|| fetch_new_token()).await }
///     }
/// };
/// let interceptor = TokenRefresh::new(cache.clone(), refresher);
/// ```
#[derive(Debug, Clone, Default)]
pub struct TokenCache {
    inner: Arc<CacheInner>,
}

#[derive(Debug, Default)]
struct CacheInner {
    token: RwLock<Option<String>>,
    generation: AtomicU64,
    refresh: Mutex<()>,
}

impl TokenCache {
    /// Empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache holding an initial token.
    #[must_use]
    pub fn with_token(token: impl Into<String>) -> Self {
        let cache = Self::new();
        cache.set(token);
        cache
    }

    /// Current token.
    #[must_use]
    pub fn get(&self) -> Option<String> {
        self.inner
            .token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the token.
    pub fn set(&self, token: impl Into<String>) {
        *self
            .inner
            .token
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(token.into());
        self.inner.generation.fetch_add(1, Ordering::AcqRel);
    }

    /// Forget the token.
    pub fn clear(&self) {
        *self
            .inner
            .token
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
        self.inner.generation.fetch_add(1, Ordering::AcqRel);
    }

    /// Number of times the token changed.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.inner.generation.load(Ordering::Acquire)
    }

    /// Fetch a new token unless another caller already replaced it while
    /// this one was waiting.
    ///
    /// # Errors
    ///
    /// Returns the fetch error; the cached token is left untouched.
    pub async fn refresh_with<F, Fut, E>(&self, fetch: F) -> Result<(), E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, E>>,
    {
        let seen = self.generation();
        let _guard = self.inner.refresh.lock().await;
        if self.generation() != seen {
            return Ok(());
        }

        let token = fetch().await?;
        self.set(token);
        Ok(())
    }
}

impl TokenProvider for TokenCache {
    fn token(&self) -> Option<String> {
        self.get()
    }
}
