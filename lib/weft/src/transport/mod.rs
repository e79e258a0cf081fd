//! Transports the chain can drive.
//!
//! - [`HyperTransport`] - hyper-util client with rustls (feature `transport-hyper`)
//! - [`ServiceTransport`] - any tower [`Service`] used as a transport
//! - [`FnTransport`] - a closure used as a transport, handy for tests and fakes
//! - [`TransportRetryPolicy`] - tower retry policy for raw transport failures
//!
//! Policies for transport-level failures (timeouts, connection resets) are
//! expressed as tower layers around the transport, never inside the chain:
//!
//! ```ignore
//! use tower::{ServiceBuilder, retry::RetryLayer};
//! use weft::transport::{HyperTransport, ServiceTransport, TransportRetryPolicy};
//!
//! let transport = ServiceTransport::new(
//!     ServiceBuilder::new()
//!         .layer(RetryLayer::new(TransportRetryPolicy::new(2)))
//!         .service(HyperTransport::new()),
//! );
//! let chain = Chain::builder(transport).build();
//! ```

#[cfg(feature = "transport-hyper")]
mod hyper_transport;
mod retry;

use std::fmt;

use tower::ServiceExt;
use tower_service::Service;
use weft_core::{Error, Request, Response, Result, Transport};

#[cfg(feature = "transport-hyper")]
pub use hyper_transport::HyperTransport;
pub use retry::TransportRetryPolicy;

/// Adapts a tower [`Service`] into a [`Transport`].
#[derive(Debug, Clone)]
pub struct ServiceTransport<S> {
    inner: S,
}

impl<S> ServiceTransport<S> {
    /// Wrap the service.
    pub const fn new(inner: S) -> Self {
        Self { inner }
    }

    /// Consume into the wrapped service.
    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S> Transport for ServiceTransport<S>
where
    S: Service<Request, Response = Response, Error = Error> + Clone + Send + Sync,
    S::Future: Send,
{
    fn perform(&self, request: Request) -> impl Future<Output = Result<Response>> + Send {
        self.inner.clone().oneshot(request)
    }
}

/// A closure used as a [`Transport`].
#[derive(Clone)]
pub struct FnTransport<F> {
    f: F,
}

impl<F> fmt::Debug for FnTransport<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnTransport").finish_non_exhaustive()
    }
}

/// Build a [`Transport`] from an async closure.
///
/// # Example
///
/// ```
/// use weft::transport::transport_fn;
/// use weft::{Response, Transport};
///
/// let transport = transport_fn(|_request| async { Ok(Response::with_status(200, "pong")) });
/// ```
pub const fn transport_fn<F, Fut>(f: F) -> FnTransport<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Response>> + Send,
{
    FnTransport { f }
}

impl<F, Fut> Transport for FnTransport<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Response>> + Send,
{
    fn perform(&self, request: Request) -> impl Future<Output = Result<Response>> + Send {
        (self.f)(request)
    }
}
