//! Typed API requests.
//!
//! An [`ApiRequest`] describes one endpoint: method, path relative to a base
//! URL, optional query/headers/body, and the JSON type it answers with. An
//! [`ApiExecutor`] turns it into a [`Request`], sends it through any
//! [`Transport`] (usually a [`Chain`](crate::Chain)) and decodes the answer.

use std::borrow::Cow;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;
use weft_core::{
    DefaultErrorDecoder, Error, ErrorDecoder, Method, Request, Response, Result, Transport,
    from_json,
};

use crate::status::StatusPolicy;

/// Description of one API call.
///
/// # Example
///
/// ```ignore
/// use weft::executor::ApiRequest;
///
/// struct GetUser(u64);
///
/// impl ApiRequest for GetUser {
///     type Output = User;
///
///     fn method(&self) -> Method {
///         Method::Get
///     }
///
///     fn path(&self) -> Cow<'_, str> {
///         format!("users/{}", self.0).into()
///     }
/// }
/// ```
pub trait ApiRequest: Send + Sync {
    /// JSON type of a successful response.
    type Output: DeserializeOwned;

    /// HTTP method.
    fn method(&self) -> Method;

    /// Path, resolved against the executor's base URL.
    fn path(&self) -> Cow<'_, str>;

    /// Query parameters.
    fn query(&self) -> Vec<(String, String)> {
        Vec::new()
    }

    /// Extra headers.
    fn headers(&self) -> Vec<(String, String)> {
        Vec::new()
    }

    /// Request body.
    ///
    /// # Errors
    ///
    /// Returns an error if the body cannot be encoded.
    fn body(&self) -> Result<Option<Bytes>> {
        Ok(None)
    }
}

/// Sends [`ApiRequest`]s through a transport and decodes their responses.
///
/// A status outside the valid set (`200..=299` by default) is first offered
/// to the [`ErrorDecoder`]; a decoded error becomes [`Error::Api`], anything
/// else [`Error::Http`] with the response body.
#[derive(Debug, Clone)]
pub struct ApiExecutor<T, D = DefaultErrorDecoder> {
    transport: T,
    base_url: Url,
    valid_statuses: StatusPolicy,
    decoder: D,
}

impl<T: Transport> ApiExecutor<T> {
    /// Create a new executor with the given base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be parsed.
    pub fn new(transport: T, base_url: impl AsRef<str>) -> Result<Self> {
        Ok(Self::with_url(transport, Url::parse(base_url.as_ref())?))
    }

    /// Create a new executor with a pre-parsed URL.
    #[must_use]
    pub fn with_url(transport: T, base_url: Url) -> Self {
        Self {
            transport,
            base_url,
            valid_statuses: StatusPolicy::success(),
            decoder: DefaultErrorDecoder,
        }
    }
}

impl<T: Transport, D: ErrorDecoder> ApiExecutor<T, D> {
    /// Decode invalid responses with `decoder`.
    #[must_use]
    pub fn error_decoder<D2: ErrorDecoder>(self, decoder: D2) -> ApiExecutor<T, D2> {
        ApiExecutor {
            transport: self.transport,
            base_url: self.base_url,
            valid_statuses: self.valid_statuses,
            decoder,
        }
    }

    /// Replace the set of statuses decoded as success.
    #[must_use]
    pub fn valid_statuses(mut self, statuses: StatusPolicy) -> Self {
        self.valid_statuses = statuses;
        self
    }

    /// Base URL.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Underlying transport.
    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Send `request` and decode its response.
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be built, the transport fails,
    /// the status is not valid, or the body does not decode.
    pub async fn send<R: ApiRequest>(&self, request: &R) -> Result<R::Output> {
        let request = self.build_request(request)?;
        let response = self.transport.perform(request).await?;
        self.decode(response)
    }

    /// Build the [`Request`] for `request`.
    ///
    /// # Errors
    ///
    /// Returns an error if the path does not resolve against the base URL or
    /// the body cannot be encoded.
    pub fn build_request<R: ApiRequest>(&self, request: &R) -> Result<Request> {
        let url = self.base_url.join(&request.path())?;
        let mut builder = Request::builder(request.method(), url)
            .query_pairs(request.query())
            .headers(request.headers());
        if let Some(body) = request.body()? {
            builder = builder.body(body);
        }
        Ok(builder.build())
    }

    fn decode<O: DeserializeOwned>(&self, response: Response) -> Result<O> {
        let status = response.status();
        if !self.valid_statuses.contains(status) {
            debug!(status, "response status not accepted");
            let body = response.into_body();
            if let Some(error) = self.decoder.decode(status, &body) {
                return Err(Error::api(status, error));
            }
            return Err(Error::http_with_body(
                status,
                format!("HTTP error: {status}"),
                body,
            ));
        }

        let body = response.into_body();
        if body.is_empty() {
            return from_json(b"null");
        }
        from_json(&body)
    }
}
