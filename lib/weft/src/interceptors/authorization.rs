//! Token placement in headers, query strings and form bodies.

use bytes::{BufMut, BytesMut};
use futures_util::future::{BoxFuture, FutureExt, ready};
use weft_core::{AttemptContext, ContentType, Error, Flow, Interceptor, Request};

use super::credentials::{TokenFormat, TokenProvider};
use super::token_refresh::AUTHORIZATION;

/// Where [`Authorization`] places the token.
///
/// Every configured location is applied; the default is the `Authorization`
/// header with a `Bearer` prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationConfig {
    header: Option<String>,
    format: TokenFormat,
    query_parameter: Option<String>,
    body_parameter: Option<String>,
}

impl Default for AuthorizationConfig {
    fn default() -> Self {
        Self {
            header: Some(AUTHORIZATION.to_string()),
            format: TokenFormat::default(),
            query_parameter: None,
            body_parameter: None,
        }
    }
}

impl AuthorizationConfig {
    /// Bearer token in the `Authorization` header.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration placing the token nowhere; add locations with the
    /// builder methods.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            header: None,
            format: TokenFormat::Bearer,
            query_parameter: None,
            body_parameter: None,
        }
    }

    /// Write the token into `name`.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>) -> Self {
        self.header = Some(name.into());
        self
    }

    /// Do not write the token into any header.
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

    /// Set the token as query parameter `name`, replacing earlier values.
    #[must_use]
    pub fn query_parameter(mut self, name: impl Into<String>) -> Self {
        self.query_parameter = Some(name.into());
        self
    }

    /// Set the token as form parameter `name` of the body, replacing earlier values.
    #[must_use]
    pub fn body_parameter(mut self, name: impl Into<String>) -> Self {
        self.body_parameter = Some(name.into());
        self
    }
}

/// Attaches the current token to every request.
///
/// Requests are left untouched while the provider has no token.
///
/// # Example
///
/// ```ignore
/// use weft::interceptors::{Authorization, AuthorizationConfig};
///
/// let auth = Authorization::with_config(
///     cache.clone(),
///     AuthorizationConfig::empty().query_parameter("access_token"),
/// );
/// ```
#[derive(Debug, Clone)]
pub struct Authorization<P> {
    provider: P,
    config: AuthorizationConfig,
}

impl<P: TokenProvider> Authorization<P> {
    /// Bearer token in the `Authorization` header.
    pub fn new(provider: P) -> Self {
        Self::with_config(provider, AuthorizationConfig::default())
    }

    /// Token placed as described by `config`.
    pub const fn with_config(provider: P, config: AuthorizationConfig) -> Self {
        Self { provider, config }
    }

    /// Placement configuration.
    pub const fn config(&self) -> &AuthorizationConfig {
        &self.config
    }

    fn authorize(&self, mut request: Request) -> Result<Request, Error> {
        let Some(token) = self.provider.token() else {
            return Ok(request);
        };

        if let Some(header) = &self.config.header {
            request.set_header(header.as_str(), self.config.format.apply(&token));
        }

        if let Some(name) = &self.config.query_parameter {
            request.set_query(name, &token);
        }

        if let Some(name) = &self.config.body_parameter {
            set_form_parameter(&mut request, name, &token)?;
        }

        Ok(request)
    }
}

/// Set `name=value` in a form-encoded body, dropping earlier `name` pairs.
fn set_form_parameter(request: &mut Request, name: &str, value: &str) -> Result<(), Error> {
    let current = request.body().cloned().unwrap_or_default();
    let Ok(text) = std::str::from_utf8(&current) else {
        return Err(Error::interceptor(
            "authorization",
            "cannot append a form parameter to a non UTF-8 body",
        ));
    };

    let pair = url::form_urlencoded::Serializer::new(String::new())
        .append_pair(name, value)
        .finish();

    let mut body = BytesMut::with_capacity(current.len() + pair.len() + 1);
    for segment in text
        .split('&')
        .filter(|segment| !segment.is_empty() && !is_named(segment, name))
    {
        body.put_slice(segment.as_bytes());
        body.put_u8(b'&');
    }
    body.put_slice(pair.as_bytes());
    request.set_body(body.freeze());

    if request.header("Content-Type").is_none() {
        request.set_header("Content-Type", ContentType::FormUrlEncoded.as_str());
    }
    Ok(())
}

/// Whether a raw `key=value` segment has the decoded key `name`.
fn is_named(segment: &str, name: &str) -> bool {
    url::form_urlencoded::parse(segment.as_bytes())
        .next()
        .is_some_and(|(key, _)| key == name)
}

impl<P: TokenProvider> Interceptor for Authorization<P> {
    fn name(&self) -> &'static str {
        "authorization"
    }

    fn prepare<'a>(
        &'a self,
        _ctx: &'a AttemptContext,
        request: Request,
    ) -> BoxFuture<'a, Flow<Request>> {
        ready(Flow::from(self.authorize(request))).boxed()
    }
}
