//! Body encodings.

use bytes::Bytes;

use crate::{Error, Result};

/// Media types the crate writes into `Content-Type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display)]
pub enum ContentType {
    /// `application/json`
    #[display("application/json")]
    Json,
    /// `application/x-www-form-urlencoded`
    #[display("application/x-www-form-urlencoded")]
    FormUrlEncoded,
}

impl ContentType {
    /// MIME type, without parameters.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::FormUrlEncoded => "application/x-www-form-urlencoded",
        }
    }

    /// Returns `true` if a `Content-Type` header value has this MIME type,
    /// ignoring parameters such as `charset`.
    #[must_use]
    pub fn matches(&self, header: &str) -> bool {
        header
            .split(';')
            .next()
            .is_some_and(|mime| mime.trim().eq_ignore_ascii_case(self.as_str()))
    }
}

/// Encode a value as a JSON body.
///
/// # Errors
///
/// Returns [`Error::JsonSerialization`] if the value cannot be encoded.
///
/// # Example
///
/// ```
/// use serde::Serialize;
/// use weft_core::to_json;
///
/// #[derive(Serialize)]
/// struct Login<'a> {
///     user: &'a str,
/// }
///
/// let body = to_json(&Login { user: "ada" }).expect("encode");
/// assert_eq!(&body[..], br#"{"user":"ada"}"#);
/// ```
pub fn to_json<T: serde::Serialize>(value: &T) -> Result<Bytes> {
    let bytes = serde_json::to_vec(value)?;
    Ok(Bytes::from(bytes))
}

/// Deserialize JSON bytes, reporting the path of the failing field.
///
/// # Errors
///
/// Returns [`Error::JsonDeserialization`] with the JSON path on failure.
pub fn from_json<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    let deserializer = &mut serde_json::Deserializer::from_slice(bytes);
    serde_path_to_error::deserialize(deserializer).map_err(|err| {
        let path = err.path().to_string();
        Error::json_deserialization(path, err.into_inner().to_string())
    })
}
