extern crate std;

use super::BodyFrozen;
use crate::error::{BoxError, HttpError};
use core::error::Error as coreError;
use core::fmt::Display;
use core::str::Utf8Error;
use http::StatusCode;

/// Error type for body operations.
///
/// Converters surface these as the cause of a [`ReadError`](crate::ReadError)
/// or [`WriteError`](crate::WriteError).
///
/// # Examples
///
/// ```rust
/// use http_wire::{Body, BodyError};
///
/// # async fn example() {
/// let mut body = Body::from_bytes(vec![0xff, 0xfe]);
/// match body.as_str().await {
///     Err(BodyError::Utf8(e)) => println!("not text: {e}"),
///     Err(e) => println!("other error: {e}"),
///     Ok(text) => println!("{text}"),
/// }
/// # }
/// ```
#[derive(Debug)]
#[non_exhaustive]
pub enum Error {
    /// An I/O error occurred while reading from the underlying source.
    Io(std::io::Error),
    /// Invalid UTF-8 data was encountered when converting body to string.
    Utf8(Utf8Error),
    /// The body has been consumed and cannot provide data anymore.
    ///
    /// This is distinct from a normal empty body: the body was previously
    /// taken by a converter or frozen, and is no longer available.
    BodyFrozen,
    /// JSON serialization or deserialization failed.
    #[cfg(feature = "json")]
    JsonError(serde_json::Error),
    /// Form data serialization failed.
    #[cfg(feature = "form")]
    SerializeForm(serde_urlencoded::ser::Error),
    /// Form data deserialization failed.
    #[cfg(feature = "form")]
    DeserializeForm(serde_urlencoded::de::Error),
    /// Errors from wrapped `http_body::Body` or stream sources.
    Other(BoxError),
}

macro_rules! impl_body_error {
    ($(($field:tt,$ty:ty $(,$feature:tt)?)),*) => {
        $(
            $(#[cfg(feature = $feature)])*
            impl From<$ty> for Error {
                fn from(error: $ty) -> Self {
                    Self::$field(error)
                }
            }
        )*

        impl Display for Error {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                match self {
                    $(
                        $(#[cfg(feature = $feature)])*
                        Self::$field(error) => error.fmt(f),
                    )*
                    Self::BodyFrozen => BodyFrozen::new().fmt(f),
                }
            }
        }

        impl coreError for Error {
            fn source(&self) -> Option<&(dyn coreError + 'static)> {
                match self {
                    $(
                        $(#[cfg(feature = $feature)])*
                        Self::$field(error) => error.source(),
                    )*
                    Error::BodyFrozen => None,
                }
            }
        }

    };
}

impl_body_error![
    (Io, std::io::Error),
    (Utf8, Utf8Error),
    (Other, BoxError),
    (JsonError, serde_json::Error, "json"),
    (SerializeForm, serde_urlencoded::ser::Error, "form"),
    (DeserializeForm, serde_urlencoded::de::Error, "form")
];

impl From<BodyFrozen> for Error {
    fn from(_error: BodyFrozen) -> Self {
        Self::BodyFrozen
    }
}

impl From<core::convert::Infallible> for Error {
    fn from(error: core::convert::Infallible) -> Self {
        match error {}
    }
}

impl HttpError for Error {
    fn status(&self) -> StatusCode {
        match self {
            Self::Utf8(_) => StatusCode::BAD_REQUEST,
            #[cfg(feature = "json")]
            Self::JsonError(error) if !error.is_io() => StatusCode::BAD_REQUEST,
            #[cfg(feature = "form")]
            Self::DeserializeForm(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
