//! Error types and utilities.
//!
//! This module provides the error handling infrastructure of the crate. The main types are:
//!
//! - [`Error`] - A boxed error carrying an HTTP status code
//! - [`HttpError`] - Trait implemented by every error that maps onto a status code
//! - [`Result`] - A specialized Result type alias
//! - [`ResultExt`] - Extension trait that attaches a status code to foreign errors
//!
//! The domain errors raised by the header codecs and the converter layer are
//! plain enums/structs ([`HeaderError`], [`MediaTypeError`], [`ReadError`],
//! [`WriteError`], [`NoConverterError`]). Each of them implements [`HttpError`],
//! so `?` lifts them into [`Error`] with the status a server should answer with:
//!
//! | Error                                 | Status |
//! |---------------------------------------|--------|
//! | [`HeaderError::Malformed`]            | 400    |
//! | [`HeaderError::UnsupportedCharset`]   | 400    |
//! | [`HeaderError::RangeNotSatisfiable`]  | 416    |
//! | [`HeaderError::TooManyRanges`]        | 400    |
//! | [`MediaTypeError`]                    | 400    |
//! | [`ReadError`]                         | 400    |
//! | [`WriteError`]                        | 500    |
//! | [`NoConverterError`] (read / write)   | 415 / 406 |
//!
//! # Examples
//!
//! ```rust
//! use http_wire::{Error, HttpRange, Result, StatusCode};
//!
//! fn first_range(header: &str, length: u64) -> Result<HttpRange> {
//!     let ranges = HttpRange::parse(header, length)?;
//!     Ok(ranges[0])
//! }
//!
//! let err = first_range("bytes=2000-", 1000).unwrap_err();
//! assert_eq!(err.status(), StatusCode::RANGE_NOT_SATISFIABLE);
//! ```
use alloc::{boxed::Box, string::String};
use core::{
    fmt,
    ops::{Deref, DerefMut},
};
use http::StatusCode;
use thiserror::Error as ThisError;

/// Boxed, type-erased error used as the cause of conversion failures.
pub type BoxError = Box<dyn core::error::Error + Send + Sync + 'static>;

/// The main error type of the crate.
///
/// This error type wraps any error with an associated HTTP status code,
/// providing both the underlying error information and the appropriate
/// HTTP response status.
///
/// # Examples
///
/// ```rust
/// use http_wire::Error;
/// use http::StatusCode;
///
/// let err = Error::msg("Something went wrong");
/// let err = Error::msg("Not found").set_status(StatusCode::NOT_FOUND);
/// assert_eq!(err.status(), StatusCode::NOT_FOUND);
/// ```
pub struct Error {
    error: Box<dyn HttpError>,
}

/// Trait for errors that have an associated HTTP status code.
///
/// Only types implementing this trait can be directly converted into [`Error`]
/// via the `From` implementation. When working with generic
/// [`core::error::Error`] values, prefer the [`ResultExt::status`] helper to
/// attach a status code before returning an [`Error`].
pub trait HttpError: core::error::Error + Send + Sync + 'static {
    /// Returns the associated HTTP status code.
    fn status(&self) -> StatusCode;
}

#[derive(Debug)]
struct MsgError<M: fmt::Display + fmt::Debug + Send + Sync + 'static> {
    msg: M,
}

#[derive(Debug)]
struct WithStatus<E: core::error::Error + Send + Sync + 'static> {
    status: StatusCode,
    error: Box<E>,
}

#[derive(Debug)]
struct BoxedCoreError(BoxError);

struct OverrideStatus {
    status: StatusCode,
    inner: Box<dyn HttpError>,
}

impl<S: fmt::Display + fmt::Debug + Send + Sync + 'static> core::error::Error for MsgError<S> {}

impl<S: fmt::Display + fmt::Debug + Send + Sync + 'static> fmt::Display for MsgError<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.msg, f)
    }
}

impl<E> fmt::Display for WithStatus<E>
where
    E: fmt::Display + core::error::Error + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.error, f)
    }
}

impl<E> core::error::Error for WithStatus<E>
where
    E: core::error::Error + Send + Sync + 'static,
{
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        self.error.source()
    }
}

impl<E> HttpError for WithStatus<E>
where
    E: core::error::Error + Send + Sync + 'static,
{
    fn status(&self) -> StatusCode {
        self.status
    }
}

impl fmt::Display for BoxedCoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl core::error::Error for BoxedCoreError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        self.0.source()
    }
}

impl fmt::Debug for OverrideStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.inner, f)
    }
}

impl fmt::Display for OverrideStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.inner, f)
    }
}

impl core::error::Error for OverrideStatus {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        self.inner.source()
    }
}

impl HttpError for OverrideStatus {
    fn status(&self) -> StatusCode {
        self.status
    }
}

/// A specialized Result type whose error is [`Error`].
pub type Result<T> = core::result::Result<T, Error>;

impl Error {
    fn from_http_error<E>(error: E) -> Self
    where
        E: HttpError,
    {
        Self {
            error: Box::new(error),
        }
    }

    fn with_status<E>(error: E, status: StatusCode) -> Self
    where
        E: core::error::Error + Send + Sync + 'static,
    {
        Self::from_http_error(WithStatus {
            status,
            error: Box::new(error),
        })
    }

    /// Creates a new `Error` from any error type with the given HTTP status code.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use http_wire::Error;
    /// use http::StatusCode;
    /// use std::io;
    ///
    /// let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
    /// let http_err = Error::new(io_err, StatusCode::NOT_FOUND);
    /// ```
    pub fn new<E>(error: E, status: StatusCode) -> Self
    where
        E: core::error::Error + Send + Sync + 'static,
    {
        Self::with_status(error, status)
    }

    /// Creates an `Error` from a message with the default status code
    /// `INTERNAL_SERVER_ERROR` (500).
    pub fn msg<M>(msg: M) -> Self
    where
        M: fmt::Display + fmt::Debug + Send + Sync + 'static,
    {
        Self::with_status(MsgError { msg }, StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Returns the HTTP status code associated with this error.
    pub fn status(&self) -> StatusCode {
        self.error.status()
    }

    /// Sets or overrides the HTTP status code associated with this error.
    ///
    /// This consumes the error and returns a new instance so it can be chained
    /// in builder-style APIs.
    pub fn set_status(self, status: StatusCode) -> Self {
        let inner = self.into_inner();
        Self::from_http_error(OverrideStatus { status, inner })
    }

    /// Attempts to downcast the inner error to a concrete type.
    ///
    /// Returns `Ok(Box<E>)` if the downcast succeeds, or `Err(Self)` if it fails.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use http_wire::{Error, HeaderError, HttpRange};
    ///
    /// let err: Error = HttpRange::parse("bytes=5-", 2).unwrap_err().into();
    /// let header_err = err.downcast::<HeaderError>().unwrap();
    /// assert!(matches!(*header_err, HeaderError::RangeNotSatisfiable { length: 2 }));
    /// ```
    pub fn downcast<E>(self) -> core::result::Result<Box<E>, Self>
    where
        E: core::error::Error + Send + Sync + 'static,
    {
        let status = self.status();
        let error = (self.error) as BoxError;
        match error.downcast::<E>() {
            Ok(err) => Ok(err),
            Err(err) => Err(Self::with_status(BoxedCoreError(err), status)),
        }
    }

    /// Attempts to downcast the inner error to a reference of the concrete type.
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: core::error::Error + Send + Sync + 'static,
    {
        let error: &(dyn core::error::Error + Send + Sync + 'static) = &*self.error;
        error.downcast_ref()
    }

    /// Consumes this error and returns the inner [`HttpError`] trait object.
    pub fn into_inner(self) -> Box<dyn HttpError> {
        self.error
    }
}

impl<E> From<E> for Error
where
    E: HttpError,
{
    fn from(error: E) -> Self {
        Self {
            error: Box::new(error),
        }
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.error, f)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.error, f)
    }
}

impl Deref for Error {
    type Target = dyn HttpError;

    fn deref(&self) -> &Self::Target {
        self.error.as_ref()
    }
}

impl DerefMut for Error {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.error.as_mut()
    }
}

impl AsRef<dyn HttpError> for Error {
    fn as_ref(&self) -> &dyn HttpError {
        self.deref()
    }
}

/// Extension trait that adds HTTP status code handling to `Result` and `Option` types.
///
/// # Examples
///
/// ```rust
/// use http_wire::{ResultExt, Result};
/// use http::StatusCode;
///
/// fn parse_length(raw: &str) -> Result<u64> {
///     raw.parse::<u64>().status(StatusCode::BAD_REQUEST)
/// }
///
/// assert_eq!(parse_length("12").unwrap(), 12);
/// assert_eq!(parse_length("x").unwrap_err().status(), StatusCode::BAD_REQUEST);
/// ```
pub trait ResultExt<T>
where
    Self: Sized,
{
    /// Associates an HTTP status code with an error or `None` value.
    fn status(self, status: StatusCode) -> Result<T>;
}

impl<T, E> ResultExt<T> for core::result::Result<T, E>
where
    E: core::error::Error + Send + Sync + 'static,
{
    fn status(self, status: StatusCode) -> Result<T> {
        self.map_err(|error| Error::new(error, status))
    }
}

impl<T> ResultExt<T> for Option<T> {
    fn status(self, status: StatusCode) -> Result<T> {
        self.ok_or_else(|| Error::msg("None Error").set_status(status))
    }
}

/// Failure to parse or validate a header value.
///
/// Codec errors are fatal to the single header being parsed and are never
/// retried; parsing is deterministic.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
#[non_exhaustive]
pub enum HeaderError {
    /// The header value does not follow the grammar of its header.
    #[error("malformed {header} header: {reason}")]
    Malformed {
        /// Name of the header (or header component) being parsed.
        header: &'static str,
        /// Human readable description of the problem.
        reason: String,
    },
    /// An encoded word or extended parameter names a charset other than
    /// UTF-8, ISO-8859-1 or US-ASCII.
    #[error("unsupported charset `{0}`")]
    UnsupportedCharset(String),
    /// A requested range starts at or beyond the end of the representation.
    #[error("range not satisfiable for content length {length}")]
    RangeNotSatisfiable {
        /// Length of the representation the range was resolved against.
        length: u64,
    },
    /// The `Range` header lists more ranges than the configured limit.
    #[error("too many ranges: {count} exceeds the limit of {max}")]
    TooManyRanges {
        /// Number of ranges in the header.
        count: usize,
        /// Configured maximum.
        max: usize,
    },
}

impl HeaderError {
    pub(crate) fn malformed(header: &'static str, reason: impl Into<String>) -> Self {
        Self::Malformed {
            header,
            reason: reason.into(),
        }
    }
}

impl HttpError for HeaderError {
    fn status(&self) -> StatusCode {
        match self {
            Self::RangeNotSatisfiable { .. } => StatusCode::RANGE_NOT_SATISFIABLE,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

/// Failure to parse a media type.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
#[non_exhaustive]
pub enum MediaTypeError {
    /// The input is empty or only whitespace.
    #[error("media type must not be empty")]
    Empty,
    /// The input has no `/` between type and subtype.
    #[error("media type {0:?} does not contain '/'")]
    MissingSlash(String),
    /// The input has more than one `/` in its type/subtype part.
    #[error("media type {0:?} contains more than one '/'")]
    ExtraSlash(String),
    /// The subtype after `/` is empty.
    #[error("media type {0:?} does not contain a subtype")]
    MissingSubtype(String),
    /// A wildcard type was combined with a concrete subtype, e.g. `*/json`.
    #[error("media type {0:?}: wildcard type is legal only in '*/*'")]
    WildcardType(String),
    /// The type, subtype or a parameter name contains a character outside the token set.
    #[error("invalid token {token:?} in media type {value:?}")]
    InvalidToken {
        /// The full media type string.
        value: String,
        /// The offending token.
        token: String,
    },
    /// A parameter does not have the `key=value` form.
    #[error("invalid parameter {parameter:?} in media type {value:?}")]
    InvalidParameter {
        /// The full media type string.
        value: String,
        /// The offending parameter segment.
        parameter: String,
    },
    /// A quoted parameter value is not terminated.
    #[error("unterminated quoted string in media type {0:?}")]
    UnterminatedQuote(String),
}

impl HttpError for MediaTypeError {
    fn status(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }
}

impl From<MediaTypeError> for HeaderError {
    fn from(error: MediaTypeError) -> Self {
        HeaderError::malformed("media type", alloc::string::ToString::to_string(&error))
    }
}

/// A converter failed to turn a message body into a value.
///
/// The original cause is kept as the error [source](core::error::Error::source).
#[derive(Debug, ThisError)]
#[error("{converter} could not read {target}: {source}")]
pub struct ReadError {
    converter: &'static str,
    target: &'static str,
    source: BoxError,
}

impl ReadError {
    pub(crate) fn new(converter: &'static str, target: &'static str, source: BoxError) -> Self {
        Self {
            converter,
            target,
            source,
        }
    }

    /// Name of the converter that failed.
    pub fn converter(&self) -> &'static str {
        self.converter
    }

    /// Name of the type that was being read.
    pub fn target(&self) -> &'static str {
        self.target
    }

    /// Consumes the error and returns the original cause.
    pub fn into_source(self) -> BoxError {
        self.source
    }
}

impl HttpError for ReadError {
    fn status(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }
}

/// A converter failed to turn a value into a message body.
///
/// The original cause is kept as the error [source](core::error::Error::source).
#[derive(Debug, ThisError)]
#[error("{converter} could not write {target}: {source}")]
pub struct WriteError {
    converter: &'static str,
    target: &'static str,
    source: BoxError,
}

impl WriteError {
    pub(crate) fn new(converter: &'static str, target: &'static str, source: BoxError) -> Self {
        Self {
            converter,
            target,
            source,
        }
    }

    /// Name of the converter that failed.
    pub fn converter(&self) -> &'static str {
        self.converter
    }

    /// Name of the type that was being written.
    pub fn target(&self) -> &'static str {
        self.target
    }

    /// Consumes the error and returns the original cause.
    pub fn into_source(self) -> BoxError {
        self.source
    }
}

impl HttpError for WriteError {
    fn status(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

/// Direction of a conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Body to value.
    Read,
    /// Value to body.
    Write,
}

/// No converter (and no fallback) can handle the requested conversion.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
#[error("no converter can {} {target} as {}", verb(.direction), .media_type.as_deref().unwrap_or("any media type"))]
pub struct NoConverterError {
    direction: Direction,
    target: &'static str,
    media_type: Option<String>,
}

fn verb(direction: &Direction) -> &'static str {
    match direction {
        Direction::Read => "read",
        Direction::Write => "write",
    }
}

impl NoConverterError {
    pub(crate) fn new(direction: Direction, target: &'static str, media_type: Option<String>) -> Self {
        Self {
            direction,
            target,
            media_type,
        }
    }

    /// Whether the failed lookup was for reading or writing.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Name of the type that could not be converted.
    pub fn target(&self) -> &'static str {
        self.target
    }
}

impl HttpError for NoConverterError {
    fn status(&self) -> StatusCode {
        match self.direction {
            Direction::Read => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Direction::Write => StatusCode::NOT_ACCEPTABLE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;
    use core::error::Error as _;

    #[test]
    fn header_errors_map_to_statuses() {
        let malformed = HeaderError::malformed("Range", "missing 'bytes=' prefix");
        assert_eq!(malformed.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            malformed.to_string(),
            "malformed Range header: missing 'bytes=' prefix"
        );

        let unsatisfiable = HeaderError::RangeNotSatisfiable { length: 10 };
        assert_eq!(unsatisfiable.status(), StatusCode::RANGE_NOT_SATISFIABLE);

        let err: Error = unsatisfiable.into();
        assert_eq!(err.status(), StatusCode::RANGE_NOT_SATISFIABLE);
        assert!(err.downcast_ref::<HeaderError>().is_some());
    }

    #[test]
    fn read_error_preserves_cause() {
        let cause = std::io::Error::other("socket closed");
        let err = ReadError::new("bytes", "alloc::string::String", Box::new(cause));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.converter(), "bytes");
        assert_eq!(err.source().unwrap().to_string(), "socket closed");
        assert!(err.into_source().downcast::<std::io::Error>().is_ok());
    }

    #[test]
    fn write_error_is_server_error() {
        let err = WriteError::new("json", "u32", "boom".into());
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "json could not write u32: boom");
    }

    #[test]
    fn no_converter_status_depends_on_direction() {
        let read = NoConverterError::new(Direction::Read, "u8", Some("text/csv".into()));
        assert_eq!(read.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(read.to_string(), "no converter can read u8 as text/csv");

        let write = NoConverterError::new(Direction::Write, "u8", None);
        assert_eq!(write.status(), StatusCode::NOT_ACCEPTABLE);
        assert_eq!(write.to_string(), "no converter can write u8 as any media type");
    }

    #[test]
    fn status_override_keeps_message() {
        let err = Error::msg("gone").set_status(StatusCode::GONE);
        assert_eq!(err.status(), StatusCode::GONE);
        assert_eq!(err.to_string(), "gone");
    }
}
