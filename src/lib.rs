#![deny(unsafe_code)]
#![warn(missing_docs, missing_debug_implementations)]
//! The wire-format layer of an HTTP stack.
//!
//! This crate parses and formats the headers that describe message bodies and
//! picks the codec that turns a body into a value and back.
//!
//! # Features
//!
//! - **Media types** - [`MediaType`] parsing, compatibility and inclusion
//!   checks, quality and specificity ordering
//! - **Content-Disposition** - [`ContentDisposition`] with RFC 2047 encoded
//!   words and RFC 5987 extended `filename*` parameters
//! - **Entity tags** - a permissive [`ETag`] list scanner and strong/weak
//!   comparison
//! - **Byte ranges** - [`HttpRange`] parsing with suffix ranges, clamping and
//!   merging, plus [`ContentRange`]
//! - **Message converters** - the [`MessageConverter`] contract and a
//!   priority-ordered [`ConverterRegistry`] with fallback and content
//!   negotiation
//!
//! # Optional Features
//!
//! - `json` - JSON converter via serde_json (enabled by default)
//! - `form` - form converter via serde_urlencoded (enabled by default)
//! - `mime` - conversions between [`MediaType`] and `mime::Mime` (enabled by default)
//!
//! # Examples
//!
//! ## Headers
//!
//! ```rust
//! use http_wire::{header, ContentDisposition, HeaderMap, HeaderMapExt, HttpRange};
//!
//! let mut headers = HeaderMap::new();
//! headers.insert(header::RANGE, "bytes=-500".parse().unwrap());
//! let ranges = headers.ranges(10_000).unwrap();
//! assert_eq!(ranges, [HttpRange::new(9_500, 9_999).unwrap()]);
//!
//! let disposition = ContentDisposition::parse(
//!     "attachment; filename*=UTF-8''%E2%82%AC%20rates.pdf",
//! ).unwrap();
//! assert_eq!(disposition.filename(), Some("€ rates.pdf"));
//! ```
//!
//! ## Converters
//!
//! ```rust
//! # #[cfg(feature = "json")]
//! # {
//! use http_wire::{converters, Body, ConverterRegistry, MediaType, Request, Response};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize)]
//! struct User {
//!     name: String,
//! }
//!
//! # async fn example() -> http_wire::Result<()> {
//! let registry = ConverterRegistry::builder()
//!     .converter(converters::json::<User>())
//!     .defaults()
//!     .build();
//!
//! let mut request = Request::new(Body::from_text(r#"{"name":"Ada"}"#));
//! request.headers_mut().insert("content-type", "application/json".parse().unwrap());
//! let user: User = registry.read(&mut request).await?;
//!
//! let mut response = Response::new(Body::empty());
//! registry.write(&user, &[MediaType::ALL], &mut response).await?;
//! assert_eq!(response.headers()["content-type"], "application/json");
//! # Ok(())
//! # }
//! # }
//! ```
extern crate alloc;

#[macro_use]
mod macros;

pub mod error;
pub use error::{
    BoxError, Direction, Error, HeaderError, HttpError, MediaTypeError, NoConverterError,
    ReadError, Result, ResultExt, WriteError,
};

pub mod media_type;
pub use media_type::MediaType;

pub mod charset;
pub use charset::Charset;

pub mod content_disposition;
pub use content_disposition::{ContentDisposition, ContentDispositionBuilder, DispositionType};

pub mod etag;
pub use etag::{ETag, ETagList, ETagWarning};

pub mod range;
pub use range::{ContentRange, HttpRange, RangeConfig, RangeSpec};

mod header_map;
pub use header_map::HeaderMapExt;

pub mod body;
pub use body::{Body, BodyFrozen, Error as BodyError};

pub mod converter;
#[doc(inline)]
pub use converter::{
    builtin as converters,
    registry::{ConverterEntry, ConverterRegistry, RegistryBuilder, RegistryState},
    AnyConverter, Converter, ConverterBuilder, MessageConverter, TargetType,
};

/// A type alias for HTTP requests with a [`Body`].
pub type Request = http::Request<Body>;
/// A type alias for HTTP responses with a [`Body`].
pub type Response = http::Response<Body>;

pub use http::{header, HeaderMap, HeaderValue, StatusCode};
