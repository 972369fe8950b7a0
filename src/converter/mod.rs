//! Message converters: the codecs that turn message bodies into values and back.
//!
//! A converter declares the media types it supports and which Rust types it
//! handles. The [`ConverterRegistry`](crate::ConverterRegistry) asks each
//! converter, in priority order, whether it [can read](MessageConverter::can_read)
//! or [can write](MessageConverter::can_write) a given type as a given media
//! type, and hands the message to the first one that can.
//!
//! # Core Concepts
//!
//! - [`MessageConverter`]: the contract, implemented with `async fn`
//! - [`AnyConverter`]: a cheap-to-clone, type-erased converter whose
//!   `read`/`write` wrap every failure into [`ReadError`]/[`WriteError`]
//! - [`TargetType`]: identity and name of the Rust type being converted
//! - [`InputMessage`]/[`OutputMessage`]: the headers and body of a request or
//!   response, implemented for `http::Request<Body>` and `http::Response<Body>`
//! - [`Converter`]: a converter composed from a media-type list, a type
//!   predicate and read/write closures
//!
//! # Examples
//!
//! ```rust
//! use std::any::Any;
//! use http_wire::{
//!     converter::{write_body, InputMessage, MessageConverter, OutputMessage, TargetType},
//!     AnyConverter, BoxError, MediaType, Body,
//! };
//!
//! struct Csv {
//!     media_types: Vec<MediaType>,
//! }
//!
//! impl MessageConverter for Csv {
//!     fn supported_media_types(&self) -> &[MediaType] {
//!         &self.media_types
//!     }
//!
//!     fn matches_type(&self, target: &TargetType) -> bool {
//!         target.is::<Vec<Vec<String>>>()
//!     }
//!
//!     async fn read(
//!         &self,
//!         _target: &TargetType,
//!         message: &mut dyn InputMessage,
//!     ) -> Result<Box<dyn Any + Send>, BoxError> {
//!         let bytes = message.body_mut().take()?.into_bytes().await?;
//!         let rows: Vec<Vec<String>> = core::str::from_utf8(&bytes)?
//!             .lines()
//!             .map(|line| line.split(',').map(|cell| cell.to_owned()).collect())
//!             .collect();
//!         Ok(Box::new(rows))
//!     }
//!
//!     async fn write(
//!         &self,
//!         value: &(dyn Any + Send + Sync),
//!         _target: &TargetType,
//!         _content_type: Option<&MediaType>,
//!         message: &mut dyn OutputMessage,
//!     ) -> Result<(), BoxError> {
//!         let rows = value.downcast_ref::<Vec<Vec<String>>>().ok_or("not a table")?;
//!         let lines: Vec<String> = rows.iter().map(|row| row.join(",")).collect();
//!         let text: String = lines.join("\n");
//!         write_body(message, self.media_types[0].clone(), bytes::Bytes::from(text));
//!         Ok(())
//!     }
//! }
//!
//! # async fn example() {
//! let csv = AnyConverter::new(Csv { media_types: vec![MediaType::parse("text/csv").unwrap()] });
//! let mut request = http::Request::new(Body::from_bytes("a,b\nc,d"));
//! let rows: Vec<Vec<String>> = csv.read(&mut request).await.unwrap();
//! assert_eq!(rows[1], ["c", "d"]);
//! # }
//! ```

use core::{
    any::{type_name, Any, TypeId},
    fmt::{self, Debug},
    future::Future,
    hash::{Hash, Hasher},
    pin::Pin,
};

use alloc::{boxed::Box, string::ToString, sync::Arc};
use bytes::Bytes;
use http::{header, HeaderMap, HeaderValue};

use crate::{
    charset::Charset,
    error::{BoxError, HeaderError, ReadError, WriteError},
    Body, MediaType,
};

pub mod builtin;
pub mod registry;

pub use builtin::{Converter, ConverterBuilder};

/// Priority of converters that must be consulted first.
pub const HIGHEST_PRECEDENCE: i32 = i32::MIN;
/// Priority of converters without explicit ordering; consulted last.
pub const LOWEST_PRECEDENCE: i32 = i32::MAX;

/// The Rust type a converter is asked to read or write.
#[derive(Clone, Copy)]
pub struct TargetType {
    id: TypeId,
    name: &'static str,
}

impl TargetType {
    /// Describes `T`.
    pub fn of<T: Any + ?Sized>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    /// Whether this describes `T`.
    pub fn is<T: Any + ?Sized>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }

    /// The [`TypeId`] of the type.
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// The type name, for diagnostics only.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TargetType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TargetType {}

impl Hash for TargetType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl Debug for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TargetType").field(&self.name).finish()
    }
}

/// An inbound message: headers to inspect and a body to consume.
pub trait InputMessage: Send {
    /// The message headers.
    fn headers(&self) -> &HeaderMap;
    /// The message body.
    fn body_mut(&mut self) -> &mut Body;
}

/// An outbound message: headers to fill and a body to replace.
pub trait OutputMessage: Send {
    /// The message headers.
    fn headers_mut(&mut self) -> &mut HeaderMap;
    /// The message body.
    fn body_mut(&mut self) -> &mut Body;
}

macro_rules! impl_messages {
    ($($ty:ty),*) => {
        $(
            impl InputMessage for $ty {
                fn headers(&self) -> &HeaderMap {
                    <$ty>::headers(self)
                }

                fn body_mut(&mut self) -> &mut Body {
                    <$ty>::body_mut(self)
                }
            }

            impl OutputMessage for $ty {
                fn headers_mut(&mut self) -> &mut HeaderMap {
                    <$ty>::headers_mut(self)
                }

                fn body_mut(&mut self) -> &mut Body {
                    <$ty>::body_mut(self)
                }
            }
        )*
    };
}

impl_messages!(http::Request<Body>, http::Response<Body>);

/// The converter contract.
///
/// Implementors declare their media types and a type predicate; the default
/// [`can_read`](MessageConverter::can_read) and
/// [`can_write`](MessageConverter::can_write) combine both.
/// [`read`](MessageConverter::read) and [`write`](MessageConverter::write)
/// may fail with any error; wrap the converter in an [`AnyConverter`] to get
/// those failures translated into [`ReadError`] and [`WriteError`].
pub trait MessageConverter: Send + Sync + 'static {
    /// Name used in errors and logs. Defaults to the type name.
    fn name(&self) -> &'static str {
        type_name::<Self>()
    }

    /// The media types this converter reads and writes, wildcards included.
    fn supported_media_types(&self) -> &[MediaType];

    /// Whether this converter handles values of `target`.
    fn matches_type(&self, target: &TargetType) -> bool;

    /// Priority used when the converter is registered without an explicit
    /// one. Lower values are consulted first.
    fn order(&self) -> i32 {
        LOWEST_PRECEDENCE
    }

    /// Whether this converter can read `target` from a body of `media_type`.
    ///
    /// `None` means the content type is unknown and always matches.
    fn can_read(&self, target: &TargetType, media_type: Option<&MediaType>) -> bool {
        self.matches_type(target) && supports(self.supported_media_types(), media_type)
    }

    /// Whether this converter can write `target` as `media_type`.
    ///
    /// `None` means the client accepts anything.
    fn can_write(&self, target: &TargetType, media_type: Option<&MediaType>) -> bool {
        self.matches_type(target) && supports(self.supported_media_types(), media_type)
    }

    /// The content type used when writing `target` without an explicit,
    /// concrete one. Defaults to the first concrete supported media type.
    fn default_content_type(&self, target: &TargetType) -> Option<MediaType> {
        let _ = target;
        self.supported_media_types()
            .iter()
            .find(|media_type| media_type.is_concrete())
            .cloned()
    }

    /// Reads a value of `target` from the message body.
    fn read(
        &self,
        target: &TargetType,
        message: &mut dyn InputMessage,
    ) -> impl Future<Output = Result<Box<dyn Any + Send>, BoxError>> + Send;

    /// Writes `value`, a value of `target`, into the message.
    ///
    /// Implementations set the body and the `Content-Type` header.
    fn write(
        &self,
        value: &(dyn Any + Send + Sync),
        target: &TargetType,
        content_type: Option<&MediaType>,
        message: &mut dyn OutputMessage,
    ) -> impl Future<Output = Result<(), BoxError>> + Send;
}

fn supports(supported: &[MediaType], media_type: Option<&MediaType>) -> bool {
    match media_type {
        None => true,
        Some(media_type) => supported
            .iter()
            .any(|candidate| candidate.is_compatible_with(media_type)),
    }
}

/// Resolves the charset named by a content type, UTF-8 when absent.
///
/// # Errors
///
/// [`HeaderError::UnsupportedCharset`] for charsets other than UTF-8,
/// ISO-8859-1 and US-ASCII.
pub fn resolve_charset(content_type: Option<&MediaType>) -> Result<Charset, HeaderError> {
    match content_type.and_then(MediaType::charset) {
        Some(name) => name.parse(),
        None => Ok(Charset::Utf8),
    }
}

/// Picks the content type for a write: `requested` when it is concrete,
/// else the converter default for `target`.
pub fn select_content_type<C>(
    converter: &C,
    target: &TargetType,
    requested: Option<&MediaType>,
) -> Option<MediaType>
where
    C: MessageConverter + ?Sized,
{
    requested
        .filter(|media_type| media_type.is_concrete())
        .map(MediaType::without_quality)
        .or_else(|| converter.default_content_type(target))
}

/// Replaces the body of `message` with `bytes` and sets `Content-Type` and
/// `Content-Length` accordingly.
pub fn write_body(message: &mut dyn OutputMessage, content_type: MediaType, bytes: Bytes) {
    let headers = message.headers_mut();
    match HeaderValue::try_from(&content_type) {
        Ok(value) => {
            headers.insert(header::CONTENT_TYPE, value);
        }
        Err(_) => {
            tracing::debug!(%content_type, "content type is not a valid header value");
        }
    }
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(bytes.len() as u64));
    *message.body_mut() = Body::from_bytes(bytes).with_content_type(content_type);
}

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub(crate) trait ConverterImpl: Send + Sync {
    fn name_inner(&self) -> &'static str;
    fn supported_media_types_inner(&self) -> &[MediaType];
    fn matches_type_inner(&self, target: &TargetType) -> bool;
    fn order_inner(&self) -> i32;
    fn can_read_inner(&self, target: &TargetType, media_type: Option<&MediaType>) -> bool;
    fn can_write_inner(&self, target: &TargetType, media_type: Option<&MediaType>) -> bool;
    fn default_content_type_inner(&self, target: &TargetType) -> Option<MediaType>;
    fn read_inner<'a>(
        &'a self,
        target: &'a TargetType,
        message: &'a mut dyn InputMessage,
    ) -> BoxFuture<'a, Result<Box<dyn Any + Send>, BoxError>>;
    fn write_inner<'a>(
        &'a self,
        value: &'a (dyn Any + Send + Sync),
        target: &'a TargetType,
        content_type: Option<&'a MediaType>,
        message: &'a mut dyn OutputMessage,
    ) -> BoxFuture<'a, Result<(), BoxError>>;
}

impl<C: MessageConverter> ConverterImpl for C {
    fn name_inner(&self) -> &'static str {
        MessageConverter::name(self)
    }

    fn supported_media_types_inner(&self) -> &[MediaType] {
        MessageConverter::supported_media_types(self)
    }

    fn matches_type_inner(&self, target: &TargetType) -> bool {
        MessageConverter::matches_type(self, target)
    }

    fn order_inner(&self) -> i32 {
        MessageConverter::order(self)
    }

    fn can_read_inner(&self, target: &TargetType, media_type: Option<&MediaType>) -> bool {
        MessageConverter::can_read(self, target, media_type)
    }

    fn can_write_inner(&self, target: &TargetType, media_type: Option<&MediaType>) -> bool {
        MessageConverter::can_write(self, target, media_type)
    }

    fn default_content_type_inner(&self, target: &TargetType) -> Option<MediaType> {
        MessageConverter::default_content_type(self, target)
    }

    fn read_inner<'a>(
        &'a self,
        target: &'a TargetType,
        message: &'a mut dyn InputMessage,
    ) -> BoxFuture<'a, Result<Box<dyn Any + Send>, BoxError>> {
        Box::pin(MessageConverter::read(self, target, message))
    }

    fn write_inner<'a>(
        &'a self,
        value: &'a (dyn Any + Send + Sync),
        target: &'a TargetType,
        content_type: Option<&'a MediaType>,
        message: &'a mut dyn OutputMessage,
    ) -> BoxFuture<'a, Result<(), BoxError>> {
        Box::pin(MessageConverter::write(
            self,
            value,
            target,
            content_type,
            message,
        ))
    }
}

/// A type-erased, shareable converter.
///
/// Clones share the same converter; two `AnyConverter`s are the
/// [same](AnyConverter::same_as) when they come from the same
/// [`AnyConverter::new`] call. The registry deduplicates on that identity.
#[derive(Clone)]
pub struct AnyConverter(Arc<dyn ConverterImpl>);

impl Debug for AnyConverter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!("AnyConverter[{}]", self.name()))
    }
}

impl<C: MessageConverter> From<C> for AnyConverter {
    fn from(converter: C) -> Self {
        Self::new(converter)
    }
}

impl AnyConverter {
    /// Erases `converter`.
    pub fn new(converter: impl MessageConverter) -> Self {
        Self(Arc::new(converter))
    }

    /// See [`MessageConverter::name`].
    pub fn name(&self) -> &'static str {
        self.0.name_inner()
    }

    /// See [`MessageConverter::supported_media_types`].
    pub fn supported_media_types(&self) -> &[MediaType] {
        self.0.supported_media_types_inner()
    }

    /// See [`MessageConverter::matches_type`].
    pub fn matches_type(&self, target: &TargetType) -> bool {
        self.0.matches_type_inner(target)
    }

    /// See [`MessageConverter::order`].
    pub fn order(&self) -> i32 {
        self.0.order_inner()
    }

    /// See [`MessageConverter::can_read`].
    pub fn can_read(&self, target: &TargetType, media_type: Option<&MediaType>) -> bool {
        self.0.can_read_inner(target, media_type)
    }

    /// See [`MessageConverter::can_write`].
    pub fn can_write(&self, target: &TargetType, media_type: Option<&MediaType>) -> bool {
        self.0.can_write_inner(target, media_type)
    }

    /// See [`MessageConverter::default_content_type`].
    pub fn default_content_type(&self, target: &TargetType) -> Option<MediaType> {
        self.0.default_content_type_inner(target)
    }

    /// Whether both handles point to the same converter.
    pub fn same_as(&self, other: &AnyConverter) -> bool {
        core::ptr::addr_eq(Arc::as_ptr(&self.0), Arc::as_ptr(&other.0))
    }

    /// Reads a value of `target`, returning it boxed.
    ///
    /// Every failure of the converter is wrapped in a [`ReadError`] that keeps
    /// the original cause.
    pub async fn read_dyn(
        &self,
        target: &TargetType,
        message: &mut dyn InputMessage,
    ) -> Result<Box<dyn Any + Send>, ReadError> {
        self.0
            .read_inner(target, message)
            .await
            .map_err(|source| ReadError::new(self.name(), target.name(), source))
    }

    /// Reads a `T` from the message body.
    pub async fn read<T: Any + Send>(
        &self,
        message: &mut dyn InputMessage,
    ) -> Result<T, ReadError> {
        let target = TargetType::of::<T>();
        let value = self.read_dyn(&target, message).await?;
        match value.downcast::<T>() {
            Ok(value) => Ok(*value),
            Err(_) => Err(ReadError::new(
                self.name(),
                target.name(),
                alloc::format!("converter produced a value that is not a {}", target.name()).into(),
            )),
        }
    }

    /// Writes `value` into the message.
    ///
    /// Every failure of the converter is wrapped in a [`WriteError`] that
    /// keeps the original cause.
    pub async fn write<T: Any + Send + Sync>(
        &self,
        value: &T,
        content_type: Option<&MediaType>,
        message: &mut dyn OutputMessage,
    ) -> Result<(), WriteError> {
        let target = TargetType::of::<T>();
        self.0
            .write_inner(value, &target, content_type, message)
            .await
            .map_err(|source| WriteError::new(self.name(), target.name(), source))
    }
}

pub(crate) fn describe(media_type: Option<&MediaType>) -> Option<alloc::string::String> {
    media_type.map(ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{HeaderMapExt, HttpError};
    use alloc::{string::String, vec, vec::Vec};
    use http::StatusCode;

    struct Upper {
        media_types: Vec<MediaType>,
    }

    impl Upper {
        fn new() -> Self {
            Self {
                media_types: vec![MediaType::TEXT_PLAIN, MediaType::parse("text/*").unwrap()],
            }
        }
    }

    impl MessageConverter for Upper {
        fn supported_media_types(&self) -> &[MediaType] {
            &self.media_types
        }

        fn matches_type(&self, target: &TargetType) -> bool {
            target.is::<String>()
        }

        async fn read(
            &self,
            _target: &TargetType,
            message: &mut dyn InputMessage,
        ) -> Result<Box<dyn Any + Send>, BoxError> {
            let text = message.body_mut().take()?.into_string().await?;
            if text.is_empty() {
                return Err("empty body".into());
            }
            Ok(Box::new(text.to_uppercase()))
        }

        async fn write(
            &self,
            value: &(dyn Any + Send + Sync),
            target: &TargetType,
            content_type: Option<&MediaType>,
            message: &mut dyn OutputMessage,
        ) -> Result<(), BoxError> {
            let text = value.downcast_ref::<String>().ok_or("not a string")?;
            let content_type =
                select_content_type(self, target, content_type).ok_or("no content type")?;
            write_body(message, content_type, Bytes::from(text.to_uppercase()));
            Ok(())
        }
    }

    #[test]
    fn target_type_identity() {
        let target = TargetType::of::<String>();
        assert!(target.is::<String>());
        assert!(!target.is::<&str>());
        assert_eq!(target, TargetType::of::<String>());
        assert_eq!(target.name(), "alloc::string::String");
    }

    #[test]
    fn default_capability_queries() {
        let upper = AnyConverter::new(Upper::new());
        let string = TargetType::of::<String>();
        assert!(upper.can_read(&string, None));
        assert!(upper.can_read(&string, Some(&MediaType::parse("text/html").unwrap())));
        assert!(upper.can_write(&string, Some(&MediaType::ALL)));
        assert!(!upper.can_read(&string, Some(&MediaType::APPLICATION_JSON)));
        assert!(!upper.can_read(&TargetType::of::<u32>(), None));
        assert_eq!(upper.order(), LOWEST_PRECEDENCE);
        assert_eq!(upper.default_content_type(&string), Some(MediaType::TEXT_PLAIN));
        assert!(upper.name().ends_with("Upper"));
    }

    #[test]
    fn identity_is_per_instance() {
        let a = AnyConverter::new(Upper::new());
        let b = AnyConverter::new(Upper::new());
        assert!(a.same_as(&a.clone()));
        assert!(!a.same_as(&b));
    }

    #[tokio::test]
    async fn read_wraps_failures() {
        let upper = AnyConverter::new(Upper::new());

        let mut request = http::Request::new(Body::from_text("shout"));
        let value: String = upper.read(&mut request).await.unwrap();
        assert_eq!(value, "SHOUT");

        let err = upper.read::<String>(&mut request).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(err.into_source().downcast::<crate::body::BodyFrozen>().is_ok());

        let mut empty = http::Request::new(Body::empty());
        let err = upper.read::<String>(&mut empty).await.unwrap_err();
        assert_eq!(err.to_string().rsplit(": ").next(), Some("empty body"));

        let mut other = http::Request::new(Body::from_text("x"));
        let err = upper.read::<u8>(&mut other).await.unwrap_err();
        assert_eq!(err.target(), "u8");
    }

    #[tokio::test]
    async fn write_sets_body_and_headers() {
        let upper = AnyConverter::new(Upper::new());
        let mut response = http::Response::new(Body::empty());
        upper
            .write(&String::from("quiet"), Some(&MediaType::ALL), &mut response)
            .await
            .unwrap();
        assert_eq!(response.headers().content_type().unwrap(), Some(MediaType::TEXT_PLAIN));
        assert_eq!(response.headers()[header::CONTENT_LENGTH], "5");
        let body = core::mem::take(response.body_mut());
        assert_eq!(body.into_bytes().await.unwrap(), "QUIET");

        let err = upper.write(&7u8, None, &mut response).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.target(), "u8");
    }

    #[test]
    fn charset_resolution() {
        assert_eq!(resolve_charset(None), Ok(Charset::Utf8));
        let latin1 = MediaType::TEXT_PLAIN.with_charset("latin1");
        assert_eq!(resolve_charset(Some(&latin1)), Ok(Charset::Iso8859_1));
        let koi = MediaType::TEXT_PLAIN.with_charset("KOI8-R");
        assert_eq!(
            resolve_charset(Some(&koi)),
            Err(HeaderError::UnsupportedCharset("KOI8-R".into()))
        );
    }
}
