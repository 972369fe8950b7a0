//! Built-in converters and the closure-composed [`Converter`].
//!
//! ```rust
//! use http_wire::{converters, ConverterRegistry};
//!
//! let registry = ConverterRegistry::builder()
//!     .converter(converters::text())
//!     .converter(converters::bytes())
//!     .build();
//! assert_eq!(registry.len(), 2);
//! ```

use core::{
    any::Any,
    fmt::{self, Debug},
};

use alloc::{boxed::Box, sync::Arc, vec, vec::Vec};
use bytes::Bytes;

use super::{
    resolve_charset, select_content_type, write_body, InputMessage, MessageConverter,
    OutputMessage, TargetType, LOWEST_PRECEDENCE,
};
use crate::{error::BoxError, HeaderMapExt, MediaType};

type MatchFn = Arc<dyn Fn(&TargetType) -> bool + Send + Sync>;
type ReadFn =
    Box<dyn Fn(Bytes, Option<&MediaType>) -> Result<Box<dyn Any + Send>, BoxError> + Send + Sync>;
type WriteFn =
    Box<dyn Fn(&(dyn Any + Send + Sync), &MediaType) -> Result<Bytes, BoxError> + Send + Sync>;

/// A converter composed from a media-type list, a type predicate and
/// read/write closures over buffered bodies.
///
/// # Examples
///
/// ```rust
/// use bytes::Bytes;
/// use http_wire::{converter::TargetType, Converter, MediaType};
///
/// let csv = MediaType::parse("text/csv").unwrap();
/// let lines = Converter::builder("lines")
///     .media_type(csv.clone())
///     .reads(|bytes: Bytes, _| {
///         let text = std::str::from_utf8(&bytes)?;
///         Ok(text.lines().map(String::from).collect::<Vec<String>>())
///     })
///     .writes(|lines: &Vec<String>, _| Ok(Bytes::from(lines.join("\n"))))
///     .build();
///
/// let target = TargetType::of::<Vec<String>>();
/// # use http_wire::converter::MessageConverter;
/// assert!(lines.can_read(&target, Some(&csv)));
/// assert!(!lines.can_read(&TargetType::of::<String>(), Some(&csv)));
/// ```
pub struct Converter {
    name: &'static str,
    media_types: Vec<MediaType>,
    default_content_type: Option<MediaType>,
    order: i32,
    matches: Option<MatchFn>,
    reader: Option<ReadFn>,
    writer: Option<WriteFn>,
}

impl Debug for Converter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Converter")
            .field("name", &self.name)
            .field("media_types", &self.media_types)
            .field("order", &self.order)
            .field("reads", &self.reader.is_some())
            .field("writes", &self.writer.is_some())
            .finish()
    }
}

impl Converter {
    /// Starts building a converter called `name`.
    pub fn builder(name: &'static str) -> ConverterBuilder {
        ConverterBuilder {
            converter: Converter {
                name,
                media_types: Vec::new(),
                default_content_type: None,
                order: LOWEST_PRECEDENCE,
                matches: None,
                reader: None,
                writer: None,
            },
        }
    }
}

/// Builder for [`Converter`].
#[derive(Debug)]
pub struct ConverterBuilder {
    converter: Converter,
}

impl ConverterBuilder {
    /// Adds a supported media type.
    pub fn media_type(mut self, media_type: MediaType) -> Self {
        self.converter.media_types.push(media_type);
        self
    }

    /// Adds several supported media types.
    pub fn media_types(mut self, media_types: impl IntoIterator<Item = MediaType>) -> Self {
        self.converter.media_types.extend(media_types);
        self
    }

    /// Content type used when writing without a concrete one.
    ///
    /// Defaults to the first concrete supported media type.
    pub fn default_content_type(mut self, media_type: MediaType) -> Self {
        self.converter.default_content_type = Some(media_type);
        self
    }

    /// Registration priority; lower values are consulted first.
    pub fn order(mut self, order: i32) -> Self {
        self.converter.order = order;
        self
    }

    /// Sets the type predicate, replacing the one implied by
    /// [`reads`](Self::reads) or [`writes`](Self::writes).
    pub fn matches(mut self, predicate: impl Fn(&TargetType) -> bool + Send + Sync + 'static) -> Self {
        self.converter.matches = Some(Arc::new(predicate));
        self
    }

    /// Sets an untyped read closure.
    pub fn read_with(
        mut self,
        reader: impl Fn(Bytes, Option<&MediaType>) -> Result<Box<dyn Any + Send>, BoxError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        self.converter.reader = Some(Box::new(reader));
        self
    }

    /// Sets an untyped write closure. It receives the resolved content type.
    pub fn write_with(
        mut self,
        writer: impl Fn(&(dyn Any + Send + Sync), &MediaType) -> Result<Bytes, BoxError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        self.converter.writer = Some(Box::new(writer));
        self
    }

    /// Reads values of `T`. Also makes the converter match `T` unless a
    /// predicate was already set.
    pub fn reads<T, F>(self, reader: F) -> Self
    where
        T: Any + Send,
        F: Fn(Bytes, Option<&MediaType>) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        self.match_type::<T>().read_with(move |bytes, content_type| {
            reader(bytes, content_type).map(|value| Box::new(value) as Box<dyn Any + Send>)
        })
    }

    /// Writes values of `T`. Also makes the converter match `T` unless a
    /// predicate was already set.
    pub fn writes<T, F>(self, writer: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&T, &MediaType) -> Result<Bytes, BoxError> + Send + Sync + 'static,
    {
        self.match_type::<T>().write_with(move |value, content_type| {
            let value = value
                .downcast_ref::<T>()
                .ok_or("value does not have the type this converter writes")?;
            writer(value, content_type)
        })
    }

    fn match_type<T: Any + ?Sized>(mut self) -> Self {
        if self.converter.matches.is_none() {
            self.converter.matches = Some(Arc::new(TargetType::is::<T>));
        }
        self
    }

    /// Finishes the converter.
    pub fn build(self) -> Converter {
        self.converter
    }
}

impl MessageConverter for Converter {
    fn name(&self) -> &'static str {
        self.name
    }

    fn supported_media_types(&self) -> &[MediaType] {
        &self.media_types
    }

    fn matches_type(&self, target: &TargetType) -> bool {
        self.matches.as_ref().is_some_and(|matches| matches(target))
    }

    fn order(&self) -> i32 {
        self.order
    }

    fn can_read(&self, target: &TargetType, media_type: Option<&MediaType>) -> bool {
        self.reader.is_some()
            && self.matches_type(target)
            && super::supports(&self.media_types, media_type)
    }

    fn can_write(&self, target: &TargetType, media_type: Option<&MediaType>) -> bool {
        self.writer.is_some()
            && self.matches_type(target)
            && super::supports(&self.media_types, media_type)
    }

    fn default_content_type(&self, _target: &TargetType) -> Option<MediaType> {
        self.default_content_type.clone().or_else(|| {
            self.media_types
                .iter()
                .find(|media_type| media_type.is_concrete())
                .cloned()
        })
    }

    async fn read(
        &self,
        _target: &TargetType,
        message: &mut dyn InputMessage,
    ) -> Result<Box<dyn Any + Send>, BoxError> {
        let reader = self.reader.as_ref().ok_or("converter does not read")?;
        let content_type = message.headers().content_type()?;
        let bytes = message.body_mut().take()?.into_bytes().await?;
        reader(bytes, content_type.as_ref())
    }

    async fn write(
        &self,
        value: &(dyn Any + Send + Sync),
        target: &TargetType,
        content_type: Option<&MediaType>,
        message: &mut dyn OutputMessage,
    ) -> Result<(), BoxError> {
        let writer = self.writer.as_ref().ok_or("converter does not write")?;
        let content_type = select_content_type(self, target, content_type)
            .ok_or("converter has no concrete media type to write")?;
        let bytes = writer(value, &content_type)?;
        write_body(message, content_type, bytes);
        Ok(())
    }
}

/// Reads and writes [`Bytes`] as-is, for any media type.
pub fn bytes() -> Converter {
    Converter::builder("bytes")
        .media_types([MediaType::APPLICATION_OCTET_STREAM, MediaType::ALL])
        .reads(|bytes: Bytes, _| Ok(bytes))
        .writes(|bytes: &Bytes, _| Ok(bytes.clone()))
        .build()
}

/// Reads and writes [`String`](alloc::string::String) in the charset of the
/// content type, UTF-8 when none is given.
pub fn text() -> TextConverter {
    TextConverter {
        media_types: vec![MediaType::TEXT_PLAIN, MediaType::ALL],
    }
}

/// The converter returned by [`text`].
///
/// Reading decodes lossily; writing replaces characters the charset cannot
/// represent with `?` and always declares the charset in `Content-Type`.
#[derive(Debug, Clone)]
pub struct TextConverter {
    media_types: Vec<MediaType>,
}

impl MessageConverter for TextConverter {
    fn name(&self) -> &'static str {
        "text"
    }

    fn supported_media_types(&self) -> &[MediaType] {
        &self.media_types
    }

    fn matches_type(&self, target: &TargetType) -> bool {
        target.is::<alloc::string::String>()
    }

    fn default_content_type(&self, _target: &TargetType) -> Option<MediaType> {
        Some(MediaType::TEXT_PLAIN.with_charset("UTF-8"))
    }

    async fn read(
        &self,
        _target: &TargetType,
        message: &mut dyn InputMessage,
    ) -> Result<Box<dyn Any + Send>, BoxError> {
        let charset = resolve_charset(message.headers().content_type()?.as_ref())?;
        let bytes = message.body_mut().take()?.into_bytes().await?;
        Ok(Box::new(charset.decode(&bytes)))
    }

    async fn write(
        &self,
        value: &(dyn Any + Send + Sync),
        target: &TargetType,
        content_type: Option<&MediaType>,
        message: &mut dyn OutputMessage,
    ) -> Result<(), BoxError> {
        let text = value
            .downcast_ref::<alloc::string::String>()
            .ok_or("value is not a String")?;
        let mut content_type = select_content_type(self, target, content_type)
            .ok_or("no content type to write")?;
        let charset = resolve_charset(Some(&content_type))?;
        if content_type.charset().is_none() {
            content_type = content_type.with_charset(charset.name());
        }
        write_body(message, content_type, Bytes::from(charset.encode(text)));
        Ok(())
    }
}

/// Reads and writes `T` as JSON (`application/json` and `application/*+json`).
#[cfg(feature = "json")]
pub fn json<T>() -> Converter
where
    T: serde::Serialize + serde::de::DeserializeOwned + Send + Sync + 'static,
{
    Converter::builder("json")
        .media_types([MediaType::APPLICATION_JSON, MediaType::APPLICATION_JSON_ANY])
        .reads(|bytes: Bytes, _| Ok(serde_json::from_slice::<T>(&bytes)?))
        .writes(|value: &T, _| Ok(Bytes::from(serde_json::to_vec(value)?)))
        .build()
}

/// Reads and writes `T` as `application/x-www-form-urlencoded`.
#[cfg(feature = "form")]
pub fn form<T>() -> Converter
where
    T: serde::Serialize + serde::de::DeserializeOwned + Send + Sync + 'static,
{
    Converter::builder("form")
        .media_type(MediaType::APPLICATION_FORM_URLENCODED)
        .reads(|bytes: Bytes, _| Ok(serde_urlencoded::from_bytes::<T>(&bytes)?))
        .writes(|value: &T, _| Ok(Bytes::from(serde_urlencoded::to_string(value)?)))
        .build()
}
