//! HTTP request/response body handling.
//!
//! [`Body`] is the stream abstraction message converters read from and write
//! into. It can hold data in different forms:
//!
//! - **Bytes**: simple in-memory bodies
//! - **AsyncReader**: any `AsyncBufRead` source, with an optional length hint
//! - **Stream**: any `http_body::Body` or stream of chunks
//! - **Frozen**: a body that was consumed and can no longer provide data
//!
//! A body may carry the [`MediaType`] of its content. Constructors such as
//! [`Body::from_text`] or [`Body::from_json`] set it, and converters use it as
//! the `Content-Type` when writing a message.
//!
//! # Examples
//!
//! ```rust
//! use http_wire::{Body, MediaType};
//!
//! let empty = Body::empty();
//! assert_eq!(empty.len(), Some(0));
//!
//! let text = Body::from_text("Hello world!");
//! assert_eq!(text.content_type(), Some(&MediaType::TEXT_PLAIN.with_charset("UTF-8")));
//!
//! let data = Body::from_bytes(vec![1, 2, 3, 4]);
//! assert_eq!(data.content_type(), Some(&MediaType::APPLICATION_OCTET_STREAM));
//! ```
//!
//! ## JSON Handling
//!
//! ```rust
//! # #[cfg(feature = "json")]
//! # {
//! use http_wire::Body;
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Serialize, Deserialize)]
//! struct User { name: String }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let user = User { name: "Alice".to_string() };
//! let body = Body::from_json(&user)?;
//!
//! let mut body = Body::from_bytes(r#"{"name":"Bob"}"#);
//! let user: User = body.into_json().await?;
//! # Ok(())
//! # }
//! # }
//! ```
mod convert;
mod error_type;
pub use error_type::Error;
use futures_lite::{ready, Stream, StreamExt};
use http_body::Frame;
use http_body_util::{BodyExt, StreamBody};

use bytestr::ByteStr;

use bytes::Bytes;
use futures_lite::{AsyncBufRead, AsyncBufReadExt};

use alloc::{boxed::Box, vec::Vec};
use core::fmt::Debug;
use core::mem::{replace, swap, take};
use core::pin::Pin;
use core::task::{Context, Poll};

use crate::MediaType;

// A boxed bufreader object.
type BoxBufReader = Pin<Box<dyn AsyncBufRead + Send + Sync + 'static>>;

type BoxHttpBody =
    Pin<Box<dyn http_body::Body<Data = Bytes, Error = Error> + Send + Sync + 'static>>;

pub use http_body::Body as HttpBody;

/// Flexible HTTP body that can represent data in various forms.
///
/// The body manages the underlying representation and provides zero-copy
/// conversions where possible.
///
/// # Examples
///
/// ```rust
/// use http_wire::Body;
///
/// let body = Body::from_bytes("Hello, world!");
/// assert_eq!(body.is_empty(), Some(false));
/// ```
pub struct Body {
    content_type: Option<MediaType>,
    inner: BodyInner,
}

impl Debug for Body {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Body")
            .field("content_type", &self.content_type)
            .field("len", &self.len())
            .field("frozen", &self.is_frozen())
            .finish()
    }
}

impl_error!(
    BodyFrozen,
    "Body was frozen, it may have been consumed by `take()`",
    http::StatusCode::INTERNAL_SERVER_ERROR
);

enum BodyInner {
    Once(Bytes),
    Reader {
        reader: BoxBufReader,
        length: Option<usize>,
    },
    HttpBody(BoxHttpBody),
    Freeze,
}

impl Default for BodyInner {
    fn default() -> Self {
        Self::Once(Bytes::new())
    }
}

impl Body {
    /// Creates a new empty body without a content type.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use http_wire::Body;
    ///
    /// let body = Body::empty();
    /// assert_eq!(body.len(), Some(0));
    /// assert!(body.content_type().is_none());
    /// ```
    pub const fn empty() -> Self {
        Self {
            content_type: None,
            inner: BodyInner::Once(Bytes::new()),
        }
    }

    /// Creates a new body from any type implementing `http_body::Body`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use http_wire::Body;
    /// use http_body_util::Full;
    /// use bytes::Bytes;
    ///
    /// let http_body = Full::new(Bytes::from("Hello, world!"));
    /// let body = Body::new(http_body);
    /// assert!(!body.is_frozen());
    /// ```
    pub fn new<B>(body: B) -> Self
    where
        B: Send + Sync + http_body::Body + 'static,
        B::Data: Into<Bytes>,
        B::Error: Into<Error>,
    {
        Self {
            content_type: None,
            inner: BodyInner::HttpBody(Box::pin(
                body.map_frame(|result| result.map_data(|data| data.into()))
                    .map_err(|e| e.into()),
            )),
        }
    }

    /// Creates a new frozen body that cannot provide data.
    ///
    /// ```rust
    /// use http_wire::Body;
    ///
    /// let body = Body::frozen();
    /// assert!(body.is_frozen());
    /// ```
    pub const fn frozen() -> Self {
        Self {
            content_type: None,
            inner: BodyInner::Freeze,
        }
    }

    /// Creates a body from an async buffered reader.
    ///
    /// The optional length hint is reported by [`Body::len`]. You are
    /// responsible for setting the content type of the body.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use http_wire::Body;
    /// use futures_lite::io::{BufReader, Cursor};
    ///
    /// let reader = BufReader::new(Cursor::new(b"streamed".to_vec()));
    /// let body = Body::from_reader(reader, 8);
    /// assert_eq!(body.len(), Some(8));
    /// ```
    pub fn from_reader(
        reader: impl AsyncBufRead + Send + Sync + 'static,
        length: impl Into<Option<usize>>,
    ) -> Self {
        Self {
            content_type: None,
            inner: BodyInner::Reader {
                reader: Box::pin(reader),
                length: length.into(),
            },
        }
    }

    /// Creates a body from an async stream of data chunks.
    ///
    /// You are responsible for setting the content type of the body.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use http_wire::Body;
    /// use futures_lite::stream;
    ///
    /// let data_stream = stream::iter(vec![
    ///     Ok::<_, std::io::Error>("Hello, ".as_bytes()),
    ///     Ok("world!".as_bytes()),
    /// ]);
    ///
    /// let body = Body::from_stream(data_stream);
    /// ```
    pub fn from_stream<T, E, S>(stream: S) -> Self
    where
        T: Into<Bytes> + Send + 'static,
        E: Into<Error>,
        S: Stream<Item = Result<T, E>> + Send + Sync + 'static,
    {
        Self {
            content_type: None,
            inner: BodyInner::HttpBody(Box::pin(StreamBody::new(stream.map(|result| {
                result
                    .map(|data| Frame::data(data.into()))
                    .map_err(|error| error.into())
            })))),
        }
    }

    /// Creates a body from bytes or byte-like data.
    ///
    /// The content type is set to `application/octet-stream`.
    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        Self {
            content_type: Some(MediaType::APPLICATION_OCTET_STREAM),
            inner: BodyInner::Once(data.into()),
        }
    }

    /// Creates a body from UTF-8 text.
    ///
    /// The content type is set to `text/plain;charset=UTF-8`.
    pub fn from_text(str: impl Into<ByteStr>) -> Self {
        Self {
            content_type: Some(MediaType::TEXT_PLAIN.with_charset("UTF-8")),
            inner: BodyInner::Once(str.into().into()),
        }
    }

    /// Creates a body by serializing an object to JSON.
    ///
    /// The content type is set to `application/json`.
    #[cfg(feature = "json")]
    pub fn from_json<T: serde::Serialize>(value: T) -> Result<Self, serde_json::Error> {
        Ok(Self {
            content_type: Some(MediaType::APPLICATION_JSON),
            ..Self::from_bytes(serde_json::to_vec(&value)?)
        })
    }

    /// Creates a body by serializing an object to URL-encoded form data.
    ///
    /// The content type is set to `application/x-www-form-urlencoded`.
    #[cfg(feature = "form")]
    pub fn from_form<T: serde::Serialize>(value: T) -> Result<Self, serde_urlencoded::ser::Error> {
        Ok(Self {
            content_type: Some(MediaType::APPLICATION_FORM_URLENCODED),
            ..Self::from_bytes(serde_urlencoded::to_string(value)?)
        })
    }

    /// Returns the content type of the body, if known.
    pub fn content_type(&self) -> Option<&MediaType> {
        self.content_type.as_ref()
    }

    /// Sets the content type of the body.
    pub fn with_content_type(mut self, content_type: MediaType) -> Self {
        self.content_type = Some(content_type);
        self
    }

    /// Replaces the content type of the body in place.
    pub fn set_content_type(&mut self, content_type: Option<MediaType>) {
        self.content_type = content_type;
    }

    /// Returns the length of the body in bytes, if known.
    ///
    /// In-memory bodies always know their length; reader bodies report the
    /// hint they were created with; streaming bodies report `None`.
    pub const fn len(&self) -> Option<usize> {
        match &self.inner {
            BodyInner::Once(bytes) => Some(bytes.len()),
            BodyInner::Reader { length, .. } => *length,
            _ => None,
        }
    }

    /// Returns whether the body is empty, if its length is known.
    pub const fn is_empty(&self) -> Option<bool> {
        match self.len() {
            Some(len) => Some(len == 0),
            None => None,
        }
    }

    /// Consumes the body and collects all of its data.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use http_wire::Body;
    ///
    /// # async fn example() -> Result<(), http_wire::BodyError> {
    /// let body = Body::from_bytes("Hello, world!");
    /// let bytes = body.into_bytes().await?;
    /// assert_eq!(bytes, "Hello, world!");
    /// # Ok(())
    /// # }
    /// ```
    pub async fn into_bytes(self) -> Result<Bytes, Error> {
        match self.inner {
            BodyInner::Once(bytes) => Ok(bytes),
            BodyInner::Reader { mut reader, length } => {
                let mut vec = Vec::with_capacity(length.unwrap_or_default());
                loop {
                    let data = reader.fill_buf().await?;
                    if data.is_empty() {
                        break;
                    } else {
                        let len = data.len();
                        vec.extend_from_slice(data);
                        reader.as_mut().consume(len);
                    }
                }
                Ok(vec.into())
            }

            BodyInner::HttpBody(body) => {
                let mut body = body.into_data_stream();

                let first = body.try_next().await?.unwrap_or_default();
                let second = body.try_next().await?;
                if let Some(second) = second {
                    let remain_size_hint = body.size_hint();
                    let mut vec = Vec::with_capacity(
                        first.len()
                            + second.len()
                            + remain_size_hint.1.unwrap_or(remain_size_hint.0),
                    );
                    vec.extend_from_slice(&first);
                    vec.extend_from_slice(&second);
                    while let Some(data) = body.try_next().await? {
                        vec.extend_from_slice(&data);
                    }
                    Ok(vec.into())
                } else {
                    Ok(first)
                }
            }
            BodyInner::Freeze => Err(Error::BodyFrozen),
        }
    }

    /// Consumes the body and returns its data as a UTF-8 string.
    pub async fn into_string(self) -> Result<ByteStr, Error> {
        Ok(ByteStr::from_utf8(self.into_bytes().await?)?)
    }

    /// Collects the body into memory and returns a reference to its bytes.
    ///
    /// The body keeps its content type and can be read again afterwards.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use http_wire::Body;
    ///
    /// # async fn example() -> Result<(), http_wire::BodyError> {
    /// let mut body = Body::from_bytes("Hello, world!");
    /// assert_eq!(body.as_bytes().await?, b"Hello, world!");
    /// assert_eq!(body.as_bytes().await?, b"Hello, world!");
    /// # Ok(())
    /// # }
    /// ```
    pub async fn as_bytes(&mut self) -> Result<&[u8], Error> {
        if self.is_frozen() {
            return Err(Error::BodyFrozen);
        }
        let inner = replace(&mut self.inner, BodyInner::Freeze);
        let bytes = Body {
            content_type: None,
            inner,
        }
        .into_bytes()
        .await?;
        self.inner = BodyInner::Once(bytes);
        match &self.inner {
            BodyInner::Once(bytes) => Ok(bytes),
            _ => Err(Error::BodyFrozen),
        }
    }

    /// Collects the body into memory and returns it as a UTF-8 string slice.
    pub async fn as_str(&mut self) -> Result<&str, Error> {
        let data = self.as_bytes().await?;
        Ok(core::str::from_utf8(data)?)
    }

    /// Deserializes the body as JSON.
    #[cfg(feature = "json")]
    pub async fn into_json<'a, T>(&'a mut self) -> Result<T, Error>
    where
        T: serde::Deserialize<'a>,
    {
        Ok(serde_json::from_slice(self.as_bytes().await?)?)
    }

    /// Deserializes the body as URL-encoded form data.
    #[cfg(feature = "form")]
    pub async fn into_form<'a, T>(&'a mut self) -> Result<T, Error>
    where
        T: serde::Deserialize<'a>,
    {
        Ok(serde_urlencoded::from_bytes(self.as_bytes().await?)?)
    }

    /// Replaces the body, returning the previous one.
    pub fn replace(&mut self, body: Body) -> Body {
        replace(self, body)
    }

    /// Swaps two bodies.
    ///
    /// # Errors
    ///
    /// Returns `BodyFrozen` if this body has been frozen/consumed.
    pub fn swap(&mut self, body: &mut Body) -> Result<(), BodyFrozen> {
        if self.is_frozen() {
            Err(BodyFrozen::new())
        } else {
            swap(self, body);
            Ok(())
        }
    }

    /// Takes the body out, leaving a frozen body behind.
    ///
    /// Converters take the body of the message they read, so a second read
    /// of the same message fails with [`Error::BodyFrozen`].
    ///
    /// ```rust
    /// use http_wire::Body;
    ///
    /// let mut body = Body::from_bytes("data");
    /// let taken = body.take().unwrap();
    /// assert!(body.is_frozen());
    /// assert!(!taken.is_frozen());
    /// assert!(body.take().is_err());
    /// ```
    pub fn take(&mut self) -> Result<Self, BodyFrozen> {
        if self.is_frozen() {
            Err(BodyFrozen::new())
        } else {
            Ok(self.replace(Self::frozen()))
        }
    }

    /// Whether the body has been consumed.
    pub const fn is_frozen(&self) -> bool {
        matches!(self.inner, BodyInner::Freeze)
    }

    /// Freezes the body, dropping its data.
    pub fn freeze(&mut self) {
        self.replace(Self::frozen());
    }
}

impl Default for Body {
    fn default() -> Self {
        Self::empty()
    }
}

impl Stream for Body {
    type Item = Result<Bytes, Error>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match &mut self.inner {
            BodyInner::Once(bytes) => {
                if bytes.is_empty() {
                    Poll::Ready(None)
                } else {
                    Poll::Ready(Some(Ok(take(bytes))))
                }
            }
            BodyInner::Reader { reader, length } => {
                let data = ready!(reader.as_mut().poll_fill_buf(cx))?;
                if data.is_empty() {
                    return Poll::Ready(None);
                }
                let data = Bytes::copy_from_slice(data);
                reader.as_mut().consume(data.len());
                if let Some(known_length) = length {
                    *known_length = known_length.saturating_sub(data.len());
                }
                Poll::Ready(Some(Ok(data)))
            }
            BodyInner::HttpBody(stream) => stream
                .as_mut()
                .poll_frame(cx)
                .map_ok(|frame| frame.into_data().unwrap_or_default()),
            BodyInner::Freeze => Poll::Ready(Some(Err(Error::BodyFrozen))),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match &self.inner {
            BodyInner::Once(bytes) => (bytes.len(), Some(bytes.len())),
            BodyInner::Reader { length, .. } => (0, *length),
            BodyInner::HttpBody(body) => {
                let hint = body.size_hint();
                (hint.lower() as usize, hint.upper().map(|u| u as usize))
            }
            BodyInner::Freeze => (0, None),
        }
    }
}

impl http_body::Body for Body {
    type Data = Bytes;

    type Error = Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<http_body::Frame<Self::Data>, Self::Error>>> {
        self.poll_next(cx)
            .map(|opt| opt.map(|result| result.map(http_body::Frame::data)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::{string::String, vec};
    use futures_lite::{io::Cursor, stream};

    #[tokio::test]
    async fn basic_body_operations() {
        let empty = Body::empty();
        assert_eq!(empty.len(), Some(0));
        assert_eq!(empty.is_empty(), Some(true));
        assert!(!empty.is_frozen());

        let text_body = Body::from_text("Hello, World!");
        assert_eq!(text_body.len(), Some(13));
        assert_eq!(text_body.is_empty(), Some(false));

        let result = text_body.into_bytes().await.unwrap();
        assert_eq!(result.as_ref(), b"Hello, World!");
    }

    #[tokio::test]
    async fn body_freezing() {
        let mut body = Body::from_bytes("test data");
        assert!(!body.is_frozen());

        let taken = Body::take(&mut body).unwrap();
        assert!(body.is_frozen());

        let data = taken.into_bytes().await.unwrap();
        assert_eq!(data.as_ref(), b"test data");

        let result = Body::take(&mut body);
        assert!(result.is_err());
        assert!(matches!(
            body.as_bytes().await,
            Err(Error::BodyFrozen)
        ));
    }

    #[tokio::test]
    async fn conversions_set_content_types() {
        let from_string = Body::from(String::from("text"));
        assert_eq!(
            from_string.content_type(),
            Some(&MediaType::TEXT_PLAIN.with_charset("UTF-8"))
        );
        let from_vec = Body::from(vec![1u8, 2, 3]);
        assert_eq!(
            from_vec.content_type(),
            Some(&MediaType::APPLICATION_OCTET_STREAM)
        );
        assert_eq!(from_vec.into_bytes().await.unwrap().as_ref(), &[1, 2, 3]);

        let slice: &[u8] = b"raw";
        assert_eq!(Body::from(slice).into_bytes().await.unwrap().as_ref(), b"raw");
    }

    #[tokio::test]
    async fn reader_and_stream_bodies() {
        let reader = futures_lite::io::BufReader::new(Cursor::new(b"from reader".to_vec()));
        let body = Body::from_reader(reader, 11);
        assert_eq!(body.len(), Some(11));
        assert!(body.content_type().is_none());
        assert_eq!(body.into_bytes().await.unwrap().as_ref(), b"from reader");

        let chunks = stream::iter(vec![
            Ok::<_, Error>(Bytes::from_static(b"stream")),
            Ok(Bytes::from_static(b"ing ")),
            Ok(Bytes::from_static(b"data")),
        ]);
        let body = Body::from_stream(chunks);
        assert_eq!(body.len(), None);
        assert_eq!(body.into_bytes().await.unwrap().as_ref(), b"streaming data");
    }

    #[tokio::test]
    async fn stream_yields_chunks() {
        let mut body = Body::from_bytes("streaming test data");
        let mut chunks = Vec::new();
        while let Some(chunk) = body.next().await {
            chunks.push(chunk.unwrap());
        }
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].as_ref(), b"streaming test data");
    }

    #[tokio::test]
    async fn as_bytes_keeps_content_type() {
        let mut body = Body::from_text("cached");
        assert_eq!(body.as_bytes().await.unwrap(), b"cached");
        assert_eq!(body.as_str().await.unwrap(), "cached");
        assert!(body.content_type().is_some());

        let mut invalid = Body::from_bytes(vec![0xff]);
        assert!(matches!(invalid.as_str().await, Err(Error::Utf8(_))));
    }

    #[cfg(feature = "json")]
    #[tokio::test]
    async fn json_round_trip() {
        use serde::{Deserialize, Serialize};

        #[derive(Serialize, Deserialize, PartialEq, Debug)]
        struct TestData {
            message: String,
            count: u32,
        }

        let data = TestData {
            message: "JSON test".into(),
            count: 42,
        };
        let mut body = Body::from_json(&data).unwrap();
        assert_eq!(body.content_type(), Some(&MediaType::APPLICATION_JSON));
        let parsed: TestData = body.into_json().await.unwrap();
        assert_eq!(parsed, data);
    }

    #[cfg(feature = "form")]
    #[tokio::test]
    async fn form_round_trip() {
        use serde::{Deserialize, Serialize};

        #[derive(Serialize, Deserialize, PartialEq, Debug)]
        struct FormData {
            name: String,
            age: u32,
        }

        let data = FormData {
            name: "Alice".into(),
            age: 30,
        };
        let mut body = Body::from_form(&data).unwrap();
        assert_eq!(
            body.content_type(),
            Some(&MediaType::APPLICATION_FORM_URLENCODED)
        );
        assert_eq!(body.as_str().await.unwrap(), "name=Alice&age=30");
        let parsed: FormData = body.into_form().await.unwrap();
        assert_eq!(parsed, data);
    }

    #[tokio::test]
    async fn body_replace_and_swap() {
        let mut body = Body::from_bytes("original");
        let old = body.replace(Body::from_bytes("replacement"));
        assert_eq!(old.into_bytes().await.unwrap().as_ref(), b"original");

        let mut other = Body::from_bytes("second");
        body.swap(&mut other).unwrap();
        assert_eq!(body.as_bytes().await.unwrap(), b"second");

        body.freeze();
        assert!(body.swap(&mut other).is_err());
    }

    #[test]
    fn frozen_body_error_status() {
        use crate::error::HttpError;

        assert_eq!(
            BodyFrozen::new().status(),
            http::StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            Error::BodyFrozen.to_string(),
            "Body was frozen, it may have been consumed by `take()`"
        );
    }
}
