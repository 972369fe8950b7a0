//! Typed access to the headers handled by this crate.
//!
//! [`HeaderMapExt`] adds getters and setters to [`http::HeaderMap`] that go
//! through the codecs of this crate, so callers never handle the raw strings.
//!
//! # Examples
//!
//! ```rust
//! use http_wire::{HeaderMap, HeaderMapExt, MediaType};
//!
//! let mut headers = HeaderMap::new();
//! headers.set_content_type(&MediaType::APPLICATION_JSON).unwrap();
//! assert_eq!(headers.content_type().unwrap(), Some(MediaType::APPLICATION_JSON));
//! ```

use alloc::{borrow::Cow, vec::Vec};

use http::{
    header::{self, HeaderName},
    HeaderMap, HeaderValue,
};

use crate::{
    charset::Charset,
    content_disposition::ContentDisposition,
    error::HeaderError,
    etag::{ETag, ETagList},
    media_type::MediaType,
    range::{ContentRange, HttpRange, RangeConfig},
};

/// An extension trait adding typed header methods to `http::HeaderMap`.
pub trait HeaderMapExt: self::sealed::Sealed {
    /// Parses `Content-Type`; `Ok(None)` when the header is absent.
    fn content_type(&self) -> Result<Option<MediaType>, HeaderError>;

    /// Sets `Content-Type`, replacing any previous value.
    fn set_content_type(&mut self, media_type: &MediaType) -> Result<(), HeaderError>;

    /// Parses every `Accept` header into one list, in header order.
    ///
    /// An absent or empty header yields an empty list, which callers should
    /// treat as `*/*`.
    fn accept(&self) -> Result<Vec<MediaType>, HeaderError>;

    /// Parses `Content-Disposition`; `Ok(None)` when the header is absent.
    fn content_disposition(&self) -> Result<Option<ContentDisposition>, HeaderError>;

    /// Sets `Content-Disposition`, replacing any previous value.
    fn set_content_disposition(
        &mut self,
        disposition: &ContentDisposition,
    ) -> Result<(), HeaderError>;

    /// Scans every value of an entity-tag list header such as `If-Match` or
    /// `If-None-Match`. Never fails; problems are reported as warnings.
    ///
    /// Values are read as UTF-8. Bytes that are not valid UTF-8 become
    /// `U+FFFD`, so obs-text tags are kept rather than dropped.
    fn etags(&self, name: HeaderName) -> ETagList;

    /// Sets the `ETag` response header.
    fn set_etag(&mut self, etag: &ETag) -> Result<(), HeaderError>;

    /// Parses `Range` against a representation of `length` bytes.
    ///
    /// An absent header yields an empty list.
    fn ranges(&self, length: u64) -> Result<Vec<HttpRange>, HeaderError> {
        self.ranges_with(length, &RangeConfig::default())
    }

    /// Like [`HeaderMapExt::ranges`], with explicit limits.
    fn ranges_with(&self, length: u64, config: &RangeConfig)
        -> Result<Vec<HttpRange>, HeaderError>;

    /// Sets `Content-Range`.
    fn set_content_range(&mut self, content_range: &ContentRange) -> Result<(), HeaderError>;
}

fn value_str<'a>(value: &'a HeaderValue, header: &'static str) -> Result<&'a str, HeaderError> {
    value.to_str().map_err(|_| {
        tracing::trace!(header, ?value, "header value is not visible ASCII");
        HeaderError::malformed(header, "not visible ASCII")
    })
}

fn to_value(
    header: &'static str,
    value: impl TryInto<HeaderValue>,
) -> Result<HeaderValue, HeaderError> {
    value
        .try_into()
        .map_err(|_| HeaderError::malformed(header, "contains characters not allowed in a header value"))
}

impl HeaderMapExt for HeaderMap {
    fn content_type(&self) -> Result<Option<MediaType>, HeaderError> {
        self.get(header::CONTENT_TYPE)
            .map(MediaType::try_from)
            .transpose()
    }

    fn set_content_type(&mut self, media_type: &MediaType) -> Result<(), HeaderError> {
        self.insert(header::CONTENT_TYPE, to_value("Content-Type", media_type)?);
        Ok(())
    }

    fn accept(&self) -> Result<Vec<MediaType>, HeaderError> {
        let mut accepted = Vec::new();
        for value in self.get_all(header::ACCEPT) {
            accepted.extend(MediaType::parse_list(value_str(value, "Accept")?)?);
        }
        Ok(accepted)
    }

    fn content_disposition(&self) -> Result<Option<ContentDisposition>, HeaderError> {
        self.get(header::CONTENT_DISPOSITION)
            .map(ContentDisposition::try_from)
            .transpose()
    }

    fn set_content_disposition(
        &mut self,
        disposition: &ContentDisposition,
    ) -> Result<(), HeaderError> {
        self.insert(
            header::CONTENT_DISPOSITION,
            to_value("Content-Disposition", disposition)?,
        );
        Ok(())
    }

    fn etags(&self, name: HeaderName) -> ETagList {
        let mut list = ETagList::default();
        for value in self.get_all(&name) {
            let decoded = Charset::Utf8.decode_cow(value.as_bytes());
            if let Cow::Owned(_) = decoded {
                tracing::trace!(header = %name, ?value, "entity tag list is not valid UTF-8");
            }
            let parsed = ETag::parse(&decoded);
            list.tags.extend(parsed.tags);
            list.warnings.extend(parsed.warnings);
        }
        list
    }

    fn set_etag(&mut self, etag: &ETag) -> Result<(), HeaderError> {
        self.insert(header::ETAG, to_value("ETag", etag)?);
        Ok(())
    }

    fn ranges_with(
        &self,
        length: u64,
        config: &RangeConfig,
    ) -> Result<Vec<HttpRange>, HeaderError> {
        match self.get(header::RANGE) {
            Some(value) => HttpRange::parse_with(value_str(value, "Range")?, length, config),
            None => Ok(Vec::new()),
        }
    }

    fn set_content_range(&mut self, content_range: &ContentRange) -> Result<(), HeaderError> {
        self.insert(
            header::CONTENT_RANGE,
            to_value("Content-Range", alloc::string::ToString::to_string(content_range))?,
        );
        Ok(())
    }
}

mod sealed {
    pub trait Sealed {}
    impl Sealed for ::http::HeaderMap {}
}
