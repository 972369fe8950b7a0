//! The `Content-Disposition` header as defined by [RFC 6266] and, for
//! `multipart/form-data` parts, [RFC 7578].
//!
//! Filenames outside US-ASCII travel in two forms. The `filename*` extended
//! parameter carries them percent-encoded per [RFC 5987]; older clients send
//! them as [RFC 2047] encoded words inside the plain `filename` parameter.
//! Both are decoded by [`ContentDisposition::parse`], and both are produced
//! when a disposition is formatted with a non-ASCII [`Charset`].
//!
//! # Examples
//!
//! ```rust
//! use http_wire::{Charset, ContentDisposition};
//!
//! let parsed = ContentDisposition::parse("form-data; name=\"file\"; filename=\"a b.txt\"").unwrap();
//! assert!(parsed.is_form_data());
//! assert_eq!(parsed.name(), Some("file"));
//! assert_eq!(parsed.filename(), Some("a b.txt"));
//!
//! let header = ContentDisposition::attachment()
//!     .filename_with_charset("€ rates.pdf", Charset::Utf8)
//!     .build();
//! assert_eq!(
//!     header.to_string(),
//!     "attachment; filename=\"=?UTF-8?Q?=E2=82=AC=20rates.pdf?=\"; filename*=UTF-8''%E2%82%AC%20rates.pdf"
//! );
//! ```
//!
//! [RFC 2047]: https://datatracker.ietf.org/doc/html/rfc2047
//! [RFC 5987]: https://datatracker.ietf.org/doc/html/rfc5987
//! [RFC 6266]: https://datatracker.ietf.org/doc/html/rfc6266
//! [RFC 7578]: https://datatracker.ietf.org/doc/html/rfc7578

use alloc::{
    string::{String, ToString},
    vec::Vec,
};
use core::{fmt, str::FromStr};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use http::HeaderValue;
use percent_encoding::{percent_decode, percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::{charset::Charset, error::HeaderError};

const HEADER: &str = "Content-Disposition";

/// RFC 5987 `attr-char` is alphanumerics plus these marks; everything else is escaped.
const ATTR_CHAR: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'!')
    .remove(b'#')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b'-')
    .remove(b'.')
    .remove(b'^')
    .remove(b'_')
    .remove(b'`')
    .remove(b'|')
    .remove(b'~');

/// The disposition type, the first token of the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DispositionType {
    /// `inline`: display as part of the page.
    Inline,
    /// `attachment`: offer as a download.
    Attachment,
    /// `form-data`: a part of a `multipart/form-data` body.
    FormData,
}

impl DispositionType {
    /// The lower-case token used on the wire.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Inline => "inline",
            Self::Attachment => "attachment",
            Self::FormData => "form-data",
        }
    }
}

impl fmt::Display for DispositionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DispositionType {
    type Err = HeaderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [Self::Inline, Self::Attachment, Self::FormData]
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                HeaderError::malformed(HEADER, alloc::format!("unknown disposition type {s:?}"))
            })
    }
}

/// A parsed or built `Content-Disposition` value.
///
/// Instances are immutable; use [`ContentDisposition::builder`] or one of the
/// shortcuts to create one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentDisposition {
    kind: DispositionType,
    name: Option<String>,
    filename: Option<String>,
    charset: Option<Charset>,
}

/// Builder for [`ContentDisposition`].
#[derive(Debug, Clone)]
pub struct ContentDispositionBuilder {
    inner: ContentDisposition,
}

impl ContentDispositionBuilder {
    /// Sets the `name` parameter.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.inner.name = Some(name.into());
        self
    }

    /// Sets a filename that is emitted as a plain quoted string.
    pub fn filename(mut self, filename: impl Into<String>) -> Self {
        self.inner.filename = Some(filename.into());
        self.inner.charset = None;
        self
    }

    /// Sets a filename together with the charset used to encode it.
    ///
    /// Any charset other than US-ASCII makes the formatted header carry both
    /// an RFC 2047 `filename` and an RFC 5987 `filename*` parameter.
    pub fn filename_with_charset(mut self, filename: impl Into<String>, charset: Charset) -> Self {
        self.inner.filename = Some(filename.into());
        self.inner.charset = Some(charset);
        self
    }

    /// Freezes the builder.
    pub fn build(self) -> ContentDisposition {
        self.inner
    }
}

impl ContentDisposition {
    /// Starts building a disposition of the given type.
    pub fn builder(kind: DispositionType) -> ContentDispositionBuilder {
        ContentDispositionBuilder {
            inner: Self {
                kind,
                name: None,
                filename: None,
                charset: None,
            },
        }
    }

    /// Starts building an `attachment` disposition.
    pub fn attachment() -> ContentDispositionBuilder {
        Self::builder(DispositionType::Attachment)
    }

    /// Starts building an `inline` disposition.
    pub fn inline() -> ContentDispositionBuilder {
        Self::builder(DispositionType::Inline)
    }

    /// Starts building a `form-data` disposition.
    pub fn form_data() -> ContentDispositionBuilder {
        Self::builder(DispositionType::FormData)
    }

    /// The disposition type.
    pub fn disposition_type(&self) -> DispositionType {
        self.kind
    }

    /// Whether this is an `attachment` disposition.
    pub fn is_attachment(&self) -> bool {
        self.kind == DispositionType::Attachment
    }

    /// Whether this is an `inline` disposition.
    pub fn is_inline(&self) -> bool {
        self.kind == DispositionType::Inline
    }

    /// Whether this is a `form-data` disposition.
    pub fn is_form_data(&self) -> bool {
        self.kind == DispositionType::FormData
    }

    /// The `name` parameter.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The decoded filename, from `filename*` when present, else from `filename`.
    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    /// The charset the filename was (or will be) encoded with.
    pub fn charset(&self) -> Option<Charset> {
        self.charset
    }

    /// Parses a `Content-Disposition` header value.
    ///
    /// # Errors
    ///
    /// - [`HeaderError::Malformed`] for an empty or unknown disposition type,
    ///   unbalanced quotes, a parameter without `=`, or a broken
    ///   percent/encoded-word escape.
    /// - [`HeaderError::UnsupportedCharset`] when an encoded filename names a
    ///   charset other than UTF-8 or ISO-8859-1 (US-ASCII is also accepted in
    ///   encoded words).
    ///
    /// # Examples
    ///
    /// ```rust
    /// use http_wire::{Charset, ContentDisposition};
    ///
    /// let parsed = ContentDisposition::parse(
    ///     "attachment; filename=\"fallback.txt\"; filename*=UTF-8''%E2%82%AC.txt",
    /// ).unwrap();
    /// assert_eq!(parsed.filename(), Some("€.txt"));
    /// assert_eq!(parsed.charset(), Some(Charset::Utf8));
    /// ```
    pub fn parse(header: &str) -> Result<Self, HeaderError> {
        let parts = tokenize(header)?;
        let mut parts = parts.into_iter();
        let kind: DispositionType = parts.next().unwrap_or_default().parse()?;

        let mut disposition = Self::builder(kind).build();
        let mut extended = false;
        for part in parts {
            let (attribute, value) = part.split_once('=').ok_or_else(|| {
                HeaderError::malformed(HEADER, alloc::format!("parameter {part:?} has no value"))
            })?;
            let attribute = attribute.trim().to_ascii_lowercase();
            let value = strip_quotes(value.trim());

            match attribute.as_str() {
                "name" => disposition.name = Some(unescape_quoted_pairs(value)),
                "filename*" => {
                    let (filename, charset) = decode_extended_value(value)?;
                    disposition.filename = Some(filename);
                    disposition.charset = Some(charset);
                    extended = true;
                }
                "filename" if !extended => {
                    if value.starts_with("=?") {
                        let (filename, charset) = decode_encoded_words(value)?;
                        disposition.filename = Some(filename);
                        disposition.charset = Some(charset);
                    } else {
                        disposition.filename = Some(unescape_quoted_pairs(value));
                        disposition.charset = None;
                    }
                }
                _ => {}
            }
        }
        Ok(disposition)
    }
}

// The type ends at the first `;`; later `;` split parameters unless quoted.
fn tokenize(header: &str) -> Result<Vec<&str>, HeaderError> {
    let (kind, rest) = match header.split_once(';') {
        Some((kind, rest)) => (kind.trim(), Some(rest)),
        None => (header.trim(), None),
    };
    if kind.is_empty() {
        return Err(HeaderError::malformed(HEADER, "empty disposition type"));
    }

    let mut parts = alloc::vec![kind];
    let Some(rest) = rest else {
        return Ok(parts);
    };

    let mut quoted = false;
    let mut escaped = false;
    let mut start = 0;
    for (index, c) in rest.char_indices() {
        if c == ';' && !quoted {
            push_non_empty(&mut parts, &rest[start..index]);
            start = index + 1;
        } else if !escaped && c == '"' {
            quoted = !quoted;
        }
        escaped = !escaped && c == '\\';
    }
    if quoted {
        return Err(HeaderError::malformed(HEADER, "unterminated quoted string"));
    }
    push_non_empty(&mut parts, &rest[start..]);
    Ok(parts)
}

fn push_non_empty<'a>(parts: &mut Vec<&'a str>, part: &'a str) {
    let part = part.trim();
    if !part.is_empty() {
        parts.push(part);
    }
}

fn strip_quotes(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
        .unwrap_or(value)
}

fn unescape_quoted_pairs(value: &str) -> String {
    if !value.contains('\\') {
        return value.to_string();
    }
    let mut unescaped = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => unescaped.extend(chars.next()),
            c => unescaped.push(c),
        }
    }
    unescaped
}

fn escape_quoted_pairs(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if c == '"' || c == '\\' {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Decodes `charset'language'value`. Without the two quotes the whole value
/// is taken as a percent-encoded US-ASCII string.
fn decode_extended_value(value: &str) -> Result<(String, Charset), HeaderError> {
    let mut pieces = value.splitn(3, '\'');
    let (charset, encoded) = match (pieces.next(), pieces.next(), pieces.next()) {
        (Some(name), Some(_language), Some(encoded)) => {
            let charset = Charset::for_name(name)
                .filter(|charset| !charset.is_ascii())
                .ok_or_else(|| HeaderError::UnsupportedCharset(name.to_string()))?;
            (charset, encoded)
        }
        _ => (Charset::UsAscii, value),
    };
    let bytes = percent_decode_strict(encoded)?;
    Ok((charset.decode(&bytes), charset))
}

fn is_attr_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"!#$&+-.^_`|~".contains(&b)
}

fn percent_decode_strict(encoded: &str) -> Result<Vec<u8>, HeaderError> {
    let bytes = encoded.as_bytes();
    let mut index = 0;
    while index < bytes.len() {
        match bytes[index] {
            b if is_attr_char(b) => index += 1,
            b'%' if bytes.get(index + 1).is_some_and(u8::is_ascii_hexdigit)
                && bytes.get(index + 2).is_some_and(u8::is_ascii_hexdigit) =>
            {
                index += 3
            }
            _ => {
                return Err(HeaderError::malformed(
                    HEADER,
                    "invalid filename* encoding (RFC 5987)",
                ))
            }
        }
    }
    Ok(percent_decode(bytes).collect())
}

/// Decodes a run of `=?charset?B|Q?text?=` words separated by whitespace.
fn decode_encoded_words(value: &str) -> Result<(String, Charset), HeaderError> {
    let invalid = || HeaderError::malformed(HEADER, "invalid encoded word (RFC 2047)");

    let mut decoded = String::new();
    let mut charset = Charset::UsAscii;
    let mut rest = value.trim();
    while !rest.is_empty() {
        let word = rest.strip_prefix("=?").ok_or_else(invalid)?;
        let (name, word) = word.split_once('?').ok_or_else(invalid)?;
        let (encoding, word) = word.split_once('?').ok_or_else(invalid)?;
        let (text, after) = word.split_once("?=").ok_or_else(invalid)?;

        charset = Charset::for_name(name)
            .ok_or_else(|| HeaderError::UnsupportedCharset(name.to_string()))?;
        let bytes = match encoding {
            "B" | "b" => STANDARD.decode(text).map_err(|_| invalid())?,
            "Q" | "q" => decode_q(text).ok_or_else(invalid)?,
            _ => return Err(invalid()),
        };
        decoded.push_str(&charset.decode(&bytes));
        rest = after.trim_start();
    }
    Ok((decoded, charset))
}

fn decode_q(text: &str) -> Option<Vec<u8>> {
    let bytes = text.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut index = 0;
    while index < bytes.len() {
        match bytes[index] {
            b'_' => decoded.push(b' '),
            b'=' => {
                let hex = text
                    .get(index + 1..index + 3)
                    .filter(|hex| hex.bytes().all(|b| b.is_ascii_hexdigit()))?;
                decoded.push(u8::from_str_radix(hex, 16).ok()?);
                index += 2;
            }
            b => decoded.push(b),
        }
        index += 1;
    }
    Some(decoded)
}

fn is_q_printable(b: u8) -> bool {
    (b'!'..=b'~').contains(&b) && !b"\"=?_\\".contains(&b)
}

fn encode_q(filename: &str, charset: Charset) -> String {
    let mut encoded = alloc::format!("=?{}?Q?", charset.name());
    for b in charset.encode(filename) {
        if is_q_printable(b) {
            encoded.push(char::from(b));
        } else {
            encoded.push_str(&alloc::format!("={b:02X}"));
        }
    }
    encoded.push_str("?=");
    encoded
}

impl fmt::Display for ContentDisposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind.as_str())?;
        if let Some(name) = &self.name {
            write!(f, "; name=\"{}\"", escape_quoted_pairs(name))?;
        }
        if let Some(filename) = &self.filename {
            match self.charset {
                None | Some(Charset::UsAscii) => {
                    write!(f, "; filename=\"{}\"", escape_quoted_pairs(filename))?;
                }
                Some(charset) => {
                    let bytes = charset.encode(filename);
                    write!(
                        f,
                        "; filename=\"{}\"; filename*={}''{}",
                        encode_q(filename, charset),
                        charset.name(),
                        percent_encode(&bytes, ATTR_CHAR)
                    )?;
                }
            }
        }
        Ok(())
    }
}

impl FromStr for ContentDisposition {
    type Err = HeaderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<&HeaderValue> for ContentDisposition {
    type Error = HeaderError;

    fn try_from(value: &HeaderValue) -> Result<Self, Self::Error> {
        // Raw UTF-8 filenames are common in the wild even though the header is Latin-1.
        let value = core::str::from_utf8(value.as_bytes())
            .map_err(|_| HeaderError::malformed(HEADER, "not valid UTF-8"))?;
        Self::parse(value)
    }
}

impl TryFrom<&ContentDisposition> for HeaderValue {
    type Error = http::header::InvalidHeaderValue;

    fn try_from(disposition: &ContentDisposition) -> Result<Self, Self::Error> {
        HeaderValue::try_from(disposition.to_string())
    }
}
