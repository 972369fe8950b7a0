//! Media types as defined by [RFC 2046] and [RFC 6838].
//!
//! A [`MediaType`] is an immutable `type/subtype` pair with an ordered list of
//! parameters. It is the currency of content negotiation: the converter
//! registry compares the media types a converter declares against the
//! `Content-Type` of a request or the `Accept` list of a client.
//!
//! Two predicates drive the negotiation:
//!
//! - [`MediaType::is_compatible_with`] is symmetric: `text/*` and `text/plain`
//!   are compatible with each other.
//! - [`MediaType::includes`] is asymmetric: `text/*` includes `text/plain`,
//!   but `text/plain` does not include `text/*`.
//!
//! # Examples
//!
//! ```rust
//! use http_wire::MediaType;
//!
//! let json: MediaType = "application/json; charset=UTF-8".parse().unwrap();
//! assert_eq!(json.type_(), "application");
//! assert_eq!(json.subtype(), "json");
//! assert_eq!(json.charset(), Some("UTF-8"));
//!
//! let any_text = MediaType::parse("text/*").unwrap();
//! assert!(any_text.includes(&MediaType::TEXT_PLAIN));
//! assert!(!MediaType::TEXT_PLAIN.includes(&any_text));
//! assert!(MediaType::TEXT_PLAIN.is_compatible_with(&any_text));
//! ```
//!
//! [RFC 2046]: https://datatracker.ietf.org/doc/html/rfc2046
//! [RFC 6838]: https://datatracker.ietf.org/doc/html/rfc6838

use alloc::{
    borrow::Cow,
    string::{String, ToString},
    vec::Vec,
};
use core::{
    cmp::Ordering,
    fmt,
    hash::{Hash, Hasher},
    str::FromStr,
};

use http::HeaderValue;

use crate::error::{HeaderError, MediaTypeError};

const WILDCARD: &str = "*";
const PARAM_CHARSET: &str = "charset";
const PARAM_QUALITY: &str = "q";

/// An immutable media type such as `text/plain;charset=UTF-8`.
///
/// The type and subtype are always lower-case. Parameter names are lower-case
/// as well, parameter values keep their case. Equality compares type, subtype
/// and the parameter set; parameter order is not significant and the value of
/// the `charset` parameter is compared case-insensitively.
#[derive(Clone)]
pub struct MediaType {
    type_: Cow<'static, str>,
    subtype: Cow<'static, str>,
    parameters: Vec<(String, String)>,
}

impl MediaType {
    /// `*/*`
    pub const ALL: MediaType = MediaType::from_static("*", "*");
    /// `application/json`
    pub const APPLICATION_JSON: MediaType = MediaType::from_static("application", "json");
    /// `application/*+json`
    pub const APPLICATION_JSON_ANY: MediaType = MediaType::from_static("application", "*+json");
    /// `application/octet-stream`
    pub const APPLICATION_OCTET_STREAM: MediaType =
        MediaType::from_static("application", "octet-stream");
    /// `application/x-www-form-urlencoded`
    pub const APPLICATION_FORM_URLENCODED: MediaType =
        MediaType::from_static("application", "x-www-form-urlencoded");
    /// `multipart/form-data`
    pub const MULTIPART_FORM_DATA: MediaType = MediaType::from_static("multipart", "form-data");
    /// `text/plain`
    pub const TEXT_PLAIN: MediaType = MediaType::from_static("text", "plain");
    /// `text/html`
    pub const TEXT_HTML: MediaType = MediaType::from_static("text", "html");

    /// Creates a media type from static, already lower-case components.
    ///
    /// No validation is performed; use [`MediaType::new`] or
    /// [`MediaType::parse`] for untrusted input.
    pub const fn from_static(type_: &'static str, subtype: &'static str) -> Self {
        Self {
            type_: Cow::Borrowed(type_),
            subtype: Cow::Borrowed(subtype),
            parameters: Vec::new(),
        }
    }

    /// Creates a media type from a type and a subtype, validating both.
    ///
    /// # Errors
    ///
    /// Returns an error if either component is empty or contains characters
    /// outside the RFC 7230 token set, or if a wildcard type is combined with
    /// a concrete subtype.
    pub fn new(type_: &str, subtype: &str) -> Result<Self, MediaTypeError> {
        let full = alloc::format!("{type_}/{subtype}");
        let (type_, subtype) = check_type_and_subtype(&full, type_, subtype)?;
        Ok(Self {
            type_: Cow::Owned(type_),
            subtype: Cow::Owned(subtype),
            parameters: Vec::new(),
        })
    }

    /// Parses a media type such as `text/html; charset="utf-8"`.
    ///
    /// The main part must contain exactly one `/`. Each `;`-separated
    /// parameter must have the form `key=value`; surrounding whitespace is
    /// trimmed and quoted values are unquoted. A semicolon inside a quoted
    /// value does not split parameters. Duplicate keys keep the last value.
    /// A lone `*` is accepted as a shorthand for `*/*`.
    ///
    /// # Errors
    ///
    /// Returns a [`MediaTypeError`] describing the first problem found.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use http_wire::MediaType;
    ///
    /// let mt = MediaType::parse("Text/HTML; Level=1; level=2").unwrap();
    /// assert_eq!(mt.to_string(), "text/html;level=2");
    ///
    /// assert!(MediaType::parse("text").is_err());
    /// assert!(MediaType::parse("text/plain/extra").is_err());
    /// ```
    pub fn parse(value: &str) -> Result<Self, MediaTypeError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(MediaTypeError::Empty);
        }

        let segments = split_unquoted(trimmed, ';')
            .ok_or_else(|| MediaTypeError::UnterminatedQuote(value.to_string()))?;
        let mut segments = segments.into_iter();
        let main = segments.next().unwrap_or_default().trim();

        let (type_, subtype) = if main == WILDCARD {
            (WILDCARD, WILDCARD)
        } else {
            let slash = main
                .find('/')
                .ok_or_else(|| MediaTypeError::MissingSlash(value.to_string()))?;
            (main[..slash].trim(), main[slash + 1..].trim())
        };
        if subtype.contains('/') {
            return Err(MediaTypeError::ExtraSlash(value.to_string()));
        }
        if subtype.is_empty() {
            return Err(MediaTypeError::MissingSubtype(value.to_string()));
        }
        let (type_, subtype) = check_type_and_subtype(value, type_, subtype)?;

        let mut parameters: Vec<(String, String)> = Vec::new();
        for segment in segments {
            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }
            let (key, raw) = segment
                .split_once('=')
                .ok_or_else(|| MediaTypeError::InvalidParameter {
                    value: value.to_string(),
                    parameter: segment.to_string(),
                })?;
            let key = key.trim();
            if !is_token(key) {
                return Err(MediaTypeError::InvalidToken {
                    value: value.to_string(),
                    token: key.to_string(),
                });
            }
            let key = key.to_ascii_lowercase();
            let param_value = unquote(raw.trim());
            if key == PARAM_QUALITY && parse_quality(&param_value).is_none() {
                return Err(MediaTypeError::InvalidParameter {
                    value: value.to_string(),
                    parameter: segment.to_string(),
                });
            }
            insert_parameter(&mut parameters, key, param_value);
        }

        Ok(Self {
            type_: Cow::Owned(type_),
            subtype: Cow::Owned(subtype),
            parameters,
        })
    }

    /// Parses a comma-separated list of media types, as found in `Accept`.
    ///
    /// Commas inside quoted parameter values do not split the list and empty
    /// elements are skipped, so an empty header yields an empty list.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use http_wire::MediaType;
    ///
    /// let list = MediaType::parse_list("text/html, application/json;q=0.8, */*;q=0.1").unwrap();
    /// assert_eq!(list.len(), 3);
    /// assert_eq!(list[1].quality(), 0.8);
    /// ```
    pub fn parse_list(value: &str) -> Result<Vec<Self>, MediaTypeError> {
        let elements = split_unquoted(value, ',')
            .ok_or_else(|| MediaTypeError::UnterminatedQuote(value.to_string()))?;
        elements
            .into_iter()
            .map(str::trim)
            .filter(|element| !element.is_empty())
            .map(Self::parse)
            .collect()
    }

    /// Returns the primary type, e.g. `text`.
    pub fn type_(&self) -> &str {
        &self.type_
    }

    /// Returns the subtype, e.g. `plain`.
    pub fn subtype(&self) -> &str {
        &self.subtype
    }

    /// Returns the parameters in insertion order.
    pub fn parameters(&self) -> impl Iterator<Item = (&str, &str)> {
        self.parameters
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    /// Returns the value of a parameter; the name is matched case-insensitively.
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Returns the `charset` parameter, if present.
    pub fn charset(&self) -> Option<&str> {
        self.parameter(PARAM_CHARSET)
    }

    /// Returns the quality value of the `q` parameter, `1.0` when absent.
    pub fn quality(&self) -> f32 {
        self.parameter(PARAM_QUALITY)
            .and_then(parse_quality)
            .unwrap_or(1.0)
    }

    /// Whether the type is the wildcard `*`, which only occurs in `*/*`.
    pub fn is_wildcard_type(&self) -> bool {
        self.type_ == WILDCARD
    }

    /// Whether the subtype is `*` or a structured-syntax wildcard such as `*+json`.
    pub fn is_wildcard_subtype(&self) -> bool {
        self.subtype == WILDCARD || self.subtype.starts_with("*+")
    }

    /// Whether neither the type nor the subtype is a wildcard.
    pub fn is_concrete(&self) -> bool {
        !self.is_wildcard_type() && !self.is_wildcard_subtype()
    }

    /// Returns the structured-syntax suffix of the subtype, e.g. `json` for
    /// `application/problem+json`.
    pub fn subtype_suffix(&self) -> Option<&str> {
        self.subtype
            .rfind('+')
            .map(|index| &self.subtype[index + 1..])
            .filter(|suffix| !suffix.is_empty())
    }

    /// Compares type and subtype only, ignoring parameters.
    pub fn equals_type_and_subtype(&self, other: &MediaType) -> bool {
        self.type_ == other.type_ && self.subtype == other.subtype
    }

    /// Whether this media type is compatible with `other`.
    ///
    /// Two media types are compatible when they are equal, when either of
    /// them is `*/*`, when their types match and either subtype is a
    /// wildcard, or when type and subtype both match. Parameters are ignored.
    /// The relation is symmetric.
    pub fn is_compatible_with(&self, other: &MediaType) -> bool {
        if self.is_wildcard_type() || other.is_wildcard_type() {
            return true;
        }
        if self.type_ != other.type_ {
            return false;
        }
        if self.subtype == other.subtype {
            return true;
        }
        if self.subtype == WILDCARD || other.subtype == WILDCARD {
            return true;
        }
        suffix_matches(self, other) || suffix_matches(other, self)
    }

    /// Whether this media type includes `other`.
    ///
    /// `*/*` includes everything; otherwise the types must match and this
    /// subtype must either be `*` (or a matching `*+suffix`) or equal the
    /// other subtype. Parameters are ignored. The relation is not symmetric.
    pub fn includes(&self, other: &MediaType) -> bool {
        if self.is_wildcard_type() {
            return true;
        }
        if self.type_ != other.type_ {
            return false;
        }
        if self.subtype == other.subtype || self.subtype == WILDCARD {
            return true;
        }
        suffix_matches(self, other)
    }

    /// Returns a copy with the given parameters merged in; new keys override
    /// existing ones.
    ///
    /// Keys are lower-cased and are expected to be RFC 7230 tokens.
    pub fn with_parameters<I, K, V>(&self, parameters: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut merged = self.clone();
        for (key, value) in parameters {
            let key = key.as_ref().to_ascii_lowercase();
            debug_assert!(is_token(&key), "parameter name must be a token: {key:?}");
            insert_parameter(&mut merged.parameters, key, value.into());
        }
        merged
    }

    /// Returns a copy with a single parameter set.
    pub fn with_parameter(&self, key: &str, value: impl Into<String>) -> Self {
        self.with_parameters([(key, value.into())])
    }

    /// Returns a copy with the `charset` parameter set.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use http_wire::MediaType;
    ///
    /// let utf8 = MediaType::TEXT_PLAIN.with_charset("UTF-8");
    /// assert_eq!(utf8.to_string(), "text/plain;charset=UTF-8");
    /// assert_eq!(MediaType::TEXT_PLAIN.charset(), None);
    /// ```
    pub fn with_charset(&self, charset: &str) -> Self {
        self.with_parameter(PARAM_CHARSET, charset)
    }

    /// Returns a copy without the `q` parameter.
    pub fn without_quality(&self) -> Self {
        let mut copy = self.clone();
        copy.parameters.retain(|(key, _)| key != PARAM_QUALITY);
        copy
    }

    /// Sorts media types by descending quality, then by descending
    /// specificity: concrete before wildcard subtype before `*/*`, and more
    /// parameters before fewer. The sort is stable, so equally ranked types
    /// keep their original order.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use http_wire::MediaType;
    ///
    /// let mut list = MediaType::parse_list("*/*, text/*, text/html;level=1, text/html;q=0.5").unwrap();
    /// MediaType::sort_by_specificity_and_quality(&mut list);
    /// let sorted: Vec<String> = list.iter().map(ToString::to_string).collect();
    /// assert_eq!(sorted, ["text/html;level=1", "text/*", "*/*", "text/html;q=0.5"]);
    /// ```
    pub fn sort_by_specificity_and_quality(media_types: &mut [MediaType]) {
        media_types.sort_by(|a, b| {
            b.quality()
                .partial_cmp(&a.quality())
                .unwrap_or(Ordering::Equal)
                .then_with(|| compare_specificity(a, b))
        });
    }

    fn significant_parameters(&self) -> usize {
        self.parameters
            .iter()
            .filter(|(key, _)| key != PARAM_QUALITY)
            .count()
    }
}

fn compare_specificity(a: &MediaType, b: &MediaType) -> Ordering {
    a.is_wildcard_type()
        .cmp(&b.is_wildcard_type())
        .then_with(|| a.is_wildcard_subtype().cmp(&b.is_wildcard_subtype()))
        .then_with(|| b.significant_parameters().cmp(&a.significant_parameters()))
}

// `pattern` is `*+suffix` and `other` carries the same suffix.
fn suffix_matches(pattern: &MediaType, other: &MediaType) -> bool {
    match pattern.subtype.strip_prefix("*+") {
        Some(suffix) => other.subtype_suffix() == Some(suffix),
        None => false,
    }
}

fn check_type_and_subtype(
    value: &str,
    type_: &str,
    subtype: &str,
) -> Result<(String, String), MediaTypeError> {
    for token in [type_, subtype] {
        if !is_token(token) {
            return Err(MediaTypeError::InvalidToken {
                value: value.to_string(),
                token: token.to_string(),
            });
        }
    }
    if type_ == WILDCARD && subtype != WILDCARD {
        return Err(MediaTypeError::WildcardType(value.to_string()));
    }
    Ok((type_.to_ascii_lowercase(), subtype.to_ascii_lowercase()))
}

fn insert_parameter(parameters: &mut Vec<(String, String)>, key: String, value: String) {
    match parameters.iter_mut().find(|(existing, _)| *existing == key) {
        Some(slot) => slot.1 = value,
        None => parameters.push((key, value)),
    }
}

fn parse_quality(value: &str) -> Option<f32> {
    value
        .parse::<f32>()
        .ok()
        .filter(|q| (0.0..=1.0).contains(q))
}

/// RFC 7230 `tchar`.
pub(crate) fn is_token_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || "!#$%&'*+-.^_`|~".contains(c)
}

pub(crate) fn is_token(value: &str) -> bool {
    !value.is_empty() && value.chars().all(is_token_char)
}

/// Splits on `delimiter` outside of double quotes. Inside quotes a backslash
/// escapes the next character. Returns `None` for an unterminated quote.
pub(crate) fn split_unquoted(value: &str, delimiter: char) -> Option<Vec<&str>> {
    let mut parts = Vec::new();
    let mut in_quotes = false;
    let mut escaped = false;
    let mut start = 0;
    for (index, c) in value.char_indices() {
        if escaped {
            escaped = false;
        } else if in_quotes && c == '\\' {
            escaped = true;
        } else if c == '"' {
            in_quotes = !in_quotes;
        } else if c == delimiter && !in_quotes {
            parts.push(&value[start..index]);
            start = index + c.len_utf8();
        }
    }
    if in_quotes {
        return None;
    }
    parts.push(&value[start..]);
    Some(parts)
}

fn unquote(value: &str) -> String {
    match value
        .strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
    {
        Some(inner) => {
            let mut unescaped = String::with_capacity(inner.len());
            let mut chars = inner.chars();
            while let Some(c) = chars.next() {
                if c == '\\' {
                    if let Some(next) = chars.next() {
                        unescaped.push(next);
                        continue;
                    }
                }
                unescaped.push(c);
            }
            unescaped
        }
        None => value.to_string(),
    }
}

fn write_parameter_value(f: &mut fmt::Formatter<'_>, value: &str) -> fmt::Result {
    if is_token(value) {
        return f.write_str(value);
    }
    f.write_str("\"")?;
    for c in value.chars() {
        if c == '"' || c == '\\' {
            f.write_str("\\")?;
        }
        fmt::Write::write_char(f, c)?;
    }
    f.write_str("\"")
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.type_)?;
        f.write_str("/")?;
        f.write_str(&self.subtype)?;
        for (key, value) in &self.parameters {
            f.write_str(";")?;
            f.write_str(key)?;
            f.write_str("=")?;
            write_parameter_value(f, value)?;
        }
        Ok(())
    }
}

impl fmt::Debug for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("MediaType")
            .field(&format_args!("{self}"))
            .finish()
    }
}

impl PartialEq for MediaType {
    fn eq(&self, other: &Self) -> bool {
        self.equals_type_and_subtype(other)
            && self.parameters.len() == other.parameters.len()
            && self.parameters.iter().all(|(key, value)| {
                other.parameter(key).is_some_and(|other_value| {
                    if key == PARAM_CHARSET {
                        value.eq_ignore_ascii_case(other_value)
                    } else {
                        value == other_value
                    }
                })
            })
    }
}

impl Eq for MediaType {}

impl Hash for MediaType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_.hash(state);
        self.subtype.hash(state);
        let mut parameters: Vec<(&str, String)> = self
            .parameters
            .iter()
            .map(|(key, value)| {
                let value = if key == PARAM_CHARSET {
                    value.to_ascii_lowercase()
                } else {
                    value.clone()
                };
                (key.as_str(), value)
            })
            .collect();
        parameters.sort();
        parameters.hash(state);
    }
}

impl FromStr for MediaType {
    type Err = MediaTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<&HeaderValue> for MediaType {
    type Error = HeaderError;

    fn try_from(value: &HeaderValue) -> Result<Self, Self::Error> {
        let value = value
            .to_str()
            .map_err(|_| HeaderError::malformed("Content-Type", "not visible ASCII"))?;
        Ok(Self::parse(value)?)
    }
}

impl TryFrom<&MediaType> for HeaderValue {
    type Error = http::header::InvalidHeaderValue;

    fn try_from(media_type: &MediaType) -> Result<Self, Self::Error> {
        HeaderValue::try_from(media_type.to_string())
    }
}

#[cfg(feature = "mime")]
impl TryFrom<&mime::Mime> for MediaType {
    type Error = MediaTypeError;

    fn try_from(mime: &mime::Mime) -> Result<Self, Self::Error> {
        Self::parse(mime.as_ref())
    }
}

#[cfg(feature = "mime")]
impl TryFrom<&MediaType> for mime::Mime {
    type Error = mime::FromStrError;

    fn try_from(media_type: &MediaType) -> Result<Self, Self::Error> {
        media_type.to_string().parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::{format, vec};
    use quickcheck::{Arbitrary, Gen};
    use quickcheck_macros::quickcheck;

    fn mt(value: &str) -> MediaType {
        MediaType::parse(value).unwrap()
    }

    #[test]
    fn parses_type_subtype_and_parameters() {
        let parsed = mt(" Application/JSON ; charset = \"utf-8\" ; version=2 ");
        assert_eq!(parsed.type_(), "application");
        assert_eq!(parsed.subtype(), "json");
        assert_eq!(parsed.charset(), Some("utf-8"));
        assert_eq!(parsed.parameter("VERSION"), Some("2"));
        assert_eq!(parsed.to_string(), "application/json;charset=utf-8;version=2");
    }

    #[test]
    fn rejects_malformed_input() {
        assert_eq!(MediaType::parse("  "), Err(MediaTypeError::Empty));
        assert!(matches!(
            MediaType::parse("textplain"),
            Err(MediaTypeError::MissingSlash(_))
        ));
        assert!(matches!(
            MediaType::parse("text/plain/x"),
            Err(MediaTypeError::ExtraSlash(_))
        ));
        assert!(matches!(
            MediaType::parse("text/"),
            Err(MediaTypeError::MissingSubtype(_))
        ));
        assert!(matches!(
            MediaType::parse("*/json"),
            Err(MediaTypeError::WildcardType(_))
        ));
        assert!(matches!(
            MediaType::parse("te xt/plain"),
            Err(MediaTypeError::InvalidToken { .. })
        ));
        assert!(matches!(
            MediaType::parse("text/plain;charset"),
            Err(MediaTypeError::InvalidParameter { .. })
        ));
        assert!(matches!(
            MediaType::parse("text/plain;q=2"),
            Err(MediaTypeError::InvalidParameter { .. })
        ));
        assert!(matches!(
            MediaType::parse("text/plain;name=\"open"),
            Err(MediaTypeError::UnterminatedQuote(_))
        ));
    }

    #[test]
    fn lone_star_is_all() {
        assert_eq!(mt("*"), MediaType::ALL);
        assert_eq!(mt("*; q=0.1").quality(), 0.1);
    }

    #[test]
    fn duplicate_parameters_keep_last_value() {
        let parsed = mt("text/plain;charset=a;charset=b");
        assert_eq!(parsed.charset(), Some("b"));
        assert_eq!(parsed.parameters().count(), 1);
    }

    #[test]
    fn trailing_semicolon_is_ignored() {
        assert_eq!(mt("text/plain;"), MediaType::TEXT_PLAIN);
    }

    #[test]
    fn quoted_semicolons_stay_in_value() {
        let parsed = mt("multipart/form-data; boundary=\"a;b\\\"c\"");
        assert_eq!(parsed.parameter("boundary"), Some("a;b\"c"));
        assert_eq!(
            parsed.to_string(),
            "multipart/form-data;boundary=\"a;b\\\"c\""
        );
    }

    #[test]
    fn values_with_separators_are_quoted() {
        let value = MediaType::TEXT_PLAIN.with_parameter("title", "a b, c");
        assert_eq!(value.to_string(), "text/plain;title=\"a b, c\"");
        assert_eq!(mt(&value.to_string()), value);
    }

    #[test]
    fn equality_ignores_parameter_order_and_charset_case() {
        assert_eq!(mt("text/plain;a=1;b=2"), mt("text/plain;b=2;a=1"));
        assert_eq!(mt("text/plain;charset=UTF-8"), mt("text/plain;charset=utf-8"));
        assert_ne!(mt("text/plain;a=X"), mt("text/plain;a=x"));
        assert_ne!(mt("text/plain;a=1"), mt("text/plain"));
    }

    #[test]
    fn compatibility_examples() {
        let cases = [
            ("text/plain", "text/plain", true),
            ("text/plain", "text/*", true),
            ("*/*", "image/png", true),
            ("text/plain", "text/html", false),
            ("text/plain", "image/plain", false),
            ("application/*+json", "application/problem+json", true),
            ("application/*+json", "application/xml", false),
            ("application/*+json", "application/*", true),
        ];
        for (a, b, expected) in cases {
            assert_eq!(mt(a).is_compatible_with(&mt(b)), expected, "{a} ~ {b}");
            assert_eq!(mt(b).is_compatible_with(&mt(a)), expected, "{b} ~ {a}");
        }
    }

    #[test]
    fn inclusion_is_asymmetric() {
        let text_any = mt("text/*");
        let text_plain = mt("text/plain");
        assert!(text_any.includes(&text_plain));
        assert!(!text_plain.includes(&text_any));
        assert!(MediaType::ALL.includes(&text_any));
        assert!(!text_any.includes(&MediaType::ALL));
        assert!(MediaType::APPLICATION_JSON_ANY.includes(&mt("application/vnd.api+json")));
        assert!(!mt("application/vnd.api+json").includes(&MediaType::APPLICATION_JSON_ANY));
    }

    #[test]
    fn derived_instances_are_copies() {
        let base = mt("text/plain;charset=ISO-8859-1");
        let utf8 = base.with_charset("UTF-8");
        assert_eq!(base.charset(), Some("ISO-8859-1"));
        assert_eq!(utf8.charset(), Some("UTF-8"));

        let merged = base.with_parameters([("Format", "flowed"), ("charset", "US-ASCII")]);
        assert_eq!(
            merged.to_string(),
            "text/plain;charset=US-ASCII;format=flowed"
        );
    }

    #[test]
    fn suffix_and_wildcard_queries() {
        assert_eq!(mt("application/vnd.api+json").subtype_suffix(), Some("json"));
        assert_eq!(mt("text/plain").subtype_suffix(), None);
        assert!(MediaType::ALL.is_wildcard_type());
        assert!(mt("text/*").is_wildcard_subtype());
        assert!(!mt("text/*").is_concrete());
        assert!(mt("text/csv").is_concrete());
    }

    #[test]
    fn quality_handling() {
        let weighted = mt("text/html;q=0.3;level=1");
        assert_eq!(weighted.quality(), 0.3);
        assert_eq!(weighted.without_quality(), mt("text/html;level=1"));
        assert_eq!(MediaType::TEXT_HTML.quality(), 1.0);
    }

    #[test]
    fn parse_list_handles_quotes_and_empties() {
        let list = MediaType::parse_list("text/plain;x=\"a,b\", , application/json").unwrap();
        assert_eq!(list, vec![mt("text/plain;x=\"a,b\""), MediaType::APPLICATION_JSON]);
        assert!(MediaType::parse_list("").unwrap().is_empty());
        assert!(MediaType::parse_list("text/plain, nope").is_err());
    }

    #[test]
    fn header_value_conversions() {
        let header = HeaderValue::from_static("text/html; charset=utf-8");
        let parsed = MediaType::try_from(&header).unwrap();
        assert_eq!(parsed.charset(), Some("utf-8"));
        let back = HeaderValue::try_from(&parsed).unwrap();
        assert_eq!(back, "text/html;charset=utf-8");

        let invalid = HeaderValue::from_static("html");
        assert!(matches!(
            MediaType::try_from(&invalid),
            Err(HeaderError::Malformed { .. })
        ));
    }

    #[cfg(feature = "mime")]
    #[test]
    fn mime_interop() {
        let from_mime = MediaType::try_from(&mime::APPLICATION_JSON).unwrap();
        assert_eq!(from_mime, MediaType::APPLICATION_JSON);
        let to_mime = mime::Mime::try_from(&mt("image/svg+xml")).unwrap();
        assert_eq!(to_mime, mime::IMAGE_SVG);
    }

    #[derive(Clone, Debug)]
    struct AnyMediaType(MediaType);

    impl Arbitrary for AnyMediaType {
        fn arbitrary(g: &mut Gen) -> Self {
            const TYPES: &[&str] = &["text", "application", "image", "*"];
            const SUBTYPES: &[&str] = &["plain", "json", "*", "vnd.api+json", "*+json", "html"];
            const KEYS: &[&str] = &["charset", "level", "boundary", "title"];
            const VALUES: &[&str] = &["utf-8", "1", "a b", "x;y", "q\"uote", "back\\slash", ""];

            let type_ = *g.choose(TYPES).unwrap();
            let subtype = if type_ == "*" {
                "*"
            } else {
                *g.choose(SUBTYPES).unwrap()
            };
            let mut media_type = MediaType::new(type_, subtype).unwrap();
            for _ in 0..usize::arbitrary(g) % 3 {
                let key = *g.choose(KEYS).unwrap();
                let value = *g.choose(VALUES).unwrap();
                media_type = media_type.with_parameter(key, value);
            }
            AnyMediaType(media_type)
        }
    }

    #[quickcheck]
    fn display_then_parse_is_identity(media_type: AnyMediaType) -> bool {
        MediaType::parse(&media_type.0.to_string()).as_ref() == Ok(&media_type.0)
    }

    #[quickcheck]
    fn compatibility_is_symmetric(a: AnyMediaType, b: AnyMediaType) -> bool {
        a.0.is_compatible_with(&b.0) == b.0.is_compatible_with(&a.0)
    }

    #[quickcheck]
    fn inclusion_implies_compatibility(a: AnyMediaType, b: AnyMediaType) -> bool {
        !a.0.includes(&b.0) || a.0.is_compatible_with(&b.0)
    }

    #[test]
    fn debug_shows_wire_form() {
        assert_eq!(
            format!("{:?}", mt("text/plain;charset=utf-8")),
            "MediaType(text/plain;charset=utf-8)"
        );
    }
}
