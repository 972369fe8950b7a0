//! Entity tags, defined in [RFC 9110 section 8.8.3].
//!
//! An entity tag is an opaque string in double quotes with an optional `W/`
//! weakness prefix. `If-Match` and `If-None-Match` carry comma-separated
//! lists of tags or the wildcard `*`.
//!
//! Parsing of tag lists is deliberately permissive. [`ETag::parse`] scans the
//! header once, keeps every tag it could read, and reports the first problem
//! as a warning instead of failing the request.
//!
//! # Comparison
//!
//! | ETag 1  | ETag 2  | Strong Comparison | Weak Comparison |
//! |---------|---------|-------------------|-----------------|
//! | `W/"1"` | `W/"1"` | no match          | match           |
//! | `W/"1"` | `W/"2"` | no match          | no match        |
//! | `W/"1"` | `"1"`   | no match          | match           |
//! | `"1"`   | `"1"`   | match             | match           |
//!
//! [RFC 9110 section 8.8.3]: https://www.rfc-editor.org/rfc/rfc9110#section-8.8.3

use alloc::{
    borrow::Cow,
    string::{String, ToString},
    vec::Vec,
};
use core::fmt;

use http::HeaderValue;

use crate::error::HeaderError;

/// An entity tag: an opaque tag and a weakness flag.
///
/// Use [`ETag::compare`] (or [`strong_eq`](ETag::strong_eq) /
/// [`weak_eq`](ETag::weak_eq)) to check whether two tags validate the same
/// representation; `==` only checks that they are identical.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ETag {
    tag: Cow<'static, str>,
    weak: bool,
}

/// Scanner states while reading a tag list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    BeforeQuotes,
    InQuotes,
    AfterQuotes,
}

/// A problem the tag list scanner recovered from.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ETagWarning {
    /// A character that cannot appear at this position; scanning stopped here.
    UnexpectedChar {
        /// Byte offset of the character.
        index: usize,
        /// The character found.
        found: char,
    },
    /// The header ended inside a quoted tag, which was dropped.
    UnterminatedQuote {
        /// Byte offset of the opening quote.
        start: usize,
    },
}

impl fmt::Display for ETagWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedChar { index, found } => {
                write!(f, "unexpected {found:?} at index {index}")
            }
            Self::UnterminatedQuote { start } => {
                write!(f, "quote opened at index {start} is never closed")
            }
        }
    }
}

/// The result of scanning an `If-Match` / `If-None-Match` header: every tag
/// that could be read, plus the warnings raised on the way.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ETagList {
    /// Tags in header order.
    pub tags: Vec<ETag>,
    /// Problems encountered; non-empty means the list may be truncated.
    pub warnings: Vec<ETagWarning>,
}

impl ETagList {
    /// Whether any listed tag matches `etag`, or the list contains `*`.
    ///
    /// Use strong comparison for `If-Match` and weak comparison for
    /// `If-None-Match`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use http_wire::ETag;
    ///
    /// let current = ETag::strong("v2").unwrap();
    /// let if_none_match = ETag::parse("W/\"v1\", W/\"v2\"");
    /// assert!(if_none_match.matches(&current, false));
    /// assert!(!if_none_match.matches(&current, true));
    /// ```
    pub fn matches(&self, etag: &ETag, strong: bool) -> bool {
        self.tags
            .iter()
            .any(|candidate| candidate.is_wildcard() || candidate.compare(etag, strong))
    }

    /// Whether no tag was read.
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Whether the list contains the wildcard.
    pub fn has_wildcard(&self) -> bool {
        self.tags.iter().any(ETag::is_wildcard)
    }
}

impl IntoIterator for ETagList {
    type Item = ETag;
    type IntoIter = alloc::vec::IntoIter<ETag>;

    fn into_iter(self) -> Self::IntoIter {
        self.tags.into_iter()
    }
}

impl ETag {
    /// The wildcard `*`, matching any current representation.
    pub const WILDCARD: ETag = ETag {
        tag: Cow::Borrowed("*"),
        weak: false,
    };

    /// Creates a tag after checking it is non-empty and contains only
    /// `etagc` characters (visible ASCII except `"`, plus obs-text).
    pub fn new(tag: impl Into<String>, weak: bool) -> Result<Self, HeaderError> {
        let tag = tag.into();
        if tag.is_empty() {
            return Err(HeaderError::malformed("ETag", "empty entity tag"));
        }
        if !tag.bytes().all(is_etagc) {
            return Err(HeaderError::malformed(
                "ETag",
                alloc::format!("invalid character in entity tag {tag:?}"),
            ));
        }
        Ok(Self {
            tag: Cow::Owned(tag),
            weak,
        })
    }

    /// Creates a strong tag.
    pub fn strong(tag: impl Into<String>) -> Result<Self, HeaderError> {
        Self::new(tag, false)
    }

    /// Creates a weak tag.
    pub fn weak(tag: impl Into<String>) -> Result<Self, HeaderError> {
        Self::new(tag, true)
    }

    /// Returns the wildcard tag.
    pub fn wildcard() -> Self {
        Self::WILDCARD
    }

    /// Leniently reads a single tag, accepting `"tag"`, `W/"tag"` and a bare
    /// `tag`. No validation is performed, so the result may be empty.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use http_wire::ETag;
    ///
    /// assert_eq!(ETag::create("W/\"abc\""), ETag::weak("abc").unwrap());
    /// assert_eq!(ETag::create("abc"), ETag::strong("abc").unwrap());
    /// assert!(ETag::create("*").is_wildcard());
    /// ```
    pub fn create(raw: &str) -> Self {
        let (weak, rest) = match raw.strip_prefix("W/") {
            Some(rest) => (true, rest),
            None => (false, raw),
        };
        let tag = rest
            .strip_prefix('"')
            .and_then(|inner| inner.strip_suffix('"'))
            .unwrap_or(rest);
        if tag == "*" && !weak {
            return Self::WILDCARD;
        }
        Self {
            tag: Cow::Owned(tag.to_string()),
            weak,
        }
    }

    /// The opaque tag, without quotes or weakness prefix.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Whether the tag carries the `W/` prefix.
    pub fn is_weak(&self) -> bool {
        self.weak
    }

    /// Whether this is the wildcard `*`.
    pub fn is_wildcard(&self) -> bool {
        !self.weak && self.tag == "*"
    }

    /// Compares two tags.
    ///
    /// Both tags must be non-empty. Strong comparison fails when either tag
    /// is weak; otherwise the opaque tags must be identical.
    pub fn compare(&self, other: &ETag, strong: bool) -> bool {
        if self.tag.is_empty() || other.tag.is_empty() {
            return false;
        }
        if strong && (self.weak || other.weak) {
            return false;
        }
        self.tag == other.tag
    }

    /// Strong comparison, see [`ETag::compare`].
    pub fn strong_eq(&self, other: &ETag) -> bool {
        self.compare(other, true)
    }

    /// Weak comparison, see [`ETag::compare`].
    pub fn weak_eq(&self, other: &ETag) -> bool {
        self.compare(other, false)
    }

    /// Scans a comma-separated list of entity tags.
    ///
    /// The scanner never fails. On an unexpected character or an unterminated
    /// quote it stops, returns the tags read so far and records a warning,
    /// which is also logged at debug level. Quoted tags follow the same
    /// character rule as [`ETag::new`], so a space or control character
    /// inside quotes stops the scan.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use http_wire::ETag;
    ///
    /// let list = ETag::parse("\"a\", W/\"b\", *");
    /// assert_eq!(list.tags, [ETag::strong("a").unwrap(), ETag::weak("b").unwrap(), ETag::wildcard()]);
    /// assert!(list.warnings.is_empty());
    ///
    /// let partial = ETag::parse("\"a\", b");
    /// assert_eq!(partial.tags, [ETag::strong("a").unwrap()]);
    /// assert_eq!(partial.warnings.len(), 1);
    /// ```
    pub fn parse(header: &str) -> ETagList {
        let mut list = ETagList::default();
        let mut state = State::BeforeQuotes;
        let mut start = 0;
        let mut weak = false;

        let mut chars = header.char_indices().peekable();
        while let Some((index, c)) = chars.next() {
            if state == State::InQuotes {
                if c == '"' {
                    let tag = &header[start..index];
                    if !tag.is_empty() {
                        list.tags.push(Self {
                            tag: Cow::Owned(tag.to_string()),
                            weak,
                        });
                    }
                    state = State::AfterQuotes;
                    weak = false;
                    continue;
                }
                if !c.is_ascii() || is_etagc(c as u8) {
                    continue;
                }
            } else if c.is_whitespace() {
                continue;
            } else if c == ',' {
                state = State::BeforeQuotes;
                weak = false;
                continue;
            } else if state == State::BeforeQuotes {
                match c {
                    '*' => {
                        list.tags.push(Self::WILDCARD);
                        state = State::AfterQuotes;
                        weak = false;
                        continue;
                    }
                    '"' => {
                        state = State::InQuotes;
                        start = index + 1;
                        continue;
                    }
                    'W' if chars.next_if(|&(_, next)| next == '/').is_some() => {
                        weak = true;
                        continue;
                    }
                    _ => {}
                }
            }

            list.warnings
                .push(ETagWarning::UnexpectedChar { index, found: c });
            break;
        }

        if state == State::InQuotes && list.warnings.is_empty() {
            list.warnings
                .push(ETagWarning::UnterminatedQuote { start: start - 1 });
        }
        for warning in &list.warnings {
            tracing::debug!(header, %warning, "recovered from malformed entity tag list");
        }
        list
    }

    /// Like [`ETag::parse`], keeping only the tags.
    pub fn parse_tags(header: &str) -> Vec<ETag> {
        Self::parse(header).tags
    }
}

fn is_etagc(b: u8) -> bool {
    b == 0x21 || (0x23..=0x7e).contains(&b) || b >= 0x80
}

impl fmt::Display for ETag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_wildcard() {
            return f.write_str("*");
        }
        if self.weak {
            f.write_str("W/")?;
        }
        write!(f, "\"{}\"", self.tag)
    }
}

impl TryFrom<&ETag> for HeaderValue {
    type Error = http::header::InvalidHeaderValue;

    fn try_from(etag: &ETag) -> Result<Self, Self::Error> {
        HeaderValue::try_from(etag.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use quickcheck_macros::quickcheck;

    fn strong(tag: &str) -> ETag {
        ETag::strong(tag).unwrap()
    }

    fn weak(tag: &str) -> ETag {
        ETag::weak(tag).unwrap()
    }

    #[test]
    fn parses_mixed_list() {
        let list = ETag::parse("\"a\", W/\"b\", *");
        assert_eq!(list.tags, vec![strong("a"), weak("b"), ETag::WILDCARD]);
        assert!(list.warnings.is_empty());
        assert!(list.has_wildcard());
    }

    #[test]
    fn tolerates_whitespace_and_empty_elements() {
        let list = ETag::parse("  \"x\" ,, \t W/\"y\"  ");
        assert_eq!(list.tags, vec![strong("x"), weak("y")]);
        assert!(list.warnings.is_empty());
        assert!(ETag::parse("").is_empty());
    }

    #[test]
    fn quoted_content_is_opaque() {
        let list = ETag::parse("\"a,bW/*\", \"c\"");
        assert_eq!(list.tags, vec![strong("a,bW/*"), strong("c")]);
        assert!(list.warnings.is_empty());
    }

    #[test]
    fn empty_quoted_tags_are_skipped() {
        let list = ETag::parse("\"\", \"z\"");
        assert_eq!(list.tags, vec![strong("z")]);
    }

    #[test]
    fn quoted_tags_follow_constructor_rules() {
        let list = ETag::parse("\"a\", \"b c\", \"d\"");
        assert_eq!(list.tags, vec![strong("a")]);
        assert_eq!(
            list.warnings,
            vec![ETagWarning::UnexpectedChar {
                index: 7,
                found: ' '
            }]
        );
        for tag in &ETag::parse("\"x\", W/\"h\u{e9}llo\"").tags {
            assert_eq!(ETag::new(tag.tag(), tag.is_weak()).as_ref(), Ok(tag));
        }

        let control = ETag::parse("\"a\tb\"");
        assert!(control.is_empty());
        assert_eq!(control.warnings.len(), 1);
    }

    #[test]
    fn stops_at_unexpected_character() {
        let list = ETag::parse("\"a\" \"b\", \"c\"");
        assert_eq!(list.tags, vec![strong("a")]);
        assert_eq!(
            list.warnings,
            vec![ETagWarning::UnexpectedChar {
                index: 4,
                found: '"'
            }]
        );

        let bare = ETag::parse("W/abc");
        assert!(bare.tags.is_empty());
        assert_eq!(
            bare.warnings,
            vec![ETagWarning::UnexpectedChar {
                index: 2,
                found: 'a'
            }]
        );
    }

    #[test]
    fn unterminated_quote_drops_last_tag() {
        let list = ETag::parse("\"a\", W/\"b");
        assert_eq!(list.tags, vec![strong("a")]);
        assert_eq!(list.warnings, vec![ETagWarning::UnterminatedQuote { start: 7 }]);
        assert_eq!(
            list.warnings[0].to_string(),
            "quote opened at index 7 is never closed"
        );
    }

    #[test]
    fn weak_flag_does_not_leak_to_next_tag() {
        let list = ETag::parse("W/\"a\", \"b\"");
        assert_eq!(list.tags, vec![weak("a"), strong("b")]);

        let dangling = ETag::parse("W/ , \"b\"");
        assert_eq!(dangling.tags, vec![strong("b")]);
        assert!(dangling.warnings.is_empty());

        let wildcard = ETag::parse("W/*, \"b\"");
        assert_eq!(wildcard.tags, vec![ETag::WILDCARD, strong("b")]);
    }

    #[test]
    fn comparison_table() {
        assert!(!weak("1").strong_eq(&weak("1")));
        assert!(weak("1").weak_eq(&weak("1")));
        assert!(!weak("1").weak_eq(&weak("2")));
        assert!(!weak("1").strong_eq(&strong("1")));
        assert!(weak("1").weak_eq(&strong("1")));
        assert!(strong("1").strong_eq(&strong("1")));
        assert!(!ETag::create("\"\"").weak_eq(&ETag::create("\"\"")));
    }

    #[test]
    fn list_matching_honours_wildcard() {
        let any = ETag::parse("*");
        assert!(any.matches(&weak("anything"), true));
        let none = ETag::parse("");
        assert!(!none.matches(&strong("x"), false));
    }

    #[test]
    fn constructors_validate() {
        assert!(ETag::strong("").is_err());
        assert!(ETag::strong("a\"b").is_err());
        assert!(ETag::weak("héllo").is_ok());
    }

    #[test]
    fn display_forms() {
        assert_eq!(strong("abc").to_string(), "\"abc\"");
        assert_eq!(weak("abc").to_string(), "W/\"abc\"");
        assert_eq!(ETag::wildcard().to_string(), "*");
        assert_eq!(
            HeaderValue::try_from(&weak("v1")).unwrap(),
            "W/\"v1\""
        );
    }

    #[quickcheck]
    fn strong_match_implies_weak_match(a: String, a_weak: bool, b: String, b_weak: bool) -> bool {
        let a = ETag::create(&a);
        let b = ETag::create(&b);
        let a = ETag { weak: a_weak, ..a };
        let b = ETag { weak: b_weak, ..b };
        !a.strong_eq(&b) || a.weak_eq(&b)
    }

    #[quickcheck]
    fn displayed_valid_tags_parse_back(tag: String, weak: bool) -> bool {
        match ETag::new(tag.replace(' ', "").replace(',', ""), weak) {
            Ok(etag) if !etag.is_wildcard() => {
                ETag::parse(&etag.to_string()).tags == vec![etag]
            }
            _ => true,
        }
    }
}
