//! The character sets understood by the header codecs and the text converter.

use alloc::{borrow::Cow, string::String, vec::Vec};
use core::{fmt, str::FromStr};

use crate::error::HeaderError;

/// A supported character set.
///
/// Header values carrying other charsets are rejected with
/// [`HeaderError::UnsupportedCharset`].
///
/// # Examples
///
/// ```rust
/// use http_wire::Charset;
///
/// assert_eq!(Charset::for_name("latin1"), Some(Charset::Iso8859_1));
/// assert_eq!(Charset::Iso8859_1.encode("café"), b"caf\xe9");
/// assert_eq!(Charset::UsAscii.encode("café"), b"caf?");
/// assert_eq!(Charset::Iso8859_1.decode(b"caf\xe9"), "café");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Charset {
    /// `US-ASCII`
    UsAscii,
    /// `ISO-8859-1` (Latin-1)
    Iso8859_1,
    /// `UTF-8`
    Utf8,
}

impl Charset {
    /// Resolves a charset name, ignoring ASCII case and common aliases.
    pub fn for_name(name: &str) -> Option<Self> {
        let name = name.trim().to_ascii_lowercase();
        match name.as_str() {
            "utf-8" | "utf8" => Some(Self::Utf8),
            "iso-8859-1" | "iso8859-1" | "iso_8859-1" | "iso-latin-1" | "latin1" | "l1"
            | "cp819" => Some(Self::Iso8859_1),
            "us-ascii" | "ascii" | "us" | "iso646-us" => Some(Self::UsAscii),
            _ => None,
        }
    }

    /// Canonical name, as written into header values.
    pub const fn name(self) -> &'static str {
        match self {
            Self::UsAscii => "US-ASCII",
            Self::Iso8859_1 => "ISO-8859-1",
            Self::Utf8 => "UTF-8",
        }
    }

    /// Encodes `value`, replacing characters the charset cannot represent with `?`.
    pub fn encode(self, value: &str) -> Vec<u8> {
        match self {
            Self::Utf8 => value.as_bytes().to_vec(),
            Self::Iso8859_1 => value
                .chars()
                .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
                .collect(),
            Self::UsAscii => value
                .chars()
                .map(|c| if c.is_ascii() { c as u8 } else { b'?' })
                .collect(),
        }
    }

    /// Decodes `bytes`. Invalid UTF-8 sequences and non-ASCII bytes in
    /// US-ASCII are replaced with `U+FFFD`.
    pub fn decode(self, bytes: &[u8]) -> String {
        match self {
            Self::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
            Self::Iso8859_1 => bytes.iter().map(|&b| char::from(b)).collect(),
            Self::UsAscii => bytes
                .iter()
                .map(|&b| {
                    if b.is_ascii() {
                        char::from(b)
                    } else {
                        char::REPLACEMENT_CHARACTER
                    }
                })
                .collect(),
        }
    }

    /// Decodes `bytes` without copying when they are valid in this charset
    /// and coincide with their UTF-8 form.
    pub(crate) fn decode_cow(self, bytes: &[u8]) -> Cow<'_, str> {
        match self {
            Self::Utf8 => String::from_utf8_lossy(bytes),
            _ if bytes.is_ascii() => String::from_utf8_lossy(bytes),
            _ => Cow::Owned(self.decode(bytes)),
        }
    }

    /// Whether the charset is US-ASCII.
    pub fn is_ascii(self) -> bool {
        self == Self::UsAscii
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Charset {
    type Err = HeaderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::for_name(s).ok_or_else(|| HeaderError::UnsupportedCharset(s.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_aliases_case_insensitively() {
        assert_eq!("Utf8".parse::<Charset>(), Ok(Charset::Utf8));
        assert_eq!("ISO-8859-1".parse::<Charset>(), Ok(Charset::Iso8859_1));
        assert_eq!(" us-ascii ".parse::<Charset>(), Ok(Charset::UsAscii));
        assert_eq!(
            "Shift_JIS".parse::<Charset>(),
            Err(HeaderError::UnsupportedCharset("Shift_JIS".into()))
        );
    }

    #[test]
    fn encoding_replaces_unmappable_characters() {
        assert_eq!(Charset::Iso8859_1.encode("a€"), b"a?");
        assert_eq!(Charset::Utf8.encode("€"), "€".as_bytes());
    }

    #[test]
    fn decoding_is_lossy() {
        assert_eq!(Charset::Utf8.decode(b"a\xffb"), "a\u{fffd}b");
        assert_eq!(Charset::UsAscii.decode(b"a\xe9"), "a\u{fffd}");
        assert_eq!(Charset::Iso8859_1.decode_cow(b"plain"), "plain");
        assert!(matches!(
            Charset::Iso8859_1.decode_cow(b"\xe9"),
            Cow::Owned(_)
        ));
    }
}
