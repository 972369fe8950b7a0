//! Byte ranges: the `Range` request header and the `Content-Range` response
//! header, as defined by [RFC 7233].
//!
//! A `Range` header is first read into unresolved [`RangeSpec`] units, which
//! are then resolved against the length of the representation into concrete,
//! inclusive [`HttpRange`]s. [`HttpRange::parse`] does both steps at once.
//!
//! # Examples
//!
//! ```rust
//! use http_wire::{HttpRange, RangeSpec};
//!
//! let ranges = HttpRange::parse("bytes=0-99, 50-149, -100", 1000).unwrap();
//! assert_eq!(ranges[2], HttpRange::new(900, 999).unwrap());
//!
//! let merged = HttpRange::merge(ranges);
//! assert_eq!(merged, [HttpRange::new(0, 149).unwrap(), HttpRange::new(900, 999).unwrap()]);
//!
//! let specs = RangeSpec::parse_header("bytes=500-").unwrap();
//! assert_eq!(specs, [RangeSpec::From(500)]);
//! ```
//!
//! [RFC 7233]: https://datatracker.ietf.org/doc/html/rfc7233

use alloc::{string::String, vec::Vec};
use core::{fmt, str::FromStr};

use crate::error::HeaderError;

const BYTES_UNIT: &str = "bytes";

/// Limits applied while parsing a `Range` header.
///
/// # Examples
///
/// ```rust
/// use http_wire::{HeaderError, HttpRange, RangeConfig};
///
/// let config = RangeConfig::default().with_max_ranges(2);
/// let err = HttpRange::parse_with("bytes=0-1,2-3,4-5", 10, &config).unwrap_err();
/// assert_eq!(err, HeaderError::TooManyRanges { count: 3, max: 2 });
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeConfig {
    max_ranges: usize,
}

impl RangeConfig {
    /// Default limit on the number of ranges in one header.
    pub const DEFAULT_MAX_RANGES: usize = 100;

    /// Creates the default configuration.
    pub const fn new() -> Self {
        Self {
            max_ranges: Self::DEFAULT_MAX_RANGES,
        }
    }

    /// Sets the maximum number of ranges accepted in one header.
    pub const fn with_max_ranges(mut self, max_ranges: usize) -> Self {
        self.max_ranges = max_ranges;
        self
    }

    /// The maximum number of ranges accepted in one header.
    pub const fn max_ranges(&self) -> usize {
        self.max_ranges
    }
}

impl Default for RangeConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// A single unit of a `Range` header before it is resolved against a length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RangeSpec {
    /// `first-last`, both inclusive.
    FromTo(u64, u64),
    /// `first-`, up to the end of the representation.
    From(u64),
    /// `-length`, the last `length` bytes.
    Suffix(u64),
}

impl RangeSpec {
    /// Parses a `Range` header with the default [`RangeConfig`].
    ///
    /// An empty header yields an empty list.
    pub fn parse_header(header: &str) -> Result<Vec<RangeSpec>, HeaderError> {
        Self::parse_header_with(header, &RangeConfig::default())
    }

    /// Parses a `Range` header, enforcing `config`.
    ///
    /// # Errors
    ///
    /// - [`HeaderError::Malformed`] when the header does not start with
    ///   `bytes=`, lists no range, or contains a unit that is not `N-M`,
    ///   `N-` or `-N` with `N <= M`.
    /// - [`HeaderError::TooManyRanges`] when more than
    ///   [`RangeConfig::max_ranges`] units are listed.
    pub fn parse_header_with(
        header: &str,
        config: &RangeConfig,
    ) -> Result<Vec<RangeSpec>, HeaderError> {
        let header = header.trim();
        if header.is_empty() {
            return Ok(Vec::new());
        }
        let units = header
            .strip_prefix(BYTES_UNIT)
            .and_then(|rest| rest.strip_prefix('='))
            .ok_or_else(|| HeaderError::malformed("Range", "range unit must be 'bytes='"))?;

        let units: Vec<&str> = units
            .split(',')
            .map(str::trim)
            .filter(|unit| !unit.is_empty())
            .collect();
        if units.is_empty() {
            return Err(HeaderError::malformed("Range", "no range specified"));
        }
        if units.len() > config.max_ranges {
            return Err(HeaderError::TooManyRanges {
                count: units.len(),
                max: config.max_ranges,
            });
        }
        units.into_iter().map(str::parse).collect()
    }

    /// Resolves this unit against the length of the representation.
    ///
    /// Open and over-long ends are clamped to `length - 1`; a suffix longer
    /// than the representation selects all of it.
    ///
    /// # Errors
    ///
    /// [`HeaderError::RangeNotSatisfiable`] when the range starts at or
    /// beyond `length`, or is a zero-length suffix.
    pub fn resolve(&self, length: u64) -> Result<HttpRange, HeaderError> {
        let not_satisfiable = HeaderError::RangeNotSatisfiable { length };
        let last = length.checked_sub(1).ok_or(not_satisfiable.clone())?;
        match *self {
            Self::FromTo(start, end) if start < length => Ok(HttpRange {
                start,
                end: end.min(last),
            }),
            Self::From(start) if start < length => Ok(HttpRange { start, end: last }),
            Self::Suffix(suffix) if suffix > 0 => Ok(HttpRange {
                start: length.saturating_sub(suffix),
                end: last,
            }),
            _ => Err(not_satisfiable),
        }
    }

    /// Formats a list of units back into a `Range` header value.
    ///
    /// ```rust
    /// use http_wire::RangeSpec;
    ///
    /// let header = RangeSpec::to_header(&[RangeSpec::FromTo(0, 99), RangeSpec::Suffix(5)]);
    /// assert_eq!(header, "bytes=0-99,-5");
    /// ```
    pub fn to_header(specs: &[RangeSpec]) -> String {
        let mut header = String::from("bytes=");
        for (index, spec) in specs.iter().enumerate() {
            if index > 0 {
                header.push(',');
            }
            header.push_str(&alloc::format!("{spec}"));
        }
        header
    }
}

fn parse_position(value: &str) -> Result<u64, HeaderError> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(HeaderError::malformed(
            "Range",
            alloc::format!("invalid position {value:?}"),
        ));
    }
    value
        .parse()
        .map_err(|_| HeaderError::malformed("Range", "position out of range"))
}

impl FromStr for RangeSpec {
    type Err = HeaderError;

    fn from_str(unit: &str) -> Result<Self, Self::Err> {
        let (first, last) = unit.split_once('-').ok_or_else(|| {
            HeaderError::malformed("Range", alloc::format!("missing '-' in {unit:?}"))
        })?;
        let (first, last) = (first.trim(), last.trim());

        if first.is_empty() {
            return parse_position(last).map(Self::Suffix);
        }
        let start = parse_position(first)?;
        if last.is_empty() {
            return Ok(Self::From(start));
        }
        let end = parse_position(last)?;
        if end < start {
            return Err(HeaderError::malformed(
                "Range",
                alloc::format!("end {end} is before start {start}"),
            ));
        }
        Ok(Self::FromTo(start, end))
    }
}

impl fmt::Display for RangeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FromTo(start, end) => write!(f, "{start}-{end}"),
            Self::From(start) => write!(f, "{start}-"),
            Self::Suffix(length) => write!(f, "-{length}"),
        }
    }
}

/// A resolved, inclusive byte range with `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HttpRange {
    start: u64,
    end: u64,
}

impl HttpRange {
    /// Creates a range, checking `start <= end`.
    pub fn new(start: u64, end: u64) -> Result<Self, HeaderError> {
        if start > end {
            return Err(HeaderError::malformed(
                "Range",
                alloc::format!("end {end} is before start {start}"),
            ));
        }
        Ok(Self { start, end })
    }

    /// First byte position.
    pub fn start(&self) -> u64 {
        self.start
    }

    /// Last byte position, inclusive.
    pub fn end(&self) -> u64 {
        self.end
    }

    /// Number of bytes covered, saturating at `u64::MAX` for the full
    /// `0-18446744073709551615` range.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> u64 {
        (self.end - self.start).saturating_add(1)
    }

    /// The half-open `start..end + 1` range, handy for slicing bodies.
    pub fn as_range(&self) -> core::ops::Range<u64> {
        self.start..self.end.saturating_add(1)
    }

    /// The `Content-Range` describing this range of a `total`-byte representation.
    pub fn content_range(&self, total: u64) -> ContentRange {
        ContentRange::Bytes {
            range: *self,
            total: Some(total),
        }
    }

    /// Parses a `Range` header and resolves it against `length`, with the
    /// default [`RangeConfig`].
    ///
    /// # Examples
    ///
    /// ```rust
    /// use http_wire::HttpRange;
    ///
    /// let ranges = HttpRange::parse("bytes=-500", 1000).unwrap();
    /// assert_eq!((ranges[0].start(), ranges[0].end()), (500, 999));
    ///
    /// let clamped = HttpRange::parse("bytes=990-2000", 1000).unwrap();
    /// assert_eq!(clamped[0].end(), 999);
    /// ```
    pub fn parse(header: &str, length: u64) -> Result<Vec<HttpRange>, HeaderError> {
        Self::parse_with(header, length, &RangeConfig::default())
    }

    /// Parses a `Range` header and resolves it against `length`.
    pub fn parse_with(
        header: &str,
        length: u64,
        config: &RangeConfig,
    ) -> Result<Vec<HttpRange>, HeaderError> {
        RangeSpec::parse_header_with(header, config)?
            .iter()
            .map(|spec| spec.resolve(length))
            .collect()
    }

    /// Sorts ranges by start and collapses overlapping or adjacent ones.
    ///
    /// The output is sorted ascending and no two ranges overlap or touch.
    pub fn merge(ranges: impl IntoIterator<Item = HttpRange>) -> Vec<HttpRange> {
        let mut ranges: Vec<HttpRange> = ranges.into_iter().collect();
        ranges.sort_unstable();

        let mut merged: Vec<HttpRange> = Vec::with_capacity(ranges.len());
        for current in ranges {
            match merged.last_mut() {
                Some(last) if current.start <= last.end.saturating_add(1) => {
                    last.end = last.end.max(current.end);
                }
                _ => merged.push(current),
            }
        }
        merged
    }
}

impl fmt::Display for HttpRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// A `Content-Range` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentRange {
    /// `bytes first-last/total`, or `bytes first-last/*` when the total is unknown.
    Bytes {
        /// The range being sent.
        range: HttpRange,
        /// Length of the complete representation, if known.
        total: Option<u64>,
    },
    /// `bytes */total`, sent with `416 Range Not Satisfiable`.
    Unsatisfied {
        /// Length of the complete representation.
        total: u64,
    },
}

impl ContentRange {
    /// Parses a `Content-Range` header value.
    ///
    /// ```rust
    /// use http_wire::{ContentRange, HttpRange};
    ///
    /// let parsed = ContentRange::parse("bytes 0-499/1234").unwrap();
    /// assert_eq!(parsed, HttpRange::new(0, 499).unwrap().content_range(1234));
    /// assert_eq!(ContentRange::parse("bytes */1234").unwrap(), ContentRange::Unsatisfied { total: 1234 });
    /// ```
    pub fn parse(value: &str) -> Result<Self, HeaderError> {
        let invalid = |reason: &str| HeaderError::malformed("Content-Range", reason);

        let rest = value
            .trim()
            .strip_prefix(BYTES_UNIT)
            .and_then(|rest| rest.strip_prefix(' '))
            .ok_or_else(|| invalid("range unit must be 'bytes'"))?;
        let (range, total) = rest
            .trim_start()
            .split_once('/')
            .ok_or_else(|| invalid("missing '/'"))?;

        let position = |value: &str| {
            parse_position(value.trim()).map_err(|_| invalid("invalid position"))
        };

        if range.trim() == "*" {
            return Ok(Self::Unsatisfied {
                total: position(total)?,
            });
        }
        let total = match total.trim() {
            "*" => None,
            total => Some(position(total)?),
        };
        let (start, end) = range.split_once('-').ok_or_else(|| invalid("missing '-'"))?;
        let range = HttpRange::new(position(start)?, position(end)?)
            .map_err(|_| invalid("end is before start"))?;
        if total.is_some_and(|total| range.end >= total) {
            return Err(invalid("range ends beyond the complete length"));
        }
        Ok(Self::Bytes { range, total })
    }
}

impl fmt::Display for ContentRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bytes {
                range,
                total: Some(total),
            } => write!(f, "bytes {range}/{total}"),
            Self::Bytes { range, total: None } => write!(f, "bytes {range}/*"),
            Self::Unsatisfied { total } => write!(f, "bytes */{total}"),
        }
    }
}

impl FromStr for ContentRange {
    type Err = HeaderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
