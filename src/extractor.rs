//! Fixed-width field extraction for MPC 80-column records
//!
//! Decodes the designation, observation time, sky position, magnitude and
//! observatory code of a record by byte offset. Fields are decoded on demand
//! through [`ObservationLine`], so the filter engine only pays for the
//! fields its active filters reach. [`extract`] performs the full decode in
//! one pass.
//!
//! Two kinds of failure are distinguished:
//! - a malformed timestamp, or malformed magnitude text behind a valid
//!   decimal-point sentinel, is a [`ParseError`]
//! - an unparseable coordinate or a missing magnitude/obscode is reported as
//!   an absent field (`None`)

use crate::constants::{
    HOURS_PER_CIRCLE, MAGNITUDE_SENTINEL_INDEX, MAX_ABS_DECLINATION, RECORD_WIDTH,
    SEXAGESIMAL_BASE, columns,
};
use crate::error::ParseError;
use crate::models::{Mjd, SkyPosition};
use std::borrow::Cow;
use std::ops::Range;

/// Access to the decoded fields of one observation record
///
/// Implemented by the lazy [`ObservationLine`] view and by the eagerly
/// decoded [`ExtractedFields`].
pub trait FieldSource {
    /// Observation time; always required
    fn timestamp(&self) -> Result<Mjd, ParseError>;

    /// Sky position, `None` when the coordinate text cannot be decoded
    fn sky_position(&self) -> Option<SkyPosition>;

    /// Designation with surrounding whitespace removed
    fn designation(&self) -> Cow<'_, str>;

    /// Observatory code, `None` for records shorter than 80 columns
    fn obscode(&self) -> Option<Cow<'_, str>>;

    /// Magnitude, `None` when column 68 does not hold a decimal point
    fn magnitude(&self) -> Result<Option<f64>, ParseError>;
}

/// Borrowed view of one raw record
///
/// A trailing `\n` or `\r\n` is not part of the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObservationLine<'a> {
    bytes: &'a [u8],
}

impl<'a> ObservationLine<'a> {
    pub fn new(raw: &'a [u8]) -> Self {
        let bytes = raw.strip_suffix(b"\n").unwrap_or(raw);
        let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
        Self { bytes }
    }

    pub fn from_str(raw: &'a str) -> Self {
        Self::new(raw.as_bytes())
    }

    /// Record bytes without the line terminator
    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Whether the record spans all 80 columns
    pub fn is_full_width(&self) -> bool {
        self.bytes.len() >= RECORD_WIDTH
    }

    /// Decode every field at once
    pub fn extract(&self) -> Result<ExtractedFields, ParseError> {
        Ok(ExtractedFields {
            designation: FieldSource::designation(self).into_owned(),
            time: self.timestamp()?,
            position: self.sky_position(),
            magnitude: self.magnitude()?,
            obscode: FieldSource::obscode(self).map(Cow::into_owned),
        })
    }

    fn field(&self, range: Range<usize>) -> Option<&'a [u8]> {
        self.bytes.get(range)
    }

    /// Slice that stops at the end of the record instead of failing
    fn field_clamped(&self, range: Range<usize>) -> &'a [u8] {
        let end = range.end.min(self.bytes.len());
        let start = range.start.min(end);
        &self.bytes[start..end]
    }

    fn date_text(&self) -> String {
        let range = columns::YEAR.start..columns::DAY_FRACTION.end;
        String::from_utf8_lossy(self.field_clamped(range)).into_owned()
    }

    fn digits<T: std::str::FromStr>(&self, range: Range<usize>, name: &str) -> Result<T, ParseError> {
        let reason = || format!("{name} is not a {}-digit number", range.len());
        let raw = self
            .field(range.clone())
            .ok_or_else(|| ParseError::timestamp(self.date_text(), "record too short"))?;
        if !raw.iter().all(u8::is_ascii_digit) {
            return Err(ParseError::timestamp(self.date_text(), reason()));
        }
        std::str::from_utf8(raw)
            .ok()
            .and_then(|text| text.parse::<T>().ok())
            .ok_or_else(|| ParseError::timestamp(self.date_text(), reason()))
    }
}

impl FieldSource for ObservationLine<'_> {
    fn timestamp(&self) -> Result<Mjd, ParseError> {
        let year: i32 = self.digits(columns::YEAR, "year")?;
        let month: u32 = self.digits(columns::MONTH, "month")?;
        let day: u32 = self.digits(columns::DAY, "day")?;

        let midnight = Mjd::from_calendar_date(year, month, day).ok_or_else(|| {
            ParseError::timestamp(
                self.date_text(),
                format!("{year:04}-{month:02}-{day:02} is not a calendar date"),
            )
        })?;

        let fraction = self
            .field(columns::DAY_FRACTION)
            .and_then(|raw| std::str::from_utf8(raw).ok())
            .and_then(|text| text.trim().parse::<f64>().ok())
            .filter(|value| value.is_finite())
            .ok_or_else(|| ParseError::timestamp(self.date_text(), "day fraction is not a number"))?;

        Ok(midnight.add_days(fraction))
    }

    fn sky_position(&self) -> Option<SkyPosition> {
        let ra_text = std::str::from_utf8(self.field(columns::RIGHT_ASCENSION)?).ok()?;
        let dec_text = std::str::from_utf8(self.field(columns::DECLINATION)?).ok()?;

        let ra_hours = parse_sexagesimal(ra_text)?.rem_euclid(HOURS_PER_CIRCLE);
        let dec_degrees = parse_sexagesimal(dec_text)?;
        if dec_degrees.abs() > MAX_ABS_DECLINATION {
            return None;
        }

        Some(SkyPosition::new(ra_hours, dec_degrees))
    }

    fn designation(&self) -> Cow<'_, str> {
        decode_latin1(self.field_clamped(columns::DESIGNATION).trim_ascii())
    }

    fn obscode(&self) -> Option<Cow<'_, str>> {
        if !self.is_full_width() {
            return None;
        }
        self.field(columns::OBSCODE).map(decode_latin1)
    }

    fn magnitude(&self) -> Result<Option<f64>, ParseError> {
        if self.bytes.get(MAGNITUDE_SENTINEL_INDEX) != Some(&b'.') {
            return Ok(None);
        }

        let raw = self.field_clamped(columns::MAGNITUDE);
        std::str::from_utf8(raw)
            .ok()
            .and_then(|text| text.trim().parse::<f64>().ok())
            .filter(|value| value.is_finite())
            .map(Some)
            .ok_or_else(|| ParseError::MalformedMagnitude {
                text: String::from_utf8_lossy(raw).into_owned(),
            })
    }
}

/// Every field of a record, decoded up front
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedFields {
    pub designation: String,
    pub time: Mjd,
    pub position: Option<SkyPosition>,
    pub magnitude: Option<f64>,
    pub obscode: Option<String>,
}

impl FieldSource for ExtractedFields {
    fn timestamp(&self) -> Result<Mjd, ParseError> {
        Ok(self.time)
    }

    fn sky_position(&self) -> Option<SkyPosition> {
        self.position
    }

    fn designation(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.designation)
    }

    fn obscode(&self) -> Option<Cow<'_, str>> {
        self.obscode.as_deref().map(Cow::Borrowed)
    }

    fn magnitude(&self) -> Result<Option<f64>, ParseError> {
        Ok(self.magnitude)
    }
}

/// Decode every field of a raw record
pub fn extract(line: &str) -> Result<ExtractedFields, ParseError> {
    ObservationLine::from_str(line).extract()
}

/// Parse "[+-]A [B [C]]" into A + B/60 + C/3600 with the sign applied to the total
///
/// Minutes and seconds must lie in [0, 60).
pub fn parse_sexagesimal(text: &str) -> Option<f64> {
    let mut parts = text.split_whitespace();

    let first = parts.next()?;
    let (negative, first) = match first.as_bytes().first()? {
        b'-' => (true, &first[1..]),
        b'+' => (false, &first[1..]),
        _ => (false, first),
    };
    let mut total = parse_unsigned_decimal(first)?;

    let mut scale = 1.0;
    for part in parts.by_ref().take(2) {
        let value = parse_unsigned_decimal(part)?;
        if value >= SEXAGESIMAL_BASE {
            return None;
        }
        scale *= SEXAGESIMAL_BASE;
        total += value / scale;
    }

    if parts.next().is_some() {
        return None;
    }

    Some(if negative { -total } else { total })
}

fn parse_unsigned_decimal(text: &str) -> Option<f64> {
    let valid = !text.is_empty()
        && text.bytes().any(|b| b.is_ascii_digit())
        && text.bytes().all(|b| b.is_ascii_digit() || b == b'.')
        && text.bytes().filter(|&b| b == b'.').count() <= 1;
    if !valid {
        return None;
    }
    text.parse::<f64>().ok()
}

/// One byte per character; plain ASCII is borrowed as-is
fn decode_latin1(bytes: &[u8]) -> Cow<'_, str> {
    match std::str::from_utf8(bytes) {
        Ok(text) if bytes.is_ascii() => Cow::Borrowed(text),
        _ => Cow::Owned(bytes.iter().map(|&b| char::from(b)).collect()),
    }
}
