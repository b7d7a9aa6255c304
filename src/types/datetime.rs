//! The six date/time column types and their codecs.
//!
//! | Type        | OID  | Binary size | Precision | Minimum                   | Maximum                        |
//! |-------------|------|-------------|-----------|---------------------------|--------------------------------|
//! | date        | 1082 | 4 bytes     | 1 day     | 4713-01-01 BC             | 5874897-12-31                  |
//! | time        | 1083 | 8 bytes     | 1 µs      | 00:00:00                  | 24:00:00                       |
//! | timetz      | 1266 | 12 bytes    | 1 µs      | 00:00:00-15:59            | 24:00:00+15:59                 |
//! | timestamp   | 1114 | 8 bytes     | 1 µs      | 4713-01-01 00:00:00 BC    | 294276-12-31 23:59:59.999999   |
//! | timestamptz | 1184 | 8 bytes     | 1 µs      | 4713-01-01 00:00:00+00 BC | 294276-12-31 23:59:59.999999+00|
//! | interval    | 1186 | 16 bytes    | 1 µs      | -178000000 years          | 178000000 years                |
//!
//! Binary date and timestamp encodings count from the PostgreSQL
//! epoch, 2000-01-01. Text parsing follows the server's ISO DateStyle
//! output; `infinity` and `-infinity` map to the extreme values of the
//! target type.
use time::{Date, Duration, Month, OffsetDateTime, PrimitiveDateTime, UtcOffset, macros::date};

use crate::{
    error::{ClientError, Result},
    postgres::{FieldDescription, PgFormat, oid},
    types::{FieldDecode, expect_value, load_i32, load_i64, scan},
};

const PG_EPOCH: Date = date!(2000 - 01 - 01);

/// A `date` column value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PgDate(pub Date);

/// A `time` column value: time of day as microseconds since midnight.
///
/// Not a [`time::Time`] because the protocol admits `24:00:00`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PgTime(pub Duration);

/// A `timetz` column value: time of day plus a fixed UTC offset,
/// east-positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PgTimeTz {
    pub time: Duration,
    pub utc_offset: UtcOffset,
}

/// A `timestamp` column value: a civil date-time with no zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PgTimestamp(pub PrimitiveDateTime);

/// A `timestamptz` column value, normalized to UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PgTimestampTz(pub OffsetDateTime);

/// An `interval` column value.
///
/// The three components never mix: a month is not a fixed number of
/// days and a day is not a fixed number of microseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PgInterval {
    pub months: i32,
    pub days: i32,
    pub microseconds: i64,
}

impl Default for PgDate {
    fn default() -> Self {
        Self(PG_EPOCH)
    }
}

impl Default for PgTime {
    fn default() -> Self {
        Self(Duration::ZERO)
    }
}

impl Default for PgTimeTz {
    fn default() -> Self {
        Self { time: Duration::ZERO, utc_offset: UtcOffset::UTC }
    }
}

impl Default for PgTimestamp {
    fn default() -> Self {
        Self(PG_EPOCH.midnight())
    }
}

impl Default for PgTimestampTz {
    fn default() -> Self {
        Self(PG_EPOCH.midnight().assume_utc())
    }
}

// ===== shared text machinery =====

fn as_text(data: &[u8]) -> Result<&str> {
    std::str::from_utf8(data).map_err(|_| ClientError::ProtocolValue)
}

/// `infinity` / `-infinity`, case-insensitive. Returns the sign.
fn infinity(s: &str) -> Option<bool> {
    let s = scan::trim(s);
    if s.eq_ignore_ascii_case("infinity") {
        Some(false)
    } else if s.eq_ignore_ascii_case("-infinity") {
        Some(true)
    } else {
        None
    }
}

/// Strips a trailing ` BC` suffix, case-insensitive.
fn consume_bc(s: &str) -> (bool, &str) {
    let s = scan::trim(s);
    if s.len() >= 2 && s[s.len() - 2..].eq_ignore_ascii_case("BC") {
        (true, scan::trim(&s[..s.len() - 2]))
    } else {
        (false, s)
    }
}

/// `YYYY-MM-DD`, the whole input.
fn parse_date_parts(s: &str) -> Result<(i64, i64, i64)> {
    let mut cur = scan::Cursor::new(scan::trim(s));
    let year = cur.signed()?;
    cur.expect(b'-')?;
    let (month, _) = cur.digits()?;
    cur.expect(b'-')?;
    let (day, _) = cur.digits()?;
    if !cur.at_end() {
        return Err(ClientError::ProtocolValue);
    }
    Ok((year, month, day))
}

fn build_date(year: i64, month: i64, day: i64, bc: bool) -> Result<Date> {
    // the BC convention has no year zero: 1 BC is year 0
    let year = if bc { 1 - year } else { year };
    let year = i32::try_from(year).map_err(|_| ClientError::ProtocolValue)?;
    let month = u8::try_from(month)
        .ok()
        .and_then(|m| Month::try_from(m).ok())
        .ok_or(ClientError::ProtocolValue)?;
    let day = u8::try_from(day).map_err(|_| ClientError::ProtocolValue)?;
    Date::from_calendar_date(year, month, day).map_err(|_| ClientError::ProtocolValue)
}

/// `HH:MM:SS[.ffffff]`, consumed from the cursor.
///
/// 24-hour clock, fractions are scaled to microseconds: fewer than six
/// digits pad with zeros, more than six truncate. A bare `.` with no
/// digit after it is rejected.
fn parse_time_prefix(cur: &mut scan::Cursor<'_>) -> Result<i64> {
    let (hours, _) = cur.digits()?;
    cur.expect(b':')?;
    let (minutes, _) = cur.digits()?;
    cur.expect(b':')?;
    let (seconds, _) = cur.digits()?;

    let mut micros = 0i64;
    if cur.peek() == Some(b'.') {
        cur.bump();
        let mut digits = 0usize;
        while let Some(b @ b'0'..=b'9') = cur.peek() {
            if digits < 6 {
                micros = micros * 10 + (b - b'0') as i64;
            }
            digits += 1;
            cur.bump();
        }
        if digits == 0 {
            return Err(ClientError::ProtocolValue);
        }
        while digits < 6 {
            micros *= 10;
            digits += 1;
        }
    }

    if minutes > 59 || seconds > 59 {
        return Err(ClientError::ProtocolValue);
    }
    if hours > 24 {
        return Err(ClientError::ProtocolValue);
    }
    if hours == 24 && (minutes != 0 || seconds != 0 || micros != 0) {
        return Err(ClientError::ProtocolValue);
    }

    Ok(((hours * 60 + minutes) * 60 + seconds) * 1_000_000 + micros)
}

/// Timezone suffix after a time-of-day, east-positive seconds.
///
/// Grammar: empty, `Z`/`UTC`/`UT`/`GMT`, or sign + `HH`, optionally
/// followed by `:MM` or `MM` (four-digit form). Hours up to 15,
/// matching the server's timetz range.
fn parse_tz_suffix(s: &str) -> Result<i32> {
    let s = scan::trim(s);
    if s.is_empty() {
        return Ok(0);
    }
    for zone in ["Z", "UTC", "UT", "GMT"] {
        if s.eq_ignore_ascii_case(zone) {
            return Ok(0);
        }
    }

    let bytes = s.as_bytes();
    let sign = match bytes[0] {
        b'+' => 1,
        b'-' => -1,
        _ => return Err(ClientError::ProtocolValue),
    };

    let mut pos = 1;
    let mut hours = 0i32;
    let mut digits = 0;
    while pos < bytes.len() && bytes[pos].is_ascii_digit() && digits < 2 {
        hours = hours * 10 + (bytes[pos] - b'0') as i32;
        pos += 1;
        digits += 1;
    }
    if digits == 0 {
        return Err(ClientError::ProtocolValue);
    }

    let minutes = if pos == bytes.len() {
        0
    } else if bytes[pos] == b':' || bytes[pos].is_ascii_digit() {
        if bytes[pos] == b':' {
            pos += 1;
        }
        if bytes.len() - pos != 2
            || !bytes[pos].is_ascii_digit()
            || !bytes[pos + 1].is_ascii_digit()
        {
            return Err(ClientError::ProtocolValue);
        }
        let m = ((bytes[pos] - b'0') * 10 + (bytes[pos + 1] - b'0')) as i32;
        pos += 2;
        m
    } else {
        return Err(ClientError::ProtocolValue);
    };

    if pos != bytes.len() {
        return Err(ClientError::ProtocolValue);
    }
    if hours > 15 || minutes > 59 {
        return Err(ClientError::ProtocolValue);
    }
    Ok(sign * (hours * 3600 + minutes * 60))
}

/// Splits `date<sep>time` at the first `' '` or `'T'`.
fn split_timestamp(s: &str) -> Result<(&str, &str)> {
    let sep = s
        .find(|c| c == ' ' || c == 'T')
        .ok_or(ClientError::ProtocolValue)?;
    Ok((&s[..sep], scan::trim(&s[sep + 1..])))
}

fn check_len(data: &[u8], len: usize) -> Result<()> {
    if data.len() != len {
        return Err(ClientError::ProtocolValue);
    }
    Ok(())
}

fn single_oid(descr: &FieldDescription, expected: u32) -> Result<()> {
    if descr.type_oid != expected {
        return Err(ClientError::IncompatibleFieldType);
    }
    Ok(())
}

// ===== date =====

fn text_date(data: &[u8]) -> Result<Date> {
    let s = as_text(data)?;
    if let Some(negative) = infinity(s) {
        return Ok(if negative { Date::MIN } else { Date::MAX });
    }
    let (bc, s) = consume_bc(s);
    let (year, month, day) = parse_date_parts(s)?;
    build_date(year, month, day, bc)
}

fn binary_date(data: &[u8]) -> Result<Date> {
    check_len(data, 4)?;
    let days_since_2000 = load_i32(data)?;
    let julian = PG_EPOCH.to_julian_day() as i64 + days_since_2000 as i64;
    let julian = i32::try_from(julian).map_err(|_| ClientError::ProtocolValue)?;
    Date::from_julian_day(julian).map_err(|_| ClientError::ProtocolValue)
}

impl FieldDecode for PgDate {
    fn is_compatible(descr: &FieldDescription) -> Result<()> {
        single_oid(descr, oid::DATE)
    }

    fn decode(value: Option<&[u8]>, descr: &FieldDescription) -> Result<Self> {
        let data = expect_value(value)?;
        match descr.format {
            PgFormat::Text => text_date(data).map(Self),
            PgFormat::Binary => binary_date(data).map(Self),
        }
    }
}

// ===== time =====

fn text_time(data: &[u8]) -> Result<Duration> {
    let s = scan::trim(as_text(data)?);
    let mut cur = scan::Cursor::new(s);
    let micros = parse_time_prefix(&mut cur)?;
    if !scan::trim(cur.rest()).is_empty() {
        return Err(ClientError::ProtocolValue);
    }
    Ok(Duration::microseconds(micros))
}

fn binary_time(data: &[u8]) -> Result<Duration> {
    check_len(data, 8)?;
    Ok(Duration::microseconds(load_i64(data)?))
}

impl FieldDecode for PgTime {
    fn is_compatible(descr: &FieldDescription) -> Result<()> {
        single_oid(descr, oid::TIME)
    }

    fn decode(value: Option<&[u8]>, descr: &FieldDescription) -> Result<Self> {
        let data = expect_value(value)?;
        match descr.format {
            PgFormat::Text => text_time(data).map(Self),
            PgFormat::Binary => binary_time(data).map(Self),
        }
    }
}

// ===== timetz =====

fn east_offset(seconds: i32) -> Result<UtcOffset> {
    UtcOffset::from_whole_seconds(seconds).map_err(|_| ClientError::ProtocolValue)
}

fn text_timetz(data: &[u8]) -> Result<PgTimeTz> {
    let s = scan::trim(as_text(data)?);
    let mut cur = scan::Cursor::new(s);
    let micros = parse_time_prefix(&mut cur)?;
    let offset = parse_tz_suffix(cur.rest())?;
    Ok(PgTimeTz {
        time: Duration::microseconds(micros),
        utc_offset: east_offset(offset)?,
    })
}

fn binary_timetz(data: &[u8]) -> Result<PgTimeTz> {
    check_len(data, 12)?;
    let micros = load_i64(&data[..8])?;
    // stored as seconds west of UTC; we keep the east-positive convention
    let west = load_i32(&data[8..])?;
    let east = west.checked_neg().ok_or(ClientError::ProtocolValue)?;
    Ok(PgTimeTz {
        time: Duration::microseconds(micros),
        utc_offset: east_offset(east)?,
    })
}

impl FieldDecode for PgTimeTz {
    fn is_compatible(descr: &FieldDescription) -> Result<()> {
        single_oid(descr, oid::TIMETZ)
    }

    fn decode(value: Option<&[u8]>, descr: &FieldDescription) -> Result<Self> {
        let data = expect_value(value)?;
        match descr.format {
            PgFormat::Text => text_timetz(data),
            PgFormat::Binary => binary_timetz(data),
        }
    }
}

// ===== timestamp =====

/// Parses the `date<sep>time` prefix shared by timestamp and
/// timestamptz; returns the civil date-time and the unparsed suffix.
fn parse_local_prefix(s: &str) -> Result<(PrimitiveDateTime, &str)> {
    let (bc, s) = consume_bc(s);
    let (date_part, time_part) = split_timestamp(s)?;
    let (year, month, day) = parse_date_parts(date_part)?;
    let date = build_date(year, month, day, bc)?;

    let mut cur = scan::Cursor::new(time_part);
    let micros = parse_time_prefix(&mut cur)?;
    let local = date
        .midnight()
        .checked_add(Duration::microseconds(micros))
        .ok_or(ClientError::ProtocolValue)?;
    Ok((local, cur.rest()))
}

fn text_timestamp(data: &[u8]) -> Result<PrimitiveDateTime> {
    let s = as_text(data)?;
    if let Some(negative) = infinity(s) {
        return Ok(if negative { PrimitiveDateTime::MIN } else { PrimitiveDateTime::MAX });
    }
    let (local, rest) = parse_local_prefix(s)?;
    if !scan::trim(rest).is_empty() {
        return Err(ClientError::ProtocolValue);
    }
    Ok(local)
}

fn binary_timestamp(data: &[u8]) -> Result<PrimitiveDateTime> {
    check_len(data, 8)?;
    let micros = load_i64(data)?;
    PG_EPOCH
        .midnight()
        .checked_add(Duration::microseconds(micros))
        .ok_or(ClientError::ProtocolValue)
}

impl FieldDecode for PgTimestamp {
    fn is_compatible(descr: &FieldDescription) -> Result<()> {
        single_oid(descr, oid::TIMESTAMP)
    }

    fn decode(value: Option<&[u8]>, descr: &FieldDescription) -> Result<Self> {
        let data = expect_value(value)?;
        match descr.format {
            PgFormat::Text => text_timestamp(data).map(Self),
            PgFormat::Binary => binary_timestamp(data).map(Self),
        }
    }
}

// ===== timestamptz =====

fn text_timestamptz(data: &[u8]) -> Result<OffsetDateTime> {
    let s = as_text(data)?;
    if let Some(negative) = infinity(s) {
        let local = if negative { PrimitiveDateTime::MIN } else { PrimitiveDateTime::MAX };
        return Ok(local.assume_utc());
    }
    let (local, rest) = parse_local_prefix(s)?;
    let offset = parse_tz_suffix(rest)?;
    // the stored value is UTC: local time minus the displayed offset
    let utc = local
        .checked_sub(Duration::seconds(offset as i64))
        .ok_or(ClientError::ProtocolValue)?;
    Ok(utc.assume_utc())
}

fn binary_timestamptz(data: &[u8]) -> Result<OffsetDateTime> {
    // same layout as timestamp; the value is already UTC
    Ok(binary_timestamp(data)?.assume_utc())
}

impl FieldDecode for PgTimestampTz {
    fn is_compatible(descr: &FieldDescription) -> Result<()> {
        single_oid(descr, oid::TIMESTAMPTZ)
    }

    fn decode(value: Option<&[u8]>, descr: &FieldDescription) -> Result<Self> {
        let data = expect_value(value)?;
        match descr.format {
            PgFormat::Text => text_timestamptz(data).map(Self),
            PgFormat::Binary => binary_timestamptz(data).map(Self),
        }
    }
}

// ===== interval =====

fn add_i32(acc: i32, add: i64) -> Result<i32> {
    let sum = (acc as i64).checked_add(add).ok_or(ClientError::ProtocolValue)?;
    i32::try_from(sum).map_err(|_| ClientError::ProtocolValue)
}

fn add_i64(acc: i64, add: i64) -> Result<i64> {
    acc.checked_add(add).ok_or(ClientError::ProtocolValue)
}

fn mul(value: i64, factor: i64) -> Result<i64> {
    value.checked_mul(factor).ok_or(ClientError::ProtocolValue)
}

fn text_interval(data: &[u8]) -> Result<PgInterval> {
    if data.is_empty() {
        return Err(ClientError::ProtocolValue);
    }
    let s = as_text(data)?;
    let mut out = PgInterval::default();
    let mut cur = scan::Cursor::new(s);

    loop {
        cur.skip_ws();
        if cur.at_end() {
            break;
        }

        let rest = cur.rest();
        let token_len = rest
            .find(|c: char| c.is_ascii_whitespace())
            .unwrap_or(rest.len());
        let token = &rest[..token_len];

        if token.contains(':') {
            // a time-of-day part, optionally signed
            let mut tcur = scan::Cursor::new(token);
            let sign = match tcur.peek() {
                Some(b'-') => {
                    tcur.bump();
                    -1
                }
                Some(b'+') => {
                    tcur.bump();
                    1
                }
                _ => 1,
            };
            let micros = parse_time_prefix(&mut tcur)?;
            if !tcur.at_end() {
                return Err(ClientError::ProtocolValue);
            }
            out.microseconds = add_i64(out.microseconds, sign * micros)?;
            cur.advance(token_len);
        } else {
            // `<value> <unit>`
            let value = cur.signed()?;
            cur.skip_ws();
            let unit_rest = cur.rest();
            let unit_len = unit_rest
                .find(|c: char| !c.is_ascii_alphabetic())
                .unwrap_or(unit_rest.len());
            let unit = &unit_rest[..unit_len];
            cur.advance(unit_len);

            match unit {
                "year" | "years" => out.months = add_i32(out.months, mul(value, 12)?)?,
                "mon" | "mons" => out.months = add_i32(out.months, value)?,
                "day" | "days" => out.days = add_i32(out.days, value)?,
                "hour" | "hours" => {
                    out.microseconds = add_i64(out.microseconds, mul(value, 3_600_000_000)?)?
                }
                "minute" | "minutes" => {
                    out.microseconds = add_i64(out.microseconds, mul(value, 60_000_000)?)?
                }
                "second" | "seconds" => {
                    out.microseconds = add_i64(out.microseconds, mul(value, 1_000_000)?)?
                }
                _ => return Err(ClientError::ProtocolValue),
            }
        }
    }

    Ok(out)
}

fn binary_interval(data: &[u8]) -> Result<PgInterval> {
    check_len(data, 16)?;
    Ok(PgInterval {
        microseconds: load_i64(&data[..8])?,
        days: load_i32(&data[8..12])?,
        months: load_i32(&data[12..16])?,
    })
}

impl FieldDecode for PgInterval {
    fn is_compatible(descr: &FieldDescription) -> Result<()> {
        single_oid(descr, oid::INTERVAL)
    }

    fn decode(value: Option<&[u8]>, descr: &FieldDescription) -> Result<Self> {
        let data = expect_value(value)?;
        match descr.format {
            PgFormat::Text => text_interval(data),
            PgFormat::Binary => binary_interval(data),
        }
    }
}

#[cfg(test)]
mod test {
    use time::macros::datetime;

    use super::*;
    use crate::types::descr;

    fn text<T: FieldDecode>(type_oid: u32, input: &str) -> Result<T> {
        T::decode(Some(input.as_bytes()), &descr(type_oid, PgFormat::Text))
    }

    fn binary<T: FieldDecode>(type_oid: u32, input: &[u8]) -> Result<T> {
        T::decode(Some(input), &descr(type_oid, PgFormat::Binary))
    }

    // ===== date =====

    #[test]
    fn text_date_civil_day() {
        assert_eq!(
            text::<PgDate>(oid::DATE, "1977-06-21").unwrap(),
            PgDate(date!(1977 - 06 - 21)),
        );
    }

    #[test]
    fn binary_date_days_since_epoch() {
        // -8229 days before 2000-01-01
        assert_eq!(
            binary::<PgDate>(oid::DATE, &[0xFF, 0xFF, 0xDF, 0xDB]).unwrap(),
            PgDate(date!(1977 - 06 - 21)),
        );
        assert_eq!(
            binary::<PgDate>(oid::DATE, &[0, 0, 0, 0]).unwrap(),
            PgDate(date!(2000 - 01 - 01)),
        );
    }

    #[test]
    fn text_date_bc_and_infinity() {
        assert_eq!(
            text::<PgDate>(oid::DATE, "0045-03-15 BC").unwrap(),
            PgDate(Date::from_calendar_date(-44, Month::March, 15).unwrap()),
        );
        assert_eq!(text::<PgDate>(oid::DATE, "infinity").unwrap(), PgDate(Date::MAX));
        assert_eq!(text::<PgDate>(oid::DATE, "-infinity").unwrap(), PgDate(Date::MIN));
    }

    #[test]
    fn text_date_rejects_bad_calendar_days() {
        assert_eq!(text::<PgDate>(oid::DATE, "2021-02-29"), Err(ClientError::ProtocolValue));
        assert_eq!(text::<PgDate>(oid::DATE, "2021-13-01"), Err(ClientError::ProtocolValue));
        assert_eq!(text::<PgDate>(oid::DATE, "2021-02-03x"), Err(ClientError::ProtocolValue));
    }

    #[test]
    fn binary_date_wrong_length() {
        assert_eq!(
            binary::<PgDate>(oid::DATE, &[0, 0, 0]),
            Err(ClientError::ProtocolValue),
        );
    }

    #[test]
    fn date_oid_check() {
        assert_eq!(
            PgDate::is_compatible(&descr(oid::TIME, PgFormat::Text)),
            Err(ClientError::IncompatibleFieldType),
        );
        assert!(PgDate::is_compatible(&descr(oid::DATE, PgFormat::Text)).is_ok());
    }

    // ===== time =====

    #[test]
    fn text_time_basic() {
        assert_eq!(
            text::<PgTime>(oid::TIME, "21:06:19").unwrap(),
            PgTime(Duration::hours(21) + Duration::minutes(6) + Duration::seconds(19)),
        );
    }

    #[test]
    fn binary_time_microseconds() {
        // 76_030_000_000 microseconds = 21:06:19
        assert_eq!(
            binary::<PgTime>(oid::TIME, &[0x00, 0x00, 0x00, 0x11, 0xB0, 0xB3, 0x88, 0xC0])
                .unwrap(),
            PgTime(Duration::microseconds(76_030_000_000)),
        );
    }

    #[test]
    fn text_time_fraction_scaling() {
        // fewer than six digits pad with zeros
        assert_eq!(
            text::<PgTime>(oid::TIME, "00:00:00.5").unwrap(),
            PgTime(Duration::microseconds(500_000)),
        );
        // more than six digits truncate
        assert_eq!(
            text::<PgTime>(oid::TIME, "00:00:00.1234567").unwrap(),
            PgTime(Duration::microseconds(123_456)),
        );
    }

    #[test]
    fn text_time_end_of_day() {
        assert_eq!(
            text::<PgTime>(oid::TIME, "24:00:00").unwrap(),
            PgTime(Duration::hours(24)),
        );
        assert_eq!(text::<PgTime>(oid::TIME, "24:00:01"), Err(ClientError::ProtocolValue));
        assert_eq!(
            text::<PgTime>(oid::TIME, "24:00:00.000001"),
            Err(ClientError::ProtocolValue),
        );
    }

    #[test]
    fn text_time_rejects_malformed_input() {
        assert_eq!(text::<PgTime>(oid::TIME, "12:60:00"), Err(ClientError::ProtocolValue));
        assert_eq!(text::<PgTime>(oid::TIME, "12:00:61"), Err(ClientError::ProtocolValue));
        // a lone dot with no fraction digit
        assert_eq!(text::<PgTime>(oid::TIME, "12:00:00."), Err(ClientError::ProtocolValue));
        assert_eq!(text::<PgTime>(oid::TIME, "12:00:00x"), Err(ClientError::ProtocolValue));
        assert_eq!(text::<PgTime>(oid::TIME, "12:00"), Err(ClientError::ProtocolValue));
        // trailing whitespace is fine
        assert!(text::<PgTime>(oid::TIME, "12:00:00  ").is_ok());
    }

    // ===== timetz =====

    #[test]
    fn text_timetz_offsets() {
        let expected = PgTimeTz {
            time: Duration::hours(21) + Duration::minutes(6) + Duration::seconds(19),
            utc_offset: UtcOffset::from_whole_seconds(7 * 3600).unwrap(),
        };
        assert_eq!(text::<PgTimeTz>(oid::TIMETZ, "21:06:19+07:00").unwrap(), expected);
        assert_eq!(text::<PgTimeTz>(oid::TIMETZ, "21:06:19+0700").unwrap(), expected);
        assert_eq!(text::<PgTimeTz>(oid::TIMETZ, "21:06:19+07").unwrap(), expected);

        let west = text::<PgTimeTz>(oid::TIMETZ, "05:30:00-03:30").unwrap();
        assert_eq!(west.utc_offset.whole_seconds(), -(3 * 3600 + 30 * 60));

        let zulu = text::<PgTimeTz>(oid::TIMETZ, "05:30:00 GMT").unwrap();
        assert_eq!(zulu.utc_offset, UtcOffset::UTC);
    }

    #[test]
    fn text_timetz_rejects_bad_suffixes() {
        assert_eq!(
            text::<PgTimeTz>(oid::TIMETZ, "05:30:00+16"),
            Err(ClientError::ProtocolValue),
        );
        assert_eq!(
            text::<PgTimeTz>(oid::TIMETZ, "05:30:00+07:0"),
            Err(ClientError::ProtocolValue),
        );
        assert_eq!(
            text::<PgTimeTz>(oid::TIMETZ, "05:30:00*"),
            Err(ClientError::ProtocolValue),
        );
    }

    #[test]
    fn binary_timetz_negates_the_west_offset() {
        let data = [
            0x00, 0x00, 0x00, 0x0A, 0x89, 0xE9, 0x36, 0x56, // 12:34:23.435350
            0xFF, 0xFF, 0xB9, 0xB0, // -18000 seconds west = +05:00
        ];
        let tz = binary::<PgTimeTz>(oid::TIMETZ, &data).unwrap();
        assert_eq!(tz.time, Duration::microseconds(45_263_435_350));
        assert_eq!(tz.utc_offset.whole_seconds(), 5 * 3600);
    }

    #[test]
    fn binary_timetz_wrong_length() {
        assert_eq!(
            binary::<PgTimeTz>(oid::TIMETZ, &[0; 8]),
            Err(ClientError::ProtocolValue),
        );
    }

    // ===== timestamp =====

    #[test]
    fn text_timestamp_both_separators() {
        let expected = PgTimestamp(datetime!(1977-06-21 21:06:19));
        assert_eq!(
            text::<PgTimestamp>(oid::TIMESTAMP, "1977-06-21 21:06:19").unwrap(),
            expected,
        );
        assert_eq!(
            text::<PgTimestamp>(oid::TIMESTAMP, "1977-06-21T21:06:19").unwrap(),
            expected,
        );
    }

    #[test]
    fn binary_timestamp_microseconds_since_epoch() {
        let data = [0x00, 0x02, 0xED, 0x4E, 0x02, 0xC9, 0xD6, 0x56];
        assert_eq!(
            binary::<PgTimestamp>(oid::TIMESTAMP, &data).unwrap(),
            PgTimestamp(datetime!(2026-02-08 12:34:23.435350)),
        );
    }

    #[test]
    fn text_timestamp_infinity() {
        assert_eq!(
            text::<PgTimestamp>(oid::TIMESTAMP, "infinity").unwrap(),
            PgTimestamp(PrimitiveDateTime::MAX),
        );
        assert_eq!(
            text::<PgTimestamp>(oid::TIMESTAMP, "-infinity").unwrap(),
            PgTimestamp(PrimitiveDateTime::MIN),
        );
    }

    #[test]
    fn text_timestamp_bc() {
        let ts = text::<PgTimestamp>(oid::TIMESTAMP, "0001-01-01 00:00:00 BC").unwrap();
        assert_eq!(ts.0.year(), 0);
    }

    #[test]
    fn text_timestamp_rejects_trailing_garbage() {
        assert_eq!(
            text::<PgTimestamp>(oid::TIMESTAMP, "1977-06-21 21:06:19junk"),
            Err(ClientError::ProtocolValue),
        );
        assert_eq!(
            text::<PgTimestamp>(oid::TIMESTAMP, "1977-06-21"),
            Err(ClientError::ProtocolValue),
        );
    }

    // ===== timestamptz =====

    #[test]
    fn text_timestamptz_normalizes_to_utc() {
        assert_eq!(
            text::<PgTimestampTz>(oid::TIMESTAMPTZ, "2026-02-08 20:03:00+00:00").unwrap(),
            PgTimestampTz(datetime!(2026-02-08 20:03:00 UTC)),
        );
        // 22:03 at +02:00 is 20:03 UTC
        assert_eq!(
            text::<PgTimestampTz>(oid::TIMESTAMPTZ, "2026-02-08 22:03:00+02").unwrap(),
            PgTimestampTz(datetime!(2026-02-08 20:03:00 UTC)),
        );
    }

    #[test]
    fn binary_timestamptz_is_already_utc() {
        let data = [0x00, 0x02, 0xED, 0x4E, 0x02, 0xC9, 0xD6, 0x56];
        assert_eq!(
            binary::<PgTimestampTz>(oid::TIMESTAMPTZ, &data).unwrap(),
            PgTimestampTz(datetime!(2026-02-08 12:34:23.435350 UTC)),
        );
    }

    #[test]
    fn text_binary_equivalence_for_timestamp() {
        // canonical text and binary renderings of the same instant
        let from_text =
            text::<PgTimestamp>(oid::TIMESTAMP, "2026-02-08 12:34:23.435350").unwrap();
        let from_binary = binary::<PgTimestamp>(
            oid::TIMESTAMP,
            &[0x00, 0x02, 0xED, 0x4E, 0x02, 0xC9, 0xD6, 0x56],
        )
        .unwrap();
        assert_eq!(from_text, from_binary);
    }

    // ===== interval =====

    #[test]
    fn text_interval_full_form() {
        assert_eq!(
            text::<PgInterval>(oid::INTERVAL, "1 year 2 mons 3 days 04:05:06.000007").unwrap(),
            PgInterval {
                months: 14,
                days: 3,
                microseconds: 4 * 3_600_000_000 + 5 * 60_000_000 + 6_000_000 + 7,
            },
        );
    }

    #[test]
    fn text_interval_signed_parts() {
        assert_eq!(
            text::<PgInterval>(oid::INTERVAL, "-1 days -00:00:01").unwrap(),
            PgInterval { months: 0, days: -1, microseconds: -1_000_000 },
        );
        assert_eq!(
            text::<PgInterval>(oid::INTERVAL, "2 hours 30 minutes").unwrap(),
            PgInterval { months: 0, days: 0, microseconds: 9_000_000_000 },
        );
    }

    #[test]
    fn text_interval_unknown_unit() {
        assert_eq!(
            text::<PgInterval>(oid::INTERVAL, "3 fortnights"),
            Err(ClientError::ProtocolValue),
        );
        assert_eq!(text::<PgInterval>(oid::INTERVAL, ""), Err(ClientError::ProtocolValue));
    }

    #[test]
    fn binary_interval_layout() {
        let data = [
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01, // microseconds
            0x00, 0x00, 0x00, 0x01, // days
            0x00, 0x00, 0x00, 0x01, // months
        ];
        assert_eq!(
            binary::<PgInterval>(oid::INTERVAL, &data).unwrap(),
            PgInterval { months: 1, days: 1, microseconds: 1 },
        );
    }

    #[test]
    fn binary_interval_wrong_length() {
        assert_eq!(
            binary::<PgInterval>(oid::INTERVAL, &[0; 12]),
            Err(ClientError::ProtocolValue),
        );
    }

    #[test]
    fn null_is_rejected_everywhere() {
        let d = descr(oid::DATE, PgFormat::Binary);
        assert_eq!(PgDate::decode(None, &d), Err(ClientError::UnexpectedNull));
    }
}
