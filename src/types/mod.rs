//! Per-field decoding of column values.
//!
//! Each supported target type answers two questions: is a column with
//! this metadata admissible at all ([`FieldDecode::is_compatible`]),
//! and how does a payload in the column's wire format turn into a
//! value ([`FieldDecode::decode`]). Compatibility is checked once per
//! result set from the row description; decoding runs per row.
mod datetime;

pub use datetime::{PgDate, PgInterval, PgTime, PgTimeTz, PgTimestamp, PgTimestampTz};

use crate::{
    error::{ClientError, Result},
    postgres::{FieldDescription, PgFormat, oid},
};

/// A type decodable from one database column.
pub trait FieldDecode: Sized {
    /// Checks the column metadata against the admissible OID set.
    fn is_compatible(descr: &FieldDescription) -> Result<()>;

    /// Decodes a column payload; `None` represents SQL NULL.
    ///
    /// Callers must have passed `is_compatible` for the same
    /// description first.
    fn decode(value: Option<&[u8]>, descr: &FieldDescription) -> Result<Self>;
}

/// Byte-level scanning over text payloads.
pub(crate) mod scan {
    use super::{ClientError, Result};

    /// Trims ascii whitespace from both ends.
    pub fn trim(s: &str) -> &str {
        s.trim_matches(|c: char| c.is_ascii_whitespace())
    }

    pub struct Cursor<'a> {
        s: &'a str,
        pos: usize,
    }

    impl<'a> Cursor<'a> {
        pub fn new(s: &'a str) -> Self {
            Self { s, pos: 0 }
        }

        pub fn rest(&self) -> &'a str {
            // only ascii is ever consumed, so pos stays on a boundary
            &self.s[self.pos..]
        }

        pub fn at_end(&self) -> bool {
            self.pos == self.s.len()
        }

        pub fn peek(&self) -> Option<u8> {
            self.s.as_bytes().get(self.pos).copied()
        }

        pub fn bump(&mut self) {
            self.pos += 1;
        }

        pub fn advance(&mut self, n: usize) {
            self.pos += n;
        }

        pub fn expect(&mut self, byte: u8) -> Result<()> {
            if self.peek() != Some(byte) {
                return Err(ClientError::ProtocolValue);
            }
            self.pos += 1;
            Ok(())
        }

        pub fn skip_ws(&mut self) {
            while matches!(self.peek(), Some(b) if b.is_ascii_whitespace()) {
                self.pos += 1;
            }
        }

        /// Consumes one or more decimal digits, returning the value
        /// and the digit count.
        pub fn digits(&mut self) -> Result<(i64, usize)> {
            let start = self.pos;
            let mut value: i64 = 0;
            while let Some(b @ b'0'..=b'9') = self.peek() {
                value = value
                    .checked_mul(10)
                    .and_then(|v| v.checked_add((b - b'0') as i64))
                    .ok_or(ClientError::ProtocolValue)?;
                self.pos += 1;
            }
            if self.pos == start {
                return Err(ClientError::ProtocolValue);
            }
            Ok((value, self.pos - start))
        }

        /// Consumes an optionally signed decimal integer.
        pub fn signed(&mut self) -> Result<i64> {
            let negative = match self.peek() {
                Some(b'-') => {
                    self.pos += 1;
                    true
                }
                Some(b'+') => {
                    self.pos += 1;
                    false
                }
                _ => false,
            };
            let (value, _) = self.digits()?;
            Ok(if negative { -value } else { value })
        }
    }
}

/// Parses a complete text integer: optional sign, base-10 digits, EOF.
///
/// Trailing bytes are [`ClientError::ExtraBytes`]; anything else that
/// goes wrong is [`ClientError::ProtocolValue`].
fn parse_text_int(data: &[u8]) -> Result<i128> {
    let mut pos = 0;
    let negative = match data.first() {
        Some(b'-') => {
            pos += 1;
            true
        }
        Some(b'+') => {
            pos += 1;
            false
        }
        _ => false,
    };

    let digits_start = pos;
    let mut value: i128 = 0;
    while let Some(b @ b'0'..=b'9') = data.get(pos) {
        value = value
            .checked_mul(10)
            .and_then(|v| v.checked_add((b - b'0') as i128))
            .ok_or(ClientError::ProtocolValue)?;
        pos += 1;
    }
    if pos == digits_start {
        return Err(ClientError::ProtocolValue);
    }
    if pos != data.len() {
        return Err(ClientError::ExtraBytes);
    }
    Ok(if negative { -value } else { value })
}

pub(crate) fn load_i16(data: &[u8]) -> Result<i16> {
    Ok(i16::from_be_bytes(data.try_into().map_err(|_| ClientError::ProtocolValue)?))
}

pub(crate) fn load_i32(data: &[u8]) -> Result<i32> {
    Ok(i32::from_be_bytes(data.try_into().map_err(|_| ClientError::ProtocolValue)?))
}

pub(crate) fn load_i64(data: &[u8]) -> Result<i64> {
    Ok(i64::from_be_bytes(data.try_into().map_err(|_| ClientError::ProtocolValue)?))
}

/// Reads the column as the integer type the column OID declares,
/// range-checked, in either wire format.
fn column_int(data: &[u8], descr: &FieldDescription) -> Result<i64> {
    match descr.format {
        PgFormat::Text => {
            let wide = parse_text_int(data)?;
            let (min, max): (i64, i64) = match descr.type_oid {
                oid::INT2 => (i16::MIN as i64, i16::MAX as i64),
                oid::INT4 => (i32::MIN as i64, i32::MAX as i64),
                _ => (i64::MIN, i64::MAX),
            };
            if wide < min as i128 || wide > max as i128 {
                return Err(ClientError::ProtocolValue);
            }
            Ok(wide as i64)
        }
        PgFormat::Binary => match descr.type_oid {
            oid::INT2 => Ok(load_i16(data)? as i64),
            oid::INT4 => Ok(load_i32(data)? as i64),
            _ => load_i64(data),
        },
    }
}

pub(crate) fn expect_value<'a>(value: Option<&'a [u8]>) -> Result<&'a [u8]> {
    value.ok_or(ClientError::UnexpectedNull)
}

impl FieldDecode for i16 {
    fn is_compatible(descr: &FieldDescription) -> Result<()> {
        match descr.type_oid {
            oid::INT2 => Ok(()),
            _ => Err(ClientError::IncompatibleFieldType),
        }
    }

    fn decode(value: Option<&[u8]>, descr: &FieldDescription) -> Result<Self> {
        let data = expect_value(value)?;
        column_int(data, descr)?
            .try_into()
            .map_err(|_| ClientError::ProtocolValue)
    }
}

impl FieldDecode for i32 {
    fn is_compatible(descr: &FieldDescription) -> Result<()> {
        match descr.type_oid {
            oid::INT2 | oid::INT4 => Ok(()),
            _ => Err(ClientError::IncompatibleFieldType),
        }
    }

    fn decode(value: Option<&[u8]>, descr: &FieldDescription) -> Result<Self> {
        let data = expect_value(value)?;
        column_int(data, descr)?
            .try_into()
            .map_err(|_| ClientError::ProtocolValue)
    }
}

impl FieldDecode for i64 {
    fn is_compatible(descr: &FieldDescription) -> Result<()> {
        match descr.type_oid {
            oid::INT2 | oid::INT4 | oid::INT8 => Ok(()),
            _ => Err(ClientError::IncompatibleFieldType),
        }
    }

    fn decode(value: Option<&[u8]>, descr: &FieldDescription) -> Result<Self> {
        let data = expect_value(value)?;
        column_int(data, descr)
    }
}

// Strings can parse a column of any type
impl FieldDecode for String {
    fn is_compatible(_: &FieldDescription) -> Result<()> {
        Ok(())
    }

    fn decode(value: Option<&[u8]>, _: &FieldDescription) -> Result<Self> {
        let data = expect_value(value)?;
        match std::str::from_utf8(data) {
            Ok(s) => Ok(s.to_owned()),
            Err(_) => Err(ClientError::ProtocolValue),
        }
    }
}

impl<T: FieldDecode> FieldDecode for Option<T> {
    fn is_compatible(descr: &FieldDescription) -> Result<()> {
        T::is_compatible(descr)
    }

    fn decode(value: Option<&[u8]>, descr: &FieldDescription) -> Result<Self> {
        match value {
            None => Ok(None),
            some => T::decode(some, descr).map(Some),
        }
    }
}

#[cfg(test)]
pub(crate) fn descr(type_oid: crate::postgres::Oid, format: PgFormat) -> FieldDescription {
    FieldDescription { type_oid, format, ..Default::default() }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn text_int_widening() {
        let d = descr(oid::INT2, PgFormat::Text);
        assert_eq!(i64::decode(Some(b"-42"), &d), Ok(-42));
        // out of range for the column type, even though i64 could hold it
        assert_eq!(i64::decode(Some(b"70000"), &d), Err(ClientError::ProtocolValue));
    }

    #[test]
    fn text_int_trailing_bytes() {
        let d = descr(oid::INT4, PgFormat::Text);
        assert_eq!(i32::decode(Some(b"12x"), &d), Err(ClientError::ExtraBytes));
        assert_eq!(i32::decode(Some(b""), &d), Err(ClientError::ProtocolValue));
        assert_eq!(i32::decode(Some(b"+"), &d), Err(ClientError::ProtocolValue));
    }

    #[test]
    fn binary_int_exact_width() {
        let d = descr(oid::INT4, PgFormat::Binary);
        assert_eq!(i32::decode(Some(&[0, 0, 0, 7]), &d), Ok(7));
        assert_eq!(i32::decode(Some(&[0, 0, 7]), &d), Err(ClientError::ProtocolValue));
        assert_eq!(
            i32::decode(Some(&[0, 0, 0, 0, 7]), &d),
            Err(ClientError::ProtocolValue),
        );
    }

    #[test]
    fn binary_int_widens_from_narrow_columns() {
        let d = descr(oid::INT2, PgFormat::Binary);
        assert_eq!(i64::decode(Some(&[0xFF, 0xFE]), &d), Ok(-2));
    }

    #[test]
    fn int_compatibility_sets() {
        assert!(i16::is_compatible(&descr(oid::INT2, PgFormat::Text)).is_ok());
        assert_eq!(
            i16::is_compatible(&descr(oid::INT4, PgFormat::Text)),
            Err(ClientError::IncompatibleFieldType),
        );
        assert!(i32::is_compatible(&descr(oid::INT2, PgFormat::Text)).is_ok());
        assert_eq!(
            i32::is_compatible(&descr(oid::INT8, PgFormat::Text)),
            Err(ClientError::IncompatibleFieldType),
        );
        assert!(i64::is_compatible(&descr(oid::INT8, PgFormat::Text)).is_ok());
    }

    #[test]
    fn strings_accept_any_oid() {
        let d = descr(oid::INTERVAL, PgFormat::Text);
        assert!(String::is_compatible(&d).is_ok());
        assert_eq!(String::decode(Some(b"abc"), &d), Ok("abc".to_owned()));
        assert_eq!(String::decode(None, &d), Err(ClientError::UnexpectedNull));
    }

    #[test]
    fn null_handling() {
        let d = descr(oid::INT4, PgFormat::Binary);
        assert_eq!(i32::decode(None, &d), Err(ClientError::UnexpectedNull));
        assert_eq!(Option::<i32>::decode(None, &d), Ok(None));
        assert_eq!(Option::<i32>::decode(Some(&[0, 0, 0, 9]), &d), Ok(Some(9)));
    }
}
