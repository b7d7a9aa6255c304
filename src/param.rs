//! Borrowed, type-erased query parameters.
use bytes::BufMut;

use crate::{
    error::Result,
    ext::UsizeExt,
    postgres::{PgFormat, Oid, oid},
};

/// A borrowed view of one bound parameter value.
///
/// Each variant knows its type OID and which wire format it prefers,
/// which is what `ParamFormat::SelectBest` consults. [`ParamRef::Text`]
/// is the escape hatch: any value the caller has already rendered the
/// way the server expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamRef<'a> {
    /// SQL NULL, sent with the special -1 length.
    Null,
    Int2(i16),
    Int4(i32),
    Int8(i64),
    /// Raw text, passed through verbatim in text format.
    Text(&'a str),
}

impl ParamRef<'_> {
    /// The parameter type OID, zero when unspecified.
    pub fn oid(self) -> Oid {
        match self {
            ParamRef::Null => 0,
            ParamRef::Int2(_) => oid::INT2,
            ParamRef::Int4(_) => oid::INT4,
            ParamRef::Int8(_) => oid::INT8,
            ParamRef::Text(_) => oid::TEXT,
        }
    }

    /// The format this parameter prefers when the caller lets the
    /// library pick.
    pub fn preferred_format(self) -> PgFormat {
        match self {
            ParamRef::Int2(_) | ParamRef::Int4(_) | ParamRef::Int8(_) => PgFormat::Binary,
            ParamRef::Null | ParamRef::Text(_) => PgFormat::Text,
        }
    }

    /// Serialized payload length in the given format, `None` for NULL.
    pub(crate) fn payload_len(self, format: PgFormat) -> Result<Option<i32>> {
        let len = match (self, format) {
            (ParamRef::Null, _) => return Ok(None),
            (ParamRef::Int2(_), PgFormat::Binary) => 2,
            (ParamRef::Int4(_), PgFormat::Binary) => 4,
            (ParamRef::Int8(_), PgFormat::Binary) => 8,
            (ParamRef::Int2(v), PgFormat::Text) => itoa::Buffer::new().format(v).len().to_i32()?,
            (ParamRef::Int4(v), PgFormat::Text) => itoa::Buffer::new().format(v).len().to_i32()?,
            (ParamRef::Int8(v), PgFormat::Text) => itoa::Buffer::new().format(v).len().to_i32()?,
            (ParamRef::Text(s), _) => s.len().to_i32()?,
        };
        Ok(Some(len))
    }

    /// Writes the length-prefixed payload in the given format.
    pub(crate) fn encode(self, format: PgFormat, buf: &mut impl BufMut) {
        match (self, format) {
            (ParamRef::Null, _) => buf.put_i32(-1),
            (ParamRef::Int2(v), PgFormat::Binary) => {
                buf.put_i32(2);
                buf.put_i16(v);
            }
            (ParamRef::Int4(v), PgFormat::Binary) => {
                buf.put_i32(4);
                buf.put_i32(v);
            }
            (ParamRef::Int8(v), PgFormat::Binary) => {
                buf.put_i32(8);
                buf.put_i64(v);
            }
            (ParamRef::Int2(v), PgFormat::Text) => put_text_int(buf, itoa::Buffer::new().format(v)),
            (ParamRef::Int4(v), PgFormat::Text) => put_text_int(buf, itoa::Buffer::new().format(v)),
            (ParamRef::Int8(v), PgFormat::Text) => put_text_int(buf, itoa::Buffer::new().format(v)),
            (ParamRef::Text(s), _) => {
                buf.put_i32(s.len() as i32);
                buf.put_slice(s.as_bytes());
            }
        }
    }
}

fn put_text_int(buf: &mut impl BufMut, rendered: &str) {
    buf.put_i32(rendered.len() as i32);
    buf.put_slice(rendered.as_bytes());
}

/// Borrows a value as a [`ParamRef`].
///
/// Implemented for every scalar a [`Statement`][crate::Statement] can
/// declare, so typed binds can erase their values in declaration
/// order.
pub trait AsParam {
    fn as_param(&self) -> ParamRef<'_>;
}

impl AsParam for i16 {
    fn as_param(&self) -> ParamRef<'_> {
        ParamRef::Int2(*self)
    }
}

impl AsParam for i32 {
    fn as_param(&self) -> ParamRef<'_> {
        ParamRef::Int4(*self)
    }
}

impl AsParam for i64 {
    fn as_param(&self) -> ParamRef<'_> {
        ParamRef::Int8(*self)
    }
}

impl AsParam for String {
    fn as_param(&self) -> ParamRef<'_> {
        ParamRef::Text(self)
    }
}

impl From<i16> for ParamRef<'_> {
    fn from(value: i16) -> Self {
        ParamRef::Int2(value)
    }
}

impl From<i32> for ParamRef<'_> {
    fn from(value: i32) -> Self {
        ParamRef::Int4(value)
    }
}

impl From<i64> for ParamRef<'_> {
    fn from(value: i64) -> Self {
        ParamRef::Int8(value)
    }
}

impl<'a> From<&'a str> for ParamRef<'a> {
    fn from(value: &'a str) -> Self {
        ParamRef::Text(value)
    }
}

impl<'a> From<&'a String> for ParamRef<'a> {
    fn from(value: &'a String) -> Self {
        ParamRef::Text(value)
    }
}

impl<'a, T> From<Option<T>> for ParamRef<'a>
where
    T: Into<ParamRef<'a>>,
{
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => ParamRef::Null,
        }
    }
}
