//! Wire primitive extension traits.
//!
//! All protocol integers are big-endian two's complement. Strings are
//! either nul-terminated or length-prefixed (32-bit length, -1 = NULL).
use bytes::{Buf, BufMut, Bytes};

use crate::{
    common::ByteStr,
    error::{ClientError, Result},
};

/// Checked conversions from `usize` into protocol integer widths.
///
/// Integer signedness in the protocol docs is awful; lengths are `usize`
/// in Rust while the wire wants `i16`/`i32`. Overflow is a value error,
/// not a panic: an oversized request must be reported to the caller
/// before anything is written.
pub trait UsizeExt {
    fn to_i16(self) -> Result<i16>;
    fn to_i32(self) -> Result<i32>;
}

impl UsizeExt for usize {
    fn to_i16(self) -> Result<i16> {
        self.try_into().map_err(|_| ClientError::ProtocolValue)
    }

    fn to_i32(self) -> Result<i32> {
        self.try_into().map_err(|_| ClientError::ProtocolValue)
    }
}

pub trait StrExt {
    /// Serialized length of self as a nul-terminated protocol string.
    ///
    /// Fails when the string contains an interior nul byte or does not
    /// fit a 32-bit frame.
    fn nul_string_len(&self) -> Result<i32>;
}

impl StrExt for str {
    fn nul_string_len(&self) -> Result<i32> {
        if self.as_bytes().contains(&b'\0') {
            return Err(ClientError::ProtocolValue);
        }
        Ok(self.len().to_i32()?.checked_add(1).ok_or(ClientError::ProtocolValue)?)
    }
}

pub trait BufMutExt {
    /// Protocol strings are nul terminated.
    fn put_nul_string(&mut self, string: &str);
}

impl<B: BufMut> BufMutExt for B {
    fn put_nul_string(&mut self, string: &str) {
        self.put(string.as_bytes());
        self.put_u8(b'\0');
    }
}

/// Checked reads over a message body.
///
/// Every accessor fails with [`ClientError::ProtocolValue`] instead of
/// panicking when the frame is short; [`finish`][BytesReadExt::finish]
/// rejects trailing bytes so parsers stay strict.
pub trait BytesReadExt {
    fn read_u8(&mut self) -> Result<u8>;
    fn read_i16(&mut self) -> Result<i16>;
    fn read_u16(&mut self) -> Result<u16>;
    fn read_i32(&mut self) -> Result<i32>;
    fn read_u32(&mut self) -> Result<u32>;
    fn read_i64(&mut self) -> Result<i64>;

    /// Splits off `n` bytes.
    fn read_bytes(&mut self, n: usize) -> Result<Bytes>;

    /// Splits off a nul-terminated string, consuming the terminator.
    fn read_nul_bytestr(&mut self) -> Result<ByteStr>;

    /// Succeeds only when the whole body has been consumed.
    fn finish(&self) -> Result<()>;
}

macro_rules! checked_get {
    ($self:ident, $get:ident, $width:expr) => {{
        if $self.remaining() < $width {
            return Err(ClientError::ProtocolValue);
        }
        Ok($self.$get())
    }};
}

impl BytesReadExt for Bytes {
    fn read_u8(&mut self) -> Result<u8> {
        checked_get!(self, get_u8, 1)
    }

    fn read_i16(&mut self) -> Result<i16> {
        checked_get!(self, get_i16, 2)
    }

    fn read_u16(&mut self) -> Result<u16> {
        checked_get!(self, get_u16, 2)
    }

    fn read_i32(&mut self) -> Result<i32> {
        checked_get!(self, get_i32, 4)
    }

    fn read_u32(&mut self) -> Result<u32> {
        checked_get!(self, get_u32, 4)
    }

    fn read_i64(&mut self) -> Result<i64> {
        checked_get!(self, get_i64, 8)
    }

    fn read_bytes(&mut self, n: usize) -> Result<Bytes> {
        if self.remaining() < n {
            return Err(ClientError::ProtocolValue);
        }
        Ok(self.split_to(n))
    }

    fn read_nul_bytestr(&mut self) -> Result<ByteStr> {
        let end = self
            .iter()
            .position(|b| *b == b'\0')
            .ok_or(ClientError::ProtocolValue)?;
        let string = ByteStr::from_utf8(self.split_to(end))
            .map_err(|_| ClientError::ProtocolValue)?;
        self.advance(1); // nul
        Ok(string)
    }

    fn finish(&self) -> Result<()> {
        match self.has_remaining() {
            true => Err(ClientError::ExtraBytes),
            false => Ok(()),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn nul_string_len_rejects_interior_nul() {
        assert_eq!("a\0b".nul_string_len(), Err(ClientError::ProtocolValue));
        assert_eq!("ab".nul_string_len(), Ok(3));
    }

    #[test]
    fn short_reads_are_value_errors() {
        let mut body = Bytes::from_static(&[0x01, 0x02]);
        assert_eq!(body.read_i32(), Err(ClientError::ProtocolValue));
        assert_eq!(body.read_u16(), Ok(0x0102));
        assert!(body.finish().is_ok());
    }

    #[test]
    fn nul_bytestr_consumes_terminator() {
        let mut body = Bytes::from_static(b"name\0rest");
        assert_eq!(body.read_nul_bytestr().unwrap(), "name");
        assert_eq!(&body[..], b"rest");
        assert_eq!(body.finish(), Err(ClientError::ExtraBytes));
    }
}
