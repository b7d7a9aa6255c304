//! Shared utility types.
use bytes::Bytes;

/// A cheaply cloneable and sliceable UTF-8 string.
///
/// Server messages arrive as [`Bytes`]; `ByteStr` lets column names,
/// command tags and diagnostic fields share that allocation instead of
/// copying into a [`String`].
pub struct ByteStr {
    bytes: Bytes,
}

impl ByteStr {
    /// Creates an empty `ByteStr`.
    pub const fn new() -> Self {
        Self { bytes: Bytes::new() }
    }

    /// Converts a `Bytes` to a `ByteStr`, validating UTF-8.
    pub fn from_utf8(bytes: Bytes) -> Result<Self, std::str::Utf8Error> {
        std::str::from_utf8(&bytes)?;
        Ok(Self { bytes })
    }

    /// Creates a `ByteStr` pointing directly to a static str.
    ///
    /// There is no allocating or copying.
    pub const fn from_static(string: &'static str) -> Self {
        Self { bytes: Bytes::from_static(string.as_bytes()) }
    }

    /// Creates a `ByteStr` from a str slice, by copying it.
    pub fn copy_from_str(string: &str) -> Self {
        Self { bytes: Bytes::copy_from_slice(string.as_bytes()) }
    }

    /// Returns the string content.
    pub fn as_str(&self) -> &str {
        // SAFETY: construction validates UTF-8 and the buffer is immutable
        unsafe { std::str::from_utf8_unchecked(&self.bytes) }
    }
}

impl AsRef<str> for ByteStr {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl std::ops::Deref for ByteStr {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        self.as_str()
    }
}

impl Clone for ByteStr {
    fn clone(&self) -> Self {
        Self { bytes: Bytes::clone(&self.bytes) }
    }
}

impl Default for ByteStr {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ByteStr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        <str as std::fmt::Display>::fmt(self, f)
    }
}

impl std::fmt::Debug for ByteStr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        <str as std::fmt::Debug>::fmt(self, f)
    }
}

impl PartialEq for ByteStr {
    fn eq(&self, other: &Self) -> bool {
        str::eq(self.as_str(), other.as_str())
    }
}

impl Eq for ByteStr {}

impl PartialEq<str> for ByteStr {
    fn eq(&self, other: &str) -> bool {
        str::eq(self.as_str(), other)
    }
}

impl PartialEq<&str> for ByteStr {
    fn eq(&self, other: &&str) -> bool {
        str::eq(self.as_str(), *other)
    }
}

impl From<&'static str> for ByteStr {
    fn from(value: &'static str) -> Self {
        Self { bytes: Bytes::from_static(value.as_bytes()) }
    }
}

impl From<String> for ByteStr {
    fn from(value: String) -> Self {
        Self { bytes: Bytes::from(value.into_bytes()) }
    }
}
