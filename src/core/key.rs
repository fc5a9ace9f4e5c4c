//! Filter keys.

/// Opaque byte key with an optional caller-supplied weight.
///
/// The weight travels with the key for callers that track it; hashing and
/// bucket placement only ever look at the bytes.
///
/// Anything that borrows as bytes converts into a key:
///
/// ```
/// use griddle::Key;
///
/// let a: Key<'_> = "toupiao:1:1001".into();
/// let b: Key<'_> = b"toupiao:1:1001".into();
/// assert_eq!(a.bytes(), b.bytes());
/// assert_eq!(Key::with_weight(b"vote", 2.5).weight(), 2.5);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Key<'a> {
    bytes: &'a [u8],
    weight: f64,
}

impl<'a> Key<'a> {
    /// Key with weight `1.0`.
    #[must_use]
    pub const fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, weight: 1.0 }
    }

    /// Key with an explicit weight.
    #[must_use]
    pub const fn with_weight(bytes: &'a [u8], weight: f64) -> Self {
        Self { bytes, weight }
    }

    /// Key bytes.
    #[inline]
    #[must_use]
    pub const fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Caller-supplied weight.
    #[inline]
    #[must_use]
    pub const fn weight(&self) -> f64 {
        self.weight
    }

    /// Whether the key has no bytes. Empty keys are rejected by every filter
    /// operation.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl<'a> From<&'a [u8]> for Key<'a> {
    fn from(bytes: &'a [u8]) -> Self {
        Self::new(bytes)
    }
}

impl<'a, const N: usize> From<&'a [u8; N]> for Key<'a> {
    fn from(bytes: &'a [u8; N]) -> Self {
        Self::new(bytes)
    }
}

impl<'a> From<&'a Vec<u8>> for Key<'a> {
    fn from(bytes: &'a Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

impl<'a> From<&'a str> for Key<'a> {
    fn from(s: &'a str) -> Self {
        Self::new(s.as_bytes())
    }
}

impl<'a> From<&'a String> for Key<'a> {
    fn from(s: &'a String) -> Self {
        Self::new(s.as_bytes())
    }
}
