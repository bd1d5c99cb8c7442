//! Immutable view over cached bytes

use std::fmt;
use bytes::Bytes;

/// Immutable snapshot of a value
///
/// Built by copying a borrowed slice or by taking ownership of a `Vec`, so no
/// caller keeps a mutable alias into cached data. Clones share the same
/// read-only buffer.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct ByteView {
    b: Bytes,
}

impl ByteView {
    /// Copy `src` into a new view
    pub fn copy_from(src: &[u8]) -> Self {
        Self {
            b: Bytes::copy_from_slice(src),
        }
    }

    /// Length in bytes
    pub fn len(&self) -> usize {
        self.b.len()
    }

    /// Check if the view is empty
    pub fn is_empty(&self) -> bool {
        self.b.is_empty()
    }

    /// Borrow the bytes read-only
    pub fn as_slice(&self) -> &[u8] {
        &self.b
    }

    /// Copy the bytes out
    pub fn to_vec(&self) -> Vec<u8> {
        self.b.to_vec()
    }

    /// Cheap handle for response bodies
    pub fn to_bytes(&self) -> Bytes {
        self.b.clone()
    }
}

impl From<Vec<u8>> for ByteView {
    fn from(v: Vec<u8>) -> Self {
        Self { b: Bytes::from(v) }
    }
}

impl From<&[u8]> for ByteView {
    fn from(src: &[u8]) -> Self {
        Self::copy_from(src)
    }
}

impl AsRef<[u8]> for ByteView {
    fn as_ref(&self) -> &[u8] {
        &self.b
    }
}

impl fmt::Debug for ByteView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteView").field("len", &self.b.len()).finish()
    }
}
