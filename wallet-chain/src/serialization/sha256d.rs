//! Double-SHA256 digests, used for block/transaction hashes and message checksums.

use std::fmt;
use std::io;

use sha2::{Digest, Sha256};

/// A streaming double-SHA256 hasher.
///
/// Implements `io::Write` so that a serializer can hash a value while
/// writing it, without buffering the whole serialization first.
#[derive(Default)]
pub struct Writer(Sha256);

impl Writer {
    /// Finish hashing and return the 32-byte digest, in internal (little-endian) order.
    pub fn finish(self) -> [u8; 32] {
        let first = self.0.finalize();
        let second = Sha256::digest(&first[..]);
        let mut out = [0u8; 32];
        out.copy_from_slice(&second[..]);
        out
    }
}

impl io::Write for Writer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Double-SHA256 of a byte slice, in internal (little-endian) order.
pub fn digest(bytes: &[u8]) -> [u8; 32] {
    let first = Sha256::digest(bytes);
    let second = Sha256::digest(&first[..]);
    let mut out = [0u8; 32];
    out.copy_from_slice(&second[..]);
    out
}

/// The first four bytes of a double-SHA256 digest, used as a message checksum.
#[derive(Copy, Clone, Eq, PartialEq)]
pub struct Checksum(pub [u8; 4]);

impl<'a> From<&'a [u8]> for Checksum {
    fn from(bytes: &'a [u8]) -> Self {
        let hash = digest(bytes);
        let mut out = [0u8; 4];
        out.copy_from_slice(&hash[0..4]);
        Checksum(out)
    }
}

impl fmt::Debug for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("Checksum").field(&hex::encode(self.0)).finish()
    }
}
