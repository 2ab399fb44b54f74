//! The Bitcoin variable-length integer encoding (`CompactSize`, a.k.a. VarInt).
//!
//! Values below 253 are a single byte. Larger values are prefixed with a
//! marker byte (0xFD/0xFE/0xFF) followed by a little-endian u16/u32/u64.
//! Decoding rejects any encoding that is not the shortest one for its value.

use crate::{BitcoinDeserialize, BitcoinSerialize, SerializationError};
use byteorder::{LittleEndian, WriteBytesExt};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompactInt(u64);

impl CompactInt {
    pub fn new() -> CompactInt {
        CompactInt(0)
    }

    pub fn from(value: usize) -> CompactInt {
        CompactInt(value as u64)
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    /// The number of bytes this value would take to encode.
    pub fn size(value: usize) -> usize {
        if value < 253 {
            1
        } else if value <= std::u16::MAX as usize {
            3
        } else if value <= std::u32::MAX as usize {
            5
        } else {
            9
        }
    }
}

impl Default for CompactInt {
    fn default() -> Self {
        CompactInt::new()
    }
}

impl BitcoinSerialize for CompactInt {
    fn bitcoin_serialize<W>(&self, mut target: W) -> Result<(), std::io::Error>
    where
        W: std::io::Write,
    {
        if self.value() < 253 {
            target.write_all(&[self.value() as u8])
        } else if self.value() <= std::u16::MAX as u64 {
            target.write_all(&[253])?;
            target.write_u16::<LittleEndian>(self.value() as u16)
        } else if self.value() <= std::u32::MAX as u64 {
            target.write_all(&[254])?;
            target.write_u32::<LittleEndian>(self.value() as u32)
        } else {
            target.write_all(&[255])?;
            target.write_u64::<LittleEndian>(self.value())
        }
    }
}

impl BitcoinDeserialize for CompactInt {
    fn bitcoin_deserialize<R: std::io::Read>(
        mut target: R,
    ) -> Result<CompactInt, SerializationError> {
        let first = u8::bitcoin_deserialize(&mut target)?;
        if first < 253 {
            Ok(CompactInt::from(first as usize))
        } else if first == 253 {
            let value = u16::bitcoin_deserialize(&mut target)?;
            if value < 253 {
                return Err(SerializationError::Parse("non-minimal VarInt encoding"));
            }
            Ok(CompactInt::from(value as usize))
        } else if first == 254 {
            let value = u32::bitcoin_deserialize(&mut target)?;
            if value <= std::u16::MAX as u32 {
                return Err(SerializationError::Parse("non-minimal VarInt encoding"));
            }
            Ok(CompactInt::from(value as usize))
        } else {
            let value = u64::bitcoin_deserialize(&mut target)?;
            if value <= std::u32::MAX as u64 {
                return Err(SerializationError::Parse("non-minimal VarInt encoding"));
            }
            Ok(CompactInt(value))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn roundtrip(n: u64) {
        let v = CompactInt(n);
        let bytes = v.bitcoin_serialize_to_vec().unwrap();
        assert_eq!(bytes.len(), CompactInt::size(n as usize));
        let parsed = CompactInt::bitcoin_deserialize(Cursor::new(&bytes)).unwrap();
        assert_eq!(parsed.value(), n);
    }

    #[test]
    fn varint_roundtrip() {
        for n in [
            0,
            0xFC,
            0xFD,
            0xFFFF,
            0x1_0000,
            (u32::MAX - 1) as u64,
            u32::MAX as u64,
            u64::MAX,
        ] {
            roundtrip(n);
        }
    }

    #[test]
    fn rejects_non_minimal() {
        let bytes = [0xFDu8, 0x0A, 0x00];
        assert!(CompactInt::bitcoin_deserialize(Cursor::new(&bytes[..])).is_err());

        let bytes = [0xFEu8, 0x0A, 0x00, 0x00, 0x00];
        assert!(CompactInt::bitcoin_deserialize(Cursor::new(&bytes[..])).is_err());

        let mut bytes = vec![0xFFu8];
        bytes.extend_from_slice(&10u64.to_le_bytes());
        assert!(CompactInt::bitcoin_deserialize(Cursor::new(&bytes[..])).is_err());
    }
}
