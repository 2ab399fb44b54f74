//! The compact ("nBits") target encoding and the expanded 256-bit target it
//! unpacks to.

use std::fmt;

use primitive_types::U256;
use thiserror::Error;

use crate::serialization::{BitcoinDeserialize, BitcoinSerialize, SerializationError};

/// The 32-bit compact representation of a proof-of-work target, as it
/// appears on the wire in a block header.
///
/// Laid out as `exponent:u8 | mantissa:u24`, big-endian within the u32. The
/// exponent counts bytes, not bits: `target = mantissa * 256^(exponent - 3)`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CompactDifficulty(pub u32);

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DifficultyError {
    #[error("compact difficulty exponent {0} is out of range")]
    ExponentOutOfRange(u8),
    #[error("compact difficulty mantissa has its sign bit set")]
    NegativeMantissa,
}

impl CompactDifficulty {
    fn exponent(&self) -> u8 {
        (self.0 >> 24) as u8
    }

    fn mantissa(&self) -> u32 {
        self.0 & 0x00ff_ffff
    }

    /// Expand this compact target into its full 256-bit value.
    ///
    /// Rejects an exponent greater than 34 (the widest a legitimate target
    /// can be: 3 mantissa bytes plus a shift of 31 bytes still fits in
    /// 256 bits) and a mantissa with its 0x00800000 sign bit set, which
    /// OpenSSL's original bignum-derived encoding treats as negative.
    pub fn to_expanded(self) -> Result<ExpandedDifficulty, DifficultyError> {
        let exponent = self.exponent();
        if exponent > 34 {
            return Err(DifficultyError::ExponentOutOfRange(exponent));
        }
        if self.mantissa() & 0x0080_0000 != 0 {
            return Err(DifficultyError::NegativeMantissa);
        }

        let mantissa = U256::from(self.mantissa());

        let value = if exponent <= 3 {
            mantissa >> (8 * (3 - exponent as u32))
        } else {
            mantissa << (8 * (exponent as u32 - 3))
        };

        Ok(ExpandedDifficulty(value))
    }
}

impl fmt::Display for CompactDifficulty {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

impl BitcoinSerialize for CompactDifficulty {
    fn bitcoin_serialize<W: std::io::Write>(&self, target: W) -> Result<(), std::io::Error> {
        self.0.bitcoin_serialize(target)
    }
}

impl BitcoinDeserialize for CompactDifficulty {
    fn bitcoin_deserialize<R: std::io::Read>(
        target: R,
    ) -> Result<CompactDifficulty, SerializationError> {
        Ok(CompactDifficulty(u32::bitcoin_deserialize(target)?))
    }
}

/// A fully expanded 256-bit proof-of-work target.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct ExpandedDifficulty(U256);

impl ExpandedDifficulty {
    pub fn as_u256(&self) -> U256 {
        self.0
    }

    /// The amount of work represented by a block with this target:
    /// `floor(2^256 / (target + 1))`.
    ///
    /// Lower targets mean more leading zero bits and so represent more
    /// work; this is the quantity summed along a chain to compare competing
    /// forks (spec's `chainWork`).
    pub fn work(&self) -> U256 {
        let denominator = self.0.saturating_add(U256::one());
        if denominator.is_zero() {
            return U256::MAX;
        }
        // 2^256 isn't representable in U256, so compute the numerator as
        // its two's-complement-style bitwise complement of target (~target
        // == 2^256 - 1 - target) rather than U256::MAX itself.
        let numerator = U256::MAX - self.0;
        (numerator / denominator).saturating_add(U256::one())
    }
}

/// Hard floor on valid mainnet/testnet targets: proof-of-work difficulty
/// may never exceed (target may never be lower than) this value.
pub fn target_difficulty_limit() -> ExpandedDifficulty {
    // nBits 0x1d00ffff, Bitcoin's genesis-block difficulty-1 target.
    CompactDifficulty(0x1d00_ffff)
        .to_expanded()
        .expect("difficulty limit is a valid compact target")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genesis_target_is_difficulty_limit() {
        let genesis_bits = CompactDifficulty(0x1d00_ffff);
        assert_eq!(genesis_bits.to_expanded().unwrap(), target_difficulty_limit());
    }

    #[test]
    fn rejects_oversized_exponent() {
        let bits = CompactDifficulty(35 << 24);
        assert_eq!(
            bits.to_expanded(),
            Err(DifficultyError::ExponentOutOfRange(35))
        );
    }

    #[test]
    fn rejects_negative_mantissa() {
        let bits = CompactDifficulty((3 << 24) | 0x0080_0000);
        assert_eq!(bits.to_expanded(), Err(DifficultyError::NegativeMantissa));
    }

    #[test]
    fn lower_target_is_more_work() {
        let easy = CompactDifficulty(0x1d00_ffff).to_expanded().unwrap();
        let hard = CompactDifficulty(0x1b00_ffff).to_expanded().unwrap();
        assert!(hard.as_u256() < easy.as_u256());
        assert!(hard.work() > easy.work());
    }
}
