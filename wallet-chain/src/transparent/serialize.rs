//! Manual `BitcoinSerialize`/`BitcoinDeserialize` impls for `Input`, whose
//! two variants share no common wire layout, so the derive macro can't
//! generate them.

use crate::block;
use crate::cached::Cached;
use crate::serialization::{BitcoinDeserialize, BitcoinSerialize, SerializationError};
use crate::transaction;

use super::{CoinbaseData, Input, OutPoint};

/// A coinbase input's outpoint hash is all zero bytes.
const COINBASE_HASH: transaction::Hash = transaction::Hash([0u8; 32]);
/// A coinbase input's outpoint index is the maximum `u32`.
const COINBASE_INDEX: u32 = u32::MAX;

impl BitcoinSerialize for Input {
    fn bitcoin_serialize<W: std::io::Write>(&self, mut target: W) -> Result<(), std::io::Error> {
        match self {
            Input::PrevOut {
                outpoint,
                unlock_script,
                sequence,
            } => {
                outpoint.bitcoin_serialize(&mut target)?;
                unlock_script.bitcoin_serialize(&mut target)?;
                sequence.bitcoin_serialize(&mut target)
            }
            Input::Coinbase {
                data, sequence, ..
            } => {
                let coinbase_outpoint = OutPoint {
                    hash: COINBASE_HASH,
                    index: COINBASE_INDEX,
                };
                coinbase_outpoint.bitcoin_serialize(&mut target)?;
                data.bitcoin_serialize(&mut target)?;
                sequence.bitcoin_serialize(&mut target)
            }
        }
    }
}

impl BitcoinDeserialize for Input {
    fn bitcoin_deserialize<R: std::io::Read>(mut reader: R) -> Result<Self, SerializationError> {
        let outpoint = OutPoint::bitcoin_deserialize(&mut reader)?;

        if outpoint.hash == COINBASE_HASH && outpoint.index == COINBASE_INDEX {
            let data = CoinbaseData::bitcoin_deserialize(&mut reader)?;
            let height = parse_bip34_height(data.as_ref()).map(Cached::from);
            let sequence = u32::bitcoin_deserialize(&mut reader)?;
            Ok(Input::Coinbase {
                height,
                data,
                sequence,
            })
        } else {
            let unlock_script = super::Script::bitcoin_deserialize(&mut reader)?;
            let sequence = u32::bitcoin_deserialize(&mut reader)?;
            Ok(Input::PrevOut {
                outpoint,
                unlock_script,
                sequence,
            })
        }
    }
}

/// BIP 34 requires the first push in the coinbase scriptSig to be the
/// block's serialized height, encoded as a minimal-length little-endian
/// integer push (1-8 bytes of data after the push opcode).
fn parse_bip34_height(data: &[u8]) -> Option<block::Height> {
    let push_len = *data.first()? as usize;
    if push_len == 0 || push_len > 8 || data.len() < 1 + push_len {
        return None;
    }
    let mut buf = [0u8; 8];
    buf[..push_len].copy_from_slice(&data[1..1 + push_len]);
    let height = u64::from_le_bytes(buf);
    u32::try_from(height).ok().map(block::Height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn coinbase_roundtrips() {
        let input = Input::Coinbase {
            height: None,
            data: CoinbaseData(vec![0x03, 0x40, 0x0d, 0x03]),
            sequence: 0xFFFF_FFFF,
        };
        let bytes = input.bitcoin_serialize_to_vec().unwrap();
        let parsed = Input::bitcoin_deserialize(Cursor::new(&bytes)).unwrap();
        assert!(matches!(parsed, Input::Coinbase { .. }));
    }

    #[test]
    fn bip34_height_is_parsed() {
        // Push of 3 bytes encoding height 0x00_0d40 = 54336, little-endian.
        let data = [0x03u8, 0x40, 0x0d, 0x00];
        assert_eq!(parse_bip34_height(&data), Some(block::Height(0x000d40)));
    }
}
