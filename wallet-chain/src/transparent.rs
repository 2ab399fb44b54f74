//! Transaction inputs, outputs, and the scripts and addresses that gate them.
#![allow(clippy::unit_arg)]

mod address;
mod keys;
mod script;
mod serialize;

pub use address::Address;
pub use keys::{EcKey, EncryptedKey};
pub use script::Script;

use crate::{
    cached::Cached, compactint::CompactInt, BitcoinDeserialize, BitcoinSerialize,
    SerializationError,
};
use bitcoin_serde_derive::{BtcDeserialize, BtcSerialize};

#[cfg(any(test, feature = "proptest-impl"))]
use proptest_derive::Arbitrary;

use crate::{block, transaction};

/// Arbitrary data inserted by miners into a coinbase transaction.
#[derive(Clone, Eq, PartialEq, Serialize, Deserialize, BtcDeserialize, BtcSerialize)]
pub struct CoinbaseData(
    /// Invariant: this vec must be less than 100 bytes. We only ever
    /// construct it by parsing an existing coinbase input.
    pub(super) Vec<u8>,
);

impl AsRef<[u8]> for CoinbaseData {
    fn as_ref(&self) -> &[u8] {
        self.0.as_ref()
    }
}

impl CoinbaseData {
    pub fn serialized_size(&self) -> usize {
        CompactInt::size(self.0.len()) + self.0.len()
    }
}

impl std::fmt::Debug for CoinbaseData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let escaped = String::from_utf8(
            self.0
                .iter()
                .cloned()
                .flat_map(std::ascii::escape_default)
                .collect(),
        )
        .expect("ascii::escape_default produces utf8");
        f.debug_tuple("CoinbaseData").field(&escaped).finish()
    }
}

/// A particular transaction output reference: which transaction, and which
/// of its outputs.
#[derive(
    Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize, Hash, BtcSerialize, BtcDeserialize,
)]
#[cfg_attr(any(test, feature = "proptest-impl"), derive(Arbitrary))]
pub struct OutPoint {
    /// The transaction that contains the output being spent.
    pub hash: transaction::Hash,

    /// Which output of that transaction; the first output is 0.
    pub index: u32,
}

impl OutPoint {
    #[inline]
    pub const fn len() -> usize {
        36
    }
}

/// A transparent input to a transaction.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum Input {
    /// A reference to an output of a previous transaction.
    PrevOut {
        /// The previous output being spent.
        outpoint: OutPoint,
        /// The script that authorizes spending `outpoint`.
        unlock_script: Script,
        /// The sequence number for this input.
        sequence: u32,
    },
    /// New coins created by the block reward.
    Coinbase {
        /// The block height, if it could be parsed out of BIP 34 coinbase data.
        height: Option<Cached<block::Height>>,
        /// Free data inserted by miners, including the BIP 34 height prefix.
        data: CoinbaseData,
        /// The sequence number for this input.
        sequence: u32,
    },
}

impl Input {
    pub fn len(&self) -> usize {
        match *self {
            Input::PrevOut {
                ref unlock_script, ..
            } => OutPoint::len() + unlock_script.serialized_size() + 4,
            Input::Coinbase { ref data, .. } => data.serialized_size() + 4,
        }
    }

    /// This input with its unlocking script emptied, used to build a
    /// transaction's signature-malleation-resistant normalized hash.
    pub fn with_cleared_script(&self) -> Input {
        match self {
            Input::PrevOut {
                outpoint,
                sequence,
                ..
            } => Input::PrevOut {
                outpoint: *outpoint,
                unlock_script: Script(Vec::new()),
                sequence: *sequence,
            },
            Input::Coinbase {
                height,
                data,
                sequence,
            } => Input::Coinbase {
                height: *height,
                data: data.clone(),
                sequence: *sequence,
            },
        }
    }
}

/// A transparent output from a transaction: an amount of satoshis gated by
/// a locking script.
#[derive(
    Clone, Debug, Eq, PartialEq, Serialize, Deserialize, Hash, BtcDeserialize, BtcSerialize,
)]
#[cfg_attr(any(test, feature = "proptest-impl"), derive(Arbitrary))]
pub struct Output {
    /// The output's value, in satoshis.
    pub value: u64,

    /// The script that gates spending this output.
    pub lock_script: Script,
}

impl Output {
    /// Returns the serialized length (in bytes) of this Output
    pub fn len(&self) -> usize {
        8 + self.lock_script.serialized_size()
    }
}
