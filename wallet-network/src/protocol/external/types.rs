//! Small newtype wrappers around the primitive wire types used by more than
//! one message.

use std::io::{Read, Write};

use bitflags::bitflags;

use wallet_chain::parameters::Network;
use wallet_chain::{BitcoinDeserialize, BitcoinSerialize, SerializationError};

/// A nonce used to detect self-connections, or to match a `pong` to its `ping`.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub struct Nonce(pub u64);

impl BitcoinSerialize for Nonce {
    fn bitcoin_serialize<W: Write>(&self, writer: W) -> Result<(), std::io::Error> {
        self.0.bitcoin_serialize(writer)
    }
}

impl BitcoinDeserialize for Nonce {
    fn bitcoin_deserialize<R: Read>(reader: R) -> Result<Self, SerializationError> {
        Ok(Nonce(u64::bitcoin_deserialize(reader)?))
    }
}

/// The protocol version number advertised in a peer's `version` message.
#[derive(Copy, Clone, Eq, PartialEq, PartialOrd, Ord, Debug)]
pub struct ProtocolVersion(pub u32);

impl BitcoinSerialize for ProtocolVersion {
    fn bitcoin_serialize<W: Write>(&self, writer: W) -> Result<(), std::io::Error> {
        self.0.bitcoin_serialize(writer)
    }
}

impl BitcoinDeserialize for ProtocolVersion {
    fn bitcoin_deserialize<R: Read>(reader: R) -> Result<Self, SerializationError> {
        Ok(ProtocolVersion(u32::bitcoin_deserialize(reader)?))
    }
}

bitflags! {
    /// The network services a peer advertises in its `version` message.
    ///
    /// [Bitcoin reference](https://en.bitcoin.it/wiki/Protocol_documentation#version)
    pub struct PeerServices: u64 {
        /// This peer can be asked for full blocks instead of just headers.
        const NODE_NETWORK = 0x1;
        /// This peer supports bloom filtering ([BIP111]).
        ///
        /// [BIP111]: https://github.com/bitcoin/bips/blob/master/bip-0111.mediawiki
        const NODE_BLOOM = 0x4;
        /// This peer can serve the last 288 blocks rather than the full chain.
        const NODE_NETWORK_LIMITED = 0x400;
    }
}

impl BitcoinSerialize for PeerServices {
    fn bitcoin_serialize<W: Write>(&self, writer: W) -> Result<(), std::io::Error> {
        self.bits().bitcoin_serialize(writer)
    }
}

impl BitcoinDeserialize for PeerServices {
    fn bitcoin_deserialize<R: Read>(reader: R) -> Result<Self, SerializationError> {
        let bits = u64::bitcoin_deserialize(reader)?;
        // Ignore bits we don't recognize rather than rejecting the message;
        // peers routinely advertise service flags we don't know about yet.
        Ok(PeerServices::from_bits_truncate(bits))
    }
}

/// A bloom filter, as loaded by a `filterload` message (BIP37).
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct Filter(pub Vec<u8>);

/// The tweak added to the seed of each of a bloom filter's hash functions (BIP37).
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct Tweak(pub u32);

/// The four-byte magic value that begins every message, identifying which
/// network it belongs to.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct Magic(pub [u8; 4]);

impl From<Network> for Magic {
    fn from(network: Network) -> Magic {
        Magic(network.magic())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn nonce_roundtrips() {
        let nonce = Nonce(0x1122_3344_5566_7788);
        let bytes = nonce.bitcoin_serialize_to_vec().unwrap();
        assert_eq!(Nonce::bitcoin_deserialize(Cursor::new(&bytes)).unwrap(), nonce);
    }

    #[test]
    fn unknown_service_bits_are_truncated_not_rejected() {
        let bytes = (PeerServices::NODE_NETWORK.bits() | 0x8000_0000_0000_0000u64)
            .bitcoin_serialize_to_vec()
            .unwrap();
        let services = PeerServices::bitcoin_deserialize(Cursor::new(&bytes)).unwrap();
        assert!(services.contains(PeerServices::NODE_NETWORK));
    }

    #[test]
    fn mainnet_and_testnet_magics_differ() {
        assert_ne!(Magic::from(Network::Mainnet), Magic::from(Network::Testnet));
    }
}
