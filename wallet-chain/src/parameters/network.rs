//! Which Bitcoin network the wallet is operating on.

use std::fmt;
use std::str::FromStr;

#[cfg(any(test, feature = "proptest-impl"))]
use proptest_derive::Arbitrary;

use crate::block;

/// The Bitcoin network a wallet instance is configured against.
///
/// The CLI and config file spell these `PROD`/`TEST`; internally we use the
/// conventional Rust names.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[cfg_attr(any(test, feature = "proptest-impl"), derive(Arbitrary))]
pub enum Network {
    Mainnet,
    Testnet,
}

impl Default for Network {
    fn default() -> Self {
        Network::Mainnet
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Network::Mainnet => write!(f, "PROD"),
            Network::Testnet => write!(f, "TEST"),
        }
    }
}

impl FromStr for Network {
    type Err = crate::WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PROD" | "mainnet" | "main" => Ok(Network::Mainnet),
            "TEST" | "testnet" | "test" => Ok(Network::Testnet),
            _ => Err(crate::WalletError::Malformed("unrecognized network name")),
        }
    }
}

impl Network {
    /// The four magic bytes that prefix every wire message, used to reject
    /// peers or data from the wrong network.
    pub fn magic(&self) -> [u8; 4] {
        match self {
            Network::Mainnet => [0xF9, 0xBE, 0xB4, 0xD9],
            Network::Testnet => [0x0B, 0x11, 0x09, 0x07],
        }
    }

    /// The network's default P2P listening port.
    pub fn default_port(&self) -> u16 {
        match self {
            Network::Mainnet => 8333,
            Network::Testnet => 18333,
        }
    }

    /// Known-good (height, hash) pairs. A header at one of these heights
    /// that doesn't hash to the paired value is rejected outright, without
    /// needing to validate proof-of-work back to genesis.
    pub fn checkpoints(&self) -> &'static [(block::Height, &'static str)] {
        match self {
            Network::Mainnet => &[(
                block::Height(100_000),
                "000000000003ba27aa200b1cecaad478d2b00432346c3f1f3986da1afd33e506",
            )],
            Network::Testnet => &[],
        }
    }

    /// The highest checkpoint at or below `height`, if any.
    pub fn checkpoint_at_or_below(&self, height: block::Height) -> Option<(block::Height, block::Hash)> {
        self.checkpoints()
            .iter()
            .filter(|(checkpoint_height, _)| checkpoint_height.0 <= height.0)
            .max_by_key(|(checkpoint_height, _)| checkpoint_height.0)
            .map(|(checkpoint_height, hash)| {
                (*checkpoint_height, hash.parse().expect("hard-coded hash parses"))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mainnet_checkpoint_100000_is_known() {
        let network = Network::Mainnet;
        let (height, _hash) = network
            .checkpoint_at_or_below(block::Height(100_500))
            .expect("mainnet has a checkpoint below height 100500");
        assert_eq!(height, block::Height(100_000));
    }

    #[test]
    fn no_checkpoint_below_genesis() {
        assert_eq!(
            Network::Testnet.checkpoint_at_or_below(block::Height(50)),
            None
        );
    }
}
