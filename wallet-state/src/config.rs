//! Storage configuration: where the wallet database lives on disk.

use std::path::PathBuf;

use wallet_chain::parameters::Network;

/// Where the wallet keeps its `sled` database, and which network it's for.
///
/// The default data directory follows the platform convention via `dirs`
/// (e.g. `~/.local/share/wallet` on Linux), with a per-network
/// subdirectory so mainnet and testnet databases never collide.
#[derive(Clone, Debug)]
pub struct Config {
    pub data_dir: PathBuf,
    pub network: Network,
}

fn default_cache_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("wallet")
}

impl Config {
    /// The default configuration for `network`, rooted at the platform data
    /// directory.
    pub fn new(network: Network) -> Config {
        Config {
            data_dir: default_cache_dir().join(network_dir_name(network)),
            network,
        }
    }

    /// The same configuration, but rooted at `data_dir` instead of the
    /// platform default. Used by tests and by `--datadir` overrides.
    pub fn with_data_dir(network: Network, data_dir: PathBuf) -> Config {
        Config { data_dir, network }
    }
}

impl Default for Config {
    fn default() -> Config {
        Config::new(Network::default())
    }
}

fn network_dir_name(network: Network) -> &'static str {
    match network {
        Network::Mainnet => "mainnet",
        Network::Testnet => "testnet",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mainnet_and_testnet_use_distinct_subdirectories() {
        let mainnet = Config::new(Network::Mainnet);
        let testnet = Config::new(Network::Testnet);
        assert_ne!(mainnet.data_dir, testnet.data_dir);
    }
}
