//! Command line: `walletd [PROD|TEST] [bitcoin:URI]`.

use clap::Parser;

use wallet_chain::parameters::Network;
use wallet_chain::WalletError;

#[derive(Parser, Debug)]
#[command(name = "walletd", about = "A lightweight SPV Bitcoin wallet daemon")]
pub struct Cli {
    /// Which network to connect to. Defaults to PROD (mainnet).
    #[arg(value_name = "PROD|TEST")]
    network: Option<String>,

    /// A `bitcoin:` payment URI to pay on startup; the daemon broadcasts
    /// the payment and exits once it has confirmed delivery.
    #[arg(value_name = "bitcoin:URI")]
    uri: Option<String>,
}

impl Cli {
    /// The selected network, or the parse error from an unrecognized
    /// first argument.
    pub fn network(&self) -> Result<Network, WalletError> {
        match &self.network {
            Some(raw) => raw.parse(),
            None => Ok(Network::default()),
        }
    }

    /// The payment URI, rejecting a second argument that isn't one.
    pub fn payment_uri(&self) -> Result<Option<&str>, WalletError> {
        match &self.uri {
            Some(raw) if raw.starts_with("bitcoin:") => Ok(Some(raw.as_str())),
            Some(_) => Err(WalletError::Uri(
                "second argument must be a bitcoin: uri".to_string(),
            )),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn defaults_to_mainnet_with_no_arguments() {
        let cli = Cli::parse_from(["walletd"]);
        assert_eq!(cli.network().unwrap(), Network::Mainnet);
        assert_eq!(cli.payment_uri().unwrap(), None);
    }

    #[test]
    fn parses_test_network_and_uri() {
        let cli = Cli::parse_from(["walletd", "TEST", "bitcoin:mqDxJBc77KvDc6HUVV4hA55XncSyB1tHWy"]);
        assert_eq!(cli.network().unwrap(), Network::Testnet);
        assert_eq!(
            cli.payment_uri().unwrap(),
            Some("bitcoin:mqDxJBc77KvDc6HUVV4hA55XncSyB1tHWy")
        );
    }

    #[test]
    fn rejects_unrecognized_network_name() {
        let cli = Cli::parse_from(["walletd", "REGTEST"]);
        assert!(cli.network().is_err());
    }

    #[test]
    fn rejects_second_argument_without_bitcoin_scheme() {
        let cli = Cli::parse_from(["walletd", "PROD", "not-a-uri"]);
        assert!(cli.payment_uri().is_err());
    }
}
