//! DNS seed discovery: the fallback peer source when no static `connect=`
//! addresses are configured.

use std::net::ToSocketAddrs;
use std::time::SystemTime;

use tracing::{debug, warn};

use wallet_chain::parameters::Network;
use wallet_network::meta_addr::MetaAddr;
use wallet_network::protocol::external::types::PeerServices;

/// Hostnames that resolve to a rotating set of full-network peers, the
/// same way Bitcoin Core seeds a fresh node.
fn seed_hostnames(network: Network) -> &'static [&'static str] {
    match network {
        Network::Mainnet => &[
            "seed.bitcoin.sipa.be",
            "dnsseed.bluematt.me",
            "dnsseed.bitcoin.dashjr.org",
            "seed.bitcoinstats.com",
            "seed.btc.petertodd.org",
        ],
        Network::Testnet => &["testnet-seed.bitcoin.jonasschnelli.ch", "seed.tbtc.petertodd.org"],
    }
}

/// Resolves every seed hostname for `network`, gathering the results into
/// a gossiped address list. A hostname that fails to resolve is skipped;
/// the daemon only fails outright if every seed does.
pub fn discover(network: Network) -> Vec<MetaAddr> {
    let now = SystemTime::now();
    let port = network.default_port();

    let mut found = Vec::new();
    for host in seed_hostnames(network) {
        let lookup = format!("{}:{}", host, port);
        match lookup.to_socket_addrs() {
            Ok(addrs) => {
                for addr in addrs {
                    debug!(%host, %addr, "resolved dns seed");
                    found.push(MetaAddr::new_gossiped(addr, PeerServices::NODE_NETWORK, now));
                }
            }
            Err(e) => warn!(%host, error = %e, "dns seed lookup failed"),
        }
    }
    found
}
