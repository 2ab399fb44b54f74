//! Known peer addresses: seeds from DNS, `addr` gossip, or the static
//! configuration list.

use std::io::{Read, Write};
use std::net::{IpAddr, SocketAddr};
use std::time::{SystemTime, UNIX_EPOCH};

use bitcoin_serde_derive::{BtcDeserialize, BtcSerialize};
use wallet_chain::{BitcoinDeserialize, BitcoinSerialize, SerializationError};

use crate::protocol::external::types::PeerServices;

/// An address a peer may be reached at, plus the bookkeeping the network
/// layer keeps about it.
///
/// Equality and hashing are based on `(address, port)` only — `lastSeen`,
/// `services`, and the connection flags do not participate, so that a
/// `HashSet<MetaAddr>` naturally de-duplicates gossiped addresses for the
/// same peer.
#[derive(Clone, Debug)]
pub struct MetaAddr {
    pub addr: SocketAddr,
    pub last_seen: SystemTime,
    pub services: PeerServices,
    /// Statically configured peers are never evicted and are preferred
    /// outbound targets in `-connect`-only mode.
    pub is_static: bool,
    pub is_connected: bool,
}

impl MetaAddr {
    pub fn new_gossiped(addr: SocketAddr, services: PeerServices, last_seen: SystemTime) -> Self {
        MetaAddr {
            addr,
            last_seen,
            services,
            is_static: false,
            is_connected: false,
        }
    }

    pub fn new_static(addr: SocketAddr) -> Self {
        MetaAddr {
            addr,
            last_seen: SystemTime::now(),
            services: PeerServices::NODE_NETWORK,
            is_static: true,
            is_connected: false,
        }
    }

    pub fn is_ipv4(&self) -> bool {
        matches!(self.addr.ip(), IpAddr::V4(_))
    }

    pub fn seconds_since_seen(&self, now: SystemTime) -> u64 {
        now.duration_since(self.last_seen)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

impl PartialEq for MetaAddr {
    fn eq(&self, other: &Self) -> bool {
        self.addr == other.addr
    }
}
impl Eq for MetaAddr {}

impl std::hash::Hash for MetaAddr {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.addr.hash(state)
    }
}

/// The wire encoding of a gossiped address entry, as carried in an `addr`
/// message: a four-byte Unix timestamp followed by the `(services, addr)`
/// pair used in `version` messages.
#[derive(Clone, Debug, PartialEq, Eq, BtcSerialize, BtcDeserialize)]
struct WireMetaAddr {
    timestamp: u32,
    services: PeerServices,
    addr: SocketAddr,
}

impl BitcoinSerialize for MetaAddr {
    fn bitcoin_serialize<W: Write>(&self, writer: W) -> Result<(), std::io::Error> {
        let timestamp = self
            .last_seen
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as u32)
            .unwrap_or(0);
        WireMetaAddr {
            timestamp,
            services: self.services,
            addr: self.addr,
        }
        .bitcoin_serialize(writer)
    }
}

impl BitcoinDeserialize for MetaAddr {
    fn bitcoin_deserialize<R: Read>(reader: R) -> Result<Self, SerializationError> {
        let wire = WireMetaAddr::bitcoin_deserialize(reader)?;
        Ok(MetaAddr {
            addr: wire.addr,
            last_seen: UNIX_EPOCH + std::time::Duration::from_secs(wire.timestamp as u64),
            services: wire.services,
            is_static: false,
            is_connected: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::net::Ipv4Addr;

    #[test]
    fn equality_ignores_last_seen_and_services() {
        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(1, 2, 3, 4)), 8333);
        let a = MetaAddr::new_gossiped(addr, PeerServices::NODE_NETWORK, SystemTime::now());
        let b = MetaAddr::new_gossiped(addr, PeerServices::empty(), UNIX_EPOCH);
        assert_eq!(a, b);
    }

    #[test]
    fn roundtrips_through_wire_format() {
        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8)), 18333);
        let meta = MetaAddr::new_gossiped(addr, PeerServices::NODE_NETWORK, SystemTime::now());
        let bytes = meta.bitcoin_serialize_to_vec().unwrap();
        let parsed = MetaAddr::bitcoin_deserialize(Cursor::new(&bytes)).unwrap();
        assert_eq!(parsed.addr, meta.addr);
        assert_eq!(parsed.services, meta.services);
    }
}
