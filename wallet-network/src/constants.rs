//! Protocol-level constants.

use crate::protocol::external::types::ProtocolVersion;

/// The protocol version this wallet speaks.
///
/// 70001 is the floor required for `filterload`/`filteradd`/`filterclear`/
/// `merkleblock` (BIP37) support, which an SPV client cannot do without.
pub const CURRENT_VERSION: ProtocolVersion = ProtocolVersion(70_015);

/// The lowest protocol version this wallet will accept from a peer, because
/// it is the first version to support BIP37 bloom filtering.
pub const MIN_PEER_VERSION: ProtocolVersion = ProtocolVersion(70_001);

/// User agent string sent in our `version` message.
pub const USER_AGENT: &str = "/wallet-core:0.1.0/";

/// Maximum number of simultaneous outbound connections.
pub const MAX_CONNECTIONS_PER_IP: usize = 4;

/// A `ping` unanswered for this long, or any silence this long, kills the connection.
pub const HEARTBEAT_TIMEOUT_SECS: u64 = 10 * 60;

/// Silence this long triggers an outbound `ping`.
pub const HEARTBEAT_INTERVAL_SECS: u64 = 5 * 60;

/// A handshake that hasn't reached the established state within this long is fatal.
pub const HANDSHAKE_TIMEOUT_SECS: u64 = 5 * 60;

/// banScore at or above this value disconnects the peer.
pub const MAX_BAN_SCORE: u32 = 100;

/// Reactor housekeeping runs this often.
pub const HOUSEKEEPING_INTERVAL_SECS: u64 = 2 * 60;

/// Peer addresses not seen within this window are evicted (static peers exempt).
pub const PEER_ADDRESS_EVICTION_SECS: u64 = 30 * 60;

/// An inventory request outstanding longer than this is rescheduled to another peer.
pub const INVENTORY_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Maximum accepted message body length: 2 MiB.
pub const MAX_PROTOCOL_MESSAGE_LEN: usize = 2 * 1024 * 1024;

/// Target false-positive rate for the `filterload` bloom filter we install
/// on every peer. Bitcoin Core's wallet uses the same default.
pub const FILTER_FALSE_POSITIVE_RATE: f64 = 0.0001;
