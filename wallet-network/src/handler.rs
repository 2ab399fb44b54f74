//! Per-message reactions that are purely protocol-local: handshake
//! progression, keepalive, and address-book maintenance. Anything that
//! needs the chain state or the wallet store is handed back to the caller
//! as a [`ChainEvent`] instead of being handled here.

use std::net::SocketAddr;
use std::sync::Arc;

use wallet_chain::{block, transaction::Transaction};

use crate::constants;
use crate::meta_addr::MetaAddr;
use crate::peer::{HandshakeStage, Peer};
use crate::protocol::external::types::Nonce;
use crate::protocol::external::{GetBlocks, InventoryHash, MerkleBlock, Message, RejectReason};

/// A message that the local protocol handling can't resolve on its own and
/// must be routed to the chain engine / wallet store.
pub enum ChainEvent {
    Inventory(Vec<InventoryHash>),
    MerkleBlock(MerkleBlock),
    Tx(Arc<Transaction>),
}

/// Everything `handle` needs to follow up once a handshake completes: the
/// `filterload` to install, and the local chain tip to decide whether to
/// also ask for blocks.
pub struct HandshakeFollowUp<'a> {
    pub filter: &'a Message,
    pub local_height: u32,
    pub local_tip: Option<block::Hash>,
}

/// Dispatch a single inbound message against one peer's state.
///
/// Returns any newly discovered peer addresses (from `addr`) and, when the
/// message needs chain-level handling, the corresponding [`ChainEvent`].
pub fn handle(
    peer: &mut Peer,
    message: Message,
    follow_up: &HandshakeFollowUp,
) -> (Vec<MetaAddr>, Option<ChainEvent>) {
    match message {
        Message::Version(version) => {
            if version.version < constants::MIN_PEER_VERSION {
                warn!(peer = %peer.meta.addr, "peer protocol version too old for bloom filters");
                peer.disconnect_requested = true;
                return (Vec::new(), None);
            }
            let negotiated = version.version.min(constants::CURRENT_VERSION);
            peer.received_version(negotiated, version.services, version.best_block.0 as usize);
            peer.enqueue(Message::Verack);
            (Vec::new(), None)
        }
        Message::Verack => {
            let was_established = peer.handshake.is_established();
            peer.received_verack();
            if !was_established && peer.handshake == HandshakeStage::Established {
                // Step 6(a) of the handshake follow-up: ask for fresh
                // peers, install our watch filter, and if we're behind,
                // ask this peer to start relaying blocks from our tip.
                peer.enqueue(Message::GetAddr);
                peer.enqueue(follow_up.filter.clone());
                let remote_height = peer.remote_height.unwrap_or(0) as u32;
                if follow_up.local_height < remote_height {
                    let locator = follow_up.local_tip.into_iter().collect();
                    peer.enqueue(Message::GetBlocks(GetBlocks::new(locator, None)));
                }
            }
            (Vec::new(), None)
        }
        Message::Ping(nonce) => {
            peer.enqueue(Message::Pong(nonce));
            (Vec::new(), None)
        }
        Message::Pong(_) => {
            peer.pending_ping_sent = false;
            (Vec::new(), None)
        }
        Message::Addr(addrs) => {
            let capped: Vec<MetaAddr> = addrs.into_iter().take(1000).collect();
            (capped, None)
        }
        Message::Reject { ccode, reason, .. } => {
            debug!(peer = %peer.meta.addr, ?ccode, %reason, "peer sent reject");
            if matches!(
                ccode,
                RejectReason::Checkpoint | RejectReason::Obsolete | RejectReason::Invalid
            ) {
                peer.increase_ban_score(10);
            }
            (Vec::new(), None)
        }
        Message::GetData(_) | Message::GetBlocks(_) | Message::GetHeaders(_) => {
            // As a pure wallet client we never relay; reply that we have
            // nothing rather than staying silent.
            peer.enqueue(Message::NotFound(Vec::new()));
            (Vec::new(), None)
        }
        Message::Headers(_) => {
            // Not expected once the wallet only ever requests merkle
            // blocks; ignore.
            (Vec::new(), None)
        }
        Message::Inv(entries) => (Vec::new(), Some(ChainEvent::Inventory(entries))),
        Message::MerkleBlock(block) => (Vec::new(), Some(ChainEvent::MerkleBlock(block))),
        Message::Tx(tx) => (Vec::new(), Some(ChainEvent::Tx(tx))),
        Message::NotFound(_) => (Vec::new(), None),
        Message::GetAddr | Message::FilterLoad { .. } | Message::Alert(_) => (Vec::new(), None),
    }
}

/// A fresh nonce for an outbound `ping`.
pub fn ping_nonce() -> Nonce {
    Nonce(rand::random())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta_addr::MetaAddr;
    use crate::protocol::external::types::PeerServices;
    use mio::net::TcpStream;
    use std::net::{IpAddr, Ipv4Addr};

    fn test_peer() -> Peer {
        // A loopback connect that will fail asynchronously is fine here:
        // we never drive the socket's readiness in these unit tests.
        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 18444);
        let socket = TcpStream::connect(addr).expect("non-blocking connect always returns Ok");
        Peer::new(MetaAddr::new_gossiped(addr, PeerServices::empty(), std::time::SystemTime::now()), socket)
    }

    fn test_filter_load() -> Message {
        Message::FilterLoad {
            filter: crate::protocol::external::types::Filter(vec![0u8; 8]),
            hash_functions_count: 3,
            tweak: crate::protocol::external::types::Tweak(0),
            flags: 0,
        }
    }

    fn no_follow_up(filter: &Message) -> HandshakeFollowUp<'_> {
        HandshakeFollowUp { filter, local_height: 0, local_tip: None }
    }

    #[test]
    fn ping_is_answered_with_pong() {
        let mut peer = test_peer();
        let filter = test_filter_load();
        let (_, event) = handle(&mut peer, Message::Ping(Nonce(42)), &no_follow_up(&filter));
        assert!(event.is_none());
        assert!(matches!(peer.output_queue.pop_front(), Some(Message::Pong(Nonce(42)))));
    }

    #[test]
    fn pong_clears_pending_flag() {
        let mut peer = test_peer();
        let filter = test_filter_load();
        peer.pending_ping_sent = true;
        handle(&mut peer, Message::Pong(Nonce(1)), &no_follow_up(&filter));
        assert!(!peer.pending_ping_sent);
    }

    #[test]
    fn reject_checkpoint_raises_ban_score() {
        let mut peer = test_peer();
        let filter = test_filter_load();
        handle(
            &mut peer,
            Message::Reject {
                message: "getheaders".into(),
                ccode: RejectReason::Checkpoint,
                reason: "bad checkpoint".into(),
                data: None,
            },
            &no_follow_up(&filter),
        );
        assert_eq!(peer.ban_score, 10);
    }

    #[test]
    fn addr_is_capped_at_one_thousand_entries() {
        let mut peer = test_peer();
        let filter = test_filter_load();
        let addrs: Vec<MetaAddr> = (0..1500)
            .map(|i| {
                MetaAddr::new_gossiped(
                    SocketAddr::new(IpAddr::V4(Ipv4Addr::new(10, 0, (i / 256) as u8, (i % 256) as u8)), 8333),
                    PeerServices::NODE_NETWORK,
                    std::time::SystemTime::now(),
                )
            })
            .collect();
        let (new_addrs, _) = handle(&mut peer, Message::Addr(addrs), &no_follow_up(&filter));
        assert_eq!(new_addrs.len(), 1000);
    }

    #[test]
    fn handshake_completion_sends_getaddr_and_filterload() {
        let mut peer = test_peer();
        peer.sent_version();
        peer.received_version(
            constants::CURRENT_VERSION,
            PeerServices::NODE_NETWORK,
            0,
        );
        let filter = test_filter_load();
        handle(&mut peer, Message::Verack, &no_follow_up(&filter));

        assert!(peer.handshake.is_established());
        assert!(matches!(peer.output_queue.pop_front(), Some(Message::GetAddr)));
        assert!(matches!(peer.output_queue.pop_front(), Some(Message::FilterLoad { .. })));
        assert!(peer.output_queue.is_empty());
    }

    #[test]
    fn handshake_completion_requests_blocks_when_behind() {
        let mut peer = test_peer();
        peer.sent_version();
        peer.received_version(
            constants::CURRENT_VERSION,
            PeerServices::NODE_NETWORK,
            100,
        );
        let filter = test_filter_load();
        let follow_up = HandshakeFollowUp { filter: &filter, local_height: 1, local_tip: None };
        handle(&mut peer, Message::Verack, &follow_up);

        peer.output_queue.pop_front(); // getaddr
        peer.output_queue.pop_front(); // filterload
        assert!(matches!(peer.output_queue.pop_front(), Some(Message::GetBlocks(_))));
    }

    #[test]
    fn handshake_completion_is_a_one_time_event() {
        let mut peer = test_peer();
        peer.sent_version();
        peer.received_version(
            constants::CURRENT_VERSION,
            PeerServices::NODE_NETWORK,
            0,
        );
        let filter = test_filter_load();
        handle(&mut peer, Message::Verack, &no_follow_up(&filter));
        peer.output_queue.clear();

        // A redundant verack after the handshake is already established
        // must not re-send the follow-up messages.
        handle(&mut peer, Message::Verack, &no_follow_up(&filter));
        assert!(peer.output_queue.is_empty());
    }
}
