//! The per-connection state a `Peer` carries: its address, handshake
//! progress, negotiated parameters, and queued I/O.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use bytes::BytesMut;
use mio::net::TcpStream;

use crate::constants;
use crate::meta_addr::MetaAddr;
use crate::protocol::external::types::{PeerServices, ProtocolVersion};
use crate::protocol::external::{Codec, Message};

/// Handshake progress, advancing S0 -> S1 -> S2 -> S3 as described in the
/// component design for the peer state machine.
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
pub enum HandshakeStage {
    /// No message exchanged yet.
    Start,
    /// We've sent our `version`.
    SentVersion,
    /// We've also received the remote `version`.
    ReceivedVersion,
    /// `verack` has been exchanged in both directions; all other messages
    /// may now be sent and accepted.
    Established,
}

impl HandshakeStage {
    pub fn is_established(self) -> bool {
        self == HandshakeStage::Established
    }
}

/// A single peer connection: its socket, buffered I/O, and protocol state.
///
/// Everything here is only ever mutated by the reactor thread, or by other
/// threads while holding the network layer's global lock — see the
/// concurrency model.
pub struct Peer {
    pub meta: MetaAddr,
    pub socket: TcpStream,

    /// Bytes read from the socket that haven't yet been decoded into a
    /// complete message.
    pub input_buffer: BytesMut,
    /// Bytes encoded and waiting to be written to the socket.
    pub output_buffer: BytesMut,
    /// Messages queued for encoding, in send order.
    pub output_queue: VecDeque<Message>,
    /// Persists decode state (and, post-handshake, the negotiated protocol
    /// version) across separate socket reads.
    pub codec: Codec,

    pub handshake: HandshakeStage,
    pub negotiated_version: Option<ProtocolVersion>,
    pub services: PeerServices,
    pub remote_height: Option<usize>,

    pub ban_score: u32,
    pub pending_ping_sent: bool,
    pub disconnect_requested: bool,

    pub connected_at: Instant,
    pub last_message_at: Instant,
    pub handshake_started_at: Instant,
}

impl Peer {
    pub fn new(meta: MetaAddr, socket: TcpStream) -> Peer {
        let now = Instant::now();
        Peer {
            meta,
            socket,
            input_buffer: BytesMut::with_capacity(4096),
            output_buffer: BytesMut::new(),
            output_queue: VecDeque::new(),
            codec: Codec::builder().finish(),
            handshake: HandshakeStage::Start,
            negotiated_version: None,
            services: PeerServices::empty(),
            remote_height: None,
            ban_score: 0,
            pending_ping_sent: false,
            disconnect_requested: false,
            connected_at: now,
            last_message_at: now,
            handshake_started_at: now,
        }
    }

    /// Queue a message for the next write-ready iteration, and mark this
    /// connection as having fresh outbound work.
    pub fn enqueue(&mut self, message: Message) {
        self.output_queue.push_back(message);
    }

    pub fn increase_ban_score(&mut self, amount: u32) {
        self.ban_score = self.ban_score.saturating_add(amount);
        if self.ban_score >= constants::MAX_BAN_SCORE {
            self.disconnect_requested = true;
        }
    }

    pub fn touch(&mut self) {
        self.last_message_at = Instant::now();
    }

    /// A `ping` unanswered for `HEARTBEAT_TIMEOUT_SECS`, or any silence that
    /// long, is fatal.
    pub fn is_heartbeat_expired(&self, now: Instant) -> bool {
        now.duration_since(self.last_message_at)
            >= Duration::from_secs(constants::HEARTBEAT_TIMEOUT_SECS)
    }

    /// Silence of `HEARTBEAT_INTERVAL_SECS` should trigger an outbound `ping`.
    pub fn needs_heartbeat_ping(&self, now: Instant) -> bool {
        !self.pending_ping_sent
            && now.duration_since(self.last_message_at)
                >= Duration::from_secs(constants::HEARTBEAT_INTERVAL_SECS)
    }

    /// A handshake that hasn't reached `Established` within
    /// `HANDSHAKE_TIMEOUT_SECS` is fatal.
    pub fn is_handshake_expired(&self, now: Instant) -> bool {
        !self.handshake.is_established()
            && now.duration_since(self.handshake_started_at)
                >= Duration::from_secs(constants::HANDSHAKE_TIMEOUT_SECS)
    }

    /// Advance the handshake counter on sending our `version`.
    pub fn sent_version(&mut self) {
        if self.handshake == HandshakeStage::Start {
            self.handshake = HandshakeStage::SentVersion;
        }
    }

    /// Advance the handshake counter on receiving the remote `version`.
    pub fn received_version(
        &mut self,
        version: ProtocolVersion,
        services: PeerServices,
        remote_height: usize,
    ) {
        self.negotiated_version = Some(version);
        self.services = services;
        self.remote_height = Some(remote_height);
        self.codec.reconfigure_version(version);
        if self.handshake < HandshakeStage::ReceivedVersion {
            self.handshake = HandshakeStage::ReceivedVersion;
        }
    }

    /// Advance (or complete) the handshake counter on a `verack`.
    pub fn received_verack(&mut self) {
        if self.handshake >= HandshakeStage::SentVersion {
            self.handshake = HandshakeStage::Established;
        }
    }

    pub fn provides_full_network(&self) -> bool {
        self.services.contains(PeerServices::NODE_NETWORK)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handshake_stage_orders_as_expected() {
        assert!(HandshakeStage::Start < HandshakeStage::SentVersion);
        assert!(HandshakeStage::SentVersion < HandshakeStage::ReceivedVersion);
        assert!(HandshakeStage::ReceivedVersion < HandshakeStage::Established);
    }
}
