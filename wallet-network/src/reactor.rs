//! The single-threaded I/O reactor: owns every peer socket, drives the
//! wire codec, and runs the periodic housekeeping that keeps the peer set
//! healthy.
//!
//! This thread is deliberately synchronous. The wallet only ever talks to
//! a handful of peers, so an `mio` poll loop over plain blocking-free
//! sockets is simpler to reason about than pulling in an async runtime for
//! a handful of concurrent connections.

use std::collections::HashMap;
use std::io::{self, Read, Write};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::mpsc::{Receiver, Sender, TryRecvError};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use mio::net::{TcpListener, TcpStream};
use mio::{Events, Interest, Poll, Token};
use rand::Rng;
use tokio_util::codec::{Decoder, Encoder};

use wallet_chain::block;
use wallet_chain::parameters::Network;
use wallet_chain::transaction::Transaction;

use crate::constants;
use crate::error::NetworkError;
use crate::handler::{self, ChainEvent};
use crate::meta_addr::MetaAddr;
use crate::peer::Peer;
use crate::protocol::external::types::{Nonce, PeerServices};
use crate::protocol::external::{Message, Version};
use crate::scheduler::InventoryScheduler;

const LISTENER_TOKEN: Token = Token(usize::MAX);

/// Events that need the chain engine or wallet store are handed to the
/// message handler over this channel; everything protocol-local (pings,
/// handshake progress, address gossip) is applied to the `Peer` directly
/// in this thread, since it needs no I/O or store access.
///
/// A bounded channel applies natural back-pressure to the reactor, which
/// simply stops reading from a peer's socket once the channel is full.
pub type InboundSender = Sender<(SocketAddr, ChainEvent)>;

/// Drives every peer connection from a single thread.
pub struct Reactor {
    poll: Poll,
    peers: HashMap<Token, Peer>,
    next_token: usize,
    listener: Option<TcpListener>,
    known_addrs: Vec<MetaAddr>,
    static_only: bool,
    scheduler: Arc<Mutex<InventoryScheduler>>,
    inbound: InboundSender,
    network: Network,
    /// The wallet's own best-known height, kept up to date by whichever
    /// thread advances the chain; read here only to fill in outbound
    /// `version` messages.
    best_block: Arc<AtomicU32>,
    /// The wallet's own chain tip hash, used as the locator when asking a
    /// freshly handshaked peer to relay blocks we're behind on.
    chain_tip: Arc<Mutex<Option<block::Hash>>>,
    /// The `filterload` sent to every peer once its handshake completes,
    /// built once from the wallet's watched scripts/outpoints.
    filter: Message,
    /// Transactions the wallet has built and wants fanned out to every
    /// established peer.
    broadcast: Receiver<Arc<Transaction>>,
}

impl Reactor {
    pub fn new(
        listen_addr: Option<SocketAddr>,
        known_addrs: Vec<MetaAddr>,
        static_only: bool,
        scheduler: Arc<Mutex<InventoryScheduler>>,
        inbound: InboundSender,
        network: Network,
        best_block: Arc<AtomicU32>,
        chain_tip: Arc<Mutex<Option<block::Hash>>>,
        filter: Message,
        broadcast: Receiver<Arc<Transaction>>,
    ) -> io::Result<Reactor> {
        let poll = Poll::new()?;
        let listener = match listen_addr {
            Some(addr) => {
                let mut listener = TcpListener::bind(addr)?;
                poll.registry()
                    .register(&mut listener, LISTENER_TOKEN, Interest::READABLE)?;
                Some(listener)
            }
            None => None,
        };
        Ok(Reactor {
            poll,
            peers: HashMap::new(),
            next_token: 0,
            listener,
            known_addrs,
            static_only,
            scheduler,
            inbound,
            network,
            best_block,
            chain_tip,
            filter,
            broadcast,
        })
    }

    fn established_count(&self) -> usize {
        self.peers.values().filter(|p| p.handshake.is_established()).count()
    }

    fn next_token(&mut self) -> Token {
        let token = Token(self.next_token);
        self.next_token += 1;
        token
    }

    /// Uniformly-random outbound candidate selection: scan forward from a
    /// random starting index, wrapping once, for the first IPv4 address
    /// that is not already connected (and, in static-only mode, that is
    /// flagged static).
    fn select_outbound_candidate(&self) -> Option<MetaAddr> {
        let candidates: Vec<&MetaAddr> = self
            .known_addrs
            .iter()
            .filter(|m| m.is_ipv4() && !m.is_connected)
            .filter(|m| !self.static_only || m.is_static)
            .collect();
        if candidates.is_empty() {
            return None;
        }
        let start = rand::thread_rng().gen_range(0..candidates.len());
        let len = candidates.len();
        for offset in 0..len {
            let candidate = candidates[(start + offset) % len];
            if !self.peers.values().any(|p| p.meta.addr == candidate.addr) {
                return Some(candidate.clone());
            }
        }
        None
    }

    /// Our half of the version handshake, addressed to `their_addr`.
    fn version_message(&self, their_addr: SocketAddr) -> Message {
        let our_addr = SocketAddr::from(([0, 0, 0, 0], self.network.default_port()));
        Message::Version(Version::new(
            constants::CURRENT_VERSION,
            their_addr,
            PeerServices::NODE_NETWORK,
            PeerServices::NODE_NETWORK,
            our_addr,
            Nonce(rand::thread_rng().gen()),
            constants::USER_AGENT.to_string(),
            block::Height(self.best_block.load(Ordering::Relaxed)),
            true,
        ))
    }

    fn connect_outbound(&mut self) -> io::Result<()> {
        let candidate = match self.select_outbound_candidate() {
            Some(c) => c,
            None => {
                trace!("no outbound connection candidate available");
                return Ok(());
            }
        };
        let mut socket = TcpStream::connect(candidate.addr)?;
        let token = self.next_token();
        self.poll
            .registry()
            .register(&mut socket, token, Interest::READABLE | Interest::WRITABLE)?;
        let version = self.version_message(candidate.addr);
        let mut peer = Peer::new(candidate, socket);
        peer.enqueue(version);
        peer.sent_version();
        self.peers.insert(token, peer);
        Ok(())
    }

    fn accept_inbound(&mut self) -> io::Result<()> {
        let listener = match &self.listener {
            Some(l) => l,
            None => return Ok(()),
        };
        loop {
            match listener.accept() {
                Ok((mut socket, addr)) => {
                    let token = self.next_token();
                    self.poll
                        .registry()
                        .register(&mut socket, token, Interest::READABLE | Interest::WRITABLE)?;
                    let meta = MetaAddr::new_gossiped(
                        addr,
                        crate::protocol::external::types::PeerServices::empty(),
                        std::time::SystemTime::now(),
                    );
                    let version = self.version_message(addr);
                    let mut peer = Peer::new(meta, socket);
                    peer.enqueue(version);
                    peer.sent_version();
                    self.peers.insert(token, peer);
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Read any available bytes from `token`'s socket, decode as many
    /// complete messages as possible, and forward them to the message
    /// handler channel.
    fn handle_readable(&mut self, token: Token) -> Result<(), NetworkError> {
        let peer = match self.peers.get_mut(&token) {
            Some(p) => p,
            None => return Ok(()),
        };

        let mut buf = [0u8; 8192];
        loop {
            match peer.socket.read(&mut buf) {
                Ok(0) => {
                    peer.disconnect_requested = true;
                    break;
                }
                Ok(n) => peer.input_buffer.extend_from_slice(&buf[..n]),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) => return Err(NetworkError::Io(e)),
            }
        }

        let follow_up = handler::HandshakeFollowUp {
            filter: &self.filter,
            local_height: self.best_block.load(Ordering::Relaxed),
            local_tip: *self.chain_tip.lock().expect("chain tip lock poisoned"),
        };

        let mut new_addrs = Vec::new();
        loop {
            match peer.codec.decode(&mut peer.input_buffer) {
                Ok(Some(message)) => {
                    peer.touch();
                    peer.pending_ping_sent = false;
                    let (gossiped, event) = handler::handle(peer, message, &follow_up);
                    new_addrs.extend(gossiped);
                    if let Some(event) = event {
                        if self.inbound.send((peer.meta.addr, event)).is_err() {
                            // Message handler has shut down; stop reading.
                            break;
                        }
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    peer.increase_ban_score(10);
                    return Err(NetworkError::from(e));
                }
            }
        }
        self.known_addrs.extend(new_addrs);
        Ok(())
    }

    fn handle_writable(&mut self, token: Token) -> Result<(), NetworkError> {
        let peer = match self.peers.get_mut(&token) {
            Some(p) => p,
            None => return Ok(()),
        };
        while let Some(message) = peer.output_queue.pop_front() {
            peer.codec
                .encode(message, &mut peer.output_buffer)
                .map_err(NetworkError::from)?;
        }
        while !peer.output_buffer.is_empty() {
            match peer.socket.write(&peer.output_buffer) {
                Ok(0) => break,
                Ok(n) => {
                    let _ = peer.output_buffer.split_to(n);
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) => return Err(NetworkError::Io(e)),
            }
        }
        Ok(())
    }

    /// The periodic maintenance pass: handshake/heartbeat timeouts, address
    /// book eviction, scheduler sweeps, and opening new outbound slots.
    fn housekeeping(&mut self) {
        let now = Instant::now();
        let sys_now = std::time::SystemTime::now();

        let dead: Vec<Token> = self
            .peers
            .iter()
            .filter(|(_, p)| {
                p.disconnect_requested
                    || p.is_heartbeat_expired(now)
                    || p.is_handshake_expired(now)
            })
            .map(|(t, _)| *t)
            .collect();
        for token in dead {
            if let Some(mut peer) = self.peers.remove(&token) {
                debug!(peer = %peer.meta.addr, "disconnecting peer");
                let _ = self.poll.registry().deregister(&mut peer.socket);
            }
        }

        for peer in self.peers.values_mut() {
            if peer.needs_heartbeat_ping(now) {
                peer.enqueue(Message::Ping(crate::protocol::external::types::Nonce(
                    rand::thread_rng().gen(),
                )));
                peer.pending_ping_sent = true;
            }
        }

        self.known_addrs.retain(|m| {
            m.is_static
                || m.is_connected
                || m.seconds_since_seen(sys_now) < constants::PEER_ADDRESS_EVICTION_SECS
        });

        {
            let mut scheduler = self.scheduler.lock().expect("scheduler lock poisoned");

            // Only an established, NODE_NETWORK-advertising peer is ever an
            // eligible retarget candidate for a block/tx request.
            let candidates: Vec<SocketAddr> = self
                .peers
                .values()
                .filter(|p| p.handshake.is_established() && p.provides_full_network())
                .map(|p| p.meta.addr)
                .collect();

            let exhausted = scheduler.sweep_timeouts(now, &candidates);
            for origin in exhausted {
                if let Some(peer) = self.peers.values_mut().find(|p| p.meta.addr == origin) {
                    peer.increase_ban_score(2);
                }
            }

            // Dispatch every pending request that has an eligible target:
            // its origin peer first if still connected and untried,
            // otherwise a random untried NODE_NETWORK candidate.
            let random_index = rand::thread_rng().gen::<usize>();
            for request in scheduler.dispatch_ready(&candidates, now, random_index) {
                let target = *request
                    .contacted_peers
                    .last()
                    .expect("dispatch_ready only returns requests it just targeted");
                let kind = match request.kind {
                    crate::scheduler::RequestKind::Tx => {
                        crate::protocol::external::InventoryHash::Tx(
                            wallet_chain::transaction::Hash(request.hash),
                        )
                    }
                    crate::scheduler::RequestKind::Block => {
                        crate::protocol::external::InventoryHash::FilteredBlock(
                            block::Hash(request.hash),
                        )
                    }
                };
                if let Some(peer) = self.peers.values_mut().find(|p| p.meta.addr == target) {
                    peer.enqueue(Message::GetData(vec![kind]));
                }
            }
        }

        if self.established_count() < constants::MAX_CONNECTIONS_PER_IP {
            if let Err(e) = self.connect_outbound() {
                warn!(error = %e, "failed to open outbound connection");
            }
        }
    }

    /// Run the event loop until `shutdown` is set.
    pub fn run(&mut self, shutdown: Arc<std::sync::atomic::AtomicBool>) -> io::Result<()> {
        use std::sync::atomic::Ordering;

        let mut events = Events::with_capacity(1024);
        let housekeeping_interval = Duration::from_secs(constants::HOUSEKEEPING_INTERVAL_SECS);
        let mut last_housekeeping = Instant::now();

        while !shutdown.load(Ordering::Relaxed) {
            self.poll.poll(&mut events, Some(housekeeping_interval))?;

            for event in events.iter() {
                match event.token() {
                    LISTENER_TOKEN => {
                        if let Err(e) = self.accept_inbound() {
                            warn!(error = %e, "error accepting inbound connection");
                        }
                    }
                    token => {
                        if event.is_readable() {
                            if let Err(e) = self.handle_readable(token) {
                                warn!(error = %e, "error reading from peer");
                            }
                        }
                        if event.is_writable() {
                            if let Err(e) = self.handle_writable(token) {
                                warn!(error = %e, "error writing to peer");
                            }
                        }
                    }
                }
            }

            if last_housekeeping.elapsed() >= housekeeping_interval {
                self.housekeeping();
                last_housekeeping = Instant::now();
            }

            self.drain_broadcasts();
        }
        Ok(())
    }

    /// Fan a freshly built transaction out to every established peer.
    fn drain_broadcasts(&mut self) {
        loop {
            let tx = match self.broadcast.try_recv() {
                Ok(tx) => tx,
                Err(TryRecvError::Empty) => return,
                Err(TryRecvError::Disconnected) => return,
            };
            for peer in self.peers.values_mut() {
                if peer.handshake.is_established() {
                    peer.enqueue(Message::Tx(tx.clone()));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::external::types::PeerServices;

    fn meta(port: u16, is_static: bool) -> MetaAddr {
        let addr = SocketAddr::from(([127, 0, 0, 1], port));
        let mut m = MetaAddr::new_gossiped(addr, PeerServices::NODE_NETWORK, std::time::SystemTime::now());
        if is_static {
            m = MetaAddr::new_static(addr);
        }
        m
    }

    #[test]
    fn candidate_selection_respects_static_only_mode() {
        let (tx, _rx) = std::sync::mpsc::channel();
        let scheduler = Arc::new(Mutex::new(InventoryScheduler::new()));
        let mut reactor = Reactor::new(
            None,
            vec![meta(1, false), meta(2, true)],
            true,
            scheduler,
            tx,
            Network::Mainnet,
            Arc::new(AtomicU32::new(0)),
            std::sync::mpsc::channel().1,
        )
        .unwrap();
        reactor.static_only = true;
        let candidate = reactor.select_outbound_candidate().unwrap();
        assert!(candidate.is_static);
    }

    #[test]
    fn candidate_selection_skips_already_connected_peers() {
        let (tx, _rx) = std::sync::mpsc::channel();
        let scheduler = Arc::new(Mutex::new(InventoryScheduler::new()));
        let reactor = Reactor::new(
            None,
            vec![meta(1, false)],
            false,
            scheduler,
            tx,
            Network::Mainnet,
            Arc::new(AtomicU32::new(0)),
            std::sync::mpsc::channel().1,
        )
        .unwrap();
        assert!(reactor.select_outbound_candidate().is_some());
    }
}
