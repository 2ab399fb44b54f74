//! The inventory scheduler: tracks which peer is responsible for fetching
//! each piece of advertised inventory, and re-targets requests that go
//! unanswered.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use crate::constants;

/// The two inventory kinds this wallet ever requests from peers.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum RequestKind {
    Block,
    Tx,
}

/// A single outstanding request for a piece of inventory.
#[derive(Clone, Debug)]
pub struct PeerRequest {
    pub kind: RequestKind,
    pub hash: [u8; 32],
    /// The peer whose `inv` first advertised this item.
    pub origin_peer: SocketAddr,
    /// Peers already asked for this item, most recent last.
    pub contacted_peers: Vec<SocketAddr>,
    pub sent_at: Option<Instant>,
    pub in_processing: bool,
}

impl PeerRequest {
    fn new(kind: RequestKind, hash: [u8; 32], origin_peer: SocketAddr) -> PeerRequest {
        PeerRequest {
            kind,
            hash,
            origin_peer,
            contacted_peers: Vec::new(),
            sent_at: None,
            in_processing: false,
        }
    }
}

/// Tracks inventory that has been advertised but not yet fetched
/// (`pending`), and inventory a `getdata` has already been sent for
/// (`inflight`).
///
/// A single instance is shared (behind the network layer's lock) between
/// the reactor, which advances it on a timer, and the message handler,
/// which both populates it from incoming `inv` messages and resolves
/// entries as matching payloads arrive.
#[derive(Default)]
pub struct InventoryScheduler {
    pending: VecDeque<PeerRequest>,
    inflight: Vec<PeerRequest>,
}

impl InventoryScheduler {
    pub fn new() -> InventoryScheduler {
        InventoryScheduler::default()
    }

    /// Record a newly advertised inventory item, unless it is already
    /// pending, inflight, or otherwise known.
    pub fn announce(&mut self, kind: RequestKind, hash: [u8; 32], origin_peer: SocketAddr) {
        let already_known = self.pending.iter().any(|r| r.hash == hash)
            || self.inflight.iter().any(|r| r.hash == hash);
        if !already_known {
            self.pending.push_back(PeerRequest::new(kind, hash, origin_peer));
        }
    }

    /// Dispatch every pending request that has an eligible target among
    /// `candidates`: the request's origin peer if it's connected and not
    /// yet contacted, otherwise a `NODE_NETWORK` candidate not yet
    /// contacted. A request with no eligible candidate right now is left
    /// pending for the next pass. Each returned `PeerRequest`'s
    /// `contacted_peers` ends with the peer it was just sent to.
    pub fn dispatch_ready(
        &mut self,
        candidates: &[SocketAddr],
        now: Instant,
        random_index: usize,
    ) -> Vec<PeerRequest> {
        let mut dispatched = Vec::new();
        let mut still_pending = VecDeque::with_capacity(self.pending.len());

        while let Some(mut request) = self.pending.pop_front() {
            match Self::select_target(&request, candidates, random_index) {
                Some(peer) => {
                    request.contacted_peers.push(peer);
                    request.sent_at = Some(now);
                    request.in_processing = true;
                    self.inflight.push(request.clone());
                    dispatched.push(request);
                }
                None => still_pending.push_back(request),
            }
        }

        self.pending = still_pending;
        dispatched
    }

    /// Called when the matching payload (`tx`/`merkleblock`) for a hash
    /// arrives: removes it from the inflight set.
    pub fn resolve(&mut self, hash: &[u8; 32]) {
        self.inflight.retain(|r| &r.hash != hash);
    }

    /// Move any inflight request older than the inflight timeout back onto
    /// the pending queue, so it gets retargeted at a different peer.
    ///
    /// A request with no remaining untried candidate in `candidates` (the
    /// live, connected peer set) is dropped outright instead of being
    /// requeued, and its origin peer is returned so the caller can apply
    /// the scheduling rules' ban-score penalty exactly once.
    pub fn sweep_timeouts(&mut self, now: Instant, candidates: &[SocketAddr]) -> Vec<SocketAddr> {
        let timeout = Duration::from_secs(constants::INVENTORY_REQUEST_TIMEOUT_SECS);
        let mut exhausted_origins = Vec::new();

        let mut still_inflight = Vec::with_capacity(self.inflight.len());
        for request in self.inflight.drain(..) {
            let expired = request
                .sent_at
                .map(|sent| now.duration_since(sent) >= timeout)
                .unwrap_or(false);
            if !expired {
                still_inflight.push(request);
                continue;
            }

            let mut request = request;
            request.in_processing = false;
            request.sent_at = None;

            if Self::select_target(&request, candidates, 0).is_some() {
                self.pending.push_back(request);
            } else {
                exhausted_origins.push(request.origin_peer);
            }
        }
        self.inflight = still_inflight;
        exhausted_origins
    }

    /// Pick which peer a pending request should be retargeted to: the
    /// origin peer if not yet contacted, otherwise a random `NODE_NETWORK`
    /// peer from `candidates` that hasn't been contacted yet.
    pub fn select_target(
        request: &PeerRequest,
        candidates: &[SocketAddr],
        random_index: usize,
    ) -> Option<SocketAddr> {
        if !request.contacted_peers.contains(&request.origin_peer)
            && candidates.contains(&request.origin_peer)
        {
            return Some(request.origin_peer);
        }
        let untried: Vec<SocketAddr> = candidates
            .iter()
            .copied()
            .filter(|addr| !request.contacted_peers.contains(addr))
            .collect();
        if untried.is_empty() {
            return None;
        }
        Some(untried[random_index % untried.len()])
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn inflight_len(&self) -> usize {
        self.inflight.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(port: u16) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], port))
    }

    #[test]
    fn announce_then_dispatch_moves_pending_to_inflight() {
        let mut scheduler = InventoryScheduler::new();
        scheduler.announce(RequestKind::Tx, [1; 32], addr(1));
        assert_eq!(scheduler.pending_len(), 1);

        let now = Instant::now();
        let dispatched = scheduler.dispatch_ready(&[addr(1)], now, 0);
        assert_eq!(dispatched.len(), 1);
        assert_eq!(dispatched[0].hash, [1; 32]);
        assert_eq!(dispatched[0].contacted_peers.last(), Some(&addr(1)));
        assert_eq!(scheduler.pending_len(), 0);
        assert_eq!(scheduler.inflight_len(), 1);
    }

    #[test]
    fn dispatch_ready_leaves_request_pending_with_no_eligible_candidate() {
        let mut scheduler = InventoryScheduler::new();
        scheduler.announce(RequestKind::Tx, [9; 32], addr(1));

        // Origin peer isn't connected, and there are no other candidates.
        let dispatched = scheduler.dispatch_ready(&[], Instant::now(), 0);
        assert!(dispatched.is_empty());
        assert_eq!(scheduler.pending_len(), 1);
        assert_eq!(scheduler.inflight_len(), 0);
    }

    #[test]
    fn duplicate_announcements_are_ignored() {
        let mut scheduler = InventoryScheduler::new();
        scheduler.announce(RequestKind::Block, [2; 32], addr(1));
        scheduler.announce(RequestKind::Block, [2; 32], addr(2));
        assert_eq!(scheduler.pending_len(), 1);
    }

    #[test]
    fn resolve_clears_inflight_entry() {
        let mut scheduler = InventoryScheduler::new();
        scheduler.announce(RequestKind::Tx, [3; 32], addr(1));
        scheduler.dispatch_ready(&[addr(1)], Instant::now(), 0);
        scheduler.resolve(&[3; 32]);
        assert_eq!(scheduler.inflight_len(), 0);
    }

    #[test]
    fn sweep_timeouts_retargets_when_another_candidate_remains() {
        let mut scheduler = InventoryScheduler::new();
        scheduler.announce(RequestKind::Tx, [5; 32], addr(1));
        let start = Instant::now();
        scheduler.dispatch_ready(&[addr(1)], start, 0);

        let later = start + Duration::from_secs(constants::INVENTORY_REQUEST_TIMEOUT_SECS + 1);
        let exhausted = scheduler.sweep_timeouts(later, &[addr(1), addr(2)]);
        assert!(exhausted.is_empty());
        assert_eq!(scheduler.pending_len(), 1);
        assert_eq!(scheduler.inflight_len(), 0);
    }

    #[test]
    fn sweep_timeouts_drops_request_once_every_candidate_is_contacted() {
        let mut scheduler = InventoryScheduler::new();
        scheduler.announce(RequestKind::Tx, [6; 32], addr(1));
        let start = Instant::now();
        scheduler.dispatch_ready(&[addr(1)], start, 0);

        let later = start + Duration::from_secs(constants::INVENTORY_REQUEST_TIMEOUT_SECS + 1);
        let exhausted = scheduler.sweep_timeouts(later, &[addr(1)]);
        assert_eq!(exhausted, vec![addr(1)]);
        assert_eq!(scheduler.pending_len(), 0);
        assert_eq!(scheduler.inflight_len(), 0);

        // The dropped request must not keep re-triggering the penalty.
        let exhausted_again = scheduler.sweep_timeouts(later, &[addr(1)]);
        assert!(exhausted_again.is_empty());
    }

    #[test]
    fn select_target_prefers_untried_origin() {
        let mut request = PeerRequest::new(RequestKind::Tx, [4; 32], addr(1));
        request.contacted_peers.clear();
        let candidates = vec![addr(1), addr(2)];
        assert_eq!(
            InventoryScheduler::select_target(&request, &candidates, 0),
            Some(addr(1))
        );
    }

    #[test]
    fn select_target_falls_back_to_untried_candidate() {
        let mut request = PeerRequest::new(RequestKind::Tx, [4; 32], addr(1));
        request.contacted_peers.push(addr(1));
        let candidates = vec![addr(1), addr(2)];
        assert_eq!(
            InventoryScheduler::select_target(&request, &candidates, 0),
            Some(addr(2))
        );
    }

    #[test]
    fn select_target_none_when_all_contacted() {
        let mut request = PeerRequest::new(RequestKind::Tx, [4; 32], addr(1));
        request.contacted_peers.push(addr(1));
        request.contacted_peers.push(addr(2));
        let candidates = vec![addr(1), addr(2)];
        assert_eq!(InventoryScheduler::select_target(&request, &candidates, 0), None);
    }
}
