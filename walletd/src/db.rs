//! The database thread: the only thread that touches the wallet store.
//!
//! Offloading store commits here keeps the message-handler thread free to
//! keep draining the reactor's inbound channel, so a slow write never
//! stalls message dispatch.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::mpsc::Receiver;
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use wallet_chain::block;
use wallet_chain::parameters::Network;
use wallet_chain::transaction::Transaction;
use wallet_consensus::{chain::OrphanPool, merkle_block, tx, ConnectOutcome};
use wallet_network::protocol::external::MerkleBlock;
use wallet_network::{InventoryScheduler, RequestKind};
use wallet_state::WalletStore;

/// Work handed from the message handler to this thread. Carries the peer
/// a payload arrived from, so a header with a missing parent can be
/// re-requested from the same peer.
pub enum DbJob {
    MerkleBlock { origin: SocketAddr, block: MerkleBlock },
    Tx { origin: SocketAddr, tx: Arc<Transaction> },
}

/// Runs until `jobs` is disconnected (the message-handler thread exited
/// at shutdown), processing one job at a time against `store`.
pub fn run(
    store: Arc<dyn WalletStore + Send + Sync>,
    network: Network,
    scheduler: Arc<Mutex<InventoryScheduler>>,
    best_block: Arc<AtomicU32>,
    chain_tip: Arc<Mutex<Option<block::Hash>>>,
    jobs: Receiver<DbJob>,
) {
    let mut orphans = OrphanPool::new();

    while let Ok(job) = jobs.recv() {
        match job {
            DbJob::MerkleBlock { origin, block } => {
                handle_merkle_block(
                    store.as_ref(),
                    &mut orphans,
                    network,
                    &scheduler,
                    &best_block,
                    &chain_tip,
                    origin,
                    block,
                );
            }
            DbJob::Tx { origin, tx: transaction } => {
                handle_tx(store.as_ref(), network, &scheduler, origin, transaction);
            }
        }
    }
}

fn handle_merkle_block(
    store: &dyn WalletStore,
    orphans: &mut OrphanPool,
    network: Network,
    scheduler: &Mutex<InventoryScheduler>,
    best_block: &AtomicU32,
    chain_tip: &Mutex<Option<block::Hash>>,
    origin: SocketAddr,
    block: MerkleBlock,
) {
    let hash = block.block_header.hash();
    match merkle_block::process(store, orphans, network, block) {
        Ok(ConnectOutcome::NewBestChain) => {
            if let Ok(Some(head)) = store.chain_head() {
                best_block.store(head.height.0, Ordering::Relaxed);
                *chain_tip.lock().expect("chain tip lock poisoned") = Some(head.hash);
            }
            scheduler.lock().expect("scheduler lock poisoned").resolve(&hash.0);
        }
        Ok(ConnectOutcome::Extended) | Ok(ConnectOutcome::AlreadyKnown) => {
            scheduler.lock().expect("scheduler lock poisoned").resolve(&hash.0);
        }
        Ok(ConnectOutcome::NeedsParent(parent)) => {
            debug!(%parent, "queuing request for missing parent header");
            scheduler
                .lock()
                .expect("scheduler lock poisoned")
                .announce(RequestKind::Block, parent.0, origin);
        }
        Err(e) => warn!(error = %e, "failed to process merkle block"),
    }
}

fn handle_tx(
    store: &dyn WalletStore,
    network: Network,
    scheduler: &Mutex<InventoryScheduler>,
    _origin: SocketAddr,
    transaction: Arc<Transaction>,
) {
    let hash = transaction.hash();
    if let Err(e) = tx::process(store, network, transaction) {
        warn!(error = %e, "failed to process transaction");
    }
    scheduler.lock().expect("scheduler lock poisoned").resolve(&hash.0);
}
