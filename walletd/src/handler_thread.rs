//! The message-handler thread: drains `ChainEvent`s off the reactor's
//! inbound channel. Inventory announcements are cheap and handled here
//! directly; anything that touches the store is handed to the database
//! thread so a slow commit never stalls this loop.

use std::net::SocketAddr;
use std::sync::mpsc::{Receiver, Sender};
use std::sync::{Arc, Mutex};

use wallet_network::handler::ChainEvent;
use wallet_network::protocol::external::InventoryHash;
use wallet_network::{InventoryScheduler, RequestKind};

use crate::db::DbJob;

/// Runs until `inbound` is disconnected (the reactor thread exited at
/// shutdown) or `jobs` can no longer accept work (the database thread
/// exited).
pub fn run(
    inbound: Receiver<(SocketAddr, ChainEvent)>,
    jobs: Sender<DbJob>,
    scheduler: Arc<Mutex<InventoryScheduler>>,
) {
    while let Ok((origin, event)) = inbound.recv() {
        match event {
            ChainEvent::Inventory(items) => {
                let mut scheduler = scheduler.lock().expect("scheduler lock poisoned");
                for item in items {
                    let (kind, hash) = match item {
                        InventoryHash::Tx(hash) => (RequestKind::Tx, hash.0),
                        InventoryHash::Block(hash) | InventoryHash::FilteredBlock(hash) => {
                            (RequestKind::Block, hash.0)
                        }
                        InventoryHash::Error => continue,
                    };
                    scheduler.announce(kind, hash, origin);
                }
            }
            ChainEvent::MerkleBlock(block) => {
                if jobs.send(DbJob::MerkleBlock { origin, block }).is_err() {
                    break;
                }
            }
            ChainEvent::Tx(tx) => {
                if jobs.send(DbJob::Tx { origin, tx }).is_err() {
                    break;
                }
            }
        }
    }
}
