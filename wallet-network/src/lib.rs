//! The peer-to-peer networking layer: wire protocol, peer connections, the
//! single-threaded reactor that drives them, and the inventory scheduler
//! that turns announcements into `getdata` requests.

#[macro_use]
extern crate tracing;

pub mod bloom;
pub mod constants;
mod error;
pub mod handler;
pub mod meta_addr;
pub mod peer;
pub mod protocol;
pub mod reactor;
pub mod scheduler;

pub use bloom::BloomFilter;
pub use error::NetworkError;
pub use handler::ChainEvent;
pub use meta_addr::MetaAddr;
pub use peer::{HandshakeStage, Peer};
pub use reactor::Reactor;
pub use scheduler::{InventoryScheduler, PeerRequest, RequestKind};
