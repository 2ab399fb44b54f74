//! Chain verification and reorg handling, plus the chain-related half of
//! message dispatch (`merkleblock`/`tx`): the rest of per-message handling
//! lives in `wallet_network::handler`.

pub mod chain;
pub mod check;
pub mod error;
pub mod merkle_block;
pub mod tx;

pub use chain::{connect, ConnectOutcome, OrphanPool};
pub use error::HeaderError;
