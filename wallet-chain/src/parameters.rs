//! Network-specific consensus parameters: genesis block, checkpoints, and
//! wire-level magic bytes.

pub mod genesis;
mod network;

pub use network::Network;
