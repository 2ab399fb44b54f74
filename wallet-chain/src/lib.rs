//! Core data model and consensus-critical serialization for the wallet.
//!
//! This crate has no network or storage code: it defines the wire formats
//! and value types (`block::Header`, `Transaction`, `transparent::Address`,
//! `transparent::ECKey`, ...) that the rest of the workspace builds on.

#[macro_use]
extern crate serde;

pub mod cached;
pub mod compactint;
pub mod error;
pub mod parameters;
pub mod serialization;
pub mod work;

pub mod block;
pub mod transaction;
pub mod transparent;

pub use cached::Cached;
pub use compactint::CompactInt;
pub use error::WalletError;
pub use serialization::{BitcoinDeserialize, BitcoinDeserializeInto, BitcoinSerialize, SerializationError};
