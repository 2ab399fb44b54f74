/// A codec that transforms a byte stream into a stream of `Message`s.
pub mod codec;
/// Inventory items.
pub mod inv;
/// An enum of all supported Bitcoin message types.
pub mod message;

/// A single byte enum representing a Bitcoin message type.
mod command;
/// Newtype wrappers for primitive types.
pub mod types;

pub use codec::Codec;
pub use command::Command;
pub use inv::InventoryHash;
pub use message::{GetBlocks, GetHeaders, MerkleBlock, Message, Payload, RejectReason, Version};
