//! The Bitcoin P2P wire protocol.

/// Message types, codec, and the primitives they're built from.
pub mod external;
