//! Errors local to the networking layer: malformed framing, handshake
//! failures, and the other reasons a peer connection gets torn down.
//!
//! These never cross into `WalletError` — a peer fault is handled entirely
//! by the reactor (disconnect, optionally with a ban-score bump) and is
//! only ever observed in logs.

use thiserror::Error;

use wallet_chain::SerializationError;

#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("malformed message: {0}")]
    Malformed(&'static str),

    #[error(transparent)]
    Serialization(#[from] SerializationError),

    #[error("peer did not complete the handshake within the timeout")]
    HandshakeTimeout,

    #[error("peer was silent past the heartbeat timeout")]
    HeartbeatTimeout,

    #[error("peer exceeded the maximum ban score")]
    BanScoreExceeded,

    #[error("no outbound connection candidate available")]
    NoCandidate,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
