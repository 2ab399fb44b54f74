//! Top-level error kinds shared across the workspace (spec §7).

use thiserror::Error;

use crate::SerializationError;

/// The error kinds surfaced by the wallet, as distinguished in spec §7.
///
/// Network and peer-protocol errors are handled locally by the peer that
/// raised them (disconnect, optionally with a ban-score bump) and never
/// propagate here; this enum is for errors that cross a subsystem boundary
/// (chain engine, transaction builder, payment flow, store).
#[derive(Error, Debug)]
pub enum WalletError {
    /// Malformed wire bytes.
    #[error("malformed message: {0}")]
    Malformed(&'static str),

    /// Bad Base58Check or a version byte that does not match the active network.
    #[error("invalid address: {0}")]
    Address(&'static str),

    /// Malformed BIP 21 URI.
    #[error("invalid payment uri: {0}")]
    Uri(String),

    /// BIP 70 payment request rejected, expired, or failed signature verification.
    #[error("payment request rejected: {0}")]
    Payment(String),

    /// A private scalar did not correspond to its claimed public point.
    #[error("key mismatch")]
    Key,

    /// A header or chain invariant was violated.
    #[error("chain verification failed: {0}")]
    Verification(String),

    /// `getJunction` walked off the end of the stored chain without finding
    /// an on-chain ancestor.
    #[error("block not found while computing junction")]
    BlockNotFound,

    /// The wallet could not assemble enough spendable inputs to cover the
    /// requested amount plus the escalating fee.
    #[error("insufficient funds to cover amount plus fee")]
    InsufficientFee,

    /// The durable store failed.
    #[error("store error: {0}")]
    Store(String),

    /// A transport-level failure.
    #[error("network error: {0}")]
    Network(String),
}

impl From<SerializationError> for WalletError {
    fn from(e: SerializationError) -> Self {
        match e {
            SerializationError::Io(_) => WalletError::Network(e.to_string()),
            SerializationError::Parse(msg) => WalletError::Malformed(msg),
        }
    }
}
