//! Header-verification errors, all of which collapse into
//! [`wallet_chain::WalletError::Verification`] at the call sites that return
//! a `WalletError` to the rest of the workspace.

use thiserror::Error;

use wallet_chain::block;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HeaderError {
    #[error("header {0:?} has an unparseable difficulty target")]
    InvalidDifficulty(block::Hash),

    #[error("header {0:?} target exceeds the network's proof-of-work limit")]
    TargetDifficultyLimit(block::Hash),

    #[error("header {0:?} hash does not satisfy its own declared target")]
    DifficultyFilter(block::Hash),

    #[error("header at height {0:?} does not match the hard-coded checkpoint hash")]
    CheckpointMismatch(block::Height),

    #[error("header time is more than two hours ahead of the local clock")]
    TimeTooFarInFuture,
}
