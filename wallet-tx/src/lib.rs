//! Builds and signs outgoing transactions: coin selection, fee escalation,
//! and per-input legacy (pre-SegWit) ECDSA signing.

pub mod build;
pub mod select;
pub mod sighash;

pub use build::{build_and_sign, SpendPlan, DUST, MIN_TX_FEE};
pub use select::select_coins;
