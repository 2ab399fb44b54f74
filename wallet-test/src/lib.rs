//! Shared test fixtures used across the workspace: a `tracing` setup for
//! test binaries, plus fixed byte vectors for round-trip and property
//! tests that don't want to build their own sample data from scratch.

use std::sync::Once;

static INIT: Once = Once::new();

/// Initialize tracing for a test binary. Safe to call from every test; only
/// the first call takes effect.
pub fn init() {
    INIT.call_once(|| {
        let _ = color_eyre::install();
        tracing_subscriber::fmt()
            .with_env_filter(
                std::env::var("WALLET_LOG").unwrap_or_else(|_| "wallet=debug".to_owned()),
            )
            .try_init();
    });
}

/// Fixed byte vectors used by more than one crate's tests.
pub mod vectors {
    /// An 80-byte block header with a plausible but arbitrary payload: not
    /// a real chain header, just fixed bytes for codec round-trip tests.
    pub const SAMPLE_HEADER_BYTES: [u8; 80] = [
        0x01, 0x00, 0x00, 0x00, // version = 1
        // previous block hash (32 zero bytes: treated as a "genesis-shaped" parent)
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00, // merkle root (32 bytes of a fixed pattern)
        0x3b, 0xa3, 0xed, 0xfd, 0x7a, 0x7b, 0x12, 0xb2, 0x7a, 0xc7, 0x2c, 0x3e, 0x67, 0x76, 0x8f,
        0x61, 0x7f, 0xc8, 0x1b, 0xc3, 0x88, 0x8a, 0x51, 0x32, 0x3a, 0x9f, 0xb8, 0xaa, 0x4b, 0x1e,
        0x5e, 0x4a, // time (unix seconds, little-endian) = 1231006505
        0x29, 0xab, 0x5f, 0x49, // compact target (0x1d00ffff, little-endian)
        0xff, 0xff, 0x00, 0x1d, // nonce
        0x1d, 0xac, 0x2b, 0x7c,
    ];

    /// A minimal serialized coinbase-only transaction, used where tests need
    /// some well-formed `Transaction` bytes without constructing one field by
    /// field.
    pub const DUMMY_TX1: &[u8] = &[
        0x01, 0x00, 0x00, 0x00, // version
        0x01, // input count
        // coinbase outpoint: 32 zero bytes + 0xffffffff index
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00, 0xff, 0xff, 0xff, 0xff, 0x01, // coinbase script length = 1
        0x51, // OP_1 as a throwaway coinbase script
        0xff, 0xff, 0xff, 0xff, // sequence
        0x01, // output count
        0x00, 0xf2, 0x05, 0x2a, 0x01, 0x00, 0x00, 0x00, // value = 5_000_000_000
        0x19, // script length = 25 (P2PKH)
        0x76, 0xa9, 0x14, // OP_DUP OP_HASH160 <push 20>
        0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11,
        0x11, 0x11, 0x11, 0x11, 0x11, // hash160
        0x88, 0xac, // OP_EQUALVERIFY OP_CHECKSIG
        0x00, 0x00, 0x00, 0x00, // locktime
    ];
}
