//! Context-free and checkpoint header checks.
//!
//! The difficulty and time checks here are context-free: they never need
//! more than the header itself, so the message handler can run them before
//! a header's height is even known. Checkpoint matching is inherently
//! height-keyed and only runs once the chain engine has placed a header
//! (see [`crate::chain`]).

use chrono::{DateTime, Utc};

use wallet_chain::block::{Hash, Header, Height};
use wallet_chain::parameters::Network;
use wallet_chain::work::difficulty::target_difficulty_limit;

use crate::error::HeaderError;

/// Checks the header's declared target against the network's proof-of-work
/// limit, and that the header's own hash satisfies that target.
///
/// Note: the comparisons here are u256 integer comparisons, like Bitcoin
/// Core. Greater values represent *less* work.
pub fn difficulty_is_valid(header: &Header, hash: &Hash) -> Result<(), HeaderError> {
    let difficulty_threshold = header
        .difficulty_threshold
        .to_expanded()
        .map_err(|_| HeaderError::InvalidDifficulty(*hash))?;

    if difficulty_threshold.as_u256() > target_difficulty_limit().as_u256() {
        return Err(HeaderError::TargetDifficultyLimit(*hash));
    }

    let hash_as_target = u256_from_hash(hash);
    if hash_as_target > difficulty_threshold.as_u256() {
        return Err(HeaderError::DifficultyFilter(*hash));
    }

    Ok(())
}

fn u256_from_hash(hash: &Hash) -> primitive_types::U256 {
    // Hashes are stored internally little-endian (as they arrive on the
    // wire); U256 wants the same byte order for its numeric comparisons.
    primitive_types::U256::from_little_endian(&hash.0)
}

/// If `height` is a hard-coded checkpoint, `hash` must match it exactly.
pub fn checkpoint_is_valid(network: Network, height: Height, hash: Hash) -> Result<(), HeaderError> {
    for &(checkpoint_height, checkpoint_hash) in network.checkpoints() {
        if checkpoint_height == height && checkpoint_hash != hash.to_string() {
            return Err(HeaderError::CheckpointMismatch(height));
        }
    }
    Ok(())
}

/// Bitcoin Core's median-time-past-plus-two-hours future block time limit.
pub fn time_is_valid_at(header: &Header, now: DateTime<Utc>) -> Result<(), HeaderError> {
    if header.time <= now + chrono::Duration::hours(2) {
        Ok(())
    } else {
        Err(HeaderError::TimeTooFarInFuture)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wallet_chain::block::merkle;
    use wallet_chain::work::difficulty::CompactDifficulty;

    fn header_with_bits(bits: u32) -> Header {
        Header::new(
            1,
            Hash([0u8; 32]),
            merkle::Root([0u8; 32]),
            Utc::now(),
            CompactDifficulty(bits),
            0,
        )
    }

    #[test]
    fn oversized_target_is_rejected() {
        let header = header_with_bits(0x1e00_ffff);
        let hash = header.hash();
        let result = difficulty_is_valid(&header, &hash);
        assert_eq!(result, Err(HeaderError::TargetDifficultyLimit(hash)));
    }

    #[test]
    fn future_time_is_rejected() {
        let header = header_with_bits(0x1d00_ffff);
        let now = Utc::now() - chrono::Duration::hours(1);
        let result = time_is_valid_at(&header, now);
        assert_eq!(result, Err(HeaderError::TimeTooFarInFuture));
    }

    #[test]
    fn checkpoint_mismatch_is_rejected() {
        let result = checkpoint_is_valid(Network::Mainnet, Height(100_000), Hash([0xAAu8; 32]));
        assert_eq!(result, Err(HeaderError::CheckpointMismatch(Height(100_000))));
    }

    /// The real mainnet genesis header, cross-checked against its published
    /// fields: it must satisfy its own declared target, since it was
    /// actually mined.
    #[test]
    fn genesis_header_satisfies_its_own_difficulty() {
        use chrono::TimeZone;

        let merkle_root = {
            let mut bytes = [0u8; 32];
            hex::decode_to_slice(
                "4a5e1e4baab89f3a32518a88c31bc87f618f76673e2cc77ab2127b7afdeda33",
                &mut bytes[..],
            )
            .unwrap();
            bytes.reverse();
            merkle::Root(bytes)
        };
        let header = Header::new(
            1,
            Hash([0u8; 32]),
            merkle_root,
            Utc.timestamp(1_231_006_505, 0),
            CompactDifficulty(0x1d00_ffff),
            2_083_236_893,
        );
        let hash = header.hash();
        assert_eq!(
            hash.to_string(),
            "000000000019d6689c085ae165831e934ff763ae46a2a6c172b3f1b60a8ce26"
        );
        assert_eq!(difficulty_is_valid(&header, &hash), Ok(()));
    }
}
