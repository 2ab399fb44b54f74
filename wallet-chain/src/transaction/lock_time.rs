use chrono::{DateTime, TimeZone, Utc};

use crate::block::Height;
use crate::serialization::{BitcoinDeserialize, BitcoinSerialize, SerializationError};

/// A transaction's nLockTime: either "unlocked after block height N" or
/// "unlocked after Unix time N", distinguished by a threshold the same way
/// the wire encoding distinguishes them.
///
/// A value of zero means the transaction has no lock time.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LockTime {
    Height(Height),
    Time(DateTime<Utc>),
}

/// Values below this are interpreted as a block height; at or above, as a
/// Unix timestamp.
const LOCKTIME_THRESHOLD: u32 = 500_000_000;

impl LockTime {
    pub fn unlocked() -> LockTime {
        LockTime::Height(Height(0))
    }

    fn raw(&self) -> u32 {
        match self {
            LockTime::Height(height) => height.0,
            LockTime::Time(time) => time.timestamp() as u32,
        }
    }

    /// Whether `self` still locks a transaction given the current chain tip
    /// height and wall-clock time.
    pub fn is_satisfied_by(&self, tip_height: Height, now: DateTime<Utc>) -> bool {
        match self {
            LockTime::Height(height) => tip_height.0 >= height.0,
            LockTime::Time(time) => now >= *time,
        }
    }
}

impl BitcoinSerialize for LockTime {
    fn bitcoin_serialize<W: std::io::Write>(&self, target: W) -> Result<(), std::io::Error> {
        self.raw().bitcoin_serialize(target)
    }
}

impl BitcoinDeserialize for LockTime {
    fn bitcoin_deserialize<R: std::io::Read>(target: R) -> Result<LockTime, SerializationError> {
        let raw = u32::bitcoin_deserialize(target)?;
        if raw < LOCKTIME_THRESHOLD {
            Ok(LockTime::Height(Height(raw)))
        } else {
            Ok(LockTime::Time(
                Utc.timestamp_opt(raw as i64, 0)
                    .single()
                    .ok_or(SerializationError::Parse("invalid lock time timestamp"))?,
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_unlocked() {
        assert_eq!(LockTime::unlocked().raw(), 0);
    }

    #[test]
    fn threshold_distinguishes_height_from_time() {
        assert_eq!(
            LockTime::Height(Height(LOCKTIME_THRESHOLD - 1)).raw(),
            LOCKTIME_THRESHOLD - 1
        );
        assert!(matches!(
            LockTime::Time(Utc.timestamp_opt(LOCKTIME_THRESHOLD as i64, 0).unwrap()),
            LockTime::Time(_)
        ));
    }
}
