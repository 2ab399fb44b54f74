//! Block height, counted from the genesis block at height zero.

use std::fmt;

use crate::serialization::{BitcoinDeserialize, BitcoinSerialize, SerializationError};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Height(pub u32);

impl Height {
    pub fn is_genesis(&self) -> bool {
        self.0 == 0
    }

    pub fn next(&self) -> Height {
        Height(self.0 + 1)
    }

    pub fn previous(&self) -> Option<Height> {
        self.0.checked_sub(1).map(Height)
    }
}

impl fmt::Display for Height {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl BitcoinSerialize for Height {
    fn bitcoin_serialize<W: std::io::Write>(&self, target: W) -> Result<(), std::io::Error> {
        self.0.bitcoin_serialize(target)
    }
}

impl BitcoinDeserialize for Height {
    fn bitcoin_deserialize<R: std::io::Read>(target: R) -> Result<Height, SerializationError> {
        Ok(Height(u32::bitcoin_deserialize(target)?))
    }
}
