use std::io::{Read, Write};

use wallet_chain::serialization::{BitcoinDeserialize, BitcoinSerialize, SerializationError};

/// The 12-byte ASCII command string Bitcoin uses to tag a message's type on
/// the wire.
///
/// We use this enum as a typed, internal stand-in for the wire string: the
/// conversion to and from the null-padded 12-byte array happens only at the
/// serialization boundary.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[allow(missing_docs)]
pub enum Command {
    Addr,
    Alert,
    FilterLoad,
    GetAddr,
    GetBlocks,
    GetData,
    GetHeaders,
    Headers,
    Inv,
    MerkleBlock,
    NotFound,
    Ping,
    Pong,
    Reject,
    Tx,
    Verack,
    Version,
}

impl Command {
    /// The null-padded 12-byte wire representation of this command.
    pub fn bytes(&self) -> &'static [u8; 12] {
        match self {
            Command::Addr => b"addr\0\0\0\0\0\0\0\0",
            Command::Alert => b"alert\0\0\0\0\0\0\0",
            Command::FilterLoad => b"filterload\0\0",
            Command::GetAddr => b"getaddr\0\0\0\0\0",
            Command::GetBlocks => b"getblocks\0\0\0",
            Command::GetData => b"getdata\0\0\0\0\0",
            Command::GetHeaders => b"getheaders\0\0",
            Command::Headers => b"headers\0\0\0\0\0",
            Command::Inv => b"inv\0\0\0\0\0\0\0\0\0",
            Command::MerkleBlock => b"merkleblock\0",
            Command::NotFound => b"notfound\0\0\0\0",
            Command::Ping => b"ping\0\0\0\0\0\0\0\0",
            Command::Pong => b"pong\0\0\0\0\0\0\0\0",
            Command::Reject => b"reject\0\0\0\0\0\0",
            Command::Tx => b"tx\0\0\0\0\0\0\0\0\0\0",
            Command::Verack => b"verack\0\0\0\0\0\0",
            Command::Version => b"version\0\0\0\0\0",
        }
    }
}

impl BitcoinSerialize for Command {
    fn bitcoin_serialize<W: Write>(&self, mut writer: W) -> Result<(), std::io::Error> {
        writer.write_all(self.bytes())
    }
}

impl BitcoinDeserialize for Command {
    fn bitcoin_deserialize<R: Read>(mut reader: R) -> Result<Self, SerializationError> {
        let mut bytes = [0u8; 12];
        reader.read_exact(&mut bytes)?;
        use Command::*;
        for candidate in [
            Addr, Alert, FilterLoad, GetAddr, GetBlocks, GetData, GetHeaders, Headers, Inv,
            MerkleBlock, NotFound, Ping, Pong, Reject, Tx, Verack, Version,
        ] {
            if candidate.bytes() == &bytes {
                return Ok(candidate);
            }
        }
        Err(SerializationError::Parse("unrecognized message command"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn every_command_roundtrips() {
        use Command::*;
        for command in [
            Addr, Alert, FilterLoad, GetAddr, GetBlocks, GetData, GetHeaders, Headers, Inv,
            MerkleBlock, NotFound, Ping, Pong, Reject, Tx, Verack, Version,
        ] {
            let bytes = command.bitcoin_serialize_to_vec().unwrap();
            assert_eq!(bytes.len(), 12);
            let parsed = Command::bitcoin_deserialize(Cursor::new(&bytes)).unwrap();
            assert_eq!(command, parsed);
        }
    }

    #[test]
    fn unknown_command_is_rejected() {
        let bytes = *b"bogus\0\0\0\0\0\0\0";
        assert!(Command::bitcoin_deserialize(Cursor::new(&bytes[..])).is_err());
    }
}
