//! Parses `BitcoinWallet.conf`: line-oriented `key=value`, with `#` and
//! blank lines ignored.

use std::fs;
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::Path;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("unrecognized configuration key `{0}`")]
    UnknownKey(String),
    #[error("malformed configuration line: `{0}`")]
    MalformedLine(String),
    #[error("malformed connect= address `{0}`")]
    BadConnectAddress(String),
}

/// The subset of `BitcoinWallet.conf` the daemon understands.
#[derive(Debug, Default, Clone)]
pub struct FileConfig {
    /// Static peers from repeated `connect=` lines. A non-empty list
    /// disables DNS seed discovery and restricts outbound connections to
    /// exactly these addresses.
    pub connect: Vec<SocketAddr>,
    /// `passphrase=` for development use: lets the daemon unlock its keys
    /// without a prompt. Not meant for production deployments.
    pub passphrase: Option<String>,
}

/// Loads `path`, returning an empty configuration if it doesn't exist.
pub fn load(path: &Path) -> Result<FileConfig, ConfigError> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(FileConfig::default()),
        Err(e) => {
            return Err(ConfigError::Io {
                path: path.display().to_string(),
                source: e,
            })
        }
    };

    parse(&contents)
}

fn parse(contents: &str) -> Result<FileConfig, ConfigError> {
    let mut config = FileConfig::default();

    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let (key, value) = line
            .split_once('=')
            .ok_or_else(|| ConfigError::MalformedLine(line.to_string()))?;
        let (key, value) = (key.trim(), value.trim());

        match key {
            "connect" => {
                let addr = value
                    .to_socket_addrs()
                    .ok()
                    .and_then(|mut addrs| addrs.next())
                    .ok_or_else(|| ConfigError::BadConnectAddress(value.to_string()))?;
                config.connect.push(addr);
            }
            "passphrase" => config.passphrase = Some(value.to_string()),
            other => return Err(ConfigError::UnknownKey(other.to_string())),
        }
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ignores_comments_and_blank_lines() {
        let config = parse("# a comment\n\n  \npassphrase=hunter2\n").unwrap();
        assert_eq!(config.passphrase.as_deref(), Some("hunter2"));
    }

    #[test]
    fn collects_repeated_connect_lines() {
        let config = parse("connect=127.0.0.1:8333\nconnect=127.0.0.1:8334\n").unwrap();
        assert_eq!(config.connect.len(), 2);
    }

    #[test]
    fn rejects_unknown_key() {
        assert!(matches!(parse("rpcuser=alice\n"), Err(ConfigError::UnknownKey(_))));
    }

    #[test]
    fn rejects_line_without_equals() {
        assert!(matches!(parse("passphrase\n"), Err(ConfigError::MalformedLine(_))));
    }

    #[test]
    fn rejects_unresolvable_connect_address() {
        assert!(matches!(
            parse("connect=not-a-host\n"),
            Err(ConfigError::BadConnectAddress(_))
        ));
    }
}
