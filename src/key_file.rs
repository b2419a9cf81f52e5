//! Signal's `config.json` key file.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use zeroize::Zeroizing;

use crate::error::{Error, Result};

/// Number of key characters that may appear in logs.
const LOGGED_PREFIX_CHARS: usize = 10;

#[derive(Deserialize)]
struct KeyFile {
    key: String,
}

/// Hex-encoded SQLCipher raw key, as stored by Signal Desktop.
///
/// The buffer is wiped on drop. `Debug` only shows the loggable prefix.
pub struct DecryptionKey {
    hex: Zeroizing<String>,
}

impl DecryptionKey {
    /// Read `{"key": "<hex>"}` from `path`, trimming surrounding whitespace.
    pub fn read(path: &Path) -> Result<Self> {
        tracing::info!("Reading key from {}", path.display());
        let raw = Zeroizing::new(fs::read_to_string(path).map_err(|e| Error::key_file(path, e))?);
        Self::parse(&raw).map_err(|e| Error::key_file(path, e))
    }

    /// Parse the JSON body of a key file.
    pub fn parse(json: &str) -> serde_json::Result<Self> {
        let file: KeyFile = serde_json::from_str(json)?;
        let key = Zeroizing::new(file.key);
        Ok(Self::from_hex(key.trim()))
    }

    pub fn from_hex(hex: &str) -> Self {
        Self {
            hex: Zeroizing::new(hex.to_string()),
        }
    }

    pub fn as_hex(&self) -> &str {
        &self.hex
    }

    /// First characters of the key, safe for diagnostics.
    pub fn log_prefix(&self) -> String {
        self.hex.chars().take(LOGGED_PREFIX_CHARS).collect()
    }

    /// The `PRAGMA KEY` statement for this key.
    ///
    /// The key is interpolated into the SQL text because the pragma takes no
    /// bound parameters. Only ever build this from a key read out of a local
    /// key file; never from untrusted input.
    pub fn pragma(&self) -> Zeroizing<String> {
        Zeroizing::new(format!("PRAGMA KEY = \"x'{}'\"", self.as_hex()))
    }
}

impl std::fmt::Debug for DecryptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DecryptionKey({}...)", self.log_prefix())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::KeyFileSource;

    #[test]
    fn parse_trims_whitespace() {
        let key = DecryptionKey::parse(r#"{"key": "  deadbeef00\n"}"#).unwrap();
        assert_eq!(key.as_hex(), "deadbeef00");
    }

    #[test]
    fn parse_ignores_other_fields() {
        let key = DecryptionKey::parse(r#"{"key":"00112233","mediaPermissions":true}"#).unwrap();
        assert_eq!(key.as_hex(), "00112233");
    }

    #[test]
    fn parse_rejects_missing_key() {
        let err = DecryptionKey::parse(r#"{"encryptedKey":"abcd"}"#).unwrap_err();
        assert!(err.to_string().contains("missing field `key`"));
    }

    #[test]
    fn parse_rejects_non_string_key() {
        assert!(DecryptionKey::parse(r#"{"key": 42}"#).is_err());
    }

    #[test]
    fn pragma_embeds_key_unmodified() {
        let key = DecryptionKey::from_hex("deadbeefcafe");
        assert_eq!(key.pragma().as_str(), "PRAGMA KEY = \"x'deadbeefcafe'\"");
    }

    #[test]
    fn log_prefix_is_ten_characters() {
        let key = DecryptionKey::from_hex("0123456789abcdef");
        assert_eq!(key.log_prefix(), "0123456789");
        assert_eq!(format!("{key:?}"), "DecryptionKey(0123456789...)");
        assert_eq!(DecryptionKey::from_hex("abc").log_prefix(), "abc");
    }

    #[test]
    fn read_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        match DecryptionKey::read(&path) {
            Err(Error::KeyFile { path: reported, source: KeyFileSource::Io(_) }) => {
                assert_eq!(reported, path)
            }
            other => panic!("expected io key file error, got {other:?}"),
        }
    }

    #[test]
    fn read_reports_bad_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "not json").unwrap();
        assert!(matches!(
            DecryptionKey::read(&path),
            Err(Error::KeyFile { source: KeyFileSource::Json(_), .. })
        ));
    }
}
