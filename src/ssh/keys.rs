//! # Public Keys
//!
//! Normalizes OpenSSH public keys to a fingerprint (`type base64`, comment
//! dropped) so keys registered with the cloud account can be matched against
//! the `*.pub` files in `~/.ssh`.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

/// Longest key body accepted, in bytes.
const MAX_KEY_BODY: usize = 1000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyParseError {
    #[error("missing SSH prefix")]
    MissingPrefix,
    #[error("contains non-printable characters")]
    Unprintable,
    #[error("too short")]
    TooShort,
    #[error("key body too long")]
    TooLong,
}

/// Reduce a public key line to `type base64`.
pub fn parse_key(key: &[u8]) -> Result<String, KeyParseError> {
    if !key.starts_with(b"ssh-") {
        return Err(KeyParseError::MissingPrefix);
    }
    let text = std::str::from_utf8(key).map_err(|_| KeyParseError::Unprintable)?;
    if text.chars().any(|c| c.is_control() && !c.is_whitespace()) {
        return Err(KeyParseError::Unprintable);
    }

    let mut fields = text.split_whitespace();
    let (Some(kind), Some(body)) = (fields.next(), fields.next()) else {
        return Err(KeyParseError::TooShort);
    };
    if body.len() > MAX_KEY_BODY {
        return Err(KeyParseError::TooLong);
    }
    Ok(format!("{kind} {body}"))
}

/// The user's `~/.ssh`, if a home directory can be determined.
pub fn default_ssh_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|dirs| dirs.home_dir().join(".ssh"))
}

/// Map the fingerprint of every readable `*.pub` file directly inside `dir`
/// to its path, with `home` abbreviated to `~`.
///
/// Unreadable and malformed files are skipped.
pub fn local_public_keys(dir: &Path, home: Option<&Path>) -> HashMap<String, String> {
    let mut keys = HashMap::new();

    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        let is_pub = path.extension().and_then(|ext| ext.to_str()) == Some("pub");
        if !entry.file_type().is_file() || !is_pub {
            continue;
        }

        let contents = match fs::read(path) {
            Ok(c) => c,
            Err(e) => {
                debug!("skipping {}: {}", path.display(), e);
                continue;
            }
        };
        match parse_key(&contents) {
            Ok(fingerprint) => {
                keys.insert(fingerprint, display_path(path, home));
            }
            Err(e) => debug!("skipping {}: {}", path.display(), e),
        }
    }

    keys
}

fn display_path(path: &Path, home: Option<&Path>) -> String {
    match home.and_then(|h| path.strip_prefix(h).ok()) {
        Some(rest) => Path::new("~").join(rest).display().to_string(),
        None => path.display().to_string(),
    }
}
