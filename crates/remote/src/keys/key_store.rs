//! Persistent authorization key storage.
//!
//! The key file is a single JSON object mapping device addresses to the
//! client keys those devices issued:
//!
//! ```json
//! { "192.168.1.20": "3f2a...", "living-room-tv.lan": "91bc..." }
//! ```
//!
//! A missing or empty file is an empty mapping.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use protocol::error::{ProtocolError, Result};

/// File name used when no explicit key file is configured.
pub const KEY_FILE_NAME: &str = ".webos-remote";

/// Device address → authorization key mapping loaded from disk.
///
/// Saving is a read-modify-write of the whole file with no locking. Two
/// processes writing the same key file at once can lose an entry, so callers
/// must keep to one writer per key file at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyStore {
    /// The path the mapping was loaded from.
    path: PathBuf,
    /// Keys by device address.
    keys: BTreeMap<String, String>,
}

impl KeyStore {
    /// Loads the key file.
    ///
    /// Returns an empty store if the file does not exist or is empty, and a
    /// storage error if it exists but is not a JSON object of strings.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let keys = read_mapping(&path)?;

        tracing::debug!("Loaded {} client keys from {:?}", keys.len(), path);
        Ok(Self { path, keys })
    }

    /// Returns the path to the key file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the stored key for a device address.
    pub fn get(&self, address: &str) -> Option<&str> {
        self.keys.get(address).map(String::as_str)
    }

    /// Returns the number of stored keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns true if no keys are stored.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Stores `key` for `address` in the key file at `path`.
    ///
    /// The file is re-read first so entries for other devices written since
    /// this process loaded it are kept. The new mapping is written to a
    /// temporary file and renamed over the original.
    pub fn save<P: AsRef<Path>>(path: P, address: &str, key: &str) -> Result<()> {
        let path = path.as_ref();

        let mut keys = read_mapping(path)?;
        keys.insert(address.to_string(), key.to_string());
        write_mapping(path, &keys)?;

        tracing::info!("Saved client key for {} to {:?}", address, path);
        Ok(())
    }
}

fn read_mapping(path: &Path) -> Result<BTreeMap<String, String>> {
    if !path.exists() {
        tracing::debug!("Key file not found at {:?}, starting empty", path);
        return Ok(BTreeMap::new());
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        ProtocolError::Storage(format!("failed to read key file {}: {}", path.display(), e))
    })?;

    if contents.trim().is_empty() {
        return Ok(BTreeMap::new());
    }

    serde_json::from_str(&contents).map_err(|e| {
        ProtocolError::Storage(format!("failed to parse key file {}: {}", path.display(), e))
    })
}

fn write_mapping(path: &Path, keys: &BTreeMap<String, String>) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| {
            ProtocolError::Storage(format!(
                "failed to create key file directory {}: {}",
                parent.display(),
                e
            ))
        })?;
    }

    let contents = serde_json::to_string_pretty(keys)
        .map_err(|e| ProtocolError::Storage(format!("failed to serialize keys: {}", e)))?;

    let mut temp_name = path.as_os_str().to_owned();
    temp_name.push(".tmp");
    let temp_path = PathBuf::from(temp_name);

    fs::write(&temp_path, contents).map_err(|e| {
        ProtocolError::Storage(format!(
            "failed to write temp key file {}: {}",
            temp_path.display(),
            e
        ))
    })?;

    fs::rename(&temp_path, path).map_err(|e| {
        ProtocolError::Storage(format!(
            "failed to rename {} to {}: {}",
            temp_path.display(),
            path.display(),
            e
        ))
    })
}

/// Resolves where the key file lives.
///
/// An explicit path wins. Otherwise the file goes in the home directory when
/// it exists and is writable, else in the current working directory.
pub fn resolve_key_file_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }

    if let Some(home) = dirs::home_dir().filter(|h| is_writable_dir(h)) {
        return home.join(KEY_FILE_NAME);
    }

    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(KEY_FILE_NAME)
}

#[cfg(unix)]
fn is_writable_dir(path: &Path) -> bool {
    use nix::unistd::{access, AccessFlags};

    path.is_dir() && access(path, AccessFlags::W_OK).is_ok()
}

#[cfg(not(unix))]
fn is_writable_dir(path: &Path) -> bool {
    fs::metadata(path)
        .map(|m| m.is_dir() && !m.permissions().readonly())
        .unwrap_or(false)
}
