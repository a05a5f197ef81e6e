//! Authorization key storage.
//!
//! Keys issued by televisions during pairing are kept in one JSON file shared
//! by every device paired from this host.

pub mod key_store;

pub use key_store::{resolve_key_file_path, KeyStore, KEY_FILE_NAME};
