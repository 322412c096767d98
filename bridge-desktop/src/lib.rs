//! # Desktop Bridge Implementations
//!
//! Default implementations of the storage and transfer bridges for desktop
//! platforms (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `FileSystemAccess` using `tokio::fs` and the `dirs` data directory
//! - `HttpClient` using `reqwest`, streaming bodies straight to disk
//! - `KeyValueStore` using a SQLite-backed key-value table
//!
//! The playback engine has no desktop default; hosts always inject their own.
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{ReqwestHttpClient, SqliteKeyValueStore, TokioFileSystem};
//!
//! #[tokio::main]
//! async fn main() {
//!     let fs = TokioFileSystem::new();
//!     let http = ReqwestHttpClient::new();
//!     let store = SqliteKeyValueStore::new("/path/to/player.db".into()).await.unwrap();
//!     // Hand these to core_runtime::config::PlayerConfig::builder()
//! }
//! ```

mod filesystem;
mod http;
mod key_value;

pub use filesystem::TokioFileSystem;
pub use http::ReqwestHttpClient;
pub use key_value::SqliteKeyValueStore;
