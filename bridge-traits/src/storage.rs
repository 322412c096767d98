//! Storage and File System Abstractions
//!
//! Provides platform-agnostic traits for the download directory and for the
//! persistent key-value store that holds download metadata.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// File metadata information
#[derive(Debug, Clone)]
pub struct FileMetadata {
    pub size: u64,
    pub modified_at: Option<i64>,
    pub is_directory: bool,
}

/// File system access trait
///
/// Abstracts the handful of file operations the offline storage service needs:
/// - Desktop: Direct filesystem access
/// - iOS/Android: Sandboxed document directory
///
/// The transfer itself is performed by [`HttpClient`](crate::http::HttpClient),
/// which writes straight to a path inside a directory created here.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::FileSystemAccess;
///
/// async fn downloads_dir(fs: &dyn FileSystemAccess) -> Result<PathBuf> {
///     let dir = fs.get_data_directory().await?.join("downloads");
///     fs.create_dir_all(&dir).await?;
///     Ok(dir)
/// }
/// ```
#[async_trait]
pub trait FileSystemAccess: Send + Sync {
    /// Get the application's persistent data directory
    async fn get_data_directory(&self) -> Result<PathBuf>;

    /// Check if a file or directory exists
    async fn exists(&self, path: &Path) -> Result<bool>;

    /// Get metadata for a file or directory
    async fn metadata(&self, path: &Path) -> Result<FileMetadata>;

    /// Create a directory and all parent directories if they don't exist
    async fn create_dir_all(&self, path: &Path) -> Result<()>;

    /// Delete a file
    async fn delete_file(&self, path: &Path) -> Result<()>;
}

/// Persistent key-value store trait
///
/// Abstracts platform string storage:
/// - iOS: MMKV / UserDefaults
/// - Android: MMKV / SharedPreferences
/// - Desktop: SQLite-backed table
///
/// Values are opaque strings; callers own their encoding.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::KeyValueStore;
///
/// async fn remember(store: &dyn KeyValueStore) -> Result<()> {
///     store.set_string("song-metadata:42", "{...}").await?;
///     assert!(store.contains("song-metadata:42").await?);
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Store a string value, replacing any previous value
    async fn set_string(&self, key: &str, value: &str) -> Result<()>;

    /// Retrieve a string value
    ///
    /// Returns `Ok(None)` if the key doesn't exist.
    async fn get_string(&self, key: &str) -> Result<Option<String>>;

    /// Delete a key. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Check if a key exists
    async fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.get_string(key).await?.is_some())
    }

    /// List every stored key
    async fn list_keys(&self) -> Result<Vec<String>>;
}
