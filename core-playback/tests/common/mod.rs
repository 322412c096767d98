//! In-memory bridge fakes shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::http::{DownloadRequest, DownloadResponse, HttpClient};
use bridge_traits::storage::{FileMetadata, FileSystemAccess, KeyValueStore};
use bridge_traits::time::Clock;
use bridge_traits::{PlaybackEngine, Track};
use chrono::{DateTime, TimeZone, Utc};
use core_playback::Song;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Notify;

pub fn song(id: &str) -> Song {
    Song {
        id: id.to_string(),
        title: format!("Song {}", id),
        author: format!("Artist {}", id),
        song_path: format!("https://cdn.example.com/audio/{}.mp3", id),
        image_path: Some(format!("https://cdn.example.com/art/{}.jpg", id)),
        user_id: "owner-1".to_string(),
        created_at: "2024-03-01T10:00:00Z".to_string(),
    }
}

pub fn songs(ids: &[&str]) -> Vec<Song> {
    ids.iter().map(|id| song(id)).collect()
}

pub fn track_ids(tracks: &[Track]) -> Vec<String> {
    tracks.iter().map(|t| t.id.clone()).collect()
}

// ============================================================================
// Playback engine
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    Reset,
    Add {
        ids: Vec<String>,
        insert_before_index: Option<usize>,
    },
    RemoveUpcoming,
    Skip(usize),
    Play,
    Pause,
}

#[derive(Default)]
struct EngineState {
    queue: Vec<Track>,
    active: Option<usize>,
    playing: bool,
    calls: Vec<EngineCall>,
    failing: HashSet<&'static str>,
}

/// Engine with a real queue, call log and failure injection.
#[derive(Default)]
pub struct FakeEngine {
    state: Mutex<EngineState>,
    reset_gate: Mutex<Option<Arc<Notify>>>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `method` fail until [`heal`](Self::heal) is called.
    pub fn fail(&self, method: &'static str) {
        self.state.lock().failing.insert(method);
    }

    pub fn heal(&self) {
        self.state.lock().failing.clear();
    }

    /// Make the next `reset` wait until the returned notify fires.
    pub fn hold_reset(&self) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        *self.reset_gate.lock() = Some(notify.clone());
        notify
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.state.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    pub fn queue(&self) -> Vec<Track> {
        self.state.lock().queue.clone()
    }

    pub fn queue_ids(&self) -> Vec<String> {
        track_ids(&self.state.lock().queue)
    }

    pub fn active_id(&self) -> Option<String> {
        let state = self.state.lock();
        state.active.map(|i| state.queue[i].id.clone())
    }

    pub fn is_playing(&self) -> bool {
        self.state.lock().playing
    }

    /// Ids after the active track.
    pub fn upcoming_ids(&self) -> Vec<String> {
        let state = self.state.lock();
        match state.active {
            Some(i) => track_ids(&state.queue[i + 1..]),
            None => track_ids(&state.queue),
        }
    }

    fn record(&self, method: &'static str, call: EngineCall) -> BridgeResult<()> {
        let mut state = self.state.lock();
        state.calls.push(call);
        if state.failing.contains(method) {
            return Err(BridgeError::EngineNotReady(format!("{} rejected", method)));
        }
        Ok(())
    }
}

#[async_trait]
impl PlaybackEngine for FakeEngine {
    async fn reset(&self) -> BridgeResult<()> {
        let gate = self.reset_gate.lock().take();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        self.record("reset", EngineCall::Reset)?;
        let mut state = self.state.lock();
        state.queue.clear();
        state.active = None;
        state.playing = false;
        Ok(())
    }

    async fn add(&self, tracks: Vec<Track>, insert_before_index: Option<usize>) -> BridgeResult<()> {
        self.record(
            "add",
            EngineCall::Add {
                ids: track_ids(&tracks),
                insert_before_index,
            },
        )?;

        let mut state = self.state.lock();
        let count = tracks.len();
        match insert_before_index {
            Some(index) => {
                let index = index.min(state.queue.len());
                for (offset, track) in tracks.into_iter().enumerate() {
                    state.queue.insert(index + offset, track);
                }
                if let Some(active) = state.active {
                    if index <= active {
                        state.active = Some(active + count);
                    }
                }
            }
            None => state.queue.extend(tracks),
        }
        if state.active.is_none() && !state.queue.is_empty() {
            state.active = Some(0);
        }
        Ok(())
    }

    async fn remove_upcoming_tracks(&self) -> BridgeResult<()> {
        self.record("remove_upcoming_tracks", EngineCall::RemoveUpcoming)?;
        let mut state = self.state.lock();
        if let Some(active) = state.active {
            state.queue.truncate(active + 1);
        }
        Ok(())
    }

    async fn skip(&self, index: usize) -> BridgeResult<()> {
        self.record("skip", EngineCall::Skip(index))?;
        let mut state = self.state.lock();
        if index >= state.queue.len() {
            return Err(BridgeError::OperationFailed(format!("index {} out of range", index)));
        }
        state.active = Some(index);
        Ok(())
    }

    async fn play(&self) -> BridgeResult<()> {
        self.record("play", EngineCall::Play)?;
        self.state.lock().playing = true;
        Ok(())
    }

    async fn pause(&self) -> BridgeResult<()> {
        self.record("pause", EngineCall::Pause)?;
        self.state.lock().playing = false;
        Ok(())
    }

    async fn get_queue(&self) -> BridgeResult<Vec<Track>> {
        let state = self.state.lock();
        if state.failing.contains("get_queue") {
            return Err(BridgeError::EngineNotReady("get_queue rejected".into()));
        }
        Ok(state.queue.clone())
    }

    async fn get_active_track(&self) -> BridgeResult<Option<Track>> {
        let state = self.state.lock();
        if state.failing.contains("get_active_track") {
            return Err(BridgeError::EngineNotReady("get_active_track rejected".into()));
        }
        Ok(state.active.map(|i| state.queue[i].clone()))
    }
}

// ============================================================================
// Key-value store
// ============================================================================

#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.values.lock().get(key).cloned()
    }

    pub fn put_raw(&self, key: &str, value: &str) {
        self.values.lock().insert(key.to_string(), value.to_string());
    }

    pub fn keys(&self) -> Vec<String> {
        self.values.lock().keys().cloned().collect()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn set_string(&self, key: &str, value: &str) -> BridgeResult<()> {
        self.put_raw(key, value);
        Ok(())
    }

    async fn get_string(&self, key: &str) -> BridgeResult<Option<String>> {
        Ok(self.raw(key))
    }

    async fn delete(&self, key: &str) -> BridgeResult<()> {
        self.values.lock().remove(key);
        Ok(())
    }

    async fn list_keys(&self) -> BridgeResult<Vec<String>> {
        Ok(self.keys())
    }
}

// ============================================================================
// Filesystem
// ============================================================================

/// Filesystem rooted at `/data` that only tracks file sizes.
#[derive(Default)]
pub struct MemoryFs {
    files: Mutex<HashMap<PathBuf, u64>>,
    dirs: Mutex<HashSet<PathBuf>>,
    deletes: Mutex<Vec<PathBuf>>,
    fail_deletes: Mutex<bool>,
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_file(&self, path: impl Into<PathBuf>, size: u64) {
        self.files.lock().insert(path.into(), size);
    }

    pub fn remove_file(&self, path: impl AsRef<Path>) {
        self.files.lock().remove(path.as_ref());
    }

    pub fn has_file(&self, path: impl AsRef<Path>) -> bool {
        self.files.lock().contains_key(path.as_ref())
    }

    pub fn has_dir(&self, path: impl AsRef<Path>) -> bool {
        self.dirs.lock().contains(path.as_ref())
    }

    pub fn delete_calls(&self) -> Vec<PathBuf> {
        self.deletes.lock().clone()
    }

    pub fn fail_deletes(&self, fail: bool) {
        *self.fail_deletes.lock() = fail;
    }
}

#[async_trait]
impl FileSystemAccess for MemoryFs {
    async fn get_data_directory(&self) -> BridgeResult<PathBuf> {
        Ok(PathBuf::from("/data"))
    }

    async fn exists(&self, path: &Path) -> BridgeResult<bool> {
        Ok(self.has_file(path) || self.has_dir(path))
    }

    async fn metadata(&self, path: &Path) -> BridgeResult<FileMetadata> {
        let size = self.files.lock().get(path).copied().ok_or_else(|| {
            BridgeError::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"))
        })?;
        Ok(FileMetadata {
            size,
            modified_at: None,
            is_directory: false,
        })
    }

    async fn create_dir_all(&self, path: &Path) -> BridgeResult<()> {
        self.dirs.lock().insert(path.to_path_buf());
        Ok(())
    }

    async fn delete_file(&self, path: &Path) -> BridgeResult<()> {
        self.deletes.lock().push(path.to_path_buf());
        if *self.fail_deletes.lock() {
            return Err(BridgeError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "read-only volume",
            )));
        }
        match self.files.lock().remove(path) {
            Some(_) => Ok(()),
            None => Err(BridgeError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "no such file",
            ))),
        }
    }
}

// ============================================================================
// Transfers
// ============================================================================

/// Writes a file into [`MemoryFs`] and answers with the configured status.
pub struct FakeHttp {
    fs: Arc<MemoryFs>,
    status: Mutex<u16>,
    fail_transfer: Mutex<bool>,
    requests: Mutex<Vec<DownloadRequest>>,
}

impl FakeHttp {
    pub fn new(fs: Arc<MemoryFs>) -> Self {
        Self {
            fs,
            status: Mutex::new(200),
            fail_transfer: Mutex::new(false),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn respond_with(&self, status: u16) {
        *self.status.lock() = status;
    }

    /// Write a partial file and then fail with a transport error.
    pub fn fail_mid_transfer(&self) {
        *self.fail_transfer.lock() = true;
    }

    pub fn requests(&self) -> Vec<DownloadRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl HttpClient for FakeHttp {
    async fn download_file(&self, request: DownloadRequest) -> BridgeResult<DownloadResponse> {
        self.requests.lock().push(request.clone());

        if *self.fail_transfer.lock() {
            self.fs.put_file(&request.to_file, 10);
            return Err(BridgeError::OperationFailed("connection reset".into()));
        }

        let status = *self.status.lock();
        if status == 200 {
            self.fs.put_file(&request.to_file, 4096);
            Ok(DownloadResponse::new(200, 4096))
        } else {
            Ok(DownloadResponse::new(status, 0))
        }
    }
}

// ============================================================================
// Clock
// ============================================================================

pub struct FixedClock(pub DateTime<Utc>);

impl Default for FixedClock {
    fn default() -> Self {
        Self(Utc.with_ymd_and_hms(2024, 6, 1, 8, 30, 0).unwrap())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
