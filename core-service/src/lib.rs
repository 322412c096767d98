//! Player service façade and bootstrap helpers.
//!
//! This crate wires host-provided bridge implementations (playback engine,
//! key-value store, filesystem, HTTP) into one player session. Desktop apps
//! typically enable the `desktop-shims` feature (which depends on
//! `bridge-desktop`) so only the playback engine has to be supplied.
//!
//! Each [`PlayerService`] owns its own queue state, download service and event
//! bus; several can run side by side.

pub mod error;

pub use error::{CoreError, Result};

use std::path::PathBuf;
use std::sync::Arc;

use core_playback::offline::{OfflineConfig, OfflineStorageService};
use core_playback::queue::QueueOrchestrator;
use core_playback::resolver::TrackResolver;
use core_runtime::config::PlayerConfig;
use core_runtime::events::{EventBus, EventStream};
use tracing::{info, instrument};

#[cfg(feature = "desktop-shims")]
use bridge_traits::playback::PlaybackEngine;

/// One player session: queue orchestration plus offline storage.
#[derive(Clone)]
pub struct PlayerService {
    config: Arc<PlayerConfig>,
    event_bus: Arc<EventBus>,
    offline: Arc<OfflineStorageService>,
    queue: Arc<QueueOrchestrator>,
}

impl PlayerService {
    /// Wire a session from a validated configuration.
    pub fn new(config: PlayerConfig) -> Result<Self> {
        config.validate()?;

        let event_bus = Arc::new(EventBus::new(config.event_buffer_size));

        let offline = Arc::new(
            OfflineStorageService::new(
                OfflineConfig::from(&config),
                config.key_value_store.clone(),
                config.file_system.clone(),
                config.http_client.clone(),
                config.clock.clone(),
            )
            .with_event_bus(event_bus.clone()),
        );

        let resolver = TrackResolver::with_local_source(offline.clone());
        let mut queue = QueueOrchestrator::new(config.playback_engine.clone(), resolver)
            .with_event_bus(event_bus.clone());
        if let Some(seed) = config.shuffle_seed {
            queue = queue.with_shuffle_seed(seed);
        }

        Ok(Self {
            config: Arc::new(config),
            event_bus,
            offline,
            queue: Arc::new(queue),
        })
    }

    /// Prepare the download directory. Returns its path.
    #[instrument(skip(self))]
    pub async fn initialize(&self) -> Result<PathBuf> {
        let dir = self.offline.initialize().await?;
        info!("Player service ready");
        Ok(dir)
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    pub fn queue(&self) -> &QueueOrchestrator {
        &self.queue
    }

    pub fn offline(&self) -> &OfflineStorageService {
        &self.offline
    }

    /// Shared handle to the session's event bus.
    pub fn events(&self) -> Arc<EventBus> {
        Arc::clone(&self.event_bus)
    }

    pub fn subscribe(&self) -> EventStream {
        EventStream::new(self.event_bus.subscribe())
    }

    /// End the session's queue. Downloads are kept.
    #[instrument(skip(self))]
    pub async fn sign_out(&self) -> Result<()> {
        self.queue.reset_queue().await?;
        info!("Signed out, queue cleared");
        Ok(())
    }
}

/// Convenience bootstrapper for desktop hosts.
///
/// Metadata is stored in a SQLite database at `database_path`; downloads go to
/// the platform data directory.
///
/// ```no_run
/// # async fn example(engine: std::sync::Arc<dyn bridge_traits::PlaybackEngine>) -> core_service::Result<()> {
/// let player = core_service::bootstrap_desktop(engine, "/tmp/player.db".into()).await?;
/// let downloads = player.offline().get_downloaded_songs().await?;
/// # Ok(())
/// # }
/// ```
#[cfg(feature = "desktop-shims")]
pub async fn bootstrap_desktop(
    engine: Arc<dyn PlaybackEngine>,
    database_path: PathBuf,
) -> Result<PlayerService> {
    let store = bridge_desktop::SqliteKeyValueStore::new(database_path)
        .await
        .map_err(|err| CoreError::InitializationFailed(err.to_string()))?;

    let config = PlayerConfig::builder()
        .playback_engine(engine)
        .key_value_store(Arc::new(store))
        .build()?;

    let service = PlayerService::new(config)?;
    service.initialize().await?;
    Ok(service)
}
