pub mod config;
pub mod geo;
pub mod models;
pub mod store;
pub mod timing;
pub mod utils;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use log::info;

use crate::config::TimingConfig;
use crate::geo::ChannelSampler;
use crate::store::{
    CourseRegistry, JsonFileStore, KeyValueStore, SessionRepository, SqliteStore,
};
use crate::timing::SessionController;

pub const DB_FILE_NAME: &str = "lapkeeper.sqlite3";
pub const JSON_FILE_NAME: &str = "lapkeeper.json";

/// Everything a host needs, wired over one store.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn KeyValueStore>,
    pub courses: CourseRegistry,
    pub sessions: SessionRepository,
    pub sampler: Arc<ChannelSampler>,
    pub timing: SessionController,
}

impl AppState {
    pub fn new(store: Arc<dyn KeyValueStore>, config: TimingConfig) -> Self {
        let courses = CourseRegistry::new(store.clone());
        let sessions = SessionRepository::new(store.clone());
        let sampler = Arc::new(ChannelSampler::new(config.sample_channel_capacity));
        let timing = SessionController::new(
            sampler.clone(),
            courses.clone(),
            sessions.clone(),
            config,
        );

        Self {
            store,
            courses,
            sessions,
            sampler,
            timing,
        }
    }

    /// SQLite-backed state under `data_dir`.
    pub fn open(data_dir: &Path, config: TimingConfig) -> Result<Self> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("failed to create data dir {}", data_dir.display()))?;
        let store = SqliteStore::new(data_dir.join(DB_FILE_NAME))?;
        info!("Using SQLite store at {}", store.path().display());
        Ok(Self::new(Arc::new(store), config))
    }

    /// Plain JSON file under `data_dir`, handy for inspecting by hand.
    pub fn open_json(data_dir: &Path, config: TimingConfig) -> Result<Self> {
        let store = JsonFileStore::new(data_dir.join(JSON_FILE_NAME))?;
        info!("Using JSON store at {}", store.path().display());
        Ok(Self::new(Arc::new(store), config))
    }
}
