//! Key-value persistence for the session and course collections.
//!
//! Each collection is a JSON array stored under a fixed key and rewritten in
//! full on every change: load all, mutate in memory, write all back.

use anyhow::{Context, Result};
use log::warn;
use serde::{de::DeserializeOwned, Serialize};

pub mod json_file;
pub mod memory;
mod migrations;
pub mod repositories;
pub mod sqlite;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;
pub use repositories::{CourseRegistry, SessionRepository};
pub use sqlite::SqliteStore;

pub const SESSIONS_KEY: &str = "lap_time_sessions";
pub const COURSES_KEY: &str = "timing_courses";

/// Whatever settings-style store the host provides.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn put(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// Reads the collection under `key`. A missing key, an unreadable store or
/// undecodable JSON all yield an empty collection; the latter two are logged.
pub(crate) fn load_collection<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Vec<T> {
    let raw = match store.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return Vec::new(),
        Err(err) => {
            warn!("failed to read '{key}': {err:#}");
            return Vec::new();
        }
    };

    match serde_json::from_str(&raw) {
        Ok(items) => items,
        Err(err) => {
            warn!("discarding undecodable '{key}' collection: {err}");
            Vec::new()
        }
    }
}

pub(crate) fn save_collection<T: Serialize>(
    store: &dyn KeyValueStore,
    key: &str,
    items: &[T],
) -> Result<()> {
    let encoded = serde_json::to_string(items).with_context(|| format!("failed to encode '{key}'"))?;
    store
        .put(key, &encoded)
        .with_context(|| format!("failed to write '{key}'"))
}
