use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::utils::BoxFuture;

pub const PHOTO_SAVE_MODE_KEY: &str = "dimscan.photo_save_mode";
pub const AUTO_CAPTURE_ENABLED_KEY: &str = "dimscan.auto_capture_enabled";
pub const CAPABILITY_PROFILE_KEY: &str = "dimscan.capability_profile";

/// Host-provided string key-value persistence.
pub trait KeyValueStore: Send + Sync {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>>>;
    fn set<'a>(&'a self, key: &'a str, value: String) -> BoxFuture<'a, Result<()>>;
}

/// Process-local store, used in tests and by hosts without persistence.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>>> {
        Box::pin(async move { Ok(self.data.lock().await.get(key).cloned()) })
    }

    fn set<'a>(&'a self, key: &'a str, value: String) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.data.lock().await.insert(key.to_string(), value);
            Ok(())
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum PhotoSaveMode {
    Always,
    Never,
    #[default]
    Ask,
}

impl PhotoSaveMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PhotoSaveMode::Always => "always",
            PhotoSaveMode::Never => "never",
            PhotoSaveMode::Ask => "ask",
        }
    }
}

impl FromStr for PhotoSaveMode {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "always" => Ok(PhotoSaveMode::Always),
            "never" => Ok(PhotoSaveMode::Never),
            "ask" => Ok(PhotoSaveMode::Ask),
            _ => Err(anyhow!("unknown photo save mode '{value}'")),
        }
    }
}

/// Typed view over the measurement preferences in a [`KeyValueStore`].
///
/// Reads never fail: a missing, malformed or unreadable value yields the
/// default.
#[derive(Clone)]
pub struct MeasurePreferences {
    store: Arc<dyn KeyValueStore>,
}

impl MeasurePreferences {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> Arc<dyn KeyValueStore> {
        Arc::clone(&self.store)
    }

    pub async fn photo_save_mode(&self) -> PhotoSaveMode {
        self.read_parsed(PHOTO_SAVE_MODE_KEY).await.unwrap_or_default()
    }

    pub async fn set_photo_save_mode(&self, mode: PhotoSaveMode) -> Result<()> {
        self.store
            .set(PHOTO_SAVE_MODE_KEY, mode.as_str().to_string())
            .await
    }

    pub async fn auto_capture_enabled(&self) -> bool {
        self.read_parsed(AUTO_CAPTURE_ENABLED_KEY)
            .await
            .unwrap_or(true)
    }

    pub async fn set_auto_capture_enabled(&self, enabled: bool) -> Result<()> {
        self.store
            .set(AUTO_CAPTURE_ENABLED_KEY, enabled.to_string())
            .await
    }

    async fn read_parsed<T>(&self, key: &str) -> Option<T>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        let raw = match self.store.get(key).await {
            Ok(value) => value?,
            Err(err) => {
                warn!("failed to read preference {key}: {err:#}");
                return None;
            }
        };
        match raw.trim().parse() {
            Ok(value) => Some(value),
            Err(err) => {
                warn!("ignoring malformed preference {key}='{raw}': {err}");
                None
            }
        }
    }
}
