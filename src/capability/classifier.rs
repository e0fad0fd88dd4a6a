use std::sync::Arc;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Duration, Utc};
use log::{info, warn};

use crate::models::{DetectionTier, DeviceCapabilityProfile};
use crate::settings::{KeyValueStore, CAPABILITY_PROFILE_KEY};

use super::cache::CapabilityCache;
use super::probe::{DeviceFacts, DeviceProbe, OsFamily, OsVersion};

const GIB: u64 = 1024 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    pub min_year_class: u32,
    pub min_memory_bytes: u64,
    pub min_ios_major: u32,
    pub min_android_major: u32,
    pub min_macos_major: u32,
    pub min_windows_major: u32,
    /// Kernel major on Linux.
    pub min_linux_major: u32,
    pub ttl: Duration,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            min_year_class: 2020,
            min_memory_bytes: 2 * GIB,
            min_ios_major: 14,
            min_android_major: 10,
            min_macos_major: 11,
            min_windows_major: 10,
            min_linux_major: 5,
            ttl: Duration::days(7),
        }
    }
}

impl ClassifierConfig {
    fn is_modern(&self, os: &OsVersion) -> bool {
        let min = match os.family {
            OsFamily::Ios => self.min_ios_major,
            OsFamily::Android => self.min_android_major,
            OsFamily::MacOs => self.min_macos_major,
            OsFamily::Windows => self.min_windows_major,
            OsFamily::Linux => self.min_linux_major,
            OsFamily::Other => return false,
        };
        os.major >= min
    }
}

/// Pure tier decision. Anything unreadable lands on [`DetectionTier::Simple`].
pub fn classify(
    facts: Result<DeviceFacts>,
    config: &ClassifierConfig,
    now: DateTime<Utc>,
) -> DeviceCapabilityProfile {
    let facts = match facts {
        Ok(facts) => facts,
        Err(err) => {
            warn!("device probe failed, using simple tier: {err:#}");
            return DeviceCapabilityProfile::new(DetectionTier::Simple, "device facts unavailable", now);
        }
    };

    if !facts.is_physical_device {
        return DeviceCapabilityProfile::new(DetectionTier::Simple, "not a physical device", now);
    }

    let Some(year) = facts.year_class else {
        return DeviceCapabilityProfile::new(DetectionTier::Simple, "device year unknown", now);
    };
    if year < config.min_year_class {
        return DeviceCapabilityProfile::new(
            DetectionTier::Simple,
            format!("device year {year} below {}", config.min_year_class),
            now,
        );
    }
    if facts.total_memory_bytes < config.min_memory_bytes {
        return DeviceCapabilityProfile::new(
            DetectionTier::Simple,
            format!("{} MiB memory is not enough", facts.total_memory_bytes / (1024 * 1024)),
            now,
        );
    }
    if !config.is_modern(&facts.os) {
        return DeviceCapabilityProfile::new(
            DetectionTier::Simple,
            format!("{:?} {} is not a modern os", facts.os.family, facts.os.major),
            now,
        );
    }

    DeviceCapabilityProfile::new(DetectionTier::Enhanced, "capable device", now)
}

/// Classifies the device and remembers the answer.
///
/// Lookup order: in-memory cache, then the persisted profile in the
/// key-value store, then a fresh probe. Stale entries are ignored.
pub struct CapabilityClassifier {
    probe: Arc<dyn DeviceProbe>,
    cache: Arc<CapabilityCache>,
    store: Option<Arc<dyn KeyValueStore>>,
    config: ClassifierConfig,
}

impl CapabilityClassifier {
    /// Classifier backed by the process-wide [`CapabilityCache::global`].
    pub fn new(probe: Arc<dyn DeviceProbe>, config: ClassifierConfig) -> Self {
        Self {
            probe,
            cache: CapabilityCache::global(),
            store: None,
            config,
        }
    }

    pub fn with_cache(mut self, cache: Arc<CapabilityCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub async fn classify(&self) -> DeviceCapabilityProfile {
        let now = Utc::now();
        if let Some(profile) = self.cache.get_cached(now) {
            return profile;
        }
        if let Some(profile) = self.load_persisted(now).await {
            self.cache.store(profile.clone());
            return profile;
        }

        self.probe_and_store(now).await
    }

    pub fn get_cached(&self) -> Option<DeviceCapabilityProfile> {
        self.cache.get_cached(Utc::now())
    }

    /// Drop the in-memory profile. A persisted profile still answers the
    /// next [`classify`](Self::classify) while fresh.
    pub fn invalidate(&self) {
        self.cache.invalidate();
    }

    /// Discard every cached answer and classify from a fresh probe.
    pub async fn force_recheck(&self) -> DeviceCapabilityProfile {
        self.cache.invalidate();
        self.probe_and_store(Utc::now()).await
    }

    async fn probe_and_store(&self, now: DateTime<Utc>) -> DeviceCapabilityProfile {
        let probe = Arc::clone(&self.probe);
        let facts = tokio::task::spawn_blocking(move || probe.probe())
            .await
            .unwrap_or_else(|join_err| Err(anyhow!("device probe task failed: {join_err}")));
        let profile = classify(facts, &self.config, now);
        info!(
            "device classified as {} ({})",
            profile.tier.as_str(),
            profile.reason
        );

        self.cache.store(profile.clone());
        self.persist(&profile).await;
        profile
    }

    async fn load_persisted(&self, now: DateTime<Utc>) -> Option<DeviceCapabilityProfile> {
        let store = self.store.as_ref()?;
        let raw = match store.get(CAPABILITY_PROFILE_KEY).await {
            Ok(raw) => raw?,
            Err(err) => {
                warn!("failed to read persisted capability profile: {err:#}");
                return None;
            }
        };
        match serde_json::from_str::<DeviceCapabilityProfile>(&raw) {
            Ok(profile) if profile.is_fresh(now, self.config.ttl) => Some(profile),
            Ok(_) => None,
            Err(err) => {
                warn!("ignoring malformed capability profile: {err}");
                None
            }
        }
    }

    async fn persist(&self, profile: &DeviceCapabilityProfile) {
        let Some(store) = self.store.as_ref() else {
            return;
        };
        let serialized = match serde_json::to_string(profile) {
            Ok(serialized) => serialized,
            Err(err) => {
                warn!("failed to serialize capability profile: {err}");
                return;
            }
        };
        if let Err(err) = store.set(CAPABILITY_PROFILE_KEY, serialized).await {
            warn!("failed to persist capability profile: {err:#}");
        }
    }
}
