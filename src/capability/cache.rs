use std::sync::{Arc, OnceLock, RwLock};

use chrono::{DateTime, Duration, Utc};

use crate::models::DeviceCapabilityProfile;

static GLOBAL_CACHE: OnceLock<Arc<CapabilityCache>> = OnceLock::new();

/// In-memory capability profile with a freshness window.
#[derive(Debug)]
pub struct CapabilityCache {
    ttl: Duration,
    profile: RwLock<Option<DeviceCapabilityProfile>>,
}

impl Default for CapabilityCache {
    fn default() -> Self {
        Self::new(Duration::days(7))
    }
}

impl CapabilityCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            profile: RwLock::new(None),
        }
    }

    /// Process-wide cache shared by every classifier that does not bring its own.
    pub fn global() -> Arc<CapabilityCache> {
        Arc::clone(GLOBAL_CACHE.get_or_init(|| Arc::new(CapabilityCache::default())))
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The cached profile if it is younger than the ttl.
    pub fn get_cached(&self, now: DateTime<Utc>) -> Option<DeviceCapabilityProfile> {
        let guard = match self.profile.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard
            .as_ref()
            .filter(|profile| profile.is_fresh(now, self.ttl))
            .cloned()
    }

    pub fn store(&self, profile: DeviceCapabilityProfile) {
        let mut guard = match self.profile.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = Some(profile);
    }

    pub fn invalidate(&self) {
        let mut guard = match self.profile.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DetectionTier;

    #[test]
    fn expires_after_ttl() {
        let cache = CapabilityCache::default();
        let then = Utc::now();
        cache.store(DeviceCapabilityProfile::new(DetectionTier::Enhanced, "ok", then));

        assert!(cache.get_cached(then + Duration::days(6)).is_some());
        assert!(cache.get_cached(then + Duration::days(7)).is_none());
    }

    #[test]
    fn invalidate_clears_profile() {
        let cache = CapabilityCache::default();
        let now = Utc::now();
        cache.store(DeviceCapabilityProfile::new(DetectionTier::Simple, "sim", now));
        cache.invalidate();
        assert!(cache.get_cached(now).is_none());
    }

    #[test]
    fn global_is_shared() {
        assert!(Arc::ptr_eq(&CapabilityCache::global(), &CapabilityCache::global()));
    }
}
