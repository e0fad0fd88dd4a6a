use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum DetectionTier {
    /// Edge detection only.
    Simple,
    /// ML detector allowed.
    Enhanced,
}

impl Default for DetectionTier {
    fn default() -> Self {
        DetectionTier::Simple
    }
}

impl DetectionTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectionTier::Simple => "simple",
            DetectionTier::Enhanced => "enhanced",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeviceCapabilityProfile {
    pub tier: DetectionTier,
    pub reason: String,
    pub timestamp: DateTime<Utc>,
}

impl DeviceCapabilityProfile {
    pub fn new(tier: DetectionTier, reason: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            tier,
            reason: reason.into(),
            timestamp,
        }
    }

    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.timestamp < ttl
    }
}
