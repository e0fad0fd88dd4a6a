//! Device capability classification.
//!
//! Decides once per process (and once per week across launches) whether the
//! device may run the ML detector.

pub mod cache;
pub mod classifier;
pub mod probe;

pub use cache::CapabilityCache;
pub use classifier::{classify, CapabilityClassifier, ClassifierConfig};
pub use probe::{DeviceFacts, DeviceProbe, OsFamily, OsVersion, StaticProbe, SysinfoProbe};
