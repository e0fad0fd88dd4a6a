//! Background tilt sampling.

pub mod controller;
pub mod loop_worker;

pub use controller::{ChannelTiltSource, TiltMonitor, TiltSource};
