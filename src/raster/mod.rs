//! Dense row-major pixel arenas.
//!
//! Buffers carry explicit `width`, `height` and `stride` (elements between
//! rows). All pixel access goes through [`get_pixel`]/[`set_pixel`] or the
//! row accessors, never through ad hoc index arithmetic at call sites.

pub mod luma;

pub use luma::{get_pixel, set_pixel, LumaBuffer};
