//! Platform abstraction layer
//!
//! Handles browser/native differences for:
//! - Input events (keyboard and touch merged into one control set)
//! - Focus loss (release everything so nothing sticks)
//! - JS bindings for the engine bridge (wasm32 only)

pub mod input;
#[cfg(target_arch = "wasm32")]
pub mod web;

pub use input::{Control, InputState};
