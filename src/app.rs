//! Application module: exposes the app model used by the TUI and runtime.
//!
//! The `App` model lives in `app::model` and holds the current playlist view,
//! selection, the latest playback snapshot and the amplitude meter.

mod meter;
mod model;

pub use meter::Meter;
pub use model::*;

#[cfg(test)]
mod tests;
