//! Workspace façade crate.
//!
//! Exposes the feature flags that map onto the individual workspace crates so a
//! host application can depend on `player-core-workspace` and enable the
//! documented features without wiring `core-service` and `core-playback` by hand.

#[cfg(feature = "desktop-shims")]
pub use core_playback as playback;
#[cfg(feature = "desktop-shims")]
pub use core_service as service;
