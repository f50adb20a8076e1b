//! Capability detection
//!
//! Probes a live backend once per connection target and keeps the result
//! for the process lifetime. Probe failures never surface: they are logged
//! and the affected features are treated as unavailable.

mod cache;
mod detect;

pub use cache::CapabilityCache;
pub use detect::{capability_from, detect};
