//! Workspace façade crate.
//!
//! Re-exports the workspace crates behind feature flags so a host can depend
//! on `speaker-workspace` alone:
//!
//! - `desktop-shims` (default): [`core_speaker`] plus the desktop backends in
//!   [`bridge_desktop`]
//! - `raw-file-output`: same, with the raw file sink as the linked backend
//! - `core-only`: just the binding layer in [`core_output`]

#[cfg(feature = "core-only")]
pub use core_output;

#[cfg(feature = "desktop-shims")]
pub use bridge_desktop;
#[cfg(feature = "desktop-shims")]
pub use core_speaker;
