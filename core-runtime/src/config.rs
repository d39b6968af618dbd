//! # Output Configuration
//!
//! The configuration system uses a builder to construct an [`OutputConfig`]
//! holding the injected output backend and the dispatch tunables of the
//! work-offload core. The builder fails fast when the backend is missing.
//!
//! ## Required Dependencies
//!
//! - `OutputModule` - the linked audio backend. When the `desktop-shims`
//!   feature is enabled the compiled-in desktop backend is injected if none is
//!   provided.
//!
//! ## Tunables
//!
//! [`DispatchSettings`] is plain data and can be loaded from JSON; every field
//! is optional in the document and falls back to its default:
//!
//! ```rust
//! use core_runtime::config::{DispatchSettings, FlushReporting};
//!
//! let settings = DispatchSettings::from_json_str(r#"{ "worker_threads": 2 }"#).unwrap();
//! assert_eq!(settings.worker_threads, 2);
//! assert_eq!(settings.flush_reporting, FlushReporting::Observed);
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::OutputConfig;
//! use std::sync::Arc;
//!
//! let config = OutputConfig::builder()
//!     .output_module(Arc::new(MyBackend::new()))
//!     .worker_threads(2)
//!     .build()
//!     .expect("Failed to build config");
//! ```

use crate::error::{Error, Result};
use bridge_traits::output::{OutputModule, StreamParams};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Upper bound on the worker pool size.
pub const MAX_WORKER_THREADS: usize = 512;

const DEFAULT_WORKER_THREADS: usize = 4;
const DEFAULT_THREAD_NAME: &str = "speaker-worker";
const DEFAULT_SHUTDOWN_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_KEEP_ALIVE_MS: u64 = 10_000;

/// Value reported to a flush callback.
///
/// The native binding always ends its flush body by overwriting the result
/// with `1`, so callers have only ever observed `1`. `Observed` keeps that;
/// `Corrected` reports `0`, the value the flush body computes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlushReporting {
    #[default]
    Observed,
    Corrected,
}

/// Tunables of the work dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchSettings {
    /// Maximum number of threads running blocking backend calls.
    pub worker_threads: usize,
    /// Name given to pool threads.
    pub thread_name: String,
    /// How long teardown waits for running backend calls.
    pub shutdown_timeout_ms: u64,
    /// Idle time after which a pool thread exits.
    pub worker_keep_alive_ms: u64,
    pub flush_reporting: FlushReporting,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            worker_threads: DEFAULT_WORKER_THREADS,
            thread_name: DEFAULT_THREAD_NAME.to_string(),
            shutdown_timeout_ms: DEFAULT_SHUTDOWN_TIMEOUT_MS,
            worker_keep_alive_ms: DEFAULT_KEEP_ALIVE_MS,
            flush_reporting: FlushReporting::default(),
        }
    }
}

impl DispatchSettings {
    /// Parse settings from a JSON document and validate them.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Read settings from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "Failed to read dispatch settings from {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json_str(&json)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }

    pub fn worker_keep_alive(&self) -> Duration {
        Duration::from_millis(self.worker_keep_alive_ms)
    }

    /// Validates the settings and returns an error if invalid.
    ///
    /// This checks:
    /// - Worker count is in `1..=MAX_WORKER_THREADS`
    /// - Thread name is not empty
    /// - Keep-alive is not zero
    pub fn validate(&self) -> Result<()> {
        if self.worker_threads == 0 {
            return Err(Error::Config(
                "Worker thread count must be greater than 0".to_string(),
            ));
        }

        if self.worker_threads > MAX_WORKER_THREADS {
            return Err(Error::Config(format!(
                "Worker thread count exceeds maximum of {}",
                MAX_WORKER_THREADS
            )));
        }

        if self.thread_name.trim().is_empty() {
            return Err(Error::Config("Worker thread name cannot be empty".to_string()));
        }

        if self.worker_keep_alive_ms == 0 {
            return Err(Error::Config(
                "Worker keep-alive must be greater than 0 ms".to_string(),
            ));
        }

        Ok(())
    }
}

/// Configuration of the output core.
///
/// Use [`OutputConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct OutputConfig {
    /// The linked backend (required)
    pub output_module: Arc<dyn OutputModule>,

    pub dispatch: DispatchSettings,

    /// Parameters of the format probe run at registration
    pub probe_params: StreamParams,
}

impl std::fmt::Debug for OutputConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputConfig")
            .field("output_module", &self.output_module.info().name)
            .field("dispatch", &self.dispatch)
            .field("probe_params", &self.probe_params)
            .finish()
    }
}

impl OutputConfig {
    pub fn builder() -> OutputConfigBuilder {
        OutputConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    pub fn validate(&self) -> Result<()> {
        self.dispatch.validate()?;

        if self.probe_params.channels <= 0 || self.probe_params.rate <= 0 {
            return Err(Error::Config(format!(
                "Probe parameters must have positive channels and rate, got {:?}",
                self.probe_params
            )));
        }

        Ok(())
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn output_module_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "OutputModule".to_string(),
        message: "An OutputModule implementation is required to reach an audio sink. \
                 Desktop: enable the 'desktop-shims' feature to use the compiled-in backend. \
                 Otherwise inject one with OutputConfigBuilder::output_module()."
            .to_string(),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_output_module() -> Result<Arc<dyn OutputModule>> {
    Ok(bridge_desktop::default_module())
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_output_module() -> Result<Arc<dyn OutputModule>> {
    Err(output_module_missing_error())
}

/// Builder for constructing [`OutputConfig`] instances.
#[derive(Default)]
pub struct OutputConfigBuilder {
    output_module: Option<Arc<dyn OutputModule>>,
    dispatch: DispatchSettings,
    probe_params: Option<StreamParams>,
}

impl OutputConfigBuilder {
    /// Sets the backend.
    ///
    /// Required unless the `desktop-shims` feature is enabled.
    pub fn output_module(mut self, module: Arc<dyn OutputModule>) -> Self {
        self.output_module = Some(module);
        self
    }

    /// Replaces all dispatch tunables at once, e.g. with settings loaded
    /// from JSON.
    pub fn dispatch(mut self, settings: DispatchSettings) -> Self {
        self.dispatch = settings;
        self
    }

    pub fn worker_threads(mut self, threads: usize) -> Self {
        self.dispatch.worker_threads = threads;
        self
    }

    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.dispatch.thread_name = name.into();
        self
    }

    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.dispatch.shutdown_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn flush_reporting(mut self, reporting: FlushReporting) -> Self {
        self.dispatch.flush_reporting = reporting;
        self
    }

    /// Overrides the format probe parameters (default: 2 channels,
    /// 44100 Hz, signed 16-bit).
    pub fn probe_params(mut self, params: StreamParams) -> Self {
        self.probe_params = Some(params);
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// - [`Error::CapabilityMissing`] when no backend was injected and no
    ///   default is compiled in
    /// - [`Error::Config`] when a tunable is out of range
    pub fn build(self) -> Result<OutputConfig> {
        let output_module = match self.output_module {
            Some(module) => module,
            None => provide_default_output_module()?,
        };

        let config = OutputConfig {
            output_module,
            dispatch: self.dispatch,
            probe_params: self.probe_params.unwrap_or_else(StreamParams::probe_default),
        };

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::output::{AudioOutput, ModuleInfo, Status, STATUS_ERR};

    struct MockModule {
        info: ModuleInfo,
    }

    impl MockModule {
        fn new() -> Self {
            Self {
                info: ModuleInfo::new(2, "mock", "Test backend", "0"),
            }
        }
    }

    impl OutputModule for MockModule {
        fn info(&self) -> &ModuleInfo {
            &self.info
        }

        fn init(&self, _params: &StreamParams) -> std::result::Result<Box<dyn AudioOutput>, Status> {
            Err(STATUS_ERR)
        }
    }

    fn mock_module() -> Arc<dyn OutputModule> {
        Arc::new(MockModule::new())
    }

    #[test]
    fn test_defaults() {
        let settings = DispatchSettings::default();
        assert_eq!(settings.worker_threads, 4);
        assert_eq!(settings.thread_name, "speaker-worker");
        assert_eq!(settings.shutdown_timeout(), Duration::from_secs(5));
        assert_eq!(settings.worker_keep_alive(), Duration::from_secs(10));
        assert_eq!(settings.flush_reporting, FlushReporting::Observed);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_builder_with_module() {
        let config = OutputConfig::builder()
            .output_module(mock_module())
            .worker_threads(2)
            .thread_name("audio-io")
            .shutdown_timeout(Duration::from_millis(250))
            .flush_reporting(FlushReporting::Corrected)
            .build()
            .unwrap();

        assert_eq!(config.output_module.info().name, "mock");
        assert_eq!(config.dispatch.worker_threads, 2);
        assert_eq!(config.dispatch.thread_name, "audio-io");
        assert_eq!(config.dispatch.shutdown_timeout_ms, 250);
        assert_eq!(config.dispatch.flush_reporting, FlushReporting::Corrected);
        assert_eq!(config.probe_params, StreamParams::probe_default());
    }

    #[cfg(not(feature = "desktop-shims"))]
    #[test]
    fn test_builder_requires_output_module() {
        let result = OutputConfig::builder().build();
        match result {
            Err(Error::CapabilityMissing { capability, .. }) => {
                assert_eq!(capability, "OutputModule")
            }
            other => panic!("expected CapabilityMissing, got {:?}", other),
        }
    }

    #[cfg(feature = "desktop-shims")]
    #[test]
    fn test_build_with_desktop_default() {
        let config = OutputConfig::builder().build().unwrap();
        assert!(!config.output_module.info().name.is_empty());
    }

    #[test]
    fn test_validate_rejects_zero_workers() {
        let result = OutputConfig::builder()
            .output_module(mock_module())
            .worker_threads(0)
            .build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_rejects_excessive_workers() {
        let settings = DispatchSettings {
            worker_threads: MAX_WORKER_THREADS + 1,
            ..DispatchSettings::default()
        };
        assert!(matches!(settings.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_rejects_empty_thread_name() {
        let result = OutputConfig::builder()
            .output_module(mock_module())
            .thread_name("  ")
            .build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_rejects_bad_probe_params() {
        let result = OutputConfig::builder()
            .output_module(mock_module())
            .probe_params(StreamParams::new(0, 44100, 0xd0))
            .build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_settings_from_partial_json() {
        let settings = DispatchSettings::from_json_str(
            r#"{ "thread_name": "pcm", "flush_reporting": "corrected" }"#,
        )
        .unwrap();
        assert_eq!(settings.thread_name, "pcm");
        assert_eq!(settings.flush_reporting, FlushReporting::Corrected);
        assert_eq!(settings.worker_threads, 4);
    }

    #[test]
    fn test_settings_from_invalid_json() {
        assert!(matches!(
            DispatchSettings::from_json_str("{ worker_threads: }"),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            DispatchSettings::from_json_str(r#"{ "worker_threads": 0 }"#),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            DispatchSettings::from_json_str(r#"{ "flush_reporting": "sometimes" }"#),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_settings_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dispatch.json");
        std::fs::write(&path, r#"{ "worker_threads": 8, "shutdown_timeout_ms": 100 }"#).unwrap();

        let settings = DispatchSettings::load(&path).unwrap();
        assert_eq!(settings.worker_threads, 8);
        assert_eq!(settings.shutdown_timeout(), Duration::from_millis(100));

        assert!(DispatchSettings::load(dir.path().join("missing.json")).is_err());
    }

    #[test]
    fn test_builder_accepts_loaded_settings() {
        let settings = DispatchSettings {
            worker_threads: 1,
            ..DispatchSettings::default()
        };
        let config = OutputConfig::builder()
            .output_module(mock_module())
            .dispatch(settings.clone())
            .build()
            .unwrap();
        assert_eq!(config.dispatch, settings);
    }

    #[test]
    fn test_config_is_cloneable_and_debuggable() {
        let config = OutputConfig::builder()
            .output_module(mock_module())
            .build()
            .unwrap();
        let cloned = config.clone();
        assert!(Arc::ptr_eq(&config.output_module, &cloned.output_module));
        assert!(format!("{:?}", cloned).contains("mock"));
    }
}
