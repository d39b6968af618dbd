//! Raw PCM file sink.
//!
//! Streams are written headerless, interleaved, native-endian: exactly the
//! bytes the caller handed over. Useful for capturing what a player would
//! have sent to the device.

use bridge_traits::error::{BridgeError, Result};
use bridge_traits::output::{
    AudioOutput, ModuleInfo, OutputModule, Status, StreamParams, STATUS_ERR, STATUS_OK,
};
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::{all_formats, validate_params, OUTPUT_API_VERSION};

/// Backend whose streams append to a single file.
#[derive(Debug, Clone)]
pub struct RawFileOutputModule {
    info: ModuleInfo,
    path: PathBuf,
}

impl RawFileOutputModule {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            info: ModuleInfo::new(
                OUTPUT_API_VERSION,
                "raw",
                "Writes raw interleaved PCM to a file",
                env!("CARGO_PKG_VERSION"),
            ),
            path: path.into(),
        }
    }

    /// Write to `speaker-output/speaker-output.pcm` in the user's cache
    /// directory, falling back to the system temp directory. The directory
    /// is created here.
    pub fn in_cache_dir() -> Self {
        let path = dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("speaker-output")
            .join("speaker-output.pcm");

        Self::create(&path).unwrap_or_else(|err| {
            warn!(path = %path.display(), error = %err, "Could not create output directory");
            Self::new(path)
        })
    }

    /// Like [`new`](Self::new), creating the parent directory first.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let parent = path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .ok_or_else(|| BridgeError::NoParentDirectory(path.clone()))?;
        fs::create_dir_all(parent)?;
        Ok(Self::new(path))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl OutputModule for RawFileOutputModule {
    fn info(&self) -> &ModuleInfo {
        &self.info
    }

    fn init(&self, params: &StreamParams) -> std::result::Result<Box<dyn AudioOutput>, Status> {
        validate_params(params)?;
        Ok(Box::new(RawFileOutput {
            path: self.path.clone(),
            writer: None,
        }))
    }
}

/// A stream of the raw file backend.
///
/// There is no `deinit`: closing the file releases everything.
#[derive(Debug)]
pub struct RawFileOutput {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
}

impl AudioOutput for RawFileOutput {
    fn open(&mut self, _params: &StreamParams) -> Status {
        match OpenOptions::new().create(true).append(true).open(&self.path) {
            Ok(file) => {
                debug!(path = %self.path.display(), "Opened raw output file");
                self.writer = Some(BufWriter::new(file));
                STATUS_OK
            }
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "Failed to open raw output file");
                STATUS_ERR
            }
        }
    }

    fn write(&mut self, buffer: &[u8]) -> i32 {
        let Some(writer) = self.writer.as_mut() else {
            return STATUS_ERR;
        };
        match writer.write(buffer) {
            Ok(written) => i32::try_from(written).unwrap_or(i32::MAX),
            Err(err) => {
                warn!(error = %err, "Raw output write failed");
                STATUS_ERR
            }
        }
    }

    fn supports_flush(&self) -> bool {
        true
    }

    fn flush(&mut self) {
        if let Some(writer) = self.writer.as_mut() {
            if let Err(err) = writer.flush() {
                warn!(error = %err, "Raw output flush failed");
            }
        }
    }

    fn close(&mut self) {
        self.flush();
        self.writer = None;
    }

    fn get_formats(&self, _params: &StreamParams) -> i32 {
        all_formats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_bytes_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.pcm");
        let module = RawFileOutputModule::new(&path);
        let params = StreamParams::probe_default();

        let mut output = module.init(&params).unwrap();
        assert_eq!(output.open(&params), STATUS_OK);
        assert_eq!(output.write(&[1, 2, 3, 4]), 4);
        assert_eq!(output.write(&[5, 6]), 2);
        output.close();

        assert_eq!(fs::read(&path).unwrap(), vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn flush_makes_bytes_visible_before_close() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flushed.pcm");
        let params = StreamParams::probe_default();
        let mut output = RawFileOutputModule::new(&path).init(&params).unwrap();

        output.open(&params);
        output.write(&[9u8; 32]);
        output.flush();
        assert_eq!(fs::read(&path).unwrap().len(), 32);
        output.close();
    }

    #[test]
    fn has_no_deinit() {
        let params = StreamParams::probe_default();
        let output = RawFileOutputModule::new("unused.pcm").init(&params).unwrap();
        assert!(!output.supports_deinit());
        assert!(output.supports_flush());
    }

    #[test]
    fn open_fails_for_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.pcm");
        let params = StreamParams::probe_default();
        let mut output = RawFileOutputModule::new(path).init(&params).unwrap();

        assert_eq!(output.open(&params), STATUS_ERR);
        assert_eq!(output.write(&[0u8; 4]), STATUS_ERR);
    }

    #[test]
    fn create_rejects_bare_file_name() {
        let err = RawFileOutputModule::create("out.pcm").unwrap_err();
        assert!(matches!(err, BridgeError::NoParentDirectory(ref path) if path == Path::new("out.pcm")));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn cache_dir_sink_opens_on_fresh_cache() {
        let cache = tempfile::tempdir().unwrap();
        std::env::set_var("XDG_CACHE_HOME", cache.path());

        let module = RawFileOutputModule::in_cache_dir();
        std::env::remove_var("XDG_CACHE_HOME");

        assert!(module.path().starts_with(cache.path()));
        assert!(module.path().parent().unwrap().is_dir());

        let params = StreamParams::probe_default();
        let mut output = module.init(&params).unwrap();
        assert_eq!(output.open(&params), STATUS_OK);
        assert_eq!(output.write(&[1, 2]), 2);
        output.close();
        assert_eq!(fs::read(module.path()).unwrap(), vec![1, 2]);
    }

    #[test]
    fn create_makes_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.pcm");
        let module = RawFileOutputModule::create(&path).unwrap();
        assert!(path.parent().unwrap().is_dir());
        assert_eq!(module.path(), path.as_path());
    }
}
