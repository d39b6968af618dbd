//! # Module Registration
//!
//! The read-only properties and method names exported to the scripting
//! environment when the module loads.

use bridge_traits::encoding::Encoding;
use bridge_traits::output::{OutputModule, StreamParams, STATUS_OK};
use tracing::{debug, warn};

use crate::handle::HANDLE_RECORD_SIZE;
use crate::value::ScriptValue;

/// Methods exported alongside the properties.
pub const METHOD_NAMES: [&str; 4] = ["open", "write", "flush", "close"];

const METADATA_NAMES: [&str; 6] = [
    "api_version",
    "name",
    "description",
    "revision",
    "formats",
    "sizeof_audio_output_t",
];

/// Snapshot of everything registration exposes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleExports {
    pub api_version: i32,
    pub name: String,
    pub description: String,
    pub revision: String,
    /// Encodings the backend supports at the probe parameters, or `0` when
    /// the probe could not open a stream.
    pub formats: i32,
    pub sizeof_audio_output_t: u32,
}

impl ModuleExports {
    /// Read the backend metadata and probe its supported formats.
    pub fn register(module: &dyn OutputModule, probe: &StreamParams) -> Self {
        let info = module.info();
        let formats = probe_formats(module, probe);

        debug!(
            backend = %info.name,
            api_version = info.api_version,
            formats,
            "Output module registered"
        );

        Self {
            api_version: info.api_version,
            name: info.name.clone(),
            description: info.description.clone(),
            revision: info.revision.clone(),
            formats,
            sizeof_audio_output_t: u32::try_from(HANDLE_RECORD_SIZE).unwrap_or(u32::MAX),
        }
    }

    /// Look up an exported property by name.
    pub fn get(&self, property: &str) -> Option<ScriptValue> {
        let value = match property {
            "api_version" => ScriptValue::Int(self.api_version),
            "name" => ScriptValue::Str(self.name.clone()),
            "description" => ScriptValue::Str(self.description.clone()),
            "revision" => ScriptValue::Str(self.revision.clone()),
            "formats" => ScriptValue::Int(self.formats),
            "sizeof_audio_output_t" => ScriptValue::Uint(self.sizeof_audio_output_t),
            constant => ScriptValue::Int(encoding_constant(constant)?.code()),
        };
        Some(value)
    }

    /// Every exported property name, metadata first, then the encoding
    /// constants in export order.
    pub fn property_names(&self) -> Vec<&'static str> {
        METADATA_NAMES
            .into_iter()
            .chain(Encoding::ALL.iter().map(|encoding| encoding.constant_name()))
            .collect()
    }

    pub fn has_method(&self, name: &str) -> bool {
        METHOD_NAMES.contains(&name)
    }

    /// Whether `format` intersects the probed mask.
    pub fn supports(&self, format: i32) -> bool {
        self.formats & format != 0
    }
}

fn encoding_constant(name: &str) -> Option<Encoding> {
    Encoding::ALL
        .into_iter()
        .find(|encoding| encoding.constant_name() == name)
}

/// Throwaway init/open/get_formats/close cycle on a private stream.
fn probe_formats(module: &dyn OutputModule, params: &StreamParams) -> i32 {
    let mut output = match module.init(params) {
        Ok(output) => output,
        Err(status) => {
            warn!(status, "Format probe: backend init failed; reporting no formats");
            return 0;
        }
    };

    let status = output.open(params);
    let formats = if status == STATUS_OK {
        let formats = output.get_formats(params);
        output.close();
        formats
    } else {
        warn!(status, "Format probe: backend open failed; reporting no formats");
        0
    };

    if output.supports_deinit() {
        let status = output.deinit();
        if status != STATUS_OK {
            warn!(status, "Format probe: backend deinit failed");
        }
    }

    formats
}
