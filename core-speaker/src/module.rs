//! Accessors over the registered backend.

use core_output::OutputBinding;

use crate::format::{format_constant, PcmFormat};

/// What [`is_supported`] is asked about.
#[derive(Debug, Clone, Copy)]
pub enum FormatQuery<'a> {
    /// A raw encoding code, checked against the backend's format mask.
    Code(i32),
    /// A speaker format, supported when it maps to an encoding.
    Format(&'a PcmFormat),
}

impl From<i32> for FormatQuery<'_> {
    fn from(code: i32) -> Self {
        FormatQuery::Code(code)
    }
}

impl<'a> From<&'a PcmFormat> for FormatQuery<'a> {
    fn from(format: &'a PcmFormat) -> Self {
        FormatQuery::Format(format)
    }
}

/// Name of the linked backend.
pub fn backend(binding: &OutputBinding) -> &str {
    &binding.exports().name
}

pub fn description(binding: &OutputBinding) -> &str {
    &binding.exports().description
}

/// `"{api_version}.{revision}"`.
pub fn version(binding: &OutputBinding) -> String {
    let exports = binding.exports();
    format!("{}.{}", exports.api_version, exports.revision)
}

/// The encoding mask probed at registration.
pub fn supported_formats(binding: &OutputBinding) -> i32 {
    binding.exports().formats
}

pub fn is_supported<'a>(binding: &OutputBinding, query: impl Into<FormatQuery<'a>>) -> bool {
    match query.into() {
        FormatQuery::Code(code) => binding.exports().supports(code),
        FormatQuery::Format(format) => format_constant(format).is_some(),
    }
}
