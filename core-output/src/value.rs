//! Values crossing the scripting boundary.
//!
//! The scripting engine's own marshaling is out of reach here, so results are
//! handed to callbacks as [`ScriptValue`]s and callbacks are plain one-shot
//! closures.

use std::fmt;

use thiserror::Error;

/// A value passed to a scripting callback or read from an exported property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptValue {
    Undefined,
    Int(i32),
    Uint(u32),
    Str(String),
}

impl ScriptValue {
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            ScriptValue::Int(value) => Some(*value),
            ScriptValue::Uint(value) => i32::try_from(*value).ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ScriptValue::Str(value) => Some(value),
            _ => None,
        }
    }
}

impl From<i32> for ScriptValue {
    fn from(value: i32) -> Self {
        ScriptValue::Int(value)
    }
}

impl From<u32> for ScriptValue {
    fn from(value: u32) -> Self {
        ScriptValue::Uint(value)
    }
}

impl From<&str> for ScriptValue {
    fn from(value: &str) -> Self {
        ScriptValue::Str(value.to_string())
    }
}

impl From<String> for ScriptValue {
    fn from(value: String) -> Self {
        ScriptValue::Str(value)
    }
}

/// An error thrown by a scripting callback.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ScriptError {
    message: String,
}

impl ScriptError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

type CallbackFn = Box<dyn FnOnce(&[ScriptValue]) -> Result<(), ScriptError> + Send>;

/// A one-shot completion callback.
///
/// Consumed by [`call`](Self::call), so it cannot fire twice.
pub struct ScriptCallback(CallbackFn);

impl ScriptCallback {
    pub fn new<F>(callback: F) -> Self
    where
        F: FnOnce(&[ScriptValue]) -> Result<(), ScriptError> + Send + 'static,
    {
        Self(Box::new(callback))
    }

    /// Wrap a callback that cannot fail.
    pub fn from_fn<F>(callback: F) -> Self
    where
        F: FnOnce(&[ScriptValue]) + Send + 'static,
    {
        Self::new(move |args| {
            callback(args);
            Ok(())
        })
    }

    pub fn call(self, args: &[ScriptValue]) -> Result<(), ScriptError> {
        (self.0)(args)
    }
}

impl fmt::Debug for ScriptCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ScriptCallback { ... }")
    }
}

/// Result types an envelope can carry back to a callback.
///
/// `Default` is the pre-initialized slot value, reported when the body never
/// stored a result.
pub trait CompletionValue: Default + Send + 'static {
    fn into_script_value(self) -> ScriptValue;
}

impl CompletionValue for i32 {
    fn into_script_value(self) -> ScriptValue {
        ScriptValue::Int(self)
    }
}

impl CompletionValue for u32 {
    fn into_script_value(self) -> ScriptValue {
        ScriptValue::Uint(self)
    }
}

impl CompletionValue for () {
    fn into_script_value(self) -> ScriptValue {
        ScriptValue::Undefined
    }
}
