//! Typed snapshot of the native options.

use native_props::{Expr, Properties, PropsResult};
use native_toolchain::Language;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::merge::OptionLayer;
use super::ConfigError;
use crate::naming::FilenameFormat;

/// Option names recognized by the native targets.
pub mod keys {
    pub const COMPILERS: &str = "native.compilers";
    pub const LIBS: &str = "native.libs";
    pub const LIB_PATHS: &str = "native.libpaths";
    pub const C_FLAGS: &str = "native.c.flags";
    pub const CXX_FLAGS: &str = "native.cxx.flags";
    pub const COMPILER_PATH: &str = "native.cxx.path";
    pub const INCLUDE: &str = "native.include";
    pub const LINK_FLAGS: &str = "native.link.flags";
    pub const EXE_NAME_FN: &str = "native.cxx.exenamefn";
    pub const LIB_NAME_FN: &str = "native.cxx.libnamefn";
    pub const STATIC_LIB_NAME_FN: &str = "native.cxx.staticlibnamefn";
    pub const OBJ_NAME_FN: &str = "native.cxx.objnamefn";

    pub const ALL: &[&str] = &[
        COMPILERS,
        LIBS,
        LIB_PATHS,
        C_FLAGS,
        CXX_FLAGS,
        COMPILER_PATH,
        INCLUDE,
        LINK_FLAGS,
        EXE_NAME_FN,
        LIB_NAME_FN,
        STATIC_LIB_NAME_FN,
        OBJ_NAME_FN,
    ];

    pub fn is_known(key: &str) -> bool {
        ALL.contains(&key)
    }
}

/// Merged native options for one call.
///
/// String values are unexpanded; they may reference properties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NativeOptions {
    /// Registered toolchain name to use
    #[serde(rename = "native.compilers")]
    pub compilers: String,

    /// Libraries appended after each target's own list
    #[serde(rename = "native.libs", default)]
    pub libs: Vec<String>,

    #[serde(rename = "native.libpaths", default)]
    pub lib_paths: Vec<String>,

    /// C flags; `None` falls back to the C++ flags
    #[serde(rename = "native.c.flags", default)]
    pub c_flags: Option<Vec<String>>,

    #[serde(rename = "native.cxx.flags", default)]
    pub cxx_flags: Vec<String>,

    /// Directories searched for the compiler executables
    #[serde(rename = "native.cxx.path", default)]
    pub compiler_path: Vec<String>,

    /// Include directories appended after each target's own
    #[serde(rename = "native.include", default)]
    pub include: Vec<String>,

    #[serde(rename = "native.link.flags", default)]
    pub link_flags: Vec<String>,

    #[serde(rename = "native.cxx.exenamefn")]
    pub exe_name: FilenameFormat,

    #[serde(rename = "native.cxx.libnamefn")]
    pub lib_name: FilenameFormat,

    #[serde(rename = "native.cxx.staticlibnamefn")]
    pub static_lib_name: FilenameFormat,

    #[serde(rename = "native.cxx.objnamefn")]
    pub object_name: FilenameFormat,
}

impl NativeOptions {
    /// Validate and convert a merged layer.
    pub fn from_layer(layer: &OptionLayer) -> Result<Self, ConfigError> {
        if let Some(unknown) = layer.keys().find(|k| !keys::is_known(k)) {
            return Err(ConfigError::UnknownOption(unknown.clone()));
        }
        serde_json::from_value(Value::Object(layer.clone())).map_err(|e| {
            ConfigError::InvalidOption {
                key: offending_key(&e.to_string()),
                reason: e.to_string(),
            }
        })
    }

    /// Compiler flags for `language`, before expansion.
    pub fn flags_for(&self, language: Language) -> &[String] {
        match language {
            Language::C => match self.c_flags.as_deref() {
                Some(flags) if !flags.is_empty() => flags,
                _ => &self.cxx_flags,
            },
            Language::Cpp => &self.cxx_flags,
        }
    }
}

/// Expand each value in list mode and split on whitespace, in order.
pub(crate) fn expand_tokens(values: &[String], props: &Properties) -> PropsResult<Vec<String>> {
    let mut out = Vec::new();
    for value in values {
        out.extend(Expr::parse(value)?.tokens(props)?);
    }
    Ok(out)
}

/// Best effort extraction of the option named in a serde error message.
fn offending_key(message: &str) -> String {
    keys::ALL
        .iter()
        .find(|k| message.contains(*k))
        .map_or_else(|| "native.*".to_string(), |k| (*k).to_string())
}
