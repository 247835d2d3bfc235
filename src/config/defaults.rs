//! Built-in option defaults (layer 1)

use native_toolchain::ToolchainFamily;
use serde_json::Value;

use super::merge::OptionLayer;
use super::options::keys;
use crate::naming::{NamingConventions, Platform};

/// Built-in defaults for one platform profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltinDefaults {
    /// Toolchain registered under this name is used unless overridden
    pub compilers: String,

    /// Artifact naming formatters
    pub naming: NamingConventions,
}

impl BuiltinDefaults {
    pub fn for_platform(platform: Platform) -> Self {
        let family = match platform {
            Platform::Windows => ToolchainFamily::Msvc,
            Platform::Unix => ToolchainFamily::Gcc,
        };
        Self {
            compilers: family.as_str().to_string(),
            naming: NamingConventions::for_platform(platform),
        }
    }

    /// Convert to an option layer for merging
    pub fn to_layer(&self) -> OptionLayer {
        let empty = || Value::Array(Vec::new());
        let mut layer = OptionLayer::new();
        layer.insert(keys::COMPILERS.into(), Value::from(self.compilers.as_str()));
        layer.insert(keys::LIBS.into(), empty());
        layer.insert(keys::LIB_PATHS.into(), empty());
        layer.insert(keys::C_FLAGS.into(), Value::Null);
        layer.insert(keys::CXX_FLAGS.into(), empty());
        layer.insert(keys::COMPILER_PATH.into(), empty());
        layer.insert(keys::INCLUDE.into(), empty());
        layer.insert(keys::LINK_FLAGS.into(), empty());
        layer.insert(keys::EXE_NAME_FN.into(), self.naming.executable.as_str().into());
        layer.insert(keys::LIB_NAME_FN.into(), self.naming.shared_library.as_str().into());
        layer.insert(
            keys::STATIC_LIB_NAME_FN.into(),
            self.naming.static_library.as_str().into(),
        );
        layer.insert(keys::OBJ_NAME_FN.into(), self.naming.object.as_str().into());
        layer
    }
}
