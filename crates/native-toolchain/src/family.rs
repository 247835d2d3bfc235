//! Toolchain family selection.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::gcc::GccToolchain;
use crate::msvc::MsvcToolchain;
use crate::Toolchain;

/// Built-in compiler families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolchainFamily {
    Gcc,
    Clang,
    Msvc,
}

impl ToolchainFamily {
    pub const ALL: [ToolchainFamily; 3] = [Self::Gcc, Self::Clang, Self::Msvc];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gcc => "gcc",
            Self::Clang => "clang",
            Self::Msvc => "msvc",
        }
    }

    /// Construct the adapter with default program names.
    pub fn instantiate(self) -> Arc<dyn Toolchain> {
        match self {
            Self::Gcc => Arc::new(GccToolchain::gcc()),
            Self::Clang => Arc::new(GccToolchain::clang()),
            Self::Msvc => Arc::new(MsvcToolchain::new()),
        }
    }
}

impl fmt::Display for ToolchainFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instantiate_names() {
        for family in ToolchainFamily::ALL {
            assert_eq!(family.instantiate().name(), family.as_str());
        }
    }
}
