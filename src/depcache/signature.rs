//! Identity signature of a compile unit's dependency inputs.

use std::fmt;
use std::path::PathBuf;

use crate::config::ConfigError;

/// One-line summary of everything that can change which headers a compile
/// unit pulls in: its sources, effective flags and effective include paths.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdentitySignature(String);

impl IdentitySignature {
    /// Wrap a raw signature line.
    pub fn new(line: impl Into<String>) -> Result<Self, ConfigError> {
        let line = line.into();
        if line.contains(['\n', '\r']) {
            return Err(ConfigError::MultiLineSignature(line));
        }
        Ok(Self(line))
    }

    pub fn from_inputs(
        sources: &[PathBuf],
        flags: &[String],
        include_dirs: &[PathBuf],
    ) -> Result<Self, ConfigError> {
        let join_paths = |paths: &[PathBuf]| {
            paths
                .iter()
                .map(|p| p.to_string_lossy())
                .collect::<Vec<_>>()
                .join(", ")
        };
        Self::new(format!(
            "MakeDepend(sources=[{}]; flags=[{}]; includes=[{}])",
            join_paths(sources),
            flags.join(" "),
            join_paths(include_dirs),
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdentitySignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic() {
        let a = IdentitySignature::from_inputs(
            &["/p/a.cpp".into()],
            &["-O2".to_string(), "-g".to_string()],
            &["/p/include".into()],
        )
        .unwrap();
        let b = IdentitySignature::from_inputs(
            &["/p/a.cpp".into()],
            &["-O2".to_string(), "-g".to_string()],
            &["/p/include".into()],
        )
        .unwrap();
        assert_eq!(a, b);
        assert_eq!(
            a.as_str(),
            "MakeDepend(sources=[/p/a.cpp]; flags=[-O2 -g]; includes=[/p/include])"
        );
    }

    #[test]
    fn test_flag_change_changes_signature() {
        let a = IdentitySignature::from_inputs(&["a.c".into()], &["-O2".to_string()], &[]).unwrap();
        let b = IdentitySignature::from_inputs(&["a.c".into()], &["-O0".to_string()], &[]).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_line_separators_rejected() {
        assert!(matches!(
            IdentitySignature::new("a\nb"),
            Err(ConfigError::MultiLineSignature(_))
        ));
        assert!(IdentitySignature::new("a\rb").is_err());
        assert!(IdentitySignature::from_inputs(&["bad\nname.c".into()], &[], &[]).is_err());
    }
}
