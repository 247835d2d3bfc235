//! Platform artifact naming conventions.
//!
//! Build files name artifacts by logical base name (`"app"`, `"mylib"`);
//! the functions here turn that into the platform's file name (`app.exe`,
//! `libmylib.so`). The formatters come from the merged options, so a target
//! can override them, and their defaults come from the pure
//! [`NamingConventions::for_platform`] map.

use std::fmt;

use native_props::Expr;
use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::context::BuildContext;
use crate::error::NativeResult;

/// Target platform profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Windows,
    Unix,
}

impl Platform {
    pub fn host() -> Self {
        if cfg!(windows) {
            Platform::Windows
        } else {
            Platform::Unix
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::Windows => write!(f, "windows"),
            Platform::Unix => write!(f, "unix"),
        }
    }
}

/// A `%s` file-name template, e.g. `lib%s.so`.
///
/// Only the final path component is formatted: `out/mylib` becomes
/// `out/libmylib.so`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FilenameFormat(String);

impl FilenameFormat {
    pub fn new(template: impl Into<String>) -> Result<Self, ConfigError> {
        let template = template.into();
        if template.matches("%s").count() != 1 {
            return Err(ConfigError::InvalidFormatter(template));
        }
        Ok(Self(template))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn apply(&self, base: &str) -> String {
        let split = base.rfind(['/', '\\']).map_or(0, |i| i + 1);
        let (dir, file) = base.split_at(split);
        format!("{dir}{}", self.0.replacen("%s", file, 1))
    }
}

impl TryFrom<String> for FilenameFormat {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<FilenameFormat> for String {
    fn from(value: FilenameFormat) -> Self {
        value.0
    }
}

/// Formatters for the four native artifact kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamingConventions {
    pub executable: FilenameFormat,
    pub shared_library: FilenameFormat,
    pub static_library: FilenameFormat,
    pub object: FilenameFormat,
}

impl NamingConventions {
    pub fn for_platform(platform: Platform) -> Self {
        let (exe, shared, static_lib, object) = match platform {
            Platform::Windows => ("%s.exe", "%s.dll", "%s.lib", "%s.obj"),
            Platform::Unix => ("%s", "lib%s.so", "lib%s.a", "%s.o"),
        };
        Self {
            executable: FilenameFormat(exe.to_string()),
            shared_library: FilenameFormat(shared.to_string()),
            static_library: FilenameFormat(static_lib.to_string()),
            object: FilenameFormat(object.to_string()),
        }
    }
}

fn apply_with(
    ctx: &BuildContext,
    base: &str,
    pick: fn(&crate::config::NativeOptions) -> &FilenameFormat,
) -> NativeResult<String> {
    let expanded = Expr::parse(base)?.expand(ctx.properties())?;
    let options = ctx.global_options()?;
    Ok(pick(&options).apply(&expanded))
}

/// Executable name for `base` (`app` → `app.exe` on Windows).
pub fn exename(ctx: &BuildContext, base: &str) -> NativeResult<String> {
    apply_with(ctx, base, |o| &o.exe_name)
}

/// Object file name for `base`.
pub fn objectname(ctx: &BuildContext, base: &str) -> NativeResult<String> {
    apply_with(ctx, base, |o| &o.object_name)
}

/// Shared library name for `base` (`mylib` → `libmylib.so` on Unix).
pub fn libname(ctx: &BuildContext, base: &str) -> NativeResult<String> {
    apply_with(ctx, base, |o| &o.lib_name)
}

/// Static library name for `base`.
pub fn staticlibname(ctx: &BuildContext, base: &str) -> NativeResult<String> {
    apply_with(ctx, base, |o| &o.static_lib_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(platform: Platform) -> BuildContext {
        BuildContext::builder("/work")
            .platform(platform)
            .property("NAME", "core")
            .build()
            .unwrap()
    }

    #[test]
    fn test_windows_profile() {
        let ctx = ctx(Platform::Windows);
        assert_eq!(libname(&ctx, "mylib").unwrap(), "mylib.dll");
        assert_eq!(exename(&ctx, "app").unwrap(), "app.exe");
        assert_eq!(staticlibname(&ctx, "mylib").unwrap(), "mylib.lib");
        assert_eq!(objectname(&ctx, "a").unwrap(), "a.obj");
    }

    #[test]
    fn test_unix_profile() {
        let ctx = ctx(Platform::Unix);
        assert_eq!(libname(&ctx, "mylib").unwrap(), "libmylib.so");
        assert_eq!(exename(&ctx, "app").unwrap(), "app");
        assert_eq!(staticlibname(&ctx, "mylib").unwrap(), "libmylib.a");
        assert_eq!(objectname(&ctx, "a").unwrap(), "a.o");
    }

    #[test]
    fn test_properties_expanded_before_formatting() {
        let ctx = ctx(Platform::Unix);
        assert_eq!(libname(&ctx, "out/${NAME}").unwrap(), "out/libcore.so");
    }

    #[test]
    fn test_format_keeps_directory() {
        let fmt = FilenameFormat::new("lib%s.a").unwrap();
        assert_eq!(fmt.apply("a/b/z"), "a/b/libz.a");
        assert_eq!(fmt.apply("c:\\x\\z"), "c:\\x\\libz.a");
    }

    #[test]
    fn test_format_requires_one_placeholder() {
        assert!(FilenameFormat::new("lib.so").is_err());
        assert!(FilenameFormat::new("%s%s").is_err());
    }

    #[test]
    fn test_option_override_wins() {
        let ctx = BuildContext::builder("/work")
            .platform(Platform::Unix)
            .option("native.cxx.exenamefn", "%s.bin")
            .build()
            .unwrap();
        assert_eq!(exename(&ctx, "app").unwrap(), "app.bin");
    }
}
