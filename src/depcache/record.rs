//! On-disk dependency record.
//!
//! Plain UTF-8 text: the identity signature on the first line, then one
//! dependency (path or target name) per line.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::debug;

use super::signature::IdentitySignature;
use crate::error::{NativeError, NativeResult};

/// A record as read back from disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyRecord {
    pub signature: String,
    pub entries: Vec<String>,
    pub modified: SystemTime,
}

impl DependencyRecord {
    /// Read the record at `path`.
    ///
    /// Missing, unreadable, empty or non-UTF-8 records all read as `None`.
    pub fn read(path: &Path) -> Option<Self> {
        let modified = fs::metadata(path).and_then(|m| m.modified()).ok()?;
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "dependency record unreadable");
                return None;
            }
        };
        let Ok(text) = String::from_utf8(bytes) else {
            debug!(path = %path.display(), "dependency record is not UTF-8");
            return None;
        };

        let mut lines = text.lines().map(|l| l.trim_end_matches('\r'));
        let signature = lines.next()?.to_string();
        let entries = lines
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();

        Some(Self {
            signature,
            entries,
            modified,
        })
    }

    /// Replace the record at `path`.
    ///
    /// Written to a sibling temp file, synced, then renamed over the old
    /// record, so readers see either the previous record or the new one.
    pub fn write(path: &Path, signature: &IdentitySignature, entries: &[String]) -> NativeResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| NativeError::io(parent, e))?;
        }

        let mut contents = String::with_capacity(signature.as_str().len() + entries.len() * 64);
        contents.push_str(signature.as_str());
        contents.push('\n');
        for entry in entries {
            contents.push_str(entry);
            contents.push('\n');
        }

        let temp = temp_path(path);
        let written = File::create(&temp).and_then(|mut f| {
            f.write_all(contents.as_bytes())?;
            f.sync_all()
        });
        if let Err(e) = written {
            let _ = fs::remove_file(&temp);
            return Err(NativeError::io(&temp, e));
        }

        fs::rename(&temp, path).map_err(|e| {
            let _ = fs::remove_file(&temp);
            NativeError::io(path, e)
        })
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sig() -> IdentitySignature {
        IdentitySignature::new("MakeDepend(sources=[a.c]; flags=[]; includes=[])").unwrap()
    }

    #[test]
    fn test_write_then_read() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/a.o-0123.makedepend");
        let entries = vec!["/p/a.h".to_string(), "/p/b.h".to_string()];

        DependencyRecord::write(&path, &sig(), &entries).unwrap();
        let record = DependencyRecord::read(&path).unwrap();

        assert_eq!(record.signature, sig().as_str());
        assert_eq!(record.entries, entries);
        assert!(!temp_path(&path).exists());
    }

    #[test]
    fn test_missing_record() {
        let dir = TempDir::new().unwrap();
        assert!(DependencyRecord::read(&dir.path().join("none.makedepend")).is_none());
    }

    #[test]
    fn test_corrupt_records_read_as_none() {
        let dir = TempDir::new().unwrap();

        let empty = dir.path().join("empty.makedepend");
        fs::write(&empty, "").unwrap();
        assert!(DependencyRecord::read(&empty).is_none());

        let binary = dir.path().join("binary.makedepend");
        fs::write(&binary, [0xff, 0xfe, b'\n', 0x80]).unwrap();
        assert!(DependencyRecord::read(&binary).is_none());
    }

    #[test]
    fn test_crlf_tolerated() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("crlf.makedepend");
        fs::write(&path, "sig\r\n/p/a.h\r\n\r\n").unwrap();
        let record = DependencyRecord::read(&path).unwrap();
        assert_eq!(record.signature, "sig");
        assert_eq!(record.entries, vec!["/p/a.h"]);
    }

    #[test]
    fn test_entry_whitespace_preserved() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("spaces.makedepend");
        let entries = vec!["/p/my header.h ".to_string(), " /p/lead.h".to_string()];

        DependencyRecord::write(&path, &sig(), &entries).unwrap();
        assert_eq!(DependencyRecord::read(&path).unwrap().entries, entries);
    }
}
