//! Batch persistence
//!
//! Each batch becomes `<dir>/<kind>_<YYYY-MM-DD_HH-MM-SS>.json`. Two batches
//! of the same kind in the same second share a name; the later write
//! replaces the earlier one.

use chrono::{DateTime, Local};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

use super::UploadError;

/// strftime pattern for the timestamp part of a batch filename
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

const INDENT: &[u8] = b"    ";

/// Owner of the output directory
#[derive(Debug, Clone)]
pub struct BatchStore {
    dir: PathBuf,
}

impl BatchStore {
    /// Use `dir` as the output directory, creating it if missing
    pub fn open(dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File a batch of `kind` received at `at` is written to
    pub fn path_for(&self, kind: &str, at: &DateTime<Local>) -> PathBuf {
        self.dir
            .join(format!("{}_{}.json", kind, at.format(TIMESTAMP_FORMAT)))
    }

    /// Write `items` pretty-printed, creating or truncating the target file
    pub fn write(&self, kind: &str, items: &[Value], at: &DateTime<Local>) -> Result<PathBuf, UploadError> {
        validate_kind(kind)?;
        let path = self.path_for(kind, at);

        let mut buf = Vec::new();
        let mut serializer =
            serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(INDENT));
        items.serialize(&mut serializer)?;

        fs::write(&path, buf).map_err(|source| UploadError::Storage {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }
}

/// The kind becomes the leading part of a filename inside the output
/// directory. Only a path separator could make it name another directory.
fn validate_kind(kind: &str) -> Result<(), UploadError> {
    if kind.contains(['/', '\\', '\0']) {
        return Err(UploadError::InvalidKind(kind.to_string()));
    }
    Ok(())
}
