use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_json::ser::PrettyFormatter;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::Path;
use tempfile::Builder;

use crate::error::MirrorError;
use crate::mirror::paths::{TEMP_PREFIX, TEMP_SUFFIX};
use crate::mirror::record::Version;

/// On-disk envelope: the normalized record plus the version it was written at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub version: Version,
    pub record: Value,
}

#[derive(Serialize)]
struct StoredRecordRef<'a> {
    version: &'a Version,
    record: &'a Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteVersion {
    /// Rewrite content of an existing record, keeping its stored version.
    Preserve,
    At(Version),
}

/// A stored copy is stale unless its version is exactly the remote's.
pub fn is_stale(stored: Option<&Version>, remote: &Version) -> bool {
    stored != Some(remote)
}

pub fn load_record(path: &Path) -> Result<Option<StoredRecord>> {
    let raw = match fs::read(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => {
            return Err(err).with_context(|| format!("failed to read {}", path.display()));
        }
    };
    let parsed: StoredRecord = serde_json::from_slice(&raw)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(Some(parsed))
}

/// Tab-indented JSON with exactly one trailing newline.
pub fn render(version: &Version, record: &Value) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"\t");
    let mut ser = serde_json::Serializer::with_formatter(&mut out, formatter);
    StoredRecordRef { version, record }.serialize(&mut ser)?;
    out.push(b'\n');
    Ok(out)
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("no parent directory for {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("failed to create {}", parent.display()))?;
    let mut tmp = Builder::new()
        .prefix(TEMP_PREFIX)
        .suffix(TEMP_SUFFIX)
        .tempfile_in(parent)
        .with_context(|| format!("failed to create temp file in {}", parent.display()))?;
    tmp.write_all(bytes)
        .with_context(|| format!("failed to write temp file for {}", path.display()))?;
    tmp.persist(path)
        .map_err(|err| err.error)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

/// Writes `record` to `path` unless the stored copy is already at `version`.
/// Returns whether bytes were written.
pub fn write_if_newer(path: &Path, version: WriteVersion, record: &Value) -> Result<bool> {
    let existing = load_record(path)?;
    let version = match version {
        WriteVersion::Preserve => match existing {
            Some(stored) => stored.version,
            None => return Err(MirrorError::MissingRecord(path.to_path_buf()).into()),
        },
        WriteVersion::At(version) => {
            if !is_stale(existing.as_ref().map(|stored| &stored.version), &version) {
                return Ok(false);
            }
            version
        }
    };

    let bytes = render(&version, record)?;
    write_atomic(path, &bytes)?;
    tracing::info!(path = %path.display(), %version, "wrote");
    Ok(true)
}
