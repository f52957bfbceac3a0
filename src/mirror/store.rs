use anyhow::{Context, Result};
use serde_json::Value;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::MirrorError;
use crate::mirror::paths::{self, JsonFileName, MirrorRoot};
use crate::mirror::record::{self, Version};
use crate::mirror::version::{self, StoredRecord};

#[derive(Debug, Clone)]
pub struct StoredIssue {
    pub number: u64,
    pub path: PathBuf,
    pub version: Version,
    pub record: Value,
}

impl StoredIssue {
    pub fn declared_comments(&self) -> Option<u64> {
        record::declared_comment_count(&self.record)
    }
}

#[derive(Debug, Clone)]
pub struct StoredComment {
    pub issue_number: u64,
    pub id: u64,
    pub path: PathBuf,
    pub version: Version,
    pub record: Value,
}

/// Read side of the on-disk mirror. Writes go through
/// [`version::write_if_newer`] so the version bookkeeping stays in one place.
#[derive(Debug, Clone)]
pub struct MirrorStore {
    root: MirrorRoot,
}

impl MirrorStore {
    pub fn new(root: MirrorRoot) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &MirrorRoot {
        &self.root
    }

    pub fn load(&self, path: &Path) -> Result<Option<StoredRecord>> {
        version::load_record(path)
    }

    pub fn issue(&self, number: u64) -> Result<Option<StoredIssue>> {
        let path = self.root.issue_file(number);
        Ok(self.load(&path)?.map(|stored| StoredIssue {
            number,
            path,
            version: stored.version,
            record: stored.record,
        }))
    }

    pub fn comment(&self, issue_number: u64, id: u64) -> Result<Option<StoredComment>> {
        let path = self.root.comment_file(issue_number, id);
        Ok(self.load(&path)?.map(|stored| StoredComment {
            issue_number,
            id,
            path,
            version: stored.version,
            record: stored.record,
        }))
    }

    /// Every stored issue number, ascending.
    pub fn issue_numbers(&self) -> Result<Vec<u64>> {
        let issues_dir = self.root.issues_dir();
        let Some(shards) = read_dir_if_exists(&issues_dir)? else {
            return Ok(Vec::new());
        };

        let mut numbers = Vec::new();
        for (path, name, is_dir) in shards {
            if !is_dir {
                if paths::parse_issue_file_name(&name).is_some() {
                    return Err(MirrorError::UnexpectedFile(path).into());
                }
                continue;
            }
            if paths::parse_shard_name(&name).is_none() {
                return Err(MirrorError::UnexpectedDirectory(path).into());
            }
            collect_shard(&path, &name, &mut numbers)?;
        }
        numbers.sort_unstable();
        Ok(numbers)
    }

    /// Every stored comment id of `issue_number`, ascending. A missing
    /// comments directory means no comments.
    pub fn comment_ids(&self, issue_number: u64) -> Result<Vec<u64>> {
        let dir = self.root.comments_dir(issue_number);
        let Some(entries) = read_dir_if_exists(&dir)? else {
            return Ok(Vec::new());
        };

        collect_comment_ids(entries)
    }

    /// Number of comments on disk, counted exactly as [`Self::comment_ids`]
    /// enumerates them. Distinguishes an issue synced with zero comments from
    /// one that was never synced.
    pub fn count_comments(&self, issue_number: u64) -> Result<usize> {
        let dir = self.root.comments_dir(issue_number);
        match read_dir_if_exists(&dir)? {
            Some(entries) => Ok(collect_comment_ids(entries)?.len()),
            None if self.root.issue_file(issue_number).is_file() => Ok(0),
            None => Err(MirrorError::NotSynced(issue_number).into()),
        }
    }

    /// Stored issues in ascending number order, loaded lazily.
    pub fn issues(&self) -> Result<StoredIssues<'_>> {
        Ok(StoredIssues {
            store: self,
            numbers: self.issue_numbers()?.into_iter(),
        })
    }

    /// Stored comments of one issue in ascending id order, loaded lazily.
    pub fn comments(&self, issue_number: u64) -> Result<StoredComments<'_>> {
        Ok(StoredComments {
            store: self,
            issue_number,
            ids: self.comment_ids(issue_number)?.into_iter(),
        })
    }
}

pub struct StoredIssues<'a> {
    store: &'a MirrorStore,
    numbers: std::vec::IntoIter<u64>,
}

impl Iterator for StoredIssues<'_> {
    type Item = Result<StoredIssue>;

    fn next(&mut self) -> Option<Self::Item> {
        let number = self.numbers.next()?;
        Some(self.store.issue(number).and_then(|issue| {
            issue.with_context(|| format!("issue {number} disappeared during traversal"))
        }))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.numbers.size_hint()
    }
}

pub struct StoredComments<'a> {
    store: &'a MirrorStore,
    issue_number: u64,
    ids: std::vec::IntoIter<u64>,
}

impl Iterator for StoredComments<'_> {
    type Item = Result<StoredComment>;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.ids.next()?;
        let issue_number = self.issue_number;
        Some(self.store.comment(issue_number, id).and_then(|comment| {
            comment.with_context(|| {
                format!("comment {id} of issue {issue_number} disappeared during traversal")
            })
        }))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.ids.size_hint()
    }
}

type DirEntryInfo = (PathBuf, String, bool);

fn read_dir_if_exists(dir: &Path) -> Result<Option<Vec<DirEntryInfo>>> {
    let read_dir = match fs::read_dir(dir) {
        Ok(read_dir) => read_dir,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => {
            return Err(err).with_context(|| format!("failed to read {}", dir.display()));
        }
    };

    let mut out = Vec::new();
    for entry in read_dir {
        let entry = entry.with_context(|| format!("failed to read {}", dir.display()))?;
        let path = entry.path();
        let is_dir = entry
            .file_type()
            .with_context(|| format!("failed to stat {}", path.display()))?
            .is_dir();
        let Some(name) = entry.file_name().to_str().map(ToOwned::to_owned) else {
            return Err(MirrorError::UnexpectedFile(path).into());
        };
        out.push((path, name, is_dir));
    }
    Ok(Some(out))
}

fn collect_comment_ids(entries: Vec<DirEntryInfo>) -> Result<Vec<u64>> {
    let mut ids = Vec::new();
    for (path, name, is_dir) in entries {
        if !is_dir && paths::is_temp_file_name(&name) {
            continue;
        }
        if is_dir {
            return Err(MirrorError::UnexpectedDirectory(path).into());
        }
        let Some(id) = paths::parse_comment_file_name(&name) else {
            return Err(MirrorError::UnexpectedFile(path).into());
        };
        ids.push(id);
    }
    ids.sort_unstable();
    Ok(ids)
}

fn collect_shard(shard_dir: &Path, shard: &str, numbers: &mut Vec<u64>) -> Result<()> {
    let entries = read_dir_if_exists(shard_dir)?.unwrap_or_default();
    for (path, name, is_dir) in entries {
        if is_dir {
            if paths::parse_comments_dir_name(&name).is_none() {
                return Err(MirrorError::UnexpectedDirectory(path).into());
            }
            continue;
        }
        let number = match paths::parse_issue_file_name(&name) {
            Some(JsonFileName::Numeric(number)) => number,
            Some(JsonFileName::NonNumeric) => {
                return Err(MirrorError::UnexpectedFile(path).into());
            }
            None => continue,
        };
        if paths::shard_name(number) != shard {
            return Err(MirrorError::ShardMismatch { number, path }.into());
        }
        numbers.push(number);
    }
    Ok(())
}
