use std::path::PathBuf;

pub const ISSUES_DIR: &str = "issues";
const SHARD_COUNT: u64 = 1000;
const COMMENTS_SUFFIX: &str = ".comments";
const COMMENT_PREFIX: &str = "comment-";
const JSON_SUFFIX: &str = ".json";
pub const TEMP_PREFIX: &str = ".";
pub const TEMP_SUFFIX: &str = ".tmp";

/// Root directory of a repository's issue mirror on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorRoot {
    root: PathBuf,
}

pub fn shard_name(number: u64) -> String {
    format!("{:03}", number % SHARD_COUNT)
}

impl MirrorRoot {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn issues_dir(&self) -> PathBuf {
        self.root.join(ISSUES_DIR)
    }

    pub fn shard_dir(&self, number: u64) -> PathBuf {
        self.issues_dir().join(shard_name(number))
    }

    pub fn issue_file(&self, number: u64) -> PathBuf {
        self.shard_dir(number).join(format!("{number}{JSON_SUFFIX}"))
    }

    pub fn comments_dir(&self, number: u64) -> PathBuf {
        self.shard_dir(number).join(format!("{number}{COMMENTS_SUFFIX}"))
    }

    pub fn comment_file(&self, number: u64, comment_id: u64) -> PathBuf {
        self.comments_dir(number)
            .join(format!("{COMMENT_PREFIX}{comment_id}{JSON_SUFFIX}"))
    }
}

/// Parses a shard directory name (`"042"`).
pub fn parse_shard_name(name: &str) -> Option<u64> {
    if name.len() != 3 || !name.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    name.parse().ok()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonFileName {
    Numeric(u64),
    NonNumeric,
}

/// Classifies a shard entry; `None` when it is not a `.json` file at all.
pub fn parse_issue_file_name(name: &str) -> Option<JsonFileName> {
    let stem = name.strip_suffix(JSON_SUFFIX)?;
    Some(match parse_number(stem) {
        Some(number) => JsonFileName::Numeric(number),
        None => JsonFileName::NonNumeric,
    })
}

pub fn parse_comments_dir_name(name: &str) -> Option<u64> {
    parse_number(name.strip_suffix(COMMENTS_SUFFIX)?)
}

pub fn parse_comment_file_name(name: &str) -> Option<u64> {
    let stem = name.strip_suffix(JSON_SUFFIX)?;
    parse_number(stem.strip_prefix(COMMENT_PREFIX)?)
}

/// In-flight write files. A crash can leave one behind; walks skip them.
pub fn is_temp_file_name(name: &str) -> bool {
    name.starts_with(TEMP_PREFIX) && name.ends_with(TEMP_SUFFIX)
}

fn parse_number(raw: &str) -> Option<u64> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}
