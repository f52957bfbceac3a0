use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::error::MirrorError;

/// The remote's declared last-modified timestamp for a record.
pub type Version = DateTime<Utc>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Issue,
    Comment,
}

impl RecordKind {
    pub fn label(self) -> &'static str {
        match self {
            RecordKind::Issue => "issue",
            RecordKind::Comment => "comment",
        }
    }

    fn identity_field(self) -> &'static str {
        match self {
            RecordKind::Issue => "number",
            RecordKind::Comment => "id",
        }
    }
}

/// An issue as returned by the remote, before normalization.
#[derive(Debug, Clone)]
pub struct RemoteIssue {
    pub number: u64,
    pub updated_at: Version,
    pub record: Value,
}

impl RemoteIssue {
    pub fn from_value(record: Value) -> Result<Self, MirrorError> {
        let number = identity(RecordKind::Issue, &record)?;
        let updated_at = declared_version(RecordKind::Issue, &record)?;
        Ok(Self {
            number,
            updated_at,
            record,
        })
    }
}

#[derive(Debug, Clone)]
pub struct RemoteComment {
    pub id: u64,
    pub updated_at: Version,
    pub record: Value,
}

impl RemoteComment {
    pub fn from_value(record: Value) -> Result<Self, MirrorError> {
        let id = identity(RecordKind::Comment, &record)?;
        let updated_at = declared_version(RecordKind::Comment, &record)?;
        Ok(Self {
            id,
            updated_at,
            record,
        })
    }
}

pub fn identity(kind: RecordKind, record: &Value) -> Result<u64, MirrorError> {
    let field = kind.identity_field();
    record
        .get(field)
        .and_then(Value::as_u64)
        .ok_or(MirrorError::MalformedRecord {
            kind: kind.label(),
            field,
        })
}

pub fn declared_version(kind: RecordKind, record: &Value) -> Result<Version, MirrorError> {
    let malformed = || MirrorError::MalformedRecord {
        kind: kind.label(),
        field: "updated_at",
    };
    let raw = record
        .get("updated_at")
        .and_then(Value::as_str)
        .ok_or_else(malformed)?;
    DateTime::parse_from_rfc3339(raw)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|_| malformed())
}

/// The issue's declared comment count; `None` when the field is absent.
pub fn declared_comment_count(issue: &Value) -> Option<u64> {
    issue.get("comments").and_then(Value::as_u64)
}
