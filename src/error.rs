use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("unexpected directory in issue store: {}", .0.display())]
    UnexpectedDirectory(PathBuf),
    #[error("unexpected file name in issue store: {}", .0.display())]
    UnexpectedFile(PathBuf),
    #[error("issue {number} stored in wrong shard: {}", .path.display())]
    ShardMismatch { number: u64, path: PathBuf },
    #[error("issue {0} has never been synced")]
    NotSynced(u64),
    #[error("cannot preserve version of missing record: {}", .0.display())]
    MissingRecord(PathBuf),
    #[error("{kind} record missing or invalid field `{field}`")]
    MalformedRecord {
        kind: &'static str,
        field: &'static str,
    },
    #[error("expected token file {} to be of form <username>:<token>", .0.display())]
    InvalidCredentials(PathBuf),
}
