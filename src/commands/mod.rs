pub mod status;
pub mod sync;

use serde::Serialize;
use std::path::PathBuf;

use crate::mirror::config::MirrorConfig;

#[derive(Debug, Clone, Serialize)]
pub struct CommandReport {
    pub command: String,
    pub ok: bool,
    pub details: Vec<String>,
    pub issues: Vec<String>,
}

impl CommandReport {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ok: true,
            details: Vec::new(),
            issues: Vec::new(),
        }
    }

    pub fn detail(&mut self, text: impl Into<String>) {
        self.details.push(text.into());
    }

    pub fn issue(&mut self, text: impl Into<String>) {
        self.ok = false;
        self.issues.push(text.into());
    }
}

/// The flag wins over config; `None` after reporting the problem.
pub fn resolve_dest(
    flag: Option<PathBuf>,
    cfg: &MirrorConfig,
    report: &mut CommandReport,
) -> Option<PathBuf> {
    let Some(dest) = flag.or_else(|| cfg.store.dest.clone()) else {
        report.issue("no destination: pass --dest, set MIRROR_DEST, or set [store].dest");
        return None;
    };
    if dest.exists() && !dest.is_dir() {
        report.issue(format!("destination is not a directory: {}", dest.display()));
        return None;
    }
    Some(dest)
}
