use anyhow::Result;
use std::path::PathBuf;

use crate::commands::{CommandReport, resolve_dest};
use crate::mirror::config::load_config;
use crate::mirror::normalize::normalize;
use crate::mirror::paths::MirrorRoot;
use crate::mirror::record::RecordKind;
use crate::mirror::store::MirrorStore;

#[derive(Debug, Clone, Default)]
pub struct StatusOptions {
    pub dest: Option<PathBuf>,
}

#[derive(Debug, Default)]
struct StoreScan {
    issues: u64,
    comments: u64,
    count_mismatches: Vec<u64>,
    unnormalized_issues: u64,
    unnormalized_comments: u64,
}

fn scan(store: &MirrorStore) -> Result<StoreScan> {
    let mut out = StoreScan::default();
    for issue in store.issues()? {
        let issue = issue?;
        out.issues += 1;

        let mut record = issue.record.clone();
        if normalize(RecordKind::Issue, &mut record) {
            out.unnormalized_issues += 1;
        }

        let mut on_disk = 0u64;
        for comment in store.comments(issue.number)? {
            let mut comment = comment?;
            on_disk += 1;
            if normalize(RecordKind::Comment, &mut comment.record) {
                out.unnormalized_comments += 1;
            }
        }
        out.comments += on_disk;
        if issue.declared_comments().is_some_and(|declared| declared != on_disk) {
            out.count_mismatches.push(issue.number);
        }
    }
    Ok(out)
}

pub fn run(opts: &StatusOptions) -> Result<CommandReport> {
    let cfg = load_config()?;
    let mut report = CommandReport::new("status");

    let Some(dest) = resolve_dest(opts.dest.clone(), &cfg, &mut report) else {
        return Ok(report);
    };
    report.detail(format!("dest={}", dest.display()));

    let store = MirrorStore::new(MirrorRoot::new(dest));
    let scanned = match scan(&store) {
        Ok(scanned) => scanned,
        Err(err) => {
            report.issue(format!("store structure invalid: {err:#}"));
            return Ok(report);
        }
    };

    report.detail(format!("issues={}", scanned.issues));
    report.detail(format!("comments={}", scanned.comments));
    report.detail(format!(
        "comment_count_mismatches={}",
        scanned.count_mismatches.len()
    ));
    if !scanned.count_mismatches.is_empty() {
        let sample: Vec<String> = scanned
            .count_mismatches
            .iter()
            .take(20)
            .map(u64::to_string)
            .collect();
        report.detail(format!("comment_count_mismatch_issues={}", sample.join(",")));
    }
    report.detail(format!("unnormalized_issues={}", scanned.unnormalized_issues));
    report.detail(format!(
        "unnormalized_comments={}",
        scanned.unnormalized_comments
    ));

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mirror::version::{WriteVersion, write_if_newer};
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn scan_counts_records_and_flags_drift() {
        let tmp = tempdir().expect("tempdir");
        let store = MirrorStore::new(MirrorRoot::new(tmp.path()));
        let version = WriteVersion::At(Utc.with_ymd_and_hms(2016, 7, 1, 0, 0, 0).unwrap());

        write_if_newer(&store.root().issue_file(1), version, &json!({"number": 1, "comments": 2}))
            .expect("issue 1");
        write_if_newer(&store.root().comment_file(1, 10), version, &json!({"id": 10}))
            .expect("comment");
        write_if_newer(
            &store.root().issue_file(2),
            version,
            &json!({"number": 2, "url": "https://api/issues/2"}),
        )
        .expect("issue 2");

        let scanned = scan(&store).expect("scan");
        assert_eq!(scanned.issues, 2);
        assert_eq!(scanned.comments, 1);
        assert_eq!(scanned.count_mismatches, vec![1]);
        assert_eq!(scanned.unnormalized_issues, 1);
        assert_eq!(scanned.unnormalized_comments, 0);
    }
}
