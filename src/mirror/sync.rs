//! Drives a mirror pass: the recency-ordered issue walk, then a traversal of
//! the stored issues that optionally recleans them and reconciles comments.

use anyhow::{Context, Result};
use serde::Serialize;

use crate::mirror::normalize::normalize;
use crate::mirror::record::{RecordKind, RemoteComment, RemoteIssue};
use crate::mirror::remote::RemoteSource;
use crate::mirror::store::{MirrorStore, StoredIssue};
use crate::mirror::version::{WriteVersion, write_if_newer};

pub const DEFAULT_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub page_size: u32,
    /// Consecutive write-free issue pages that end the issue walk. The feed
    /// is sorted by most recent update, so an idle page usually means every
    /// older issue is already current. A non-monotonic feed can under-sync;
    /// raise this to trade requests for coverage.
    pub idle_pages_before_stop: u32,
    pub reclean: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            idle_pages_before_stop: 1,
            reclean: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    pub issue_pages: u32,
    pub issues_written: u64,
    pub issues_reconciled: u64,
    pub comment_pages: u32,
    pub comments_written: u64,
    pub issues_recleaned: u64,
    pub comments_recleaned: u64,
}

pub struct Syncer<'a, R: RemoteSource> {
    remote: &'a R,
    store: &'a MirrorStore,
    opts: SyncOptions,
    summary: SyncSummary,
}

impl<'a, R: RemoteSource> Syncer<'a, R> {
    pub fn new(remote: &'a R, store: &'a MirrorStore, opts: SyncOptions) -> Self {
        Self {
            remote,
            store,
            opts,
            summary: SyncSummary::default(),
        }
    }

    /// Runs a full pass. Any error aborts the run; the store is left valid
    /// and a re-run resumes where this one stopped.
    pub fn run(mut self) -> Result<SyncSummary> {
        self.sync_issues()?;
        self.sync_stored_issues()?;
        Ok(self.summary)
    }

    fn sync_issues(&mut self) -> Result<()> {
        let mut page = 1;
        let mut idle_pages = 0;
        loop {
            let fetched = self
                .remote
                .list_issues(page, self.opts.page_size)
                .with_context(|| format!("failed to list issues page {page}"))?;
            self.summary.issue_pages += 1;

            let count = fetched.items.len();
            let mut wrote_any = false;
            for item in fetched.items {
                if self.write_issue(item)? {
                    wrote_any = true;
                    self.summary.issues_written += 1;
                }
            }
            tracing::info!(
                page,
                issues = count,
                wrote_any,
                next_page = ?fetched.next_page,
                "issue page"
            );

            if wrote_any {
                idle_pages = 0;
            } else {
                idle_pages += 1;
            }
            if idle_pages >= self.opts.idle_pages_before_stop {
                return Ok(());
            }
            match fetched.next_page {
                Some(next) => page = next,
                None => return Ok(()),
            }
        }
    }

    fn write_issue(&self, item: serde_json::Value) -> Result<bool> {
        let mut issue = RemoteIssue::from_value(item)?;
        normalize(RecordKind::Issue, &mut issue.record);
        let path = self.store.root().issue_file(issue.number);
        write_if_newer(&path, WriteVersion::At(issue.updated_at), &issue.record)
    }

    fn sync_stored_issues(&mut self) -> Result<()> {
        let store = self.store;
        for issue in store.issues()? {
            let issue = issue?;
            if self.opts.reclean {
                self.reclean(&issue)?;
            }
            self.reconcile_comments(&issue)?;
        }
        Ok(())
    }

    fn reclean(&mut self, issue: &StoredIssue) -> Result<()> {
        let mut record = issue.record.clone();
        if normalize(RecordKind::Issue, &mut record)
            && write_if_newer(&issue.path, WriteVersion::Preserve, &record)?
        {
            tracing::info!(issue = issue.number, version = %issue.version, "recleaned issue");
            self.summary.issues_recleaned += 1;
        }

        for comment in self.store.comments(issue.number)? {
            let mut comment = comment?;
            if normalize(RecordKind::Comment, &mut comment.record)
                && write_if_newer(&comment.path, WriteVersion::Preserve, &comment.record)?
            {
                tracing::info!(
                    issue = comment.issue_number,
                    comment = comment.id,
                    version = %comment.version,
                    "recleaned comment"
                );
                self.summary.comments_recleaned += 1;
            }
        }
        Ok(())
    }

    fn reconcile_comments(&mut self, issue: &StoredIssue) -> Result<()> {
        let Some(declared) = issue.declared_comments() else {
            return Ok(());
        };
        let on_disk = self.store.count_comments(issue.number)?;
        if on_disk as u64 == declared {
            return Ok(());
        }

        tracing::info!(issue = issue.number, declared, on_disk, "fetching comments");
        self.summary.issues_reconciled += 1;
        let mut page = 1;
        loop {
            let fetched = self
                .remote
                .list_comments(issue.number, page, self.opts.page_size)
                .with_context(|| {
                    format!("failed to list comments page {page} of issue {}", issue.number)
                })?;
            self.summary.comment_pages += 1;

            for item in fetched.items {
                let mut comment = RemoteComment::from_value(item)?;
                normalize(RecordKind::Comment, &mut comment.record);
                let path = self.store.root().comment_file(issue.number, comment.id);
                if write_if_newer(&path, WriteVersion::At(comment.updated_at), &comment.record)? {
                    self.summary.comments_written += 1;
                }
            }

            tracing::debug!(
                issue = issue.number,
                page,
                next_page = ?fetched.next_page,
                "comment page"
            );
            match fetched.next_page {
                Some(next) => page = next,
                None => return Ok(()),
            }
        }
    }
}
