use anyhow::Result;
use std::path::PathBuf;

use crate::commands::{CommandReport, resolve_dest};
use crate::github::client::{GitHubClient, RepoRef};
use crate::github::credentials;
use crate::mirror::config::load_config;
use crate::mirror::paths::MirrorRoot;
use crate::mirror::store::MirrorStore;
use crate::mirror::sync::Syncer;

#[derive(Debug, Clone, Default)]
pub struct SyncCommandOptions {
    pub dest: Option<PathBuf>,
    pub owner: Option<String>,
    pub repo: Option<String>,
    pub reclean: bool,
}

pub fn run(opts: &SyncCommandOptions) -> Result<CommandReport> {
    let mut cfg = load_config()?;
    let mut report = CommandReport::new("sync");

    if let Some(owner) = &opts.owner {
        cfg.remote.owner = owner.clone();
    }
    if let Some(repo) = &opts.repo {
        cfg.remote.repo = repo.clone();
    }
    let Some(dest) = resolve_dest(opts.dest.clone(), &cfg, &mut report) else {
        return Ok(report);
    };

    report.detail(format!("repo={}/{}", cfg.remote.owner, cfg.remote.repo));
    report.detail(format!("dest={}", dest.display()));
    report.detail(format!("reclean={}", opts.reclean));

    let token_file = cfg.token_file()?;
    let credentials = credentials::load(&token_file)?;
    tracing::debug!(user = %credentials.username, "loaded credentials");
    let client = GitHubClient::new(
        &cfg.remote.api_base,
        RepoRef {
            owner: cfg.remote.owner.clone(),
            repo: cfg.remote.repo.clone(),
        },
        credentials,
        cfg.timeout(),
    )?;

    let store = MirrorStore::new(MirrorRoot::new(dest));
    let summary = Syncer::new(&client, &store, cfg.sync_options(opts.reclean)).run()?;

    report.detail(format!("issue_pages={}", summary.issue_pages));
    report.detail(format!("issues_written={}", summary.issues_written));
    report.detail(format!("issues_reconciled={}", summary.issues_reconciled));
    report.detail(format!("comment_pages={}", summary.comment_pages));
    report.detail(format!("comments_written={}", summary.comments_written));
    if opts.reclean {
        report.detail(format!("issues_recleaned={}", summary.issues_recleaned));
        report.detail(format!("comments_recleaned={}", summary.comments_recleaned));
    }

    Ok(report)
}
