use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::commands::{self, CommandReport};
use crate::logging;

#[derive(Debug, Parser)]
#[command(
    name = "issue-mirror",
    version,
    about = "Mirror a GitHub repository's issues and comments into a sharded JSON tree"
)]
struct Cli {
    /// Print the command report as JSON.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Fetch changed issues and comments into the mirror.
    Sync(SyncArgs),
    /// Summarize what the mirror holds and check its structure.
    Status(StatusArgs),
}

#[derive(Debug, Args)]
struct SyncArgs {
    /// Mirror root directory (overrides MIRROR_DEST and [store].dest).
    #[arg(long)]
    dest: Option<PathBuf>,
    #[arg(long)]
    owner: Option<String>,
    #[arg(long)]
    repo: Option<String>,
    /// Re-apply normalization to already stored records, keeping their versions.
    #[arg(long)]
    reclean: bool,
}

#[derive(Debug, Args)]
struct StatusArgs {
    #[arg(long)]
    dest: Option<PathBuf>,
}

fn render_text(report: &CommandReport) -> String {
    let mut out = format!(
        "{}: {}\n",
        report.command,
        if report.ok { "ok" } else { "failed" }
    );
    for detail in &report.details {
        out.push_str(&format!("  {detail}\n"));
    }
    for issue in &report.issues {
        out.push_str(&format!("  ! {issue}\n"));
    }
    out
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init();

    let report = match cli.command {
        Command::Sync(args) => commands::sync::run(&commands::sync::SyncCommandOptions {
            dest: args.dest,
            owner: args.owner,
            repo: args.repo,
            reclean: args.reclean,
        })?,
        Command::Status(args) => {
            commands::status::run(&commands::status::StatusOptions { dest: args.dest })?
        }
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render_text(&report));
    }

    if !report.ok {
        std::process::exit(2);
    }
    Ok(())
}
