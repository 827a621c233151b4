//! `orion deploy` command - Commit staged changes and push

use chrono::Local;
use console::style;
use miette::Result;
use std::path::PathBuf;

use crate::cli::helpers::{project_dir, require_git};
use crate::cli::GlobalOpts;
use crate::core::config::ProjectConfig;
use crate::core::git::GitError;

const REMOTE: &str = "origin";

#[derive(clap::Args, Debug)]
pub struct DeployArgs {
    /// Project directory [default: current directory]
    #[arg(long, short = 'p')]
    pub project_path: Option<PathBuf>,

    /// Commit message [default: "Revision <timestamp>"]
    #[arg(long, short = 'm')]
    pub message: Option<String>,
}

pub fn run(args: DeployArgs, global: &GlobalOpts) -> Result<()> {
    let dir = project_dir(args.project_path)?;
    let config = ProjectConfig::load(&dir).map_err(|e| miette::miette!("{}", e))?;
    let git = require_git(&dir)?;
    let map_git = |e: GitError| miette::miette!("{}", e);

    if !git.is_repository() {
        return Err(miette::miette!("{} is not a git repository", dir.display()));
    }

    match (&config.repo_url, git.remote_url(REMOTE)) {
        (Some(url), current) if current.as_deref() != Some(url.as_str()) => {
            git.set_remote(REMOTE, url).map_err(map_git)?;
        }
        (None, None) => {
            return Err(miette::miette!(
                "No remote configured: set repo_url in config.yaml or run `git remote add origin <url>`"
            ));
        }
        _ => {}
    }

    if git.has_staged_changes().map_err(map_git)? {
        let message = args
            .message
            .unwrap_or_else(|| format!("Revision {}", Local::now().format("%Y-%m-%d %H:%M")));
        git.commit(&message).map_err(map_git)?;
        if !global.quiet {
            println!("{} Committed: {}", style("✓").green(), message);
        }
    } else if !global.quiet {
        println!(
            "{}",
            style("Nothing staged (run `orion revision` first), pushing existing commits").dim()
        );
    }

    let branch = git.current_branch().map_err(map_git)?;
    git.push(REMOTE, &branch).map_err(map_git)?;

    if !global.quiet {
        println!(
            "{} Pushed {} to {}",
            style("✓").green(),
            style(&branch).cyan(),
            REMOTE
        );
    }
    Ok(())
}
