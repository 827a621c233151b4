//! Shared helper functions for CLI commands

use console::style;
use dialoguer::{theme::ColorfulTheme, Confirm};
use miette::{IntoDiagnostic, Result};
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};

use crate::cli::GlobalOpts;
use crate::core::git::{ChangeSummary, Git};
use crate::core::observer::TracingObserver;

/// Files listed per change group before eliding the rest
pub const MAX_LISTED_FILES: usize = 5;

/// Project directory from `--project-path`, or the current directory
pub fn project_dir(path: Option<PathBuf>) -> Result<PathBuf> {
    match path {
        Some(path) => Ok(path),
        None => std::env::current_dir().into_diagnostic(),
    }
}

/// Observer that logs build events at the level chosen by `-v/-q`
pub fn observer(global: &GlobalOpts) -> TracingObserver {
    TracingObserver::new(global.log_level())
}

/// Truncate a string to max_len characters, adding "..." if truncated
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Ask a yes/no question. `--yes` answers for the user; without a terminal
/// the answer is no.
pub fn confirm(prompt: &str, assume_yes: bool) -> Result<bool> {
    if assume_yes {
        return Ok(true);
    }
    if !io::stdin().is_terminal() {
        eprintln!(
            "{} {} (pass --yes to confirm non-interactively)",
            style("!").yellow(),
            prompt
        );
        return Ok(false);
    }
    Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .default(true)
        .interact()
        .into_diagnostic()
}

/// Fail early when git cannot be used to commit in `dir`
pub fn require_git(dir: &Path) -> Result<Git> {
    if !Git::is_installed() {
        return Err(miette::miette!(
            "git is not installed or not on PATH (use --no-git to skip version control)"
        ));
    }
    let git = Git::new(dir);
    if !git.is_configured() {
        return Err(miette::miette!(
            "git user.name and user.email must be set:\n  git config --global user.name \"Your Name\"\n  git config --global user.email you@example.com"
        ));
    }
    Ok(git)
}

/// Render the working-tree changes, listing a few files per group
pub fn format_changes(summary: &ChangeSummary) -> String {
    let mut out = String::new();
    for (label, files) in summary.groups() {
        out.push_str(&format!(
            "{} {}\n",
            style(format!("{}:", label)).bold(),
            files.len()
        ));
        for file in files.iter().take(MAX_LISTED_FILES) {
            out.push_str(&format!("  {}\n", file));
        }
        if files.len() > MAX_LISTED_FILES {
            out.push_str(&format!(
                "  {}\n",
                style(format!("... and {} more", files.len() - MAX_LISTED_FILES)).dim()
            ));
        }
    }
    out
}
