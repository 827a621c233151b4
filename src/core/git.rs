//! Thin wrapper over the `git` command line

use std::path::PathBuf;
use std::process::Command;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GitError {
    #[error("Failed to run git {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("git {command} failed: {stderr}")]
    Failed { command: String, stderr: String },
}

/// Files changed in the working tree, grouped by kind
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSummary {
    pub modified: Vec<String>,
    pub added: Vec<String>,
    pub deleted: Vec<String>,
    pub untracked: Vec<String>,
}

impl ChangeSummary {
    /// Parse `git status --porcelain` output
    pub fn from_porcelain(output: &str) -> Self {
        let mut summary = ChangeSummary::default();
        for line in output.lines() {
            if line.len() < 4 {
                continue;
            }
            let (status, path) = line.split_at(3);
            let path = path.trim().to_string();
            let status = status.trim();

            if status == "??" {
                summary.untracked.push(path);
            } else if status.contains('D') {
                summary.deleted.push(path);
            } else if status.contains('A') {
                summary.added.push(path);
            } else {
                summary.modified.push(path);
            }
        }
        summary
    }

    pub fn total(&self) -> usize {
        self.modified.len() + self.added.len() + self.deleted.len() + self.untracked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Non-empty groups with a label, in display order
    pub fn groups(&self) -> Vec<(&'static str, &[String])> {
        [
            ("Modified", self.modified.as_slice()),
            ("Added", self.added.as_slice()),
            ("Deleted", self.deleted.as_slice()),
            ("Untracked", self.untracked.as_slice()),
        ]
        .into_iter()
        .filter(|(_, files)| !files.is_empty())
        .collect()
    }
}

/// A git working tree rooted at a project directory
#[derive(Debug, Clone)]
pub struct Git {
    root: PathBuf,
}

impl Git {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Whether a `git` executable can be run
    pub fn is_installed() -> bool {
        Command::new("git")
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    fn run(&self, args: &[&str]) -> Result<String, GitError> {
        let command = args.join(" ");
        tracing::debug!(command = %command, cwd = %self.root.display(), "Running git");

        let output = Command::new("git")
            .args(args)
            .current_dir(&self.root)
            .output()
            .map_err(|source| GitError::Spawn {
                command: command.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(GitError::Failed {
                command,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    /// Whether commits can be authored: `user.name` and `user.email` are set
    pub fn is_configured(&self) -> bool {
        ["user.name", "user.email"].iter().all(|key| {
            self.run(&["config", "--get", key])
                .map(|value| !value.trim().is_empty())
                .unwrap_or(false)
        })
    }

    pub fn is_repository(&self) -> bool {
        self.run(&["rev-parse", "--is-inside-work-tree"])
            .map(|out| out.trim() == "true")
            .unwrap_or(false)
    }

    /// `git init` with `main` as the initial branch
    pub fn init(&self) -> Result<(), GitError> {
        self.run(&["init", "--quiet"])?;
        self.run(&["symbolic-ref", "HEAD", "refs/heads/main"])?;
        Ok(())
    }

    pub fn add_all(&self) -> Result<(), GitError> {
        self.run(&["add", "--all", "."])?;
        Ok(())
    }

    pub fn commit(&self, message: &str) -> Result<(), GitError> {
        self.run(&["commit", "--quiet", "-m", message])?;
        Ok(())
    }

    pub fn has_staged_changes(&self) -> Result<bool, GitError> {
        let out = self.run(&["diff", "--cached", "--name-only"])?;
        Ok(!out.trim().is_empty())
    }

    pub fn change_summary(&self) -> Result<ChangeSummary, GitError> {
        let out = self.run(&["status", "--porcelain", "--untracked-files=all"])?;
        Ok(ChangeSummary::from_porcelain(&out))
    }

    pub fn current_branch(&self) -> Result<String, GitError> {
        Ok(self
            .run(&["rev-parse", "--abbrev-ref", "HEAD"])?
            .trim()
            .to_string())
    }

    pub fn remote_url(&self, name: &str) -> Option<String> {
        self.run(&["remote", "get-url", name])
            .ok()
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty())
    }

    /// Point `name` at `url`, adding the remote if needed
    pub fn set_remote(&self, name: &str, url: &str) -> Result<(), GitError> {
        if self.remote_url(name).is_some() {
            self.run(&["remote", "set-url", name, url])?;
        } else {
            self.run(&["remote", "add", name, url])?;
        }
        Ok(())
    }

    /// Push `branch`, retrying with `--set-upstream` for a first push
    pub fn push(&self, remote: &str, branch: &str) -> Result<(), GitError> {
        if self.run(&["push", remote, branch]).is_ok() {
            return Ok(());
        }
        self.run(&["push", "--set-upstream", remote, branch])?;
        Ok(())
    }
}
