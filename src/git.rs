use std::io;
use std::path::Path;
use std::process::{Command, Output};

use log::{debug, info};
use thiserror::Error;

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum Commit {
    Disabled,
    NotRepository,
    Unchanged,
    Committed,
}

#[derive(Debug, Error)]
pub enum GitError {
    #[error("git {step} could not be run: {source}")]
    Spawn {
        step: &'static str,
        source: io::Error,
    },

    #[error("git {step} failed: {output}")]
    Failed { step: &'static str, output: String },
}

fn git(dir: &Path, step: &'static str, args: &[&str]) -> Result<Output, GitError> {
    debug!("git -C {} {}", dir.display(), args.join(" "));
    Command::new("git")
        .arg("-C")
        .arg(dir)
        .args(args)
        .output()
        .map_err(|source| GitError::Spawn { step, source })
}

fn check(step: &'static str, output: Output) -> Result<(), GitError> {
    if output.status.success() {
        return Ok(());
    }
    let mut message = String::from_utf8_lossy(&output.stderr).trim().to_string();
    if message.is_empty() {
        message = output.status.to_string();
    }
    Err(GitError::Failed {
        step,
        output: message,
    })
}

/// Stages everything under `dir` and commits it if anything changed.
/// Skipped when disabled or when `dir` isn't the root of a git repository.
pub fn auto_commit(
    dir: &Path,
    enabled: bool,
    message: &str,
) -> Result<Commit, GitError> {
    if !enabled {
        return Ok(Commit::Disabled);
    }
    if !dir.join(".git").exists() {
        return Ok(Commit::NotRepository);
    }

    check("add", git(dir, "add", &["add", "-A"])?)?;

    // exit status 0 means the index matches HEAD
    if git(dir, "diff", &["diff", "--cached", "--quiet"])?.status.success() {
        return Ok(Commit::Unchanged);
    }

    check("commit", git(dir, "commit", &["commit", "-m", message])?)?;
    info!("Committed: {}", message);
    Ok(Commit::Committed)
}
