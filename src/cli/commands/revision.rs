//! `orion revision` command - Rebuild a project and stage what changed

use console::style;
use miette::Result;
use std::path::PathBuf;

use crate::cli::helpers::{confirm, format_changes, observer, project_dir};
use crate::cli::GlobalOpts;
use crate::core::geometry::MeshKernel;
use crate::core::git::Git;
use crate::core::revision::{revise_project, RevisionOutcome};

#[derive(clap::Args, Debug)]
pub struct RevisionArgs {
    /// Project directory [default: current directory]
    #[arg(long, short = 'p')]
    pub project_path: Option<PathBuf>,

    /// Revised CAD file [default: the file recorded in config.yaml]
    #[arg(long, short = 'c')]
    pub cad_path: Option<PathBuf>,

    /// Stage changes without asking
    #[arg(long, short = 'y')]
    pub yes: bool,

    /// Do not look at or stage anything in git
    #[arg(long)]
    pub no_git: bool,
}

pub fn run(args: RevisionArgs, global: &GlobalOpts) -> Result<()> {
    let dir = project_dir(args.project_path)?;

    let git = Git::new(&dir);
    if !args.no_git && !(Git::is_installed() && git.is_repository()) {
        return Err(miette::miette!(
            "{} is not a git repository (use --no-git to skip version control)",
            dir.display()
        ));
    }

    let observer = observer(global);
    let outcome = revise_project(&MeshKernel, &observer, &dir, args.cad_path.as_deref())
        .map_err(|e| miette::miette!("{}", e))?;

    if !global.quiet {
        print_revision(&outcome);
    }

    if args.no_git {
        return Ok(());
    }

    let changes = git.change_summary().map_err(|e| miette::miette!("{}", e))?;
    if changes.is_empty() {
        if !global.quiet {
            println!("{}", style("Working tree clean, nothing to stage").dim());
        }
        return Ok(());
    }

    print!("\n{}", format_changes(&changes));
    if !confirm("Stage these changes?", args.yes)? {
        println!("{}", style("Changes left unstaged").yellow());
        return Ok(());
    }

    git.add_all().map_err(|e| miette::miette!("{}", e))?;
    if !global.quiet {
        println!(
            "{} Staged {} file{}. Run {} to commit and push.",
            style("✓").green(),
            changes.total(),
            if changes.total() == 1 { "" } else { "s" },
            style("orion deploy").cyan()
        );
    }
    Ok(())
}

fn print_revision<S>(outcome: &RevisionOutcome<S>) {
    let diff = &outcome.diff;
    if diff.is_empty() && outcome.removed_parts.is_empty() {
        println!("{} No geometry or structure changes", style("✓").green());
        return;
    }

    if !diff.modified_parts.is_empty() {
        println!("{}", style("Modified parts:").bold());
        for key in &diff.modified_parts {
            let name = outcome
                .project
                .inventory
                .name(&key.checksum)
                .unwrap_or("?");
            println!("  {} {} (v{})", style("~").yellow(), name, key.id);
        }
    }

    if !outcome.removed_parts.is_empty() {
        println!("{}", style("Removed parts:").bold());
        for name in &outcome.removed_parts {
            println!("  {} {}", style("-").red(), name);
        }
    }

    if !diff.modified_assemblies.is_empty() {
        println!("{}", style("Modified assemblies:").bold());
        for path in &diff.modified_assemblies {
            println!("  {} {}", style("~").yellow(), path);
        }
    }
}
