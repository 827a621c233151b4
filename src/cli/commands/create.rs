//! `orion create` command - Build a new project from a CAD file

use console::style;
use miette::{IntoDiagnostic, Result};
use std::path::PathBuf;

use crate::cli::helpers::{observer, require_git};
use crate::cli::GlobalOpts;
use crate::core::geometry::MeshKernel;
use crate::core::git::{Git, GitError};
use crate::core::project::{AlignmentPolicy, ProjectOptions};
use crate::core::revision::{create_project, CreateRequest};

#[derive(clap::Args, Debug)]
pub struct CreateArgs {
    /// Project name, also the default directory name
    #[arg(long, short = 'n')]
    pub name: String,

    /// Assembly file to import (.yaml, .yml or .json)
    #[arg(long, short = 'c')]
    pub cad_path: PathBuf,

    /// Directory to create the project in [default: ./<name>]
    #[arg(long, short = 'p')]
    pub path: Option<PathBuf>,

    /// Git remote to record as `origin`
    #[arg(long, env = "ORION_REMOTE_URL")]
    pub remote_url: Option<String>,

    /// Render SVG previews under assets/
    #[arg(long)]
    pub include_assets: bool,

    /// Keep parts in their modeled orientation instead of their principal axes
    #[arg(long)]
    pub no_normalize_axis: bool,

    /// Treat reference (mirrored) parts like ordinary instances
    #[arg(long)]
    pub no_references: bool,

    /// Path segments used to disambiguate colliding part names
    #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u32).range(1..))]
    pub max_name_depth: u32,

    /// What to do when same-sized parts fail to superimpose (abort, distinct)
    #[arg(long, default_value = "abort")]
    pub on_alignment_failure: AlignmentPolicy,

    /// Overwrite an existing project
    #[arg(long)]
    pub force: bool,

    /// Do not initialize a git repository
    #[arg(long)]
    pub no_git: bool,
}

pub fn run(args: CreateArgs, global: &GlobalOpts) -> Result<()> {
    let project_dir = match args.path {
        Some(path) => path,
        None => std::env::current_dir().into_diagnostic()?.join(&args.name),
    };

    if !args.no_git {
        require_git(&std::env::current_dir().into_diagnostic()?)?;
    }

    let options = ProjectOptions {
        max_name_depth: args.max_name_depth as usize,
        normalize_axis: !args.no_normalize_axis,
        use_references: !args.no_references,
        include_assets: args.include_assets,
        on_alignment_failure: args.on_alignment_failure,
    };

    let request = CreateRequest {
        name: args.name.clone(),
        cad_path: args.cad_path,
        project_dir: project_dir.clone(),
        repo_url: args.remote_url.clone(),
        options,
        force: args.force,
    };

    let observer = observer(global);
    let outcome =
        create_project(&MeshKernel, &observer, request).map_err(|e| miette::miette!("{}", e))?;

    if !args.no_git {
        let git = Git::new(&project_dir);
        let map_git = |e: GitError| miette::miette!("{}", e);
        if !project_dir.join(".git").exists() {
            git.init().map_err(map_git)?;
        }
        if let Some(url) = &args.remote_url {
            git.set_remote("origin", url).map_err(map_git)?;
        }
        git.add_all().map_err(map_git)?;
        git.commit("Initial commit").map_err(map_git)?;
    }

    if global.quiet {
        return Ok(());
    }

    println!(
        "{} Created project {} at {}",
        style("✓").green(),
        style(&args.name).cyan(),
        style(project_dir.display()).dim()
    );
    println!(
        "   {} unique part{}, {} part reference{}, {} assembl{}",
        outcome.project.inventory.parts.len(),
        if outcome.project.inventory.parts.len() == 1 { "" } else { "s" },
        outcome.project.part_refs.len(),
        if outcome.project.part_refs.len() == 1 { "" } else { "s" },
        outcome.project.assemblies.len(),
        if outcome.project.assemblies.len() == 1 { "y" } else { "ies" },
    );
    if !args.no_git {
        println!("   Initialized git repository with an initial commit");
    }

    Ok(())
}
