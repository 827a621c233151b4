//! Project creation and revision: import, build, persist, render

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::assets::{write_assets, AssetError, AssetReport, ASSETS_DIR};
use crate::core::builder::{AssemblyBuilder, BuildError};
use crate::core::config::{ConfigError, ProjectConfig};
use crate::core::diff::RevisionDiff;
use crate::core::geometry::{AssemblyNode, GeometryError, GeometryKernel};
use crate::core::observer::BuildObserver;
use crate::core::project::{Project, ProjectOptions};
use crate::core::store::{project_exists, read_project, write_project, StoreError};
use crate::core::template::{ReadmeContext, TemplateError, TemplateRenderer};

pub const README_FILE: &str = "README.md";
pub const GITIGNORE_FILE: &str = ".gitignore";

#[derive(Debug, Error)]
pub enum RevisionError {
    #[error("No previous project at {}: run `orion create` first", path.display())]
    MissingPreviousProject { path: PathBuf },

    #[error("A project already exists at {} (use --force to overwrite)", path.display())]
    AlreadyExists { path: PathBuf },

    #[error("CAD file not found: {}", path.display())]
    CadNotFound { path: PathBuf },

    #[error("Failed to import {}: {source}", path.display())]
    Import {
        path: PathBuf,
        #[source]
        source: GeometryError,
    },

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Assets(#[from] AssetError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> RevisionError + '_ {
    move |source| RevisionError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Parameters of `orion create`
#[derive(Debug, Clone)]
pub struct CreateRequest {
    pub name: String,
    pub cad_path: PathBuf,
    pub project_dir: PathBuf,
    pub repo_url: Option<String>,
    pub options: ProjectOptions,
    /// Overwrite an existing project at `project_dir`
    pub force: bool,
}

/// What a create or revision produced
#[derive(Debug)]
pub struct RevisionOutcome<S> {
    pub project: Project<S>,
    pub config: ProjectConfig,
    pub diff: RevisionDiff,
    /// Part names that existed in the baseline and are gone now
    pub removed_parts: BTreeSet<String>,
    pub assets: Option<AssetReport>,
}

fn import<K: GeometryKernel>(
    kernel: &K,
    cad_path: &Path,
) -> Result<AssemblyNode<K::Solid>, RevisionError> {
    if !cad_path.is_file() {
        return Err(RevisionError::CadNotFound {
            path: cad_path.to_path_buf(),
        });
    }
    kernel.import(cad_path).map_err(|source| RevisionError::Import {
        path: cad_path.to_path_buf(),
        source,
    })
}

/// Build a new project from a CAD file and lay it out under `project_dir`.
///
/// Git is left to the caller.
pub fn create_project<K: GeometryKernel>(
    kernel: &K,
    observer: &dyn BuildObserver,
    request: CreateRequest,
) -> Result<RevisionOutcome<K::Solid>, RevisionError> {
    let dir = request.project_dir.as_path();
    if (project_exists(dir) || ProjectConfig::path(dir).is_file()) && !request.force {
        return Err(RevisionError::AlreadyExists {
            path: dir.to_path_buf(),
        });
    }

    let root = import(kernel, &request.cad_path)?;
    let output = AssemblyBuilder::new(kernel, request.options.clone(), observer).build(&root)?;

    write_project(kernel, &output.project, dir)?;
    let cad_copy = copy_cad_file(&request.cad_path, dir, None)?;

    let mut config = ProjectConfig::new(request.name, cad_copy, request.options);
    config.repo_url = request.repo_url;
    config.save(dir)?;

    let renderer = TemplateRenderer::new()?;
    write_text(&dir.join(GITIGNORE_FILE), &renderer.gitignore()?)?;
    write_readme(&renderer, &config, &output.project, dir)?;

    let assets = render_assets(kernel, &config, &output.project, &output.diff, dir)?;

    tracing::info!(
        path = %dir.display(),
        parts = output.project.inventory.parts.len(),
        assemblies = output.project.assemblies.len(),
        "Created project"
    );

    Ok(RevisionOutcome {
        project: output.project,
        config,
        diff: output.diff,
        removed_parts: BTreeSet::new(),
        assets,
    })
}

/// Rebuild the project at `project_dir` against its last persisted revision.
///
/// `cad_override` replaces the recorded CAD file; the new file is copied
/// into the project and recorded in `config.yaml`.
pub fn revise_project<K: GeometryKernel>(
    kernel: &K,
    observer: &dyn BuildObserver,
    project_dir: &Path,
    cad_override: Option<&Path>,
) -> Result<RevisionOutcome<K::Solid>, RevisionError> {
    let mut config = match ProjectConfig::load(project_dir) {
        Ok(config) => config,
        Err(ConfigError::NotFound { .. }) => {
            return Err(RevisionError::MissingPreviousProject {
                path: project_dir.to_path_buf(),
            })
        }
        Err(e) => return Err(e.into()),
    };

    let previous = match read_project(kernel, project_dir, config.options.clone()) {
        Ok(project) => project,
        Err(StoreError::MissingProject { path }) => {
            return Err(RevisionError::MissingPreviousProject { path })
        }
        Err(e) => return Err(e.into()),
    };

    let cad_path = match cad_override {
        Some(path) => path.to_path_buf(),
        None => config.cad_file(project_dir),
    };

    let root = import(kernel, &cad_path)?;
    let output = AssemblyBuilder::new(kernel, config.options.clone(), observer)
        .with_previous(&previous)
        .build(&root)?;

    write_project(kernel, &output.project, project_dir)?;

    let recorded = config.cad_file(project_dir);
    let cad_copy = copy_cad_file(&cad_path, project_dir, Some(&recorded))?;
    if cad_copy != config.cad_path {
        config.cad_path = cad_copy;
        config.save(project_dir)?;
    }

    let renderer = TemplateRenderer::new()?;
    write_readme(&renderer, &config, &output.project, project_dir)?;

    let assets = render_assets(kernel, &config, &output.project, &output.diff, project_dir)?;
    let removed_parts = RevisionDiff::removed_parts(&previous, &output.project);

    tracing::info!(
        path = %project_dir.display(),
        modified_parts = output.diff.modified_parts.len(),
        modified_assemblies = output.diff.modified_assemblies.len(),
        removed_parts = removed_parts.len(),
        "Revised project"
    );

    Ok(RevisionOutcome {
        project: output.project,
        config,
        diff: output.diff,
        removed_parts,
        assets,
    })
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Copy `source` to the project root and return its project-relative path.
/// A previous copy under a different name is removed.
fn copy_cad_file(
    source: &Path,
    project_dir: &Path,
    previous: Option<&Path>,
) -> Result<PathBuf, RevisionError> {
    let file_name = source.file_name().map(PathBuf::from).ok_or_else(|| {
        RevisionError::CadNotFound {
            path: source.to_path_buf(),
        }
    })?;
    let target = project_dir.join(&file_name);

    if !same_file(source, &target) {
        fs::copy(source, &target).map_err(io_error(&target))?;
    }

    if let Some(previous) = previous {
        if previous.is_file() && !same_file(previous, &target) {
            fs::remove_file(previous).map_err(io_error(previous))?;
        }
    }

    Ok(file_name)
}

fn write_text(path: &Path, content: &str) -> Result<(), RevisionError> {
    fs::write(path, content).map_err(io_error(path))
}

fn write_readme<S>(
    renderer: &TemplateRenderer,
    config: &ProjectConfig,
    project: &Project<S>,
    dir: &Path,
) -> Result<(), RevisionError> {
    let root = project.root();
    let cover_image = match root {
        Some(root) if config.options.include_assets => {
            Some(format!("{}/{}.svg", ASSETS_DIR, root.name()))
        }
        _ => None,
    };

    let context = ReadmeContext {
        name: config.name.clone(),
        root_path: root.map(|r| r.path.clone()).unwrap_or_default(),
        part_count: project.inventory.parts.len(),
        include_assets: config.options.include_assets,
        cover_image,
        repo_url: config.repo_url.clone(),
    };
    write_text(&dir.join(README_FILE), &renderer.readme(&context)?)
}

fn render_assets<K: GeometryKernel>(
    kernel: &K,
    config: &ProjectConfig,
    project: &Project<K::Solid>,
    diff: &RevisionDiff,
    dir: &Path,
) -> Result<Option<AssetReport>, RevisionError> {
    if !config.options.include_assets {
        return Ok(None);
    }
    Ok(Some(write_assets(kernel, project, diff, dir)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::observer::NullObserver;
    use crate::core::geometry::MeshKernel;
    use tempfile::TempDir;

    const CAD: &str = r#"
name: Bench
shapes:
  block:
    cuboid: [4, 2, 1]
children:
  - name: Left
    shape: block
  - name: Right
    shape: block
    location: { translation: [10, 0, 0], rotation: [0, 0, 90] }
"#;

    fn request(tmp: &TempDir) -> CreateRequest {
        let cad = tmp.path().join("bench.yaml");
        fs::write(&cad, CAD).unwrap();
        CreateRequest {
            name: "bench".into(),
            cad_path: cad,
            project_dir: tmp.path().join("project"),
            repo_url: None,
            options: ProjectOptions::default(),
            force: false,
        }
    }

    #[test]
    fn test_create_lays_out_project() {
        let tmp = TempDir::new().unwrap();
        let outcome = create_project(&MeshKernel, &NullObserver, request(&tmp)).unwrap();
        let dir = tmp.path().join("project");

        assert_eq!(outcome.project.inventory.parts.len(), 1);
        assert!(dir.join("bench.yaml").is_file());
        assert!(dir.join(README_FILE).is_file());
        assert!(dir.join(GITIGNORE_FILE).is_file());
        assert_eq!(ProjectConfig::load(&dir).unwrap().cad_path, PathBuf::from("bench.yaml"));
        assert!(outcome.assets.is_none());
    }

    #[test]
    fn test_create_refuses_existing_project() {
        let tmp = TempDir::new().unwrap();
        create_project(&MeshKernel, &NullObserver, request(&tmp)).unwrap();
        let err = create_project(&MeshKernel, &NullObserver, request(&tmp)).unwrap_err();
        assert!(matches!(err, RevisionError::AlreadyExists { .. }));

        let mut forced = request(&tmp);
        forced.force = true;
        assert!(create_project(&MeshKernel, &NullObserver, forced).is_ok());
    }

    #[test]
    fn test_revision_without_changes() {
        let tmp = TempDir::new().unwrap();
        create_project(&MeshKernel, &NullObserver, request(&tmp)).unwrap();

        let outcome =
            revise_project(&MeshKernel, &NullObserver, &tmp.path().join("project"), None).unwrap();
        assert!(outcome.diff.is_empty());
        assert!(outcome.removed_parts.is_empty());
    }

    #[test]
    fn test_revision_requires_project() {
        let tmp = TempDir::new().unwrap();
        let err = revise_project(&MeshKernel, &NullObserver, tmp.path(), None).unwrap_err();
        assert!(matches!(err, RevisionError::MissingPreviousProject { .. }));
    }

    #[test]
    fn test_revision_replaces_cad_copy() {
        let tmp = TempDir::new().unwrap();
        create_project(&MeshKernel, &NullObserver, request(&tmp)).unwrap();
        let dir = tmp.path().join("project");

        let revised = tmp.path().join("bench-v2.yaml");
        fs::write(&revised, CAD.replace("[4, 2, 1]", "[4, 2, 3]")).unwrap();

        let outcome = revise_project(&MeshKernel, &NullObserver, &dir, Some(&revised)).unwrap();
        assert_eq!(outcome.config.cad_path, PathBuf::from("bench-v2.yaml"));
        assert!(dir.join("bench-v2.yaml").is_file());
        assert!(!dir.join("bench.yaml").exists());
        assert!(!outcome.diff.modified_parts.is_empty());
        assert!(outcome.diff.is_assembly_modified("/Bench"));
    }

    #[test]
    fn test_assets_rendered_when_enabled() {
        let tmp = TempDir::new().unwrap();
        let mut req = request(&tmp);
        req.options.include_assets = true;
        let outcome = create_project(&MeshKernel, &NullObserver, req).unwrap();
        let dir = tmp.path().join("project");

        assert!(dir.join("assets/Bench.svg").is_file());
        assert!(dir.join("assets/parts/Left.svg").is_file());
        assert_eq!(outcome.assets.map(|a| a.written.len()), Some(2));
        let readme = fs::read_to_string(dir.join(README_FILE)).unwrap();
        assert!(readme.contains("assets/Bench.svg"));
    }
}
