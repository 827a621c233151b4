//! On-disk project layout
//!
//! ```text
//! inventory/catalog.json
//! inventory/parts/<name>.brep
//! assemblies/<path>/assembly.json
//! ```
//!
//! Writes are staged in a hidden directory inside the project and moved into
//! place once every file has been written, so a failed write leaves the
//! previous revision intact.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

use crate::core::checksum::Checksum;
use crate::core::geometry::{GeometryError, GeometryKernel};
use crate::core::inventory::{CatalogItem, Inventory};
use crate::core::project::{Assembly, Project, ProjectOptions};

pub const INVENTORY_DIR: &str = "inventory";
pub const PARTS_DIR: &str = "parts";
pub const ASSEMBLIES_DIR: &str = "assemblies";
pub const CATALOG_FILE: &str = "catalog.json";
pub const ASSEMBLY_FILE: &str = "assembly.json";
pub const BREP_EXTENSION: &str = "brep";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("No Orion project found at {}", path.display())]
    MissingProject { path: PathBuf },

    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to move {} into place ({source}) and could not restore the previous tree: {restore}", path.display())]
    Rollback {
        path: PathBuf,
        #[source]
        source: std::io::Error,
        restore: std::io::Error,
    },

    #[error("Cannot load part {}: {source}", path.display())]
    Geometry {
        path: PathBuf,
        #[source]
        source: GeometryError,
    },
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> StoreError + '_ {
    move |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// File a canonical part is stored in
pub fn part_file(project_dir: &Path, name: &str) -> PathBuf {
    project_dir
        .join(INVENTORY_DIR)
        .join(PARTS_DIR)
        .join(format!("{}.{}", name, BREP_EXTENSION))
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_error(parent))?;
    }
    let content = serde_json::to_string_pretty(value).map_err(|source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, content).map_err(io_error(path))
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
    let content = fs::read_to_string(path).map_err(io_error(path))?;
    serde_json::from_str(&content).map_err(|source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Whether `dir` holds a persisted project
pub fn project_exists(dir: &Path) -> bool {
    dir.join(INVENTORY_DIR).join(CATALOG_FILE).is_file() && dir.join(ASSEMBLIES_DIR).is_dir()
}

/// Persist the inventory and assembly tree of `project` under `dir`.
///
/// Parts and assemblies that are no longer in the project disappear with the
/// previous `inventory/` and `assemblies/` trees.
pub fn write_project<K: GeometryKernel>(
    kernel: &K,
    project: &Project<K::Solid>,
    dir: &Path,
) -> Result<(), StoreError> {
    fs::create_dir_all(dir).map_err(io_error(dir))?;

    let staging = tempfile::Builder::new()
        .prefix(".orion-staging-")
        .tempdir_in(dir)
        .map_err(io_error(dir))?;
    let stage = staging.path();

    write_json(
        &stage.join(INVENTORY_DIR).join(CATALOG_FILE),
        &project.inventory.catalog,
    )?;

    let parts_dir = stage.join(INVENTORY_DIR).join(PARTS_DIR);
    fs::create_dir_all(&parts_dir).map_err(io_error(&parts_dir))?;
    for (checksum, solid) in &project.inventory.parts {
        let Some(name) = project.inventory.name(checksum) else {
            continue;
        };
        let path = part_file(stage, name);
        fs::write(&path, kernel.export_brep(solid)).map_err(io_error(&path))?;
    }

    let assemblies_dir = stage.join(ASSEMBLIES_DIR);
    fs::create_dir_all(&assemblies_dir).map_err(io_error(&assemblies_dir))?;
    for assembly in project.assemblies.values() {
        let path = assemblies_dir
            .join(assembly.relative_path())
            .join(ASSEMBLY_FILE);
        write_json(&path, assembly)?;
    }

    swap_into_place(stage, dir, &[INVENTORY_DIR, ASSEMBLIES_DIR])?;

    tracing::debug!(
        path = %dir.display(),
        parts = project.inventory.parts.len(),
        assemblies = project.assemblies.len(),
        "Wrote project"
    );
    Ok(())
}

/// Move every staged `entries` tree from `stage` into `dir` as one unit.
///
/// All previous trees are parked inside `stage` (removed with it) before any
/// staged tree moves. If a rename fails, every completed rename is undone in
/// reverse so `dir` keeps the previous revision.
fn swap_into_place(stage: &Path, dir: &Path, entries: &[&str]) -> Result<(), StoreError> {
    let mut plan: Vec<(PathBuf, PathBuf)> = Vec::new();
    for entry in entries {
        let target = dir.join(entry);
        if target.exists() {
            plan.push((target, stage.join(format!("previous-{}", entry))));
        }
    }
    for entry in entries {
        plan.push((stage.join(entry), dir.join(entry)));
    }

    let mut done: Vec<&(PathBuf, PathBuf)> = Vec::new();
    for step in &plan {
        let (from, to) = step;
        if let Err(source) = fs::rename(from, to) {
            for (undo_from, undo_to) in done.iter().rev() {
                if let Err(restore) = fs::rename(undo_to, undo_from) {
                    return Err(StoreError::Rollback {
                        path: to.clone(),
                        source,
                        restore,
                    });
                }
            }
            return Err(StoreError::Io {
                path: to.clone(),
                source,
            });
        }
        done.push(step);
    }
    Ok(())
}

/// Load a project written by [`write_project`].
///
/// The root is the assembly with the shortest path; assemblies and part
/// references come back in depth-first order from it.
pub fn read_project<K: GeometryKernel>(
    kernel: &K,
    dir: &Path,
    options: ProjectOptions,
) -> Result<Project<K::Solid>, StoreError> {
    if !project_exists(dir) {
        return Err(StoreError::MissingProject {
            path: dir.to_path_buf(),
        });
    }

    let catalog: BTreeMap<Checksum, CatalogItem> =
        read_json(&dir.join(INVENTORY_DIR).join(CATALOG_FILE))?;

    let mut inventory = Inventory::new();
    for (checksum, item) in &catalog {
        let path = part_file(dir, &item.name);
        let bytes = fs::read(&path).map_err(io_error(&path))?;
        let solid = kernel
            .import_brep(&bytes)
            .map_err(|source| StoreError::Geometry {
                path: path.clone(),
                source,
            })?;
        inventory.parts.insert(checksum.clone(), solid);
    }
    inventory.catalog = catalog;

    let mut loaded: HashMap<String, Assembly> = HashMap::new();
    let assemblies_dir = dir.join(ASSEMBLIES_DIR);
    for entry in WalkDir::new(&assemblies_dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && e.file_name() == ASSEMBLY_FILE)
    {
        let assembly: Assembly = read_json(entry.path())?;
        loaded.insert(assembly.path.clone(), assembly);
    }

    let mut project = Project::new(options);
    project.inventory = inventory;

    let root_path = loaded
        .keys()
        .min_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)))
        .cloned();

    let mut stack: Vec<String> = root_path.into_iter().collect();
    while let Some(path) = stack.pop() {
        let Some(assembly) = loaded.remove(&path) else {
            continue;
        };
        for part in &assembly.parts {
            project.part_refs.insert(part.path.clone(), part.clone());
        }
        stack.extend(assembly.children.iter().rev().cloned());
        project.assemblies.insert(path, assembly);
    }

    if !loaded.is_empty() {
        tracing::warn!(
            count = loaded.len(),
            "Ignoring assemblies not reachable from the root"
        );
    }

    Ok(project)
}
