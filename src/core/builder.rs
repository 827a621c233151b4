//! Assembly tree builder
//!
//! Walks an imported assembly depth-first and turns every leaf into a
//! [`PartRef`] against a deduplicated [`Inventory`](crate::core::inventory::Inventory):
//!
//! 1. the leaf is placed in the root frame and fingerprinted;
//! 2. if that placed fingerprint was seen before (this build or the previous
//!    revision) its canonical part and placement are reused;
//! 3. otherwise the part is normalized, aligned onto the representative of its
//!    [`PartGroup`] if there is one, and fingerprinted in canonical form.
//!
//! Each recursive step returns the [`RevisionDiff`] of its subtree, which is
//! the only way change information leaves the traversal.

use std::collections::{HashMap, HashSet};
use thiserror::Error;

use crate::core::align::{align_solids, AlignmentError};
use crate::core::checksum::{checksum_solid, Checksum, PartGroup};
use crate::core::diff::{assembly_descriptor_changed, part_changed, RevisionDiff};
use crate::core::geometry::{AssemblyNode, Color, GeometryError, GeometryKernel, LeafPart};
use crate::core::location::Location;
use crate::core::naming::{default_name, NameRegistry, NamingError};
use crate::core::normalize::normalize;
use crate::core::observer::{BuildEvent, BuildObserver};
use crate::core::project::{AlignmentPolicy, Assembly, PartRef, Project, ProjectOptions};

/// Deepest assembly nesting accepted from an imported file
pub const MAX_ASSEMBLY_DEPTH: usize = 256;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error("Failed to align part {path}: {source}")]
    Alignment {
        path: String,
        #[source]
        source: AlignmentError,
    },

    #[error(transparent)]
    Naming(#[from] NamingError),

    #[error("Assembly nesting deeper than {max} levels at {path}")]
    TooDeep { path: String, max: usize },
}

/// Result of a build: the new project and what changed against the baseline
#[derive(Debug)]
pub struct BuildOutput<S> {
    pub project: Project<S>,
    pub diff: RevisionDiff,
}

/// Canonical representative of a part group
struct BasePart<S> {
    solid: S,
}

/// Placement cache entry, keyed by the fingerprint of a placed solid
#[derive(Clone)]
struct CachedPlacement {
    checksum: Checksum,
    /// Canonical frame to root frame
    world: Location,
}

/// Per-build caches. Owned by the traversal, never shared.
struct AssemblyIndex<'a, S> {
    base_parts: HashMap<PartGroup, BasePart<S>>,
    aligned_refs: HashMap<Checksum, CachedPlacement>,
    part_names: NameRegistry,
    prev_project: Option<&'a Project<S>>,
}

/// Builds a [`Project`] from an imported assembly tree
pub struct AssemblyBuilder<'a, K: GeometryKernel> {
    kernel: &'a K,
    options: ProjectOptions,
    observer: &'a dyn BuildObserver,
    previous: Option<&'a Project<K::Solid>>,
}

impl<'a, K: GeometryKernel> AssemblyBuilder<'a, K> {
    pub fn new(kernel: &'a K, options: ProjectOptions, observer: &'a dyn BuildObserver) -> Self {
        Self {
            kernel,
            options,
            observer,
            previous: None,
        }
    }

    /// Compare against, and reuse placements from, a previous revision
    pub fn with_previous(mut self, previous: &'a Project<K::Solid>) -> Self {
        self.previous = Some(previous);
        self
    }

    pub fn build(self, root: &AssemblyNode<K::Solid>) -> Result<BuildOutput<K::Solid>, BuildError> {
        let mut ctx = BuildContext {
            kernel: self.kernel,
            observer: self.observer,
            index: AssemblyIndex {
                base_parts: HashMap::new(),
                aligned_refs: HashMap::new(),
                part_names: NameRegistry::new(self.options.max_name_depth),
                prev_project: self.previous,
            },
            project: Project::new(self.options.clone()),
            options: self.options,
        };

        if ctx.options.normalize_axis {
            if let Some(prev) = self.previous {
                ctx.seed_placements(prev);
            }
        }

        let diff = match root {
            AssemblyNode::Assembly {
                name,
                location,
                children,
            } => {
                let world = location.clone().unwrap_or_default();
                ctx.build_assembly(format!("/{}", name), location.as_ref(), children, &world, 0)?
            }
            AssemblyNode::Part { name, .. } => {
                let world = Location::identity();
                ctx.build_assembly(format!("/{}", name), None, std::slice::from_ref(root), &world, 0)?
            }
        };

        Ok(BuildOutput {
            project: ctx.project,
            diff,
        })
    }
}

struct BuildContext<'a, K: GeometryKernel> {
    kernel: &'a K,
    options: ProjectOptions,
    observer: &'a dyn BuildObserver,
    index: AssemblyIndex<'a, K::Solid>,
    project: Project<K::Solid>,
}

/// Append `name` to `parent`, suffixing `_2`, `_3`... for repeated sibling names
fn unique_child_path(parent: &str, name: &str, used: &mut HashSet<String>) -> String {
    let mut candidate = name.to_string();
    let mut n = 2;
    while !used.insert(candidate.clone()) {
        candidate = format!("{}_{}", name, n);
        n += 1;
    }
    format!("{}/{}", parent, candidate)
}

fn non_identity(location: Location) -> Option<Location> {
    if location.is_identity() {
        None
    } else {
        Some(location)
    }
}

impl<'a, K: GeometryKernel> BuildContext<'a, K> {
    /// Fill the placement cache from the previous revision so unchanged parts
    /// keep their canonical form and placement.
    fn seed_placements(&mut self, prev: &Project<K::Solid>) {
        for (part, world) in prev.placed_parts() {
            let checksum = &part.variation.checksum;
            let Some(solid) = prev.inventory.parts.get(checksum) else {
                continue;
            };
            let placed = self.kernel.place(solid, &world);
            self.index.aligned_refs.insert(
                checksum_solid(self.kernel, &placed),
                CachedPlacement {
                    checksum: checksum.clone(),
                    world,
                },
            );
        }
    }

    fn build_assembly(
        &mut self,
        path: String,
        location: Option<&Location>,
        children: &[AssemblyNode<K::Solid>],
        world: &Location,
        depth: usize,
    ) -> Result<RevisionDiff, BuildError> {
        if depth > MAX_ASSEMBLY_DEPTH {
            return Err(BuildError::TooDeep {
                path,
                max: MAX_ASSEMBLY_DEPTH,
            });
        }

        self.observer.on_event(&BuildEvent::AssemblyEntered { path: &path, depth });

        let mut assembly = Assembly::new(path.clone(), location.cloned().and_then(non_identity));
        // Reserve the slot so parents precede their children
        self.project.assemblies.insert(path.clone(), assembly.clone());

        let mut diff = RevisionDiff::new();
        let mut modified = false;
        let mut used_names = HashSet::new();

        for child in children {
            match child {
                AssemblyNode::Assembly {
                    name,
                    location: child_location,
                    children: grandchildren,
                } => {
                    let child_path = unique_child_path(&path, name, &mut used_names);
                    if child.part_count() == 0 {
                        self.observer
                            .on_event(&BuildEvent::EmptyAssemblySkipped { path: &child_path });
                        continue;
                    }

                    let child_world = match child_location {
                        Some(local) => world.compose(local),
                        None => world.clone(),
                    };
                    let child_diff = self.build_assembly(
                        child_path.clone(),
                        child_location.as_ref(),
                        grandchildren,
                        &child_world,
                        depth + 1,
                    )?;

                    modified |= !child_diff.modified_assemblies.is_empty();
                    diff.merge(child_diff);
                    assembly.children.push(child_path);
                }
                AssemblyNode::Part { name, color, leaf } => {
                    let part_path = unique_child_path(&path, name, &mut used_names);
                    let part = self.resolve_part(&part_path, *color, leaf, world)?;

                    if part_changed(&part, &self.project.inventory, self.index.prev_project) {
                        diff.modified_parts.insert(part.variation.clone());
                        modified = true;
                    }

                    self.project.part_refs.insert(part_path, part.clone());
                    assembly.parts.push(part);
                }
            }
        }

        if modified || assembly_descriptor_changed(&assembly, self.index.prev_project) {
            diff.modified_assemblies.insert(path.clone());
        }

        self.project.assemblies.insert(path, assembly);
        Ok(diff)
    }

    fn resolve_part(
        &mut self,
        path: &str,
        color: Option<Color>,
        leaf: &LeafPart<K::Solid>,
        parent_world: &Location,
    ) -> Result<PartRef, BuildError> {
        let (checksum, location, cached) = match leaf {
            LeafPart::Reference { transform, solid } if self.options.use_references => {
                let checksum = checksum_solid(self.kernel, solid);
                self.project.inventory.insert_part(&checksum, solid.clone());
                (checksum, transform.clone(), false)
            }
            _ => {
                let world = parent_world.compose(leaf.transform());
                let placed = self.kernel.place(leaf.solid(), &world);
                let (resolved, cached) = self.resolve_instance(path, placed)?;
                let local = parent_world.inverse().compose(&resolved.world);
                (resolved.checksum, local, cached)
            }
        };

        let variation = self.project.inventory.resolve(
            &checksum,
            color,
            path,
            default_name(path),
            self.index.prev_project.map(|p| &p.inventory),
        );

        for renamed in self.index.part_names.claim(&checksum, path)? {
            self.project.inventory.rename(&renamed.checksum, &renamed.to);
            self.observer.on_event(&BuildEvent::Renamed {
                from: &renamed.from,
                to: &renamed.to,
            });
        }

        self.observer.on_event(&BuildEvent::PartResolved {
            path,
            checksum: &checksum,
            variation: variation.id,
            cached,
        });

        Ok(PartRef {
            path: path.to_string(),
            variation,
            location: non_identity(location),
        })
    }

    /// Canonical checksum and root-frame placement of a placed solid
    fn resolve_instance(
        &mut self,
        path: &str,
        placed: K::Solid,
    ) -> Result<(CachedPlacement, bool), BuildError> {
        let placed_checksum = if self.options.normalize_axis {
            let key = checksum_solid(self.kernel, &placed);
            if let Some(hit) = self.index.aligned_refs.get(&key).cloned() {
                if self.adopt_cached(&hit.checksum) {
                    return Ok((hit, true));
                }
            }
            Some(key)
        } else {
            None
        };

        let group = PartGroup::of(self.kernel, &placed);
        let normalized = normalize(self.kernel, &placed, self.options.normalize_axis);

        let mut aligned = false;
        let (canonical, rotation) = match self.index.base_parts.get(&group) {
            Some(base) => match align_solids(self.kernel, &base.solid, &normalized.solid) {
                Ok(adjustment) => {
                    aligned = true;
                    (base.solid.clone(), normalized.rotation * adjustment.transpose())
                }
                Err(source) => match self.options.on_alignment_failure {
                    AlignmentPolicy::Abort => {
                        return Err(BuildError::Alignment {
                            path: path.to_string(),
                            source,
                        })
                    }
                    AlignmentPolicy::Distinct => {
                        let residual = match &source {
                            AlignmentError::Residual { residual } => Some(*residual),
                            _ => None,
                        };
                        self.observer
                            .on_event(&BuildEvent::AlignmentRejected { path, residual });
                        (normalized.solid, normalized.rotation)
                    }
                },
            },
            None => {
                self.index.base_parts.insert(
                    group,
                    BasePart {
                        solid: normalized.solid.clone(),
                    },
                );
                (normalized.solid, normalized.rotation)
            }
        };

        let checksum = checksum_solid(self.kernel, &canonical);
        if aligned && normalized.has_symmetry_axis {
            self.observer.on_event(&BuildEvent::SymmetryAligned {
                path,
                checksum: &checksum,
            });
        }
        self.project.inventory.insert_part(&checksum, canonical);

        let resolved = CachedPlacement {
            checksum,
            world: Location::new(&rotation, &normalized.offset),
        };
        if let Some(key) = placed_checksum {
            self.index.aligned_refs.insert(key, resolved.clone());
        }
        Ok((resolved, false))
    }

    /// Make a cached canonical part available in this build's inventory and
    /// register it as its group's representative. False if its solid is unknown.
    fn adopt_cached(&mut self, checksum: &Checksum) -> bool {
        let solid = match self.project.inventory.parts.get(checksum) {
            Some(solid) => solid.clone(),
            None => match self
                .index
                .prev_project
                .and_then(|prev| prev.inventory.parts.get(checksum))
            {
                Some(solid) => solid.clone(),
                None => return false,
            },
        };

        let group = PartGroup::of(self.kernel, &solid);
        self.index
            .base_parts
            .entry(group)
            .or_insert_with(|| BasePart {
                solid: solid.clone(),
            });
        self.project.inventory.insert_part(checksum, solid);
        true
    }
}
