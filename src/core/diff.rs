//! What changed between two builds of the same project

use std::collections::BTreeSet;

use crate::core::inventory::{Inventory, VariationKey};
use crate::core::location::locations_match;
use crate::core::project::{Assembly, PartRef, Project};

/// Decimals compared when deciding whether a placement moved
pub const LOCATION_PRECISION: i32 = 6;

/// Modified parts and assemblies of a build relative to its baseline
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RevisionDiff {
    pub modified_parts: BTreeSet<VariationKey>,
    pub modified_assemblies: BTreeSet<String>,
}

impl RevisionDiff {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.modified_parts.is_empty() && self.modified_assemblies.is_empty()
    }

    pub fn merge(&mut self, other: RevisionDiff) {
        self.modified_parts.extend(other.modified_parts);
        self.modified_assemblies.extend(other.modified_assemblies);
    }

    pub fn is_part_modified(&self, key: &VariationKey) -> bool {
        self.modified_parts.contains(key)
    }

    pub fn is_assembly_modified(&self, path: &str) -> bool {
        self.modified_assemblies.contains(path)
    }

    /// Part names present in `prev` but not in `new`
    pub fn removed_parts<S>(prev: &Project<S>, new: &Project<S>) -> BTreeSet<String> {
        let current = new.inventory.part_names();
        prev.inventory
            .part_names()
            .into_iter()
            .filter(|name| !current.contains(name))
            .collect()
    }
}

/// Whether the occurrence at `part.path` differs from the baseline.
///
/// New paths, new geometry and new colors all count; a move does not.
pub fn part_changed<S>(
    part: &PartRef,
    inventory: &Inventory<S>,
    prev: Option<&Project<S>>,
) -> bool {
    let Some(prev) = prev else {
        return true;
    };
    let Some(prev_part) = prev.part_refs.get(&part.path) else {
        return true;
    };
    if prev_part.variation.checksum != part.variation.checksum {
        return true;
    }

    let color = inventory.variation(&part.variation).map(|v| v.color);
    let prev_color = prev.inventory.variation(&prev_part.variation).map(|v| v.color);
    color != prev_color
}

/// Whether an assembly's own descriptor differs from the baseline
pub fn assembly_descriptor_changed<S>(assembly: &Assembly, prev: Option<&Project<S>>) -> bool {
    let Some(prev_assembly) = prev.and_then(|p| p.assemblies.get(&assembly.path)) else {
        return true;
    };

    if assembly.children != prev_assembly.children
        || assembly.parts.len() != prev_assembly.parts.len()
        || !locations_match(
            assembly.location.as_ref(),
            prev_assembly.location.as_ref(),
            LOCATION_PRECISION,
        )
    {
        return true;
    }

    assembly
        .parts
        .iter()
        .zip(&prev_assembly.parts)
        .any(|(a, b)| {
            a.path != b.path
                || a.variation != b.variation
                || !locations_match(a.location.as_ref(), b.location.as_ref(), LOCATION_PRECISION)
        })
}

/// Compare two already-built projects
pub fn diff<S>(new: &Project<S>, prev: Option<&Project<S>>) -> RevisionDiff {
    let mut result = RevisionDiff::new();
    let mut touched = BTreeSet::new();

    for assembly in new.assemblies.values() {
        let mut changed = assembly_descriptor_changed(assembly, prev);
        for part in &assembly.parts {
            if part_changed(part, &new.inventory, prev) {
                result.modified_parts.insert(part.variation.clone());
                changed = true;
            }
        }
        if changed {
            touched.insert(assembly.path.clone());
        }
    }

    for path in &touched {
        result.modified_assemblies.insert(path.clone());
        for ancestor in new.ancestors(path) {
            result.modified_assemblies.insert(ancestor.to_string());
        }
    }

    result
}
