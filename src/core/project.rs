//! In-memory project model: assemblies, part references and options

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use crate::core::inventory::{Inventory, VariationKey};
use crate::core::location::Location;

/// One placed occurrence of a catalog variation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartRef {
    /// Assembly path plus the part name
    pub path: String,
    pub variation: VariationKey,
    /// Canonical part frame to parent assembly frame; absent means identity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
}

/// Persisted descriptor of one assembly node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assembly {
    pub path: String,
    /// Placement relative to the parent assembly
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    #[serde(default)]
    pub children: Vec<String>,
    #[serde(default)]
    pub parts: Vec<PartRef>,
}

impl Assembly {
    pub fn new(path: impl Into<String>, location: Option<Location>) -> Self {
        Self {
            path: path.into(),
            location,
            children: Vec::new(),
            parts: Vec::new(),
        }
    }

    /// Last path segment
    pub fn name(&self) -> &str {
        crate::core::naming::default_name(&self.path)
    }

    /// Path with the leading slash removed, used as a directory name
    pub fn relative_path(&self) -> &str {
        self.path.trim_start_matches('/')
    }
}

/// Insertion-ordered map keyed by path
#[derive(Debug, Clone)]
pub struct PathMap<V> {
    entries: Vec<(String, V)>,
    index: HashMap<String, usize>,
}

impl<V> Default for PathMap<V> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<V> PathMap<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace. Replacing keeps the original position.
    pub fn insert(&mut self, path: impl Into<String>, value: V) {
        let path = path.into();
        match self.index.get(&path) {
            Some(&i) => self.entries[i].1 = value,
            None => {
                self.index.insert(path.clone(), self.entries.len());
                self.entries.push((path, value));
            }
        }
    }

    pub fn get(&self, path: &str) -> Option<&V> {
        self.index.get(path).map(|&i| &self.entries[i].1)
    }

    pub fn get_mut(&mut self, path: &str) -> Option<&mut V> {
        match self.index.get(path) {
            Some(&i) => Some(&mut self.entries[i].1),
            None => None,
        }
    }

    pub fn contains_key(&self, path: &str) -> bool {
        self.index.contains_key(path)
    }

    /// First inserted entry
    pub fn first(&self) -> Option<&V> {
        self.entries.first().map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.iter().map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// What the builder does when two parts share a bucket but do not superimpose
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlignmentPolicy {
    /// Fail the whole build
    #[default]
    Abort,
    /// Keep the candidate as a separate catalog item
    Distinct,
}

impl fmt::Display for AlignmentPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlignmentPolicy::Abort => write!(f, "abort"),
            AlignmentPolicy::Distinct => write!(f, "distinct"),
        }
    }
}

impl FromStr for AlignmentPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "abort" => Ok(AlignmentPolicy::Abort),
            "distinct" => Ok(AlignmentPolicy::Distinct),
            _ => Err(format!(
                "Invalid alignment policy: {}. Use 'abort' or 'distinct'",
                s
            )),
        }
    }
}

fn default_max_name_depth() -> usize {
    3
}

fn default_true() -> bool {
    true
}

/// Build options, persisted in `config.yaml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectOptions {
    /// Path segments used to disambiguate colliding part names
    #[serde(default = "default_max_name_depth")]
    pub max_name_depth: usize,

    /// Canonicalize orientation by principal axes of inertia
    #[serde(default = "default_true")]
    pub normalize_axis: bool,

    /// Honor reference/mirrored-instance markers from the CAD source
    #[serde(default = "default_true")]
    pub use_references: bool,

    /// Render SVG previews under `assets/`
    #[serde(default)]
    pub include_assets: bool,

    #[serde(default)]
    pub on_alignment_failure: AlignmentPolicy,
}

impl Default for ProjectOptions {
    fn default() -> Self {
        Self {
            max_name_depth: default_max_name_depth(),
            normalize_axis: true,
            use_references: true,
            include_assets: false,
            on_alignment_failure: AlignmentPolicy::default(),
        }
    }
}

/// A built or loaded assembly project
#[derive(Debug, Clone)]
pub struct Project<S> {
    /// Root is the first entry
    pub assemblies: PathMap<Assembly>,
    /// Every part occurrence, flattened
    pub part_refs: PathMap<PartRef>,
    pub inventory: Inventory<S>,
    pub options: ProjectOptions,
}

impl<S> Project<S> {
    pub fn new(options: ProjectOptions) -> Self {
        Self {
            assemblies: PathMap::new(),
            part_refs: PathMap::new(),
            inventory: Inventory::new(),
            options,
        }
    }

    pub fn root(&self) -> Option<&Assembly> {
        self.assemblies.first()
    }

    /// Display name of the part at `path`
    pub fn part_name(&self, path: &str) -> Option<&str> {
        let part = self.part_refs.get(path)?;
        self.inventory.name(&part.variation.checksum)
    }

    /// Every part reference with its placement in the root frame, depth-first
    /// from the root. Assemblies reachable twice are visited once.
    pub fn placed_parts(&self) -> Vec<(&PartRef, Location)> {
        let mut placed = Vec::with_capacity(self.part_refs.len());
        let mut visited = HashSet::new();
        if let Some(root) = self.root() {
            let world = root.location.clone().unwrap_or_default();
            self.collect_placed(root, &world, &mut visited, &mut placed);
        }
        placed
    }

    fn collect_placed<'a>(
        &'a self,
        assembly: &'a Assembly,
        world: &Location,
        visited: &mut HashSet<&'a str>,
        placed: &mut Vec<(&'a PartRef, Location)>,
    ) {
        if !visited.insert(assembly.path.as_str()) {
            return;
        }
        for part in &assembly.parts {
            let location = match &part.location {
                Some(local) => world.compose(local),
                None => world.clone(),
            };
            placed.push((part, location));
        }
        for child_path in &assembly.children {
            if let Some(child) = self.assemblies.get(child_path) {
                let child_world = match &child.location {
                    Some(local) => world.compose(local),
                    None => world.clone(),
                };
                self.collect_placed(child, &child_world, visited, placed);
            }
        }
    }

    /// Ancestor assembly paths of `path`, nearest first
    pub fn ancestors<'a>(&'a self, path: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        let mut current = path;
        std::iter::from_fn(move || {
            let cut = current.rfind('/')?;
            current = &current[..cut];
            if current.is_empty() {
                None
            } else {
                Some(current)
            }
        })
        .filter(move |p| self.assemblies.contains_key(p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_map_keeps_insertion_order() {
        let mut map = PathMap::new();
        map.insert("/R", 1);
        map.insert("/R/B", 2);
        map.insert("/R/A", 3);
        map.insert("/R/B", 4);

        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["/R", "/R/B", "/R/A"]);
        assert_eq!(map.get("/R/B"), Some(&4));
        assert_eq!(map.first(), Some(&1));
        assert_eq!(map.len(), 3);
    }

    #[test]
    fn test_options_defaults_fill_missing_fields() {
        let options: ProjectOptions = serde_yml::from_str("normalize_axis: false").unwrap();
        assert!(!options.normalize_axis);
        assert_eq!(options.max_name_depth, 3);
        assert!(options.use_references);
        assert!(!options.include_assets);
        assert_eq!(options.on_alignment_failure, AlignmentPolicy::Abort);
    }

    #[test]
    fn test_alignment_policy_parse() {
        assert_eq!("Distinct".parse::<AlignmentPolicy>().unwrap(), AlignmentPolicy::Distinct);
        assert!("skip".parse::<AlignmentPolicy>().is_err());
        assert_eq!(AlignmentPolicy::Abort.to_string(), "abort");
    }

    #[test]
    fn test_ancestors() {
        let mut project: Project<()> = Project::new(ProjectOptions::default());
        project.assemblies.insert("/R", Assembly::new("/R", None));
        project.assemblies.insert("/R/Arm", Assembly::new("/R/Arm", None));

        let ancestors: Vec<_> = project.ancestors("/R/Arm/Pin").collect();
        assert_eq!(ancestors, vec!["/R/Arm", "/R"]);
    }

    #[test]
    fn test_part_ref_omits_identity_location() {
        let part = PartRef {
            path: "/R/A".into(),
            variation: VariationKey {
                checksum: "abc".into(),
                id: 1,
            },
            location: None,
        };
        let json = serde_json::to_value(&part).unwrap();
        assert!(json.get("location").is_none());
        assert_eq!(json["variation"]["checksum"], "abc");
    }
}
