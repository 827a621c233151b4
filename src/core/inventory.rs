//! Content-addressed part inventory and its catalog
//!
//! Every distinct canonical solid is stored once, keyed by its checksum.
//! The catalog gives each checksum a display name and one variation per
//! distinct color it was seen with.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::core::checksum::Checksum;
use crate::core::geometry::Color;

/// User-maintained purchasing data for a variation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// One (geometry, color) combination of a catalog item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartVariation {
    /// 1-based, unique within the item
    pub id: u32,
    pub color: Option<Color>,
    pub metadata: Option<PartMetadata>,
    /// Part paths using this variation in the current build
    #[serde(default)]
    pub references: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub name: String,
    pub variations: Vec<PartVariation>,
}

impl CatalogItem {
    pub fn variation(&self, id: u32) -> Option<&PartVariation> {
        self.variations.iter().find(|v| v.id == id)
    }

    fn find_color(&self, color: Option<&Color>) -> Option<&PartVariation> {
        self.variations.iter().find(|v| v.color.as_ref() == color)
    }

    fn next_id(&self) -> u32 {
        self.variations.iter().map(|v| v.id).max().unwrap_or(0) + 1
    }
}

/// Identifies one variation of one catalog item
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VariationKey {
    pub checksum: Checksum,
    pub id: u32,
}

/// Canonical solids plus their catalog
#[derive(Debug, Clone)]
pub struct Inventory<S> {
    pub parts: BTreeMap<Checksum, S>,
    pub catalog: BTreeMap<Checksum, CatalogItem>,
}

impl<S> Default for Inventory<S> {
    fn default() -> Self {
        Self {
            parts: BTreeMap::new(),
            catalog: BTreeMap::new(),
        }
    }
}

impl<S> Inventory<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Find or create the variation for `(checksum, color)` and record `path` as a user.
    ///
    /// The first sighting of a checksum creates its catalog item named
    /// `default_name`. Metadata is carried over from the matching variation
    /// of `previous` when there is one.
    pub fn resolve(
        &mut self,
        checksum: &Checksum,
        color: Option<Color>,
        path: &str,
        default_name: &str,
        previous: Option<&Inventory<S>>,
    ) -> VariationKey {
        let item = self
            .catalog
            .entry(checksum.clone())
            .or_insert_with(|| CatalogItem {
                name: default_name.to_string(),
                variations: Vec::new(),
            });

        let existing = item.find_color(color.as_ref()).map(|v| v.id);
        let id = match existing {
            Some(id) => id,
            None => {
                let metadata = previous
                    .and_then(|prev| prev.catalog.get(checksum))
                    .and_then(|prev_item| prev_item.find_color(color.as_ref()))
                    .and_then(|prev_variation| prev_variation.metadata.clone());

                let id = item.next_id();
                item.variations.push(PartVariation {
                    id,
                    color,
                    metadata,
                    references: BTreeSet::new(),
                });
                id
            }
        };

        if let Some(variation) = item.variations.iter_mut().find(|v| v.id == id) {
            variation.references.insert(path.to_string());
        }

        VariationKey {
            checksum: checksum.clone(),
            id,
        }
    }

    /// Store a canonical solid. Returns false if the checksum was already present.
    pub fn insert_part(&mut self, checksum: &Checksum, solid: S) -> bool {
        if self.parts.contains_key(checksum) {
            return false;
        }
        self.parts.insert(checksum.clone(), solid);
        true
    }

    pub fn rename(&mut self, checksum: &Checksum, name: &str) {
        if let Some(item) = self.catalog.get_mut(checksum) {
            item.name = name.to_string();
        }
    }

    pub fn name(&self, checksum: &Checksum) -> Option<&str> {
        self.catalog.get(checksum).map(|item| item.name.as_str())
    }

    pub fn variation(&self, key: &VariationKey) -> Option<&PartVariation> {
        self.catalog.get(&key.checksum)?.variation(key.id)
    }

    /// Names of all catalog items that have a stored solid
    pub fn part_names(&self) -> BTreeSet<String> {
        self.parts
            .keys()
            .filter_map(|checksum| self.name(checksum))
            .map(str::to_string)
            .collect()
    }

    /// Drop catalog items whose solid is missing and solids without a catalog item
    pub fn prune(&mut self) {
        let parts = &self.parts;
        self.catalog.retain(|checksum, _| parts.contains_key(checksum));
        let catalog = &self.catalog;
        self.parts.retain(|checksum, _| catalog.contains_key(checksum));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn red() -> Option<Color> {
        Some(Color::rgba(1.0, 0.0, 0.0, 1.0))
    }

    fn blue() -> Option<Color> {
        Some(Color::rgba(0.0, 0.0, 1.0, 1.0))
    }

    #[test]
    fn test_first_sighting_creates_variation_one() {
        let mut inv: Inventory<()> = Inventory::new();
        let sum = Checksum::from("aa");
        let key = inv.resolve(&sum, red(), "/R/Bolt", "Bolt", None);
        assert_eq!(key.id, 1);
        assert_eq!(inv.name(&sum), Some("Bolt"));
    }

    #[test]
    fn test_same_color_resolves_to_same_id() {
        let mut inv: Inventory<()> = Inventory::new();
        let sum = Checksum::from("aa");
        let a = inv.resolve(&sum, red(), "/R/Bolt", "Bolt", None);
        let b = inv.resolve(&sum, red(), "/R/Bolt_2", "Bolt", None);
        assert_eq!(a, b);

        let refs = &inv.variation(&a).unwrap().references;
        assert_eq!(refs.len(), 2);
        assert!(refs.contains("/R/Bolt_2"));
    }

    #[test]
    fn test_new_color_gets_next_id() {
        let mut inv: Inventory<()> = Inventory::new();
        let sum = Checksum::from("aa");
        assert_eq!(inv.resolve(&sum, red(), "/R/A", "A", None).id, 1);
        assert_eq!(inv.resolve(&sum, blue(), "/R/B", "A", None).id, 2);
        assert_eq!(inv.resolve(&sum, None, "/R/C", "A", None).id, 3);
        // no color is its own variation, and resolving it again is stable
        assert_eq!(inv.resolve(&sum, None, "/R/D", "A", None).id, 3);
        // the catalog name is fixed at first sighting
        assert_eq!(inv.name(&sum), Some("A"));
    }

    #[test]
    fn test_metadata_carried_from_previous() {
        let sum = Checksum::from("aa");
        let mut prev: Inventory<()> = Inventory::new();
        prev.resolve(&sum, blue(), "/R/A", "A", None);
        prev.catalog.get_mut(&sum).unwrap().variations[0].metadata = Some(PartMetadata {
            price: Some(2.5),
            url: Some("https://example.com/a".into()),
        });

        let mut inv: Inventory<()> = Inventory::new();
        let red_key = inv.resolve(&sum, red(), "/R/A", "A", Some(&prev));
        let blue_key = inv.resolve(&sum, blue(), "/R/B", "A", Some(&prev));

        assert!(inv.variation(&red_key).unwrap().metadata.is_none());
        let carried = inv.variation(&blue_key).unwrap().metadata.as_ref().unwrap();
        assert_eq!(carried.price, Some(2.5));
        // references are per build, not carried
        assert_eq!(inv.variation(&blue_key).unwrap().references.len(), 1);
    }

    #[test]
    fn test_insert_part_and_prune() {
        let mut inv: Inventory<u8> = Inventory::new();
        let kept = Checksum::from("aa");
        let stale = Checksum::from("bb");
        inv.resolve(&kept, None, "/R/A", "A", None);
        inv.resolve(&stale, None, "/R/B", "B", None);
        assert!(inv.insert_part(&kept, 1));
        assert!(!inv.insert_part(&kept, 2));

        inv.prune();
        assert_eq!(inv.catalog.len(), 1);
        assert_eq!(inv.parts[&kept], 1);
        assert_eq!(inv.part_names().into_iter().collect::<Vec<_>>(), vec!["A"]);
    }

    #[test]
    fn test_catalog_json_shape() {
        let mut inv: Inventory<()> = Inventory::new();
        inv.resolve(&Checksum::from("aa"), red(), "/R/A", "A", None);
        let json = serde_json::to_value(&inv.catalog).unwrap();
        let variation = &json["aa"]["variations"][0];
        assert_eq!(json["aa"]["name"], "A");
        assert_eq!(variation["id"], 1);
        assert_eq!(variation["color"][0], 1.0);
        assert_eq!(variation["references"][0], "/R/A");
    }
}
