//! Stable display names for catalog items
//!
//! A part is named after the last segment of its path. When two different
//! geometries want the same name, both are renamed to a slug of their
//! trailing path segments (`Arm-Widget`, `Base-Widget`). The plain name stays
//! blocked so later claimants are disambiguated too.

use std::collections::HashMap;
use thiserror::Error;

use crate::core::checksum::Checksum;

/// Highest numeric suffix tried when a slug is taken
const MAX_SUFFIX: usize = 999;

#[derive(Debug, Error)]
pub enum NamingError {
    #[error("Cannot find a unique name for part '{path}' (slug '{slug}' and all numeric suffixes are taken)")]
    Exhausted { path: String, slug: String },
}

/// A catalog item that had to change its name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Renamed {
    pub checksum: Checksum,
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone)]
struct Claim {
    checksum: Checksum,
    path: String,
}

/// Tracks which name belongs to which geometry during one build
#[derive(Debug)]
pub struct NameRegistry {
    max_depth: usize,
    claims: HashMap<String, Claim>,
    names: HashMap<Checksum, String>,
}

/// Last path segment
pub fn default_name(path: &str) -> &str {
    path.rsplit('/').find(|s| !s.is_empty()).unwrap_or(path)
}

/// Last `depth` path segments joined with `-`
pub fn path_slug(path: &str, depth: usize) -> String {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let start = segments.len().saturating_sub(depth.max(1));
    segments[start..].join("-")
}

impl NameRegistry {
    pub fn new(max_depth: usize) -> Self {
        Self {
            max_depth,
            claims: HashMap::new(),
            names: HashMap::new(),
        }
    }

    pub fn name_of(&self, checksum: &Checksum) -> Option<&str> {
        self.names.get(checksum).map(String::as_str)
    }

    /// Claim a name for `checksum` first seen at `path`.
    ///
    /// Returns every rename this claim caused, including the claimant's own.
    /// A checksum that already has a name keeps it.
    pub fn claim(&mut self, checksum: &Checksum, path: &str) -> Result<Vec<Renamed>, NamingError> {
        if self.names.contains_key(checksum) {
            return Ok(Vec::new());
        }

        let name = default_name(path).to_string();
        let holder = match self.claims.get(&name) {
            None => {
                self.hold(&name, checksum, path);
                return Ok(Vec::new());
            }
            Some(claim) => claim.clone(),
        };

        let mut renames = Vec::new();

        if self.name_of(&holder.checksum) == Some(name.as_str()) {
            let slug = self.unique_slug(&holder.path)?;
            self.hold(&slug, &holder.checksum, &holder.path);
            renames.push(Renamed {
                checksum: holder.checksum.clone(),
                from: name.clone(),
                to: slug,
            });
        }

        let slug = self.unique_slug(path)?;
        self.hold(&slug, checksum, path);
        renames.push(Renamed {
            checksum: checksum.clone(),
            from: name,
            to: slug,
        });

        Ok(renames)
    }

    fn hold(&mut self, name: &str, checksum: &Checksum, path: &str) {
        self.claims.entry(name.to_string()).or_insert_with(|| Claim {
            checksum: checksum.clone(),
            path: path.to_string(),
        });
        self.names.insert(checksum.clone(), name.to_string());
    }

    fn is_free(&self, name: &str) -> bool {
        !self.claims.contains_key(name)
    }

    fn unique_slug(&self, path: &str) -> Result<String, NamingError> {
        let slug = path_slug(path, self.max_depth);
        if self.is_free(&slug) {
            return Ok(slug);
        }

        (2..=MAX_SUFFIX)
            .map(|n| format!("{}-{}", slug, n))
            .find(|candidate| self.is_free(candidate))
            .ok_or_else(|| NamingError::Exhausted {
                path: path.to_string(),
                slug,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sum(s: &str) -> Checksum {
        Checksum::from(s)
    }

    #[test]
    fn test_path_helpers() {
        assert_eq!(default_name("/Robot/Arm/Widget"), "Widget");
        assert_eq!(path_slug("/Robot/Arm/Widget", 2), "Arm-Widget");
        assert_eq!(path_slug("/Robot/Arm/Widget", 3), "Robot-Arm-Widget");
        assert_eq!(path_slug("/Robot/Arm/Widget", 10), "Robot-Arm-Widget");
    }

    #[test]
    fn test_first_claim_keeps_plain_name() {
        let mut names = NameRegistry::new(3);
        assert!(names.claim(&sum("a"), "/R/A/Widget").unwrap().is_empty());
        assert_eq!(names.name_of(&sum("a")), Some("Widget"));
    }

    #[test]
    fn test_same_geometry_is_not_a_collision() {
        let mut names = NameRegistry::new(3);
        names.claim(&sum("a"), "/R/A/Widget").unwrap();
        assert!(names.claim(&sum("a"), "/R/B/Widget").unwrap().is_empty());
        assert_eq!(names.name_of(&sum("a")), Some("Widget"));
    }

    #[test]
    fn test_collision_renames_both() {
        let mut names = NameRegistry::new(2);
        names.claim(&sum("a"), "/R/A/Widget").unwrap();
        let renames = names.claim(&sum("b"), "/R/B/Widget").unwrap();

        assert_eq!(renames.len(), 2);
        assert_eq!(names.name_of(&sum("a")), Some("A-Widget"));
        assert_eq!(names.name_of(&sum("b")), Some("B-Widget"));
    }

    #[test]
    fn test_third_claimant_is_disambiguated() {
        let mut names = NameRegistry::new(2);
        names.claim(&sum("a"), "/R/A/Widget").unwrap();
        names.claim(&sum("b"), "/R/B/Widget").unwrap();
        let renames = names.claim(&sum("c"), "/R/C/Widget").unwrap();

        assert_eq!(renames.len(), 1);
        assert_eq!(names.name_of(&sum("c")), Some("C-Widget"));
        assert_eq!(names.name_of(&sum("a")), Some("A-Widget"));
    }

    #[test]
    fn test_slug_collision_falls_back_to_suffix() {
        let mut names = NameRegistry::new(1);
        names.claim(&sum("a"), "/R/A/Widget").unwrap();
        names.claim(&sum("b"), "/R/B/Widget").unwrap();

        assert_eq!(names.name_of(&sum("a")), Some("Widget-2"));
        assert_eq!(names.name_of(&sum("b")), Some("Widget-3"));
    }

    #[test]
    fn test_exhausted_suffixes_are_an_error() {
        let mut names = NameRegistry::new(1);
        names.claim(&sum("bolt"), "/R/Bolt").unwrap();
        for n in 2..=MAX_SUFFIX {
            let path = format!("/R/Bolt-{}", n);
            assert!(names.claim(&sum(&path), &path).unwrap().is_empty());
        }

        let err = names.claim(&sum("other"), "/S/Bolt").unwrap_err();
        match err {
            NamingError::Exhausted { slug, .. } => assert_eq!(slug, "Bolt"),
        }
        assert_eq!(names.name_of(&sum("other")), None);
    }
}
