//! Geometry adapter - the seam between the assembly engine and a CAD kernel
//!
//! The engine never looks inside a solid. Everything it needs (vertices,
//! surface area, centroid, principal axes, rigid transforms, serialization)
//! goes through [`GeometryKernel`]. [`MeshKernel`] is the built-in
//! implementation over closed triangle meshes.

pub mod document;
pub mod mesh;

use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::location::Location;

pub use mesh::{Mesh, MeshKernel};

/// RGBA color with components in `0..=1`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Color(pub [f64; 4]);

impl Color {
    pub fn rgba(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self([r, g, b, a])
    }

    /// CSS `rgb(...)` string for rendered assets
    pub fn to_css(&self) -> String {
        let channel = |v: f64| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        format!(
            "rgb({},{},{})",
            channel(self.0[0]),
            channel(self.0[1]),
            channel(self.0[2])
        )
    }
}

/// Principal axes of inertia of a solid about its centroid
#[derive(Debug, Clone)]
pub struct PrincipalAxes {
    /// Unit axes, ordered by ascending principal moment
    pub axes: [Vector3<f64>; 3],
    /// Principal moments matching `axes`
    pub moments: [f64; 3],
    /// Two (or three) moments coincide, so the axes are not unique
    pub has_symmetry_axis: bool,
}

/// A leaf of the imported assembly tree.
///
/// Whether a leaf is a CAD-native reference (a mirrored or shared instance
/// of another part) is decided once, at import.
#[derive(Debug, Clone)]
pub enum LeafPart<S> {
    /// Shared/mirrored instance: `solid` is the prototype in its own frame
    Reference { transform: Location, solid: S },
    /// Ordinary part: `solid` is placed by `transform` inside its parent
    Instance { transform: Location, solid: S },
}

impl<S> LeafPart<S> {
    pub fn transform(&self) -> &Location {
        match self {
            LeafPart::Reference { transform, .. } | LeafPart::Instance { transform, .. } => {
                transform
            }
        }
    }

    pub fn solid(&self) -> &S {
        match self {
            LeafPart::Reference { solid, .. } | LeafPart::Instance { solid, .. } => solid,
        }
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, LeafPart::Reference { .. })
    }
}

/// Hierarchical assembly as delivered by the kernel's importer
#[derive(Debug, Clone)]
pub enum AssemblyNode<S> {
    Assembly {
        name: String,
        location: Option<Location>,
        children: Vec<AssemblyNode<S>>,
    },
    Part {
        name: String,
        color: Option<Color>,
        leaf: LeafPart<S>,
    },
}

impl<S> AssemblyNode<S> {
    pub fn name(&self) -> &str {
        match self {
            AssemblyNode::Assembly { name, .. } | AssemblyNode::Part { name, .. } => name,
        }
    }

    /// Number of leaf parts below (and including) this node
    pub fn part_count(&self) -> usize {
        match self {
            AssemblyNode::Assembly { children, .. } => {
                children.iter().map(AssemblyNode::part_count).sum()
            }
            AssemblyNode::Part { .. } => 1,
        }
    }
}

/// Errors raised by a geometry kernel
#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("Failed to import CAD file {path}: {message}")]
    Import { path: PathBuf, message: String },

    #[error("Unsupported CAD file format: {0}")]
    UnsupportedFormat(String),

    #[error("Malformed solid data at line {line}: {message}")]
    MalformedBrep { line: usize, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Operations the assembly engine needs from a CAD kernel
pub trait GeometryKernel {
    /// Opaque solid handle
    type Solid: Clone;

    /// Import a hierarchical assembly from a CAD file
    fn import(&self, path: &Path) -> Result<AssemblyNode<Self::Solid>, GeometryError>;

    /// Serialize a solid to a boundary-representation blob
    fn export_brep(&self, solid: &Self::Solid) -> Vec<u8>;

    /// Restore a solid from a blob produced by [`GeometryKernel::export_brep`]
    fn import_brep(&self, bytes: &[u8]) -> Result<Self::Solid, GeometryError>;

    /// World-space vertices in the kernel's enumeration order
    fn vertices(&self, solid: &Self::Solid) -> Vec<Vector3<f64>>;

    fn surface_area(&self, solid: &Self::Solid) -> f64;

    fn centroid(&self, solid: &Self::Solid) -> Vector3<f64>;

    fn principal_axes(&self, solid: &Self::Solid) -> PrincipalAxes;

    /// Apply `p -> rotation · p + translation` to every point of the solid
    fn transform(
        &self,
        solid: &Self::Solid,
        rotation: &Matrix3<f64>,
        translation: &Vector3<f64>,
    ) -> Self::Solid;

    /// Edges worth drawing when rendering the solid
    fn wireframe(&self, solid: &Self::Solid) -> Vec<[Vector3<f64>; 2]>;

    /// Place a solid with a [`Location`]
    fn place(&self, solid: &Self::Solid, location: &Location) -> Self::Solid {
        self.transform(solid, &location.rotation(), &location.translation())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_css() {
        assert_eq!(Color::rgba(1.0, 0.0, 0.5, 1.0).to_css(), "rgb(255,0,128)");
        assert_eq!(Color::rgba(2.0, -1.0, 0.0, 1.0).to_css(), "rgb(255,0,0)");
    }

    #[test]
    fn test_part_count() {
        let leaf = |name: &str| AssemblyNode::Part {
            name: name.to_string(),
            color: None,
            leaf: LeafPart::Instance {
                transform: Location::identity(),
                solid: (),
            },
        };
        let tree = AssemblyNode::Assembly {
            name: "Root".to_string(),
            location: None,
            children: vec![
                leaf("A"),
                AssemblyNode::Assembly {
                    name: "Sub".to_string(),
                    location: None,
                    children: vec![leaf("B"), leaf("C")],
                },
            ],
        };
        assert_eq!(tree.part_count(), 3);
        assert_eq!(tree.name(), "Root");
    }
}
