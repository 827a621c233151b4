//! Assembly documents read by [`MeshKernel`](super::MeshKernel)
//!
//! A document is YAML or JSON:
//!
//! ```yaml
//! name: Gripper
//! shapes:
//!   plate: { cuboid: [4.0, 2.0, 1.0] }
//!   pin: { file: parts/pin.brep }
//! children:
//!   - name: Base
//!     shape: plate
//!     color: [0.8, 0.8, 0.8, 1.0]
//!   - name: Finger
//!     location: { translation: [0, 0, 5], rotation: [0, 0, 90] }
//!     children:
//!       - { name: Pin, shape: pin, reference: true }
//! ```
//!
//! Nodes with a `shape` are parts; nodes without one are subassemblies.
//! Rotations are extrinsic XYZ Euler angles in degrees.

use nalgebra::Vector3;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::{AssemblyNode, Color, GeometryError, LeafPart, Mesh};
use crate::core::location::Location;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DocumentDef {
    name: String,
    #[serde(default)]
    location: Option<LocationDef>,
    #[serde(default)]
    shapes: HashMap<String, ShapeDef>,
    #[serde(default)]
    children: Vec<NodeDef>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ShapeDef {
    #[serde(default)]
    vertices: Option<Vec<[f64; 3]>>,
    #[serde(default)]
    faces: Option<Vec<[u32; 3]>>,
    #[serde(default)]
    file: Option<PathBuf>,
    /// Box of the given size with one corner at the origin
    #[serde(default)]
    cuboid: Option<[f64; 3]>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct NodeDef {
    name: String,
    #[serde(default)]
    location: Option<LocationDef>,
    #[serde(default)]
    color: Option<Vec<f64>>,
    #[serde(default)]
    shape: Option<String>,
    #[serde(default)]
    reference: bool,
    #[serde(default)]
    children: Vec<NodeDef>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct LocationDef {
    #[serde(default)]
    translation: [f64; 3],
    #[serde(default)]
    rotation: [f64; 3],
}

impl LocationDef {
    fn to_location(&self) -> Location {
        Location::from_euler_degrees(self.translation, self.rotation)
    }
}

/// Replace characters that are awkward in file names and assembly paths
pub fn sanitize_name(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| match c {
            ' ' | '.' | '(' | ')' | '/' | '\\' => '_',
            other => other,
        })
        .collect();

    if cleaned.is_empty() {
        "unnamed".to_string()
    } else {
        cleaned
    }
}

/// Load an assembly document from disk
pub fn load_document(path: &Path) -> Result<AssemblyNode<Mesh>, GeometryError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    let format = match extension.as_str() {
        "yaml" | "yml" => DocumentFormat::Yaml,
        "json" => DocumentFormat::Json,
        _ => return Err(GeometryError::UnsupportedFormat(path.display().to_string())),
    };

    let content = std::fs::read_to_string(path).map_err(|e| GeometryError::Import {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    parse_document(&content, format, base_dir, path)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Yaml,
    Json,
}

/// Parse document text. `file:` shapes resolve relative to `base_dir`.
pub fn parse_document(
    content: &str,
    format: DocumentFormat,
    base_dir: &Path,
    source: &Path,
) -> Result<AssemblyNode<Mesh>, GeometryError> {
    let import_error = |message: String| GeometryError::Import {
        path: source.to_path_buf(),
        message,
    };

    let doc: DocumentDef = match format {
        DocumentFormat::Yaml => serde_yml::from_str(content).map_err(|e| import_error(e.to_string()))?,
        DocumentFormat::Json => {
            serde_json::from_str(content).map_err(|e| import_error(e.to_string()))?
        }
    };

    let mut shapes = HashMap::with_capacity(doc.shapes.len());
    for (name, def) in &doc.shapes {
        let mesh = load_shape(def, base_dir).map_err(|e| import_error(format!("shape '{}': {}", name, e)))?;
        shapes.insert(name.clone(), mesh);
    }

    let children = doc
        .children
        .iter()
        .map(|child| build_node(child, &shapes))
        .collect::<Result<Vec<_>, String>>()
        .map_err(import_error)?;

    Ok(AssemblyNode::Assembly {
        name: sanitize_name(&doc.name),
        location: doc.location.as_ref().map(LocationDef::to_location),
        children,
    })
}

fn load_shape(def: &ShapeDef, base_dir: &Path) -> Result<Mesh, String> {
    let sources = [def.vertices.is_some(), def.file.is_some(), def.cuboid.is_some()]
        .iter()
        .filter(|present| **present)
        .count();
    if sources != 1 {
        return Err("exactly one of 'vertices', 'file' or 'cuboid' is required".to_string());
    }

    if let Some(size) = def.cuboid {
        if size.iter().any(|s| *s <= 0.0) {
            return Err("cuboid dimensions must be positive".to_string());
        }
        return Ok(Mesh::cuboid([0.0; 3], size));
    }

    if let Some(file) = &def.file {
        let full = base_dir.join(file);
        let content = std::fs::read_to_string(&full)
            .map_err(|e| format!("cannot read {}: {}", full.display(), e))?;
        return Mesh::from_brep_str(&content).map_err(|e| e.to_string());
    }

    let vertices = def
        .vertices
        .as_ref()
        .map(|vs| vs.iter().map(|v| Vector3::from(*v)).collect())
        .unwrap_or_default();
    let mesh = Mesh::new(vertices, def.faces.clone().unwrap_or_default());
    mesh.validate().map_err(|e| e.to_string())?;
    Ok(mesh)
}

fn parse_color(raw: &[f64]) -> Result<Color, String> {
    match raw {
        [r, g, b] => Ok(Color::rgba(*r, *g, *b, 1.0)),
        [r, g, b, a] => Ok(Color::rgba(*r, *g, *b, *a)),
        _ => Err(format!("color needs 3 or 4 components, found {}", raw.len())),
    }
}

fn build_node(def: &NodeDef, shapes: &HashMap<String, Mesh>) -> Result<AssemblyNode<Mesh>, String> {
    let name = sanitize_name(&def.name);
    let location = def.location.as_ref().map(LocationDef::to_location);

    let Some(shape_name) = &def.shape else {
        let children = def
            .children
            .iter()
            .map(|child| build_node(child, shapes))
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(AssemblyNode::Assembly {
            name,
            location,
            children,
        });
    };

    if !def.children.is_empty() {
        return Err(format!("part '{}' cannot have children", def.name));
    }

    let solid = shapes
        .get(shape_name)
        .cloned()
        .ok_or_else(|| format!("part '{}' uses unknown shape '{}'", def.name, shape_name))?;
    let color = def.color.as_deref().map(parse_color).transpose()?;
    let transform = location.unwrap_or_default();

    let leaf = if def.reference {
        LeafPart::Reference { transform, solid }
    } else {
        LeafPart::Instance { transform, solid }
    };

    Ok(AssemblyNode::Part { name, color, leaf })
}

#[cfg(test)]
mod tests {
    use super::*;

    const GRIPPER: &str = r#"
name: Gripper (v2)
shapes:
  plate: { cuboid: [4.0, 2.0, 1.0] }
children:
  - name: Base plate
    shape: plate
    color: [1.0, 0.0, 0.0]
  - name: Arm
    location: { translation: [0, 0, 5], rotation: [0, 0, 90] }
    children:
      - { name: Mirror, shape: plate, reference: true }
"#;

    fn parse(content: &str) -> Result<AssemblyNode<Mesh>, GeometryError> {
        parse_document(content, DocumentFormat::Yaml, Path::new("."), Path::new("test.yaml"))
    }

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("Gripper (v2).step"), "Gripper__v2__step");
        assert_eq!(sanitize_name("a/b"), "a_b");
        assert_eq!(sanitize_name("\u{7}"), "unnamed");
    }

    #[test]
    fn test_parse_tree() {
        let root = parse(GRIPPER).unwrap();
        assert_eq!(root.name(), "Gripper__v2_");
        assert_eq!(root.part_count(), 2);

        let AssemblyNode::Assembly { children, .. } = root else {
            panic!("root must be an assembly");
        };
        match &children[0] {
            AssemblyNode::Part { name, color, leaf } => {
                assert_eq!(name, "Base_plate");
                assert_eq!(*color, Some(Color::rgba(1.0, 0.0, 0.0, 1.0)));
                assert!(!leaf.is_reference());
                assert_eq!(leaf.solid().vertex_count(), 8);
            }
            other => panic!("unexpected node {:?}", other.name()),
        }
        match &children[1] {
            AssemblyNode::Assembly {
                location, children, ..
            } => {
                assert!(location.is_some());
                assert!(matches!(
                    &children[0],
                    AssemblyNode::Part { leaf: LeafPart::Reference { .. }, .. }
                ));
            }
            other => panic!("unexpected node {:?}", other.name()),
        }
    }

    #[test]
    fn test_unknown_shape_is_import_error() {
        let err = parse("name: X\nchildren:\n  - { name: A, shape: nope }\n").unwrap_err();
        assert!(matches!(err, GeometryError::Import { .. }));
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn test_shape_needs_single_source() {
        let doc = "name: X\nshapes:\n  s: { cuboid: [1, 1, 1], file: a.brep }\n";
        assert!(parse(doc).is_err());
    }

    #[test]
    fn test_unsupported_extension() {
        let err = load_document(Path::new("model.step")).unwrap_err();
        assert!(matches!(err, GeometryError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_json_document() {
        let json = r#"{"name": "J", "shapes": {"s": {"cuboid": [1, 2, 3]}},
                       "children": [{"name": "P", "shape": "s"}]}"#;
        let root = parse_document(json, DocumentFormat::Json, Path::new("."), Path::new("j.json")).unwrap();
        assert_eq!(root.part_count(), 1);
    }
}
