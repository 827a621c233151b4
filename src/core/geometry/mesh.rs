//! Triangle-mesh geometry kernel
//!
//! Solids are closed, outward-wound triangle meshes. Mass properties use
//! signed tetrahedron decomposition against the origin, so they are exact
//! for watertight meshes of uniform density.

use nalgebra::{Matrix3, SymmetricEigen, Vector3};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::Path;

use super::{document, AssemblyNode, GeometryError, GeometryKernel, PrincipalAxes};

/// Header line of the serialized mesh format
const BREP_HEADER: &str = "orion-mesh 1";

/// Relative tolerance for treating two principal moments as equal
const SYMMETRY_TOLERANCE: f64 = 1e-6;

/// Meshes with less volume than this are treated as degenerate
const DEGENERATE_VOLUME: f64 = 1e-12;

/// An indexed triangle mesh.
///
/// Faces use counter-clockwise winding viewed from outside.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    pub vertices: Vec<Vector3<f64>>,
    pub faces: Vec<[u32; 3]>,
}

/// Volume, centroid and inertia tensor (about the centroid, unit density)
#[derive(Debug, Clone)]
pub struct MassProperties {
    pub volume: f64,
    pub centroid: Vector3<f64>,
    pub inertia: Matrix3<f64>,
}

impl Mesh {
    pub fn new(vertices: Vec<Vector3<f64>>, faces: Vec<[u32; 3]>) -> Self {
        Self { vertices, faces }
    }

    /// Axis-aligned box spanning `min..max`
    pub fn cuboid(min: [f64; 3], max: [f64; 3]) -> Self {
        let [x0, y0, z0] = min;
        let [x1, y1, z1] = max;
        let vertices = vec![
            Vector3::new(x0, y0, z0),
            Vector3::new(x1, y0, z0),
            Vector3::new(x1, y1, z0),
            Vector3::new(x0, y1, z0),
            Vector3::new(x0, y0, z1),
            Vector3::new(x1, y0, z1),
            Vector3::new(x1, y1, z1),
            Vector3::new(x0, y1, z1),
        ];
        let faces = vec![
            [0, 2, 1],
            [0, 3, 2],
            [4, 5, 6],
            [4, 6, 7],
            [0, 1, 5],
            [0, 5, 4],
            [2, 3, 7],
            [2, 7, 6],
            [0, 4, 7],
            [0, 7, 3],
            [1, 2, 6],
            [1, 6, 5],
        ];
        Self { vertices, faces }
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    fn triangle(&self, face: &[u32; 3]) -> [Vector3<f64>; 3] {
        [
            self.vertices[face[0] as usize],
            self.vertices[face[1] as usize],
            self.vertices[face[2] as usize],
        ]
    }

    pub fn surface_area(&self) -> f64 {
        self.faces
            .iter()
            .map(|face| {
                let [a, b, c] = self.triangle(face);
                (b - a).cross(&(c - a)).norm() / 2.0
            })
            .sum()
    }

    fn vertex_mean(&self) -> Vector3<f64> {
        if self.vertices.is_empty() {
            return Vector3::zeros();
        }
        let sum: Vector3<f64> = self.vertices.iter().sum();
        sum / self.vertices.len() as f64
    }

    /// Exact mass properties by signed tetrahedron decomposition (Mirtich 1996).
    ///
    /// Degenerate (flat or open) meshes fall back to treating every vertex as
    /// a unit point mass.
    #[allow(clippy::suspicious_operation_groupings)]
    pub fn mass_properties(&self) -> MassProperties {
        let mut total_volume = 0.0;
        let mut com_accum = Vector3::zeros();

        let (mut xx, mut yy, mut zz) = (0.0, 0.0, 0.0);
        let (mut xy, mut xz, mut yz) = (0.0, 0.0, 0.0);

        for face in &self.faces {
            let [a, b, c] = self.triangle(face);

            let det = a.cross(&b).dot(&c);
            let vol = det / 6.0;
            total_volume += vol;
            com_accum += vol * (a + b + c) / 4.0;

            let f60 = det / 60.0;
            let f120 = det / 120.0;

            xx += f60 * (a.x * a.x + b.x * b.x + c.x * c.x + a.x * b.x + a.x * c.x + b.x * c.x);
            yy += f60 * (a.y * a.y + b.y * b.y + c.y * c.y + a.y * b.y + a.y * c.y + b.y * c.y);
            zz += f60 * (a.z * a.z + b.z * b.z + c.z * c.z + a.z * b.z + a.z * c.z + b.z * c.z);

            xy += f120
                * (2.0 * a.x * a.y + 2.0 * b.x * b.y + 2.0 * c.x * c.y
                    + a.x * b.y + a.y * b.x + a.x * c.y + a.y * c.x + b.x * c.y + b.y * c.x);
            xz += f120
                * (2.0 * a.x * a.z + 2.0 * b.x * b.z + 2.0 * c.x * c.z
                    + a.x * b.z + a.z * b.x + a.x * c.z + a.z * c.x + b.x * c.z + b.z * c.x);
            yz += f120
                * (2.0 * a.y * a.z + 2.0 * b.y * b.z + 2.0 * c.y * c.z
                    + a.y * b.z + a.z * b.y + a.y * c.z + a.z * c.y + b.y * c.z + b.z * c.y);
        }

        if total_volume.abs() < DEGENERATE_VOLUME {
            return self.point_mass_properties();
        }

        let com = com_accum / total_volume;

        #[rustfmt::skip]
        let i_origin = Matrix3::new(
            yy + zz, -xy,     -xz,
            -xy,     xx + zz, -yz,
            -xz,     -yz,     xx + yy,
        );

        // parallel axis theorem: I_com = I_origin - V * (|d|^2 I - d d^T)
        let parallel_shift =
            total_volume * (Matrix3::identity() * com.dot(&com) - com * com.transpose());

        MassProperties {
            volume: total_volume,
            centroid: com,
            inertia: i_origin - parallel_shift,
        }
    }

    fn point_mass_properties(&self) -> MassProperties {
        let centroid = self.vertex_mean();
        let mut inertia = Matrix3::zeros();
        for v in &self.vertices {
            let r = v - centroid;
            inertia += Matrix3::identity() * r.dot(&r) - r * r.transpose();
        }
        MassProperties {
            volume: 0.0,
            centroid,
            inertia,
        }
    }

    /// Edges that separate non-coplanar faces, plus open boundary edges
    pub fn feature_edges(&self) -> Vec<[Vector3<f64>; 2]> {
        let mut adjacency: HashMap<(u32, u32), Vec<Vector3<f64>>> = HashMap::new();
        let mut order = Vec::new();

        for face in &self.faces {
            let [a, b, c] = self.triangle(face);
            let normal = (b - a).cross(&(c - a));
            let normal = if normal.norm() > 0.0 {
                normal.normalize()
            } else {
                normal
            };

            for (i, j) in [(0, 1), (1, 2), (2, 0)] {
                let key = (face[i].min(face[j]), face[i].max(face[j]));
                let entry = adjacency.entry(key).or_insert_with(|| {
                    order.push(key);
                    Vec::new()
                });
                entry.push(normal);
            }
        }

        order
            .into_iter()
            .filter(|key| {
                let normals = &adjacency[key];
                normals.len() != 2 || normals[0].dot(&normals[1]) < 1.0 - 1e-6
            })
            .map(|(i, j)| [self.vertices[i as usize], self.vertices[j as usize]])
            .collect()
    }

    /// Serialize to the line-oriented blob format
    pub fn to_brep_string(&self) -> String {
        let mut out = String::with_capacity(32 * (self.vertices.len() + self.faces.len()));
        out.push_str(BREP_HEADER);
        out.push('\n');
        for v in &self.vertices {
            let _ = writeln!(out, "v {} {} {}", v.x, v.y, v.z);
        }
        for f in &self.faces {
            let _ = writeln!(out, "f {} {} {}", f[0], f[1], f[2]);
        }
        out
    }

    /// Parse the line-oriented blob format
    pub fn from_brep_str(content: &str) -> Result<Self, GeometryError> {
        let mut lines = content.lines().enumerate();

        match lines.next() {
            Some((_, header)) if header.trim() == BREP_HEADER => {}
            _ => {
                return Err(GeometryError::MalformedBrep {
                    line: 1,
                    message: format!("expected header '{}'", BREP_HEADER),
                })
            }
        }

        let mut mesh = Mesh::default();
        for (index, line) in lines {
            let line_no = index + 1;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let mut fields = line.split_whitespace();
            let kind = fields.next().unwrap_or_default();
            let values: Vec<&str> = fields.collect();
            if values.len() != 3 {
                return Err(GeometryError::MalformedBrep {
                    line: line_no,
                    message: format!("expected 3 values, found {}", values.len()),
                });
            }

            match kind {
                "v" => {
                    let mut coords = [0.0; 3];
                    for (slot, raw) in coords.iter_mut().zip(&values) {
                        *slot = raw.parse().map_err(|_| GeometryError::MalformedBrep {
                            line: line_no,
                            message: format!("invalid coordinate '{}'", raw),
                        })?;
                    }
                    mesh.vertices.push(Vector3::from(coords));
                }
                "f" => {
                    let mut face = [0u32; 3];
                    for (slot, raw) in face.iter_mut().zip(&values) {
                        *slot = raw.parse().map_err(|_| GeometryError::MalformedBrep {
                            line: line_no,
                            message: format!("invalid vertex index '{}'", raw),
                        })?;
                    }
                    mesh.faces.push(face);
                }
                other => {
                    return Err(GeometryError::MalformedBrep {
                        line: line_no,
                        message: format!("unknown record '{}'", other),
                    })
                }
            }
        }

        mesh.validate()?;
        Ok(mesh)
    }

    /// Check that every face references an existing vertex
    pub fn validate(&self) -> Result<(), GeometryError> {
        let count = self.vertices.len() as u32;
        for (i, face) in self.faces.iter().enumerate() {
            if face.iter().any(|&idx| idx >= count) {
                return Err(GeometryError::MalformedBrep {
                    line: 0,
                    message: format!("face {} references a vertex out of range", i),
                });
            }
        }
        Ok(())
    }
}

/// Geometry kernel over [`Mesh`] solids
#[derive(Debug, Clone, Copy, Default)]
pub struct MeshKernel;

impl MeshKernel {
    pub fn new() -> Self {
        Self
    }
}

impl GeometryKernel for MeshKernel {
    type Solid = Mesh;

    fn import(&self, path: &Path) -> Result<AssemblyNode<Mesh>, GeometryError> {
        document::load_document(path)
    }

    fn export_brep(&self, solid: &Mesh) -> Vec<u8> {
        solid.to_brep_string().into_bytes()
    }

    fn import_brep(&self, bytes: &[u8]) -> Result<Mesh, GeometryError> {
        let content = std::str::from_utf8(bytes).map_err(|e| GeometryError::MalformedBrep {
            line: 0,
            message: e.to_string(),
        })?;
        Mesh::from_brep_str(content)
    }

    fn vertices(&self, solid: &Mesh) -> Vec<Vector3<f64>> {
        solid.vertices.clone()
    }

    fn surface_area(&self, solid: &Mesh) -> f64 {
        solid.surface_area()
    }

    fn centroid(&self, solid: &Mesh) -> Vector3<f64> {
        solid.mass_properties().centroid
    }

    fn principal_axes(&self, solid: &Mesh) -> PrincipalAxes {
        let inertia = solid.mass_properties().inertia;
        let eigen = SymmetricEigen::new(inertia);

        let mut indices = [0usize, 1, 2];
        indices.sort_by(|&a, &b| {
            eigen.eigenvalues[a]
                .partial_cmp(&eigen.eigenvalues[b])
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let axes = indices.map(|i| eigen.eigenvectors.column(i).into_owned());
        let moments = indices.map(|i| eigen.eigenvalues[i]);

        let scale = moments.iter().fold(0.0_f64, |acc, m| acc.max(m.abs()));
        let tolerance = SYMMETRY_TOLERANCE * scale.max(f64::MIN_POSITIVE);
        let has_symmetry_axis = (moments[1] - moments[0]).abs() <= tolerance
            || (moments[2] - moments[1]).abs() <= tolerance;

        PrincipalAxes {
            axes,
            moments,
            has_symmetry_axis,
        }
    }

    fn transform(
        &self,
        solid: &Mesh,
        rotation: &Matrix3<f64>,
        translation: &Vector3<f64>,
    ) -> Mesh {
        Mesh {
            vertices: solid
                .vertices
                .iter()
                .map(|v| rotation * v + translation)
                .collect(),
            faces: solid.faces.clone(),
        }
    }

    fn wireframe(&self, solid: &Mesh) -> Vec<[Vector3<f64>; 2]> {
        solid.feature_edges()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_cube() -> Mesh {
        Mesh::cuboid([0.0, 0.0, 0.0], [1.0, 1.0, 1.0])
    }

    #[test]
    fn test_cuboid_volume_and_area() {
        let mesh = Mesh::cuboid([0.0, 0.0, 0.0], [4.0, 2.0, 1.0]);
        let props = mesh.mass_properties();
        assert_relative_eq!(props.volume, 8.0, epsilon = 1e-9);
        assert_relative_eq!(mesh.surface_area(), 28.0, epsilon = 1e-9);
        assert_relative_eq!(props.centroid, Vector3::new(2.0, 1.0, 0.5), epsilon = 1e-9);
    }

    #[test]
    fn test_cuboid_inertia_matches_closed_form() {
        // I_xx = m/12 (b^2 + c^2) with m = volume for unit density
        let mesh = Mesh::cuboid([-2.0, -1.0, -0.5], [2.0, 1.0, 0.5]);
        let inertia = mesh.mass_properties().inertia;
        let m = 8.0;
        assert_relative_eq!(inertia[(0, 0)], m / 12.0 * (4.0 + 1.0), epsilon = 1e-9);
        assert_relative_eq!(inertia[(1, 1)], m / 12.0 * (16.0 + 1.0), epsilon = 1e-9);
        assert_relative_eq!(inertia[(2, 2)], m / 12.0 * (16.0 + 4.0), epsilon = 1e-9);
        assert_relative_eq!(inertia[(0, 1)], 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_principal_axes_sorted_ascending() {
        let mesh = Mesh::cuboid([-2.0, -1.0, -0.5], [2.0, 1.0, 0.5]);
        let axes = MeshKernel.principal_axes(&mesh);
        assert!(axes.moments[0] <= axes.moments[1]);
        assert!(axes.moments[1] <= axes.moments[2]);
        // smallest moment is about the long (x) axis
        assert_relative_eq!(axes.axes[0].x.abs(), 1.0, epsilon = 1e-9);
        assert!(!axes.has_symmetry_axis);
    }

    #[test]
    fn test_cube_reports_symmetry() {
        let axes = MeshKernel.principal_axes(&unit_cube());
        assert!(axes.has_symmetry_axis);
    }

    #[test]
    fn test_transform_preserves_vertex_order() {
        let mesh = unit_cube();
        let moved = MeshKernel.transform(&mesh, &Matrix3::identity(), &Vector3::new(1.0, 2.0, 3.0));
        assert_eq!(moved.faces, mesh.faces);
        assert_relative_eq!(moved.vertices[6], Vector3::new(2.0, 3.0, 4.0));
    }

    #[test]
    fn test_brep_roundtrip_is_lossless() {
        let mesh = MeshKernel.transform(
            &unit_cube(),
            &nalgebra::Rotation3::from_euler_angles(0.3, 0.2, 0.1).into_inner(),
            &Vector3::new(0.1, 0.2, 0.3),
        );
        let blob = MeshKernel.export_brep(&mesh);
        let back = MeshKernel.import_brep(&blob).unwrap();
        assert_eq!(back, mesh);
    }

    #[test]
    fn test_brep_rejects_bad_header() {
        let err = Mesh::from_brep_str("v 0 0 0\n").unwrap_err();
        assert!(matches!(err, GeometryError::MalformedBrep { line: 1, .. }));
    }

    #[test]
    fn test_brep_rejects_out_of_range_face() {
        let content = format!("{}\nv 0 0 0\nf 0 1 2\n", BREP_HEADER);
        assert!(Mesh::from_brep_str(&content).is_err());
    }

    #[test]
    fn test_feature_edges_skip_face_diagonals() {
        // 12 box edges; the 6 face diagonals are coplanar and dropped
        assert_eq!(unit_cube().feature_edges().len(), 12);
    }

    #[test]
    fn test_empty_mesh_is_harmless() {
        let mesh = Mesh::default();
        let props = mesh.mass_properties();
        assert_eq!(props.centroid, Vector3::zeros());
        assert_eq!(mesh.surface_area(), 0.0);
    }
}
