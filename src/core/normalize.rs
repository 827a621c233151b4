//! Canonical part frames
//!
//! A part is normalized by moving its centroid to the origin and, optionally,
//! rotating it onto its principal axes of inertia. The returned offset and
//! rotation map the canonical solid back onto the input:
//! `transform(canonical, rotation, offset) ≈ input`.

use nalgebra::{Matrix3, Vector3};

use crate::core::geometry::GeometryKernel;

/// Principal-axis passes. The second pass absorbs the drift between
/// successive inertia computations.
const AXIS_PASSES: usize = 2;

/// A solid in its canonical frame plus the placement that recovers the input
#[derive(Debug, Clone)]
pub struct NormalizedPart<S> {
    pub solid: S,
    /// Original centroid
    pub offset: Vector3<f64>,
    /// Canonical frame to original frame
    pub rotation: Matrix3<f64>,
    /// The inertia tensor has repeated moments, so the canonical rotation is ambiguous
    pub has_symmetry_axis: bool,
}

/// Normalize `solid`. With `normalize_axis` false only the translation is removed.
pub fn normalize<K: GeometryKernel>(
    kernel: &K,
    solid: &K::Solid,
    normalize_axis: bool,
) -> NormalizedPart<K::Solid> {
    let offset = kernel.centroid(solid);
    let centered = kernel.transform(solid, &Matrix3::identity(), &(-offset));

    if !normalize_axis {
        return NormalizedPart {
            solid: centered,
            offset,
            rotation: Matrix3::identity(),
            has_symmetry_axis: false,
        };
    }

    let mut current = centered;
    let mut accumulated = Matrix3::identity();
    let mut has_symmetry_axis = false;

    for _ in 0..AXIS_PASSES {
        let principal = kernel.principal_axes(&current);
        has_symmetry_axis |= principal.has_symmetry_axis;

        let step = axis_rotation(&principal.axes);
        current = kernel.transform(&current, &step, &Vector3::zeros());
        accumulated = step * accumulated;
    }

    NormalizedPart {
        solid: current,
        offset,
        rotation: accumulated.transpose(),
        has_symmetry_axis,
    }
}

/// Rows are the principal axes, each flipped so its own coordinate is
/// non-negative. The third row is then fixed to `row0 × row1` when the flips
/// left a left-handed frame, so the result is always a proper rotation.
fn axis_rotation(axes: &[Vector3<f64>; 3]) -> Matrix3<f64> {
    let mut rows = *axes;
    for (i, axis) in rows.iter_mut().enumerate() {
        if axis[i] < 0.0 {
            *axis = -*axis;
        }
    }
    if rows[0].cross(&rows[1]).dot(&rows[2]) < 0.0 {
        rows[2] = rows[0].cross(&rows[1]);
    }
    Matrix3::from_rows(&[
        rows[0].transpose(),
        rows[1].transpose(),
        rows[2].transpose(),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::checksum::checksum_solid;
    use crate::core::geometry::{Mesh, MeshKernel};
    use crate::core::location::Location;
    use approx::assert_relative_eq;

    fn slab() -> Mesh {
        Mesh::cuboid([0.0; 3], [4.0, 2.0, 1.0])
    }

    fn placed(mesh: &Mesh, translation: [f64; 3], euler: [f64; 3]) -> Mesh {
        MeshKernel.place(mesh, &Location::from_euler_degrees(translation, euler))
    }

    #[test]
    fn test_canonical_form_is_centered() {
        let kernel = MeshKernel;
        let part = placed(&slab(), [5.0, -3.0, 2.0], [10.0, 20.0, 30.0]);
        let normalized = normalize(&kernel, &part, true);
        assert_relative_eq!(kernel.centroid(&normalized.solid), Vector3::zeros(), epsilon = 1e-9);
        assert_relative_eq!(normalized.offset, kernel.centroid(&part), epsilon = 1e-12);
    }

    #[test]
    fn test_reconstruct_matches_input_checksum() {
        let kernel = MeshKernel;
        for euler in [[0.0, 0.0, 0.0], [33.0, -71.0, 12.5], [90.0, 0.0, 180.0]] {
            let part = placed(&slab(), [1.5, 2.5, -7.25], euler);
            let n = normalize(&kernel, &part, true);
            let rebuilt = kernel.transform(&n.solid, &n.rotation, &n.offset);
            assert_eq!(checksum_solid(&kernel, &rebuilt), checksum_solid(&kernel, &part));
        }
    }

    #[test]
    fn test_translation_only_path() {
        let kernel = MeshKernel;
        let part = placed(&slab(), [3.0, 0.0, 0.0], [0.0, 0.0, 45.0]);
        let n = normalize(&kernel, &part, false);
        assert_eq!(n.rotation, Matrix3::identity());
        assert!(!n.has_symmetry_axis);
        let rebuilt = kernel.transform(&n.solid, &n.rotation, &n.offset);
        assert_eq!(checksum_solid(&kernel, &rebuilt), checksum_solid(&kernel, &part));
    }

    #[test]
    fn test_rotated_copies_share_canonical_form() {
        let kernel = MeshKernel;
        let a = normalize(&kernel, &placed(&slab(), [0.0; 3], [0.0; 3]), true);
        let b = normalize(&kernel, &placed(&slab(), [9.0, 1.0, 4.0], [15.0, 40.0, -65.0]), true);
        assert_eq!(checksum_solid(&kernel, &a.solid), checksum_solid(&kernel, &b.solid));
        assert!(!a.has_symmetry_axis);
    }

    #[test]
    fn test_axis_rotation_is_proper() {
        // x axis flipped alone would give det -1
        let axes = [
            Vector3::new(-1.0, 0.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
            Vector3::new(0.0, 0.0, 1.0),
        ];
        let r = axis_rotation(&axes);
        assert_relative_eq!(r.determinant(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(r.row(0).transpose(), Vector3::x(), epsilon = 1e-12);
    }

    #[test]
    fn test_canonical_frame_never_mirrors() {
        let kernel = MeshKernel;
        for a in [0.0, 37.0, 90.0, 180.0] {
            for b in [0.0, 25.0, 70.0, 90.0] {
                for c in [0.0, 45.0, 135.0, 300.0] {
                    let part = placed(&slab(), [2.0, -1.0, 0.5], [a, b, c]);
                    let n = normalize(&kernel, &part, true);
                    let det = n.rotation.determinant();
                    assert!(
                        (det - 1.0).abs() < 1e-9,
                        "det {} at euler [{}, {}, {}]",
                        det,
                        a,
                        b,
                        c
                    );
                    let rebuilt = kernel.transform(&n.solid, &n.rotation, &n.offset);
                    assert_eq!(checksum_solid(&kernel, &rebuilt), checksum_solid(&kernel, &part));
                }
            }
        }
    }

    #[test]
    fn test_cube_reports_symmetry() {
        let cube = Mesh::cuboid([0.0; 3], [1.0, 1.0, 1.0]);
        let n = normalize(&MeshKernel, &cube, true);
        assert!(n.has_symmetry_axis);
    }
}
