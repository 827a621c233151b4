//! Rigid alignment of two vertex sets with known correspondence
//!
//! Used to settle the rotational ambiguity left by normalization for parts
//! with a symmetry axis: two canonical forms of the same part may still differ
//! by a rotation, and this recovers it (Kabsch, via SVD).

use nalgebra::{Matrix3, Vector3};
use thiserror::Error;

use crate::core::geometry::GeometryKernel;

/// Largest residual accepted as "the same geometry".
///
/// The residual is the sum of absolute per-axis differences over all
/// vertices, not normalized by vertex count. Absolute values keep opposite
/// errors from cancelling, so the bound is strict for dense meshes.
pub const ALIGNMENT_TOLERANCE: f64 = 1e-3;

#[derive(Debug, Error)]
pub enum AlignmentError {
    #[error("Cannot align solids with different vertex counts ({reference} vs {candidate})")]
    VertexCount { reference: usize, candidate: usize },

    #[error("Solids do not superimpose: residual {residual:.6} exceeds tolerance")]
    Residual { residual: f64 },

    #[error("SVD did not converge while aligning solids")]
    Svd,
}

fn centroid(points: &[Vector3<f64>]) -> Vector3<f64> {
    if points.is_empty() {
        return Vector3::zeros();
    }
    points.iter().sum::<Vector3<f64>>() / points.len() as f64
}

/// Rotation `R` that maps `candidate` onto `reference` (`r ≈ R·c`).
///
/// Vertices correspond by index. `R` is not forced to be proper, so a
/// mirror image aligns with a determinant of -1.
pub fn align(
    reference: &[Vector3<f64>],
    candidate: &[Vector3<f64>],
) -> Result<Matrix3<f64>, AlignmentError> {
    if reference.len() != candidate.len() {
        return Err(AlignmentError::VertexCount {
            reference: reference.len(),
            candidate: candidate.len(),
        });
    }

    let reference_center = centroid(reference);
    let candidate_center = centroid(candidate);

    let mut h = Matrix3::zeros();
    for (r, c) in reference.iter().zip(candidate) {
        h += (c - candidate_center) * (r - reference_center).transpose();
    }

    let svd = h.svd(true, true);
    let u = svd.u.ok_or(AlignmentError::Svd)?;
    let v_t = svd.v_t.ok_or(AlignmentError::Svd)?;
    let rotation = v_t.transpose() * u.transpose();

    let residual: f64 = reference
        .iter()
        .zip(candidate)
        .map(|(r, c)| {
            let delta = (r - reference_center) - rotation * (c - candidate_center);
            delta.abs().sum()
        })
        .sum();

    if residual > ALIGNMENT_TOLERANCE || !residual.is_finite() {
        return Err(AlignmentError::Residual { residual });
    }

    Ok(rotation)
}

/// [`align`] over two solids of the same kernel
pub fn align_solids<K: GeometryKernel>(
    kernel: &K,
    reference: &K::Solid,
    candidate: &K::Solid,
) -> Result<Matrix3<f64>, AlignmentError> {
    align(&kernel.vertices(reference), &kernel.vertices(candidate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::{Mesh, MeshKernel};
    use crate::core::location::Location;
    use approx::assert_relative_eq;
    use nalgebra::Rotation3;

    fn slab() -> Mesh {
        Mesh::cuboid([-2.0, -1.0, -0.5], [2.0, 1.0, 0.5])
    }

    #[test]
    fn test_align_with_itself_is_identity() {
        let vertices = slab().vertices;
        let r = align(&vertices, &vertices).unwrap();
        assert_relative_eq!(r, Matrix3::identity(), epsilon = 1e-9);
    }

    #[test]
    fn test_recovers_symmetry_rotation() {
        let kernel = MeshKernel;
        let reference = slab();
        // 180 degrees about z maps the slab onto itself with permuted vertices
        let turned = kernel.place(&reference, &Location::from_euler_degrees([0.0; 3], [0.0, 0.0, 180.0]));
        let r = align_solids(&kernel, &reference, &turned).unwrap();
        for (ref_v, cand_v) in reference.vertices.iter().zip(&turned.vertices) {
            assert_relative_eq!(*ref_v, r * cand_v, epsilon = 1e-9);
        }
        assert_relative_eq!(r.determinant(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_recovers_arbitrary_rotation() {
        let kernel = MeshKernel;
        let reference = slab();
        let rotation = Rotation3::from_euler_angles(0.4, -1.1, 2.3);
        let candidate = kernel.transform(&reference, rotation.matrix(), &Vector3::zeros());
        let r = align_solids(&kernel, &reference, &candidate).unwrap();
        assert_relative_eq!(r, rotation.matrix().transpose(), epsilon = 1e-9);
    }

    #[test]
    fn test_mirror_image_aligns_improperly() {
        let reference = vec![
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(3.0, 0.0, 0.0),
            Vector3::new(0.0, 2.0, 0.0),
            Vector3::new(0.0, 0.0, 1.0),
        ];
        let mirrored: Vec<_> = reference.iter().map(|v| Vector3::new(-v.x, v.y, v.z)).collect();
        let r = align(&reference, &mirrored).unwrap();
        assert_relative_eq!(r.determinant(), -1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_different_shapes_fail() {
        let a = Mesh::cuboid([0.0; 3], [4.0, 2.0, 1.0]).vertices;
        let b = Mesh::cuboid([0.0; 3], [4.0, 2.0, 1.2]).vertices;
        assert!(matches!(align(&a, &b), Err(AlignmentError::Residual { .. })));
    }

    #[test]
    fn test_vertex_count_mismatch() {
        let a = slab().vertices;
        let err = align(&a, &a[..4]).unwrap_err();
        assert!(matches!(err, AlignmentError::VertexCount { reference: 8, candidate: 4 }));
    }
}
