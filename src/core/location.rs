//! Rigid placements of parts and assemblies
//!
//! A [`Location`] maps points from a child frame into its parent frame:
//! `p_parent = orientation · p_child + position`. Orientations are stored
//! row-major so the JSON reads like the matrix it is.

use nalgebra::{Matrix3, Rotation3, Vector3};
use serde::{Deserialize, Serialize};

/// Tolerance used when deciding whether a placement is the identity
const IDENTITY_EPSILON: f64 = 1e-9;

/// Rotation + translation from a child frame to its parent frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Translation component
    pub position: [f64; 3],

    /// 3x3 orientation, row-major
    pub orientation: [[f64; 3]; 3],

    /// Whether the orientation flips handedness (determinant < 0)
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_reflection: bool,
}

impl Location {
    /// Build a location from a rotation matrix and translation vector
    pub fn new(rotation: &Matrix3<f64>, translation: &Vector3<f64>) -> Self {
        let mut orientation = [[0.0; 3]; 3];
        for (r, row) in orientation.iter_mut().enumerate() {
            for (c, value) in row.iter_mut().enumerate() {
                *value = rotation[(r, c)];
            }
        }

        Self {
            position: [translation.x, translation.y, translation.z],
            orientation,
            is_reflection: rotation.determinant() < 0.0,
        }
    }

    /// The identity placement
    pub fn identity() -> Self {
        Self::new(&Matrix3::identity(), &Vector3::zeros())
    }

    /// Build a location from a translation and extrinsic XYZ Euler angles in degrees
    pub fn from_euler_degrees(translation: [f64; 3], euler: [f64; 3]) -> Self {
        let rotation = Rotation3::from_euler_angles(
            euler[0].to_radians(),
            euler[1].to_radians(),
            euler[2].to_radians(),
        );
        Self::new(rotation.matrix(), &Vector3::from(translation))
    }

    pub fn rotation(&self) -> Matrix3<f64> {
        Matrix3::from_fn(|r, c| self.orientation[r][c])
    }

    pub fn translation(&self) -> Vector3<f64> {
        Vector3::from(self.position)
    }

    /// Whether this placement leaves every point where it is
    pub fn is_identity(&self) -> bool {
        let rotation_delta = (self.rotation() - Matrix3::identity()).abs().max();
        let translation_delta = self.translation().abs().max();
        rotation_delta < IDENTITY_EPSILON && translation_delta < IDENTITY_EPSILON
    }

    /// `self ∘ child`: first apply `child`, then `self`
    pub fn compose(&self, child: &Location) -> Location {
        let rotation = self.rotation();
        Location::new(
            &(rotation * child.rotation()),
            &(rotation * child.translation() + self.translation()),
        )
    }

    /// Inverse placement. Orientations are orthogonal, so the inverse is the transpose.
    pub fn inverse(&self) -> Location {
        let inverse_rotation = self.rotation().transpose();
        Location::new(&inverse_rotation, &(-(inverse_rotation * self.translation())))
    }

    /// Apply this placement to a point
    pub fn apply(&self, point: &Vector3<f64>) -> Vector3<f64> {
        self.rotation() * point + self.translation()
    }

    /// Compare two placements after rounding every component to `precision` decimals
    pub fn approx_eq(&self, other: &Location, precision: i32) -> bool {
        let scale = 10f64.powi(precision);
        let quantize = |v: f64| (v * scale).round() as i64;

        let positions_match = self
            .position
            .iter()
            .zip(other.position.iter())
            .all(|(a, b)| quantize(*a) == quantize(*b));

        let orientations_match = self
            .orientation
            .iter()
            .flatten()
            .zip(other.orientation.iter().flatten())
            .all(|(a, b)| quantize(*a) == quantize(*b));

        positions_match && orientations_match
    }
}

impl Default for Location {
    fn default() -> Self {
        Self::identity()
    }
}

/// Compare two optional placements, treating `None` as the identity
pub fn locations_match(a: Option<&Location>, b: Option<&Location>, precision: i32) -> bool {
    let identity = Location::identity();
    a.unwrap_or(&identity)
        .approx_eq(b.unwrap_or(&identity), precision)
}
