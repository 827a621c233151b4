//! Order-independent geometric fingerprints
//!
//! A checksum is taken over a solid's vertex set after rounding every
//! coordinate to [`CHECKSUM_PRECISION`] decimals and sorting, so it does not
//! depend on how the kernel enumerates vertices or on float noise below the
//! precision. It is *not* placement invariant: normalize first.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::core::geometry::GeometryKernel;

/// Number of decimals kept when fingerprinting geometry
pub const CHECKSUM_PRECISION: i32 = 3;

/// Hex-encoded geometry fingerprint
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Checksum(String);

impl Checksum {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First `len` hex characters, for display
    pub fn short(&self, len: usize) -> &str {
        &self.0[..len.min(self.0.len())]
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Checksum {
    fn from(s: &str) -> Self {
        Checksum(s.to_string())
    }
}

fn quantize(value: f64, precision: i32) -> i64 {
    (value * 10f64.powi(precision)).round() as i64
}

/// Fingerprint a vertex list
pub fn checksum(vertices: &[Vector3<f64>]) -> Checksum {
    let mut points: Vec<[i64; 3]> = vertices
        .iter()
        .map(|v| {
            [
                quantize(v.x, CHECKSUM_PRECISION),
                quantize(v.y, CHECKSUM_PRECISION),
                quantize(v.z, CHECKSUM_PRECISION),
            ]
        })
        .collect();
    points.sort_unstable();

    let mut buffer = Vec::with_capacity(points.len() * 24);
    for point in &points {
        for coord in point {
            buffer.extend_from_slice(&coord.to_le_bytes());
        }
    }

    let first = Sha256::digest(&buffer);
    Checksum(hex::encode(Sha256::digest(first)))
}

/// Fingerprint a solid through its kernel
pub fn checksum_solid<K: GeometryKernel>(kernel: &K, solid: &K::Solid) -> Checksum {
    checksum(&kernel.vertices(solid))
}

/// Cheap bucket key: surface area rounded to the checksum precision plus vertex count.
///
/// Parts in different buckets are never duplicates; parts in the same bucket
/// may still differ and are told apart by alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PartGroup {
    pub area_milli: i64,
    pub vertex_count: usize,
}

impl PartGroup {
    pub fn of<K: GeometryKernel>(kernel: &K, solid: &K::Solid) -> Self {
        Self {
            area_milli: quantize(kernel.surface_area(solid), CHECKSUM_PRECISION),
            vertex_count: kernel.vertices(solid).len(),
        }
    }
}
