//! SVG previews of parts and the whole assembly under `assets/`

use nalgebra::Vector3;
use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::diff::RevisionDiff;
use crate::core::geometry::{Color, GeometryKernel};
use crate::core::project::Project;

pub const ASSETS_DIR: &str = "assets";
pub const PART_ASSETS_DIR: &str = "parts";
pub const SVG_EXTENSION: &str = "svg";

const CANVAS_WIDTH: f64 = 800.0;
const MIN_CANVAS_HEIGHT: f64 = 240.0;
const MARGIN: f64 = 16.0;
const DEFAULT_STROKE: &str = "#333333";

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Files touched by one asset pass
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AssetReport {
    pub written: Vec<PathBuf>,
    pub removed: Vec<PathBuf>,
}

pub fn part_asset(project_dir: &Path, name: &str) -> PathBuf {
    project_dir
        .join(ASSETS_DIR)
        .join(PART_ASSETS_DIR)
        .join(format!("{}.{}", name, SVG_EXTENSION))
}

pub fn assembly_asset(project_dir: &Path, root_name: &str) -> PathBuf {
    project_dir
        .join(ASSETS_DIR)
        .join(format!("{}.{}", root_name, SVG_EXTENSION))
}

/// Isometric projection onto the drawing plane, y pointing down.
/// Shared by the SVG assets and the terminal preview.
pub fn isometric_point(v: &Vector3<f64>) -> (f64, f64) {
    let cos30 = 3f64.sqrt() / 2.0;
    let x = (v.x - v.y) * cos30;
    let y = (v.x + v.y) * 0.5 - v.z;
    (x, y)
}

/// One `<path>` per stroke color
pub fn render_svg(layers: &[(String, Vec<[Vector3<f64>; 2]>)]) -> String {
    let projected: Vec<(&str, Vec<[(f64, f64); 2]>)> = layers
        .iter()
        .map(|(stroke, edges)| {
            let lines = edges
                .iter()
                .map(|[a, b]| [isometric_point(a), isometric_point(b)])
                .collect();
            (stroke.as_str(), lines)
        })
        .collect();

    let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
    let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
    for (_, lines) in &projected {
        for &(x, y) in lines.iter().flatten() {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
    }
    if !min_x.is_finite() {
        (min_x, min_y, max_x, max_y) = (0.0, 0.0, 1.0, 1.0);
    }

    let span_x = (max_x - min_x).max(f64::EPSILON);
    let span_y = (max_y - min_y).max(f64::EPSILON);
    let scale = ((CANVAS_WIDTH - 2.0 * MARGIN) / span_x).min(
        (CANVAS_WIDTH - 2.0 * MARGIN) / span_y,
    );
    let height = (span_y * scale + 2.0 * MARGIN).max(MIN_CANVAS_HEIGHT);
    let offset_y = (height - span_y * scale) / 2.0;
    let offset_x = (CANVAS_WIDTH - span_x * scale) / 2.0;

    let mut svg = String::new();
    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h:.0}" viewBox="0 0 {w} {h:.0}">"#,
        w = CANVAS_WIDTH,
        h = height
    );
    for (stroke, lines) in &projected {
        if lines.is_empty() {
            continue;
        }
        let mut d = String::new();
        for [(ax, ay), (bx, by)] in lines {
            let _ = write!(
                d,
                "M{:.2} {:.2}L{:.2} {:.2}",
                (ax - min_x) * scale + offset_x,
                (ay - min_y) * scale + offset_y,
                (bx - min_x) * scale + offset_x,
                (by - min_y) * scale + offset_y,
            );
        }
        let _ = writeln!(
            svg,
            r#"  <path d="{}" fill="none" stroke="{}" stroke-width="1" stroke-linecap="round"/>"#,
            d, stroke
        );
    }
    svg.push_str("</svg>\n");
    svg
}

fn stroke_for(color: Option<&Color>) -> String {
    color
        .map(Color::to_css)
        .unwrap_or_else(|| DEFAULT_STROKE.to_string())
}

fn write_file(path: &Path, content: &str) -> Result<(), AssetError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| AssetError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::write(path, content).map_err(|source| AssetError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Regenerate previews for modified parts and, when any assembly changed, the
/// root assembly. Missing files are always written. Part previews whose name
/// left the project are removed.
pub fn write_assets<K: GeometryKernel>(
    kernel: &K,
    project: &Project<K::Solid>,
    diff: &RevisionDiff,
    dir: &Path,
) -> Result<AssetReport, AssetError> {
    let mut report = AssetReport::default();

    for (checksum, solid) in &project.inventory.parts {
        let Some(item) = project.inventory.catalog.get(checksum) else {
            continue;
        };
        let path = part_asset(dir, &item.name);
        let modified = diff
            .modified_parts
            .iter()
            .any(|key| &key.checksum == checksum);
        if !modified && path.is_file() {
            continue;
        }
        let stroke = stroke_for(item.variations.first().and_then(|v| v.color.as_ref()));
        let svg = render_svg(&[(stroke, kernel.wireframe(solid))]);
        write_file(&path, &svg)?;
        report.written.push(path);
    }

    if let Some(root) = project.root() {
        let path = assembly_asset(dir, root.name());
        if !diff.modified_assemblies.is_empty() || !path.is_file() {
            let layers: Vec<_> = project
                .placed_parts()
                .into_iter()
                .filter_map(|(part, world)| {
                    let solid = project.inventory.parts.get(&part.variation.checksum)?;
                    let color = project
                        .inventory
                        .variation(&part.variation)
                        .and_then(|v| v.color.as_ref());
                    let placed = kernel.place(solid, &world);
                    Some((stroke_for(color), kernel.wireframe(&placed)))
                })
                .collect();
            write_file(&path, &render_svg(&layers))?;
            report.written.push(path);
        }
    }

    report.removed = prune_part_assets(dir, &project.inventory.part_names())?;

    tracing::debug!(
        written = report.written.len(),
        removed = report.removed.len(),
        "Updated assets"
    );
    Ok(report)
}

fn prune_part_assets(dir: &Path, keep: &BTreeSet<String>) -> Result<Vec<PathBuf>, AssetError> {
    let parts_dir = dir.join(ASSETS_DIR).join(PART_ASSETS_DIR);
    if !parts_dir.is_dir() {
        return Ok(Vec::new());
    }

    let entries = fs::read_dir(&parts_dir).map_err(|source| AssetError::Io {
        path: parts_dir.clone(),
        source,
    })?;

    let mut removed = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some(SVG_EXTENSION) {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        if keep.contains(stem) {
            continue;
        }
        fs::remove_file(&path).map_err(|source| AssetError::Io {
            path: path.clone(),
            source,
        })?;
        removed.push(path);
    }
    removed.sort();
    Ok(removed)
}
