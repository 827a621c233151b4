//! Terminal visualization: assembly tree and braille wireframe preview

use drawille::Canvas;
use nalgebra::Vector3;

use crate::core::assets::isometric_point;
use crate::core::project::{Assembly, Project};

/// Default canvas size for the wireframe preview, in braille dots
pub const PREVIEW_WIDTH: u32 = 96;
pub const PREVIEW_HEIGHT: u32 = 48;

/// Render the assembly hierarchy with box-drawing connectors
///
/// # Example Output
/// ```text
/// Gripper
/// ├── Base_plate (v1)
/// └── Arm/
///     └── Finger (v2)
/// ```
pub fn render_tree<S>(project: &Project<S>) -> String {
    let Some(root) = project.root() else {
        return "  (empty project)".to_string();
    };
    let mut out = format!("{}\n", root.name());
    render_children(project, root, "", &mut out);
    out
}

fn render_children<S>(project: &Project<S>, assembly: &Assembly, prefix: &str, out: &mut String) {
    let parts: Vec<String> = assembly
        .parts
        .iter()
        .map(|part| {
            let name = project
                .inventory
                .name(&part.variation.checksum)
                .unwrap_or("?");
            format!("{} (v{})", name, part.variation.id)
        })
        .collect();
    let children: Vec<&Assembly> = assembly
        .children
        .iter()
        .filter_map(|path| project.assemblies.get(path))
        .collect();

    let total = parts.len() + children.len();
    let mut index = 0;

    for label in parts {
        index += 1;
        let connector = if index == total { "└── " } else { "├── " };
        out.push_str(&format!("{}{}{}\n", prefix, connector, label));
    }

    for child in children {
        index += 1;
        let last = index == total;
        let connector = if last { "└── " } else { "├── " };
        out.push_str(&format!("{}{}{}/\n", prefix, connector, child.name()));
        let next_prefix = format!("{}{}", prefix, if last { "    " } else { "│   " });
        render_children(project, child, &next_prefix, out);
    }
}

/// Draw edges in isometric projection, scaled to fit the canvas
pub fn render_wireframe(edges: &[[Vector3<f64>; 2]], width: u32, height: u32) -> String {
    if edges.is_empty() || width < 2 || height < 2 {
        return "  (no geometry)".to_string();
    }

    let points: Vec<[(f64, f64); 2]> = edges
        .iter()
        .map(|[a, b]| [isometric_point(a), isometric_point(b)])
        .collect();

    let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
    let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
    for &(x, y) in points.iter().flatten() {
        min_x = min_x.min(x);
        min_y = min_y.min(y);
        max_x = max_x.max(x);
        max_y = max_y.max(y);
    }

    let span = (max_x - min_x).max(max_y - min_y).max(f64::EPSILON);
    let scale = ((width - 1) as f64 / span).min((height - 1) as f64 / span);
    let to_canvas = |(x, y): (f64, f64)| {
        (
            ((x - min_x) * scale).round() as u32,
            ((y - min_y) * scale).round() as u32,
        )
    };

    let mut canvas = Canvas::new(width, height);
    for [a, b] in points {
        let (x1, y1) = to_canvas(a);
        let (x2, y2) = to_canvas(b);
        canvas.line(x1, y1, x2, y2);
    }
    canvas.frame()
}
