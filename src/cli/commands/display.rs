//! `orion display` command - Show the assembly tree and part catalog

use console::style;
use miette::Result;
use std::path::PathBuf;
use tabled::builder::Builder;
use tabled::settings::Style;

use crate::cli::helpers::{project_dir, truncate_str};
use crate::cli::viz::{render_tree, render_wireframe, PREVIEW_HEIGHT, PREVIEW_WIDTH};
use crate::cli::GlobalOpts;
use crate::core::config::ProjectConfig;
use crate::core::geometry::{GeometryKernel, MeshKernel};
use crate::core::inventory::Inventory;
use crate::core::store::read_project;

#[derive(clap::Args, Debug)]
pub struct DisplayArgs {
    /// Project directory [default: current directory]
    #[arg(long, short = 'p')]
    pub project_path: Option<PathBuf>,

    /// Draw a braille wireframe of the whole assembly
    #[arg(long)]
    pub preview: bool,

    /// Draw a braille wireframe of one catalog part
    #[arg(long, value_name = "NAME")]
    pub part: Option<String>,
}

pub fn run(args: DisplayArgs, _global: &GlobalOpts) -> Result<()> {
    let dir = project_dir(args.project_path)?;
    let config = ProjectConfig::load(&dir).map_err(|e| miette::miette!("{}", e))?;
    let kernel = MeshKernel;
    let project = read_project(&kernel, &dir, config.options.clone())
        .map_err(|e| miette::miette!("{}", e))?;

    if let Some(name) = &args.part {
        let solid = project
            .inventory
            .catalog
            .iter()
            .find(|(_, item)| &item.name == name)
            .and_then(|(checksum, _)| project.inventory.parts.get(checksum))
            .ok_or_else(|| miette::miette!("No part named '{}' in the catalog", name))?;
        println!("{}", style(name).bold());
        println!(
            "{}",
            render_wireframe(&kernel.wireframe(solid), PREVIEW_WIDTH, PREVIEW_HEIGHT)
        );
        return Ok(());
    }

    println!("{} {}", style("Project:").bold(), style(&config.name).cyan());
    println!("{} {}", style("CAD file:").bold(), config.cad_path.display());
    if let Some(url) = &config.repo_url {
        println!("{} {}", style("Remote:").bold(), url);
    }
    println!();

    println!("{}", render_tree(&project));
    println!("{}", catalog_table(&project.inventory));

    if args.preview {
        let edges: Vec<_> = project
            .placed_parts()
            .into_iter()
            .filter_map(|(part, world)| {
                let solid = project.inventory.parts.get(&part.variation.checksum)?;
                Some(kernel.wireframe(&kernel.place(solid, &world)))
            })
            .flatten()
            .collect();
        println!();
        println!("{}", render_wireframe(&edges, PREVIEW_WIDTH, PREVIEW_HEIGHT));
    }

    Ok(())
}

fn catalog_table<S>(inventory: &Inventory<S>) -> String {
    let mut builder = Builder::default();
    builder.push_record(["Part", "Variation", "Color", "Uses", "Checksum"]);

    for (checksum, item) in &inventory.catalog {
        for variation in &item.variations {
            let color = variation
                .color
                .as_ref()
                .map(|c| c.to_css())
                .unwrap_or_else(|| "-".to_string());
            builder.push_record([
                truncate_str(&item.name, 32),
                format!("v{}", variation.id),
                color,
                variation.references.len().to_string(),
                checksum.short(12).to_string(),
            ]);
        }
    }

    let mut table = builder.build();
    table.with(Style::rounded());
    table.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::Color;
    use crate::core::geometry::Mesh;

    #[test]
    fn test_catalog_table_lists_variations() {
        let mut inventory: Inventory<Mesh> = Inventory::new();
        let checksum = "0123456789abcdef".into();
        inventory.resolve(&checksum, None, "/R/Bolt", "Bolt", None);
        inventory.resolve(&checksum, Some(Color::rgba(1.0, 0.0, 0.0, 1.0)), "/R/Bolt_2", "Bolt", None);

        let table = catalog_table(&inventory);
        assert!(table.contains("Bolt"));
        assert!(table.contains("v1"));
        assert!(table.contains("v2"));
        assert!(table.contains("0123456789ab"));
        assert!(!table.contains("0123456789abc"));
    }
}
