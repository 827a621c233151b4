//! README and .gitignore generation from embedded Tera templates

use rust_embed::Embed;
use serde::Serialize;
use tera::Tera;
use thiserror::Error;

#[derive(Embed)]
#[folder = "templates/"]
struct EmbeddedTemplates;

const README_TEMPLATE: &str = "README.md.tera";
const GITIGNORE_TEMPLATE: &str = "gitignore.tera";

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Template not found: {0}")]
    NotFound(String),

    #[error("Template rendering error: {0}")]
    RenderError(String),
}

/// Values substituted into the project README
#[derive(Debug, Clone, Serialize)]
pub struct ReadmeContext {
    pub name: String,
    pub root_path: String,
    pub part_count: usize,
    pub include_assets: bool,
    pub cover_image: Option<String>,
    pub repo_url: Option<String>,
}

pub struct TemplateRenderer {
    tera: Tera,
}

impl TemplateRenderer {
    pub fn new() -> Result<Self, TemplateError> {
        let mut tera = Tera::default();
        tera.autoescape_on(vec![]);

        for file in EmbeddedTemplates::iter() {
            let filename = file.as_ref();
            if let Some(content) = EmbeddedTemplates::get(filename) {
                let template = std::str::from_utf8(&content.data)
                    .map_err(|e| TemplateError::RenderError(e.to_string()))?;
                tera.add_raw_template(filename, template)
                    .map_err(|e| TemplateError::RenderError(e.to_string()))?;
            }
        }

        Ok(Self { tera })
    }

    fn render(&self, name: &str, context: &tera::Context) -> Result<String, TemplateError> {
        if !self.tera.get_template_names().any(|n| n == name) {
            return Err(TemplateError::NotFound(name.to_string()));
        }
        self.tera
            .render(name, context)
            .map_err(|e| TemplateError::RenderError(e.to_string()))
    }

    pub fn readme(&self, ctx: &ReadmeContext) -> Result<String, TemplateError> {
        let context = tera::Context::from_serialize(ctx)
            .map_err(|e| TemplateError::RenderError(e.to_string()))?;
        self.render(README_TEMPLATE, &context)
    }

    pub fn gitignore(&self) -> Result<String, TemplateError> {
        self.render(GITIGNORE_TEMPLATE, &tera::Context::new())
    }
}
