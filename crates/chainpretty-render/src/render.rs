//! Template loading and event rendering.

use chainpretty_core::{Event, RenderError};
use std::{error::Error as _, path::Path, sync::Arc};
use tera::{Context, Tera};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::env::EnvGlobals;
use crate::filters::add_filters;

/// Turns an event into text with a named template.
pub trait Renderer: Send + Sync {
    fn render(&self, template: &str, event: &Event) -> Result<String, RenderError>;

    /// Try each template in order; the first one that renders wins. Returns
    /// the last error when all of them fail.
    fn render_first(&self, templates: &[&str], event: &Event) -> Result<String, RenderError> {
        let mut last = RenderError::TemplateNotFound(String::new());
        for template in templates {
            match self.render(template, event) {
                Ok(text) => return Ok(text),
                Err(e) => {
                    warn!(template, event = %event.name, error = %e, "render failed");
                    last = e;
                }
            }
        }
        Err(last)
    }
}

/// Tera-backed renderer. Events are exposed to templates as `evt`.
pub struct TemplateRenderer {
    tera: Tera,
    globals: Arc<EnvGlobals>,
}

impl TemplateRenderer {
    pub fn new(mut tera: Tera, globals: EnvGlobals) -> Self {
        let globals = Arc::new(globals);
        add_filters(&mut tera, &globals);
        Self { tera, globals }
    }

    pub fn globals(&self) -> &EnvGlobals {
        &self.globals
    }

    pub fn template_names(&self) -> impl Iterator<Item = &str> {
        self.tera.get_template_names()
    }

    /// Add a template from a string; mostly useful in tests.
    pub fn add_raw_template(&mut self, name: &str, content: &str) -> Result<(), RenderError> {
        self.tera
            .add_raw_template(name, content)
            .map_err(|e| RenderError::Load(error_chain(&e)))
    }
}

impl Renderer for TemplateRenderer {
    fn render(&self, template: &str, event: &Event) -> Result<String, RenderError> {
        if !self.tera.get_template_names().any(|n| n == template) {
            return Err(RenderError::TemplateNotFound(template.to_string()));
        }
        let mut ctx = Context::new();
        ctx.insert("evt", event);
        ctx.insert("chain_id", &self.globals.chain_id);
        self.tera
            .render(template, &ctx)
            .map_err(|e| RenderError::Render {
                template: template.to_string(),
                reason: error_chain(&e),
            })
    }
}

/// Build a renderer from every file under the search paths. Templates are
/// named by their path relative to the search path, with `/` separators;
/// when two paths provide the same name the first one wins.
pub fn init_environment<P: AsRef<Path>>(
    search_paths: &[P],
    globals: EnvGlobals,
) -> Result<TemplateRenderer, RenderError> {
    let mut files: Vec<(std::path::PathBuf, Option<String>)> = Vec::new();
    for root in search_paths {
        let root = root.as_ref();
        if !root.exists() {
            warn!(path = %root.display(), "template path does not exist, skipping");
            continue;
        }
        for entry in WalkDir::new(root).sort_by_file_name().into_iter().filter_map(|e| e.ok()) {
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(rel) = entry.path().strip_prefix(root) else {
                continue;
            };
            let name = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            if files.iter().any(|(_, n)| n.as_deref() == Some(name.as_str())) {
                debug!(template = %name, path = %entry.path().display(), "shadowed template");
                continue;
            }
            files.push((entry.path().to_path_buf(), Some(name)));
        }
    }

    let mut tera = Tera::default();
    tera.add_template_files(files)
        .map_err(|e| RenderError::Load(error_chain(&e)))?;
    info!(templates = tera.get_template_names().count(), "templates loaded");
    Ok(TemplateRenderer::new(tera, globals))
}

/// Tera puts the useful detail in the error's sources.
fn error_chain(err: &tera::Error) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(e) = source {
        out.push_str(": ");
        out.push_str(&e.to_string());
        source = e.source();
    }
    out
}
