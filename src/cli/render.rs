//! `hxview render`: render a template to stdout.

use anyhow::{Context, Result};
use clap::Args;
use serde_json::Value;
use std::path::PathBuf;

use super::{CommandContext, known_layouts};
use crate::htmx::HtmxRequest;
use crate::templating::{RequestContext, ViewError};

/// Render a template as a full page or as an HTMX fragment.
#[derive(Args, Debug)]
pub struct RenderCommand {
    /// Template name, with or without extension (e.g. `pages/index`)
    template: String,

    /// Layout to wrap the page in (default: the configured default layout)
    #[arg(short, long)]
    layout: Option<String>,

    /// Render only the fragment, as for an `HX-Request`
    #[arg(short, long)]
    fragment: bool,

    /// JSON file with the model
    #[arg(short, long, value_name = "FILE")]
    model: Option<PathBuf>,

    /// Request path exposed as `_request_path`
    #[arg(long, default_value = "/")]
    path: String,

    /// Anti-forgery token exposed as `_csrf_token`
    #[arg(long, value_name = "TOKEN")]
    csrf_token: Option<String>,

    /// Print a parse error report with the surrounding source lines
    #[arg(long)]
    explain: bool,
}

impl RenderCommand {
    pub async fn execute(self, context: &CommandContext) -> Result<()> {
        let model = self.load_model()?;
        let engine = context.engine_builder().hot_reload(false).build()?;

        let mut request = RequestContext::new(&self.path);
        if self.fragment {
            request = request.with_htmx(HtmxRequest::fragment());
        }
        if let Some(token) = &self.csrf_token {
            request = request.with_csrf_token(token);
        }

        let result = match &self.layout {
            Some(layout) => engine.render_page(layout, &self.template, &model, &request).await,
            None => engine.render(&self.template, &model, &request).await,
        };

        match result {
            Ok(html) => {
                println!("{html}");
                Ok(())
            }
            Err(ViewError::UnknownLayout(layout)) => {
                let known = known_layouts(context);
                Err::<(), _>(ViewError::UnknownLayout(layout)).with_context(|| {
                    format!("Layouts available in the templates: {}", known.join(", "))
                })
            }
            Err(e) if self.explain && e.is_parse_error() => {
                let source = match e.template() {
                    Some(key) => engine.locator().resolve(key).await.ok().map(|s| s.text),
                    None => None,
                };
                eprintln!("{}", e.format_with_context(source.as_deref()));
                Err(e.into())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn load_model(&self) -> Result<Value> {
        let Some(path) = &self.model else {
            return Ok(Value::Null);
        };

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read model file: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse model file as JSON: {}", path.display()))
    }
}
