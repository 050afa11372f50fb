//! Error types for the rendering pipeline.
//!
//! [`ViewError`] is the single error type returned by the locator, the engine
//! adapter and the renderer. The cache never produces errors of its own; it
//! relays whatever the compile closure returned.
//!
//! Errors are never swallowed on the request path. Only the file watcher logs
//! and drops OS-level watch failures, since hot reload is a development aid.

use std::path::PathBuf;

use thiserror::Error;

use super::key::TemplateKey;

/// Number of source lines shown around a parse error.
const CONTEXT_LINES: usize = 3;

/// Errors produced while resolving, compiling or rendering templates.
#[derive(Debug, Error)]
pub enum ViewError {
    /// No source provider has the template.
    #[error("Template '{name}' was not found in the project templates or the bundled defaults")]
    TemplateNotFound {
        name: TemplateKey,
        /// Similarly named templates that do exist
        suggestions: Vec<String>,
    },

    /// The engine rejected the template source.
    #[error("Failed to parse template '{name}': {message}")]
    TemplateParse {
        name: TemplateKey,
        message: String,
        /// 1-based line of the failure, when the engine reports one
        line: Option<usize>,
    },

    /// Executing a compiled template failed (missing variable, filter error, ...).
    #[error("Failed to render template '{name}': {message}")]
    TemplateRender { name: TemplateKey, message: String },

    /// The side-data supplier of a layout failed; the page is not rendered.
    #[error("Layout data provider for '{layout}' failed: {source}")]
    LayoutSideData {
        layout: String,
        #[source]
        source: anyhow::Error,
    },

    /// A layout data provider returned a key owned by the renderer.
    #[error("Layout data provider for '{layout}' returned reserved key '{key}'")]
    ReservedKey { layout: String, key: String },

    /// A page was requested with a layout id that was never registered.
    #[error("Layout '{0}' is not registered")]
    UnknownLayout(String),

    /// The pipeline was configured inconsistently.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The model could not be turned into template values.
    #[error("Model could not be converted into template values: {0}")]
    InvalidModel(#[from] serde_json::Error),

    /// Reading template sources or writing ejected components failed.
    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ViewError {
    /// Build an I/O error for `path`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// The template this error refers to, if any.
    pub fn template(&self) -> Option<&TemplateKey> {
        match self {
            Self::TemplateNotFound { name, .. }
            | Self::TemplateParse { name, .. }
            | Self::TemplateRender { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::TemplateNotFound { .. })
    }

    pub fn is_parse_error(&self) -> bool {
        matches!(self, Self::TemplateParse { .. })
    }

    /// Render a developer-facing, plain-text report of the error.
    ///
    /// When `source` is the text of the failing template and the error carries
    /// a line number, the surrounding lines are included with the failing line
    /// marked.
    pub fn format_with_context(&self, source: Option<&str>) -> String {
        let mut msg = String::new();

        match self {
            Self::TemplateParse { name, message, line } => {
                msg.push_str("ERROR: Template Parse Error\n\n");
                msg.push_str(&format!("Template: {}\n", name));
                if let Some(line) = line {
                    msg.push_str(&format!("Line: {}\n", line));
                }
                msg.push_str(&format!("Error: {}\n", message));

                if let Some(source) = source {
                    let lines = extract_context_lines(source, line.unwrap_or(0), CONTEXT_LINES);
                    if !lines.is_empty() {
                        msg.push('\n');
                        for (number, text) in lines {
                            let marker = if Some(number) == *line {
                                ">"
                            } else {
                                " "
                            };
                            msg.push_str(&format!("{} {:>4} | {}\n", marker, number, text));
                        }
                    }
                }

                msg.push_str("\nSUGGESTION: Check for unclosed {{ }} or {% %} delimiters,\n");
                msg.push_str("unknown tags and filters, and missing quotes around strings.\n");
            }
            Self::TemplateNotFound { name, suggestions } => {
                msg.push_str("ERROR: Template Not Found\n\n");
                msg.push_str(&format!("Template: {}\n", name));
                if !suggestions.is_empty() {
                    msg.push_str("\nDid you mean one of these?\n");
                    for suggestion in suggestions {
                        msg.push_str(&format!("  - {}\n", suggestion));
                    }
                }
            }
            other => {
                msg.push_str(&format!("ERROR: {}\n", other));
            }
        }

        msg
    }
}

/// Extract up to `context_size` lines before and after `error_line` (1-based),
/// paired with their line numbers.
pub(crate) fn extract_context_lines(
    content: &str,
    error_line: usize,
    context_size: usize,
) -> Vec<(usize, String)> {
    let lines: Vec<&str> = content.lines().collect();
    let total_lines = lines.len();

    if error_line == 0 || error_line > total_lines {
        return Vec::new();
    }

    let start = error_line.saturating_sub(context_size + 1);
    let end = (error_line + context_size).min(total_lines);

    lines[start..end]
        .iter()
        .enumerate()
        .map(|(idx, line)| (start + idx + 1, line.trim_end_matches('\r').to_string()))
        .collect()
}
