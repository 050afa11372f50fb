//! User-facing error presentation for the command-line tool.
//!
//! Library code returns [`ViewError`]; the CLI works with `anyhow::Error` and
//! converts whatever reaches `main` into an [`ErrorContext`] carrying the
//! message, optional details and an actionable suggestion.
//!
//! ```text
//! error: Template 'pages/helo' was not found in the project templates or the bundled defaults
//! details: Did you mean: pages/hello
//! suggestion: Create Templates/pages/helo.html or run `hxview list` to see available templates
//! ```

use colored::Colorize;
use std::fmt;

use crate::templating::ViewError;

/// An error message with optional details and suggestion for CLI display.
#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub message: String,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            suggestion: None,
            details: None,
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print to stderr: error in red, details in yellow, suggestion in green.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.message);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error into an [`ErrorContext`] with suggestions.
///
/// Recognizes [`ViewError`] anywhere in the chain, I/O errors and TOML
/// errors; everything else is shown with its full cause chain.
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    if let Some(view_error) = error.chain().find_map(|e| e.downcast_ref::<ViewError>()) {
        return view_error_context(view_error, &error);
    }

    if let Some(toml_error) = error.downcast_ref::<toml::de::Error>() {
        return ErrorContext::new(with_chain(&error))
            .with_details(toml_error.to_string())
            .with_suggestion("Check the TOML syntax in hxview.toml. Verify quotes, brackets and key names");
    }

    if let Some(io_error) = error.chain().find_map(|e| e.downcast_ref::<std::io::Error>()) {
        let suggestion = match io_error.kind() {
            std::io::ErrorKind::NotFound => {
                Some("Check that the file or directory exists and the path is correct")
            }
            std::io::ErrorKind::PermissionDenied => {
                Some("Check the file permissions and ownership")
            }
            _ => None,
        };
        let context = ErrorContext::new(with_chain(&error));
        return match suggestion {
            Some(suggestion) => context.with_suggestion(suggestion),
            None => context,
        };
    }

    ErrorContext::new(with_chain(&error))
}

fn view_error_context(view_error: &ViewError, error: &anyhow::Error) -> ErrorContext {
    let context = ErrorContext::new(with_chain(error));

    match view_error {
        ViewError::TemplateNotFound { name, suggestions } => {
            let context = context.with_suggestion(format!(
                "Create {} in the project template directory or run `hxview list` to see available templates",
                name.file_name(crate::constants::DEFAULT_TEMPLATE_EXTENSION)
            ));
            if suggestions.is_empty() {
                context
            } else {
                context.with_details(format!("Did you mean: {}", suggestions.join(", ")))
            }
        }
        ViewError::TemplateParse { line, .. } => {
            let context = context.with_suggestion(
                "Check template syntax: variables use {{ var }}, control flow uses {% %}, comments use {# #}",
            );
            match line {
                Some(line) => context.with_details(format!("The parser stopped at line {line}")),
                None => context,
            }
        }
        ViewError::TemplateRender { .. } => context
            .with_suggestion("Make sure every variable the template uses is in the model, or guard it with `is defined`")
            .with_details(
                "Render errors usually come from undefined variables, filter argument errors or type mismatches",
            ),
        ViewError::UnknownLayout(_) => context
            .with_suggestion("Add the layout to `layouts` in hxview.toml or pass a registered layout with --layout"),
        ViewError::ReservedKey { .. } => context.with_details(
            "`content`, `model` and keys starting with `_` are set by the renderer and cannot come from layout data",
        ),
        ViewError::Config(_) => context.with_suggestion("Check hxview.toml and the command-line options"),
        ViewError::InvalidModel(_) => {
            context.with_suggestion("The model must be valid JSON; objects are exposed at the top level")
        }
        ViewError::LayoutSideData { .. } | ViewError::Io { .. } => context,
    }
}

/// Error message followed by its numbered causes.
fn with_chain(error: &anyhow::Error) -> String {
    let mut message = error.to_string();
    let chain: Vec<String> = error.chain().skip(1).map(ToString::to_string).collect();

    if !chain.is_empty() {
        message.push_str("\n\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            message.push_str(&format!("\n  {}: {}", i + 1, cause));
        }
    }
    message
}
