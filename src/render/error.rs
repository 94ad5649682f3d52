//! Error rendering for healthlink.
//!
//! Styled text with fix suggestions for terminals, plain text for pipes and
//! CI, and a structured JSON object for machine consumption.

use colored::Colorize;

use crate::cli::args::OutputFormat;
use crate::error::{FixSuggestion, HealthLinkError};

const WRAP_WIDTH: usize = 68;

// =============================================================================
// Public API
// =============================================================================

/// Render an error for stderr.
///
/// JSON format always yields the structured object. Human format is styled
/// only when colors are allowed and stderr is a terminal.
#[must_use]
pub fn render_error(
    error: &HealthLinkError,
    format: OutputFormat,
    no_color: bool,
    pretty: bool,
) -> String {
    match format {
        OutputFormat::Json => render_error_json(error, pretty),
        OutputFormat::Human => {
            if crate::util::env::should_use_color(no_color, crate::util::env::stderr_is_tty()) {
                render_styled(error)
            } else {
                render_simple(error)
            }
        }
    }
}

/// Render error as structured JSON.
#[must_use]
pub fn render_error_json(error: &HealthLinkError, pretty: bool) -> String {
    let error_json = ErrorJson::from_error(error);
    let rendered = if pretty {
        serde_json::to_string_pretty(&error_json)
    } else {
        serde_json::to_string(&error_json)
    };
    rendered.unwrap_or_else(|_| render_simple(error))
}

// =============================================================================
// Text Rendering
// =============================================================================

/// Error with sections for fixes, context and prevention.
fn render_styled(error: &HealthLinkError) -> String {
    let suggestions = error.fix_suggestions();
    let mut lines = vec![format!(
        "{} {} {}",
        format!("{}:", error.category()).red().bold(),
        error.to_string().red(),
        format!("[{}]", error.error_code()).dimmed()
    )];

    if !suggestions.is_empty() {
        lines.push(String::new());
        lines.push("How to fix:".bold().to_string());
        lines.extend(suggestion_lines(&suggestions, |cmd| cmd.cyan().to_string()));
    }

    if let Some(first) = suggestions.first() {
        if !first.context.is_empty() {
            lines.push(String::new());
            lines.push("Why this happened:".bold().to_string());
            lines.extend(wrap_text(&first.context, WRAP_WIDTH).into_iter().map(|l| format!("  {l}")));
        }
        if let Some(prevention) = &first.prevention {
            lines.push(String::new());
            lines.push("Prevention:".green().to_string());
            lines.extend(wrap_text(prevention, WRAP_WIDTH).into_iter().map(|l| format!("  {l}")));
        }
    }

    lines.join("\n")
}

/// Error as plain text (no ANSI codes).
fn render_simple(error: &HealthLinkError) -> String {
    let mut lines = vec![format!("Error [{}]: {}", error.error_code(), error)];

    let fix = error
        .fix_suggestions()
        .into_iter()
        .flat_map(|s| s.commands)
        .find(|cmd| !cmd.starts_with('#'));
    if let Some(cmd) = fix {
        lines.push(format!("Fix: {cmd}"));
    }

    lines.join("\n")
}

fn suggestion_lines(
    suggestions: &[FixSuggestion],
    style: impl Fn(&str) -> String,
) -> Vec<String> {
    let mut lines = Vec::new();
    for (i, suggestion) in suggestions.iter().enumerate() {
        for (j, cmd) in suggestion.commands.iter().enumerate() {
            let prefix = if j == 0 {
                format!("  {}. ", i + 1)
            } else {
                "     Or: ".to_string()
            };
            lines.push(format!("{prefix}{}", style(cmd)));
        }
    }
    lines
}

fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if current.is_empty() {
            current = word.to_string();
        } else if current.len() + 1 + word.len() <= width {
            current.push(' ');
            current.push_str(word);
        } else {
            lines.push(std::mem::take(&mut current));
            current = word.to_string();
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

// =============================================================================
// JSON Rendering
// =============================================================================

/// JSON representation of an error for machine consumption.
#[derive(serde::Serialize)]
struct ErrorJson {
    error_code: String,
    category: String,
    message: String,
    is_retryable: bool,
    exit_code: i32,
    suggestions: Vec<SuggestionJson>,
}

#[derive(serde::Serialize)]
struct SuggestionJson {
    commands: Vec<String>,
    context: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    prevention: Option<String>,
}

impl ErrorJson {
    fn from_error(error: &HealthLinkError) -> Self {
        Self {
            error_code: error.error_code().to_string(),
            category: error.category().to_string(),
            message: error.to_string(),
            is_retryable: error.is_retryable(),
            exit_code: error.exit_code().into(),
            suggestions: error
                .fix_suggestions()
                .into_iter()
                .map(|s| SuggestionJson {
                    commands: s.commands,
                    context: s.context,
                    prevention: s.prevention,
                })
                .collect(),
        }
    }
}
