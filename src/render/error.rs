//! Error rendering.
//!
//! Human mode prints a colored one-line message with its error code; JSON
//! modes print a structured object for machine consumption.

use colored::Colorize;
use serde::Serialize;

use crate::cli::args::OutputFormat;
use crate::error::QuotaError;

/// Render an error for stderr.
#[must_use]
pub fn render_error(error: &QuotaError, format: OutputFormat, no_color: bool, pretty: bool) -> String {
    match format {
        OutputFormat::Json => render_error_json(error, pretty),
        OutputFormat::Human => render_simple(error, no_color),
    }
}

/// Render an error as structured JSON.
#[must_use]
pub fn render_error_json(error: &QuotaError, pretty: bool) -> String {
    let error_json = ErrorJson::from_error(error);
    let rendered = if pretty {
        serde_json::to_string_pretty(&error_json)
    } else {
        serde_json::to_string(&error_json)
    };
    rendered.unwrap_or_else(|_| render_simple(error, true))
}

fn render_simple(error: &QuotaError, no_color: bool) -> String {
    let code = format!("[{}]", error.error_code());
    if no_color {
        format!("Error: {error} {code}")
    } else {
        format!("{} {error} {}", "Error:".red().bold(), code.dimmed())
    }
}

/// JSON representation of an error.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorJson {
    error_code: &'static str,
    category: String,
    message: String,
    is_retryable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    provider: Option<String>,
}

impl ErrorJson {
    fn from_error(error: &QuotaError) -> Self {
        Self {
            error_code: error.error_code(),
            category: error.category().to_string(),
            message: error.to_string(),
            is_retryable: error.is_retryable(),
            provider: error.provider().map(String::from),
        }
    }
}
