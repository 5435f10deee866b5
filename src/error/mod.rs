//! Error types for quota-agg.
//!
//! Uses `thiserror` for structured error types that map to exit codes.
//!
//! ## Error Taxonomy
//!
//! Account-level failures fall into five groups, all of them non-fatal to
//! the aggregation run:
//! - **Input**: a required identifier could not be resolved from a credential
//! - **Network**: the transport rejected the call or timed out
//! - **Upstream**: the provider answered with a non-2xx status, an empty
//!   payload, or no usable data on any probed endpoint
//! - **Configuration**: unsupported provider kinds, bad config files
//! - **Internal**: I/O, JSON, and unclassified errors
//!
//! Each error has a stable error code (e.g., `QA-U001`) for programmatic handling.

use thiserror::Error;

// =============================================================================
// Error Categories
// =============================================================================

/// High-level error categories for classification and routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Missing identifiers on a credential record.
    Input,
    /// Transport failures (timeout, connection, DNS).
    Network,
    /// Provider responses that could not be turned into a quota view.
    Upstream,
    /// Configuration issues (unsupported provider, config file errors).
    Configuration,
    /// Internal errors (bugs, unexpected state, unclassified).
    Internal,
}

impl ErrorCategory {
    /// Returns a human-readable description of the category.
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::Input => "Input error",
            Self::Network => "Network error",
            Self::Upstream => "Upstream error",
            Self::Configuration => "Configuration error",
            Self::Internal => "Internal error",
        }
    }

    /// Returns a short code prefix for this category.
    #[must_use]
    pub const fn code_prefix(&self) -> &'static str {
        match self {
            Self::Input => "I",
            Self::Network => "N",
            Self::Upstream => "U",
            Self::Configuration => "C",
            Self::Internal => "X",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

// =============================================================================
// Exit Codes
// =============================================================================

/// Process exit codes for the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    /// Success
    Success = 0,
    /// Unexpected failure
    GeneralError = 1,
    /// Config errors, unsupported provider
    ConfigError = 2,
    /// Upstream or parse failures
    UpstreamError = 3,
    /// Timeout
    Timeout = 4,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as Self
    }
}

/// Main error type for quota-agg operations.
#[derive(Error, Debug)]
pub enum QuotaError {
    // ==========================================================================
    // Input errors (Category: Input)
    // ==========================================================================
    /// A required identifier could not be resolved from the credential.
    #[error("missing {field} for {provider} credential")]
    MissingInput { provider: String, field: String },

    // ==========================================================================
    // Network errors (Category: Network)
    // ==========================================================================
    /// Generic transport failure.
    #[error("network error: {0}")]
    Network(String),

    /// Request timeout.
    #[error("request timeout after {0} seconds")]
    Timeout(u64),

    // ==========================================================================
    // Upstream errors (Category: Upstream)
    // ==========================================================================
    /// Provider answered with a status outside 2xx.
    #[error("{message}")]
    UpstreamRejected {
        provider: String,
        status: u16,
        message: String,
    },

    /// 2xx response without the fields the parser needs.
    #[error("empty response from {provider}: {reason}")]
    EmptyPayload { provider: String, reason: String },

    /// Every endpoint/payload combination was tried without success.
    #[error("{message}")]
    ProbeExhausted { provider: String, message: String },

    /// The aggregate backend has no snapshot for this account.
    #[error("no quota information found for {0}")]
    NoQuotaInfo(String),

    /// The stored credential has expired.
    #[error("{message}")]
    TokenExpired { account: String, message: String },

    /// The backend aggregate reported a failed query for this account.
    #[error("{message}")]
    QueryFailed { account: String, message: String },

    // ==========================================================================
    // Configuration errors (Category: Configuration)
    // ==========================================================================
    /// Provider kind is not one of the supported kinds.
    #[error("unsupported provider: {0}")]
    UnsupportedProvider(String),

    /// Generic configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Error parsing configuration file.
    #[error("config parse error at {path}: {message}")]
    ConfigParse { path: String, message: String },

    /// Management API rejected a request made by this tool itself.
    #[error("management API error (HTTP {status}): {message}")]
    Management { status: u16, message: String },

    // ==========================================================================
    // Internal errors (Category: Internal)
    // ==========================================================================
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Catch-all for other errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl QuotaError {
    /// Shorthand for [`QuotaError::MissingInput`].
    pub fn missing(provider: impl Into<String>, field: impl Into<String>) -> Self {
        Self::MissingInput {
            provider: provider.into(),
            field: field.into(),
        }
    }

    /// Shorthand for [`QuotaError::EmptyPayload`].
    pub fn empty(provider: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::EmptyPayload {
            provider: provider.into(),
            reason: reason.into(),
        }
    }

    /// Map error to a CLI exit code.
    #[must_use]
    pub const fn exit_code(&self) -> ExitCode {
        match self {
            Self::UnsupportedProvider(_)
            | Self::Config(_)
            | Self::ConfigParse { .. }
            | Self::MissingInput { .. } => ExitCode::ConfigError,

            Self::UpstreamRejected { .. }
            | Self::EmptyPayload { .. }
            | Self::ProbeExhausted { .. }
            | Self::NoQuotaInfo(_)
            | Self::TokenExpired { .. }
            | Self::QueryFailed { .. }
            | Self::Management { .. } => ExitCode::UpstreamError,

            Self::Timeout(_) => ExitCode::Timeout,

            Self::Network(_) | Self::Io(_) | Self::Json(_) | Self::Other(_) => {
                ExitCode::GeneralError
            }
        }
    }

    /// Returns the error category for classification and routing.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::MissingInput { .. } => ErrorCategory::Input,

            Self::Network(_) | Self::Timeout(_) => ErrorCategory::Network,

            Self::UpstreamRejected { .. }
            | Self::EmptyPayload { .. }
            | Self::ProbeExhausted { .. }
            | Self::NoQuotaInfo(_)
            | Self::TokenExpired { .. }
            | Self::QueryFailed { .. } => ErrorCategory::Upstream,

            Self::UnsupportedProvider(_)
            | Self::Config(_)
            | Self::ConfigParse { .. }
            | Self::Management { .. } => ErrorCategory::Configuration,

            Self::Io(_) | Self::Json(_) | Self::Other(_) => ErrorCategory::Internal,
        }
    }

    /// Returns a stable error code for programmatic handling.
    ///
    /// Format: `QA-{category}{number}`.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::MissingInput { .. } => "QA-I001",

            Self::Network(_) => "QA-N001",
            Self::Timeout(_) => "QA-N002",

            Self::UpstreamRejected { .. } => "QA-U001",
            Self::EmptyPayload { .. } => "QA-U002",
            Self::ProbeExhausted { .. } => "QA-U003",
            Self::NoQuotaInfo(_) => "QA-U004",
            Self::TokenExpired { .. } => "QA-U005",
            Self::QueryFailed { .. } => "QA-U006",

            Self::UnsupportedProvider(_) => "QA-C001",
            Self::Config(_) => "QA-C002",
            Self::ConfigParse { .. } => "QA-C003",
            Self::Management { .. } => "QA-C004",

            Self::Io(_) => "QA-X001",
            Self::Json(_) => "QA-X002",
            Self::Other(_) => "QA-X099",
        }
    }

    /// Whether a later, manually triggered run might succeed.
    ///
    /// The aggregation engine never retries on its own; this is surfaced to
    /// the renderer only.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::Timeout(_) | Self::ProbeExhausted { .. }
        ) || matches!(self, Self::UpstreamRejected { status, .. } if *status == 429 || *status >= 500)
    }

    /// Whether the failure came from the wire: a transport error or a non-2xx
    /// upstream answer. Local payload rejections are not.
    #[must_use]
    pub const fn is_upstream_failure(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::Timeout(_) | Self::UpstreamRejected { .. }
        )
    }

    /// Returns the provider name if this error is provider-specific.
    #[must_use]
    pub fn provider(&self) -> Option<&str> {
        match self {
            Self::MissingInput { provider, .. }
            | Self::UpstreamRejected { provider, .. }
            | Self::EmptyPayload { provider, .. }
            | Self::ProbeExhausted { provider, .. } => Some(provider),
            Self::UnsupportedProvider(p) => Some(p),
            _ => None,
        }
    }
}

/// Result type alias for quota-agg operations.
pub type Result<T> = std::result::Result<T, QuotaError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn all_variants() -> Vec<QuotaError> {
        vec![
            QuotaError::missing("codex", "chatgpt_account_id"),
            QuotaError::Network("connection reset".to_string()),
            QuotaError::Timeout(30),
            QuotaError::UpstreamRejected {
                provider: "codex".to_string(),
                status: 401,
                message: "unauthorized".to_string(),
            },
            QuotaError::empty("codex", "empty body"),
            QuotaError::ProbeExhausted {
                provider: "antigravity".to_string(),
                message: "quota fetch failed".to_string(),
            },
            QuotaError::NoQuotaInfo("alice".to_string()),
            QuotaError::TokenExpired {
                account: "alice".to_string(),
                message: "token expired".to_string(),
            },
            QuotaError::QueryFailed {
                account: "bob".to_string(),
                message: "quota query failed".to_string(),
            },
            QuotaError::UnsupportedProvider("qwen".to_string()),
            QuotaError::Config("bad".to_string()),
            QuotaError::ConfigParse {
                path: "/tmp/config.toml".to_string(),
                message: "expected table".to_string(),
            },
            QuotaError::Management {
                status: 401,
                message: "invalid management key".to_string(),
            },
            QuotaError::Io(std::io::Error::other("io")),
            QuotaError::Json(serde_json::from_str::<serde_json::Value>("{").unwrap_err()),
            QuotaError::Other(anyhow::anyhow!("other")),
        ]
    }

    #[test]
    fn error_codes_follow_format() {
        for err in all_variants() {
            let code = err.error_code();
            assert!(code.starts_with("QA-"), "bad code {code}");
            let prefix = err.category().code_prefix();
            assert_eq!(&code[3..4], prefix, "code {code} does not match category");
        }
    }

    #[test]
    fn error_codes_are_unique() {
        let mut codes: Vec<_> = all_variants().iter().map(QuotaError::error_code).collect();
        let total = codes.len();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), total);
    }

    #[test]
    fn every_error_renders_a_non_empty_message() {
        for err in all_variants() {
            assert!(!err.to_string().trim().is_empty(), "{err:?}");
        }
    }

    #[test]
    fn upstream_rejection_displays_upstream_message_verbatim() {
        let err = QuotaError::UpstreamRejected {
            provider: "codex".to_string(),
            status: 403,
            message: "workspace deactivated".to_string(),
        };
        assert_eq!(err.to_string(), "workspace deactivated");
    }

    #[test]
    fn missing_input_names_the_field() {
        let err = QuotaError::missing("codex", "auth_index");
        assert!(err.to_string().contains("auth_index"));
        assert_eq!(err.category(), ErrorCategory::Input);
        assert_eq!(err.provider(), Some("codex"));
    }

    #[test]
    fn retryable_errors() {
        assert!(QuotaError::Timeout(5).is_retryable());
        assert!(QuotaError::Network("x".to_string()).is_retryable());
        assert!(
            QuotaError::UpstreamRejected {
                provider: "codex".to_string(),
                status: 503,
                message: "busy".to_string(),
            }
            .is_retryable()
        );
        assert!(
            !QuotaError::UpstreamRejected {
                provider: "codex".to_string(),
                status: 401,
                message: "nope".to_string(),
            }
            .is_retryable()
        );
        assert!(!QuotaError::missing("codex", "auth_index").is_retryable());
    }

    #[test]
    fn exit_codes_are_correct() {
        assert_eq!(
            QuotaError::UnsupportedProvider("x".to_string()).exit_code(),
            ExitCode::ConfigError
        );
        assert_eq!(QuotaError::Timeout(1).exit_code(), ExitCode::Timeout);
        assert_eq!(
            QuotaError::NoQuotaInfo("a".to_string()).exit_code(),
            ExitCode::UpstreamError
        );
        assert_eq!(i32::from(ExitCode::Success), 0);
    }
}
