//! Provider kinds and their metadata.

use serde::{Deserialize, Serialize};

use crate::error::{QuotaError, Result};

// =============================================================================
// Provider Enum
// =============================================================================

/// Provider kinds the aggregation engine knows how to query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderKind {
    Codex,
    Claude,
    GeminiCli,
    Antigravity,
    Kiro,
}

/// Shape of the normalized view a provider produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaStyle {
    /// Rolling usage windows with a used percentage.
    Windowed,
    /// Per-model buckets grouped by family.
    Bucketed,
    /// Fixed catalog of model groups, probed across endpoints.
    Grouped,
    /// Pre-computed snapshots from the backend aggregate.
    Simple,
}

impl ProviderKind {
    /// All providers in display order.
    pub const ALL: &'static [Self] = &[
        Self::Codex,
        Self::Claude,
        Self::GeminiCli,
        Self::Antigravity,
        Self::Kiro,
    ];

    /// CLI name for this provider.
    #[must_use]
    pub const fn cli_name(self) -> &'static str {
        match self {
            Self::Codex => "codex",
            Self::Claude => "claude",
            Self::GeminiCli => "gemini-cli",
            Self::Antigravity => "antigravity",
            Self::Kiro => "kiro",
        }
    }

    /// Display name for human output.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Codex => "Codex",
            Self::Claude => "Claude",
            Self::GeminiCli => "Gemini CLI",
            Self::Antigravity => "Antigravity",
            Self::Kiro => "Kiro",
        }
    }

    /// Credential `type` values that belong to this provider.
    #[must_use]
    pub const fn credential_types(self) -> &'static [&'static str] {
        match self {
            Self::Codex => &["codex"],
            Self::Claude => &["claude"],
            Self::GeminiCli => &["gemini-cli", "gemini_cli", "gemini"],
            Self::Antigravity => &["antigravity"],
            Self::Kiro => &["kiro"],
        }
    }

    /// Which normalized view this provider yields.
    #[must_use]
    pub const fn style(self) -> QuotaStyle {
        match self {
            Self::Codex | Self::Claude => QuotaStyle::Windowed,
            Self::GeminiCli => QuotaStyle::Bucketed,
            Self::Antigravity => QuotaStyle::Grouped,
            Self::Kiro => QuotaStyle::Simple,
        }
    }

    /// Parse from CLI argument or credential type.
    ///
    /// # Errors
    ///
    /// Returns [`QuotaError::UnsupportedProvider`] for unknown names.
    pub fn from_cli_name(name: &str) -> Result<Self> {
        Self::parse(name).ok_or_else(|| QuotaError::UnsupportedProvider(name.trim().to_string()))
    }

    /// Parse, returning `None` for unknown names.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        let lower = name.trim().to_lowercase();
        Self::ALL
            .iter()
            .find(|p| p.cli_name() == lower || p.credential_types().contains(&lower.as_str()))
            .copied()
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.cli_name())
    }
}
