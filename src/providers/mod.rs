//! Provider-specific quota fetchers.
//!
//! Each provider turns a credential record into one management `api-call`
//! (or a probe sequence of them) and parses the upstream body into a
//! [`ProviderQuota`](crate::core::models::ProviderQuota) view. Kiro is the
//! exception: it reads pre-computed snapshots from the backend aggregate.

pub mod antigravity;
pub mod claude;
pub mod codex;
pub mod gemini_cli;
pub mod kiro;
