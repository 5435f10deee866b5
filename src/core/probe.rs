//! Sequential endpoint/payload probing.
//!
//! Some providers expose the same quota data on several hosts and accept
//! more than one request body spelling. A [`ProbePlan`] lists every
//! {endpoint x payload} pair in order; [`run`] tries them one at a time and
//! stops at the first success. Only the last failure is kept for reporting.

use std::future::Future;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde_json::Value;

use super::models::GENERIC_FAILURE;
use crate::error::{QuotaError, Result};

// =============================================================================
// Probe Candidate
// =============================================================================

/// One endpoint/payload pair.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeCandidate {
    pub url: String,
    pub body: Value,
}

// =============================================================================
// Probe Plan
// =============================================================================

/// Ordered candidates for one provider.
#[derive(Debug, Clone)]
pub struct ProbePlan {
    pub provider: &'static str,
    pub candidates: Vec<ProbeCandidate>,
}

impl ProbePlan {
    /// Cross product of `urls` and `bodies`, URL-major: every body is tried
    /// against the first URL before moving on to the next one.
    #[must_use]
    pub fn new(provider: &'static str, urls: &[&str], bodies: &[Value]) -> Self {
        let candidates = urls
            .iter()
            .flat_map(|url| {
                bodies.iter().map(move |body| ProbeCandidate {
                    url: (*url).to_string(),
                    body: body.clone(),
                })
            })
            .collect();
        Self {
            provider,
            candidates,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

// =============================================================================
// Probe Attempt
// =============================================================================

/// Record of a single probe.
#[derive(Debug, Clone)]
pub struct ProbeAttempt {
    pub url: String,
    pub body: Value,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub success: bool,
    pub error: Option<String>,
}

// =============================================================================
// Probe Outcome
// =============================================================================

/// Result of running a probe plan.
#[derive(Debug)]
pub struct ProbeOutcome<T> {
    pub result: Result<T>,
    pub attempts: Vec<ProbeAttempt>,
}

impl<T> ProbeOutcome<T> {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    /// Candidate that produced the success, if any.
    #[must_use]
    pub fn winning_attempt(&self) -> Option<&ProbeAttempt> {
        self.attempts.iter().find(|a| a.success)
    }
}

/// Try each candidate in order until one succeeds.
///
/// `attempt` decides what success means; any `Err` it returns moves on to the
/// next candidate. When every candidate fails, the outcome is
/// [`QuotaError::ProbeExhausted`] carrying the message of the last transport
/// or non-2xx failure. Payload rejections move on without replacing it.
pub async fn run<T, F, Fut>(plan: &ProbePlan, mut attempt: F) -> ProbeOutcome<T>
where
    F: FnMut(ProbeCandidate) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempts = Vec::with_capacity(plan.len());
    let mut last_error: Option<String> = None;

    for (index, candidate) in plan.candidates.iter().enumerate() {
        let started_at = Utc::now();
        let timer = Instant::now();
        let result = attempt(candidate.clone()).await;
        let duration_ms = u64::try_from(timer.elapsed().as_millis()).unwrap_or(u64::MAX);

        match result {
            Ok(value) => {
                tracing::debug!(
                    provider = plan.provider,
                    url = %candidate.url,
                    attempt = index + 1,
                    duration_ms,
                    "Probe succeeded"
                );
                attempts.push(ProbeAttempt {
                    url: candidate.url.clone(),
                    body: candidate.body.clone(),
                    started_at,
                    duration_ms,
                    success: true,
                    error: None,
                });
                return ProbeOutcome {
                    result: Ok(value),
                    attempts,
                };
            }
            Err(err) => {
                let message = err.to_string();
                tracing::debug!(
                    provider = plan.provider,
                    url = %candidate.url,
                    attempt = index + 1,
                    duration_ms,
                    error = %message,
                    "Probe failed, trying next candidate"
                );
                attempts.push(ProbeAttempt {
                    url: candidate.url.clone(),
                    body: candidate.body.clone(),
                    started_at,
                    duration_ms,
                    success: false,
                    error: Some(message.clone()),
                });
                if err.is_upstream_failure() && !message.trim().is_empty() {
                    last_error = Some(message);
                }
            }
        }
    }

    tracing::warn!(
        provider = plan.provider,
        attempts = attempts.len(),
        "All probe candidates failed"
    );

    ProbeOutcome {
        result: Err(QuotaError::ProbeExhausted {
            provider: plan.provider.to_string(),
            message: last_error.unwrap_or_else(|| GENERIC_FAILURE.to_string()),
        }),
        attempts,
    }
}
