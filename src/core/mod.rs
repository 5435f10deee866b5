//! Core data models, credential resolution, and the aggregation engine.

pub mod credentials;
pub mod http;
pub mod logging;
pub mod models;
pub mod pipeline;
pub mod probe;
pub mod provider;

pub use credentials::{CredentialRecord, resolve_display_name, result_key};
pub use http::{
    ApiCallRequest, ApiCallResponse, ApiCallTransport, CredentialSource, HttpMethod,
    KiroQuotaSource, ManagementClient,
};
pub use models::{
    AccountQuotaResult, AggregationRun, BucketGroup, KiroStatus, KiroUsage, ModelGroup,
    ProviderQuota, QuotaStatus, QuotaWindow, RobotOutput, WindowedQuota,
};
pub use pipeline::{Aggregator, ProviderSelector, select_accounts};
pub use probe::{ProbeAttempt, ProbeCandidate, ProbeOutcome, ProbePlan};
pub use provider::{ProviderKind, QuotaStyle};
