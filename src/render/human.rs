//! Human-readable output using colored.
//!
//! Renders one block per account: windows with used percentage and reset
//! label, bucket and group fractions, or Kiro usage numbers.

use colored::{ColoredString, Colorize};

use crate::core::credentials::{CredentialRecord, resolve_auth_index};
use crate::core::models::{
    AccountQuotaResult, AggregationRun, BucketGroup, KiroUsage, ModelGroup, ProviderQuota,
    QuotaStatus, WindowedQuota,
};
use crate::core::provider::ProviderKind;
use crate::error::Result;
use crate::util::format::{format_amount, format_fraction, format_used_percent};
use crate::util::normalize::normalize_string;

const LABEL_WIDTH: usize = 22;

/// Apply a style unless color is disabled.
fn paint(text: &str, no_color: bool, style: impl FnOnce(ColoredString) -> ColoredString) -> String {
    if no_color {
        text.to_string()
    } else {
        style(text.normal()).to_string()
    }
}

/// Color for a consumed percentage.
fn used_style(used: Option<f64>) -> impl FnOnce(ColoredString) -> ColoredString {
    move |s: ColoredString| match used {
        Some(p) if p >= 90.0 => s.red().bold(),
        Some(p) if p >= 75.0 => s.yellow(),
        Some(_) => s.green(),
        None => s.dimmed(),
    }
}

/// Color for a remaining fraction.
fn remaining_style(fraction: Option<f64>) -> impl FnOnce(ColoredString) -> ColoredString {
    move |s: ColoredString| match fraction {
        Some(f) if f < 0.10 => s.red().bold(),
        Some(f) if f < 0.25 => s.yellow(),
        Some(_) => s.green(),
        None => s.dimmed(),
    }
}

/// Render an aggregation run for human consumption.
pub fn render_quota(run: &AggregationRun, no_color: bool) -> Result<String> {
    let title = ProviderKind::parse(&run.provider)
        .map_or_else(|| run.provider.clone(), |k| k.display_name().to_string());

    let mut output = String::new();
    output.push_str(&paint(&format!("{title} quota"), no_color, |s| {
        s.bold().cyan()
    }));
    output.push_str(&paint(
        &format!(
            "  ({} accounts, {} ok, {} failed)",
            run.results.len(),
            run.succeeded(),
            run.failed()
        ),
        no_color,
        |s| s.dimmed(),
    ));
    output.push('\n');

    if run.results.is_empty() {
        output.push_str(&paint("No accounts found", no_color, |s| s.dimmed()));
        output.push('\n');
        return Ok(output);
    }

    for result in &run.results {
        output.push('\n');
        output.push_str(&render_account(result, no_color));
    }

    Ok(output)
}

fn render_account(result: &AccountQuotaResult, no_color: bool) -> String {
    let mut lines = Vec::new();

    let (marker, marker_style): (&str, fn(ColoredString) -> ColoredString) = match &result.status
    {
        QuotaStatus::Success { .. } => ("●", |s| s.green()),
        QuotaStatus::Error { .. } => ("✗", |s| s.red()),
        QuotaStatus::Idle | QuotaStatus::Loading => ("○", |s| s.dimmed()),
    };

    let mut header = format!(
        "{} {}",
        paint(marker, no_color, marker_style),
        paint(&result.account_name, no_color, |s| s.bold())
    );
    if let Some(ProviderQuota::Codex(w) | ProviderQuota::Claude(w)) = result.status.data() {
        if let Some(plan) = &w.plan_type {
            header.push_str(&paint(&format!("  [{plan}]"), no_color, |s| s.magenta()));
        }
    }
    lines.push(header);

    match &result.status {
        QuotaStatus::Success { data } => lines.extend(render_quota_lines(data, no_color)),
        QuotaStatus::Error { error } => {
            lines.push(format!(
                "    {}",
                paint(&format!("error: {error}"), no_color, |s| s.red())
            ));
        }
        QuotaStatus::Idle | QuotaStatus::Loading => {
            lines.push(format!("    {}", paint(result.status.label(), no_color, |s| s.dimmed())));
        }
    }

    let mut block = lines.join("\n");
    block.push('\n');
    block
}

fn render_quota_lines(data: &ProviderQuota, no_color: bool) -> Vec<String> {
    match data {
        ProviderQuota::Codex(w) | ProviderQuota::Claude(w) => render_windows(w, no_color),
        ProviderQuota::GeminiCli(groups) => render_buckets(groups, no_color),
        ProviderQuota::Antigravity(groups) => render_model_groups(groups, no_color),
        ProviderQuota::Kiro(usage) => render_kiro(usage, no_color),
    }
}

fn render_windows(quota: &WindowedQuota, no_color: bool) -> Vec<String> {
    quota
        .windows
        .iter()
        .map(|window| {
            let used = format!("{:>5} used", format_used_percent(window.used_percent));
            format!(
                "    {:<LABEL_WIDTH$} {}  {}",
                window.label,
                paint(&used, no_color, used_style(window.used_percent)),
                paint(&window.reset_label, no_color, |s| s.dimmed())
            )
        })
        .collect()
}

fn render_buckets(groups: &[BucketGroup], no_color: bool) -> Vec<String> {
    groups
        .iter()
        .map(|group| {
            let left = format!("{:>5} left", format_fraction(group.remaining_fraction));
            let mut line = format!(
                "    {:<LABEL_WIDTH$} {}",
                group.label,
                paint(&left, no_color, remaining_style(group.remaining_fraction))
            );
            if let Some(amount) = group.remaining_amount {
                line.push_str(&format!("  ({})", format_amount(amount)));
            }
            if let Some(reset) = &group.reset_time {
                line.push_str(&format!("  {}", paint(reset, no_color, |s| s.dimmed())));
            }
            line
        })
        .collect()
}

fn render_model_groups(groups: &[ModelGroup], no_color: bool) -> Vec<String> {
    groups
        .iter()
        .map(|group| {
            let fraction = Some(group.remaining_fraction);
            let left = format!("{:>5} left", format_fraction(fraction));
            let mut line = format!(
                "    {:<LABEL_WIDTH$} {}",
                group.label,
                paint(&left, no_color, remaining_style(fraction))
            );
            if let Some(reset) = &group.reset_time {
                line.push_str(&format!("  {}", paint(reset, no_color, |s| s.dimmed())));
            }
            line
        })
        .collect()
}

fn render_kiro(usage: &KiroUsage, no_color: bool) -> Vec<String> {
    let fraction = (usage.usage_limit > 0.0).then(|| usage.remaining() / usage.usage_limit);
    let mut lines = vec![format!(
        "    {:<LABEL_WIDTH$} {} / {}  {}",
        usage.subscription_title.as_deref().unwrap_or("usage"),
        format_amount(usage.current_usage),
        format_amount(usage.usage_limit),
        paint(
            &format!("{} left", format_amount(usage.remaining())),
            no_color,
            remaining_style(fraction)
        )
    )];
    if let Some(email) = &usage.email {
        lines.push(format!("    {}", paint(email, no_color, |s| s.dimmed())));
    }
    if let Some(reset) = &usage.next_reset {
        lines.push(format!(
            "    {}",
            paint(&format!("resets {reset}"), no_color, |s| s.dimmed())
        ));
    }
    lines
}

/// Render the credential list.
pub fn render_accounts(records: &[CredentialRecord], no_color: bool) -> Result<String> {
    if records.is_empty() {
        return Ok("No credentials stored in the proxy.\n".to_string());
    }

    let mut output = String::new();
    output.push_str(&paint(
        &format!("{:<32} {:<14} {:<28} {}", "Name", "Provider", "Account", "Auth index"),
        no_color,
        |s| s.bold(),
    ));
    output.push('\n');
    output.push_str(&format!("{:-<32} {:-<14} {:-<28} {:-<12}\n", "", "", "", ""));

    for record in records {
        let account = ["email", "account"]
            .into_iter()
            .find_map(|key| record.get(key).and_then(normalize_string))
            .unwrap_or_else(|| "-".to_string());
        output.push_str(&format!(
            "{:<32} {:<14} {:<28} {}\n",
            record.name().unwrap_or_else(|| "-".to_string()),
            record.credential_type().unwrap_or_else(|| "-".to_string()),
            account,
            resolve_auth_index(record).unwrap_or_else(|| "-".to_string()),
        ));
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::QuotaWindow;
    use chrono::Utc;
    use serde_json::json;

    fn run(results: Vec<AccountQuotaResult>) -> AggregationRun {
        AggregationRun {
            run_id: 1,
            provider: "codex".to_string(),
            started_at: Utc::now(),
            finished_at: Utc::now(),
            results,
        }
    }

    fn settled(id: &str, outcome: Result<ProviderQuota>) -> AccountQuotaResult {
        let mut result = AccountQuotaResult::new(id, id);
        result.begin();
        result.settle(outcome);
        result
    }

    #[test]
    fn windows_and_errors_render_without_color() {
        let quota = ProviderQuota::Codex(WindowedQuota {
            plan_type: Some("plus".to_string()),
            windows: vec![QuotaWindow {
                id: "five-hour".to_string(),
                label: "5小时限额".to_string(),
                used_percent: Some(42.0),
                reset_label: "1小时30分后".to_string(),
            }],
        });
        let output = render_quota(
            &run(vec![
                settled("alice.json", Ok(quota)),
                settled(
                    "bob.json",
                    Err(crate::error::QuotaError::missing("codex", "auth_index")),
                ),
            ]),
            true,
        )
        .unwrap();

        assert!(output.starts_with("Codex quota"));
        assert!(output.contains("2 accounts, 1 ok, 1 failed"));
        assert!(output.contains("[plus]"));
        assert!(output.contains("42% used"));
        assert!(output.contains("1小时30分后"));
        assert!(output.contains("error: missing auth_index for codex credential"));
        assert!(!output.contains("\x1b["));
    }

    #[test]
    fn empty_run_says_so() {
        let output = render_quota(&run(vec![]), true).unwrap();
        assert!(output.contains("No accounts found"));
    }

    #[test]
    fn kiro_usage_shows_remaining() {
        let quota = ProviderQuota::Kiro(KiroUsage {
            name: "kiro-a.json".to_string(),
            email: Some("a@example.com".to_string()),
            current_usage: 30.0,
            usage_limit: 50.0,
            subscription_title: Some("Pro".to_string()),
            next_reset: None,
            status: crate::core::models::KiroStatus::Ok,
            error_message: None,
        });
        let mut r = run(vec![settled("kiro-a.json", Ok(quota))]);
        r.provider = "kiro".to_string();
        let output = render_quota(&r, true).unwrap();
        assert!(output.contains("30 / 50"));
        assert!(output.contains("20 left"));
        assert!(output.contains("a@example.com"));
    }

    #[test]
    fn accounts_table_lists_each_record() {
        let records = vec![
            CredentialRecord::from_value(json!({
                "name": "codex-a.json",
                "type": "codex",
                "email": "a@example.com",
                "auth_index": "idx-1"
            }))
            .unwrap(),
        ];
        let output = render_accounts(&records, true).unwrap();
        assert!(output.contains("codex-a.json"));
        assert!(output.contains("idx-1"));
        assert!(output.contains("a@example.com"));
    }
}
