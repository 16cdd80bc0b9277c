use std::fmt::Write;

use colored::{ColoredString, Colorize};
use serde::Serialize;

use crate::scan::{BlacklistStatus, HistoryEntry, RiskTier, ScanDetails, ScanStatus, ScanVerdict};

/// Format styles supported by the renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Human,
    Json,
    Yaml,
}

/// Render a single verdict.
pub fn render_verdict(verdict: &ScanVerdict, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Human => render_verdict_human(verdict),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&JsonVerdict::from(verdict))?),
        OutputFormat::Yaml => Ok(serde_yaml::to_string(&JsonVerdict::from(verdict))?),
    }
}

/// Render history entries in the order given (newest first when taken from a session).
pub fn render_history(entries: &[HistoryEntry], format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Human => render_history_human(entries),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&history_rows(entries))?),
        OutputFormat::Yaml => Ok(serde_yaml::to_string(&history_rows(entries))?),
    }
}

fn history_rows(entries: &[HistoryEntry]) -> Vec<JsonHistoryEntry<'_>> {
    entries.iter().map(JsonHistoryEntry::from).collect()
}

fn render_verdict_human(verdict: &ScanVerdict) -> anyhow::Result<String> {
    let tier = verdict.tier();
    let headline = match verdict.status {
        ScanStatus::Safe => "URL appears safe",
        ScanStatus::Suspicious => "Potential threat detected",
    };
    let mut out = String::new();
    writeln!(out, "{}", paint(tier, headline).bold())?;
    writeln!(out, "URL: {}", verdict.url)?;
    writeln!(
        out,
        "Risk Score: {} ({})",
        percent(verdict.risk_score),
        paint(tier, tier.as_str())
    )?;
    writeln!(out)?;
    write_details(&mut out, &verdict.details)?;
    Ok(out)
}

fn write_details(out: &mut String, details: &ScanDetails) -> std::fmt::Result {
    writeln!(out, "Domain Age: {} days", details.domain_age_days)?;
    writeln!(
        out,
        "SSL Certificate: {}",
        if details.ssl_valid { "Valid" } else { "Invalid" }
    )?;
    writeln!(out, "Reputation: {}", percent(details.reputation_score))?;
    let blacklist = match details.blacklist_status {
        BlacklistStatus::Clean => "Clean".green(),
        BlacklistStatus::Listed => "Listed".red(),
    };
    writeln!(out, "Blacklist Status: {blacklist}")
}

fn render_history_human(entries: &[HistoryEntry]) -> anyhow::Result<String> {
    let mut out = String::new();
    if entries.is_empty() {
        writeln!(out, "No scans yet.")?;
        return Ok(out);
    }
    writeln!(out, "Recent Scans:")?;
    for entry in entries {
        let tier = entry.tier();
        writeln!(
            out,
            "  #{id:<4} {status:<10} risk {risk:>6} • {ts}  {url}",
            id = entry.id,
            status = paint(tier, entry.status.as_str()),
            risk = percent(entry.risk_score),
            ts = entry.timestamp,
            url = entry.url,
        )?;
    }
    Ok(out)
}

fn paint(tier: RiskTier, text: &str) -> ColoredString {
    match tier {
        RiskTier::Safe => text.green(),
        RiskTier::Caution => text.yellow(),
        RiskTier::Danger => text.red(),
    }
}

fn percent(score: f64) -> String {
    format!("{:.1}%", score * 100.0)
}

#[derive(Debug, Serialize)]
struct JsonVerdict<'a> {
    url: &'a str,
    status: ScanStatus,
    risk_score: f64,
    tier: RiskTier,
    details: &'a ScanDetails,
}

impl<'a> From<&'a ScanVerdict> for JsonVerdict<'a> {
    fn from(verdict: &'a ScanVerdict) -> Self {
        Self {
            url: &verdict.url,
            status: verdict.status,
            risk_score: verdict.risk_score,
            tier: verdict.tier(),
            details: &verdict.details,
        }
    }
}

#[derive(Debug, Serialize)]
struct JsonHistoryEntry<'a> {
    #[serde(flatten)]
    entry: &'a HistoryEntry,
    tier: RiskTier,
}

impl<'a> From<&'a HistoryEntry> for JsonHistoryEntry<'a> {
    fn from(entry: &'a HistoryEntry) -> Self {
        Self {
            entry,
            tier: entry.tier(),
        }
    }
}
