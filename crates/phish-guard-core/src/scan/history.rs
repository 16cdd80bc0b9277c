use std::collections::VecDeque;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use super::{RiskTier, ScanStatus, ScanVerdict};

/// Maximum number of entries kept in [`ScanHistory`].
pub const HISTORY_CAPACITY: usize = 10;

/// Record of one completed scan. Never modified once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: u64,
    pub url: String,
    pub status: ScanStatus,
    pub risk_score: f64,
    /// RFC 3339 instant in UTC.
    pub timestamp: String,
}

impl HistoryEntry {
    pub fn from_verdict(id: u64, verdict: &ScanVerdict, at: SystemTime) -> Self {
        Self {
            id,
            url: verdict.url.clone(),
            status: verdict.status,
            risk_score: verdict.risk_score,
            timestamp: humantime::format_rfc3339_millis(at).to_string(),
        }
    }

    pub fn tier(&self) -> RiskTier {
        RiskTier::classify(self.status, self.risk_score)
    }
}

/// Newest-first log of completed scans, bounded at [`HISTORY_CAPACITY`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanHistory {
    entries: VecDeque<HistoryEntry>,
}

impl ScanHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert as the newest entry, dropping the oldest once the bound is exceeded.
    pub fn push(&mut self, entry: HistoryEntry) {
        self.entries.push_front(entry);
        self.entries.truncate(HISTORY_CAPACITY);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn latest(&self) -> Option<&HistoryEntry> {
        self.entries.front()
    }

    pub fn iter(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    pub fn to_vec(&self) -> Vec<HistoryEntry> {
        self.entries.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: u64) -> HistoryEntry {
        HistoryEntry {
            id,
            url: format!("https://site-{id}.example"),
            status: ScanStatus::Safe,
            risk_score: 0.1,
            timestamp: "2025-01-21T10:30:00.000Z".into(),
        }
    }

    #[test]
    fn newest_entry_comes_first() {
        let mut history = ScanHistory::new();
        history.push(entry(1));
        history.push(entry(2));
        let ids: Vec<_> = history.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![2, 1]);
        assert_eq!(history.latest().map(|e| e.id), Some(2));
    }

    #[test]
    fn eleventh_entry_evicts_the_oldest() {
        let mut history = ScanHistory::new();
        for id in 1..=11 {
            history.push(entry(id));
            assert!(history.len() <= HISTORY_CAPACITY);
        }
        let ids: Vec<_> = history.iter().map(|e| e.id).collect();
        assert_eq!(ids, (2..=11).rev().collect::<Vec<_>>());
    }

    #[test]
    fn entry_timestamp_is_rfc3339() {
        let verdict = ScanVerdict {
            url: "https://good.com".into(),
            status: ScanStatus::Safe,
            risk_score: 0.2,
            details: crate::scan::ScanDetails {
                domain_age_days: 100,
                ssl_valid: true,
                reputation_score: 0.8,
                blacklist_status: crate::scan::BlacklistStatus::Clean,
            },
        };
        let at = SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(1_737_455_400);
        let entry = HistoryEntry::from_verdict(7, &verdict, at);
        assert_eq!(entry.timestamp, "2025-01-21T10:30:00.000Z");
        assert_eq!(entry.tier(), RiskTier::Safe);
        assert!(humantime::parse_rfc3339(&entry.timestamp).is_ok());
    }
}
