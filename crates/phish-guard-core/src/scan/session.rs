use std::sync::{Arc, Mutex, PoisonError};
use std::time::SystemTime;

use tracing::{debug, instrument, warn};

use super::{HistoryEntry, ScanApi, ScanError, ScanHistory, ScanRequest, ScanVerdict};

/// Scan workflow: validate, submit, classify, record.
///
/// History lives for as long as the session and is shared by every in-flight
/// [`ScanSession::submit_scan`] call; entries are appended in completion order.
pub struct ScanSession<C: ScanApi + ?Sized> {
    client: Arc<C>,
    state: Mutex<HistoryState>,
}

#[derive(Default)]
struct HistoryState {
    next_id: u64,
    history: ScanHistory,
}

impl<C: ScanApi + ?Sized> ScanSession<C> {
    pub fn new(client: Arc<C>) -> Self {
        Self {
            client,
            state: Mutex::new(HistoryState::default()),
        }
    }

    /// Submit a URL and record the verdict on success.
    ///
    /// Blank or malformed input fails with [`ScanError::Validation`] without contacting
    /// the service. Service failures come back as [`ScanError::Api`] unchanged, and in
    /// both cases history is left exactly as it was.
    #[instrument(name = "submit_scan", skip(self, url), fields(url = %url.trim()))]
    pub async fn submit_scan(&self, url: &str) -> Result<ScanVerdict, ScanError> {
        let request = ScanRequest::parse(url)?;
        let payload = self.client.submit_scan(&request.url).await.map_err(|err| {
            warn!(cause = ?err.cause, message = %err.message, "scan request failed");
            err
        })?;
        let verdict = ScanVerdict::from_payload(payload, &request.url)?;

        let entry = self.record(&verdict);
        debug!(
            id = entry.id,
            status = verdict.status.as_str(),
            risk_score = verdict.risk_score,
            tier = verdict.tier().as_str(),
            "scan recorded"
        );
        Ok(verdict)
    }

    /// Snapshot of the history, newest first.
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.lock().history.to_vec()
    }

    fn record(&self, verdict: &ScanVerdict) -> HistoryEntry {
        let mut state = self.lock();
        state.next_id += 1;
        let entry = HistoryEntry::from_verdict(state.next_id, verdict, SystemTime::now());
        state.history.push(entry.clone());
        entry
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HistoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
