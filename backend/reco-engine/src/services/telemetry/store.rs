// ============================================
// Session Store
// ============================================
//
// Storage capability behind the telemetry collector. Signals are kept
// per session in capture order; the collector is the only writer.

use super::events::SessionSignal;
use super::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Append a signal to the session
    async fn put(&self, session_id: &str, signal: &SessionSignal) -> Result<()>;

    /// All signals of a session in capture order
    async fn query_by_session(&self, session_id: &str) -> Result<Vec<SessionSignal>>;

    async fn count_by_session(&self, session_id: &str) -> Result<usize>;

    /// Remove the `n` oldest signals of a session, returning how many went
    async fn delete_oldest(&self, session_id: &str, n: usize) -> Result<usize>;

    /// Remove every signal, in any session, captured before `cutoff`
    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize>;
}

/// In-process store for tests and embedded hosts
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: DashMap<String, Vec<SessionSignal>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn put(&self, session_id: &str, signal: &SessionSignal) -> Result<()> {
        self.sessions
            .entry(session_id.to_string())
            .or_default()
            .push(signal.clone());
        Ok(())
    }

    async fn query_by_session(&self, session_id: &str) -> Result<Vec<SessionSignal>> {
        Ok(self
            .sessions
            .get(session_id)
            .map(|signals| signals.value().clone())
            .unwrap_or_default())
    }

    async fn count_by_session(&self, session_id: &str) -> Result<usize> {
        Ok(self
            .sessions
            .get(session_id)
            .map(|signals| signals.len())
            .unwrap_or(0))
    }

    async fn delete_oldest(&self, session_id: &str, n: usize) -> Result<usize> {
        let Some(mut signals) = self.sessions.get_mut(session_id) else {
            return Ok(0);
        };
        let n = n.min(signals.len());
        // Oldest by capture time, not by arrival; equal timestamps keep arrival order
        signals.sort_by_key(|s| s.ts());
        signals.drain(..n);
        Ok(n)
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let mut removed = 0;
        for mut entry in self.sessions.iter_mut() {
            let before = entry.len();
            entry.retain(|s| s.ts() >= cutoff);
            removed += before - entry.len();
        }
        self.sessions.retain(|_, signals| !signals.is_empty());
        Ok(removed)
    }
}
