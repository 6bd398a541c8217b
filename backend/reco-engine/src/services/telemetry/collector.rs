// ============================================
// Telemetry Collector
// ============================================
//
// `TelemetryStore` is a cheap, cloneable handle. Every command goes
// through one mpsc channel to a single worker task that owns the
// current session id, so appends, reads and session resets are applied
// strictly in the order they were issued.

use super::context::ContextProvider;
use super::events::{SessionSignal, TelemetryEvent};
use super::store::SessionStore;
use super::{Result, TelemetryError};
use crate::config::TelemetryConfig;
use chrono::{Duration, Utc};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug)]
enum TelemetryCommand {
    /// Append a fully prepared signal to the current session
    Capture(SessionSignal),

    /// Read the current session in chronological order
    Signals {
        responder: oneshot::Sender<Result<Vec<SessionSignal>>>,
    },

    /// Rotate to a fresh session id and purge expired records
    ClearSession,

    CurrentSession {
        responder: oneshot::Sender<String>,
    },
}

#[derive(Clone)]
pub struct TelemetryStore {
    tx: mpsc::UnboundedSender<TelemetryCommand>,
    context: Arc<dyn ContextProvider>,
    location_grid_deg: f64,
}

impl TelemetryStore {
    /// Start the worker on the current tokio runtime and return its handle.
    /// Expired records are purged before the first command is served.
    pub fn spawn(
        store: Arc<dyn SessionStore>,
        context: Arc<dyn ContextProvider>,
        config: TelemetryConfig,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let location_grid_deg = config.location_grid_deg;

        let worker = TelemetryWorker {
            store,
            config,
            session_id: new_session_id(),
            rx,
        };
        tokio::spawn(worker.run());

        Self {
            tx,
            context,
            location_grid_deg,
        }
    }

    /// Record an interaction. Never blocks and never fails; if the worker
    /// is gone the event is dropped with a warning.
    pub fn capture(&self, event: TelemetryEvent) {
        let mut context = self.context.current();
        context.location = context.location.map(|p| p.snapped(self.location_grid_deg));

        let event = TelemetryEvent {
            ts: event.ts,
            payload: event.payload.with_snapped_locations(self.location_grid_deg),
        };
        let name = event.name().to_string();

        if self
            .tx
            .send(TelemetryCommand::Capture(SessionSignal::new(event, context)))
            .is_err()
        {
            warn!(event = %name, "Telemetry worker stopped, dropping event");
        }
    }

    /// Signals of the current session, oldest first. Storage failures yield
    /// an empty list.
    pub async fn session_signals(&self) -> Vec<SessionSignal> {
        match self.request_signals().await {
            Ok(signals) => signals,
            Err(e) => {
                warn!(error = %e, "Failed to read session signals");
                Vec::new()
            }
        }
    }

    async fn request_signals(&self) -> Result<Vec<SessionSignal>> {
        let (responder, rx) = oneshot::channel();
        self.tx
            .send(TelemetryCommand::Signals { responder })
            .map_err(|_| TelemetryError::ChannelClosed)?;
        rx.await.map_err(|_| TelemetryError::ChannelClosed)?
    }

    /// Start a new anonymous session. Later captures and reads see only the
    /// new session.
    pub fn clear_session(&self) {
        if self.tx.send(TelemetryCommand::ClearSession).is_err() {
            warn!("Telemetry worker stopped, session not cleared");
        }
    }

    pub async fn current_session_id(&self) -> Option<String> {
        let (responder, rx) = oneshot::channel();
        self.tx
            .send(TelemetryCommand::CurrentSession { responder })
            .ok()?;
        rx.await.ok()
    }
}

fn new_session_id() -> String {
    Uuid::new_v4().to_string()
}

struct TelemetryWorker {
    store: Arc<dyn SessionStore>,
    config: TelemetryConfig,
    session_id: String,
    rx: mpsc::UnboundedReceiver<TelemetryCommand>,
}

impl TelemetryWorker {
    async fn run(mut self) {
        info!(session_id = %self.session_id, "Telemetry session started");
        self.purge_expired().await;

        while let Some(cmd) = self.rx.recv().await {
            self.process_command(cmd).await;
        }
        info!("Telemetry worker shutting down");
    }

    async fn process_command(&mut self, cmd: TelemetryCommand) {
        match cmd {
            TelemetryCommand::Capture(signal) => {
                let name = signal.event.name().to_string();
                if let Err(e) = self.handle_capture(signal).await {
                    warn!(
                        session_id = %self.session_id,
                        event = %name,
                        error = %e,
                        "Dropping telemetry event"
                    );
                }
            }
            TelemetryCommand::Signals { responder } => {
                let result = self.handle_signals().await;
                let _ = responder.send(result);
            }
            TelemetryCommand::ClearSession => {
                let previous = std::mem::replace(&mut self.session_id, new_session_id());
                info!(
                    previous_session = %previous,
                    session_id = %self.session_id,
                    "Telemetry session cleared"
                );
                self.purge_expired().await;
            }
            TelemetryCommand::CurrentSession { responder } => {
                let _ = responder.send(self.session_id.clone());
            }
        }
    }

    async fn handle_capture(&self, signal: SessionSignal) -> Result<()> {
        self.purge_expired().await;

        self.store.put(&self.session_id, &signal).await?;

        let count = self.store.count_by_session(&self.session_id).await?;
        if count > self.config.max_records {
            let to_evict = ((count as f64 * self.config.eviction_ratio).ceil() as usize).max(1);
            let evicted = self.store.delete_oldest(&self.session_id, to_evict).await?;
            debug!(
                session_id = %self.session_id,
                count = count,
                evicted = evicted,
                "Session cap exceeded, evicted oldest signals"
            );
        }

        debug!(
            session_id = %self.session_id,
            event = signal.event.name(),
            "Signal captured"
        );
        Ok(())
    }

    async fn handle_signals(&self) -> Result<Vec<SessionSignal>> {
        let mut signals = self.store.query_by_session(&self.session_id).await?;
        // Stable: equal timestamps keep capture order
        signals.sort_by_key(|s| s.ts());
        Ok(signals)
    }

    async fn purge_expired(&self) {
        let cutoff = Utc::now() - Duration::seconds(self.config.session_timeout_secs);
        match self.store.delete_older_than(cutoff).await {
            Ok(0) => {}
            Ok(removed) => debug!(removed = removed, "Purged expired signals"),
            Err(e) => warn!(error = %e, "Failed to purge expired signals"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GeoPoint;
    use crate::services::telemetry::context::FixedContextProvider;
    use crate::services::telemetry::events::{
        EventPayload, FilterApply, SessionContext, ViewItem,
    };
    use crate::services::telemetry::store::{InMemorySessionStore, MockSessionStore};

    fn context() -> SessionContext {
        SessionContext {
            hour: 15,
            day_of_week: 3,
            holiday: false,
            weather: Some("rain".to_string()),
            location: Some(GeoPoint::new(37.77493, -122.41942)),
        }
    }

    fn view(id: &str) -> EventPayload {
        EventPayload::ViewItem(ViewItem {
            id: id.to_string(),
            dwell_ms: Some(12_000),
            tags: vec!["science".to_string()],
            location: Some(GeoPoint::new(37.7712, -122.4231)),
            ..Default::default()
        })
    }

    fn spawn_store(config: TelemetryConfig) -> (TelemetryStore, Arc<InMemorySessionStore>) {
        let backing = Arc::new(InMemorySessionStore::new());
        let telemetry = TelemetryStore::spawn(
            backing.clone(),
            Arc::new(FixedContextProvider::new(context())),
            config,
        );
        (telemetry, backing)
    }

    #[tokio::test]
    async fn test_capture_round_trip_snaps_locations() {
        let (telemetry, _) = spawn_store(TelemetryConfig::default());
        let event = TelemetryEvent::new(view("museum-1"));

        telemetry.capture(event.clone());
        let signals = telemetry.session_signals().await;

        assert_eq!(signals.len(), 1);
        let expected_event = TelemetryEvent {
            ts: event.ts,
            payload: event.payload.with_snapped_locations(0.005),
        };
        assert_eq!(signals[0].event, expected_event);

        let mut expected_context = context();
        expected_context.location = Some(GeoPoint::new(37.77493, -122.41942).snapped(0.005));
        assert_eq!(signals[0].context, expected_context);

        let EventPayload::ViewItem(stored) = &signals[0].event.payload else {
            panic!("expected view_item");
        };
        let loc = stored.location.unwrap();
        assert!((loc.lat - 37.77).abs() < 1e-9);
        assert!((loc.lng - (-122.425)).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_signals_are_chronological() {
        let (telemetry, _) = spawn_store(TelemetryConfig::default());
        let now = Utc::now();

        telemetry.capture(TelemetryEvent::at(now, view("late")));
        telemetry.capture(TelemetryEvent::at(now - Duration::minutes(5), view("early")));

        let signals = telemetry.session_signals().await;
        let ids: Vec<&str> = signals
            .iter()
            .filter_map(|s| match &s.event.payload {
                EventPayload::ViewItem(v) => Some(v.id.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(ids, vec!["early", "late"]);
    }

    #[tokio::test]
    async fn test_clear_session_starts_empty() {
        let (telemetry, _) = spawn_store(TelemetryConfig::default());
        telemetry.capture(TelemetryEvent::new(view("a")));
        telemetry.capture(TelemetryEvent::new(EventPayload::FilterApply(
            FilterApply::default(),
        )));

        let before = telemetry.current_session_id().await.unwrap();
        assert_eq!(telemetry.session_signals().await.len(), 2);

        telemetry.clear_session();
        assert!(telemetry.session_signals().await.is_empty());

        let after = telemetry.current_session_id().await.unwrap();
        assert_ne!(before, after);
    }

    #[tokio::test]
    async fn test_session_cap_evicts_oldest() {
        let config = TelemetryConfig {
            max_records: 20,
            ..TelemetryConfig::default()
        };
        let (telemetry, _) = spawn_store(config);
        let start = Utc::now() - Duration::minutes(1);

        for i in 0..21 {
            telemetry.capture(TelemetryEvent::at(
                start + Duration::milliseconds(i),
                view(&format!("item-{}", i)),
            ));
        }

        let signals = telemetry.session_signals().await;
        // 21 > 20, so ceil(21 * 5%) = 2 records go
        assert_eq!(signals.len(), 19);
        let EventPayload::ViewItem(first) = &signals[0].event.payload else {
            panic!("expected view_item");
        };
        assert_eq!(first.id, "item-2");
    }

    #[tokio::test]
    async fn test_eviction_follows_capture_time() {
        let config = TelemetryConfig {
            max_records: 20,
            ..TelemetryConfig::default()
        };
        let (telemetry, _) = spawn_store(config);
        let start = Utc::now() - Duration::minutes(1);

        telemetry.capture(TelemetryEvent::at(start + Duration::seconds(100), view("newest")));
        for i in 0..20 {
            telemetry.capture(TelemetryEvent::at(
                start + Duration::milliseconds(i),
                view(&format!("old-{}", i)),
            ));
        }

        let signals = telemetry.session_signals().await;
        let ids: Vec<&str> = signals
            .iter()
            .filter_map(|s| match &s.event.payload {
                EventPayload::ViewItem(v) => Some(v.id.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(ids.len(), 19);
        assert_eq!(ids[0], "old-2");
        assert_eq!(ids[18], "newest");
    }

    #[tokio::test]
    async fn test_capture_and_clear_purge_other_sessions() {
        let (telemetry, backing) = spawn_store(TelemetryConfig::default());
        let stale = SessionSignal::new(
            TelemetryEvent::at(Utc::now() - Duration::hours(2), view("stale")),
            context(),
        );
        // Let the startup purge run first
        let _ = telemetry.session_signals().await;

        backing.put("old-session", &stale).await.unwrap();
        telemetry.capture(TelemetryEvent::new(view("fresh")));
        assert_eq!(telemetry.session_signals().await.len(), 1);
        assert_eq!(backing.count_by_session("old-session").await.unwrap(), 0);

        backing.put("old-session", &stale).await.unwrap();
        telemetry.clear_session();
        assert!(telemetry.session_signals().await.is_empty());
        assert_eq!(backing.count_by_session("old-session").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_expired_records_purged_on_start() {
        let backing = Arc::new(InMemorySessionStore::new());
        let stale = SessionSignal::new(
            TelemetryEvent::at(Utc::now() - Duration::hours(2), view("stale")),
            context(),
        );
        backing.put("old-session", &stale).await.unwrap();

        let telemetry = TelemetryStore::spawn(
            backing.clone(),
            Arc::new(FixedContextProvider::new(context())),
            TelemetryConfig::default(),
        );
        // Any request is processed after the startup purge
        let _ = telemetry.session_signals().await;

        assert_eq!(backing.count_by_session("old-session").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_store_failures_are_swallowed() {
        let mut mock = MockSessionStore::new();
        mock.expect_delete_older_than().returning(|_| Ok(0));
        mock.expect_put()
            .returning(|_, _| Err(TelemetryError::StoreError("disk full".to_string())));
        mock.expect_query_by_session()
            .returning(|_| Err(TelemetryError::StoreError("disk full".to_string())));

        let telemetry = TelemetryStore::spawn(
            Arc::new(mock),
            Arc::new(FixedContextProvider::new(context())),
            TelemetryConfig::default(),
        );

        telemetry.capture(TelemetryEvent::new(view("a")));
        assert!(telemetry.session_signals().await.is_empty());
    }
}
