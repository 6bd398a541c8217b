// ============================================
// Session Telemetry
// ============================================
//
// Captures UI interaction events for the current anonymous session:
// 1. Derive context (hour, weekday, weather, location) at capture time
// 2. Snap locations to a ~500 m grid before anything is persisted
// 3. Cap the session size and evict the oldest records
// 4. Drop records older than the session timeout
//
// Capture is fire-and-forget: storage failures are logged and the
// event is discarded.

pub mod collector;
pub mod context;
pub mod events;
pub mod redis_store;
pub mod store;

pub use collector::TelemetryStore;
pub use context::{ContextProvider, FixedContextProvider, SystemContextProvider};
pub use events::{
    ClickCta, ContentTheme, EventPayload, FilterApply, KidSafeInteraction, OtherEvent,
    ParentHint, SessionContext, SessionSignal, TelemetryEvent, ViewItem,
};
pub use redis_store::RedisSessionStore;
pub use store::{InMemorySessionStore, SessionStore};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("Store error: {0}")]
    StoreError(String),

    #[error("Redis error: {0}")]
    RedisError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Telemetry worker stopped")]
    ChannelClosed,
}

impl From<redis::RedisError> for TelemetryError {
    fn from(err: redis::RedisError) -> Self {
        TelemetryError::RedisError(err.to_string())
    }
}

impl From<serde_json::Error> for TelemetryError {
    fn from(err: serde_json::Error) -> Self {
        TelemetryError::SerializationError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, TelemetryError>;
