// ============================================
// Telemetry Events
// ============================================
//
// One payload variant per event name, each carrying only the fields
// downstream inference reads. Unrecognized events land in `Other`
// with their raw JSON fields intact.

use crate::models::GeoPoint;
use chrono::{DateTime, Utc};
use serde::de::{self, DeserializeOwned};
use serde::{ser, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryEvent {
    pub ts: DateTime<Utc>,
    #[serde(rename = "event")]
    pub payload: EventPayload,
}

impl TelemetryEvent {
    pub fn new(payload: EventPayload) -> Self {
        Self {
            ts: Utc::now(),
            payload,
        }
    }

    pub fn at(ts: DateTime<Utc>, payload: EventPayload) -> Self {
        Self { ts, payload }
    }

    pub fn name(&self) -> &str {
        self.payload.name()
    }
}

/// Wire shape is `{"name": <event name>, "data": {...}}`. Names without a
/// dedicated variant become `Other`, keeping `data` as its fields.
#[derive(Debug, Clone, PartialEq)]
pub enum EventPayload {
    ViewItem(ViewItem),
    ClickCta(ClickCta),
    FilterApply(FilterApply),
    KidSafeInteraction(KidSafeInteraction),
    ContentTheme(ContentTheme),
    ParentHintExpanded(ParentHint),
    Other(OtherEvent),
}

impl EventPayload {
    pub fn name(&self) -> &str {
        match self {
            EventPayload::ViewItem(_) => "view_item",
            EventPayload::ClickCta(_) => "click_cta",
            EventPayload::FilterApply(_) => "filter_apply",
            EventPayload::KidSafeInteraction(_) => "kid_safe_interaction",
            EventPayload::ContentTheme(_) => "content_theme",
            EventPayload::ParentHintExpanded(_) => "parent_hint_expanded",
            EventPayload::Other(other) => other.name.as_str(),
        }
    }

    /// Whether this event reports the parent hint being opened
    pub fn is_parent_hint(&self) -> bool {
        match self {
            EventPayload::ParentHintExpanded(_) => true,
            EventPayload::ClickCta(cta) => cta.parent_hint_expanded,
            EventPayload::Other(other) => other
                .fields
                .get("parent_hint_expanded")
                .and_then(|v| v.as_bool())
                .unwrap_or(false),
            _ => false,
        }
    }

    pub fn is_kid_safe(&self) -> bool {
        matches!(self, EventPayload::KidSafeInteraction(_))
    }

    /// Copy of the payload with every location snapped to `grid_deg`
    pub fn with_snapped_locations(&self, grid_deg: f64) -> Self {
        match self {
            EventPayload::ViewItem(view) => EventPayload::ViewItem(ViewItem {
                location: view.location.map(|p| p.snapped(grid_deg)),
                ..view.clone()
            }),
            EventPayload::Other(other) => {
                let mut fields = other.fields.clone();
                if let Some(point) = fields
                    .get("location")
                    .cloned()
                    .and_then(|v| serde_json::from_value::<GeoPoint>(v).ok())
                {
                    if let Ok(value) = serde_json::to_value(point.snapped(grid_deg)) {
                        fields.insert("location".to_string(), value);
                    }
                }
                EventPayload::Other(OtherEvent {
                    name: other.name.clone(),
                    fields,
                })
            }
            _ => self.clone(),
        }
    }
}

/// Envelope both directions go through
#[derive(Serialize, Deserialize)]
struct RawPayload {
    name: String,
    #[serde(default)]
    data: Value,
}

fn payload_data<T: DeserializeOwned>(data: Value) -> serde_json::Result<T> {
    if data.is_null() {
        serde_json::from_value(Value::Object(Map::new()))
    } else {
        serde_json::from_value(data)
    }
}

impl<'de> Deserialize<'de> for EventPayload {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let RawPayload { name, data } = RawPayload::deserialize(deserializer)?;
        let payload = match name.as_str() {
            "view_item" => payload_data(data).map(EventPayload::ViewItem),
            "click_cta" => payload_data(data).map(EventPayload::ClickCta),
            "filter_apply" => payload_data(data).map(EventPayload::FilterApply),
            "kid_safe_interaction" => payload_data(data).map(EventPayload::KidSafeInteraction),
            "content_theme" => payload_data(data).map(EventPayload::ContentTheme),
            "parent_hint_expanded" => payload_data(data).map(EventPayload::ParentHintExpanded),
            _ => {
                let fields = match data {
                    Value::Object(fields) => fields,
                    Value::Null => Map::new(),
                    other => {
                        let mut fields = Map::new();
                        fields.insert("value".to_string(), other);
                        fields
                    }
                };
                Ok(EventPayload::Other(OtherEvent { name, fields }))
            }
        };
        payload.map_err(de::Error::custom)
    }
}

impl Serialize for EventPayload {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let data = match self {
            EventPayload::ViewItem(v) => serde_json::to_value(v),
            EventPayload::ClickCta(v) => serde_json::to_value(v),
            EventPayload::FilterApply(v) => serde_json::to_value(v),
            EventPayload::KidSafeInteraction(v) => serde_json::to_value(v),
            EventPayload::ContentTheme(v) => serde_json::to_value(v),
            EventPayload::ParentHintExpanded(v) => serde_json::to_value(v),
            EventPayload::Other(other) => Ok(Value::Object(other.fields.clone())),
        }
        .map_err(<S::Error as ser::Error>::custom)?;

        RawPayload {
            name: self.name().to_string(),
            data,
        }
        .serialize(serializer)
    }
}

/// Accepts any non-negative JSON number; fractions are rounded, anything
/// else reads as absent.
fn lenient_millis<'de, D>(deserializer: D) -> std::result::Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .and_then(|v| v.as_f64())
        .filter(|ms| ms.is_finite() && *ms >= 0.0)
        .map(|ms| ms.round() as u64))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ViewItem {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "lenient_millis")]
    pub dwell_ms: Option<u64>,
    #[serde(default)]
    pub scroll_depth: Option<f64>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, alias = "distanceKm")]
    pub distance_km: Option<f64>,
    #[serde(default)]
    pub location: Option<GeoPoint>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub indoor: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ClickCta {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub parent_hint_expanded: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct FilterApply {
    #[serde(default)]
    pub free_only: Option<bool>,
    #[serde(default)]
    pub distance_km: Option<f64>,
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct KidSafeInteraction {
    #[serde(default)]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ContentTheme {
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub score: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ParentHint {
    #[serde(default)]
    pub id: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OtherEvent {
    pub name: String,
    pub fields: Map<String, Value>,
}

/// Context derived at capture time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionContext {
    pub hour: u32,
    /// 0 = Sunday .. 6 = Saturday
    pub day_of_week: u32,
    pub holiday: bool,
    #[serde(default)]
    pub weather: Option<String>,
    #[serde(default)]
    pub location: Option<GeoPoint>,
}

impl SessionContext {
    pub fn is_weekend(&self) -> bool {
        self.day_of_week == 0 || self.day_of_week == 6
    }
}

/// A captured event paired with its context; never mutated after capture
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSignal {
    pub event: TelemetryEvent,
    pub context: SessionContext,
}

impl SessionSignal {
    pub fn new(event: TelemetryEvent, context: SessionContext) -> Self {
        Self { event, context }
    }

    pub fn ts(&self) -> DateTime<Utc> {
        self.event.ts
    }
}
