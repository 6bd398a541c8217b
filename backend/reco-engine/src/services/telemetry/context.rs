// Capture-time context derivation

use super::events::SessionContext;
use crate::models::GeoPoint;
use chrono::{Datelike, Local, NaiveDate, Timelike};
use std::collections::HashSet;
use std::sync::RwLock;

/// Supplies the context attached to each captured event
pub trait ContextProvider: Send + Sync {
    fn current(&self) -> SessionContext;
}

/// Derives hour and weekday from the local clock. Weather and location are
/// pushed in by the host's adapters whenever they learn something new.
#[derive(Default)]
pub struct SystemContextProvider {
    holidays: HashSet<NaiveDate>,
    weather: RwLock<Option<String>>,
    location: RwLock<Option<GeoPoint>>,
}

impl SystemContextProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_holidays(mut self, holidays: impl IntoIterator<Item = NaiveDate>) -> Self {
        self.holidays.extend(holidays);
        self
    }

    pub fn set_weather(&self, weather: Option<String>) {
        if let Ok(mut slot) = self.weather.write() {
            *slot = weather;
        }
    }

    pub fn set_location(&self, location: Option<GeoPoint>) {
        if let Ok(mut slot) = self.location.write() {
            *slot = location;
        }
    }
}

impl ContextProvider for SystemContextProvider {
    fn current(&self) -> SessionContext {
        let now = Local::now();
        SessionContext {
            hour: now.hour(),
            day_of_week: now.weekday().num_days_from_sunday(),
            holiday: self.holidays.contains(&now.date_naive()),
            weather: self.weather.read().ok().and_then(|w| w.clone()),
            location: self.location.read().ok().and_then(|l| *l),
        }
    }
}

/// Always returns the same context
pub struct FixedContextProvider {
    context: SessionContext,
}

impl FixedContextProvider {
    pub fn new(context: SessionContext) -> Self {
        Self { context }
    }
}

impl ContextProvider for FixedContextProvider {
    fn current(&self) -> SessionContext {
        self.context.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_provider_reports_pushed_state() {
        let provider = SystemContextProvider::new();
        provider.set_weather(Some("rain".to_string()));
        provider.set_location(Some(GeoPoint::new(1.0, 2.0)));

        let ctx = provider.current();
        assert!(ctx.hour < 24);
        assert!(ctx.day_of_week < 7);
        assert_eq!(ctx.weather.as_deref(), Some("rain"));
        assert_eq!(ctx.location, Some(GeoPoint::new(1.0, 2.0)));
        assert!(!ctx.holiday);
    }

    #[test]
    fn test_today_as_holiday() {
        let today = Local::now().date_naive();
        let provider = SystemContextProvider::new().with_holidays([today]);
        assert!(provider.current().holiday);
    }
}
