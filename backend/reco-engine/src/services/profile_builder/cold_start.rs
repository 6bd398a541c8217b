// Cold-start heuristics: too few signals for statistics, so lean on the
// clock instead.

use super::{category_prior, interest_prior, time_window, InferredProfile, MIN_CONFIDENCE};
use crate::models::{CostPreference, Mode};
use crate::services::telemetry::SessionSignal;
use chrono::{DateTime, Datelike, Local, Timelike, Weekday};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DayPart {
    WeekdayEvening,
    WeekendMorning,
    Other,
}

fn day_part(weekday: Weekday, hour: u32) -> DayPart {
    let weekend = matches!(weekday, Weekday::Sat | Weekday::Sun);
    if !weekend && (17..=21).contains(&hour) {
        DayPart::WeekdayEvening
    } else if weekend && (9..=11).contains(&hour) {
        DayPart::WeekendMorning
    } else {
        DayPart::Other
    }
}

pub fn cold_start_profile(signals: &[SessionSignal], now: DateTime<Local>) -> InferredProfile {
    let hour = now.hour();

    let (indoor_preference, distance_km_tolerance, mut mode) = match day_part(now.weekday(), hour) {
        DayPart::WeekdayEvening => (true, 3.0, Mode::Learner),
        DayPart::WeekendMorning => (false, 10.0, Mode::Family),
        DayPart::Other => (false, 5.0, Mode::Learner),
    };

    if signals.iter().any(|s| s.event.payload.is_kid_safe()) {
        mode = Mode::Learner;
    }

    InferredProfile {
        interest_weights: interest_prior(),
        category_weights: category_prior(),
        cost_preference: CostPreference::Any,
        indoor_preference,
        quiet_needed: false,
        distance_km_tolerance,
        time_window: time_window(hour),
        mode,
        confidence: MIN_CONFIDENCE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::telemetry::{
        EventPayload, KidSafeInteraction, SessionContext, TelemetryEvent,
    };
    use chrono::TimeZone;

    fn local(y: i32, m: u32, d: u32, h: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    fn kid_safe() -> SessionSignal {
        SessionSignal::new(
            TelemetryEvent::new(EventPayload::KidSafeInteraction(KidSafeInteraction::default())),
            SessionContext {
                hour: 10,
                day_of_week: 6,
                holiday: false,
                weather: None,
                location: None,
            },
        )
    }

    #[test]
    fn test_weekday_evening() {
        // 2026-10-14 is a Wednesday
        let profile = cold_start_profile(&[], local(2026, 10, 14, 18));
        assert!(profile.indoor_preference);
        assert_eq!(profile.distance_km_tolerance, 3.0);
        assert_eq!(profile.confidence, MIN_CONFIDENCE);
    }

    #[test]
    fn test_weekend_morning_is_family() {
        // 2026-10-17 is a Saturday
        let profile = cold_start_profile(&[], local(2026, 10, 17, 10));
        assert!(!profile.indoor_preference);
        assert_eq!(profile.distance_km_tolerance, 10.0);
        assert_eq!(profile.mode, Mode::Family);
    }

    #[test]
    fn test_other_times_use_defaults() {
        let profile = cold_start_profile(&[], local(2026, 10, 14, 10));
        assert!(!profile.indoor_preference);
        assert_eq!(profile.distance_km_tolerance, 5.0);
        assert_eq!(profile.mode, Mode::Learner);
        assert_eq!(profile.cost_preference, CostPreference::Any);
        assert_eq!(profile.interest_weights, interest_prior());
        assert_eq!(profile.category_weights, category_prior());
    }

    #[test]
    fn test_kid_safe_forces_learner() {
        let profile = cold_start_profile(&[kid_safe()], local(2026, 10, 17, 10));
        assert_eq!(profile.mode, Mode::Learner);
        assert_eq!(profile.distance_km_tolerance, 10.0);
    }
}
