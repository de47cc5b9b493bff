use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::conversion::round_to;

/// Minimum spacing between two logged readings.
pub const LOG_INTERVAL_SECS: i64 = 60;

/// One logged point: minutes since session start and the displayed psi.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    pub elapsed_minutes: f64,
    pub psi: f64,
}

/// Downsamples the incoming stream to at most one reading per minute.
#[derive(Debug, Clone)]
pub struct SamplingLog {
    started_at: DateTime<Utc>,
    last_logged_at: DateTime<Utc>,
    readings: Vec<Reading>,
}

impl SamplingLog {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            last_logged_at: started_at,
            readings: Vec::new(),
        }
    }

    /// Returns the admitted reading, or `None` when `now` is within the log
    /// interval of the last admission.
    pub fn observe(&mut self, now: DateTime<Utc>, psi: f64) -> Option<Reading> {
        if now - self.last_logged_at < Duration::seconds(LOG_INTERVAL_SECS) {
            return None;
        }

        let elapsed_ms = (now - self.started_at).num_milliseconds();
        let reading = Reading {
            elapsed_minutes: round_to(elapsed_ms as f64 / 60_000.0, 2),
            psi,
        };

        self.readings.push(reading);
        self.last_logged_at = now;
        Some(reading)
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn last_logged_at(&self) -> DateTime<Utc> {
        self.last_logged_at
    }

    pub fn readings(&self) -> &[Reading] {
        &self.readings
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn into_readings(self) -> Vec<Reading> {
        self.readings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap()
    }

    #[test]
    fn nothing_is_logged_in_the_first_minute() {
        let mut log = SamplingLog::new(t0());
        for secs in [0, 1, 30, 59] {
            assert_eq!(log.observe(t0() + Duration::seconds(secs), 10.0), None);
        }
        assert!(log.is_empty());
    }

    #[test]
    fn admits_at_exactly_sixty_seconds() {
        let mut log = SamplingLog::new(t0());
        let reading = log.observe(t0() + Duration::seconds(60), 12.5).unwrap();
        assert_eq!(reading, Reading { elapsed_minutes: 1.0, psi: 12.5 });
        assert_eq!(log.last_logged_at(), t0() + Duration::seconds(60));
    }

    #[test]
    fn skips_samples_closer_than_a_minute_to_the_last_admission() {
        let mut log = SamplingLog::new(t0());
        let first = t0() + Duration::seconds(60);
        let second = first + Duration::seconds(30);
        let third = second + Duration::seconds(40);

        assert!(log.observe(first, 1.0).is_some());
        assert!(log.observe(second, 2.0).is_none());
        assert!(log.observe(third, 3.0).is_some());

        let psi: Vec<f64> = log.readings().iter().map(|r| r.psi).collect();
        assert_eq!(psi, vec![1.0, 3.0]);
    }

    #[test]
    fn fast_arrivals_do_not_raise_the_log_rate() {
        let mut log = SamplingLog::new(t0());
        // Ten samples per second for five minutes.
        for tick in 0..3000 {
            log.observe(t0() + Duration::milliseconds(tick * 100), 5.0);
        }
        assert_eq!(log.len(), 4);

        for pair in log.readings().windows(2) {
            assert!(pair[1].elapsed_minutes > pair[0].elapsed_minutes);
            assert!(pair[1].elapsed_minutes - pair[0].elapsed_minutes >= 0.999);
        }
    }

    #[test]
    fn elapsed_minutes_round_to_two_places() {
        let mut log = SamplingLog::new(t0());
        // 100 s = 1.666.. min
        let reading = log.observe(t0() + Duration::seconds(100), 1.0).unwrap();
        assert_eq!(reading.elapsed_minutes, 1.67);
    }

    #[test]
    fn clock_going_backwards_is_never_admitted() {
        let mut log = SamplingLog::new(t0());
        assert!(log.observe(t0() - Duration::seconds(120), 1.0).is_none());
        assert_eq!(log.last_logged_at(), t0());
    }
}
