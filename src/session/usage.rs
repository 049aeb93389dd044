use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Listening statistics, persisted between visits.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UsageStats {
    pub total_sessions: u32,
    pub total_minutes: u32,
    /// Consecutive days with at least one session.
    pub streak: u32,
    pub last_active_date: Option<NaiveDate>,
}

impl UsageStats {
    /// Count a new listening session started on `today`.
    pub fn record_session(&mut self, today: NaiveDate) {
        self.total_sessions = self.total_sessions.saturating_add(1);
        self.streak = match self.last_active_date {
            Some(last) if last == today => self.streak.max(1),
            Some(last) if last.succ_opt() == Some(today) => self.streak.saturating_add(1),
            _ => 1,
        };
        self.last_active_date = Some(today);
    }

    /// One more minute of listening.
    pub fn add_minute(&mut self) {
        self.total_minutes = self.total_minutes.saturating_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    #[test]
    fn first_session_starts_streak() {
        let mut u = UsageStats::default();
        u.record_session(day(1));
        assert_eq!(u.total_sessions, 1);
        assert_eq!(u.streak, 1);
        assert_eq!(u.last_active_date, Some(day(1)));
    }

    #[test]
    fn same_day_keeps_streak() {
        let mut u = UsageStats::default();
        u.record_session(day(1));
        u.record_session(day(1));
        assert_eq!(u.total_sessions, 2);
        assert_eq!(u.streak, 1);
    }

    #[test]
    fn consecutive_days_extend_streak() {
        let mut u = UsageStats::default();
        for d in 1..=4 {
            u.record_session(day(d));
        }
        assert_eq!(u.streak, 4);
    }

    #[test]
    fn gap_resets_streak() {
        let mut u = UsageStats::default();
        u.record_session(day(1));
        u.record_session(day(2));
        u.record_session(day(5));
        assert_eq!(u.streak, 1);
        assert_eq!(u.total_sessions, 3);
    }

    #[test]
    fn month_boundary_counts_as_consecutive() {
        let mut u = UsageStats::default();
        u.record_session(NaiveDate::from_ymd_opt(2026, 2, 28).unwrap());
        u.record_session(day(1));
        assert_eq!(u.streak, 2);
    }

    #[test]
    fn serializes_camel_case() {
        let mut u = UsageStats::default();
        u.record_session(day(9));
        u.add_minute();
        let json = serde_json::to_string(&u).unwrap();
        assert_eq!(
            json,
            r#"{"totalSessions":1,"totalMinutes":1,"streak":1,"lastActiveDate":"2026-03-09"}"#
        );
        let partial: UsageStats = serde_json::from_str(r#"{"totalMinutes":12}"#).unwrap();
        assert_eq!(partial.total_minutes, 12);
        assert_eq!(partial.last_active_date, None);
    }
}
