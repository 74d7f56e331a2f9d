//! Day-streak tracking with a weekly grace day
//!
//! The streak increments at most once per calendar day. A single rest day
//! per 7-day cycle bridges a gap of exactly one missed day; it is consumed
//! automatically and renewed when the streak completes another week.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Persistent streak state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakRecord {
    #[serde(rename = "streak", default)]
    pub current_streak: u32,
    #[serde(rename = "lastPracticeDate", default)]
    pub last_practice_date: Option<NaiveDate>,
    #[serde(rename = "restDayUsedThisWeek", default)]
    pub rest_day_used_this_week: bool,
}

impl StreakRecord {
    /// Advance the streak for a practice completed on `today`
    ///
    /// Idempotent per calendar day: a second call on the same date returns
    /// the current streak and changes nothing. Returns the streak value
    /// after the update.
    ///
    /// Branch precedence:
    /// 1. practiced yesterday: streak + 1, rest day renews each full week
    /// 2. practiced two days ago with the rest day unused: streak + 1,
    ///    rest day consumed
    /// 3. anything else (longer gap or first practice): streak resets to 1
    pub fn advance(&mut self, today: NaiveDate) -> u32 {
        if self.last_practice_date == Some(today) {
            return self.current_streak;
        }

        let yesterday = today - chrono::Duration::days(1);
        let two_days_ago = today - chrono::Duration::days(2);

        if self.last_practice_date == Some(yesterday) {
            self.current_streak += 1;
            if self.current_streak % 7 == 0 {
                self.rest_day_used_this_week = false;
            }
        } else if self.last_practice_date == Some(two_days_ago) && !self.rest_day_used_this_week {
            self.current_streak += 1;
            self.rest_day_used_this_week = true;
        } else {
            self.current_streak = 1;
            self.rest_day_used_this_week = false;
        }

        self.last_practice_date = Some(today);
        self.current_streak
    }
}
