use crate::models::{DateKey, Mood, MoodStore};
use crate::selection::Selection;
use chrono::{Datelike, NaiveDate};
use serde::Serialize;

// Well inside chrono's supported range, so the first of the next month always exists.
const MIN_YEAR: i128 = -200_000;
const MAX_YEAR: i128 = 200_000;

/// A displayed month. Construction normalizes month overflow into the year,
/// the same way date arithmetic does (month 13 is January of the next year).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: i64) -> Self {
        // i128 so any i32 year with any i64 month fits before clamping.
        let total = i128::from(year) * 12 + i128::from(month) - 1;
        let year = total.div_euclid(12).clamp(MIN_YEAR, MAX_YEAR);
        let month = total.rem_euclid(12) + 1;
        Self {
            year: year as i32,
            month: month as u32,
        }
    }

    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn next(self) -> Self {
        Self::new(self.year, i64::from(self.month) + 1)
    }

    pub fn prev(self) -> Self {
        Self::new(self.year, i64::from(self.month) - 1)
    }

    pub fn first_day(self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or_default()
    }

    pub fn title(self) -> String {
        self.first_day().format("%B %Y").to_string()
    }
}

/// Weekday of the 1st, 0 = Sunday through 6 = Saturday.
pub fn first_weekday(ym: YearMonth) -> u32 {
    ym.first_day().weekday().num_days_from_sunday()
}

/// Last day of the month: the day before the 1st of the following month.
pub fn days_in_month(ym: YearMonth) -> u32 {
    ym.next()
        .first_day()
        .pred_opt()
        .map(|last| last.day())
        .unwrap_or(31)
}

#[derive(Debug, Clone, Serialize)]
pub struct DayCell {
    pub day: u32,
    pub key: String,
    pub label: String,
    pub emoji: Option<String>,
    pub mood: Option<Mood>,
    pub color: Option<&'static str>,
    pub is_today: bool,
    pub is_selected: bool,
    pub tooltip: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthView {
    pub year: i32,
    pub month: u32,
    pub title: String,
    pub leading_blanks: u32,
    pub cells: Vec<DayCell>,
}

/// Builds the full grid for one month. Pure: the same inputs always give the same view.
pub fn render_month(
    ym: YearMonth,
    store: &MoodStore,
    selection: &Selection,
    today: NaiveDate,
) -> MonthView {
    let selected = selection.active();
    let total_days = days_in_month(ym);
    let first = ym.first_day();

    let cells = (0..total_days)
        .filter_map(|offset| first.checked_add_days(chrono::Days::new(u64::from(offset))))
        .map(|date| {
            let key = DateKey::from_date(date);
            let record = store.get(&key);
            DayCell {
                day: date.day(),
                key: key.to_string(),
                label: record
                    .map(|record| record.emoji.clone())
                    .unwrap_or_else(|| date.day().to_string()),
                emoji: record.map(|record| record.emoji.clone()),
                mood: record.and_then(|record| record.effective_mood()),
                color: record.and_then(|record| record.color()),
                is_today: date == today,
                is_selected: selected == Some(key),
                tooltip: record
                    .filter(|record| !record.comment.is_empty())
                    .map(|record| record.comment.clone()),
            }
        })
        .collect();

    MonthView {
        year: ym.year,
        month: ym.month,
        title: ym.title(),
        leading_blanks: first_weekday(ym),
        cells,
    }
}
