use crate::calendar::YearMonth;
use crate::models::{DateKey, Mood, MoodStore};
use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InteractionError {
    #[error("select a day first")]
    NoDaySelected,
}

/// Which day, if any, is being edited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Selection {
    #[default]
    Idle,
    Editing(DateKey),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmojiOutcome {
    Set(DateKey),
    Cleared(DateKey),
}

impl EmojiOutcome {
    pub fn key(&self) -> DateKey {
        match self {
            EmojiOutcome::Set(key) | EmojiOutcome::Cleared(key) => *key,
        }
    }
}

impl Selection {
    pub fn active(&self) -> Option<DateKey> {
        match self {
            Selection::Idle => None,
            Selection::Editing(key) => Some(*key),
        }
    }

    /// Clicking a day always targets it, even while another day is being edited.
    pub fn select_day(&mut self, key: DateKey) {
        *self = Selection::Editing(key);
    }

    /// Applies an emoji click to the active day. An empty glyph clears the day.
    /// The selection is left as is so a comment can follow.
    pub fn pick_emoji(
        &self,
        store: &mut MoodStore,
        emoji: &str,
        mood: Option<Mood>,
    ) -> Result<EmojiOutcome, InteractionError> {
        let key = self.active().ok_or(InteractionError::NoDaySelected)?;
        let emoji = emoji.trim();
        if emoji.is_empty() {
            store.clear_mood(&key);
            return Ok(EmojiOutcome::Cleared(key));
        }
        let mood = mood.or_else(|| Mood::from_emoji(emoji));
        store.set_mood(&key, emoji, mood, None);
        Ok(EmojiOutcome::Set(key))
    }
}

/// Month currently on screen. Moving it does not touch the selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewState {
    pub current: YearMonth,
}

impl ViewState {
    pub fn starting_at(today: NaiveDate) -> Self {
        Self {
            current: YearMonth::of(today),
        }
    }

    pub fn prev(&mut self) {
        self.current = self.current.prev();
    }

    pub fn next(&mut self) {
        self.current = self.current.next();
    }

    pub fn goto(&mut self, year: i32, month: i64) {
        self.current = YearMonth::new(year, month);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(value: &str) -> DateKey {
        value.parse().unwrap()
    }

    #[test]
    fn emoji_while_idle_is_rejected_without_mutation() {
        let selection = Selection::Idle;
        let mut store = MoodStore::new();
        let err = selection.pick_emoji(&mut store, "😄", None).unwrap_err();
        assert_eq!(err.to_string(), "select a day first");
        assert!(store.is_empty());
    }

    #[test]
    fn clicking_another_day_retargets() {
        let mut selection = Selection::Idle;
        selection.select_day(key("2024-3-1"));
        selection.select_day(key("2024-3-2"));
        assert_eq!(selection.active(), Some(key("2024-3-2")));
    }

    #[test]
    fn emoji_while_editing_sets_mood_and_stays_editing() {
        let mut selection = Selection::Idle;
        let mut store = MoodStore::new();
        selection.select_day(key("2024-3-15"));

        let outcome = selection.pick_emoji(&mut store, "😄", None).unwrap();
        assert_eq!(outcome, EmojiOutcome::Set(key("2024-3-15")));
        assert_eq!(selection, Selection::Editing(key("2024-3-15")));

        let record = store.get(&key("2024-3-15")).unwrap();
        assert_eq!(record.mood, Some(Mood::Great));

        store.set_comment(&key("2024-3-15"), "picnic").unwrap();
        selection.pick_emoji(&mut store, "🙂", None).unwrap();
        assert_eq!(store.get(&key("2024-3-15")).unwrap().comment, "picnic");
    }

    #[test]
    fn empty_emoji_clears_the_day() {
        let mut selection = Selection::Idle;
        let mut store = MoodStore::new();
        selection.select_day(key("2024-3-15"));
        selection.pick_emoji(&mut store, "😠", None).unwrap();

        let outcome = selection.pick_emoji(&mut store, "", None).unwrap();
        assert_eq!(outcome.key(), key("2024-3-15"));
        assert!(matches!(outcome, EmojiOutcome::Cleared(_)));
        assert!(store.is_empty());
    }

    #[test]
    fn navigation_keeps_selection() {
        let mut view = ViewState::starting_at(NaiveDate::from_ymd_opt(2024, 12, 20).unwrap());
        let mut selection = Selection::Idle;
        selection.select_day(key("2024-12-20"));

        view.next();
        assert_eq!(view.current, YearMonth::new(2025, 1));
        view.prev();
        view.prev();
        assert_eq!(view.current, YearMonth::new(2024, 11));
        view.goto(2030, 14);
        assert_eq!(view.current, YearMonth::new(2031, 2));
        assert_eq!(selection.active(), Some(key("2024-12-20")));
    }
}
