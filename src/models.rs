use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Great,
    Good,
    Meh,
    Bad,
    Terrible,
}

impl Mood {
    pub const ALL: [Mood; 5] = [Mood::Great, Mood::Good, Mood::Meh, Mood::Bad, Mood::Terrible];

    pub fn emoji(self) -> &'static str {
        match self {
            Mood::Great => "😄",
            Mood::Good => "🙂",
            Mood::Meh => "😐",
            Mood::Bad => "😕",
            Mood::Terrible => "😠",
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            Mood::Great => "#8BC34A",
            Mood::Good => "#C5E1A5",
            Mood::Meh => "#FFF176",
            Mood::Bad => "#FFB74D",
            Mood::Terrible => "#E57373",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Mood::Great => "great",
            Mood::Good => "good",
            Mood::Meh => "meh",
            Mood::Bad => "bad",
            Mood::Terrible => "terrible",
        }
    }

    /// Maps one of the default glyphs back to its mood.
    pub fn from_emoji(emoji: &str) -> Option<Mood> {
        Mood::ALL.into_iter().find(|mood| mood.emoji() == emoji)
    }
}

impl FromStr for Mood {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        Mood::ALL
            .into_iter()
            .find(|mood| mood.label().eq_ignore_ascii_case(value))
            .ok_or_else(|| format!("unknown mood '{value}'"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "StoredRecord")]
pub struct MoodRecord {
    pub emoji: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mood: Option<Mood>,
    pub comment: String,
}

impl MoodRecord {
    /// Explicit mood if one was stored, otherwise the mood implied by the glyph.
    pub fn effective_mood(&self) -> Option<Mood> {
        self.mood.or_else(|| Mood::from_emoji(&self.emoji))
    }

    pub fn color(&self) -> Option<&'static str> {
        self.effective_mood().map(Mood::color)
    }
}

// Emoji-only files store the glyph directly as the value.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredRecord {
    Full {
        emoji: String,
        #[serde(default)]
        mood: Option<Mood>,
        #[serde(default)]
        comment: String,
    },
    Emoji(String),
}

impl From<StoredRecord> for MoodRecord {
    fn from(stored: StoredRecord) -> Self {
        match stored {
            StoredRecord::Full {
                emoji,
                mood,
                comment,
            } => Self {
                emoji,
                mood,
                comment,
            },
            StoredRecord::Emoji(emoji) => Self {
                emoji,
                mood: None,
                comment: String::new(),
            },
        }
    }
}

/// Canonical `{year}-{month}-{day}` key, month 1-based, never zero-padded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DateKey(NaiveDate);

impl DateKey {
    pub fn new(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self(date)
    }

    pub fn date(self) -> NaiveDate {
        self.0
    }

    /// Parses `mood-{year}-{month}-{day}` keys where the month counts from 0.
    pub fn from_legacy(key: &str) -> Option<Self> {
        let rest = key.trim().strip_prefix("mood-")?;
        let mut parts = rest.rsplitn(3, '-');
        let day = parts.next()?.parse::<u32>().ok()?;
        let month = parts.next()?.parse::<u32>().ok()?;
        let year = parts.next()?.parse::<i32>().ok()?;
        DateKey::new(year, month.checked_add(1)?, day)
    }
}

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.0.year(), self.0.month(), self.0.day())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid date key '{0}'")]
pub struct InvalidDateKey(pub String);

impl FromStr for DateKey {
    type Err = InvalidDateKey;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidDateKey(value.to_string());
        // Split from the right so negative years keep their sign.
        let mut parts = value.trim().rsplitn(3, '-');
        let day = parts.next().and_then(|part| part.parse::<u32>().ok());
        let month = parts.next().and_then(|part| part.parse::<u32>().ok());
        let year = parts.next().and_then(|part| part.parse::<i32>().ok());
        match (year, month, day) {
            (Some(year), Some(month), Some(day)) => {
                DateKey::new(year, month, day).ok_or_else(invalid)
            }
            _ => Err(invalid()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("select a mood first")]
    NoMood(String),
}

/// Every tagged day, keyed by its canonical date key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MoodStore {
    records: BTreeMap<String, MoodRecord>,
}

impl MoodStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &DateKey) -> Option<&MoodRecord> {
        self.records.get(&key.to_string())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &MoodRecord)> {
        self.records.iter()
    }

    /// Inserts or replaces the record. Without a new comment the previous one is kept.
    pub fn set_mood(
        &mut self,
        key: &DateKey,
        emoji: impl Into<String>,
        mood: Option<Mood>,
        comment: Option<String>,
    ) -> &MoodRecord {
        let key = key.to_string();
        let comment = match comment {
            Some(comment) => comment,
            None => self
                .records
                .get(&key)
                .map(|record| record.comment.clone())
                .unwrap_or_default(),
        };
        let record = MoodRecord {
            emoji: emoji.into(),
            mood,
            comment,
        };
        self.records.insert(key.clone(), record);
        &self.records[&key]
    }

    pub fn set_comment(
        &mut self,
        key: &DateKey,
        comment: impl Into<String>,
    ) -> Result<&MoodRecord, StoreError> {
        let key = key.to_string();
        match self.records.get_mut(&key) {
            Some(record) => {
                record.comment = comment.into();
                Ok(record)
            }
            None => Err(StoreError::NoMood(key)),
        }
    }

    pub fn clear_mood(&mut self, key: &DateKey) -> Option<MoodRecord> {
        self.records.remove(&key.to_string())
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Rewrites zero-padded keys ("2024-03-05") and `mood-` keys with a
    /// 0-based month ("mood-2024-2-5") to the canonical form. A canonical key
    /// wins over a legacy key for the same day. Keys that are not dates at all
    /// are left untouched.
    pub fn canonicalize_keys(self) -> Self {
        let mut records = BTreeMap::new();
        let mut legacy = Vec::new();
        for (key, record) in self.records {
            if let Some(parsed) = DateKey::from_legacy(&key) {
                legacy.push((parsed.to_string(), record));
            } else if let Ok(parsed) = key.parse::<DateKey>() {
                records.insert(parsed.to_string(), record);
            } else {
                records.insert(key, record);
            }
        }
        for (key, record) in legacy {
            records.entry(key).or_insert(record);
        }
        Self { records }
    }
}

#[derive(Debug, Deserialize)]
pub struct SetMoodRequest {
    pub emoji: Option<String>,
    pub mood: Option<Mood>,
    pub comment: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    pub comment: String,
}

#[derive(Debug, Deserialize)]
pub struct SelectRequest {
    pub date: String,
}

#[derive(Debug, Deserialize)]
pub struct EmojiRequest {
    pub emoji: String,
    pub mood: Option<Mood>,
}

#[derive(Debug, Deserialize)]
pub struct ClearAllRequest {
    #[serde(default)]
    pub confirm: bool,
}

#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct CalendarQuery {
    pub year: Option<i32>,
    pub month: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SelectionResponse {
    pub selected: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EmojiResponse {
    pub date: String,
    pub record: Option<MoodRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CloudResponse {
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    pub notice: Option<String>,
    pub selected: Option<String>,
    pub year: i32,
    pub month: u32,
    pub token_configured: bool,
    pub remote_configured: bool,
}
