//! Domain models for Momento

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A registered user (identity only; credentials live elsewhere)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub nickname: String,
    pub created_at: DateTime<Utc>,
}

/// A diary entry with its AI-derived fields
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diary {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub content: String,
    /// Business date of the entry (not a timestamp)
    pub date: NaiveDate,
    pub emotion: Option<String>,
    pub image_url: Option<String>,
    pub comment: Option<String>,
    pub shared: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields supplied by the client when creating or editing a diary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDiary {
    pub title: String,
    pub content: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub shared: bool,
}

/// Processing lifecycle of a diary
///
/// QUEUED → ANALYZING → (COMPLETED | FAILED). GENERATING is only ever
/// reported by the analysis server while it renders the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProcessingStatus {
    #[default]
    Queued,
    Analyzing,
    Generating,
    Completed,
    Failed,
}

impl ProcessingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "QUEUED",
            Self::Analyzing => "ANALYZING",
            Self::Generating => "GENERATING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        }
    }

    /// Whether a run in this state has finished
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl std::str::FromStr for ProcessingStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "QUEUED" => Ok(Self::Queued),
            "ANALYZING" => Ok(Self::Analyzing),
            "GENERATING" => Ok(Self::Generating),
            "COMPLETED" => Ok(Self::Completed),
            "FAILED" => Ok(Self::Failed),
            _ => Err(format!("Unknown processing status: {}", s)),
        }
    }
}

impl std::fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The one-to-one status record tracking a diary's processing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusRecord {
    pub diary_id: i64,
    pub status: ProcessingStatus,
    /// Incremented every time the diary is (re)queued; processor writes carry it
    pub run_token: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Tag category (closed, informal set)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagCategory {
    Hobby,
    Concern,
    Habit,
    Symptom,
    Like,
    Dislike,
    Relationship,
}

impl TagCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hobby => "hobby",
            Self::Concern => "concern",
            Self::Habit => "habit",
            Self::Symptom => "symptom",
            Self::Like => "like",
            Self::Dislike => "dislike",
            Self::Relationship => "relationship",
        }
    }

    /// Label used in prompts and returned by the completion model
    pub fn korean_label(&self) -> &'static str {
        match self {
            Self::Hobby => "취미",
            Self::Concern => "고민거리",
            Self::Habit => "생활습관",
            Self::Symptom => "몸에 나타나는 증상",
            Self::Like => "좋아하는 것",
            Self::Dislike => "싫어하는 것",
            Self::Relationship => "인간관계",
        }
    }

    pub fn all() -> [TagCategory; 7] {
        [
            Self::Hobby,
            Self::Concern,
            Self::Habit,
            Self::Symptom,
            Self::Like,
            Self::Dislike,
            Self::Relationship,
        ]
    }
}

impl std::str::FromStr for TagCategory {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(category) = Self::all().into_iter().find(|c| c.korean_label() == s) {
            return Ok(category);
        }
        match s.to_lowercase().as_str() {
            "hobby" => Ok(Self::Hobby),
            "concern" | "worry" => Ok(Self::Concern),
            "habit" => Ok(Self::Habit),
            "symptom" => Ok(Self::Symptom),
            "like" => Ok(Self::Like),
            "dislike" => Ok(Self::Dislike),
            "relationship" => Ok(Self::Relationship),
            // Shortened labels the model sometimes answers with
            "증상" => Ok(Self::Symptom),
            "고민" => Ok(Self::Concern),
            _ => Err(format!("Unknown tag category: {}", s)),
        }
    }
}

impl std::fmt::Display for TagCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A tag shared across all diaries that reference it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    pub category: Option<TagCategory>,
    pub created_at: DateTime<Utc>,
}

/// A diary with its status record and tags, as returned by the API
#[derive(Debug, Clone, Serialize)]
pub struct DiaryDetail {
    #[serde(flatten)]
    pub diary: Diary,
    pub status_tracking: Option<StatusRecord>,
    pub tags: Vec<Tag>,
}

/// An earlier diary that shares tags with the current one
#[derive(Debug, Clone, Serialize)]
pub struct SimilarDiary {
    pub diary_id: i64,
    pub content: String,
    pub matching_tags: i64,
}

/// Emotion distribution entry
#[derive(Debug, Clone, Serialize)]
pub struct EmotionStat {
    pub emotion: String,
    pub count: i64,
    /// Share of the user's diaries with an emotion, rounded to one decimal
    pub percentage: f64,
}

/// A generated image attached to a completed diary
#[derive(Debug, Clone, Serialize)]
pub struct GalleryImage {
    pub id: i64,
    pub url: String,
    pub emotion: Option<String>,
    pub date: NaiveDate,
    pub title: String,
    pub content: String,
}

/// Writing habit summary for one user
#[derive(Debug, Clone, Default, Serialize)]
pub struct WritingStats {
    /// Days in a row, ending today, with at least one diary
    pub consecutive_days: i64,
    pub total_entries: i64,
    /// Diaries dated in the current calendar month
    pub monthly_entries: i64,
    /// Mean content length in characters (integer division)
    pub average_length: i64,
}

/// Number of diaries in each processing state
#[derive(Debug, Clone, Default, Serialize)]
pub struct StatusSummary {
    pub queued: i64,
    pub analyzing: i64,
    pub generating: i64,
    pub completed: i64,
    pub failed: i64,
}

impl StatusSummary {
    pub fn total(&self) -> i64 {
        self.queued + self.analyzing + self.generating + self.completed + self.failed
    }
}
