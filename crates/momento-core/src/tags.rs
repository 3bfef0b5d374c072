//! Coarse emotion derivation from extracted tags
//!
//! The tag pipeline has no emotion model of its own. It labels a diary by
//! counting tag names that appear in a fixed positive word set against a fixed
//! negative word set.

use serde::{Deserialize, Serialize};

/// Tag names counted as positive
pub const POSITIVE_WORDS: &[&str] = &[
    "행복", "기쁨", "즐거움", "감사", "사랑", "설렘", "만족", "희망", "평온", "신남", "뿌듯함",
    "성취", "웃음", "휴식", "여행",
];

/// Tag names counted as negative
pub const NEGATIVE_WORDS: &[&str] = &[
    "슬픔", "우울", "불안", "분노", "스트레스", "두통", "외로움", "걱정", "피곤", "짜증",
    "불면증", "후회", "좌절", "긴장", "통증",
];

/// Coarse emotion label stored on the diary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmotionLabel {
    Positive,
    Negative,
    Neutral,
}

impl EmotionLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "긍정적",
            Self::Negative => "부정적",
            Self::Neutral => "중립적",
        }
    }
}

impl std::fmt::Display for EmotionLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Derive an emotion label from tag names (ties, including no matches, are neutral)
pub fn derive_emotion<S: AsRef<str>>(tag_names: &[S]) -> EmotionLabel {
    let mut positive = 0usize;
    let mut negative = 0usize;

    for name in tag_names {
        let name = name.as_ref().trim();
        if POSITIVE_WORDS.contains(&name) {
            positive += 1;
        } else if NEGATIVE_WORDS.contains(&name) {
            negative += 1;
        }
    }

    match positive.cmp(&negative) {
        std::cmp::Ordering::Greater => EmotionLabel::Positive,
        std::cmp::Ordering::Less => EmotionLabel::Negative,
        std::cmp::Ordering::Equal => EmotionLabel::Neutral,
    }
}
