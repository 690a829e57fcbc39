// quiz-gateway-rs/src/types.rs
// Domain values shared by the request pipeline: the quiz enumerations and the
// normalized generation request produced by the validator.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Personality-style label derived from quiz answers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Archetype {
    Mentor,
    Rebel,
    Sage,
    Explorer,
}

impl Archetype {
    pub const ALL: [Archetype; 4] = [
        Archetype::Mentor,
        Archetype::Rebel,
        Archetype::Sage,
        Archetype::Explorer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Archetype::Mentor => "mentor",
            Archetype::Rebel => "rebel",
            Archetype::Sage => "sage",
            Archetype::Explorer => "explorer",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.as_str() == value)
    }
}

impl fmt::Display for Archetype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered drama level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DramaLevel {
    Low,
    Medium,
    High,
}

impl DramaLevel {
    pub const ALL: [DramaLevel; 3] = [DramaLevel::Low, DramaLevel::Medium, DramaLevel::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            DramaLevel::Low => "low",
            DramaLevel::Medium => "medium",
            DramaLevel::High => "high",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.as_str() == value)
    }

    /// Bucket a 0-100 drama score into a level.
    pub fn from_score(score: u8) -> Self {
        match score {
            0..=33 => DramaLevel::Low,
            34..=66 => DramaLevel::Medium,
            _ => DramaLevel::High,
        }
    }
}

impl fmt::Display for DramaLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Drama input: the enumerated level from `/api/generate`, or the 0-100
/// score from `/api/genSentence`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Drama {
    Level(DramaLevel),
    Score(u8),
}

impl Drama {
    pub fn level(&self) -> DramaLevel {
        match self {
            Drama::Level(level) => *level,
            Drama::Score(score) => DramaLevel::from_score(*score),
        }
    }
}

/// A fully validated, normalized generation request. Constructed per request
/// by the validator and dropped once the response is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub archetype: Archetype,
    pub drama: Drama,
    pub emoji_level: u8,
    pub prompt_hint: String,
    pub engagement_score: Option<u8>,
    pub locale: Option<String>,
}

impl GenerationRequest {
    pub fn drama_level(&self) -> DramaLevel {
        self.drama.level()
    }
}

/// Successful result of the generation client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationOutcome {
    pub text: String,
    pub attempts: u32,
}
