//! Mapping from perplexity to a bounded score and a categorical label

use core::fmt;

use serde::{Deserialize, Serialize};

/// Perplexity at or below which text gets the maximum score,
/// and below which it is labelled AI-generated.
pub const AI_PERPLEXITY: f64 = 60.0;

/// Perplexity at or above which text gets a zero score and is labelled human-written.
pub const HUMAN_PERPLEXITY: f64 = 80.0;

/// Upper bound of the score range `[0, MAX_SCORE]`.
pub const MAX_SCORE: f64 = 5.0;

/// Categorical verdict for a piece of text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Label {
    #[serde(rename = "AI-generated")]
    AiGenerated,
    #[serde(rename = "Possibly AI-generated")]
    PossiblyAiGenerated,
    #[serde(rename = "Human-written")]
    HumanWritten,
}

impl Label {
    /// Label for a perplexity value.
    ///
    /// The lower bound is exclusive for "AI-generated" and the upper bound
    /// inclusive for "Human-written".
    #[must_use]
    pub fn from_perplexity(perplexity: f64) -> Self {
        if perplexity < AI_PERPLEXITY {
            Self::AiGenerated
        } else if perplexity < HUMAN_PERPLEXITY {
            Self::PossiblyAiGenerated
        } else {
            Self::HumanWritten
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AiGenerated => "AI-generated",
            Self::PossiblyAiGenerated => "Possibly AI-generated",
            Self::HumanWritten => "Human-written",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Score in `[0, 5]`: 5 at perplexity ≤ 60, 0 at ≥ 80, linear in between.
#[must_use]
pub fn score(perplexity: f64) -> f64 {
    if perplexity >= HUMAN_PERPLEXITY {
        0.0
    } else if perplexity <= AI_PERPLEXITY {
        MAX_SCORE
    } else {
        MAX_SCORE
            - ((perplexity - AI_PERPLEXITY) / (HUMAN_PERPLEXITY - AI_PERPLEXITY)) * MAX_SCORE
    }
}

/// Perplexity together with its derived score and label
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Assessment {
    pub perplexity: f64,
    pub score: f64,
    pub label: Label,
}

impl Assessment {
    #[must_use]
    pub fn from_perplexity(perplexity: f64) -> Self {
        Self {
            perplexity,
            score: score(perplexity),
            label: Label::from_perplexity(perplexity),
        }
    }
}
