//! Answer complexity tiers

use crate::errors::AppError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Verbosity and citation style of a generated answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComplexityTier {
    /// Short answer, no source links anywhere
    Simple,
    /// Detailed answer, sources grouped at the end
    #[default]
    Medium,
    /// Very detailed answer, every project linked inline
    Hard,
}

impl ComplexityTier {
    /// Tier for a chat user who has never picked one
    pub const FIRST_RUN: ComplexityTier = ComplexityTier::Hard;

    pub const ALL: [ComplexityTier; 3] = [
        ComplexityTier::Simple,
        ComplexityTier::Medium,
        ComplexityTier::Hard,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ComplexityTier::Simple => "simple",
            ComplexityTier::Medium => "medium",
            ComplexityTier::Hard => "hard",
        }
    }

    /// Whether source URLs appear in the rendered context
    pub fn includes_sources(&self) -> bool {
        !matches!(self, ComplexityTier::Simple)
    }
}

impl fmt::Display for ComplexityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComplexityTier {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "simple" => Ok(ComplexityTier::Simple),
            "medium" => Ok(ComplexityTier::Medium),
            "hard" => Ok(ComplexityTier::Hard),
            other => Err(AppError::Validation {
                message: format!("unknown complexity level '{}', expected simple, medium or hard", other),
                field: Some("complexity_level".to_string()),
            }),
        }
    }
}
