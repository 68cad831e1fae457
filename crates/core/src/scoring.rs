//! Context-weighted scoring of a single technology
//!
//! A [`Context`] is a weighting profile over dimensions. Scoring is a pure
//! function of `(Technology, Context)` and rounds to the nearest integer so
//! that comparisons stay deterministic.

use crate::catalog::{Dimension, Technology};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Dimensions scoring at or above this are reported as strengths
pub const DEFAULT_STRENGTH_THRESHOLD: u8 = 80;

/// Dimensions scoring at or below this are reported as weaknesses
pub const DEFAULT_WEAKNESS_THRESHOLD: u8 = 40;

/// Score differences strictly below this are treated as a tie
pub const DEFAULT_TIE_MARGIN: u8 = 3;

/// Tunable thresholds used by the comparison engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thresholds {
    pub strength: u8,
    pub weakness: u8,
    pub tie_margin: u8,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            strength: DEFAULT_STRENGTH_THRESHOLD,
            weakness: DEFAULT_WEAKNESS_THRESHOLD,
            tie_margin: DEFAULT_TIE_MARGIN,
        }
    }
}

/// Weighting profile applied at scoring time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Context {
    #[default]
    Default,
    Mvp,
    Enterprise,
}

impl Context {
    pub const ALL: [Context; 3] = [Context::Default, Context::Mvp, Context::Enterprise];

    pub fn as_str(&self) -> &'static str {
        match self {
            Context::Default => "default",
            Context::Mvp => "mvp",
            Context::Enterprise => "enterprise",
        }
    }

    /// Weight per dimension, in percent. Each profile sums to 100.
    pub fn weights(&self) -> &'static [(Dimension, u32)] {
        match self {
            Context::Default => &[
                (Dimension::Performance, 20),
                (Dimension::DeveloperExperience, 20),
                (Dimension::Ecosystem, 20),
                (Dimension::Scalability, 15),
                (Dimension::Security, 15),
                (Dimension::Cost, 10),
            ],
            Context::Mvp => &[
                (Dimension::Performance, 10),
                (Dimension::DeveloperExperience, 35),
                (Dimension::Ecosystem, 20),
                (Dimension::Scalability, 5),
                (Dimension::Security, 5),
                (Dimension::Cost, 25),
            ],
            Context::Enterprise => &[
                (Dimension::Performance, 15),
                (Dimension::DeveloperExperience, 5),
                (Dimension::Ecosystem, 20),
                (Dimension::Scalability, 25),
                (Dimension::Security, 30),
                (Dimension::Cost, 5),
            ],
        }
    }

    /// Weight for one dimension; dimensions without a weight get zero
    pub fn weight(&self, dimension: Dimension) -> u32 {
        self.weights()
            .iter()
            .find(|(d, _)| *d == dimension)
            .map(|(_, w)| *w)
            .unwrap_or(0)
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Context {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "default" => Ok(Context::Default),
            "mvp" => Ok(Context::Mvp),
            "enterprise" => Ok(Context::Enterprise),
            _ => Err(format!(
                "Invalid context: {}. Valid contexts: default, mvp, enterprise",
                s
            )),
        }
    }
}

/// Weighted average of a technology's dimension scores, rounded half up
pub fn score(tech: &Technology, context: Context) -> u8 {
    let weights = context.weights();
    let total_weight: u32 = weights.iter().map(|(_, w)| w).sum();
    if total_weight == 0 {
        return 0;
    }

    let weighted: u32 = weights
        .iter()
        .map(|(dimension, weight)| u32::from(tech.dimension_score(*dimension)) * weight)
        .sum();

    let rounded = (weighted + total_weight / 2) / total_weight;
    rounded.min(100) as u8
}
