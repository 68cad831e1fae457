//! Single-technology analysis and N-way comparison
//!
//! Per-dimension winners are decided on raw dimension scores, the overall
//! verdict on context-weighted scores. Compatibility is read from the
//! catalog in both directions because declarations are not guaranteed to
//! be mirrored.

use crate::catalog::{Catalog, Category, Dimension, Technology};
use crate::error::ScoutError;
use crate::fuzzy;
use crate::scoring::{self, Context, Thresholds};
use serde::Serialize;
use std::collections::HashSet;

/// Fewest ids a comparison accepts
pub const MIN_COMPARE: usize = 2;

/// Most ids a comparison accepts
pub const MAX_COMPARE: usize = 4;

#[derive(Debug, Clone, Serialize)]
pub struct DimensionBreakdown {
    pub dimension: Dimension,
    pub score: u8,
    pub weight: u32,
}

/// Single-technology report
#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    pub id: String,
    pub name: String,
    pub category: Category,
    pub description: String,
    pub context: Context,
    pub overall: u8,
    pub breakdown: Vec<DimensionBreakdown>,
    pub strengths: Vec<Dimension>,
    pub weaknesses: Vec<Dimension>,
    /// Display names of declared-compatible technologies
    pub compatible_with: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RankedTechnology {
    pub id: String,
    pub name: String,
    pub category: Category,
    pub overall: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DimensionWinner {
    Technology(String),
    Tie,
}

impl DimensionWinner {
    pub fn label(&self) -> &str {
        match self {
            DimensionWinner::Technology(id) => id,
            DimensionWinner::Tie => "tie",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DimensionResult {
    pub dimension: Dimension,
    pub winner: DimensionWinner,
    /// Raw scores in input order
    pub scores: Vec<(String, u8)>,
}

/// One entry per unordered pair of compared technologies
#[derive(Debug, Clone, Serialize)]
pub struct CompatibilityEntry {
    pub a: String,
    pub b: String,
    pub label: String,
    pub compatible: bool,
    pub note: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Verdict {
    Winner {
        id: String,
        name: String,
        score: u8,
        runner_up: String,
        margin: u8,
    },
    Tie {
        names: Vec<String>,
        score: u8,
        tradeoffs: Vec<String>,
    },
}

impl Verdict {
    pub fn text(&self) -> String {
        match self {
            Verdict::Winner {
                name,
                score,
                runner_up,
                margin,
                ..
            } => format!(
                "{name} comes out ahead with an overall score of {score}, {margin} points over {runner_up}."
            ),
            Verdict::Tie {
                names,
                score,
                tradeoffs,
            } => {
                let mut text = format!(
                    "It's a tie between {} (around {score}). Choose based on trade-offs:",
                    names.join(" and ")
                );
                for tradeoff in tradeoffs {
                    text.push_str(&format!("\n- {tradeoff}"));
                }
                text
            }
        }
    }
}

/// N-way comparison report
#[derive(Debug, Clone, Serialize)]
pub struct Comparison {
    pub context: Context,
    /// Highest overall score first; equal scores keep input order
    pub ranking: Vec<RankedTechnology>,
    pub dimensions: Vec<DimensionResult>,
    pub compatibility: Vec<CompatibilityEntry>,
    pub verdict: Verdict,
}

/// Comparison engine over a read-only catalog
#[derive(Debug, Clone, Copy)]
pub struct Engine<'a> {
    catalog: &'a Catalog,
    thresholds: Thresholds,
}

impl<'a> Engine<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self {
            catalog,
            thresholds: Thresholds::default(),
        }
    }

    pub fn with_thresholds(mut self, thresholds: Thresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn thresholds(&self) -> Thresholds {
        self.thresholds
    }

    /// Exact lookup; a miss carries fuzzy suggestions from the full id set
    pub fn lookup(&self, id: &str) -> Result<&'a Technology, ScoutError> {
        self.catalog.get(id).ok_or_else(|| {
            ScoutError::unknown_technology(
                id,
                fuzzy::suggest(id, self.catalog.ids(), fuzzy::DEFAULT_SUGGESTION_LIMIT),
            )
        })
    }

    pub fn analyze(&self, id: &str, context: Context) -> Result<Analysis, ScoutError> {
        let tech = self.lookup(id)?;

        let breakdown: Vec<DimensionBreakdown> = tech
            .scores
            .iter()
            .map(|(dimension, score)| DimensionBreakdown {
                dimension: *dimension,
                score: *score,
                weight: context.weight(*dimension),
            })
            .collect();

        let strengths = tech
            .scores
            .iter()
            .filter(|(_, s)| **s >= self.thresholds.strength)
            .map(|(d, _)| *d)
            .collect();

        let weaknesses = tech
            .scores
            .iter()
            .filter(|(_, s)| **s <= self.thresholds.weakness)
            .map(|(d, _)| *d)
            .collect();

        let compatible_with = tech
            .compatible
            .iter()
            .map(|other| self.catalog.display_name(other).to_string())
            .collect();

        Ok(Analysis {
            id: tech.id.clone(),
            name: tech.name.clone(),
            category: tech.category,
            description: tech.description.clone(),
            context,
            overall: scoring::score(tech, context),
            breakdown,
            strengths,
            weaknesses,
            compatible_with,
        })
    }

    /// Check count and uniqueness before any lookup happens
    pub fn validate_selection(&self, ids: &[String]) -> Result<(), ScoutError> {
        if ids.len() < MIN_COMPARE {
            return Err(ScoutError::invalid_input(format!(
                "Provide at least {MIN_COMPARE} technology ids to compare (got {})",
                ids.len()
            )));
        }

        if ids.len() > MAX_COMPARE {
            return Err(ScoutError::invalid_input(format!(
                "Provide at most {MAX_COMPARE} technology ids to compare (got {})",
                ids.len()
            )));
        }

        let mut seen = HashSet::new();
        for id in ids {
            if !seen.insert(id.as_str()) {
                return Err(ScoutError::invalid_input(format!(
                    "Duplicate technology id: {id}. Each technology may appear only once"
                )));
            }
        }

        Ok(())
    }

    pub fn compare(&self, ids: &[String], context: Context) -> Result<Comparison, ScoutError> {
        self.validate_selection(ids)?;

        let techs: Vec<&Technology> = ids
            .iter()
            .map(|id| self.lookup(id))
            .collect::<Result<_, _>>()?;

        let mut ranking: Vec<RankedTechnology> = techs
            .iter()
            .map(|t| RankedTechnology {
                id: t.id.clone(),
                name: t.name.clone(),
                category: t.category,
                overall: scoring::score(t, context),
            })
            .collect();
        // sort_by is stable, so equal scores keep input order
        ranking.sort_by(|a, b| b.overall.cmp(&a.overall));

        let dimensions = Dimension::ALL
            .iter()
            .map(|dimension| self.dimension_result(&techs, *dimension))
            .collect::<Vec<_>>();

        let compatibility = compatibility_matrix(&techs);
        let verdict = self.verdict(&ranking, &techs);

        Ok(Comparison {
            context,
            ranking,
            dimensions,
            compatibility,
            verdict,
        })
    }

    fn dimension_result(&self, techs: &[&Technology], dimension: Dimension) -> DimensionResult {
        let scores: Vec<(String, u8)> = techs
            .iter()
            .map(|t| (t.id.clone(), t.dimension_score(dimension)))
            .collect();

        let mut sorted: Vec<&(String, u8)> = scores.iter().collect();
        sorted.sort_by(|a, b| b.1.cmp(&a.1));

        let winner = match (sorted.first(), sorted.get(1)) {
            (Some(top), Some(second))
                if top.1 == second.1 || top.1 - second.1 < self.thresholds.tie_margin =>
            {
                DimensionWinner::Tie
            }
            (Some(top), _) => DimensionWinner::Technology(top.0.clone()),
            (None, _) => DimensionWinner::Tie,
        };

        DimensionResult {
            dimension,
            winner,
            scores,
        }
    }

    fn verdict(&self, ranking: &[RankedTechnology], techs: &[&Technology]) -> Verdict {
        let top = &ranking[0];
        let second = &ranking[1];
        let margin = top.overall - second.overall;

        if margin >= self.thresholds.tie_margin && margin > 0 {
            return Verdict::Winner {
                id: top.id.clone(),
                name: top.name.clone(),
                score: top.overall,
                runner_up: second.name.clone(),
                margin,
            };
        }

        let tied: Vec<&Technology> = ranking
            .iter()
            .filter(|r| top.overall - r.overall < self.thresholds.tie_margin.max(1))
            .filter_map(|r| techs.iter().find(|t| t.id == r.id).copied())
            .collect();

        Verdict::Tie {
            names: tied.iter().map(|t| t.name.clone()).collect(),
            score: top.overall,
            tradeoffs: self.tradeoffs(&tied),
        }
    }

    /// For each tied technology, the dimensions where it beats every other
    /// tied technology by at least the tie margin
    fn tradeoffs(&self, tied: &[&Technology]) -> Vec<String> {
        let mut tradeoffs = Vec::new();

        for tech in tied {
            let leads: Vec<String> = Dimension::ALL
                .iter()
                .filter_map(|dimension| {
                    let own = tech.dimension_score(*dimension);
                    let best_other = tied
                        .iter()
                        .filter(|other| other.id != tech.id)
                        .map(|other| other.dimension_score(*dimension))
                        .max()?;
                    (own > best_other && own - best_other >= self.thresholds.tie_margin)
                        .then(|| format!("{dimension} ({own} vs {best_other})"))
                })
                .collect();

            if !leads.is_empty() {
                tradeoffs.push(format!("{} is stronger on {}", tech.name, leads.join(", ")));
            }
        }

        if tradeoffs.is_empty() {
            tradeoffs.push(format!(
                "No dimension separates them by {} or more points; pick on team familiarity",
                self.thresholds.tie_margin
            ));
        }

        tradeoffs
    }
}

/// Every unordered pair exactly once, labelled in input order
fn compatibility_matrix(techs: &[&Technology]) -> Vec<CompatibilityEntry> {
    let mut entries = Vec::new();

    for (i, a) in techs.iter().enumerate() {
        for b in &techs[i + 1..] {
            let a_to_b = a.declares_compatible(&b.id);
            let b_to_a = b.declares_compatible(&a.id);

            let note = match (a_to_b, b_to_a) {
                (true, true) => "Declared compatible by both".to_string(),
                (true, false) => format!("{} lists {} as compatible", a.name, b.name),
                (false, true) => format!("{} lists {} as compatible", b.name, a.name),
                (false, false) if a.category == b.category => format!(
                    "Alternatives: both are {} options, pick one",
                    a.category
                ),
                (false, false) => "No declared integration".to_string(),
            };

            entries.push(CompatibilityEntry {
                a: a.id.clone(),
                b: b.id.clone(),
                label: format!("{} ↔ {}", a.id, b.id),
                compatible: a_to_b || b_to_a,
                note,
            });
        }
    }

    entries
}
