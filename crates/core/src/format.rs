//! Markdown rendering for every report an operation returns

use crate::catalog::{Catalog, Category, Dimension};
use crate::compare::{Analysis, Comparison};
use crate::recommend::{Blueprint, StackScore};
use serde_json::Value;
use std::fmt::Write;

/// Catalog listing grouped by category, optionally restricted to one
pub fn render_catalog(catalog: &Catalog, category: Option<Category>) -> String {
    let mut out = String::new();
    let groups = catalog.all_grouped_by_category();

    let total: usize = groups
        .iter()
        .filter(|(c, _)| category.map_or(true, |wanted| wanted == **c))
        .map(|(_, techs)| techs.len())
        .sum();

    let _ = writeln!(out, "# Technologies ({total})");

    for (group, techs) in &groups {
        if category.is_some_and(|wanted| wanted != *group) {
            continue;
        }
        let _ = writeln!(out, "\n## {group}\n");
        for tech in techs {
            if tech.description.is_empty() {
                let _ = writeln!(out, "- **{}** (`{}`)", tech.name, tech.id);
            } else {
                let _ = writeln!(
                    out,
                    "- **{}** (`{}`): {}",
                    tech.name, tech.id, tech.description
                );
            }
        }
    }

    if total == 0 {
        out.push_str("\nNo technologies in this category.\n");
    }

    out
}

pub fn render_analysis(analysis: &Analysis) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "# {} ({})", analysis.name, analysis.category);
    if !analysis.description.is_empty() {
        let _ = writeln!(out, "\n{}", analysis.description);
    }
    let _ = writeln!(
        out,
        "\n**Overall score ({} context): {}/100**",
        analysis.context, analysis.overall
    );

    out.push_str("\n## Breakdown\n\n| Dimension | Score | Weight |\n|---|---|---|\n");
    for row in &analysis.breakdown {
        let _ = writeln!(out, "| {} | {} | {}% |", row.dimension, row.score, row.weight);
    }

    let _ = writeln!(out, "\n## Strengths\n\n{}", bullet_dimensions(&analysis.strengths));
    let _ = writeln!(out, "\n## Weaknesses\n\n{}", bullet_dimensions(&analysis.weaknesses));

    out.push_str("\n## Works well with\n\n");
    if analysis.compatible_with.is_empty() {
        out.push_str("- No declared integrations\n");
    } else {
        for name in &analysis.compatible_with {
            let _ = writeln!(out, "- {name}");
        }
    }

    out
}

fn bullet_dimensions(dimensions: &[Dimension]) -> String {
    if dimensions.is_empty() {
        return "- None".to_string();
    }
    dimensions
        .iter()
        .map(|d| format!("- {d}"))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_comparison(comparison: &Comparison) -> String {
    let mut out = String::new();

    let names: Vec<&str> = comparison.ranking.iter().map(|r| r.name.as_str()).collect();
    let _ = writeln!(
        out,
        "# Comparison: {} ({} context)",
        names.join(" vs "),
        comparison.context
    );

    out.push_str("\n## Overall ranking\n\n");
    for (i, ranked) in comparison.ranking.iter().enumerate() {
        let _ = writeln!(
            out,
            "{}. **{}** ({}): {}/100",
            i + 1,
            ranked.name,
            ranked.category,
            ranked.overall
        );
    }

    out.push_str("\n## By dimension\n\n| Dimension |");
    if let Some(first) = comparison.dimensions.first() {
        for (id, _) in &first.scores {
            let _ = write!(out, " {id} |");
        }
        out.push_str(" Winner |\n|---|");
        for _ in &first.scores {
            out.push_str("---|");
        }
        out.push_str("---|\n");
    }
    for result in &comparison.dimensions {
        let _ = write!(out, "| {} |", result.dimension);
        for (_, score) in &result.scores {
            let _ = write!(out, " {score} |");
        }
        let _ = writeln!(out, " {} |", result.winner.label());
    }

    out.push_str("\n## Compatibility\n\n");
    for entry in &comparison.compatibility {
        let mark = if entry.compatible { "✓" } else { "✗" };
        let _ = writeln!(out, "- {} {}: {}", entry.label, mark, entry.note);
    }

    let _ = writeln!(out, "\n## Verdict\n\n{}", comparison.verdict.text());

    out
}

pub fn render_stack_score(ids: &[String], score: &StackScore) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "# Stack score: {:.0}/100", score.overall);
    let _ = writeln!(out, "\nStack: {}", ids.join(", "));

    if !score.breakdown.is_empty() {
        out.push_str("\n## Breakdown\n\n");
        for (name, value) in &score.breakdown {
            let _ = writeln!(out, "- {name}: {value:.0}");
        }
    }

    if !score.notes.is_empty() {
        out.push_str("\n## Notes\n\n");
        for note in &score.notes {
            let _ = writeln!(out, "- {note}");
        }
    }

    if !score.warnings.is_empty() {
        out.push_str("\n## Warnings\n\n");
        for warning in &score.warnings {
            let _ = writeln!(out, "- ⚠ {warning}");
        }
    }

    out
}

pub fn render_blueprint(blueprint: &Blueprint, catalog: &Catalog) -> String {
    let mut out = String::from("# Recommended stack\n");

    if !blueprint.summary.is_empty() {
        let _ = writeln!(out, "\n{}", blueprint.summary);
    }

    out.push('\n');
    for pick in &blueprint.stack {
        let name = catalog.display_name(&pick.technology);
        if pick.rationale.is_empty() {
            let _ = writeln!(out, "- **{}**: {}", pick.category, name);
        } else {
            let _ = writeln!(
                out,
                "- **{}**: {} - {}",
                pick.category, name, pick.rationale
            );
        }
    }

    if let Some(cost) = &blueprint.estimated_monthly_cost {
        let _ = writeln!(out, "\n**Estimated monthly cost:** {cost}");
    }

    if !blueprint.warnings.is_empty() {
        out.push_str("\n## Warnings\n\n");
        for warning in &blueprint.warnings {
            let _ = writeln!(out, "- ⚠ {warning}");
        }
    }

    out
}

/// Render a completed job result: a blueprint when the payload has that
/// shape, otherwise the raw JSON
pub fn render_job_result(job_id: &str, result: &Value, catalog: &Catalog) -> String {
    let body = match Blueprint::from_result(result) {
        Some(blueprint) => render_blueprint(&blueprint, catalog),
        None => format!(
            "# Recommendation result\n\n```json\n{}\n```\n",
            serde_json::to_string_pretty(result).unwrap_or_else(|_| result.to_string())
        ),
    };
    format!("{body}\n_Job {job_id}_\n")
}
