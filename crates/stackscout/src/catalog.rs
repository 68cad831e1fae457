use crate::prelude::{println, *};
use colored::Colorize;
use stackscout_core::catalog::{Category, Dimension, Technology};
use stackscout_core::compare::{Analysis, Comparison};
use stackscout_core::input::{AnalyzeArgs, SelectionArgs};
use stackscout_core::scoring::Context;

#[derive(Debug, clap::Args)]
pub struct ListOptions {
    /// Only list technologies in this category
    #[arg(short, long)]
    category: Option<Category>,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Debug, clap::Args)]
pub struct AnalyzeOptions {
    /// Technology id (e.g. "nextjs")
    id: String,

    /// Scoring profile: default, mvp or enterprise
    #[arg(short, long, default_value = "default")]
    context: Context,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Debug, clap::Args)]
pub struct CompareOptions {
    /// Two to four technology ids
    #[arg(required = true)]
    ids: Vec<String>,

    /// Scoring profile: default, mvp or enterprise
    #[arg(short, long, default_value = "default")]
    context: Context,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

fn banner(title: &str) {
    println!("\n{}", "=".repeat(80).bright_cyan());
    println!("{}", title.bright_cyan().bold());
    println!("{}", "=".repeat(80).bright_cyan());
}

fn score_cell(score: u8) -> String {
    match score {
        80..=u8::MAX => score.to_string().bright_green().to_string(),
        60..=79 => score.to_string().bright_yellow().to_string(),
        _ => score.to_string().bright_red().to_string(),
    }
}

// ============================================================================
// list
// ============================================================================

pub fn list(options: ListOptions, global: crate::Global) -> Result<()> {
    let services = services(&global)?;
    let catalog = services.catalog();

    let technologies: Vec<&Technology> = catalog
        .iter()
        .filter(|tech| options.category.map_or(true, |c| tech.category == c))
        .collect();

    if options.json {
        return output_json(&technologies);
    }

    banner(&f!("TECHNOLOGIES ({})", technologies.len()));

    for (category, techs) in catalog.all_grouped_by_category() {
        if options.category.is_some_and(|c| c != category) {
            continue;
        }

        println!("\n{}", category.as_str().bright_magenta().bold());
        let mut table = new_table();
        for tech in techs {
            table.add_row(prettytable::row![
                tech.id.bright_yellow(),
                tech.name.bright_white(),
                tech.description
            ]);
        }
        table.printstd();
    }

    Ok(())
}

// ============================================================================
// analyze
// ============================================================================

pub fn analyze(options: AnalyzeOptions, global: crate::Global) -> Result<()> {
    let services = services(&global)?;
    let analysis = services
        .analyze(&AnalyzeArgs {
            id: options.id,
            context: options.context,
        })
        .map_err(report)?;

    if options.json {
        return output_json(&analysis);
    }

    output_analysis(&analysis);
    Ok(())
}

fn output_analysis(analysis: &Analysis) {
    banner(&f!("{} ({})", analysis.name, analysis.category));
    println!("{}", analysis.description);
    println!(
        "\n{} {} ({} profile)",
        "Overall:".bold(),
        score_cell(analysis.overall),
        analysis.context
    );

    let mut table = new_table();
    table.add_row(prettytable::row![
        "Dimension".bold().cyan(),
        "Score".bold().cyan(),
        "Weight".bold().cyan()
    ]);
    for row in &analysis.breakdown {
        table.add_row(prettytable::row![
            row.dimension,
            score_cell(row.score),
            f!("{}%", row.weight)
        ]);
    }
    println!();
    table.printstd();

    println!(
        "\n{} {}",
        "Strengths:".bright_green().bold(),
        dimension_list(&analysis.strengths)
    );
    println!(
        "{} {}",
        "Weaknesses:".bright_red().bold(),
        dimension_list(&analysis.weaknesses)
    );

    if !analysis.compatible_with.is_empty() {
        println!(
            "{} {}",
            "Works well with:".bold(),
            analysis.compatible_with.join(", ")
        );
    }
}

fn dimension_list(dimensions: &[Dimension]) -> String {
    if dimensions.is_empty() {
        return "none".bright_black().to_string();
    }
    dimensions
        .iter()
        .map(|d| d.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

// ============================================================================
// compare
// ============================================================================

pub fn compare(options: CompareOptions, global: crate::Global) -> Result<()> {
    let services = services(&global)?;
    let comparison = services
        .compare(&SelectionArgs {
            ids: options.ids,
            context: options.context,
        })
        .map_err(report)?;

    if options.json {
        return output_json(&comparison);
    }

    output_comparison(&comparison);
    Ok(())
}

fn output_comparison(comparison: &Comparison) {
    banner(&f!("COMPARISON ({} profile)", comparison.context));

    let mut ranking = new_table();
    ranking.add_row(prettytable::row![
        "#".bold().cyan(),
        "Technology".bold().cyan(),
        "Category".bold().cyan(),
        "Overall".bold().cyan()
    ]);
    for (i, tech) in comparison.ranking.iter().enumerate() {
        ranking.add_row(prettytable::row![
            i + 1,
            f!("{} ({})", tech.name, tech.id),
            tech.category,
            score_cell(tech.overall)
        ]);
    }
    println!();
    ranking.printstd();

    let mut dimensions = new_table();
    let mut header = prettytable::Row::new(vec![prettytable::Cell::new("Dimension")]);
    if let Some(first) = comparison.dimensions.first() {
        for (id, _) in &first.scores {
            header.add_cell(prettytable::Cell::new(id));
        }
    }
    header.add_cell(prettytable::Cell::new("Winner"));
    dimensions.add_row(header);
    for result in &comparison.dimensions {
        let mut row = prettytable::Row::new(vec![prettytable::Cell::new(result.dimension.as_str())]);
        for (_, score) in &result.scores {
            row.add_cell(prettytable::Cell::new(&score_cell(*score)));
        }
        row.add_cell(prettytable::Cell::new(result.winner.label()));
        dimensions.add_row(row);
    }
    println!();
    dimensions.printstd();

    if !comparison.compatibility.is_empty() {
        println!("\n{}", "Compatibility".bold());
        for entry in &comparison.compatibility {
            let mark = if entry.compatible {
                "✓".bright_green()
            } else {
                "✗".bright_red()
            };
            println!("  {} {}: {}", entry.label, mark, entry.note);
        }
    }

    println!("\n{} {}", "Verdict:".bold(), comparison.verdict.text());
}
