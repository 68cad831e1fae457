use crate::prelude::{eprintln, println, *};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;
use stackscout_core::catalog::Dimension;
use stackscout_core::input::SelectionArgs;
use stackscout_core::job::Job;
use stackscout_core::recommend::{ProjectType, RecommendRequest, Scale, StackScore};
use stackscout_core::scoring::Context;
use tokio_util::sync::CancellationToken;

#[derive(Debug, clap::Args)]
pub struct ScoreOptions {
    /// Technology ids that make up the stack (one to eight)
    #[arg(required = true)]
    ids: Vec<String>,

    /// Scoring profile: default, mvp or enterprise
    #[arg(short, long, default_value = "default")]
    context: Context,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Debug, clap::Args)]
pub struct RecommendOptions {
    /// Kind of project (saas, ecommerce, blog, dashboard, api, mobile-backend, marketplace)
    #[arg(short = 't', long)]
    project_type: ProjectType,

    /// Expected scale (hobby, startup, growth, enterprise)
    #[arg(short, long)]
    scale: Scale,

    /// Dimension that matters most; repeat for several
    #[arg(short, long = "priority")]
    priorities: Vec<Dimension>,

    /// Free-form constraint (e.g. "must run on AWS"); repeat for several
    #[arg(long = "constraint")]
    constraints: Vec<String>,

    /// Use demo mode even when an API key is configured
    #[arg(long)]
    demo: bool,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

// ============================================================================
// score
// ============================================================================

pub async fn score(options: ScoreOptions, global: crate::Global) -> Result<()> {
    let services = services(&global)?;
    let args = SelectionArgs {
        ids: options.ids,
        context: options.context,
    };

    let spinner = new_spinner("Scoring stack...");
    let score = services.score(&args).await;
    spinner.finish_and_clear();
    let score = score.map_err(report)?;

    if options.json {
        return output_json(&score);
    }

    output_score(&args.ids, &score);
    Ok(())
}

fn output_score(ids: &[String], score: &StackScore) {
    println!("\n{}", "=".repeat(80).bright_cyan());
    println!(
        "{} {}",
        "STACK SCORE".bright_cyan().bold(),
        f!("{:.0}/100", score.overall).bright_yellow().bold()
    );
    println!("{}", "=".repeat(80).bright_cyan());
    println!("{}", ids.join(" + ").bright_white());

    if !score.breakdown.is_empty() {
        let mut table = new_table();
        for (dimension, value) in &score.breakdown {
            table.add_row(prettytable::row![dimension.bold().cyan(), f!("{value:.0}")]);
        }
        println!();
        table.printstd();
    }

    for note in &score.notes {
        println!("  {note}");
    }
    for warning in &score.warnings {
        println!("  {} {}", "⚠".bright_yellow(), warning);
    }
}

// ============================================================================
// recommend
// ============================================================================

pub async fn recommend(options: RecommendOptions, global: crate::Global) -> Result<()> {
    let services = services(&global)?;
    let request = RecommendRequest {
        project_type: options.project_type,
        scale: options.scale,
        priorities: options.priorities,
        constraints: options.constraints,
        demo: options.demo,
    };

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let spinner = new_spinner("Submitting blueprint request...");
    let observer = |job: &Job| {
        spinner.set_message(f!("Job {} is {} ({}%)", job.id, job.status, job.progress));
    };
    let recommendation = services.recommend(&request, &cancel, &observer).await;
    spinner.finish_and_clear();
    let recommendation = recommendation.map_err(report)?;

    if options.json {
        return output_json(&json!({
            "job": recommendation.completed.job,
            "result": recommendation.completed.result,
            "demo": recommendation.demo,
        }));
    }

    if global.verbose {
        eprintln!("Job {} completed", recommendation.completed.job.id);
    }

    println!("\n{}", "=".repeat(80).bright_cyan());
    println!("{}", "STACK BLUEPRINT".bright_cyan().bold());
    println!("{}", "=".repeat(80).bright_cyan());
    println!("{}", services.render_recommendation(&recommendation));
    Ok(())
}

fn new_spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(std::time::Duration::from_millis(100));
    spinner
}
