use crate::prelude::*;
use clap::Parser;

mod catalog;
mod config;
mod mcp;
mod poller;
mod prelude;
mod recommend;
mod remote;
mod service;
mod usage;

#[derive(Debug, clap::Parser)]
#[command(
    author,
    version,
    about,
    long_about = "Explore, compare and score web technologies, and generate stack blueprints"
)]
pub struct App {
    #[command(subcommand)]
    pub command: SubCommands,

    #[clap(flatten)]
    global: Global,
}

#[derive(Debug, Clone, clap::Args)]
pub struct Global {
    /// StackScout API base URL
    #[clap(
        long,
        env = "STACKSCOUT_API_URL",
        global = true,
        default_value = config::Config::DEFAULT_BASE_URL
    )]
    api_url: String,

    /// StackScout API key. Without one, recommendations run in demo mode
    #[clap(long, env = "STACKSCOUT_API_KEY", global = true, hide_env_values = true)]
    api_key: Option<String>,

    /// Per-request timeout in seconds
    #[clap(long, env = "STACKSCOUT_TIMEOUT", global = true, default_value = "30")]
    timeout: u64,

    /// Whether to display additional information.
    #[clap(long, env = "STACKSCOUT_VERBOSE", global = true, default_value = "false")]
    verbose: bool,
}

#[derive(Debug, clap::Parser)]
pub enum SubCommands {
    /// List catalog technologies
    List(crate::catalog::ListOptions),

    /// Analyze a single technology
    Analyze(crate::catalog::AnalyzeOptions),

    /// Compare two to four technologies
    Compare(crate::catalog::CompareOptions),

    /// Score a technology stack with the StackScout API
    Score(crate::recommend::ScoreOptions),

    /// Generate a stack blueprint for a project
    Recommend(crate::recommend::RecommendOptions),

    /// Model Context Protocol server
    MCP(crate::mcp::App),
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    color_eyre::install()?;

    let app = App::parse();

    match app.command {
        SubCommands::List(options) => crate::catalog::list(options, app.global),
        SubCommands::Analyze(options) => crate::catalog::analyze(options, app.global),
        SubCommands::Compare(options) => crate::catalog::compare(options, app.global),
        SubCommands::Score(options) => crate::recommend::score(options, app.global).await,
        SubCommands::Recommend(options) => crate::recommend::recommend(options, app.global).await,
        SubCommands::MCP(sub_app) => crate::mcp::run(sub_app, app.global).await,
    }
    .map_err(|err: color_eyre::eyre::Report| eyre!(err))
}
