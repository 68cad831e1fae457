#[derive(Debug, clap::Parser)]
#[command(name = "mcp")]
#[command(about = "Serve the StackScout tools to MCP clients")]
pub struct App {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, clap::Subcommand)]
pub enum Commands {
    /// Read JSON-RPC requests from stdin, one per line (for editor and agent integrations)
    #[clap(name = "stdio")]
    Stdio,

    /// Accept JSON-RPC requests over HTTP at /message
    #[clap(name = "sse")]
    Sse(SseOptions),
}

#[derive(Debug, clap::Args)]
pub struct SseOptions {
    /// Port to listen on
    #[arg(short, long, env = "STACKSCOUT_MCP_PORT", default_value = "3000")]
    pub port: u16,

    /// Address to bind; keep the loopback default unless clients are remote
    #[arg(long, env = "STACKSCOUT_MCP_HOST", default_value = "127.0.0.1")]
    pub host: String,
}

impl SseOptions {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
