//! Caller-facing operations
//!
//! Each operation has a typed entry point (used by the CLI) and a tool entry
//! point that takes raw JSON arguments and always returns a [`ToolOutcome`]
//! (used by the MCP server). Local operations never touch the network.

use std::sync::Arc;

use serde_json::Value;
use stackscout_core::catalog::Catalog;
use stackscout_core::compare::{Analysis, Comparison, Engine};
use stackscout_core::format;
use stackscout_core::input::{self, AnalyzeArgs, ListArgs, SelectionArgs};
use stackscout_core::recommend::{self, RecommendRequest, StackScore};
use stackscout_core::{ScoutError, ToolOutcome};
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::poller::{CompletedJob, JobPoller, ProgressObserver, Silent};
use crate::remote::{HttpTransport, RemoteClient, Transport};
use crate::usage::{FileLedger, MemoryLedger, UsageLedger};

pub const DEMO_LIMIT_MESSAGE: &str =
    "Demo mode allows one recommendation per day. Set STACKSCOUT_API_KEY for unlimited use.";

/// A finished recommendation
#[derive(Debug, Clone)]
pub struct Recommendation {
    pub completed: CompletedJob,
    pub demo: bool,
}

pub struct Services<T = HttpTransport> {
    catalog: Catalog,
    config: Config,
    client: RemoteClient<T>,
    poller: JobPoller<T>,
    ledger: Arc<dyn UsageLedger>,
    /// Held from the daily check until the submission is recorded
    demo_gate: tokio::sync::Mutex<()>,
}

impl Services<HttpTransport> {
    /// Production wiring: builtin catalog, reqwest transport, file ledger
    pub fn from_config(config: Config) -> Result<Self, ScoutError> {
        let catalog = Catalog::builtin()
            .map_err(|e| ScoutError::Configuration(format!("Builtin catalog is invalid: {e}")))?;
        let transport = HttpTransport::new(&config)?;
        let ledger: Arc<dyn UsageLedger> = match FileLedger::default_location() {
            Ok(ledger) => Arc::new(ledger),
            Err(e) => {
                log::warn!("demo usage will not persist: {e}");
                Arc::new(MemoryLedger::default())
            }
        };
        Ok(Self::new(catalog, config, transport, ledger))
    }
}

impl<T: Transport> Services<T> {
    pub fn new(catalog: Catalog, config: Config, transport: T, ledger: Arc<dyn UsageLedger>) -> Self {
        let client = RemoteClient::new(transport, &config);
        let poller = JobPoller::new(client.clone(), &config.poll);
        Self {
            catalog,
            config,
            client,
            poller,
            ledger,
            demo_gate: tokio::sync::Mutex::new(()),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    fn engine(&self) -> Engine<'_> {
        Engine::new(&self.catalog)
    }

    // ============================================================================
    // Typed operations
    // ============================================================================

    pub fn list(&self, args: &ListArgs) -> String {
        format::render_catalog(&self.catalog, args.category)
    }

    pub fn analyze(&self, args: &AnalyzeArgs) -> Result<Analysis, ScoutError> {
        self.engine().analyze(&args.id, args.context)
    }

    pub fn compare(&self, args: &SelectionArgs) -> Result<Comparison, ScoutError> {
        self.engine().compare(&args.ids, args.context)
    }

    /// Validated locally before anything is sent
    pub async fn score(&self, args: &SelectionArgs) -> Result<StackScore, ScoutError> {
        recommend::validate_stack(&self.catalog, &args.ids)?;
        self.client.score(&args.ids, args.context).await
    }

    /// Submit a blueprint job and wait for it. Demo mode is forced without
    /// an API key and is limited to one accepted submission per day.
    pub async fn recommend(
        &self,
        request: &RecommendRequest,
        cancel: &CancellationToken,
        observer: &dyn ProgressObserver,
    ) -> Result<Recommendation, ScoutError> {
        request.validate()?;

        let demo = request.demo || self.config.demo_only();
        let request = RecommendRequest {
            demo,
            ..request.clone()
        };
        let body = request.to_body(&self.catalog);

        let job = if demo {
            // a rejected submission drops the guard without using the day
            let _guard = self.demo_gate.lock().await;
            if self.ledger.used_today()? {
                return Err(ScoutError::RateLimited {
                    message: DEMO_LIMIT_MESSAGE.to_string(),
                    retry_after: None,
                });
            }
            let job = self.poller.submit(body).await?;
            if let Err(e) = self.ledger.record() {
                log::warn!("failed to record demo usage: {e}");
            }
            job
        } else {
            self.poller.submit(body).await?
        };

        let completed = self.poller.wait(job, cancel, observer).await?;
        Ok(Recommendation { completed, demo })
    }

    pub fn render_recommendation(&self, recommendation: &Recommendation) -> String {
        let mut text = format::render_job_result(
            &recommendation.completed.job.id,
            &recommendation.completed.result,
            &self.catalog,
        );
        if recommendation.demo {
            text.push_str("\n_Generated in demo mode (one recommendation per day)._\n");
        }
        text
    }

    // ============================================================================
    // Tool entry points
    // ============================================================================

    /// Dispatch a tool call by name; `None` when no such tool exists
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: Option<Value>,
        cancel: &CancellationToken,
    ) -> Option<ToolOutcome> {
        let outcome = match name {
            "list_technologies" => self.list_technologies(arguments),
            "analyze_tech" => self.analyze_tech(arguments),
            "compare_techs" => self.compare_techs(arguments),
            "score_stack" => self.score_stack(arguments).await,
            "recommend_stack" => self.recommend_stack(arguments, cancel).await,
            _ => return None,
        };
        Some(outcome)
    }

    pub fn list_technologies(&self, arguments: Option<Value>) -> ToolOutcome {
        input::parse_list_args(arguments)
            .map(|args| self.list(&args))
            .into()
    }

    pub fn analyze_tech(&self, arguments: Option<Value>) -> ToolOutcome {
        input::parse_analyze_args(arguments)
            .and_then(|args| self.analyze(&args))
            .map(|analysis| format::render_analysis(&analysis))
            .into()
    }

    pub fn compare_techs(&self, arguments: Option<Value>) -> ToolOutcome {
        input::parse_compare_args(arguments)
            .and_then(|args| self.compare(&args))
            .map(|comparison| format::render_comparison(&comparison))
            .into()
    }

    pub async fn score_stack(&self, arguments: Option<Value>) -> ToolOutcome {
        let result = async {
            let args = input::parse_score_args(arguments)?;
            let score = self.score(&args).await?;
            Ok::<_, ScoutError>(format::render_stack_score(&args.ids, &score))
        };
        result.await.into()
    }

    pub async fn recommend_stack(
        &self,
        arguments: Option<Value>,
        cancel: &CancellationToken,
    ) -> ToolOutcome {
        let result = async {
            let request = input::parse_recommend_args(arguments)?;
            let recommendation = self.recommend(&request, cancel, &Silent).await?;
            Ok::<_, ScoutError>(self.render_recommendation(&recommendation))
        };
        result.await.into()
    }
}
