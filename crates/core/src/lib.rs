//! Core library for stackscout
//!
//! This crate implements the **Functional Core** of the stackscout application,
//! following the Functional Core - Imperative Shell architectural pattern.
//!
//! # Architecture Overview
//!
//! The stackscout project uses a two-crate architecture to enforce separation of concerns:
//!
//! - **`stackscout_core`** (this crate): catalog, scoring and comparison logic, request and
//!   job models, argument parsing and rendering, with zero I/O
//! - **`stackscout`**: the remote client, job poller, usage ledger, CLI and MCP server
//!   (the Imperative Shell)
//!
//! Everything here is deterministic: the same catalog, arguments and server payloads always
//! produce the same reports, so tests use fixture data and never mock.
//!
//! # Module Organization
//!
//! - [`catalog`]: the technology registry and the embedded catalog data
//! - [`fuzzy`]: edit distance and "did you mean" suggestions
//! - [`scoring`]: contexts, weight vectors and tunable thresholds
//! - [`compare`]: single-technology analysis and N-way comparison
//! - [`error`]: error taxonomy, HTTP status mapping and the structured tool outcome
//! - [`input`]: typed parse boundary for operation arguments
//! - [`request`]: outbound request model and canonical cache keys
//! - [`job`]: job state machine, wire snapshots and the polling backoff schedule
//! - [`recommend`]: recommendation requests, stack scores and blueprints
//! - [`usage`]: the daily demo-usage rule
//! - [`format`]: Markdown rendering of every report
//!
//! # Example Usage
//!
//! ```rust,ignore
//! use stackscout_core::catalog::Catalog;
//! use stackscout_core::compare::Engine;
//! use stackscout_core::scoring::Context;
//!
//! let catalog = Catalog::builtin()?;
//! let comparison = Engine::new(&catalog)
//!     .compare(&["nextjs".into(), "sveltekit".into()], Context::Default)?;
//!
//! assert_eq!(comparison.compatibility.len(), 1);
//! println!("{}", stackscout_core::format::render_comparison(&comparison));
//! ```

pub mod catalog;
pub mod compare;
pub mod error;
pub mod format;
pub mod fuzzy;
pub mod input;
pub mod job;
pub mod recommend;
pub mod request;
pub mod scoring;
pub mod usage;

pub use error::{ErrorKind, ScoutError, ToolOutcome};
