//! # caughtup
//!
//! Unattended bulk-scheduling for GaggleAmp activity queues.
//!
//! One run signs into the dashboard, waits for the asynchronously-rendered
//! activity queue to settle, classifies what it sees, and bulk-schedules
//! pending activities when there are any. Runs are idempotent: an empty
//! queue is a clean no-op, and a queue that was just actioned classifies
//! as empty on the next run.
//!
//! The browser is driven over a minimal hand-rolled CDP client with
//! human-paced interaction (curved mouse paths, per-keystroke delays, and
//! a random pause around every action) so the timing doesn't read as
//! scripted.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use caughtup::{workflow, Credentials, RunConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let credentials = Credentials::from_env().expect("credentials");
//!     let config = RunConfig::default();
//!
//!     let report = workflow::run(&config, &credentials).await;
//!     std::process::exit(if report.outcome.is_success() { 0 } else { 1 });
//! }
//! ```
//!
//! ## Configuration
//!
//! Every DOM signpost the workflow depends on lives in [`MarkerSet`]; the
//! target UI drifts over time, and drift is fixed by editing the table,
//! not the control flow. Timeout budgets and pacing bounds sit alongside
//! it in [`RunConfig`].

pub mod activity;
pub mod auth;
pub mod browser;
pub mod cdp;
pub mod config;
pub mod credentials;
pub mod error;
pub mod human;
pub mod logging;
pub mod markers;
pub mod page;
pub mod workflow;

// Re-exports
pub use activity::{PageStatus, RunOutcome};
pub use auth::LoginError;
pub use browser::Browser;
pub use config::{RunConfig, Timeouts};
pub use credentials::{Credentials, CredentialsError};
pub use error::{Error, Result};
pub use human::Pacing;
pub use markers::{ActivityMarkers, LoginMarkers, MarkerSet};
pub use page::{Element, Page};
pub use workflow::RunReport;
