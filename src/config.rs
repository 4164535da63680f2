//! Run configuration
//!
//! One configurable workflow instead of per-environment script variants:
//! everything the variants used to differ on (headless mode, verbosity,
//! marker set, timeout budgets) is a field here.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::human::Pacing;
use crate::markers::MarkerSet;

/// Per-step bounded-wait budgets, in milliseconds.
///
/// Every wait in the workflow is bounded by one of these; there are no
/// unbounded suspensions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    /// Sign-in page navigation + settle
    pub navigation_ms: u64,
    /// Login form fields becoming visible
    pub login_field_ms: u64,
    /// Post-login confirmation marker
    pub confirmation_ms: u64,
    /// Sustained-idle window required to call the network settled
    pub settle_idle_ms: u64,
    /// Overall budget for reaching network idleness on the dashboard
    pub settle_ms: u64,
    /// Action-trigger control becoming visible before dispatch
    pub action_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            navigation_ms: 60_000,
            login_field_ms: 5_000,
            confirmation_ms: 60_000,
            settle_idle_ms: 500,
            settle_ms: 30_000,
            action_ms: 10_000,
        }
    }
}

/// Configuration for one automation run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Run Chrome headless
    pub headless: bool,
    /// Emit probe-level detail in the logs
    pub debug_logging: bool,
    /// Viewport width
    pub viewport_width: u32,
    /// Viewport height
    pub viewport_height: u32,
    /// Explicit Chrome binary (None = autodiscover)
    pub chrome_path: Option<String>,
    /// DOM signposts for the login flow and the dashboard
    pub markers: MarkerSet,
    /// Bounded-wait budgets
    pub timeouts: Timeouts,
    /// Humanization pause bounds
    pub pacing: Pacing,
    /// Screenshot written when the run ends in a success outcome
    pub final_screenshot: PathBuf,
    /// Screenshot written when the run ends in a failure outcome
    pub error_screenshot: PathBuf,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            headless: true,
            debug_logging: false,
            viewport_width: 2200,
            viewport_height: 1000,
            chrome_path: None,
            markers: MarkerSet::default(),
            timeouts: Timeouts::default(),
            pacing: Pacing::default(),
            final_screenshot: PathBuf::from("final-screenshot.png"),
            error_screenshot: PathBuf::from("error-screenshot.png"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_defaults() {
        let t = Timeouts::default();
        assert_eq!(t.navigation_ms, 60_000);
        assert_eq!(t.confirmation_ms, 60_000);
        assert_eq!(t.login_field_ms, 5_000);
        assert!(t.settle_idle_ms < t.settle_ms);
    }

    #[test]
    fn test_config_defaults() {
        let config = RunConfig::default();
        assert!(config.headless);
        assert!(!config.debug_logging);
        assert_eq!(
            (config.viewport_width, config.viewport_height),
            (2200, 1000)
        );
        assert_eq!(config.pacing.min_ms, 500);
        assert_eq!(config.pacing.max_ms, 1500);
    }
}
