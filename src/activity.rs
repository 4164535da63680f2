//! Activity resolver and dispatcher
//!
//! Classifies the post-login dashboard into exactly one state and, only
//! when pending activities are ready, triggers the bulk-schedule action
//! once. Classification is recomputed from the live DOM on every call;
//! nothing is cached because the page mutates between probes.

use std::fmt;
use std::process::ExitCode;

use tracing::{debug, error, info, warn};

use crate::config::Timeouts;
use crate::error::{Error, Result};
use crate::human::Pacing;
use crate::markers::ActivityMarkers;
use crate::page::{escape_js_string, Page};

/// What the dashboard currently shows, decided by probing the DOM
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageStatus {
    /// The page never reached network idleness within budget. A slow page
    /// and an empty page look identical to a naive element check, so this
    /// is kept distinct from `Empty`.
    Loading,
    /// The empty-state prompt is showing: nothing to schedule
    Empty,
    /// The bulk-schedule control is present
    Actionable,
    /// Neither signpost found. The probe's assumptions about the markup
    /// are probably stale; this must be surfaced, not read as "empty".
    Indeterminate,
    /// A probe itself failed (session error, JavaScript exception)
    Errored,
}

impl fmt::Display for PageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PageStatus::Loading => "loading",
            PageStatus::Empty => "empty",
            PageStatus::Actionable => "actionable",
            PageStatus::Indeterminate => "indeterminate",
            PageStatus::Errored => "errored",
        };
        f.write_str(label)
    }
}

/// Terminal result of one run, mapped onto the process exit status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The bulk action was dispatched
    Success,
    /// The queue was empty; a clean no-op
    NoActionNeeded,
    /// The action control existed but dispatching it failed
    ActionFailed,
    /// Sign-in never completed
    AuthenticationFailed,
    /// Classification could not be confirmed either way
    Indeterminate,
}

impl RunOutcome {
    /// Outcome implied by a classification, assuming a dispatch for
    /// `Actionable` succeeds; the dispatcher downgrades to `ActionFailed`
    /// when it does not.
    pub fn from_status(status: PageStatus) -> Self {
        match status {
            PageStatus::Empty => RunOutcome::NoActionNeeded,
            PageStatus::Actionable => RunOutcome::Success,
            PageStatus::Loading | PageStatus::Indeterminate | PageStatus::Errored => {
                RunOutcome::Indeterminate
            }
        }
    }

    /// Success covers both "dispatched" and "nothing to do"
    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Success | RunOutcome::NoActionNeeded)
    }

    pub fn exit_code(&self) -> ExitCode {
        if self.is_success() {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        }
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RunOutcome::Success => "success",
            RunOutcome::NoActionNeeded => "no action needed",
            RunOutcome::ActionFailed => "action failed",
            RunOutcome::AuthenticationFailed => "authentication failed",
            RunOutcome::Indeterminate => "indeterminate",
        };
        f.write_str(label)
    }
}

/// Classify the current page into exactly one [`PageStatus`].
///
/// Probes run in fixed priority order: the empty-state marker is
/// authoritative and short-circuits; the action-ready marker is checked
/// second; anything else is indeterminate.
pub async fn classify(page: &Page, markers: &ActivityMarkers, timeouts: &Timeouts) -> PageStatus {
    debug!("Waiting for network idle before probing");
    if let Err(e) = page
        .wait_for_network_idle(timeouts.settle_idle_ms, timeouts.settle_ms)
        .await
    {
        warn!("Dashboard never settled: {}", e);
        return PageStatus::Loading;
    }

    match empty_state_present(page, markers).await {
        Ok(true) => {
            debug!("Empty-state prompt found");
            return PageStatus::Empty;
        }
        Ok(false) => debug!("No empty-state prompt"),
        Err(e) => {
            warn!("Empty-state probe failed: {}", e);
            return PageStatus::Errored;
        }
    }

    match action_ready_present(page, markers).await {
        Ok(true) => {
            debug!("Bulk-schedule control found");
            PageStatus::Actionable
        }
        Ok(false) => PageStatus::Indeterminate,
        Err(e) => {
            warn!("Action-ready probe failed: {}", e);
            PageStatus::Errored
        }
    }
}

/// True when the empty-state container is rendered and its heading carries
/// the expected text
async fn empty_state_present(page: &Page, markers: &ActivityMarkers) -> Result<bool> {
    let js = format!(
        r#"
        (() => {{
            const container = document.querySelector('{container}');
            const heading = document.querySelector('{heading}');
            return !!container && !!heading && (heading.textContent || '').includes('{text}');
        }})()
        "#,
        container = escape_js_string(&markers.empty_container),
        heading = escape_js_string(&markers.empty_heading),
        text = escape_js_string(&markers.empty_text),
    );

    page.evaluate(&js).await
}

/// True when the bulk-schedule control exists in the DOM
async fn action_ready_present(page: &Page, markers: &ActivityMarkers) -> Result<bool> {
    match page.find(&markers.action_button).await {
        Ok(_) => Ok(true),
        Err(Error::ElementNotFound(_)) => Ok(false),
        Err(e) => Err(e),
    }
}

/// Perform the bulk-schedule sequence once: ensure the select-all control
/// is checked (when the markup has one), then click the action control.
async fn dispatch(
    page: &Page,
    markers: &ActivityMarkers,
    timeouts: &Timeouts,
    pacing: &Pacing,
) -> Result<()> {
    if let Some(select_all) = &markers.select_all {
        match page.find(select_all).await {
            Ok(control) => {
                if control.is_checked().await? {
                    debug!("Select-all already checked");
                } else {
                    info!("Checking select-all control");
                    control.scroll_into_view().await?;
                    pacing.around(|| control.human_click()).await?;
                }
            }
            Err(Error::ElementNotFound(_)) => {
                debug!("No select-all control in current markup");
            }
            Err(e) => return Err(e),
        }
    }

    info!("Waiting for bulk-schedule control");
    let button = page
        .wait_for_visible(&markers.action_button, timeouts.action_ms)
        .await?;
    button.scroll_into_view().await?;

    info!("Clicking bulk-schedule control");
    pacing.around(|| button.human_click()).await?;
    info!("Bulk-schedule control clicked");

    Ok(())
}

/// Classify the dashboard and act on the result, reporting the outcome.
///
/// `Empty` and `Indeterminate` never reach the dispatcher; errors during a
/// dispatch are reported, never retried here (re-running the whole
/// workflow is the external scheduler's job).
pub async fn resolve_and_dispatch(
    page: &Page,
    markers: &ActivityMarkers,
    timeouts: &Timeouts,
    pacing: &Pacing,
) -> RunOutcome {
    let status = classify(page, markers, timeouts).await;
    info!("Dashboard classified as: {}", status);

    match status {
        PageStatus::Empty => {
            info!("All caught up - nothing to schedule");
            RunOutcome::NoActionNeeded
        }
        PageStatus::Actionable => match dispatch(page, markers, timeouts, pacing).await {
            Ok(()) => RunOutcome::Success,
            Err(e) => {
                error!("Bulk-schedule dispatch failed: {}", e);
                RunOutcome::ActionFailed
            }
        },
        PageStatus::Loading | PageStatus::Indeterminate | PageStatus::Errored => {
            // Distinct from the empty case on purpose: silently treating
            // this as "nothing to do" would skip real work forever once
            // the markup drifts.
            error!(
                "Could not confirm dashboard state ({}); marker table may be stale",
                status
            );
            RunOutcome::Indeterminate
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_decision_table() {
        assert_eq!(
            RunOutcome::from_status(PageStatus::Empty),
            RunOutcome::NoActionNeeded
        );
        assert_eq!(
            RunOutcome::from_status(PageStatus::Actionable),
            RunOutcome::Success
        );
        assert_eq!(
            RunOutcome::from_status(PageStatus::Loading),
            RunOutcome::Indeterminate
        );
        assert_eq!(
            RunOutcome::from_status(PageStatus::Indeterminate),
            RunOutcome::Indeterminate
        );
        assert_eq!(
            RunOutcome::from_status(PageStatus::Errored),
            RunOutcome::Indeterminate
        );
    }

    #[test]
    fn test_slow_page_is_never_empty() {
        // A settle timeout classifies as Loading, which must map to a
        // failing outcome rather than a clean no-op.
        let outcome = RunOutcome::from_status(PageStatus::Loading);
        assert_ne!(outcome, RunOutcome::NoActionNeeded);
        assert!(!outcome.is_success());
    }

    #[test]
    fn test_success_mapping() {
        assert!(RunOutcome::Success.is_success());
        assert!(RunOutcome::NoActionNeeded.is_success());
        assert!(!RunOutcome::ActionFailed.is_success());
        assert!(!RunOutcome::AuthenticationFailed.is_success());
        assert!(!RunOutcome::Indeterminate.is_success());
    }

    #[test]
    fn test_status_labels() {
        assert_eq!(PageStatus::Indeterminate.to_string(), "indeterminate");
        assert_eq!(RunOutcome::NoActionNeeded.to_string(), "no action needed");
    }
}
