//! One automation run, end to end
//!
//! Owns the browser for the whole run: acquire, authenticate, resolve,
//! screenshot, release. The release happens exactly once on every path
//! out of this module; nothing else holds the browser.

use std::path::{Path, PathBuf};

use tracing::{error, info, warn};

use crate::activity::{self, RunOutcome};
use crate::auth;
use crate::browser::Browser;
use crate::config::RunConfig;
use crate::credentials::Credentials;
use crate::page::Page;

/// What one run produced, for logging and exit signaling
#[derive(Debug)]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub final_url: Option<String>,
    pub screenshot: Option<PathBuf>,
}

/// Execute one full run: launch, sign in, resolve the queue, clean up.
///
/// Never returns an error; every failure inside the run is mapped to a
/// failing [`RunOutcome`] so the caller always gets a report and the
/// browser is always released.
pub async fn run(config: &RunConfig, credentials: &Credentials) -> RunReport {
    info!("Launching browser");
    let browser = match Browser::launch(config).await {
        Ok(browser) => browser,
        Err(e) => {
            error!("Browser launch failed: {}", e);
            return RunReport {
                outcome: RunOutcome::Indeterminate,
                final_url: None,
                screenshot: None,
            };
        }
    };

    let (outcome, final_url, screenshot) = drive(&browser, config, credentials).await;

    if let Err(e) = browser.close().await {
        warn!("Browser close reported an error: {}", e);
    }

    info!("Run finished: {}", outcome);
    RunReport {
        outcome,
        final_url,
        screenshot,
    }
}

/// Everything between acquisition and release. Errors here become
/// outcomes; they never skip past the close in [`run`].
async fn drive(
    browser: &Browser,
    config: &RunConfig,
    credentials: &Credentials,
) -> (RunOutcome, Option<String>, Option<PathBuf>) {
    let page = match browser.new_page().await {
        Ok(page) => page,
        Err(e) => {
            error!("Could not open a page: {}", e);
            return (RunOutcome::Indeterminate, None, None);
        }
    };

    let outcome = match auth::login(
        &page,
        credentials,
        &config.markers.login,
        &config.timeouts,
        &config.pacing,
    )
    .await
    {
        Ok(()) => {
            activity::resolve_and_dispatch(
                &page,
                &config.markers.activity,
                &config.timeouts,
                &config.pacing,
            )
            .await
        }
        Err(e) => {
            error!("Authentication failed: {}", e);
            RunOutcome::AuthenticationFailed
        }
    };

    let final_url = page.url().await.ok();
    if let Some(url) = &final_url {
        info!("Final URL: {}", url);
    }

    let path = if outcome.is_success() {
        &config.final_screenshot
    } else {
        &config.error_screenshot
    };
    let screenshot = capture_screenshot(&page, path).await;

    (outcome, final_url, screenshot)
}

/// Best-effort diagnostic capture; failure to screenshot never changes
/// the run's outcome
async fn capture_screenshot(page: &Page, path: &Path) -> Option<PathBuf> {
    let png = match page.screenshot().await {
        Ok(png) => png,
        Err(e) => {
            warn!("Screenshot capture failed: {}", e);
            return None;
        }
    };

    match std::fs::write(path, png) {
        Ok(()) => {
            info!("Screenshot written to {}", path.display());
            Some(path.to_path_buf())
        }
        Err(e) => {
            warn!("Could not write screenshot to {}: {}", path.display(), e);
            None
        }
    }
}
