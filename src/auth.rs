//! Session authenticator
//!
//! Drives the multi-step sign-in UI to an authenticated state. The flow is
//! a fixed ladder: navigate, identity entry, continue, secret entry,
//! submit, confirmation. No step retries: the login form is assumed
//! stable, so a missing element means the markup drifted and a human needs
//! to update the marker table, not that the run should hammer the page.

use thiserror::Error;
use tracing::info;

use crate::config::Timeouts;
use crate::credentials::Credentials;
use crate::error::Error;
use crate::human::Pacing;
use crate::markers::LoginMarkers;
use crate::page::Page;

/// Classified sign-in failures, surfaced for offline triage
#[derive(Debug, Error)]
pub enum LoginError {
    #[error("sign-in page did not settle within {timeout_ms}ms")]
    NavigationTimeout { timeout_ms: u64 },

    #[error("login element '{selector}' never appeared")]
    FieldMissing {
        selector: String,
        #[source]
        source: Error,
    },

    #[error("post-login confirmation '{selector}' not seen within {timeout_ms}ms")]
    ConfirmationTimeout { selector: String, timeout_ms: u64 },

    #[error(transparent)]
    Browser(#[from] Error),
}

/// Authenticate the page, leaving it on the post-login dashboard.
///
/// Each simulated user action is wrapped in a humanization pause on both
/// sides; see [`Pacing`].
pub async fn login(
    page: &Page,
    credentials: &Credentials,
    markers: &LoginMarkers,
    timeouts: &Timeouts,
    pacing: &Pacing,
) -> Result<(), LoginError> {
    info!("Navigating to sign-in page");
    page.goto(&markers.sign_in_url).await?;

    match page
        .wait_for_network_idle(timeouts.settle_idle_ms, timeouts.navigation_ms)
        .await
    {
        Err(e) if e.is_timeout() => {
            return Err(LoginError::NavigationTimeout {
                timeout_ms: timeouts.navigation_ms,
            })
        }
        other => other?,
    }

    info!("Starting login");
    wait_for_field(page, &markers.identity_input, timeouts.login_field_ms).await?;
    pacing
        .around(|| page.human_fill(&markers.identity_input, credentials.identity()))
        .await?;

    wait_for_field(page, &markers.continue_button, timeouts.login_field_ms).await?;
    pacing
        .around(|| page.human_click(&markers.continue_button))
        .await?;

    wait_for_field(page, &markers.secret_input, timeouts.login_field_ms).await?;
    pacing
        .around(|| page.human_fill(&markers.secret_input, credentials.secret()))
        .await?;

    wait_for_field(page, &markers.submit_button, timeouts.login_field_ms).await?;
    pacing
        .around(|| page.human_click(&markers.submit_button))
        .await?;

    // The post-login dashboard can take a while to render; only this
    // marker proves authentication actually succeeded.
    info!("Waiting for post-login confirmation");
    match page
        .wait_for_visible(&markers.confirmation, timeouts.confirmation_ms)
        .await
    {
        Ok(_) => {}
        Err(e) if e.is_timeout() => {
            return Err(LoginError::ConfirmationTimeout {
                selector: markers.confirmation.clone(),
                timeout_ms: timeouts.confirmation_ms,
            })
        }
        Err(e) => return Err(LoginError::Browser(e)),
    }

    info!("Login successful");
    Ok(())
}

/// Bounded wait for a login element, mapping expiry to [`LoginError::FieldMissing`]
async fn wait_for_field(page: &Page, selector: &str, timeout_ms: u64) -> Result<(), LoginError> {
    match page.wait_for_visible(selector, timeout_ms).await {
        Ok(_) => Ok(()),
        Err(e) if e.is_timeout() => Err(LoginError::FieldMissing {
            selector: selector.to_string(),
            source: e,
        }),
        Err(e) => Err(LoginError::Browser(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_error_messages_name_the_step() {
        let nav = LoginError::NavigationTimeout { timeout_ms: 60_000 };
        assert!(nav.to_string().contains("60000ms"));

        let field = LoginError::FieldMissing {
            selector: "#user_email".to_string(),
            source: Error::Timeout("t".into()),
        };
        assert!(field.to_string().contains("#user_email"));

        let confirm = LoginError::ConfirmationTimeout {
            selector: ".ga3-recommended-channels__title".to_string(),
            timeout_ms: 60_000,
        };
        assert!(confirm.to_string().contains("confirmation"));
    }
}
