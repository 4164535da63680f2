//! Integration tests for caughtup
//!
//! These tests require Chrome to be installed and available. They drive
//! the real resolver and authenticator against synthetic pages carrying
//! the production marker selectors.
//!
//! Run with: cargo test --test integration -- --ignored

use caughtup::{
    activity::{self, PageStatus, RunOutcome},
    auth::{self, LoginError},
    Browser, Credentials, LoginMarkers, Pacing, RunConfig, Timeouts,
};

/// Check if Chrome is available
fn chrome_available() -> bool {
    caughtup::browser::find_chrome().is_ok()
}

/// Config with pacing and budgets tightened for test speed
fn test_config() -> RunConfig {
    RunConfig {
        pacing: Pacing {
            min_ms: 1,
            max_ms: 5,
        },
        timeouts: Timeouts {
            navigation_ms: 10_000,
            login_field_ms: 5_000,
            confirmation_ms: 5_000,
            settle_idle_ms: 200,
            settle_ms: 5_000,
            action_ms: 5_000,
        },
        ..RunConfig::default()
    }
}

/// Dashboard showing the empty-state prompt ("#" percent-encoded for data: URLs)
const EMPTY_PAGE: &str = "data:text/html,\
    <div class=\"ga3-no-items-prompt\">\
    <h2 class=\"no-items-heading\">All Caught Up!</h2>\
    </div>";

/// Dashboard with an unchecked select-all control and the bulk-schedule
/// button; clicking the button swaps the page to the empty state
const ACTIONABLE_PAGE: &str = "data:text/html,\
    <input type=\"checkbox\" id=\"sel\" data-action=\"change->ga3--widgets--bulk-schedule%23toggleAll\">\
    <button id=\"go\" data-action=\"click->ga3--widgets--bulk-schedule%23bulkSchedule\">Schedule All</button>\
    <script>\
    window.__clicks = 0;\
    document.getElementById('go').addEventListener('click', () => {\
        window.__clicks++;\
        document.body.innerHTML = '<div class=\"ga3-no-items-prompt\"><h2 class=\"no-items-heading\">All Caught Up!</h2></div>';\
    });\
    </script>";

/// Dashboard carrying neither signpost
const DRIFTED_PAGE: &str = "data:text/html,<div class=\"dashboard\">Something new</div>";

#[tokio::test]
#[ignore = "requires Chrome"]
async fn test_browser_launch_and_close() {
    if !chrome_available() {
        eprintln!("Chrome not found, skipping test");
        return;
    }

    let config = test_config();
    let browser = Browser::launch(&config)
        .await
        .expect("Failed to launch browser");
    browser.close().await.expect("Failed to close browser");
}

#[tokio::test]
#[ignore = "requires Chrome"]
async fn test_element_finding() {
    if !chrome_available() {
        eprintln!("Chrome not found, skipping test");
        return;
    }

    let config = test_config();
    let browser = Browser::launch(&config)
        .await
        .expect("Failed to launch browser");
    let page = browser.new_page().await.expect("Failed to create page");

    page.goto(
        "data:text/html,<title>fixture</title>\
        <button id=\"btn\" onclick=\"this.textContent='Clicked'\">Click Me</button>",
    )
    .await
    .expect("Failed to navigate");

    assert_eq!(page.title().await.expect("Failed to read title"), "fixture");

    let btn = page
        .wait_for("#btn", 2_000)
        .await
        .expect("Failed to find button");
    assert!(btn.is_visible().await.expect("Failed to check visibility"));

    let html = btn.outer_html().await.expect("Failed to get HTML");
    assert!(html.contains("Click Me"));

    btn.click().await.expect("Failed to click button");
    let html = btn.outer_html().await.expect("Failed to get HTML");
    assert!(html.contains("Clicked"));

    assert!(page.exists("#btn").await);
    assert!(!page.exists("#nonexistent").await);

    browser.close().await.expect("Failed to close browser");
}

#[tokio::test]
#[ignore = "requires Chrome"]
async fn test_empty_queue_is_a_clean_noop() {
    if !chrome_available() {
        eprintln!("Chrome not found, skipping test");
        return;
    }

    let config = test_config();
    let browser = Browser::launch(&config)
        .await
        .expect("Failed to launch browser");
    let page = browser.new_page().await.expect("Failed to create page");

    page.goto(EMPTY_PAGE).await.expect("Failed to navigate");

    let outcome = activity::resolve_and_dispatch(
        &page,
        &config.markers.activity,
        &config.timeouts,
        &config.pacing,
    )
    .await;

    assert_eq!(outcome, RunOutcome::NoActionNeeded);

    browser.close().await.expect("Failed to close browser");
}

#[tokio::test]
#[ignore = "requires Chrome"]
async fn test_actionable_queue_dispatches_once_then_reads_empty() {
    if !chrome_available() {
        eprintln!("Chrome not found, skipping test");
        return;
    }

    let config = test_config();
    let browser = Browser::launch(&config)
        .await
        .expect("Failed to launch browser");
    let page = browser.new_page().await.expect("Failed to create page");

    page.goto(ACTIONABLE_PAGE).await.expect("Failed to navigate");

    // First pass: select-all gets checked, the button gets one click
    let outcome = activity::resolve_and_dispatch(
        &page,
        &config.markers.activity,
        &config.timeouts,
        &config.pacing,
    )
    .await;
    assert_eq!(outcome, RunOutcome::Success);

    let clicks: i32 = page
        .evaluate("window.__clicks")
        .await
        .expect("Failed to read click count");
    assert_eq!(clicks, 1);

    // The page swapped to the empty state; a second pass must be a no-op,
    // never a second dispatch
    let outcome = activity::resolve_and_dispatch(
        &page,
        &config.markers.activity,
        &config.timeouts,
        &config.pacing,
    )
    .await;
    assert_eq!(outcome, RunOutcome::NoActionNeeded);

    let clicks: i32 = page
        .evaluate("window.__clicks")
        .await
        .expect("Failed to read click count");
    assert_eq!(clicks, 1);

    browser.close().await.expect("Failed to close browser");
}

#[tokio::test]
#[ignore = "requires Chrome"]
async fn test_select_all_gets_checked_before_dispatch() {
    if !chrome_available() {
        eprintln!("Chrome not found, skipping test");
        return;
    }

    let config = test_config();
    let browser = Browser::launch(&config)
        .await
        .expect("Failed to launch browser");
    let page = browser.new_page().await.expect("Failed to create page");

    // Same markup, but the click handler only counts so the checkbox
    // survives for inspection
    page.goto(
        "data:text/html,\
        <input type=\"checkbox\" id=\"sel\" data-action=\"change->ga3--widgets--bulk-schedule%23toggleAll\">\
        <button id=\"go\" data-action=\"click->ga3--widgets--bulk-schedule%23bulkSchedule\">Schedule All</button>\
        <script>window.__clicks = 0;\
        document.getElementById('go').addEventListener('click', () => { window.__clicks++; });\
        </script>",
    )
    .await
    .expect("Failed to navigate");

    let outcome = activity::resolve_and_dispatch(
        &page,
        &config.markers.activity,
        &config.timeouts,
        &config.pacing,
    )
    .await;
    assert_eq!(outcome, RunOutcome::Success);

    let checked: bool = page
        .evaluate("document.getElementById('sel').checked")
        .await
        .expect("Failed to read checkbox");
    assert!(checked, "select-all control was not checked");

    browser.close().await.expect("Failed to close browser");
}

#[tokio::test]
#[ignore = "requires Chrome"]
async fn test_unrecognized_markup_is_indeterminate() {
    if !chrome_available() {
        eprintln!("Chrome not found, skipping test");
        return;
    }

    let config = test_config();
    let browser = Browser::launch(&config)
        .await
        .expect("Failed to launch browser");
    let page = browser.new_page().await.expect("Failed to create page");

    page.goto(DRIFTED_PAGE).await.expect("Failed to navigate");

    let status = activity::classify(&page, &config.markers.activity, &config.timeouts).await;
    assert_eq!(status, PageStatus::Indeterminate);

    let outcome = activity::resolve_and_dispatch(
        &page,
        &config.markers.activity,
        &config.timeouts,
        &config.pacing,
    )
    .await;
    assert_eq!(outcome, RunOutcome::Indeterminate);
    assert!(!outcome.is_success());

    browser.close().await.expect("Failed to close browser");
}

#[tokio::test]
#[ignore = "requires Chrome"]
async fn test_settle_timeout_never_reads_as_empty() {
    if !chrome_available() {
        eprintln!("Chrome not found, skipping test");
        return;
    }

    let mut config = test_config();
    // Require more sustained idle than the budget allows: the settle wait
    // must expire, and the page must classify Loading even though it
    // carries the empty-state markup
    config.timeouts.settle_idle_ms = 500;
    config.timeouts.settle_ms = 100;

    let browser = Browser::launch(&config)
        .await
        .expect("Failed to launch browser");
    let page = browser.new_page().await.expect("Failed to create page");

    page.goto(EMPTY_PAGE).await.expect("Failed to navigate");

    let status = activity::classify(&page, &config.markers.activity, &config.timeouts).await;
    assert_eq!(status, PageStatus::Loading);
    assert_eq!(
        RunOutcome::from_status(status),
        RunOutcome::Indeterminate
    );

    browser.close().await.expect("Failed to close browser");
}

/// Synthetic sign-in flow mirroring the production ladder: identity,
/// continue, secret, submit, confirmation
const LOGIN_PAGE: &str = "data:text/html,\
    <form>\
    <input id=\"user_email\" type=\"email\">\
    <button id=\"continue-button\" type=\"button\">Continue</button>\
    </form>\
    <script>\
    document.getElementById('continue-button').addEventListener('click', () => {\
        const form = document.forms[0];\
        if (form.querySelector('%23user_password')) return;\
        const pw = document.createElement('input');\
        pw.id = 'user_password'; pw.type = 'password';\
        form.appendChild(pw);\
        const submit = document.createElement('input');\
        submit.type = 'submit'; submit.value = 'Sign in';\
        form.appendChild(submit);\
        form.addEventListener('submit', (e) => {\
            e.preventDefault();\
            const done = document.createElement('h1');\
            done.className = 'ga3-recommended-channels__title';\
            done.textContent = 'Recommended Channels';\
            document.body.appendChild(done);\
        });\
    });\
    </script>";

#[tokio::test]
#[ignore = "requires Chrome"]
async fn test_login_ladder_reaches_confirmation() {
    if !chrome_available() {
        eprintln!("Chrome not found, skipping test");
        return;
    }

    let config = test_config();
    let browser = Browser::launch(&config)
        .await
        .expect("Failed to launch browser");
    let page = browser.new_page().await.expect("Failed to create page");

    let markers = LoginMarkers {
        sign_in_url: LOGIN_PAGE.to_string(),
        ..LoginMarkers::default()
    };
    let credentials = Credentials::new("user@example.com", "s3cret");

    auth::login(
        &page,
        &credentials,
        &markers,
        &config.timeouts,
        &config.pacing,
    )
    .await
    .expect("Login should succeed against the synthetic flow");

    let email: String = page
        .evaluate("document.getElementById('user_email').value")
        .await
        .expect("Failed to read email field");
    assert_eq!(email, "user@example.com");

    browser.close().await.expect("Failed to close browser");
}

#[tokio::test]
#[ignore = "requires Chrome"]
async fn test_missing_confirmation_is_classified() {
    if !chrome_available() {
        eprintln!("Chrome not found, skipping test");
        return;
    }

    let mut config = test_config();
    config.timeouts.confirmation_ms = 1_500;

    let browser = Browser::launch(&config)
        .await
        .expect("Failed to launch browser");
    let page = browser.new_page().await.expect("Failed to create page");

    // Submit never produces the confirmation marker
    let markers = LoginMarkers {
        sign_in_url: "data:text/html,\
            <form onsubmit=\"return false\">\
            <input id=\"user_email\" type=\"email\">\
            <button id=\"continue-button\" type=\"button\" onclick=\"\
                const pw = document.createElement('input');\
                pw.id = 'user_password'; pw.type = 'password';\
                this.form.appendChild(pw);\
                const s = document.createElement('input');\
                s.type = 'submit';\
                this.form.appendChild(s);\"\
            >Continue</button>\
            </form>"
            .to_string(),
        ..LoginMarkers::default()
    };
    let credentials = Credentials::new("user@example.com", "wrong-secret");

    let err = auth::login(
        &page,
        &credentials,
        &markers,
        &config.timeouts,
        &config.pacing,
    )
    .await
    .expect_err("Login should fail without a confirmation marker");

    assert!(matches!(err, LoginError::ConfirmationTimeout { .. }));

    browser.close().await.expect("Failed to close browser");
}
