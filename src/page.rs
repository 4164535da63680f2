//! Page abstraction
//!
//! High-level API over a CDP session: navigation, element lookup, bounded
//! waits, JavaScript evaluation, screenshots, and human-paced interaction.

use std::time::{Duration, Instant};

use crate::cdp::{MouseButton, MouseEventType, Session};
use crate::error::{Error, Result};
use crate::human::Human;

/// Escape a string for safe use inside a JavaScript string literal
pub(crate) fn escape_js_string(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('\'', "\\'")
        .replace('"', "\\\"")
        .replace('`', "\\`")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace("${", "\\${")
}

/// A browser page owned by one automation run
pub struct Page {
    session: Session,
}

impl Page {
    pub(crate) fn new(session: Session) -> Self {
        Self { session }
    }

    // =========================================================================
    // Navigation / page info
    // =========================================================================

    /// Navigate to a URL
    pub async fn goto(&self, url: &str) -> Result<()> {
        let result = self.session.navigate(url).await?;
        if let Some(error) = result.error_text {
            return Err(Error::Navigation(error));
        }
        // Brief settle so the load has started; callers follow up with
        // wait_for_network_idle or wait_for_visible.
        tokio::time::sleep(Duration::from_millis(100)).await;
        Ok(())
    }

    /// Current URL of the main frame
    pub async fn url(&self) -> Result<String> {
        let frame_tree = self.session.get_frame_tree().await?;
        Ok(frame_tree.frame.url)
    }

    /// Page title
    pub async fn title(&self) -> Result<String> {
        self.evaluate("document.title").await
    }

    /// Capture a PNG screenshot
    pub async fn screenshot(&self) -> Result<Vec<u8>> {
        self.session.capture_screenshot(Some("png"), None).await
    }

    // =========================================================================
    // Element lookup
    // =========================================================================

    /// Find an element by CSS selector
    pub async fn find(&self, selector: &str) -> Result<Element<'_>> {
        let doc = self.session.get_document(Some(0)).await?;
        let node_id = self.session.query_selector(doc.node_id, selector).await?;

        if node_id == 0 {
            return Err(Error::ElementNotFound(selector.to_string()));
        }

        Ok(Element {
            page: self,
            node_id,
        })
    }

    /// Check if an element exists (lookup errors read as absence)
    #[must_use = "returns true if element exists"]
    pub async fn exists(&self, selector: &str) -> bool {
        self.find(selector).await.is_ok()
    }

    /// Wait for an element to appear in the DOM
    pub async fn wait_for(&self, selector: &str, timeout_ms: u64) -> Result<Element<'_>> {
        let start = Instant::now();
        let timeout = Duration::from_millis(timeout_ms);

        loop {
            if let Ok(element) = self.find(selector).await {
                return Ok(element);
            }

            if start.elapsed() > timeout {
                return Err(Error::Timeout(format!(
                    "Element '{}' not found within {}ms",
                    selector, timeout_ms
                )));
            }

            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    /// Wait for an element to be present and rendered (computable box model)
    pub async fn wait_for_visible(&self, selector: &str, timeout_ms: u64) -> Result<Element<'_>> {
        let start = Instant::now();
        let timeout = Duration::from_millis(timeout_ms);

        loop {
            if let Ok(element) = self.find(selector).await {
                if element.center().await.is_ok() {
                    return Ok(element);
                }
            }

            if start.elapsed() > timeout {
                return Err(Error::Timeout(format!(
                    "Element '{}' not visible within {}ms",
                    selector, timeout_ms
                )));
            }

            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    // =========================================================================
    // Interaction
    // =========================================================================

    /// Click at viewport coordinates
    pub async fn click_at(&self, x: f64, y: f64) -> Result<()> {
        self.session
            .dispatch_mouse_event(
                MouseEventType::MousePressed,
                x,
                y,
                Some(MouseButton::Left),
                Some(1),
            )
            .await?;

        tokio::time::sleep(Duration::from_millis(50)).await;

        self.session
            .dispatch_mouse_event(
                MouseEventType::MouseReleased,
                x,
                y,
                Some(MouseButton::Left),
                Some(1),
            )
            .await
    }

    /// Human-like click on an element: curved mouse path, jittered press
    pub async fn human_click(&self, selector: &str) -> Result<()> {
        let element = self.find(selector).await?;
        element.human_click().await
    }

    /// Human-like form fill: click the field, clear it, type with natural delays
    pub async fn human_fill(&self, selector: &str, value: &str) -> Result<()> {
        self.human_click(selector).await?;
        tokio::time::sleep(Duration::from_millis(100)).await;

        // Select existing content so typed input replaces it
        self.execute("if (document.activeElement && document.activeElement.select) document.activeElement.select()")
            .await?;
        tokio::time::sleep(Duration::from_millis(50)).await;

        Human::new(&self.session).type_text(value).await
    }

    // =========================================================================
    // JavaScript evaluation
    // =========================================================================

    /// Evaluate JavaScript and deserialize the result
    pub async fn evaluate<T: serde::de::DeserializeOwned>(&self, expression: &str) -> Result<T> {
        let result = self.session.evaluate(expression).await?;

        if let Some(exception) = result.exception_details {
            return Err(Error::CdpSimple(format!(
                "JavaScript error: {} at {}:{}",
                exception.text, exception.line_number, exception.column_number
            )));
        }

        if let Some(value) = result.result.value {
            return Ok(serde_json::from_value(value)?);
        }

        Err(Error::CdpSimple("No value returned from evaluate".into()))
    }

    /// Execute JavaScript, discarding the result
    pub async fn execute(&self, expression: &str) -> Result<()> {
        let result = self.session.evaluate(expression).await?;

        if let Some(exception) = result.exception_details {
            return Err(Error::CdpSimple(format!(
                "JavaScript error: {} at {}:{}",
                exception.text, exception.line_number, exception.column_number
            )));
        }

        Ok(())
    }

    // =========================================================================
    // Network idleness
    // =========================================================================

    /// Wait until no fetch/XHR has been in flight for `idle_time_ms`,
    /// bounded by `timeout_ms`.
    ///
    /// Dynamically-rendered pages keep mutating until their API calls drain;
    /// this is the proxy for "rendering has stabilized". The interceptors are
    /// installed once per document and count in-flight requests.
    pub async fn wait_for_network_idle(&self, idle_time_ms: u64, timeout_ms: u64) -> Result<()> {
        let start = Instant::now();
        let timeout = Duration::from_millis(timeout_ms);
        let idle_duration = Duration::from_millis(idle_time_ms);

        let install_js = r#"
            (() => {
                if (window.__caughtup_pending === undefined) {
                    window.__caughtup_pending = 0;

                    const originalFetch = window.fetch;
                    window.fetch = function(...args) {
                        window.__caughtup_pending++;
                        return originalFetch.apply(this, args).finally(() => {
                            window.__caughtup_pending--;
                        });
                    };

                    const originalOpen = XMLHttpRequest.prototype.open;
                    const originalSend = XMLHttpRequest.prototype.send;
                    XMLHttpRequest.prototype.open = function(...args) {
                        this.__caughtup_tracked = true;
                        return originalOpen.apply(this, args);
                    };
                    XMLHttpRequest.prototype.send = function(...args) {
                        if (this.__caughtup_tracked) {
                            window.__caughtup_pending++;
                            this.addEventListener('loadend', () => {
                                window.__caughtup_pending--;
                            });
                        }
                        return originalSend.apply(this, args);
                    };
                }
                return window.__caughtup_pending;
            })()
        "#;

        let _: i32 = self.evaluate(install_js).await.unwrap_or(0);

        let mut idle_since: Option<Instant> = None;

        loop {
            let pending: i32 = self
                .evaluate("window.__caughtup_pending || 0")
                .await
                .unwrap_or(0);

            if pending == 0 {
                match idle_since {
                    Some(since) if since.elapsed() >= idle_duration => return Ok(()),
                    None => idle_since = Some(Instant::now()),
                    _ => {}
                }
            } else {
                idle_since = None;
            }

            if start.elapsed() > timeout {
                return Err(Error::Timeout(format!(
                    "Network did not become idle within {}ms (pending: {})",
                    timeout_ms, pending
                )));
            }

            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }
}

/// An element on the page
pub struct Element<'a> {
    page: &'a Page,
    node_id: i32,
}

impl<'a> Element<'a> {
    /// Center coordinates of the element's content box
    pub async fn center(&self) -> Result<(f64, f64)> {
        let model = self.page.session.get_box_model(self.node_id).await?;
        Ok(model.center())
    }

    /// Click this element directly (no mouse path)
    pub async fn click(&self) -> Result<()> {
        let (x, y) = self.center().await?;
        self.page.click_at(x, y).await
    }

    /// Human-like click
    pub async fn human_click(&self) -> Result<()> {
        let (x, y) = self.center().await?;
        Human::new(&self.page.session).move_and_click(x, y).await
    }

    /// Whether the element is rendered (has a computable box model)
    #[must_use = "returns visibility state"]
    pub async fn is_visible(&self) -> Result<bool> {
        match self.page.session.get_box_model(self.node_id).await {
            Ok(_) => Ok(true),
            Err(Error::Cdp { message, .. }) if message.contains("box model") => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Whether a checkbox/radio is currently checked
    pub async fn is_checked(&self) -> Result<bool> {
        let value = self.eval_on_element("this.checked === true").await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    /// Outer HTML of the element
    pub async fn outer_html(&self) -> Result<String> {
        self.page.session.get_outer_html(self.node_id).await
    }

    /// Scroll this element into view
    pub async fn scroll_into_view(&self) -> Result<()> {
        let object_id = self.page.session.resolve_node(self.node_id).await?;
        self.page
            .session
            .call_function_on(
                &object_id,
                "function() { this.scrollIntoView({ behavior: 'smooth', block: 'center' }); }",
            )
            .await?;
        Ok(())
    }

    /// Evaluate an expression with `this` bound to the element
    async fn eval_on_element(&self, js_expr: &str) -> Result<serde_json::Value> {
        let object_id = self.page.session.resolve_node(self.node_id).await?;
        let func = format!("function() {{ return {}; }}", js_expr);
        let result = self.page.session.call_function_on(&object_id, &func).await?;
        Ok(result.result.value.unwrap_or(serde_json::Value::Null))
    }
}
