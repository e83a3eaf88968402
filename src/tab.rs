//! Live Chrome backend
//!
//! Implements the browsing-context traits for a [`Page`]. Everything runs as
//! script inside the tab, so the page sees exactly what an in-page cloaking
//! script would do. Popups opened by the tab are kept in a page-global array
//! and addressed by slot.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::context::{escape_js_string, BrowsingContext, ElementSpec, EnvironmentInfo, PopupWindow};
use crate::error::{Error, Result};
use crate::page::Page;

/// Page-global array holding popup handles
const POPUP_REGISTRY: &str = "window.__tabcloakPopups";

/// 1 = nested, 0 = top level, -1 = the check threw
const FRAME_CONTAINMENT_SCRIPT: &str =
    "(() => { try { return window.top !== window.self ? 1 : 0; } catch (e) { return -1; } })()";

fn open_popup_script(url: &str) -> String {
    format!(
        "(() => {{ const w = window.open('{url}', '_blank'); \
if (!w) return -1; \
const list = ({reg} = {reg} || []); \
list.push(w); \
return list.length - 1; }})()",
        url = escape_js_string(url),
        reg = POPUP_REGISTRY
    )
}

/// Evaluates to an empty string on success, the thrown message otherwise
fn replace_location_script(url: &str) -> String {
    format!(
        "(() => {{ try {{ window.location.replace('{}'); return ''; }} \
catch (e) {{ return String((e && e.message) || e || 'refused'); }} }})()",
        escape_js_string(url)
    )
}

/// Deferred so the alert does not block the evaluation that raised it
fn alert_script(message: &str) -> String {
    format!(
        "setTimeout(() => alert('{}'), 0)",
        escape_js_string(message)
    )
}

/// Run `body` against popup `slot` with `w`/`d` bound; evaluates to false if
/// the popup is gone
fn popup_script(slot: u32, body: &str) -> String {
    format!(
        "(() => {{ const w = ({reg} || [])[{slot}]; \
if (!w || w.closed) return false; \
const d = w.document; {body} return true; }})()",
        reg = POPUP_REGISTRY,
        slot = slot,
        body = body
    )
}

/// Tries at accepting a raised alert before giving up on it
const DIALOG_ATTEMPTS: u32 = 10;

/// Pause between those tries; the alert fires from a zero-delay timer
const DIALOG_RETRY_INTERVAL: Duration = Duration::from_millis(50);

/// [`BrowsingContext`] over a live Chrome tab.
///
/// An alert raised through [`BrowsingContext::alert`] is accepted before the
/// next command reaches the tab. Chrome holds every evaluation while a
/// dialog is up, so without this a second `launch` would stall.
pub struct CdpContext {
    page: Arc<Page>,
    dialog_pending: AtomicBool,
}

impl CdpContext {
    pub fn new(page: Page) -> Self {
        Self {
            page: Arc::new(page),
            dialog_pending: AtomicBool::new(false),
        }
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    /// Whether an alert was raised and not yet accepted
    pub fn has_pending_dialog(&self) -> bool {
        self.dialog_pending.load(Ordering::SeqCst)
    }

    /// The page, with any alert we raised out of the way
    async fn ready_page(&self) -> &Page {
        if self.dialog_pending.swap(false, Ordering::SeqCst) {
            self.clear_dialog().await;
        }
        &self.page
    }

    async fn clear_dialog(&self) {
        for attempt in 1..=DIALOG_ATTEMPTS {
            match self.page.accept_dialog().await {
                Ok(()) => {
                    tracing::debug!("Accepted pending alert");
                    return;
                }
                Err(e) => {
                    tracing::trace!("No dialog to accept yet (attempt {}): {}", attempt, e);
                    tokio::time::sleep(DIALOG_RETRY_INTERVAL).await;
                }
            }
        }
        tracing::debug!("Alert already dismissed");
    }
}

impl EnvironmentInfo for CdpContext {
    async fn frame_containment(&self) -> Result<bool> {
        let page = self.ready_page().await;
        let state: i32 = page.evaluate(FRAME_CONTAINMENT_SCRIPT).await?;
        match state {
            -1 => Err(Error::CrossOrigin(
                "reading window.top threw a security error".into(),
            )),
            state => Ok(state == 1),
        }
    }

    async fn user_agent(&self) -> Result<String> {
        self.ready_page().await.evaluate("navigator.userAgent").await
    }
}

impl BrowsingContext for CdpContext {
    type Popup = CdpPopup;

    async fn current_url(&self) -> Result<String> {
        self.ready_page().await.url().await
    }

    async fn is_ready(&self) -> Result<bool> {
        self.ready_page().await.is_ready().await
    }

    async fn wait_until_ready(&self) -> Result<()> {
        self.ready_page().await.wait_for_navigation().await
    }

    async fn open_popup(&self, url: &str) -> Result<Option<CdpPopup>> {
        let page = self.ready_page().await;
        let slot: i64 = page.evaluate_as_user(&open_popup_script(url)).await?;
        if slot < 0 {
            return Ok(None);
        }
        tracing::debug!("Opened popup in slot {}", slot);
        Ok(Some(CdpPopup {
            page: Arc::clone(&self.page),
            slot: slot as u32,
        }))
    }

    async fn alert(&self, message: &str) -> Result<()> {
        self.ready_page().await.execute(&alert_script(message)).await?;
        self.dialog_pending.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.ready_page().await.execute("window.close()").await
    }

    async fn is_closed(&self) -> Result<bool> {
        self.ready_page().await.evaluate("window.closed").await
    }

    async fn replace_location(&self, url: &str) -> Result<()> {
        let page = self.ready_page().await;
        let refusal: String = page.evaluate(&replace_location_script(url)).await?;
        if refusal.is_empty() {
            Ok(())
        } else {
            Err(Error::refused(url, refusal))
        }
    }
}

/// Handle to a popup opened by a [`CdpContext`]
pub struct CdpPopup {
    page: Arc<Page>,
    slot: u32,
}

impl CdpPopup {
    pub fn slot(&self) -> u32 {
        self.slot
    }

    async fn run(&self, body: &str) -> Result<()> {
        let alive: bool = self.page.evaluate(&popup_script(self.slot, body)).await?;
        if alive {
            Ok(())
        } else {
            Err(Error::PopupClosed)
        }
    }

    /// Title of the popup document
    pub async fn title(&self) -> Result<String> {
        self.page
            .evaluate(&format!(
                "(() => {{ const w = ({} || [])[{}]; return w && !w.closed ? w.document.title : ''; }})()",
                POPUP_REGISTRY, self.slot
            ))
            .await
    }

    /// `src` of every iframe in the popup document
    pub async fn frame_sources(&self) -> Result<Vec<String>> {
        self.page
            .evaluate(&format!(
                "(() => {{ const w = ({} || [])[{}]; if (!w || w.closed) return []; \
return Array.from(w.document.querySelectorAll('iframe')).map(f => f.getAttribute('src') || ''); }})()",
                POPUP_REGISTRY, self.slot
            ))
            .await
    }
}

impl PopupWindow for CdpPopup {
    async fn is_closed(&self) -> Result<bool> {
        self.page
            .evaluate(&format!(
                "(() => {{ const w = ({} || [])[{}]; return !w || w.closed; }})()",
                POPUP_REGISTRY, self.slot
            ))
            .await
    }

    async fn set_title(&self, title: &str) -> Result<()> {
        self.run(&format!("d.title = '{}';", escape_js_string(title)))
            .await
    }

    async fn reset_body(&self) -> Result<()> {
        self.run(
            "if (!d.body) d.documentElement.appendChild(d.createElement('body')); \
d.body.style.margin = '0'; d.body.style.padding = '0';",
        )
        .await
    }

    async fn append_to_head(&self, element: &ElementSpec) -> Result<()> {
        self.run(&format!(
            "(d.head || d.documentElement).appendChild({});",
            element.to_js("d")
        ))
        .await
    }

    async fn append_to_body(&self, element: &ElementSpec) -> Result<()> {
        self.run(&format!(
            "(d.body || d.documentElement).appendChild({});",
            element.to_js("d")
        ))
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_popup_script() {
        let js = open_popup_script("about:blank");
        assert!(js.contains("window.open('about:blank', '_blank')"));
        assert!(js.contains("window.__tabcloakPopups = window.__tabcloakPopups || []"));
        assert!(js.contains("return -1;"));
    }

    #[test]
    fn test_replace_location_script_escapes() {
        let js = replace_location_script("https://x.test/?q='a'");
        assert!(js.contains("window.location.replace('https://x.test/?q=\\'a\\'')"));
    }

    #[test]
    fn test_alert_script_is_deferred() {
        let js = alert_script("Popups are blocked");
        assert_eq!(js, "setTimeout(() => alert('Popups are blocked'), 0)");
    }

    #[test]
    fn test_popup_script_binds_document() {
        let js = popup_script(2, "d.title = 'x';");
        assert!(js.contains("(window.__tabcloakPopups || [])[2]"));
        assert!(js.contains("if (!w || w.closed) return false;"));
        assert!(js.contains("const d = w.document; d.title = 'x'; return true;"));
    }
}
