//! Page Abstraction
//!
//! A Chrome tab driven over CDP: navigation, readiness and script evaluation.

use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;

use crate::cdp::{RuntimeEvaluateResult, Session};
use crate::error::{Error, Result};

/// A browser tab
pub struct Page {
    session: Session,
}

/// Turn an evaluation result into a typed value
fn typed_value<T: DeserializeOwned>(result: RuntimeEvaluateResult) -> Result<T> {
    if let Some(exception) = result.exception_details {
        return Err(Error::CdpSimple(format!(
            "JavaScript error: {} at {}:{}",
            exception.message(),
            exception.line_number,
            exception.column_number
        )));
    }

    match result.result.value {
        Some(value) => Ok(serde_json::from_value(value)?),
        None => Err(Error::CdpSimple("No value returned from evaluate".into())),
    }
}

impl Page {
    pub(crate) fn new(session: Session) -> Self {
        Self { session }
    }

    /// Navigate to a URL
    pub async fn goto(&self, url: &str) -> Result<()> {
        let result = self.session.navigate(url).await?;
        if let Some(error) = result.error_text {
            return Err(Error::Navigation(error));
        }
        Ok(())
    }

    /// Whether `document.readyState` is `complete`
    pub async fn is_ready(&self) -> Result<bool> {
        let state: String = self.evaluate("document.readyState").await?;
        Ok(state == "complete")
    }

    /// Wait for the document to finish loading (30 second timeout)
    pub async fn wait_for_navigation(&self) -> Result<()> {
        self.wait_for_navigation_timeout(30_000).await
    }

    /// Wait for the document to finish loading with a custom timeout in milliseconds
    pub async fn wait_for_navigation_timeout(&self, timeout_ms: u64) -> Result<()> {
        let start = Instant::now();
        let timeout = Duration::from_millis(timeout_ms);
        let poll_interval = Duration::from_millis(50);

        loop {
            // readyState is unavailable mid-navigation; keep polling
            if let Ok(true) = self.is_ready().await {
                return Ok(());
            }

            if start.elapsed() > timeout {
                return Err(Error::Timeout(format!(
                    "Document not ready within {}ms",
                    timeout_ms
                )));
            }

            tokio::time::sleep(poll_interval).await;
        }
    }

    /// Current URL
    pub async fn url(&self) -> Result<String> {
        self.evaluate("location.href").await
    }

    /// Page title
    pub async fn title(&self) -> Result<String> {
        self.evaluate("document.title").await
    }

    /// Evaluate JavaScript and return the result
    pub async fn evaluate<T: DeserializeOwned>(&self, expression: &str) -> Result<T> {
        typed_value(self.session.evaluate(expression).await?)
    }

    /// Evaluate JavaScript as a user gesture (needed for `window.open`)
    pub async fn evaluate_as_user<T: DeserializeOwned>(&self, expression: &str) -> Result<T> {
        typed_value(self.session.evaluate_with_gesture(expression).await?)
    }

    /// Execute JavaScript without expecting a return value
    pub async fn execute(&self, expression: &str) -> Result<()> {
        let result = self.session.evaluate(expression).await?;

        if let Some(exception) = result.exception_details {
            return Err(Error::CdpSimple(format!(
                "JavaScript error: {} at {}:{}",
                exception.message(),
                exception.line_number,
                exception.column_number
            )));
        }

        Ok(())
    }

    /// Accept the JavaScript dialog currently showing. Errors when none is.
    pub async fn accept_dialog(&self) -> Result<()> {
        self.session.handle_dialog(true).await
    }
}
