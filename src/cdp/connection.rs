//! Browser and Tab Channels
//!
//! `Connection` is the browser-level channel: it opens tabs and lists what is
//! open, which is how the popup shows up as a second page target. `Session`
//! is bound to the one tab being cloaked; everything the pipeline does in
//! that tab goes through `Runtime.evaluate` on it.

use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};

use super::transport::Transport;
use super::types::*;
use crate::error::Result;

/// Browser-level channel over the DevTools socket
pub struct Connection {
    transport: Arc<Transport>,
}

impl Connection {
    pub fn new(transport: Transport) -> Self {
        Self {
            transport: Arc::new(transport),
        }
    }

    pub async fn version(&self) -> Result<BrowserGetVersionResult> {
        self.transport
            .send("Browser.getVersion", &BrowserGetVersion {})
            .await
    }

    /// Open a tab at `url`; returns its target id
    pub async fn create_target(
        &self,
        url: &str,
        width: Option<u32>,
        height: Option<u32>,
    ) -> Result<String> {
        let created: TargetCreateTargetResult = self
            .transport
            .send(
                "Target.createTarget",
                &TargetCreateTarget {
                    url: url.to_string(),
                    width,
                    height,
                },
            )
            .await?;
        Ok(created.target_id)
    }

    /// Attach in flat mode so the tab's commands share this socket
    pub async fn attach_to_target(&self, target_id: &str) -> Result<Session> {
        let attached: TargetAttachToTargetResult = self
            .transport
            .send(
                "Target.attachToTarget",
                &TargetAttachToTarget {
                    target_id: target_id.to_string(),
                    flatten: Some(true),
                },
            )
            .await?;

        Ok(Session {
            transport: Arc::clone(&self.transport),
            session_id: attached.session_id,
        })
    }

    /// Every target Chrome knows about, popups included
    pub async fn get_targets(&self) -> Result<Vec<TargetInfo>> {
        let listed: TargetGetTargetsResult = self
            .transport
            .send("Target.getTargets", &TargetGetTargets {})
            .await?;
        Ok(listed.target_infos)
    }

    /// Ask Chrome to exit, then tear down the socket and process
    pub async fn close(&self) -> Result<()> {
        // Chrome may drop the socket before answering
        let _ = self
            .transport
            .send::<_, serde_json::Value>("Browser.close", &BrowserClose {})
            .await;
        self.transport.close().await
    }
}

/// Channel to the tab being cloaked
pub struct Session {
    transport: Arc<Transport>,
    session_id: String,
}

impl Session {
    async fn send<C, R>(&self, method: &str, params: &C) -> Result<R>
    where
        C: Serialize,
        R: DeserializeOwned,
    {
        self.transport
            .send_to_session(&self.session_id, method, params)
            .await
    }

    pub async fn page_enable(&self) -> Result<()> {
        self.send::<_, serde_json::Value>("Page.enable", &PageEnable {})
            .await?;
        Ok(())
    }

    pub async fn navigate(&self, url: &str) -> Result<PageNavigateResult> {
        self.send(
            "Page.navigate",
            &PageNavigate {
                url: url.to_string(),
            },
        )
        .await
    }

    /// Close the alert the tab is showing. `Runtime.evaluate` is held until
    /// this happens.
    pub async fn handle_dialog(&self, accept: bool) -> Result<()> {
        self.send::<_, serde_json::Value>(
            "Page.handleJavaScriptDialog",
            &PageHandleJavaScriptDialog {
                accept,
                prompt_text: None,
            },
        )
        .await?;
        Ok(())
    }

    /// Run `expression` in the tab and hand back its value as JSON
    pub async fn evaluate(&self, expression: &str) -> Result<RuntimeEvaluateResult> {
        self.run_script(expression, false).await
    }

    /// Same as [`evaluate`](Self::evaluate) but flagged as a user gesture, so
    /// `window.open` gets past the popup blocker the way a click would
    pub async fn evaluate_with_gesture(&self, expression: &str) -> Result<RuntimeEvaluateResult> {
        self.run_script(expression, true).await
    }

    async fn run_script(
        &self,
        expression: &str,
        user_gesture: bool,
    ) -> Result<RuntimeEvaluateResult> {
        self.send(
            "Runtime.evaluate",
            &RuntimeEvaluate {
                expression: expression.to_string(),
                return_by_value: Some(true),
                await_promise: Some(false),
                user_gesture: user_gesture.then_some(true),
            },
        )
        .await
    }
}
