//! Popup Orchestrator
//!
//! Opens a blank window and turns it into the disguised host for the
//! original page: title and favicon, a full-viewport frame pointing back at
//! the original address, and an optional exit-confirmation trap.

use crate::config::{Disguise, Protection, SharedConfig};
use crate::context::{escape_js_string, BrowsingContext, ElementSpec, PopupWindow};
use crate::error::Result;

/// Address the popup is opened at
pub const POPUP_URL: &str = "about:blank";

/// Shown when the browser refuses to hand back a usable window
pub const POPUP_BLOCKED_MESSAGE: &str =
    "Popups are blocked for this site. Allow popups and reload to open the page in a cloaked window.";

/// Shown when building the popup fails for any other reason
pub const POPUP_FAILED_MESSAGE: &str = "Something went wrong while opening the cloaked window.";

/// Result of a popup build
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PopupOutcome {
    /// Popup populated; the frame points at `frame_src`
    Built { frame_src: String },
    /// No usable window (popup blocker)
    Blocked,
    /// Population failed part way
    Failed(String),
}

impl PopupOutcome {
    pub fn is_built(&self) -> bool {
        matches!(self, PopupOutcome::Built { .. })
    }
}

/// Build the beforeunload trap installed inside the popup
pub fn exit_protection_script(message: &str) -> String {
    format!(
        "(function() {{ const message = '{}'; \
window.onbeforeunload = function(event) {{ event.preventDefault(); event.returnValue = message; return message; }}; \
}})();",
        escape_js_string(message)
    )
}

/// Open and populate the popup. Errors never escape: a blocked popup or a
/// failed build is reported to the user with an alert and returned as an outcome.
pub async fn build<C: BrowsingContext>(config: &SharedConfig, context: &C) -> PopupOutcome {
    match try_build(config, context).await {
        Ok(Some(frame_src)) => {
            tracing::info!("Cloaked popup built for {}", frame_src);
            PopupOutcome::Built { frame_src }
        }
        Ok(None) => {
            tracing::warn!("Popup was blocked, leaving original page untouched");
            notify(context, POPUP_BLOCKED_MESSAGE).await;
            PopupOutcome::Blocked
        }
        Err(e) => {
            tracing::error!("Failed to build cloaked popup: {}", e);
            notify(context, POPUP_FAILED_MESSAGE).await;
            PopupOutcome::Failed(e.to_string())
        }
    }
}

async fn notify<C: BrowsingContext>(context: &C, message: &str) {
    if let Err(e) = context.alert(message).await {
        tracing::warn!("Failed to show alert: {}", e);
    }
}

async fn try_build<C: BrowsingContext>(
    config: &SharedConfig,
    context: &C,
) -> Result<Option<String>> {
    // Captured before the disposer can navigate the original context
    let original_url = context.current_url().await?;

    let popup = match context.open_popup(POPUP_URL).await? {
        Some(popup) => popup,
        None => return Ok(None),
    };
    if popup.is_closed().await? {
        return Ok(None);
    }

    let (disguise, protection) = config.read(|c| (c.disguise.clone(), c.protection.clone()));

    inject_disguise(&popup, &disguise).await?;
    // Exit trap goes in before the frame
    inject_exit_protection(&popup, &protection).await?;
    rehost(&popup, &original_url).await?;

    Ok(Some(original_url))
}

async fn inject_disguise<P: PopupWindow>(popup: &P, disguise: &Disguise) -> Result<()> {
    if !disguise.title.is_empty() {
        popup.set_title(&disguise.title).await?;
    }
    if let Some(href) = disguise.favicon_href() {
        popup.append_to_head(&ElementSpec::favicon(href)).await?;
    }
    Ok(())
}

async fn rehost<P: PopupWindow>(popup: &P, original_url: &str) -> Result<()> {
    popup.reset_body().await?;
    popup.append_to_body(&ElementSpec::frame(original_url)).await
}

async fn inject_exit_protection<P: PopupWindow>(popup: &P, protection: &Protection) -> Result<()> {
    if !protection.exit_confirmation {
        return Ok(());
    }
    let script = exit_protection_script(&protection.confirmation_message);
    popup.append_to_head(&ElementSpec::script(script)).await
}
