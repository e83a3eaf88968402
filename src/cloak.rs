//! Public Control Surface
//!
//! `Cloak` ties the pipeline together: guard, popup, disposal. Host code
//! either calls `auto_launch` once per page load or drives `launch` itself.

use std::time::Duration;

use crate::config::{CloakConfig, Disguise, PartialConfig, SharedConfig};
use crate::context::BrowsingContext;
use crate::disposer::{self, DisposalOutcome, FallbackChain};
use crate::guard::{self, SkipReason, Verdict};
use crate::popup::{self, PopupOutcome};

/// Settle time before the automatic trigger fires on an already-loaded page
pub const READY_SETTLE_DELAY: Duration = Duration::from_millis(10);

/// Result of one pipeline run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchOutcome {
    /// The guard vetoed the run; nothing was touched
    Skipped(SkipReason),
    /// No usable popup; the user was alerted
    Blocked,
    /// Popup construction failed; the user was alerted
    Failed(String),
    /// Popup built. `disposal` is None when redirect is disabled.
    Cloaked {
        frame_src: String,
        disposal: Option<DisposalOutcome>,
    },
}

impl LaunchOutcome {
    pub fn is_cloaked(&self) -> bool {
        matches!(self, LaunchOutcome::Cloaked { .. })
    }
}

/// Cloaking controller for one browsing context
pub struct Cloak<C> {
    context: C,
    config: SharedConfig,
    chain: FallbackChain,
}

impl<C: BrowsingContext> Cloak<C> {
    /// Resolve `overrides` over the defaults and bind to `context`
    pub fn new(context: C, overrides: Option<&PartialConfig>) -> Self {
        Self::with_config(context, SharedConfig::new(CloakConfig::resolve(overrides)))
    }

    /// Bind to an existing live configuration handle
    pub fn with_config(context: C, config: SharedConfig) -> Self {
        Self {
            context,
            config,
            chain: FallbackChain::default(),
        }
    }

    /// Replace the disposal fallback chain
    pub fn with_fallback_chain(mut self, chain: FallbackChain) -> Self {
        self.chain = chain;
        self
    }

    pub fn context(&self) -> &C {
        &self.context
    }

    /// The live configuration
    pub fn config(&self) -> &SharedConfig {
        &self.config
    }

    pub fn fallback_chain(&self) -> &FallbackChain {
        &self.chain
    }

    /// Merge overrides into the live configuration; affects later launches only
    pub fn set_config(&self, partial: &PartialConfig) {
        self.config.merge(partial);
        tracing::debug!("Configuration updated");
    }

    pub fn enable(&self) {
        self.config.update(|c| c.enabled = true);
    }

    pub fn disable(&self) {
        self.config.update(|c| c.enabled = false);
    }

    /// Probe the guard without side effects
    pub async fn is_supported(&self) -> bool {
        guard::evaluate(&self.config, &self.context)
            .await
            .is_proceed()
    }

    /// Random pick from `redirect.urls`
    pub fn random_redirect_url(&self) -> Option<String> {
        self.config
            .read(|c| c.random_redirect_url().map(String::from))
    }

    /// Swap the live disguise for a random built-in preset
    pub fn randomize_disguise(&self) -> Disguise {
        let disguise = Disguise::random_preset();
        self.config.update(|c| c.disguise = disguise.clone());
        tracing::debug!("Disguise randomized to {:?}", disguise.title);
        disguise
    }

    /// Run the full pipeline once. Every call attempts a fresh popup.
    pub async fn launch(&self) -> LaunchOutcome {
        if let Verdict::Skip(reason) = guard::evaluate(&self.config, &self.context).await {
            tracing::info!("Cloaking skipped: {}", reason);
            return LaunchOutcome::Skipped(reason);
        }

        match popup::build(&self.config, &self.context).await {
            PopupOutcome::Built { frame_src } => {
                let disposal = disposer::run(&self.config, &self.context, &self.chain).await;
                LaunchOutcome::Cloaked {
                    frame_src,
                    disposal,
                }
            }
            PopupOutcome::Blocked => LaunchOutcome::Blocked,
            PopupOutcome::Failed(message) => LaunchOutcome::Failed(message),
        }
    }

    /// The on-load trigger: wait for the document to be ready (or let an
    /// already-loaded page settle briefly), then launch.
    pub async fn auto_launch(&self) -> LaunchOutcome {
        match self.context.is_ready().await {
            Ok(true) => tokio::time::sleep(READY_SETTLE_DELAY).await,
            Ok(false) => {
                if let Err(e) = self.context.wait_until_ready().await {
                    tracing::warn!("Waiting for document ready failed: {}", e);
                }
            }
            Err(e) => {
                tracing::debug!("Ready state unavailable ({}), launching anyway", e);
            }
        }
        self.launch().await
    }
}
