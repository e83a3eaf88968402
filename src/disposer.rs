//! Origin Disposer
//!
//! Gets the original tab out of the way once the popup exists: ask the
//! browser to close it, and if it is still open after a short delay, replace
//! it in place with a neutral new-tab style destination.

use std::time::Duration;

use crate::config::SharedConfig;
use crate::context::BrowsingContext;

/// How long the close request gets to take effect
pub const CLOSE_SETTLE_DELAY: Duration = Duration::from_millis(100);

/// Last-resort destination
pub const TERMINAL_DESTINATION: &str = "about:blank";

/// One candidate in the fallback chain
#[derive(Clone)]
pub struct FallbackEntry {
    pub destination: String,
    /// Whether the candidate is worth trying for a given user agent
    pub applies: fn(&str) -> bool,
}

impl FallbackEntry {
    pub fn new(destination: impl Into<String>, applies: fn(&str) -> bool) -> Self {
        Self {
            destination: destination.into(),
            applies,
        }
    }
}

impl std::fmt::Debug for FallbackEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackEntry")
            .field("destination", &self.destination)
            .finish_non_exhaustive()
    }
}

fn is_edge(ua: &str) -> bool {
    ua.contains("Edg/")
}

fn is_chromium(ua: &str) -> bool {
    ua.contains("Chrome") || ua.contains("Chromium")
}

fn is_firefox(ua: &str) -> bool {
    ua.contains("Firefox")
}

/// Ordered navigation candidates ending in a destination that always applies
#[derive(Debug, Clone)]
pub struct FallbackChain {
    entries: Vec<FallbackEntry>,
    terminal: String,
}

impl Default for FallbackChain {
    fn default() -> Self {
        Self::new(
            vec![
                FallbackEntry::new("edge://newtab", is_edge),
                FallbackEntry::new("chrome://newtab", is_chromium),
                FallbackEntry::new("about:newtab", is_firefox),
            ],
            TERMINAL_DESTINATION,
        )
    }
}

impl FallbackChain {
    pub fn new(entries: Vec<FallbackEntry>, terminal: impl Into<String>) -> Self {
        Self {
            entries,
            terminal: terminal.into(),
        }
    }

    pub fn entries(&self) -> &[FallbackEntry] {
        &self.entries
    }

    pub fn terminal(&self) -> &str {
        &self.terminal
    }

    /// Destinations to try for `user_agent`, in priority order, terminal last
    pub fn candidates<'a>(&'a self, user_agent: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.entries
            .iter()
            .filter(move |entry| (entry.applies)(user_agent))
            .map(|entry| entry.destination.as_str())
            .chain(std::iter::once(self.terminal.as_str()))
    }

    /// Walk the chain until a navigation is accepted; returns the destination
    /// applied. The terminal entry is always reported as applied.
    pub async fn apply<C: BrowsingContext>(&self, context: &C) -> String {
        let user_agent = context.user_agent().await.unwrap_or_default();

        for entry in self.entries.iter().filter(|e| (e.applies)(&user_agent)) {
            match context.replace_location(&entry.destination).await {
                Ok(()) => {
                    tracing::info!("Replaced original tab with {}", entry.destination);
                    return entry.destination.clone();
                }
                Err(e) => {
                    tracing::debug!("Fallback {} refused: {}", entry.destination, e);
                }
            }
        }

        if let Err(e) = context.replace_location(&self.terminal).await {
            tracing::warn!("Terminal fallback {} reported: {}", self.terminal, e);
        } else {
            tracing::info!("Replaced original tab with {}", self.terminal);
        }
        self.terminal.clone()
    }
}

/// What happened to the original tab
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisposalOutcome {
    /// The close request took effect
    Closed,
    /// Close was refused and navigation to `destination` was requested
    /// without throwing. Browsers can still drop the request silently
    /// (Chrome ignores `chrome://` URLs from web pages), so this does not
    /// mean the tab is showing `destination`.
    Replaced { destination: String },
}

/// Close the original context, falling back to in-place replacement.
pub async fn dispose<C: BrowsingContext>(context: &C, chain: &FallbackChain) -> DisposalOutcome {
    if let Err(e) = context.close().await {
        tracing::debug!("Close request failed: {}", e);
    }

    tokio::time::sleep(CLOSE_SETTLE_DELAY).await;

    let closed = match context.is_closed().await {
        Ok(closed) => closed,
        Err(e) => {
            // Unreachable context means it went away
            tracing::debug!("Closed-state check failed ({}), assuming closed", e);
            true
        }
    };

    if closed {
        tracing::info!("Original tab closed");
        return DisposalOutcome::Closed;
    }

    DisposalOutcome::Replaced {
        destination: chain.apply(context).await,
    }
}

/// Run disposal only when `redirect.enabled` is set in the live configuration
pub async fn run<C: BrowsingContext>(
    config: &SharedConfig,
    context: &C,
    chain: &FallbackChain,
) -> Option<DisposalOutcome> {
    if !config.read(|c| c.redirect.enabled) {
        tracing::debug!("Redirect disabled, leaving original tab open");
        return None;
    }
    Some(dispose(context, chain).await)
}
