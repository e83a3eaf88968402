//! # tabcloak
//!
//! Re-host the current page inside a disguised popup window and get the
//! original tab out of the history.
//!
//! The pipeline runs once per page load:
//!
//! - **Guard** - skip inside frames and in browsers with restrictive popup rules
//! - **Popup** - open `about:blank`, set a decoy title/favicon, frame the
//!   original address full-viewport, install an exit-confirmation trap
//! - **Disposal** - close the original tab, or replace it in place with a
//!   new-tab page when the browser refuses
//!
//! The pipeline talks to the browser only through the [`BrowsingContext`]
//! traits. [`CdpContext`] implements them for a Chrome tab driven over the
//! DevTools protocol.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tabcloak::{Browser, CdpContext, Cloak, LaunchOptions};
//!
//! #[tokio::main]
//! async fn main() -> tabcloak::Result<()> {
//!     let browser = Browser::launch_with_options(LaunchOptions::visible()).await?;
//!     let page = browser.new_page("https://example.com").await?;
//!
//!     let cloak = Cloak::new(CdpContext::new(page), None);
//!     let outcome = cloak.auto_launch().await;
//!     println!("{:?}", outcome);
//!
//!     browser.close().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! ```rust
//! use tabcloak::{CloakConfig, PartialConfig};
//!
//! let overrides = PartialConfig::from_json(
//!     r#"{"disguise": {"title": "Google Docs"}, "redirect": {"enabled": false}}"#,
//! )
//! .unwrap();
//! let config = CloakConfig::resolve(Some(&overrides));
//!
//! assert_eq!(config.disguise.title, "Google Docs");
//! assert!(!config.redirect.enabled);
//! assert!(config.protection.exit_confirmation);
//! ```

pub mod browser;
pub mod cdp;
pub mod cloak;
pub mod config;
pub mod context;
pub mod disposer;
pub mod error;
pub mod guard;
pub mod page;
pub mod popup;
pub mod tab;

// Re-exports
pub use browser::Browser;
pub use cloak::{Cloak, LaunchOutcome};
pub use config::{
    CloakConfig, Disguise, PartialConfig, PartialDisguise, PartialProtection, PartialRedirect,
    Protection, Redirect, SharedConfig,
};
pub use context::{BrowsingContext, ElementSpec, EnvironmentInfo, PopupWindow};
pub use disposer::{DisposalOutcome, FallbackChain, FallbackEntry};
pub use error::{Error, Result};
pub use guard::{Capabilities, SkipReason, Verdict};
pub use page::Page;
pub use popup::PopupOutcome;
pub use tab::{CdpContext, CdpPopup};

/// Options for launching Chrome
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    /// Headless mode
    pub headless: bool,
    /// Path to Chrome/Chromium binary
    pub chrome_path: Option<String>,
    /// Custom user agent (None = Chrome's own)
    pub user_agent: Option<String>,
    /// Let script-opened windows through the popup blocker
    pub allow_popups: bool,
    /// Window width
    pub window_width: u32,
    /// Window height
    pub window_height: u32,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            headless: true,
            chrome_path: None,
            user_agent: None,
            allow_popups: true,
            window_width: 1280,
            window_height: 800,
        }
    }
}

impl LaunchOptions {
    /// Create a visible (non-headless) config
    pub fn visible() -> Self {
        Self {
            headless: false,
            ..Default::default()
        }
    }
}
