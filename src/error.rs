//! Error types for tabcloak

use thiserror::Error;

/// Result type for tabcloak operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for tabcloak
#[derive(Debug, Error)]
pub enum Error {
    /// Failed to launch Chrome
    #[error("Failed to launch Chrome: {0}")]
    Launch(String),

    /// Transport error
    #[error("Transport error: {context}")]
    Transport {
        context: String,
        #[source]
        source: Option<std::io::Error>,
    },

    /// CDP protocol error
    #[error("CDP error in {method}: {message} (code {code})")]
    Cdp {
        method: String,
        code: i64,
        message: String,
    },

    /// CDP error without method context (for simple cases)
    #[error("CDP error: {0}")]
    CdpSimple(String),

    /// Navigation of a page failed outright
    #[error("Navigation error: {0}")]
    Navigation(String),

    /// The browser refused an in-place navigation to `url`
    #[error("Navigation to {url} refused: {reason}")]
    NavigationRefused { url: String, reason: String },

    /// Reading the parent context threw a cross-origin security error
    #[error("Cross-origin access denied: {0}")]
    CrossOrigin(String),

    /// The popup handle was closed while it was being populated
    #[error("Popup window is closed")]
    PopupClosed,

    /// Timeout
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Chrome not found
    #[error("Chrome not found")]
    ChromeNotFound,
}

impl Error {
    /// Create a transport error with context
    pub fn transport(context: impl Into<String>) -> Self {
        Self::Transport {
            context: context.into(),
            source: None,
        }
    }

    /// Create a transport error with IO source
    pub fn transport_io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Transport {
            context: context.into(),
            source: Some(source),
        }
    }

    /// Create a CDP error with full context
    pub fn cdp(method: impl Into<String>, code: i64, message: impl Into<String>) -> Self {
        Self::Cdp {
            method: method.into(),
            code,
            message: message.into(),
        }
    }

    /// Create a refused-navigation error
    pub fn refused(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::NavigationRefused {
            url: url.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refused_display() {
        let err = Error::refused("chrome://newtab", "Not allowed to load local resource");
        assert_eq!(
            err.to_string(),
            "Navigation to chrome://newtab refused: Not allowed to load local resource"
        );
    }
}
