//! Environment Guard
//!
//! Decides whether cloaking may run at all. Nothing here has side effects, so
//! the same gate backs both `Cloak::launch` and `Cloak::is_supported`.

use std::fmt;

use crate::config::SharedConfig;
use crate::context::EnvironmentInfo;

/// Agent substring identifying the browser family with restrictive popup semantics
pub const RESTRICTED_AGENT_MARKER: &str = "Firefox";

/// Check an agent string for the restricted browser family
pub fn is_restricted_agent(user_agent: &str) -> bool {
    user_agent.contains(RESTRICTED_AGENT_MARKER)
}

/// Named capability predicates over an injected environment
pub struct Capabilities<'a, E> {
    env: &'a E,
}

impl<'a, E: EnvironmentInfo> Capabilities<'a, E> {
    pub fn new(env: &'a E) -> Self {
        Self { env }
    }

    /// True when running inside another context. A throwing check counts as nested.
    pub async fn is_nested_context(&self) -> bool {
        match self.env.frame_containment().await {
            Ok(nested) => nested,
            Err(e) => {
                tracing::debug!("Frame containment check failed ({}), assuming nested", e);
                true
            }
        }
    }

    /// True when the agent belongs to the restricted browser family
    pub async fn has_restricted_popup_semantics(&self) -> bool {
        match self.env.user_agent().await {
            Ok(ua) => is_restricted_agent(&ua),
            Err(e) => {
                tracing::debug!("User agent unavailable ({}), assuming unrestricted", e);
                false
            }
        }
    }
}

/// Why the pipeline was skipped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Disabled,
    NestedContext,
    RestrictedBrowser,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Disabled => write!(f, "cloaking is disabled"),
            SkipReason::NestedContext => write!(f, "page is running inside a frame"),
            SkipReason::RestrictedBrowser => {
                write!(f, "browser restricts cross-window automation")
            }
        }
    }
}

/// Outcome of the guard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Proceed,
    Skip(SkipReason),
}

impl Verdict {
    pub fn is_proceed(&self) -> bool {
        matches!(self, Verdict::Proceed)
    }
}

/// Run the gate against the live configuration.
///
/// `enabled == false` short-circuits before the environment is probed.
pub async fn evaluate<E: EnvironmentInfo>(config: &SharedConfig, env: &E) -> Verdict {
    let (enabled, skip_iframes, skip_firefox) =
        config.read(|c| (c.enabled, c.skip_iframes, c.skip_firefox));

    if !enabled {
        return Verdict::Skip(SkipReason::Disabled);
    }

    let caps = Capabilities::new(env);

    if skip_iframes && caps.is_nested_context().await {
        return Verdict::Skip(SkipReason::NestedContext);
    }

    if skip_firefox && caps.has_restricted_popup_semantics().await {
        return Verdict::Skip(SkipReason::RestrictedBrowser);
    }

    Verdict::Proceed
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::config::PartialConfig;
    use crate::error::{Error, Result};

    const CHROME_UA: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
    const FIREFOX_UA: &str =
        "Mozilla/5.0 (X11; Linux x86_64; rv:121.0) Gecko/20100101 Firefox/121.0";

    struct FakeEnv {
        nested: std::result::Result<bool, ()>,
        user_agent: &'static str,
        probes: AtomicU32,
    }

    impl FakeEnv {
        fn new(nested: std::result::Result<bool, ()>, user_agent: &'static str) -> Self {
            Self {
                nested,
                user_agent,
                probes: AtomicU32::new(0),
            }
        }
    }

    impl EnvironmentInfo for FakeEnv {
        async fn frame_containment(&self) -> Result<bool> {
            self.probes.fetch_add(1, Ordering::SeqCst);
            self.nested
                .map_err(|_| Error::CrossOrigin("Blocked a frame with origin".into()))
        }

        async fn user_agent(&self) -> Result<String> {
            self.probes.fetch_add(1, Ordering::SeqCst);
            Ok(self.user_agent.to_string())
        }
    }

    #[test]
    fn test_is_restricted_agent() {
        assert!(is_restricted_agent(FIREFOX_UA));
        assert!(!is_restricted_agent(CHROME_UA));
    }

    #[tokio::test]
    async fn test_capabilities() {
        let env = FakeEnv::new(Ok(false), FIREFOX_UA);
        let caps = Capabilities::new(&env);
        assert!(!caps.is_nested_context().await);
        assert!(caps.has_restricted_popup_semantics().await);
    }

    #[tokio::test]
    async fn test_throwing_containment_counts_as_nested() {
        let env = FakeEnv::new(Err(()), CHROME_UA);
        assert!(Capabilities::new(&env).is_nested_context().await);

        let config = SharedConfig::default();
        assert_eq!(
            evaluate(&config, &env).await,
            Verdict::Skip(SkipReason::NestedContext)
        );
    }

    #[tokio::test]
    async fn test_proceeds_in_top_level_chrome() {
        let env = FakeEnv::new(Ok(false), CHROME_UA);
        assert_eq!(evaluate(&SharedConfig::default(), &env).await, Verdict::Proceed);
    }

    #[tokio::test]
    async fn test_skip_flags_disable_checks() {
        let config = SharedConfig::default();
        config.update(|c| {
            c.skip_iframes = false;
            c.skip_firefox = false;
        });

        let env = FakeEnv::new(Err(()), FIREFOX_UA);
        assert!(evaluate(&config, &env).await.is_proceed());
    }

    #[tokio::test]
    async fn test_restricted_browser_skipped() {
        let env = FakeEnv::new(Ok(false), FIREFOX_UA);
        assert_eq!(
            evaluate(&SharedConfig::default(), &env).await,
            Verdict::Skip(SkipReason::RestrictedBrowser)
        );
    }

    #[tokio::test]
    async fn test_disabled_does_not_probe() {
        let config = SharedConfig::default();
        config.merge(&PartialConfig::default().with_enabled(false));

        let env = FakeEnv::new(Ok(true), FIREFOX_UA);
        assert_eq!(
            evaluate(&config, &env).await,
            Verdict::Skip(SkipReason::Disabled)
        );
        assert_eq!(env.probes.load(Ordering::SeqCst), 0);
    }
}
