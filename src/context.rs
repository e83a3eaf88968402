//! Browsing Context Abstraction
//!
//! The slice of the browser API the cloaking pipeline consumes. The pipeline
//! only ever talks to these traits; `CdpContext` implements them against a
//! live Chrome page and tests implement them in memory.

use crate::error::Result;

/// Read-only facts about the environment the page runs in
#[allow(async_fn_in_trait)]
pub trait EnvironmentInfo {
    /// Whether the context's top-level context differs from itself.
    ///
    /// An `Err` means the check itself threw, typically a cross-origin
    /// security error while touching the parent.
    async fn frame_containment(&self) -> Result<bool>;

    /// The reported agent identity (`navigator.userAgent`)
    async fn user_agent(&self) -> Result<String>;
}

/// The original browsing context (the tab being cloaked)
#[allow(async_fn_in_trait)]
pub trait BrowsingContext: EnvironmentInfo {
    /// Handle to a secondary window opened by this context
    type Popup: PopupWindow;

    /// Current address of the document
    async fn current_url(&self) -> Result<String>;

    /// Whether the document has finished loading
    async fn is_ready(&self) -> Result<bool>;

    /// Resolve once the document has finished loading
    async fn wait_until_ready(&self) -> Result<()>;

    /// Open a new top-level context. `None` when the browser handed back no
    /// window at all (popup blocked).
    async fn open_popup(&self, url: &str) -> Result<Option<Self::Popup>>;

    /// Show a blocking user-facing message
    async fn alert(&self, message: &str) -> Result<()>;

    /// Ask the browser to close this context. Browsers may silently refuse.
    async fn close(&self) -> Result<()>;

    /// Whether this context has been closed
    async fn is_closed(&self) -> Result<bool>;

    /// Navigate in place, replacing the current history entry
    async fn replace_location(&self, url: &str) -> Result<()>;
}

/// A popup window whose document is being populated
#[allow(async_fn_in_trait)]
pub trait PopupWindow {
    async fn is_closed(&self) -> Result<bool>;

    async fn set_title(&self, title: &str) -> Result<()>;

    /// Zero the body's own margin and padding
    async fn reset_body(&self) -> Result<()>;

    async fn append_to_head(&self, element: &ElementSpec) -> Result<()>;

    async fn append_to_body(&self, element: &ElementSpec) -> Result<()>;
}

/// Inline style of the re-hosting frame: pinned to every edge, no chrome
pub const FRAME_STYLE: &str = "position:fixed;top:0;left:0;right:0;bottom:0;\
width:100%;height:100%;border:none;margin:0;padding:0;";

/// Backend-neutral description of a DOM element to create
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementSpec {
    pub tag: String,
    pub attributes: Vec<(String, String)>,
    pub style: Option<String>,
    pub text: Option<String>,
}

impl ElementSpec {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: Vec::new(),
            style: None,
            text: None,
        }
    }

    /// `<link rel="icon" href=...>`
    pub fn favicon(href: &str) -> Self {
        Self::new("link")
            .with_attr("rel", "icon")
            .with_attr("href", href)
    }

    /// Full-viewport `<iframe>` pointing at `src`
    pub fn frame(src: &str) -> Self {
        let mut frame = Self::new("iframe")
            .with_attr("src", src)
            .with_attr("frameborder", "0")
            .with_attr("allowfullscreen", "true");
        frame.style = Some(FRAME_STYLE.to_string());
        frame
    }

    /// Inline `<script>` with the given source
    pub fn script(source: impl Into<String>) -> Self {
        let mut script = Self::new("script");
        script.text = Some(source.into());
        script
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    /// Look up an attribute value
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// A JavaScript expression that creates this element in `document_expr`
    /// and evaluates to it
    pub fn to_js(&self, document_expr: &str) -> String {
        let mut js = format!(
            "(function(d) {{ const e = d.createElement('{}');",
            escape_js_string(&self.tag)
        );
        for (name, value) in &self.attributes {
            js.push_str(&format!(
                " e.setAttribute('{}', '{}');",
                escape_js_string(name),
                escape_js_string(value)
            ));
        }
        if let Some(style) = &self.style {
            js.push_str(&format!(" e.style.cssText = '{}';", escape_js_string(style)));
        }
        if let Some(text) = &self.text {
            js.push_str(&format!(" e.textContent = '{}';", escape_js_string(text)));
        }
        js.push_str(&format!(" return e; }})({})", document_expr));
        js
    }
}

/// Escape a string for safe use in JavaScript string literals.
/// `</` is broken up so the result can also sit inside an inline script.
pub fn escape_js_string(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('\'', "\\'")
        .replace('"', "\\\"")
        .replace('`', "\\`")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace("${", "\\${")
        .replace("</", "<\\/")
}
