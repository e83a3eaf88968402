//! In-memory browsing context for driving the pipeline without a browser

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use tabcloak::{BrowsingContext, ElementSpec, EnvironmentInfo, Error, PopupWindow, Result};

pub const CHROME_UA: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
pub const EDGE_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 Edg/120.0.2210.91";
pub const FIREFOX_UA: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:121.0) Gecko/20100101 Firefox/121.0";

pub const LESSON_URL: &str = "https://example.edu/lesson";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Containment {
    Top,
    Nested,
    Throws,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopupBehavior {
    /// A live window
    Opens,
    /// `window.open` returned nothing
    Null,
    /// A handle that is already closed
    AlreadyClosed,
    /// A live window whose document rejects writes
    Broken,
}

/// Everything injected into one popup document
#[derive(Debug, Default, Clone)]
pub struct PopupDocument {
    pub title: Option<String>,
    pub head: Vec<ElementSpec>,
    pub body: Vec<ElementSpec>,
    pub body_reset: bool,
    /// Every write in the order it happened, e.g. `title`, `head:script`, `body:iframe`
    pub events: Vec<String>,
}

impl PopupDocument {
    pub fn frames(&self) -> Vec<&ElementSpec> {
        self.body.iter().filter(|e| e.tag == "iframe").collect()
    }

    pub fn favicons(&self) -> Vec<&ElementSpec> {
        self.head
            .iter()
            .filter(|e| e.tag == "link" && e.attr("rel") == Some("icon"))
            .collect()
    }

    pub fn scripts(&self) -> Vec<&ElementSpec> {
        self.head.iter().filter(|e| e.tag == "script").collect()
    }
}

/// Side effects observed on the original context
#[derive(Debug, Default)]
pub struct Recorder {
    pub url: String,
    pub probes: u32,
    pub ready_waits: u32,
    pub open_calls: u32,
    pub popups: Vec<Arc<Mutex<PopupDocument>>>,
    pub alerts: Vec<String>,
    pub close_requests: u32,
    pub closed: bool,
    pub navigation_attempts: Vec<String>,
    pub history_replacements: Vec<String>,
}

pub struct FakeContext {
    pub user_agent: String,
    pub containment: Containment,
    pub ready: bool,
    pub popup: PopupBehavior,
    pub close_honored: bool,
    pub refused: Vec<String>,
    /// Accepted without throwing but never navigated to
    pub ignored: Vec<String>,
    pub state: Arc<Mutex<Recorder>>,
}

impl FakeContext {
    /// A top-level, loaded Chrome tab at `url` whose close request is refused
    pub fn new(url: &str) -> Self {
        Self {
            user_agent: CHROME_UA.to_string(),
            containment: Containment::Top,
            ready: true,
            popup: PopupBehavior::Opens,
            close_honored: false,
            refused: Vec::new(),
            ignored: Vec::new(),
            state: Arc::new(Mutex::new(Recorder {
                url: url.to_string(),
                ..Default::default()
            })),
        }
    }

    pub fn with_user_agent(mut self, ua: &str) -> Self {
        self.user_agent = ua.to_string();
        self
    }

    pub fn with_containment(mut self, containment: Containment) -> Self {
        self.containment = containment;
        self
    }

    pub fn with_popup(mut self, popup: PopupBehavior) -> Self {
        self.popup = popup;
        self
    }

    pub fn closable(mut self) -> Self {
        self.close_honored = true;
        self
    }

    pub fn loading(mut self) -> Self {
        self.ready = false;
        self
    }

    pub fn refusing(mut self, destinations: &[&str]) -> Self {
        self.refused = destinations.iter().map(|d| d.to_string()).collect();
        self
    }

    pub fn ignoring(mut self, destinations: &[&str]) -> Self {
        self.ignored = destinations.iter().map(|d| d.to_string()).collect();
        self
    }

    pub fn recorder(&self) -> std::sync::MutexGuard<'_, Recorder> {
        self.state.lock().unwrap()
    }

    /// Snapshot of popup `index`
    pub fn popup_doc(&self, index: usize) -> PopupDocument {
        self.recorder().popups[index].lock().unwrap().clone()
    }
}

impl EnvironmentInfo for FakeContext {
    async fn frame_containment(&self) -> Result<bool> {
        self.recorder().probes += 1;
        match self.containment {
            Containment::Top => Ok(false),
            Containment::Nested => Ok(true),
            Containment::Throws => Err(Error::CrossOrigin(
                "Blocked a frame with origin from accessing a cross-origin frame".into(),
            )),
        }
    }

    async fn user_agent(&self) -> Result<String> {
        self.recorder().probes += 1;
        Ok(self.user_agent.clone())
    }
}

impl BrowsingContext for FakeContext {
    type Popup = FakePopup;

    async fn current_url(&self) -> Result<String> {
        Ok(self.recorder().url.clone())
    }

    async fn is_ready(&self) -> Result<bool> {
        Ok(self.ready)
    }

    async fn wait_until_ready(&self) -> Result<()> {
        self.recorder().ready_waits += 1;
        Ok(())
    }

    async fn open_popup(&self, _url: &str) -> Result<Option<FakePopup>> {
        let mut state = self.recorder();
        state.open_calls += 1;

        let closed = match self.popup {
            PopupBehavior::Null => return Ok(None),
            PopupBehavior::AlreadyClosed => true,
            PopupBehavior::Opens | PopupBehavior::Broken => false,
        };

        let doc = Arc::new(Mutex::new(PopupDocument::default()));
        state.popups.push(Arc::clone(&doc));
        Ok(Some(FakePopup {
            doc,
            closed,
            broken: self.popup == PopupBehavior::Broken,
        }))
    }

    async fn alert(&self, message: &str) -> Result<()> {
        self.recorder().alerts.push(message.to_string());
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        let mut state = self.recorder();
        state.close_requests += 1;
        if self.close_honored {
            state.closed = true;
        }
        Ok(())
    }

    async fn is_closed(&self) -> Result<bool> {
        Ok(self.recorder().closed)
    }

    async fn replace_location(&self, url: &str) -> Result<()> {
        let mut state = self.recorder();
        state.navigation_attempts.push(url.to_string());
        if self.refused.iter().any(|r| r == url) {
            return Err(Error::refused(url, "Not allowed to load local resource"));
        }
        if self.ignored.iter().any(|i| i == url) {
            return Ok(());
        }
        state.url = url.to_string();
        state.history_replacements.push(url.to_string());
        Ok(())
    }
}

pub struct FakePopup {
    doc: Arc<Mutex<PopupDocument>>,
    closed: bool,
    broken: bool,
}

impl FakePopup {
    fn write(&self, event: String, f: impl FnOnce(&mut PopupDocument)) -> Result<()> {
        if self.broken {
            return Err(Error::CdpSimple(
                "JavaScript error: Cannot read properties of null".into(),
            ));
        }
        let mut doc = self.doc.lock().unwrap();
        doc.events.push(event);
        f(&mut *doc);
        Ok(())
    }
}

impl PopupWindow for FakePopup {
    async fn is_closed(&self) -> Result<bool> {
        Ok(self.closed)
    }

    async fn set_title(&self, title: &str) -> Result<()> {
        self.write("title".into(), |doc| doc.title = Some(title.to_string()))
    }

    async fn reset_body(&self) -> Result<()> {
        self.write("reset".into(), |doc| doc.body_reset = true)
    }

    async fn append_to_head(&self, element: &ElementSpec) -> Result<()> {
        self.write(format!("head:{}", element.tag), |doc| {
            doc.head.push(element.clone())
        })
    }

    async fn append_to_body(&self, element: &ElementSpec) -> Result<()> {
        self.write(format!("body:{}", element.tag), |doc| {
            doc.body.push(element.clone())
        })
    }
}
