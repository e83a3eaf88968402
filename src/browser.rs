//! Browser Launcher
//!
//! Chrome discovery, launching, and tab creation.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::cdp::transport::launch_chrome;
use crate::cdp::{Connection, Transport};
use crate::error::{Error, Result};
use crate::page::Page;
use crate::LaunchOptions;

/// Global counter for unique user data directories
static BROWSER_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Find a Chrome/Chromium binary in the usual install locations
pub fn find_chrome() -> Result<PathBuf> {
    let candidates: &[&str] = if cfg!(target_os = "macos") {
        &[
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "/Applications/Chromium.app/Contents/MacOS/Chromium",
        ]
    } else if cfg!(target_os = "linux") {
        &[
            "/usr/bin/google-chrome",
            "/usr/bin/google-chrome-stable",
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
            "/snap/bin/chromium",
        ]
    } else if cfg!(target_os = "windows") {
        &[
            r"C:\Program Files\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
        ]
    } else {
        &[]
    };

    candidates
        .iter()
        .map(Path::new)
        .find(|path| path.exists())
        .map(Path::to_path_buf)
        .ok_or(Error::ChromeNotFound)
}

/// Chrome command line for `options`
fn launch_args(options: &LaunchOptions) -> Vec<String> {
    let mut args: Vec<String> = vec![
        "--no-first-run".into(),
        "--no-default-browser-check".into(),
        "--disable-default-apps".into(),
        "--disable-sync".into(),
        "--disable-translate".into(),
        "--password-store=basic".into(),
        "--use-mock-keychain".into(),
        format!(
            "--window-size={},{}",
            options.window_width, options.window_height
        ),
    ];

    if options.allow_popups {
        args.push("--disable-popup-blocking".into());
    }

    if let Some(ref user_agent) = options.user_agent {
        args.push(format!("--user-agent={}", user_agent));
    }

    if options.headless {
        args.push("--headless=new".into());
    }

    args
}

/// A launched Chrome instance
pub struct Browser {
    connection: Connection,
    options: LaunchOptions,
    /// User data directory (cleaned up on close)
    user_data_dir: PathBuf,
}

impl Browser {
    /// Launch with default options
    pub async fn launch() -> Result<Self> {
        Self::launch_with_options(LaunchOptions::default()).await
    }

    /// Launch with custom options
    pub async fn launch_with_options(options: LaunchOptions) -> Result<Self> {
        let instance_id = BROWSER_COUNTER.fetch_add(1, Ordering::Relaxed);
        let user_data_dir = std::env::temp_dir().join(format!(
            "tabcloak-browser-{}-{}",
            std::process::id(),
            instance_id
        ));

        let _ = std::fs::remove_dir_all(&user_data_dir);
        std::fs::create_dir_all(&user_data_dir)?;

        let chrome_path = match &options.chrome_path {
            Some(p) => PathBuf::from(p),
            None => find_chrome()?,
        };

        let mut args = launch_args(&options);
        args.push(format!("--user-data-dir={}", user_data_dir.display()));

        tracing::info!("Launching Chrome from {:?}", chrome_path);
        let (child, ws_url) = launch_chrome(&chrome_path, &args)?;

        let connection = Connection::new(Transport::new(child, &ws_url)?);

        let version = connection.version().await?;
        tracing::info!("Connected to Chrome: {}", version.product);

        Ok(Self {
            connection,
            options,
            user_data_dir,
        })
    }

    pub fn options(&self) -> &LaunchOptions {
        &self.options
    }

    /// Open a new tab and navigate it to `url`
    pub async fn new_page(&self, url: &str) -> Result<Page> {
        let target_id = self
            .connection
            .create_target(
                "about:blank",
                Some(self.options.window_width),
                Some(self.options.window_height),
            )
            .await?;

        let session = self.connection.attach_to_target(&target_id).await?;
        session.page_enable().await?;

        let page = Page::new(session);
        page.goto(url).await?;
        Ok(page)
    }

    /// Number of open page targets (tabs and popups)
    pub async fn page_count(&self) -> Result<usize> {
        let targets = self.connection.get_targets().await?;
        Ok(targets.iter().filter(|t| t.r#type == "page").count())
    }

    /// URLs of open page targets
    pub async fn page_urls(&self) -> Result<Vec<String>> {
        let targets = self.connection.get_targets().await?;
        Ok(targets
            .into_iter()
            .filter(|t| t.r#type == "page")
            .map(|t| t.url)
            .collect())
    }

    /// Get the browser version
    pub async fn version(&self) -> Result<String> {
        Ok(self.connection.version().await?.product)
    }

    /// Close the browser
    pub async fn close(self) -> Result<()> {
        self.connection.close().await?;
        let _ = std::fs::remove_dir_all(&self.user_data_dir);
        Ok(())
    }
}

impl Drop for Browser {
    fn drop(&mut self) {
        // The Transport's Drop impl kills the Chrome process
        let _ = std::fs::remove_dir_all(&self.user_data_dir);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_launch_args_headless() {
        let args = launch_args(&LaunchOptions::default());
        assert!(args.contains(&"--headless=new".to_string()));
        assert!(args.contains(&"--disable-popup-blocking".to_string()));
        assert!(args.contains(&"--window-size=1280,800".to_string()));
    }

    #[test]
    fn test_launch_args_visible_with_blocker() {
        let options = LaunchOptions {
            allow_popups: false,
            user_agent: Some("TestAgent/1.0".into()),
            ..LaunchOptions::visible()
        };
        let args = launch_args(&options);
        assert!(!args.iter().any(|a| a.starts_with("--headless")));
        assert!(!args.contains(&"--disable-popup-blocking".to_string()));
        assert!(args.contains(&"--user-agent=TestAgent/1.0".to_string()));
    }
}
