//! Cloak a page in a visible Chrome window
//!
//! Run with: cargo run --example cloak [url]

use tabcloak::{Browser, CdpContext, Cloak, LaunchOptions, LaunchOutcome, PartialConfig, Result};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "https://example.com".to_string());

    println!("Launching browser...");
    let browser = Browser::launch_with_options(LaunchOptions::visible()).await?;
    println!("Browser version: {}", browser.version().await?);

    println!("Opening {}...", url);
    let page = browser.new_page(&url).await?;

    let overrides = PartialConfig::default().with_title("Google Docs");
    let cloak = Cloak::new(CdpContext::new(page), Some(&overrides));

    println!("Supported: {}", cloak.is_supported().await);

    match cloak.auto_launch().await {
        LaunchOutcome::Cloaked {
            frame_src,
            disposal,
        } => {
            println!("Cloaked {}", frame_src);
            println!("Original tab: {:?}", disposal);
        }
        other => println!("Not cloaked: {:?}", other),
    }

    println!("Open tabs: {:?}", browser.page_urls().await?);

    // Keep the window up long enough to look at it
    tokio::time::sleep(std::time::Duration::from_secs(5)).await;

    browser.close().await?;
    println!("Done!");

    Ok(())
}
