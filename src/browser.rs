//! Browser launcher
//!
//! Finds a Chrome/Chromium binary, launches it with flags that keep the
//! automation footprint small, and hands out pages over CDP.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::cdp::{launch_chrome, Connection, Transport};
use crate::config::RunConfig;
use crate::error::{Error, Result};
use crate::page::Page;

/// Global counter for unique user data directories
static BROWSER_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Locate a Chrome/Chromium binary on this platform
pub fn find_chrome() -> Result<PathBuf> {
    let candidates = if cfg!(target_os = "macos") {
        vec![
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "/Applications/Chromium.app/Contents/MacOS/Chromium",
            "/Applications/Google Chrome Canary.app/Contents/MacOS/Google Chrome Canary",
        ]
    } else if cfg!(target_os = "linux") {
        vec![
            "/usr/bin/google-chrome",
            "/usr/bin/google-chrome-stable",
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
            "/snap/bin/chromium",
        ]
    } else if cfg!(target_os = "windows") {
        vec![
            r"C:\Program Files\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
        ]
    } else {
        vec![]
    };

    for candidate in candidates {
        let path = Path::new(candidate);
        if path.exists() {
            return Ok(path.to_path_buf());
        }
    }

    Err(Error::ChromeNotFound)
}

/// Launch arguments that hide the usual automation tells
fn launch_args(config: &RunConfig) -> Vec<String> {
    let mut args = vec![
        "--disable-blink-features=AutomationControlled".into(),
        "--disable-automation".into(),
        "--disable-features=IsolateOrigins,site-per-process,AutomationControlled,EnableAutomation"
            .into(),
        "--disable-infobars".into(),
        "--disable-dev-shm-usage".into(),
        "--no-first-run".into(),
        "--no-default-browser-check".into(),
        "--no-sandbox".into(),
        "--disable-default-apps".into(),
        "--disable-hang-monitor".into(),
        "--disable-popup-blocking".into(),
        "--disable-prompt-on-repost".into(),
        "--disable-sync".into(),
        "--metrics-recording-only".into(),
        "--password-store=basic".into(),
        "--use-mock-keychain".into(),
        format!(
            "--window-size={},{}",
            config.viewport_width, config.viewport_height
        ),
    ];

    if config.headless {
        args.push("--headless=new".into());
    }

    args
}

/// One Chrome instance, exclusive to a single automation run
pub struct Browser {
    connection: Connection,
    /// User data directory (cleaned up on close)
    user_data_dir: PathBuf,
}

impl Browser {
    /// Launch Chrome configured for one run
    pub async fn launch(config: &RunConfig) -> Result<Self> {
        let instance_id = BROWSER_COUNTER.fetch_add(1, Ordering::Relaxed);
        let user_data_dir = std::env::temp_dir().join(format!(
            "caughtup-browser-{}-{}",
            std::process::id(),
            instance_id
        ));

        // Clear out any stale data from a crashed run
        let _ = std::fs::remove_dir_all(&user_data_dir);
        std::fs::create_dir_all(&user_data_dir)?;

        let chrome_path = match &config.chrome_path {
            Some(p) => PathBuf::from(p),
            None => find_chrome()?,
        };

        let mut args = launch_args(config);
        args.push(format!("--user-data-dir={}", user_data_dir.display()));

        tracing::info!("Launching Chrome from {:?}", chrome_path);
        let (child, ws_url) = launch_chrome(&chrome_path, &args)?;

        let transport = Transport::new(child, &ws_url)?;
        let connection = Connection::new(transport);

        let version = connection.version().await?;
        tracing::info!("Connected to Chrome: {}", version.product);

        Ok(Self {
            connection,
            user_data_dir,
        })
    }

    /// Open a fresh page at about:blank
    pub async fn new_page(&self) -> Result<Page> {
        let target_id = self.connection.create_target("about:blank").await?;
        let session = self.connection.attach_to_target(&target_id).await?;
        session.page_enable().await?;
        Ok(Page::new(session))
    }

    /// Close the browser and clean up its scratch profile
    pub async fn close(self) -> Result<()> {
        self.connection.close().await?;
        let _ = std::fs::remove_dir_all(&self.user_data_dir);
        Ok(())
    }
}

impl Drop for Browser {
    fn drop(&mut self) {
        // Best-effort profile cleanup if close() wasn't reached; the
        // Transport's Drop impl handles killing the Chrome process.
        let _ = std::fs::remove_dir_all(&self.user_data_dir);
    }
}
