//! Chromium session implementation using Playwright
//!
//! One session owns one browser, one context and one page for its whole
//! lifetime. The monitor engine decides when sessions are created and closed.

use async_trait::async_trait;
use playwright::api::{Browser, BrowserContext, Page, Viewport};
use playwright::Playwright;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::driver::traits::{
    BrowserSession, Selector, SessionError, SessionFactory, SessionResult,
};

/// Chromium session configuration
#[derive(Debug, Clone)]
pub struct WebSessionConfig {
    pub headless: bool,
    /// Profile directory; keeps portal cookies across sessions
    pub user_data_dir: PathBuf,
    pub viewport_width: u32,
    pub viewport_height: u32,
}

impl Default for WebSessionConfig {
    fn default() -> Self {
        Self {
            headless: true,
            user_data_dir: PathBuf::from("/tmp/chrome"),
            viewport_width: 1920,
            viewport_height: 1080,
        }
    }
}

/// Chromium session driven through Playwright
pub struct WebSession {
    #[allow(dead_code)]
    playwright: Playwright,
    browser: Browser,
    #[allow(dead_code)]
    context: BrowserContext,
    page: Arc<Mutex<Page>>,
}

impl WebSession {
    /// Launch a headless Chromium with the configured profile directory
    pub async fn create(config: &WebSessionConfig) -> SessionResult<Self> {
        let playwright = Playwright::initialize()
            .await
            .map_err(|e| SessionError::Create(format!("{:?}", e)))?;

        let chromium = playwright.chromium();
        let args: Vec<String> = vec![
            format!("--user-data-dir={}", config.user_data_dir.display()),
            "--no-sandbox".to_string(),
            format!(
                "--window-size={},{}",
                config.viewport_width, config.viewport_height
            ),
            "--disable-dev-shm-usage".to_string(),
        ];

        let browser = chromium
            .launcher()
            .headless(config.headless)
            .args(&args)
            .launch()
            .await
            .map_err(|e| SessionError::Create(format!("{:?}", e)))?;

        let context = browser
            .context_builder()
            .build()
            .await
            .map_err(|e| SessionError::Create(format!("{:?}", e)))?;

        let page = context
            .new_page()
            .await
            .map_err(|e| SessionError::Create(format!("{:?}", e)))?;

        page.set_viewport_size(Viewport {
            width: config.viewport_width as i32,
            height: config.viewport_height as i32,
        })
        .await
        .map_err(|e| SessionError::Create(format!("{:?}", e)))?;

        Ok(Self {
            playwright,
            browser,
            context,
            page: Arc::new(Mutex::new(page)),
        })
    }

    fn interaction(selector: &Selector, action: &'static str, err: impl std::fmt::Debug) -> SessionError {
        SessionError::Interaction {
            selector: selector.clone(),
            action,
            reason: format!("{:?}", err),
        }
    }
}

#[async_trait]
impl BrowserSession for WebSession {
    async fn navigate(&self, url: &str) -> SessionResult<()> {
        let page = self.page.lock().await;
        page.goto_builder(url)
            .goto()
            .await
            .map_err(|e| SessionError::Navigation(format!("{}: {:?}", url, e)))?;
        Ok(())
    }

    async fn current_url(&self) -> SessionResult<String> {
        let page = self.page.lock().await;
        let url: String = page
            .evaluate("window.location.href", ())
            .await
            .map_err(|e| SessionError::Navigation(format!("{:?}", e)))?;
        Ok(url)
    }

    async fn wait_for_visible(&self, selector: &Selector, timeout: Duration) -> SessionResult<()> {
        let page = self.page.lock().await;
        let sel = selector.to_query();
        page.wait_for_selector_builder(&sel)
            .timeout(timeout.as_millis() as f64)
            .wait_for_selector()
            .await
            .map_err(|_| SessionError::WaitTimeout {
                selector: selector.clone(),
                timeout,
            })?;
        Ok(())
    }

    async fn find(&self, selector: &Selector) -> SessionResult<()> {
        let page = self.page.lock().await;
        let sel = selector.to_query();
        match page
            .query_selector(&sel)
            .await
            .map_err(|_| SessionError::NotFound(selector.clone()))?
        {
            Some(_) => Ok(()),
            None => Err(SessionError::NotFound(selector.clone())),
        }
    }

    async fn click(&self, selector: &Selector) -> SessionResult<()> {
        let page = self.page.lock().await;
        let sel = selector.to_query();
        page.click_builder(&sel)
            .click()
            .await
            .map_err(|e| Self::interaction(selector, "click", e))?;
        Ok(())
    }

    async fn fill(&self, selector: &Selector, text: &str) -> SessionResult<()> {
        let page = self.page.lock().await;
        let sel = selector.to_query();
        let element = page
            .query_selector(&sel)
            .await
            .map_err(|_| SessionError::NotFound(selector.clone()))?
            .ok_or_else(|| SessionError::NotFound(selector.clone()))?;
        element
            .fill_builder(text)
            .fill()
            .await
            .map_err(|e| Self::interaction(selector, "fill", e))?;
        Ok(())
    }

    async fn submit(&self, selector: &Selector) -> SessionResult<()> {
        let page = self.page.lock().await;
        let sel = selector.to_query();
        // Forms on the portal have no dedicated submit control we can rely
        // on, so submit the form node itself.
        let _: () = page
            .evaluate_on_selector(&sel, "el => el.submit()", None::<()>)
            .await
            .map_err(|e| Self::interaction(selector, "submit", e))?;
        Ok(())
    }

    async fn close(&self) -> SessionResult<()> {
        self.browser
            .close()
            .await
            .map_err(|e| SessionError::Close(format!("{:?}", e)))?;
        Ok(())
    }
}

/// Builds Playwright sessions from one fixed configuration
pub struct WebSessionFactory {
    config: WebSessionConfig,
}

impl WebSessionFactory {
    pub fn new(config: WebSessionConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl SessionFactory for WebSessionFactory {
    async fn create(&self) -> SessionResult<Box<dyn BrowserSession>> {
        Ok(Box::new(WebSession::create(&self.config).await?))
    }
}
