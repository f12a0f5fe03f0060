use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Element selector for page elements
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// Select by element id
    Id(String),
    /// Select by CSS selector
    Css(String),
}

impl Selector {
    pub fn id(id: impl Into<String>) -> Self {
        Selector::Id(id.into())
    }

    /// Query string understood by the underlying automation engine
    pub fn to_query(&self) -> String {
        match self {
            Selector::Id(id) => format!("#{}", id),
            Selector::Css(css) => css.clone(),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_query())
    }
}

/// Errors produced at the browser-session boundary
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("could not launch browser session: {0}")]
    Create(String),

    #[error("could not close browser session: {0}")]
    Close(String),

    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("element {0} not found")]
    NotFound(Selector),

    #[error("element {selector} not visible within {}s", .timeout.as_secs())]
    WaitTimeout { selector: Selector, timeout: Duration },

    #[error("{action} on {selector} failed: {reason}")]
    Interaction {
        selector: Selector,
        action: &'static str,
        reason: String,
    },
}

pub type SessionResult<T> = Result<T, SessionError>;

/// Narrow browser boundary consumed by the monitor flows
///
/// Flow steps are written against this trait so they never touch the
/// underlying automation stack directly. All operations are sequential;
/// waits are bounded by the timeout passed by the caller.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    /// Navigate to an absolute URL
    async fn navigate(&self, url: &str) -> SessionResult<()>;

    /// URL the page currently shows
    async fn current_url(&self) -> SessionResult<String>;

    /// Wait until the element is visible, up to `timeout`
    async fn wait_for_visible(&self, selector: &Selector, timeout: Duration) -> SessionResult<()>;

    /// Check that the element is present in the DOM right now, without waiting
    async fn find(&self, selector: &Selector) -> SessionResult<()>;

    /// Click the element
    async fn click(&self, selector: &Selector) -> SessionResult<()>;

    /// Type `text` into the element
    async fn fill(&self, selector: &Selector, text: &str) -> SessionResult<()>;

    /// Submit the form identified by `selector`
    async fn submit(&self, selector: &Selector) -> SessionResult<()>;

    /// Release the underlying browser resources
    async fn close(&self) -> SessionResult<()>;
}

/// Creates browser sessions on behalf of the engine's lifecycle policy
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn create(&self) -> SessionResult<Box<dyn BrowserSession>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_query_strings() {
        assert_eq!(Selector::id("login").to_query(), "#login");
        assert_eq!(
            Selector::Css("form input[type=text]".to_string()).to_query(),
            "form input[type=text]"
        );
    }

    #[test]
    fn test_wait_timeout_message_names_selector_and_bound() {
        let err = SessionError::WaitTimeout {
            selector: Selector::id("detalii_123"),
            timeout: Duration::from_secs(30),
        };
        assert_eq!(
            err.to_string(),
            "element #detalii_123 not visible within 30s"
        );
    }
}
