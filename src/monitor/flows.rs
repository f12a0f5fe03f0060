//! The two fixed portal flows: sign-in and the debit availability check
//!
//! Each flow is a linear wait/act sequence against a [`BrowserSession`]. A
//! failed lookup or interaction is terminal for that flow only; it is caught
//! here and reported as a failed outcome, never propagated upwards.

use async_trait::async_trait;
use log::{debug, warn};
use std::time::Duration;

use crate::driver::{BrowserSession, Selector, SessionError};

/// Pages required by the monitor
pub const LOGIN_PAGE: &str = "https://www.ghiseul.ro/ghiseul/public/";
pub const DEBIT_PAGE: &str = "https://www.ghiseul.ro/ghiseul/public/debite";

// Login elements
const LOGIN_FORM: &str = "login";
const USERNAME_FIELD: &str = "username";
const PASSWORD_FIELD: &str = "passwordP";
const PASSWORD_TRIGGER: &str = "passwordT";

// Debit elements
const SHOW_BUTTON_PREFIX: &str = "showDebiteBtn_";
const PAY_FORM_PREFIX: &str = "detalii_";

/// Pause between form fills; the portal rejects inhumanly fast input
const FILL_DELAY: Duration = Duration::from_millis(500);

/// Outcome of one flow step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowOutcome {
    pub passed: bool,
    pub error: String,
}

impl FlowOutcome {
    pub fn success() -> Self {
        Self {
            passed: true,
            error: String::new(),
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            passed: false,
            error: error.into(),
        }
    }
}

/// A named, independently timed unit of work against a browser session
///
/// The engine iterates flows in configured order; every flow reports an
/// outcome even when an earlier one failed.
#[async_trait]
pub trait FlowStep: Send + Sync {
    /// Flow name as reported in the status snapshot
    fn name(&self) -> &'static str;

    async fn execute(&self, session: &dyn BrowserSession) -> FlowOutcome;
}

/// Signs in on the portal's public login page
///
/// The procedure:
/// 1. Visit the login page; a redirect means the stored cookies are still
///    valid, which counts as a successful sign-in.
/// 2. Wait for the form to render and locate the input fields.
/// 3. Fill in the username, click the decoy password element so the real
///    field becomes interactable, fill in the password.
/// 4. Submit the form.
pub struct SignInFlow {
    username: String,
    password: String,
    render_timeout: Duration,
}

impl SignInFlow {
    pub fn new(username: impl Into<String>, password: impl Into<String>, render_timeout: Duration) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            render_timeout,
        }
    }

    async fn locate_form(&self, session: &dyn BrowserSession) -> Result<(), SessionError> {
        session
            .wait_for_visible(&Selector::id(LOGIN_FORM), self.render_timeout)
            .await?;
        session.find(&Selector::id(USERNAME_FIELD)).await?;
        session.find(&Selector::id(PASSWORD_FIELD)).await?;
        session.find(&Selector::id(PASSWORD_TRIGGER)).await?;
        Ok(())
    }

    async fn fill_credentials(&self, session: &dyn BrowserSession) -> Result<(), SessionError> {
        let username = Selector::id(USERNAME_FIELD);
        session.click(&username).await?;
        session.fill(&username, &self.username).await?;
        tokio::time::sleep(FILL_DELAY).await;

        // The visible decoy must be clicked before the real password field
        // accepts input.
        let password = Selector::id(PASSWORD_FIELD);
        session.click(&Selector::id(PASSWORD_TRIGGER)).await?;
        session.click(&password).await?;
        session.fill(&password, &self.password).await?;
        tokio::time::sleep(FILL_DELAY).await;
        Ok(())
    }
}

#[async_trait]
impl FlowStep for SignInFlow {
    fn name(&self) -> &'static str {
        "login"
    }

    async fn execute(&self, session: &dyn BrowserSession) -> FlowOutcome {
        if let Err(e) = session.navigate(LOGIN_PAGE).await {
            warn!("Login page navigation failed: {}", e);
            return FlowOutcome::failure(e.to_string());
        }

        match session.current_url().await {
            Ok(url) if url != LOGIN_PAGE => {
                warn!(
                    "Redirected to {}, marking 'login' flow successful and skipping execution.",
                    url
                );
                return FlowOutcome::success();
            }
            Ok(_) => {}
            Err(e) => {
                warn!("Could not read current location: {}", e);
                return FlowOutcome::failure(e.to_string());
            }
        }

        if let Err(e) = self.locate_form(session).await {
            debug!("Login form lookup failed: {}", e);
            return FlowOutcome::failure("Could not find login form or input fields");
        }
        debug!("Found login form and input fields");

        if let Err(e) = self.fill_credentials(session).await {
            debug!("Login form fill failed: {}", e);
            return FlowOutcome::failure("Could not fill in login form");
        }
        debug!("Filled in login form");

        if let Err(e) = session.submit(&Selector::id(LOGIN_FORM)).await {
            debug!("Login form submit failed: {}", e);
            return FlowOutcome::failure("Could not submit login form");
        }
        debug!("Submitted login form");

        FlowOutcome::success()
    }
}

/// Checks that amounts due can be shown and paid for one institution
///
/// The procedure after sign-in:
/// 1. Visit the debit page if not already there.
/// 2. Wait for the institution accordion to render.
/// 3. Wait for the "show amounts due" control and click it.
/// 4. Wait for the payment control to render.
///
/// A visible payment control means the portal's backend payment link is
/// reachable, which is the signal this monitor exists for.
pub struct DebitCheckFlow {
    institution: String,
    render_timeout: Duration,
}

impl DebitCheckFlow {
    pub fn new(institution: impl Into<String>, render_timeout: Duration) -> Self {
        Self {
            institution: institution.into(),
            render_timeout,
        }
    }

    fn accordion(&self) -> Selector {
        Selector::id(self.institution.as_str())
    }

    fn show_button(&self) -> Selector {
        Selector::id(format!("{}{}", SHOW_BUTTON_PREFIX, self.institution))
    }

    fn pay_form(&self) -> Selector {
        Selector::id(format!("{}{}", PAY_FORM_PREFIX, self.institution))
    }

    async fn reveal_amounts(&self, session: &dyn BrowserSession) -> Result<(), SessionError> {
        let show = self.show_button();
        session.wait_for_visible(&show, self.render_timeout).await?;
        session.click(&show).await?;
        Ok(())
    }
}

#[async_trait]
impl FlowStep for DebitCheckFlow {
    fn name(&self) -> &'static str {
        "debit"
    }

    async fn execute(&self, session: &dyn BrowserSession) -> FlowOutcome {
        match session.current_url().await {
            Ok(url) if url == DEBIT_PAGE => {}
            Ok(_) => {
                if let Err(e) = session.navigate(DEBIT_PAGE).await {
                    warn!("Debit page navigation failed: {}", e);
                    return FlowOutcome::failure(e.to_string());
                }
            }
            Err(e) => {
                warn!("Could not read current location: {}", e);
                return FlowOutcome::failure(e.to_string());
            }
        }

        if let Err(e) = session
            .wait_for_visible(&self.accordion(), self.render_timeout)
            .await
        {
            debug!("Institution accordion lookup failed: {}", e);
            return FlowOutcome::failure("Could not find institution element");
        }
        debug!("Found institution element");

        if let Err(e) = self.reveal_amounts(session).await {
            debug!("Show button lookup failed: {}", e);
            return FlowOutcome::failure("Could not find show button for institution");
        }
        debug!("Clicked institution show button");

        if let Err(e) = session
            .wait_for_visible(&self.pay_form(), self.render_timeout)
            .await
        {
            debug!("Pay button lookup failed: {}", e);
            return FlowOutcome::failure("Could not find pay button for institution");
        }
        debug!("Found institution pay button");

        FlowOutcome::success()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::SessionResult;
    use std::collections::HashSet;
    use std::sync::Mutex;

    const TIMEOUT: Duration = Duration::from_millis(10);

    /// Scripted browser session; records every operation it serves
    #[derive(Default)]
    struct MockSession {
        /// URL reported after a navigation; defaults to the navigated URL
        redirect_to: Option<String>,
        /// Selector queries that exist and become visible
        present: HashSet<String>,
        /// Actions ("click #id", "fill #id", ...) that fail when attempted
        failing: HashSet<String>,
        current_url: Mutex<String>,
        log: Mutex<Vec<String>>,
    }

    impl MockSession {
        fn with_elements(ids: &[&str]) -> Self {
            Self {
                present: ids.iter().map(|id| format!("#{}", id)).collect(),
                ..Default::default()
            }
        }

        fn failing_on(mut self, action: &str) -> Self {
            self.failing.insert(action.to_string());
            self
        }

        fn log(&self, entry: String) {
            self.log.lock().unwrap().push(entry);
        }

        fn actions(&self) -> Vec<String> {
            self.log.lock().unwrap().clone()
        }

        fn check(&self, action: &str, selector: &Selector) -> SessionResult<()> {
            let entry = format!("{} {}", action, selector);
            self.log(entry.clone());
            if self.failing.contains(&entry) {
                return Err(SessionError::Interaction {
                    selector: selector.clone(),
                    action: "mock",
                    reason: "scripted failure".to_string(),
                });
            }
            Ok(())
        }
    }

    #[async_trait]
    impl BrowserSession for MockSession {
        async fn navigate(&self, url: &str) -> SessionResult<()> {
            self.log(format!("navigate {}", url));
            let landed = self.redirect_to.clone().unwrap_or_else(|| url.to_string());
            *self.current_url.lock().unwrap() = landed;
            Ok(())
        }

        async fn current_url(&self) -> SessionResult<String> {
            Ok(self.current_url.lock().unwrap().clone())
        }

        async fn wait_for_visible(
            &self,
            selector: &Selector,
            timeout: Duration,
        ) -> SessionResult<()> {
            self.log(format!("wait {}", selector));
            if self.present.contains(&selector.to_query()) {
                Ok(())
            } else {
                Err(SessionError::WaitTimeout {
                    selector: selector.clone(),
                    timeout,
                })
            }
        }

        async fn find(&self, selector: &Selector) -> SessionResult<()> {
            self.log(format!("find {}", selector));
            if self.present.contains(&selector.to_query()) {
                Ok(())
            } else {
                Err(SessionError::NotFound(selector.clone()))
            }
        }

        async fn click(&self, selector: &Selector) -> SessionResult<()> {
            self.check("click", selector)
        }

        async fn fill(&self, selector: &Selector, _text: &str) -> SessionResult<()> {
            self.check("fill", selector)
        }

        async fn submit(&self, selector: &Selector) -> SessionResult<()> {
            self.check("submit", selector)
        }

        async fn close(&self) -> SessionResult<()> {
            self.log("close".to_string());
            Ok(())
        }
    }

    fn sign_in() -> SignInFlow {
        SignInFlow::new("user", "secret", TIMEOUT)
    }

    fn login_elements() -> MockSession {
        MockSession::with_elements(&["login", "username", "passwordP", "passwordT"])
    }

    #[tokio::test]
    async fn test_sign_in_short_circuits_when_already_authenticated() {
        let session = MockSession {
            redirect_to: Some("https://www.ghiseul.ro/ghiseul/user/home".to_string()),
            ..Default::default()
        };

        let outcome = sign_in().execute(&session).await;

        assert!(outcome.passed);
        assert_eq!(outcome.error, "");
        // No element lookup is attempted after the redirect.
        assert!(!session.actions().iter().any(|a| a.starts_with("wait")));
        assert!(!session.actions().iter().any(|a| a.starts_with("find")));
    }

    #[tokio::test]
    async fn test_sign_in_reports_missing_form() {
        let session = MockSession::default();

        let outcome = sign_in().execute(&session).await;

        assert!(!outcome.passed);
        assert_eq!(outcome.error, "Could not find login form or input fields");
    }

    #[tokio::test]
    async fn test_sign_in_reports_missing_input_field() {
        // The form renders but one input is absent.
        let session = MockSession::with_elements(&["login", "username", "passwordT"]);

        let outcome = sign_in().execute(&session).await;

        assert!(!outcome.passed);
        assert_eq!(outcome.error, "Could not find login form or input fields");
    }

    #[tokio::test]
    async fn test_sign_in_reports_fill_failure() {
        let session = login_elements().failing_on("fill #username");

        let outcome = sign_in().execute(&session).await;

        assert!(!outcome.passed);
        assert_eq!(outcome.error, "Could not fill in login form");
    }

    #[tokio::test]
    async fn test_sign_in_reports_submit_failure() {
        let session = login_elements().failing_on("submit #login");

        let outcome = sign_in().execute(&session).await;

        assert!(!outcome.passed);
        assert_eq!(outcome.error, "Could not submit login form");
    }

    #[tokio::test]
    async fn test_sign_in_fills_in_expected_order() {
        let session = login_elements();

        let outcome = sign_in().execute(&session).await;

        assert!(outcome.passed);
        let interactions: Vec<String> = session
            .actions()
            .into_iter()
            .filter(|a| !a.starts_with("wait") && !a.starts_with("find"))
            .collect();
        assert_eq!(
            interactions,
            [
                "navigate https://www.ghiseul.ro/ghiseul/public/",
                "click #username",
                "fill #username",
                "click #passwordT",
                "click #passwordP",
                "fill #passwordP",
                "submit #login",
            ]
        );
    }

    fn debit_check() -> DebitCheckFlow {
        DebitCheckFlow::new("123", TIMEOUT)
    }

    #[tokio::test]
    async fn test_debit_check_reports_missing_institution() {
        let session = MockSession::default();

        let outcome = debit_check().execute(&session).await;

        assert!(!outcome.passed);
        assert_eq!(outcome.error, "Could not find institution element");
    }

    #[tokio::test]
    async fn test_debit_check_reports_missing_show_button() {
        let session = MockSession::with_elements(&["123"]);

        let outcome = debit_check().execute(&session).await;

        assert!(!outcome.passed);
        assert_eq!(outcome.error, "Could not find show button for institution");
    }

    #[tokio::test]
    async fn test_debit_check_reports_missing_pay_button() {
        let session = MockSession::with_elements(&["123", "showDebiteBtn_123"]);

        let outcome = debit_check().execute(&session).await;

        assert!(!outcome.passed);
        assert_eq!(outcome.error, "Could not find pay button for institution");
    }

    #[tokio::test]
    async fn test_debit_check_passes_when_pay_button_renders() {
        let session = MockSession::with_elements(&["123", "showDebiteBtn_123", "detalii_123"]);

        let outcome = debit_check().execute(&session).await;

        assert!(outcome.passed);
        assert_eq!(outcome.error, "");
        assert!(session
            .actions()
            .contains(&"click #showDebiteBtn_123".to_string()));
    }

    #[tokio::test]
    async fn test_debit_check_navigates_only_when_needed() {
        let session = MockSession::with_elements(&["123", "showDebiteBtn_123", "detalii_123"]);
        *session.current_url.lock().unwrap() = DEBIT_PAGE.to_string();

        debit_check().execute(&session).await;

        assert!(!session
            .actions()
            .iter()
            .any(|a| a.starts_with("navigate")));
    }
}
