//! Browser-session lifecycle policy
//!
//! Consolidates the persistent/ephemeral decision behind one object so the
//! engine loop calls `acquire`/`release` the same way in both modes.

use log::{debug, warn};

use crate::driver::{BrowserSession, SessionError, SessionFactory};

/// How long a browser session lives relative to monitor cycles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecyclePolicy {
    /// One session created before the first cycle, reused until shutdown
    Persistent,
    /// A fresh session per cycle, closed before the inter-cycle sleep
    Ephemeral,
}

/// Owns the active session on behalf of the engine
///
/// Only the engine task touches the session, so no locking is needed around
/// it.
pub struct SessionLifecycle {
    policy: LifecyclePolicy,
    factory: Box<dyn SessionFactory>,
    active: Option<Box<dyn BrowserSession>>,
}

impl SessionLifecycle {
    pub fn new(policy: LifecyclePolicy, factory: Box<dyn SessionFactory>) -> Self {
        Self {
            policy,
            factory,
            active: None,
        }
    }

    /// Session for the coming cycle, created through the factory on demand
    pub async fn acquire(&mut self) -> Result<&dyn BrowserSession, SessionError> {
        if self.active.is_none() {
            debug!("Creating browser session");
            let session = self.factory.create().await?;
            self.active = Some(session);
        }
        // The slot was filled above if it was empty.
        Ok(self.active.as_deref().expect("active session present"))
    }

    /// End-of-cycle hook; closes the session in ephemeral mode
    pub async fn release(&mut self) {
        if self.policy == LifecyclePolicy::Ephemeral {
            self.close_active().await;
        }
    }

    /// Close any active session; safe to call repeatedly
    pub async fn shutdown(&mut self) {
        self.close_active().await;
    }

    async fn close_active(&mut self) {
        if let Some(session) = self.active.take() {
            debug!("Closing browser session");
            if let Err(e) = session.close().await {
                warn!("Failed to close browser session: {}", e);
            }
        }
    }
}
