//! Monitor engine
//!
//! Drives the ordered flow steps against a browser session, assembles one
//! status snapshot per cycle and publishes it to the snapshot store. The
//! refresh loop sleeps between cycles and reacts to the shutdown signal
//! instead of spinning.

use log::{error, info};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;

use crate::driver::SessionFactory;
use crate::monitor::flows::{DebitCheckFlow, FlowStep, SignInFlow};
use crate::monitor::lifecycle::{LifecyclePolicy, SessionLifecycle};
use crate::monitor::snapshot::{SnapshotStore, StatusSnapshot};

/// Immutable engine configuration captured at startup
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub username: String,
    pub password: String,
    /// Institution id whose payment availability is checked
    pub institution: String,
    /// Upper bound for every element wait
    pub render_timeout: Duration,
    /// Keep one browser session across cycles instead of one per cycle
    pub persistent_session: bool,
}

/// Executes the fixed flow sequence and publishes the latest snapshot
pub struct MonitorEngine {
    config: MonitorConfig,
    flows: Vec<Box<dyn FlowStep>>,
    lifecycle: SessionLifecycle,
    store: Arc<SnapshotStore>,
}

impl MonitorEngine {
    /// Engine with the fixed portal flow sequence: sign-in, then debit check
    pub fn new(
        config: MonitorConfig,
        factory: Box<dyn SessionFactory>,
        store: Arc<SnapshotStore>,
    ) -> Self {
        let flows: Vec<Box<dyn FlowStep>> = vec![
            Box::new(SignInFlow::new(
                config.username.clone(),
                config.password.clone(),
                config.render_timeout,
            )),
            Box::new(DebitCheckFlow::new(
                config.institution.clone(),
                config.render_timeout,
            )),
        ];
        let policy = if config.persistent_session {
            LifecyclePolicy::Persistent
        } else {
            LifecyclePolicy::Ephemeral
        };
        Self {
            config,
            flows,
            lifecycle: SessionLifecycle::new(policy, factory),
            store,
        }
    }

    /// Run cycles every `refresh` until the shutdown signal flips
    ///
    /// Publishes a snapshot after every cycle and closes the active browser
    /// session before returning.
    pub async fn run(&mut self, refresh: Duration, mut shutdown: watch::Receiver<bool>) {
        info!(
            "Starting ghiseul.ro monitor {} persistent driver, institution={}, refresh={}m",
            if self.config.persistent_session {
                "with"
            } else {
                "without"
            },
            self.config.institution,
            refresh.as_secs() / 60
        );

        let mut iteration: u64 = 0;
        loop {
            if *shutdown.borrow() {
                break;
            }

            info!("Starting iteration {}...", iteration);
            let snapshot = self.execute_cycle().await;
            self.store.publish(snapshot);
            self.lifecycle.release().await;
            info!(
                "Finished iteration {}, sleeping for {}m",
                iteration,
                refresh.as_secs() / 60
            );
            iteration += 1;

            tokio::select! {
                _ = tokio::time::sleep(refresh) => {}
                _ = shutdown.changed() => {}
            }
        }

        self.shutdown().await;
    }

    /// Execute every configured flow once and assemble the cycle snapshot
    ///
    /// Flows run in configured order and a failure never skips the flows
    /// after it; the snapshot always carries one entry per configured flow.
    pub async fn execute_cycle(&mut self) -> StatusSnapshot {
        let mut snapshot = StatusSnapshot::begin();

        let session = match self.lifecycle.acquire().await {
            Ok(session) => session,
            Err(e) => {
                error!("Could not create browser session: {}", e);
                let message = format!("Browser session unavailable: {}", e);
                for flow in &self.flows {
                    snapshot.record(flow.name(), false, &message, Duration::ZERO);
                }
                return snapshot;
            }
        };

        for flow in &self.flows {
            info!("Starting '{}' flow.", flow.name());
            let timer = Instant::now();
            let outcome = flow.execute(session).await;
            let elapsed = timer.elapsed();
            info!(
                "Flow '{}' finished: status={}, duration={:.2}s",
                flow.name(),
                if outcome.passed { "success" } else { "fail" },
                elapsed.as_secs_f64()
            );
            snapshot.record(flow.name(), outcome.passed, &outcome.error, elapsed);
        }

        info!(
            "Main flow finished: success={}, duration={}s, error={:?}",
            snapshot.success(),
            snapshot.duration(),
            snapshot.error()
        );
        snapshot
    }

    /// Close the active browser session; safe to call more than once
    pub async fn shutdown(&mut self) {
        self.lifecycle.shutdown().await;
    }
}
