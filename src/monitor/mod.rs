//! Monitor execution engine
//!
//! Owns the ordered flow steps, the browser-session lifecycle and the
//! refresh loop; publishes one status snapshot per cycle.

pub mod engine;
pub mod flows;
pub mod lifecycle;
pub mod snapshot;

pub use engine::{MonitorConfig, MonitorEngine};
pub use flows::{DebitCheckFlow, FlowOutcome, FlowStep, SignInFlow};
pub use lifecycle::{LifecyclePolicy, SessionLifecycle};
pub use snapshot::{SnapshotStore, StatusSnapshot};
