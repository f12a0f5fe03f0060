//! Browser-session boundary
//!
//! The monitor consumes the browser through the narrow [`BrowserSession`]
//! trait; [`web`] holds the Playwright-backed production implementation.

pub mod traits;
pub mod web;

pub use traits::{BrowserSession, Selector, SessionError, SessionFactory, SessionResult};
pub use web::{WebSession, WebSessionConfig, WebSessionFactory};
