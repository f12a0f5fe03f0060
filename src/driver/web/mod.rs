pub mod driver;

pub use driver::{WebSession, WebSessionConfig, WebSessionFactory};
