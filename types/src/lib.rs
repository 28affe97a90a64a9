//! Shared types for fightstats.
//!
//! Kept free of heavy dependencies so that any consumer of the pipeline
//! (CLI, future UIs) can depend on it without pulling in Arrow or HTTP.

pub mod category;
pub mod config;

pub use category::{GroupBy, ParseEnumError, StatCategory};
pub use config::{
    AppConfig, CacheConfig, DisplayConfig, RemoteConfig, RetryConfig, WorkerConfig,
};
