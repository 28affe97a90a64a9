pub mod batch;
pub mod boons;
pub mod cache;
pub mod catalog;
pub mod client;
pub mod config;
pub mod error;
pub mod export;
pub mod fetcher;
pub mod filter;
pub mod keys;
pub mod model;
pub mod normalize;
pub mod pipeline;
pub mod query;
pub mod table;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports for convenience
pub use batch::{BatchProgress, NoProgress, ProgressSink};
pub use client::{DpsReportClient, LogSource, UploadsPage};
pub use config::{ConfigError, TokenRegistry, load_config};
pub use error::{FetchError, FightInvalid, PipelineError, TableError, TransportError};
pub use export::{ExportError, write_parquet};
pub use filter::{FilterError, FilterOptions, FilterParams, filter_data};
pub use model::{LogId, PlayerIdentity, PlayerRow, RowSet};
pub use pipeline::{BatchSummary, Pipeline};
pub use query::{GroupMean, GroupQuery, QueryError};
pub use table::StatTable;

pub use fightstats_types::{AppConfig, GroupBy, StatCategory};
