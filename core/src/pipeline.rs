//! Entry points: token -> assembled table, table -> filtered table.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::batch::{BatchRunner, ProgressSink};
use crate::cache::{LogCache, TtlCache};
use crate::catalog::CatalogClient;
use crate::client::LogSource;
use crate::error::{FetchError, PipelineError};
use crate::fetcher::{LogFetcher, Slot};
use crate::normalize::Normalizer;
use crate::table::StatTable;
use fightstats_types::{AppConfig, StatCategory};

pub use crate::filter::filter_data;

/// Owns every cache for the lifetime of the process. Build once and share.
pub struct Pipeline {
    catalog: CatalogClient,
    fetcher: LogFetcher,
    runner: BatchRunner,
    datasets: TtlCache<(String, StatCategory), StatTable>,
}

/// Per-outcome counts of one batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub ok: usize,
    pub invalid: usize,
    pub failed: usize,
}

impl BatchSummary {
    pub fn from_slots(slots: &[Slot]) -> Self {
        let mut summary = Self::default();
        for slot in slots {
            match slot {
                Ok(_) => summary.ok += 1,
                Err(FetchError::Invalid { .. }) => summary.invalid += 1,
                Err(_) => summary.failed += 1,
            }
        }
        summary
    }
}

impl Pipeline {
    pub fn new(config: AppConfig, source: Arc<dyn LogSource>) -> Self {
        let log_cache = Arc::new(LogCache::new(config.cache.log_cache_capacity));
        let normalizer = Normalizer::new(config.display.clone());
        Self {
            catalog: CatalogClient::new(
                source.clone(),
                config.remote.max_catalog_pages,
                Duration::from_secs(config.cache.catalog_ttl_secs),
            ),
            fetcher: LogFetcher::new(source, normalizer, log_cache),
            runner: BatchRunner::new(&config.workers),
            datasets: TtlCache::new(
                Duration::from_secs(config.cache.dataset_ttl_secs),
                config.cache.dataset_cache_entries,
            ),
        }
    }

    /// Every fight uploaded under `token`, projected for `category`.
    ///
    /// Only a failed upload listing is an error. Logs that fail to download
    /// or do not describe a usable fight are left out.
    pub fn fetch_data(
        &self,
        token: &str,
        category: StatCategory,
        progress: &dyn ProgressSink,
    ) -> Result<StatTable, PipelineError> {
        self.datasets
            .get_or_try_insert_with(&(token.to_string(), category), || {
                self.build_dataset(token, category, progress)
            })
    }

    /// Forget the cached listing and datasets for `token` so the next fetch
    /// sees new uploads immediately. Per-log results stay cached.
    pub fn refresh(&self, token: &str) {
        self.catalog.refresh(token);
        for category in StatCategory::ALL {
            self.datasets.invalidate(&(token.to_string(), category));
        }
    }

    fn build_dataset(
        &self,
        token: &str,
        category: StatCategory,
        progress: &dyn ProgressSink,
    ) -> Result<StatTable, PipelineError> {
        let started = Instant::now();
        let ids = self.catalog.log_ids(token)?;
        let slots = self.runner.run(&ids, |id| self.fetcher.fetch(id), progress);

        let summary = BatchSummary::from_slots(&slots);
        let table = StatTable::assemble(&slots, category)?;
        tracing::info!(
            logs = ids.len(),
            ok = summary.ok,
            invalid = summary.invalid,
            failed = summary.failed,
            rows = table.num_rows(),
            category = %category,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Fetched dataset"
        );
        Ok(table)
    }
}
