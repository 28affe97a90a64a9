//! Per-log download and normalization.

use std::sync::Arc;

use crate::cache::{CachedLog, LogCache};
use crate::client::LogSource;
use crate::error::FetchError;
use crate::model::{LogId, RowSet};
use crate::normalize::Normalizer;

/// Result stored in one batch slot
pub type Slot = Result<Arc<RowSet>, FetchError>;

pub struct LogFetcher {
    source: Arc<dyn LogSource>,
    normalizer: Normalizer,
    cache: Arc<LogCache>,
}

impl LogFetcher {
    pub fn new(source: Arc<dyn LogSource>, normalizer: Normalizer, cache: Arc<LogCache>) -> Self {
        Self {
            source,
            normalizer,
            cache,
        }
    }

    /// Rows for one log. Never panics on bad input and never propagates
    /// beyond its own slot: failures come back as `Err` and are logged here.
    pub fn fetch(&self, id: &LogId) -> Slot {
        if let Some(cached) = self.cache.get(id) {
            return into_slot(id, cached);
        }

        let payload = match self.source.log_json(id) {
            Ok(payload) => payload,
            Err(source) => {
                tracing::warn!(log_id = %id, error = %source, "Could not download log");
                return Err(FetchError::Transport {
                    log_id: id.clone(),
                    source,
                });
            }
        };

        let outcome: CachedLog = match self.normalizer.normalize(&payload, id) {
            Ok(rows) => Ok(Arc::new(rows)),
            Err(invalid) => {
                tracing::warn!(log_id = %id, reason = %invalid, "Skipping invalid fight");
                Err(invalid)
            }
        };
        self.cache.insert(id.clone(), outcome.clone());
        into_slot(id, outcome)
    }
}

fn into_slot(id: &LogId, cached: CachedLog) -> Slot {
    cached.map_err(|source| FetchError::Invalid {
        log_id: id.clone(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FightInvalid;
    use crate::testing::{FakeSource, fight_payload, squad_payload, transport_failure};

    fn fetcher(source: FakeSource) -> (Arc<FakeSource>, Arc<LogCache>, LogFetcher) {
        let source = Arc::new(source);
        let cache = Arc::new(LogCache::new(500));
        let fetcher = LogFetcher::new(source.clone(), Normalizer::default(), cache.clone());
        (source, cache, fetcher)
    }

    #[test]
    fn test_second_fetch_hits_cache() {
        let source = FakeSource::new().with_log("l1", Ok(squad_payload("2024-03-10 20:00:00 +00:00", "p", 2)));
        let (source, _, fetcher) = fetcher(source);

        let first = fetcher.fetch(&LogId::from("l1")).unwrap();
        let second = fetcher.fetch(&LogId::from("l1")).unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(first, second);
        assert_eq!(source.log_calls(), 1);
    }

    #[test]
    fn test_transport_failure_is_not_cached() {
        let source = FakeSource::new().with_log("l1", Err(transport_failure("l1")));
        let (source, cache, fetcher) = fetcher(source);

        let err = fetcher.fetch(&LogId::from("l1")).unwrap_err();
        assert!(matches!(err, FetchError::Transport { .. }));
        assert!(cache.is_empty());

        fetcher.fetch(&LogId::from("l1")).unwrap_err();
        assert_eq!(source.log_calls(), 2);
    }

    #[test]
    fn test_invalid_fight_is_cached() {
        let source = FakeSource::new().with_log("l1", Ok(fight_payload("2024-03-10 20:00:00 +00:00", 0, vec![])));
        let (source, _, fetcher) = fetcher(source);

        for _ in 0..2 {
            let err = fetcher.fetch(&LogId::from("l1")).unwrap_err();
            assert_eq!(
                err,
                FetchError::Invalid {
                    log_id: LogId::from("l1"),
                    source: FightInvalid::ZeroDuration
                }
            );
        }
        assert_eq!(source.log_calls(), 1);
    }
}
