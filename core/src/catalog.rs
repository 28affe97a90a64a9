//! Upload listing for a user token.

use std::sync::Arc;
use std::time::Duration;

use crate::cache::TtlCache;
use crate::client::LogSource;
use crate::error::{PipelineError, TransportError};
use crate::model::LogId;

pub struct CatalogClient {
    source: Arc<dyn LogSource>,
    max_pages: u32,
    cache: TtlCache<String, Arc<Vec<LogId>>>,
}

impl CatalogClient {
    pub fn new(source: Arc<dyn LogSource>, max_pages: u32, ttl: Duration) -> Self {
        Self {
            source,
            max_pages: max_pages.max(1),
            // One entry per token; a handful of tokens at most
            cache: TtlCache::new(ttl, 16),
        }
    }

    /// All log ids uploaded under `token`, first listing page first.
    ///
    /// Served from cache within the TTL so new uploads show up eventually
    /// without manual invalidation.
    pub fn log_ids(&self, token: &str) -> Result<Arc<Vec<LogId>>, PipelineError> {
        self.cache
            .get_or_try_insert_with(&token.to_string(), || {
                self.list_uploads(token).map(Arc::new)
            })
            .map_err(PipelineError::RemoteUnavailable)
    }

    /// Drop the cached listing for `token`
    pub fn refresh(&self, token: &str) {
        self.cache.invalidate(&token.to_string());
    }

    fn list_uploads(&self, token: &str) -> Result<Vec<LogId>, TransportError> {
        let first = self.source.uploads_page(token, 1)?;
        let last_page = first.pages.min(self.max_pages);
        let mut ids: Vec<LogId> = first.uploads.into_iter().map(|u| u.id).collect();

        for page in 2..=last_page {
            let next = self.source.uploads_page(token, page)?;
            ids.extend(next.uploads.into_iter().map(|u| u.id));
        }

        tracing::debug!(pages = last_page.max(1), uploads = ids.len(), "Listed uploads");
        Ok(ids)
    }
}
