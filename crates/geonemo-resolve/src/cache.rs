//! Load-once cache of feature indexes, keyed by file reference.
//!
//! Each key owns a [`OnceCell`]: concurrent requests for a file that is not
//! loaded yet wait on the same load instead of starting their own. A failed
//! load leaves the cell empty, so the next request retries it.

use geonemo_core::error::{GeonemoError, Result};
use geonemo_core::ports::FeatureSource;
use geonemo_geo::{build_index, FeatureIndex, IndexOptions};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::OnceCell;

type Slot = Arc<OnceCell<Arc<FeatureIndex>>>;

/// Cache of indexed files in front of a [`FeatureSource`]
pub struct FeatureCache<S> {
    source: S,
    options: IndexOptions,
    slots: Mutex<HashMap<String, Slot>>,
}

impl<S: FeatureSource> FeatureCache<S> {
    pub fn new(source: S, options: IndexOptions) -> Self {
        Self { source, options, slots: Mutex::new(HashMap::new()) }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn options(&self) -> IndexOptions {
        self.options
    }

    /// The index for `reference`, loading and indexing it on first use
    pub async fn get_or_load(&self, reference: &str) -> Result<Arc<FeatureIndex>> {
        let slot = self.slot(reference);

        let index = slot.get_or_try_init(|| self.load(reference)).await?;
        Ok(Arc::clone(index))
    }

    /// Whether `reference` is loaded
    pub fn contains(&self, reference: &str) -> bool {
        self.lock().get(reference).is_some_and(|slot| slot.initialized())
    }

    /// Number of loaded files
    pub fn len(&self) -> usize {
        self.lock().values().filter(|slot| slot.initialized()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forget every loaded file
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn slot(&self, reference: &str) -> Slot {
        Arc::clone(self.lock().entry(reference.to_string()).or_default())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Slot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn load(&self, reference: &str) -> Result<Arc<FeatureIndex>> {
        tracing::debug!("Loading {}", self.source.locate(reference));

        let geojson = self.source.load(reference).await?;

        let name = reference.to_string();
        let options = self.options;
        let index = tokio::task::spawn_blocking(move || build_index(name, geojson, options))
            .await
            .map_err(|e| GeonemoError::load(reference, format!("indexing task failed: {}", e)))?;

        Ok(Arc::new(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use geojson::GeoJson;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Serves one square per reference and counts loads
    #[derive(Default)]
    struct CountingSource {
        loads: AtomicUsize,
    }

    #[async_trait]
    impl FeatureSource for CountingSource {
        async fn load(&self, reference: &str) -> Result<GeoJson> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            if reference.contains("missing") {
                return Err(GeonemoError::load(reference, "not found"));
            }
            Ok(r#"{"type": "Polygon", "coordinates": [[[0, 0], [1, 0], [1, 1], [0, 0]]]}"#
                .parse()
                .unwrap())
        }
    }

    #[tokio::test]
    async fn test_second_request_hits_the_cache() {
        let cache = FeatureCache::new(CountingSource::default(), IndexOptions::default());

        let first = cache.get_or_load("a.geojson").await.unwrap();
        let second = cache.get_or_load("a.geojson").await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.source().loads.load(Ordering::SeqCst), 1);
        assert!(cache.contains("a.geojson"));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let cache = FeatureCache::new(CountingSource::default(), IndexOptions::default());

        assert!(cache.get_or_load("missing.geojson").await.is_err());
        assert!(cache.get_or_load("missing.geojson").await.is_err());

        assert_eq!(cache.source().loads.load(Ordering::SeqCst), 2);
        assert!(!cache.contains("missing.geojson"));
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_clear_forces_reload() {
        let cache = FeatureCache::new(CountingSource::default(), IndexOptions::default());

        cache.get_or_load("a.geojson").await.unwrap();
        cache.clear();
        cache.get_or_load("a.geojson").await.unwrap();

        assert_eq!(cache.source().loads.load(Ordering::SeqCst), 2);
    }
}
