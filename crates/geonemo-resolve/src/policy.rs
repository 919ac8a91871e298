//! Group resolution policy: one winner per group.
//!
//! Every file of a group is loaded through the shared [`FeatureCache`]; the
//! indexes that loaded form one pool in file order, and the membership
//! resolver picks the winner over that pool. Files that fail to load are
//! recorded on the outcome and otherwise ignored. Groups never affect each
//! other: each is resolved in its own task, and a task that fails turns into
//! an `error` outcome for that group alone.

use futures::future::join_all;
use geonemo_core::models::{
    DistanceMetric, GroupCatalog, GroupDefinition, GroupOutcome, LoadFailure, Point,
};
use geonemo_core::ports::FeatureSource;
use geonemo_geo::{IndexOptions, MembershipResolver};
use std::sync::Arc;

use crate::cache::FeatureCache;

struct Inner<S> {
    cache: FeatureCache<S>,
    resolver: MembershipResolver,
}

/// Resolves groups of files against query points
///
/// Cloning is cheap and clones share the cache.
pub struct GroupResolver<S> {
    inner: Arc<Inner<S>>,
}

impl<S> Clone for GroupResolver<S> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<S: FeatureSource + 'static> GroupResolver<S> {
    /// Create a resolver; `options.metric` is used for distances too
    pub fn new(source: S, options: IndexOptions) -> Self {
        Self {
            inner: Arc::new(Inner {
                cache: FeatureCache::new(source, options),
                resolver: MembershipResolver::new(options.metric),
            }),
        }
    }

    pub fn cache(&self) -> &FeatureCache<S> {
        &self.inner.cache
    }

    pub fn metric(&self) -> DistanceMetric {
        self.inner.resolver.metric()
    }

    /// Resolve one group against one point
    ///
    /// An invalid group definition yields an `error` outcome. A group with no
    /// loadable file yields `none`.
    pub async fn resolve_group(&self, group: &GroupDefinition, point: &Point) -> GroupOutcome {
        let name = group.display_name().to_string();

        if let Err(e) = group.validate() {
            tracing::warn!("Group '{}' cannot be resolved: {}", group.id, e);
            return GroupOutcome::error(&group.id, name, e.to_string());
        }

        let files: Vec<&String> = group.files.iter().filter(|f| !f.trim().is_empty()).collect();
        let loads = join_all(files.iter().map(|file| self.inner.cache.get_or_load(file))).await;

        let mut pool = Vec::with_capacity(loads.len());
        let mut failures = Vec::new();
        for (file, loaded) in files.into_iter().zip(loads) {
            match loaded {
                Ok(index) => pool.push(index),
                Err(e) => {
                    tracing::warn!("Group '{}': skipping {}: {}", group.id, file, e);
                    failures.push(LoadFailure { reference: file.clone(), reason: e.to_string() });
                }
            }
        }

        let resolution = self.inner.resolver.resolve_point(point, &pool);
        tracing::debug!(
            "Group '{}': {} over {} file(s) ({} bbox hits, {} exact tests, {} perimeter scans, {} pruned)",
            group.id,
            resolution.membership.status(),
            pool.len(),
            resolution.stats.bbox_hits,
            resolution.stats.exact_tests,
            resolution.stats.perimeter_scans,
            resolution.stats.pruned
        );

        GroupOutcome::new(&group.id, name, resolution.membership).with_load_failures(failures)
    }

    /// Resolve every enabled group of the catalog, in catalog order
    pub async fn resolve_all_groups(&self, catalog: &GroupCatalog, point: &Point) -> Vec<GroupOutcome> {
        let tasks: Vec<_> = catalog
            .enabled()
            .map(|group| {
                let resolver = self.clone();
                let owned = group.clone();
                let point = *point;
                let handle =
                    tokio::spawn(async move { resolver.resolve_group(&owned, &point).await });
                (group.id.clone(), group.display_name().to_string(), handle)
            })
            .collect();

        let mut outcomes = Vec::with_capacity(tasks.len());
        for (id, name, handle) in tasks {
            match handle.await {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    tracing::error!("Resolution of group '{}' failed: {}", id, e);
                    outcomes.push(GroupOutcome::error(id, name, format!("resolution failed: {}", e)));
                }
            }
        }

        outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use geojson::GeoJson;
    use geonemo_core::error::{GeonemoError, Result};
    use geonemo_core::models::Status;

    /// Serves a 20x20 square at the origin for every reference except `bad*`
    struct SquareSource;

    #[async_trait]
    impl FeatureSource for SquareSource {
        async fn load(&self, reference: &str) -> Result<GeoJson> {
            if reference.starts_with("bad") {
                return Err(GeonemoError::load(reference, "unreachable"));
            }
            Ok(r#"{"type": "Feature", "properties": {"nombre": "Cuadrado"},
                   "geometry": {"type": "Polygon",
                   "coordinates": [[[-10, -10], [10, -10], [10, 10], [-10, 10], [-10, -10]]]}}"#
                .parse()
                .unwrap())
        }
    }

    fn resolver() -> GroupResolver<SquareSource> {
        let options = IndexOptions { metric: DistanceMetric::Planar, compute_area: false };
        GroupResolver::new(SquareSource, options)
    }

    #[tokio::test]
    async fn test_invalid_pick_is_an_error_outcome() {
        let group = GroupDefinition::new("g", vec!["a.geojson".into()]).with_pick("largest");
        let outcome = resolver().resolve_group(&group, &Point::new(0.0, 0.0).unwrap()).await;

        assert_eq!(outcome.status(), Status::Error);
    }

    #[tokio::test]
    async fn test_failed_files_are_recorded() {
        let group = GroupDefinition::new("g", vec!["bad.geojson".into(), "a.geojson".into()]);
        let outcome = resolver().resolve_group(&group, &Point::new(0.0, 0.0).unwrap()).await;

        assert_eq!(outcome.status(), Status::Inside);
        assert_eq!(outcome.load_failures.len(), 1);
        assert_eq!(outcome.load_failures[0].reference, "bad.geojson");
    }

    #[tokio::test]
    async fn test_only_failed_files_is_none() {
        let group = GroupDefinition::new("g", vec!["bad.geojson".into()]).with_label("Grupo");
        let outcome = resolver().resolve_group(&group, &Point::new(0.0, 0.0).unwrap()).await;

        assert_eq!(outcome.status(), Status::None);
        assert_eq!(outcome.group_name, "Grupo");
        assert!(outcome.feature().is_none());
    }
}
