//! Membership resolution of one point against a pool of indexed features.
//!
//! Two passes over the pool, in pool order then entry order:
//!
//! 1. Inside pass. Entries whose bounding box contains the point are tested
//!    exactly; the first hit wins and ends the search.
//! 2. Nearest pass. Without an inside hit, every entry's perimeter distance is
//!    measured and the smallest wins. Once a minimum is known, entries whose
//!    padded bounding box cannot hold anything closer are skipped.
//!
//! Ties go to the entry found first in both passes. A feature whose geometry
//! fails a test is logged and skipped; it never aborts the scan.

use std::borrow::Borrow;

use geo::Coord;
use geonemo_core::models::{BoundingBox, DistanceMetric, Membership, Point};

use crate::containment::point_in_polygon;
use crate::error::GeometryError;
use crate::index::{FeatureIndex, IndexEntry};
use crate::primitives::{bearing, distance_to_perimeter, PerimeterHit, METERS_PER_DEGREE};

/// Safety factor on the degree padding used to skip far entries
const GEODESIC_PAD_SLACK: f64 = 1.5;

/// Latitude beyond which geodesic pruning is disabled
const PRUNE_LAT_LIMIT: f64 = 89.0;

/// Counters describing how much work a resolution did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    /// Entries whose bounding box contained the point
    pub bbox_hits: usize,
    /// Exact point-in-polygon tests run
    pub exact_tests: usize,
    /// Perimeter distances computed
    pub perimeter_scans: usize,
    /// Entries skipped by the padded bounding box check
    pub pruned: usize,
    /// Features skipped because their geometry failed a test
    pub geometry_errors: usize,
}

/// Result of resolving one point
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub membership: Membership,
    pub stats: ScanStats,
}

/// Resolves a point against a pool of feature indexes
#[derive(Debug, Clone, Copy, Default)]
pub struct MembershipResolver {
    metric: DistanceMetric,
}

impl MembershipResolver {
    pub fn new(metric: DistanceMetric) -> Self {
        Self { metric }
    }

    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    /// Find the winning feature for `point` across `pool`
    ///
    /// The pool is the concatenation of every index, in the order given.
    /// An empty pool, or one where every feature fails, resolves to
    /// [`Membership::None`].
    pub fn resolve_point<I: Borrow<FeatureIndex>>(&self, point: &Point, pool: &[I]) -> Resolution {
        let mut stats = ScanStats::default();

        if let Some(membership) = self.inside_pass(point, pool, &mut stats) {
            return Resolution { membership, stats };
        }

        let membership = self.nearest_pass(point, pool, &mut stats);
        Resolution { membership, stats }
    }

    fn inside_pass<I: Borrow<FeatureIndex>>(
        &self,
        point: &Point,
        pool: &[I],
        stats: &mut ScanStats,
    ) -> Option<Membership> {
        for index in pool {
            let index: &FeatureIndex = index.borrow();
            for slot in index.candidates_at(point) {
                stats.bbox_hits += 1;
                let entry = &index.entries()[slot];

                stats.exact_tests += 1;
                match point_in_polygon(point, &entry.geometry) {
                    Ok(true) => {}
                    Ok(false) => continue,
                    Err(e) => {
                        skip_feature(index, entry, &e, stats);
                        continue;
                    }
                }

                stats.perimeter_scans += 1;
                match distance_to_perimeter(&entry.geometry, point, self.metric) {
                    Ok(hit) => {
                        return Some(Membership::Inside {
                            feature: entry.to_match(index.source()),
                            border_distance: hit.distance,
                        });
                    }
                    Err(e) => skip_feature(index, entry, &e, stats),
                }
            }
        }

        None
    }

    fn nearest_pass<I: Borrow<FeatureIndex>>(
        &self,
        point: &Point,
        pool: &[I],
        stats: &mut ScanStats,
    ) -> Membership {
        let mut best: Option<(&FeatureIndex, &IndexEntry, PerimeterHit)> = None;

        for index in pool {
            let index: &FeatureIndex = index.borrow();
            for entry in index.entries() {
                if let Some((_, _, hit)) = &best {
                    if !self.could_beat(&entry.bbox, point, hit.distance) {
                        stats.pruned += 1;
                        continue;
                    }
                }

                stats.perimeter_scans += 1;
                match distance_to_perimeter(&entry.geometry, point, self.metric) {
                    Ok(hit) => {
                        if best.as_ref().map_or(true, |(_, _, b)| hit.distance < b.distance) {
                            best = Some((index, entry, hit));
                        }
                    }
                    Err(e) => skip_feature(index, entry, &e, stats),
                }
            }
        }

        match best {
            Some((index, entry, hit)) => Membership::NearestPerimeter {
                feature: entry.to_match(index.source()),
                distance: hit.distance,
                bearing: bearing(Coord { x: point.lon(), y: point.lat() }, hit.closest, self.metric),
            },
            None => Membership::None,
        }
    }

    /// Whether anything inside `bbox` can lie within `distance` of `point`
    ///
    /// Conservative: when in doubt the entry is scanned.
    fn could_beat(&self, bbox: &BoundingBox, point: &Point, distance: f64) -> bool {
        match self.metric {
            DistanceMetric::Planar => bbox.distance_to(point) <= distance,
            DistanceMetric::Geodesic => {
                let dy = distance / METERS_PER_DEGREE * GEODESIC_PAD_SLACK;
                let max_lat = point.lat().abs() + dy;
                if max_lat >= PRUNE_LAT_LIMIT {
                    return true;
                }

                let dx = dy / max_lat.to_radians().cos();
                if point.lon() - dx < -180.0 || point.lon() + dx > 180.0 {
                    return true;
                }

                bbox.expand(dx, dy).contains_point(point)
            }
        }
    }
}

fn skip_feature(
    index: &FeatureIndex,
    entry: &IndexEntry,
    error: &GeometryError,
    stats: &mut ScanStats,
) {
    stats.geometry_errors += 1;
    tracing::warn!(
        "Skipping feature {} of {}: {}",
        entry.position,
        index.source(),
        error
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{build_index, IndexOptions};
    use geojson::GeoJson;
    use geonemo_core::models::Status;
    use serde_json::{json, Value};

    fn square(half: f64, cx: f64, cy: f64, name: &str) -> Value {
        json!({
            "type": "Feature",
            "properties": {"nombre": name},
            "geometry": {
                "type": "Polygon",
                "coordinates": [[
                    [cx - half, cy - half], [cx + half, cy - half],
                    [cx + half, cy + half], [cx - half, cy + half],
                    [cx - half, cy - half]
                ]]
            }
        })
    }

    fn index_of(source: &str, features: Vec<Value>) -> FeatureIndex {
        let geojson: GeoJson = json!({"type": "FeatureCollection", "features": features})
            .to_string()
            .parse()
            .unwrap();
        let options = IndexOptions { metric: DistanceMetric::Planar, compute_area: false };
        build_index(source, geojson, options)
    }

    fn planar() -> MembershipResolver {
        MembershipResolver::new(DistanceMetric::Planar)
    }

    fn pt(lon: f64, lat: f64) -> Point {
        Point::new(lon, lat).unwrap()
    }

    #[test]
    fn test_inside_square_reports_border_distance() {
        let index = index_of("a.geojson", vec![square(10.0, 0.0, 0.0, "A")]);
        let resolution = planar().resolve_point(&pt(0.0, 0.0), &[&index]);

        match resolution.membership {
            Membership::Inside { feature, border_distance } => {
                assert_eq!(feature.name(), Some("A"));
                assert_eq!(border_distance, 10.0);
            }
            other => panic!("expected inside, got {:?}", other),
        }
        assert_eq!(resolution.stats.exact_tests, 1);
    }

    #[test]
    fn test_outside_square_reports_nearest_edge() {
        let index = index_of("a.geojson", vec![square(10.0, 0.0, 0.0, "A")]);
        let resolution = planar().resolve_point(&pt(15.0, 0.0), &[&index]);

        assert_eq!(resolution.membership.status(), Status::NearestPerimeter);
        assert_eq!(resolution.membership.distance(), Some(5.0));
        match resolution.membership {
            Membership::NearestPerimeter { bearing, .. } => {
                // The edge lies due west of the point
                assert!((bearing - 270.0).abs() < 1e-9, "got {}", bearing);
            }
            other => panic!("expected nearest perimeter, got {:?}", other),
        }
        // The bbox prefilter keeps the exact test from running at all
        assert_eq!(resolution.stats.exact_tests, 0);
    }

    #[test]
    fn test_empty_pool_is_none() {
        let pool: Vec<&FeatureIndex> = Vec::new();
        assert_eq!(planar().resolve_point(&pt(0.0, 0.0), &pool).membership, Membership::None);

        let empty = FeatureIndex::empty("vacio.geojson");
        assert_eq!(planar().resolve_point(&pt(0.0, 0.0), &[&empty]).membership, Membership::None);
    }

    #[test]
    fn test_inside_takes_precedence_over_closer_perimeter() {
        // Big square contains the point; a tiny square's edge is much closer
        let index = index_of(
            "a.geojson",
            vec![square(0.5, 2.0, 0.0, "Cerca"), square(100.0, 0.0, 0.0, "Grande")],
        );
        let resolution = planar().resolve_point(&pt(1.0, 0.0), &[&index]);

        assert_eq!(resolution.membership.status(), Status::Inside);
        assert_eq!(resolution.membership.feature().and_then(|f| f.name()), Some("Grande"));
    }

    #[test]
    fn test_first_found_wins_on_overlap() {
        let first = index_of("first.geojson", vec![square(10.0, 0.0, 0.0, "Primero")]);
        let second = index_of("second.geojson", vec![square(10.0, 0.0, 0.0, "Segundo")]);

        let resolution = planar().resolve_point(&pt(1.0, 1.0), &[&first, &second]);
        let feature = resolution.membership.feature().unwrap();
        assert_eq!(feature.source, "first.geojson");
        assert_eq!(feature.name(), Some("Primero"));
    }

    #[test]
    fn test_first_found_wins_on_equal_distance() {
        let index = index_of(
            "a.geojson",
            vec![square(1.0, -5.0, 0.0, "Oeste"), square(1.0, 5.0, 0.0, "Este")],
        );
        let resolution = planar().resolve_point(&pt(0.0, 0.0), &[&index]);
        assert_eq!(resolution.membership.distance(), Some(4.0));
        assert_eq!(resolution.membership.feature().and_then(|f| f.name()), Some("Oeste"));
    }

    #[test]
    fn test_degenerate_feature_is_skipped() {
        let degenerate = json!({
            "type": "Feature",
            "properties": {"nombre": "Punto"},
            "geometry": {"type": "Polygon", "coordinates": [[[0.0, 0.0]]]}
        });
        let index = index_of("a.geojson", vec![degenerate, square(10.0, 0.0, 0.0, "A")]);

        let resolution = planar().resolve_point(&pt(0.0, 0.0), &[&index]);
        assert_eq!(resolution.membership.status(), Status::Inside);
        assert_eq!(resolution.membership.feature().and_then(|f| f.name()), Some("A"));
        assert_eq!(resolution.stats.geometry_errors, 1);
    }

    #[test]
    fn test_far_entries_are_pruned() {
        let index = index_of(
            "a.geojson",
            vec![square(1.0, 3.0, 0.0, "Cerca"), square(1.0, 80.0, 80.0, "Lejos")],
        );
        let resolution = planar().resolve_point(&pt(0.0, 0.0), &[&index]);

        assert_eq!(resolution.membership.feature().and_then(|f| f.name()), Some("Cerca"));
        assert_eq!(resolution.stats.pruned, 1);
        assert_eq!(resolution.stats.perimeter_scans, 1);
    }

    #[test]
    fn test_geodesic_distance_in_meters() {
        let index = index_of("a.geojson", vec![square(1.0, 0.0, 0.0, "A")]);
        let resolver = MembershipResolver::new(DistanceMetric::Geodesic);
        let resolution = resolver.resolve_point(&pt(2.0, 0.0), &[&index]);

        let distance = resolution.membership.distance().unwrap();
        assert!((distance - 111_195.0).abs() < 200.0, "got {}", distance);
    }
}
