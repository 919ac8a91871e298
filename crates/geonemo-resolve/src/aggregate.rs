//! Ordering and near/far partitioning of per-group outcomes.

use geonemo_core::models::{GroupOutcome, Status};
use std::cmp::Ordering;

pub use geonemo_core::config::DEFAULT_DRAW_THRESHOLD_M;

/// Display precedence of a status: inside 3, nearest 2, none 1, error 0
pub fn rank(status: Status) -> u8 {
    status.rank()
}

/// Higher rank first, then smaller distance; outcomes without a distance last
pub fn compare_outcomes(a: &GroupOutcome, b: &GroupOutcome) -> Ordering {
    rank(b.status())
        .cmp(&rank(a.status()))
        .then_with(|| compare_distance(a.distance(), b.distance()))
}

fn compare_distance(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Sort outcomes for display; equal outcomes keep their catalog order
pub fn sort_outcomes(outcomes: &mut [GroupOutcome]) {
    outcomes.sort_by(compare_outcomes);
}

/// Outcomes split by how far their winner is from the click
#[derive(Debug, Default, PartialEq)]
pub struct Partition<'a> {
    /// Within the threshold and carrying a feature to draw
    pub near: Vec<&'a GroupOutcome>,
    /// Beyond the threshold; listed without geometry
    pub far: Vec<&'a GroupOutcome>,
    /// No distance at all (`none` and `error`)
    pub unmatched: Vec<&'a GroupOutcome>,
}

/// Split outcomes around `threshold`, keeping their relative order
///
/// The threshold only decides what gets drawn; distances are untouched.
pub fn partition(outcomes: &[GroupOutcome], threshold: f64) -> Partition<'_> {
    let mut result = Partition::default();

    for outcome in outcomes {
        match (outcome.distance(), outcome.feature()) {
            (Some(d), Some(_)) if d <= threshold => result.near.push(outcome),
            (Some(_), _) => result.far.push(outcome),
            (None, _) => result.unmatched.push(outcome),
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use geonemo_core::models::{BoundingBox, FeatureMatch, Membership};
    use serde_json::Map;

    fn feature() -> FeatureMatch {
        FeatureMatch {
            source: "capas/a.geojson".to_string(),
            position: 0,
            id: None,
            properties: Map::new(),
            geometry: geojson::Geometry::new(geojson::Value::Polygon(vec![vec![
                vec![0.0, 0.0],
                vec![1.0, 0.0],
                vec![1.0, 1.0],
                vec![0.0, 0.0],
            ]])),
            bbox: BoundingBox::from_corners([0.0, 0.0], [1.0, 1.0]),
            area: None,
        }
    }

    fn nearest(id: &str, distance: f64) -> GroupOutcome {
        GroupOutcome::new(
            id,
            id.to_uppercase(),
            Membership::NearestPerimeter { feature: feature(), distance, bearing: 0.0 },
        )
    }

    fn inside(id: &str) -> GroupOutcome {
        GroupOutcome::new(
            id,
            id.to_uppercase(),
            Membership::Inside { feature: feature(), border_distance: 900.0 },
        )
    }

    fn ids(outcomes: &[GroupOutcome]) -> Vec<&str> {
        outcomes.iter().map(|o| o.group_id.as_str()).collect()
    }

    #[test]
    fn test_rank_order() {
        assert_eq!(rank(Status::Inside), 3);
        assert_eq!(rank(Status::NearestPerimeter), 2);
        assert_eq!(rank(Status::None), 1);
        assert_eq!(rank(Status::Error), 0);
    }

    #[test]
    fn test_sort_by_rank_then_distance() {
        let mut outcomes = vec![
            GroupOutcome::error("broken", "Broken", "boom"),
            nearest("far", 400_000.0),
            GroupOutcome::new("empty", "Empty", Membership::None),
            nearest("close", 50.0),
            inside("home"),
        ];
        sort_outcomes(&mut outcomes);

        assert_eq!(ids(&outcomes), vec!["home", "close", "far", "empty", "broken"]);
    }

    #[test]
    fn test_sort_is_stable_for_ties() {
        let mut outcomes = vec![nearest("b", 10.0), nearest("a", 10.0), inside("y"), inside("x")];
        sort_outcomes(&mut outcomes);

        assert_eq!(ids(&outcomes), vec!["y", "x", "b", "a"]);
    }

    #[test]
    fn test_partition_threshold() {
        let outcomes = vec![nearest("near", 50_000.0), nearest("far", 400_000.0)];
        let split = partition(&outcomes, DEFAULT_DRAW_THRESHOLD_M);

        assert_eq!(split.near.len(), 1);
        assert_eq!(split.near[0].group_id, "near");
        assert_eq!(split.far.len(), 1);
        assert_eq!(split.far[0].group_id, "far");
        assert!(split.unmatched.is_empty());
    }

    #[test]
    fn test_partition_edges() {
        let outcomes = vec![
            inside("home"),
            nearest("edge", 300_000.0),
            GroupOutcome::new("empty", "Empty", Membership::None),
        ];
        let split = partition(&outcomes, 300_000.0);

        assert_eq!(split.near.len(), 2, "inside and exactly-at-threshold are near");
        assert!(split.far.is_empty());
        assert_eq!(split.unmatched[0].group_id, "empty");
    }
}
