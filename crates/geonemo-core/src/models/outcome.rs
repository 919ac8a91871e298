//! Per-group resolution outcomes.
//!
//! An outcome is a self-contained value: the winning feature is copied out of
//! the index so the outcome can be serialized and handed to a display layer
//! without keeping the index alive.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use super::point::BoundingBox;
use super::surface::Surface;

/// The feature selected for a group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureMatch {
    /// File reference the feature was loaded from
    pub source: String,

    /// Position of the feature in its source collection
    pub position: usize,

    /// GeoJSON feature id, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    pub properties: Map<String, Value>,

    pub geometry: geojson::Geometry,

    pub bbox: BoundingBox,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area: Option<Surface>,
}

impl FeatureMatch {
    /// Best-effort display name from the usual name attributes
    pub fn name(&self) -> Option<&str> {
        ["name", "Name", "NAME", "nombre", "Nombre", "NOMBRE"]
            .iter()
            .find_map(|key| self.properties.get(*key).and_then(Value::as_str))
            .filter(|s| !s.trim().is_empty())
    }

    /// Wrap the feature as a GeoJSON feature, e.g. for download
    pub fn to_geojson_feature(&self) -> geojson::Feature {
        geojson::Feature {
            bbox: Some(<[f64; 4]>::from(self.bbox).to_vec()),
            geometry: Some(self.geometry.clone()),
            id: self.id.clone().map(geojson::feature::Id::String),
            properties: Some(self.properties.clone()),
            foreign_members: None,
        }
    }
}

/// Status of a group outcome, ordered by [`Status::rank`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Inside,
    NearestPerimeter,
    None,
    Error,
}

impl Status {
    /// Precedence used when ordering outcomes (higher first)
    pub fn rank(&self) -> u8 {
        match self {
            Status::Inside => 3,
            Status::NearestPerimeter => 2,
            Status::None => 1,
            Status::Error => 0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Inside => "inside",
            Status::NearestPerimeter => "nearest_perimeter",
            Status::None => "none",
            Status::Error => "error",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Relationship between a query point and a group's features
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Membership {
    /// The point lies inside (or on the boundary of) `feature`
    Inside {
        feature: FeatureMatch,
        /// Distance from the point to the feature's boundary ("distance to exit")
        border_distance: f64,
    },
    /// The point lies outside every feature; `feature` has the closest boundary
    NearestPerimeter {
        feature: FeatureMatch,
        distance: f64,
        /// Azimuth from the query point toward the closest boundary point,
        /// degrees clockwise from north in `[0, 360)`
        ///
        /// This is the direction to walk to reach the feature, not the
        /// direction from the feature back to the point: a point east of a
        /// polygon gets a bearing near 270.
        bearing: f64,
    },
    /// The group had no usable features
    None,
    /// Resolution of the group failed
    Error { message: String },
}

impl Membership {
    pub fn status(&self) -> Status {
        match self {
            Membership::Inside { .. } => Status::Inside,
            Membership::NearestPerimeter { .. } => Status::NearestPerimeter,
            Membership::None => Status::None,
            Membership::Error { .. } => Status::Error,
        }
    }

    /// Distance the point had to travel to qualify: 0 inside, the perimeter
    /// distance when nearest, nothing otherwise
    pub fn distance(&self) -> Option<f64> {
        match self {
            Membership::Inside { .. } => Some(0.0),
            Membership::NearestPerimeter { distance, .. } => Some(*distance),
            Membership::None | Membership::Error { .. } => None,
        }
    }

    pub fn feature(&self) -> Option<&FeatureMatch> {
        match self {
            Membership::Inside { feature, .. } | Membership::NearestPerimeter { feature, .. } => {
                Some(feature)
            }
            Membership::None | Membership::Error { .. } => None,
        }
    }
}

/// A file of the group that could not be loaded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadFailure {
    pub reference: String,
    pub reason: String,
}

/// Outcome of resolving one group against one query point
///
/// Serialized outcomes always carry `distance`, the distance to qualify:
/// 0 inside, the perimeter distance when nearest, null otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "OutcomeRecord")]
pub struct GroupOutcome {
    pub group_id: String,
    pub group_name: String,

    #[serde(flatten)]
    pub membership: Membership,

    /// Files skipped because they failed to load
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub load_failures: Vec<LoadFailure>,
}

/// Serialized form of [`GroupOutcome`]
#[derive(Serialize)]
struct OutcomeRecord {
    group_id: String,
    group_name: String,

    #[serde(flatten)]
    membership: Membership,

    /// Only for variants without a `distance` field of their own
    #[serde(skip_serializing_if = "Option::is_none")]
    distance: Option<Option<f64>>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    load_failures: Vec<LoadFailure>,
}

impl From<GroupOutcome> for OutcomeRecord {
    fn from(outcome: GroupOutcome) -> Self {
        let distance = match &outcome.membership {
            Membership::NearestPerimeter { .. } => None,
            membership => Some(membership.distance()),
        };
        Self {
            group_id: outcome.group_id,
            group_name: outcome.group_name,
            membership: outcome.membership,
            distance,
            load_failures: outcome.load_failures,
        }
    }
}

impl GroupOutcome {
    pub fn new(
        group_id: impl Into<String>,
        group_name: impl Into<String>,
        membership: Membership,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            group_name: group_name.into(),
            membership,
            load_failures: Vec::new(),
        }
    }

    /// Outcome for a group whose resolution failed
    pub fn error(
        group_id: impl Into<String>,
        group_name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(group_id, group_name, Membership::Error { message: message.into() })
    }

    pub fn with_load_failures(mut self, failures: Vec<LoadFailure>) -> Self {
        self.load_failures = failures;
        self
    }

    pub fn status(&self) -> Status {
        self.membership.status()
    }

    pub fn distance(&self) -> Option<f64> {
        self.membership.distance()
    }

    pub fn feature(&self) -> Option<&FeatureMatch> {
        self.membership.feature()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_match() -> FeatureMatch {
        let mut properties = Map::new();
        properties.insert("NOMBRE".to_string(), Value::from("Parque Nacional La Campana"));
        FeatureMatch {
            source: "capas/snaspe.geojson".to_string(),
            position: 3,
            id: None,
            properties,
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

    #[test]
    fn test_status_rank_order() {
        assert!(Status::Inside.rank() > Status::NearestPerimeter.rank());
        assert!(Status::NearestPerimeter.rank() > Status::None.rank());
        assert!(Status::None.rank() > Status::Error.rank());
    }

    #[test]
    fn test_distance_to_qualify() {
        let inside = Membership::Inside { feature: sample_match(), border_distance: 120.0 };
        assert_eq!(inside.distance(), Some(0.0));

        let near =
            Membership::NearestPerimeter { feature: sample_match(), distance: 50.0, bearing: 90.0 };
        assert_eq!(near.distance(), Some(50.0));

        assert_eq!(Membership::None.distance(), None);
        assert!(Membership::None.feature().is_none());
    }

    #[test]
    fn test_outcome_serialization_is_tagged() {
        let outcome = GroupOutcome::new(
            "snaspe",
            "SNASPE",
            Membership::NearestPerimeter { feature: sample_match(), distance: 5.0, bearing: 90.0 },
        );
        let json = serde_json::to_value(&outcome).unwrap();

        assert_eq!(json["status"], "nearest_perimeter");
        assert_eq!(json["group_id"], "snaspe");
        assert_eq!(json["distance"], 5.0);
        assert_eq!(json["feature"]["source"], "capas/snaspe.geojson");
        assert!(json.get("load_failures").is_none());

        let parsed: GroupOutcome = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, outcome);
    }

    #[test]
    fn test_none_outcome_serialization() {
        let outcome = GroupOutcome::new("ramsar", "RAMSAR", Membership::None);
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "none");
        assert!(json.get("feature").is_none());
        assert_eq!(json.get("distance"), Some(&Value::Null));

        let parsed: GroupOutcome = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, outcome);
    }

    #[test]
    fn test_inside_outcome_carries_zero_distance() {
        let outcome = GroupOutcome::new(
            "snaspe",
            "SNASPE",
            Membership::Inside { feature: sample_match(), border_distance: 120.0 },
        );
        let json = serde_json::to_value(&outcome).unwrap();

        assert_eq!(json["status"], "inside");
        assert_eq!(json["distance"], 0.0);
        assert_eq!(json["border_distance"], 120.0);

        let parsed: GroupOutcome = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, outcome);
    }

    #[test]
    fn test_feature_name_lookup() {
        assert_eq!(sample_match().name(), Some("Parque Nacional La Campana"));
    }
}
