use geonemo_core::models::BoundingBox;
use serde::Serialize;
use std::collections::BTreeMap;

/// Health of one referenced file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    /// Parsed, with at least one feature
    Ok,
    /// Parsed, but without features
    Empty,
    /// Not found or not reachable
    Missing,
    /// Reachable, but not GeoJSON
    Invalid,
}

impl FileStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileStatus::Ok => "ok",
            FileStatus::Empty => "empty",
            FileStatus::Missing => "missing",
            FileStatus::Invalid => "invalid",
        }
    }
}

/// Output for inspect command: one file of the catalog
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub reference: String,
    pub location: String,
    pub status: FileStatus,

    /// Top-level GeoJSON type
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shape: Option<String>,

    pub features: usize,
    pub geometry_types: BTreeMap<String, usize>,
    pub vertices: usize,

    /// Polygon features the resolver will use
    pub indexable: usize,
    /// Polygon features with unusable coordinates
    pub dropped: usize,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub bbox: Option<BoundingBox>,

    /// Approximate bbox width and height in km
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span_km: Option<[f64; 2]>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FileReport {
    /// Report for a file that could not be read or parsed
    pub fn failed(reference: &str, location: String, status: FileStatus, error: String) -> Self {
        Self {
            reference: reference.to_string(),
            location,
            status,
            shape: None,
            features: 0,
            geometry_types: BTreeMap::new(),
            vertices: 0,
            indexable: 0,
            dropped: 0,
            bbox: None,
            span_km: None,
            error: Some(error),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HeavyFeature {
    pub reference: String,
    pub position: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub vertices: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupReport {
    pub id: String,
    pub label: String,
    pub enabled: bool,

    /// Why the group would resolve to an error, if it would
    #[serde(skip_serializing_if = "Option::is_none")]
    pub problem: Option<String>,

    pub files: Vec<FileReport>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InspectTotals {
    pub files: usize,
    pub ok: usize,
    pub empty: usize,
    pub missing: usize,
    pub invalid: usize,
}

impl InspectTotals {
    pub fn count(&mut self, status: FileStatus) {
        self.files += 1;
        match status {
            FileStatus::Ok => self.ok += 1,
            FileStatus::Empty => self.empty += 1,
            FileStatus::Missing => self.missing += 1,
            FileStatus::Invalid => self.invalid += 1,
        }
    }

    /// A catalog passes when some file is usable and none is broken
    pub fn passed(&self) -> bool {
        self.ok > 0 && self.missing == 0 && self.invalid == 0
    }
}

/// Output for inspect command
#[derive(Debug, Serialize)]
pub struct InspectOutput {
    pub catalog: String,
    pub groups: Vec<GroupReport>,
    pub heaviest: Vec<HeavyFeature>,
    pub heavy_vertex_threshold: usize,
    /// Features above the heavy vertex threshold
    pub heavy_alerts: usize,
    pub totals: InspectTotals,
}

/// Output for config command
#[derive(Debug, Serialize)]
pub struct ConfigOutput {
    pub values: BTreeMap<String, ConfigEntry>,
}

#[derive(Debug, Serialize)]
pub struct ConfigEntry {
    pub value: String,
    pub source: String,
}
