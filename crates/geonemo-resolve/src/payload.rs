//! Result payload handed to the display layer.

use chrono::{DateTime, Utc};
use geonemo_core::error::{GeonemoError, Result};
use geonemo_core::models::{DistanceMetric, GroupOutcome, Point, Status};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::aggregate::{partition, sort_outcomes};

/// The clicked coordinate, in map order
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Click {
    pub lat: f64,
    pub lng: f64,
}

impl From<&Point> for Click {
    fn from(point: &Point) -> Self {
        Self { lat: point.lat(), lng: point.lon() }
    }
}

/// Headline of a click: the dominant outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub status: Status,
    pub dominant_group: Option<String>,
    pub min_distance: Option<f64>,
}

/// Summarize outcomes that are already sorted
///
/// The first outcome dominates. Without outcomes the status is `none`.
pub fn summarize(sorted: &[GroupOutcome]) -> Summary {
    match sorted.first() {
        Some(top) => Summary {
            status: top.status(),
            dominant_group: Some(top.group_name.clone()),
            min_distance: top.distance(),
        },
        None => Summary { status: Status::None, dominant_group: None, min_distance: None },
    }
}

/// Everything the display page needs for one click
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultPayload {
    pub updated_at: DateTime<Utc>,
    pub click: Click,
    pub metric: DistanceMetric,
    pub draw_threshold: f64,
    pub summary: Summary,
    /// Outcomes in display order
    pub groups: Vec<GroupOutcome>,
    /// Group ids whose winner is drawn
    pub near: Vec<String>,
    /// Group ids listed without geometry
    pub far: Vec<String>,
    /// Group ids without a winner
    pub unmatched: Vec<String>,
}

impl ResultPayload {
    /// Sort, summarize and partition the outcomes of one click
    pub fn build(
        point: &Point,
        metric: DistanceMetric,
        mut outcomes: Vec<GroupOutcome>,
        draw_threshold: f64,
    ) -> Self {
        sort_outcomes(&mut outcomes);
        let summary = summarize(&outcomes);

        let split = partition(&outcomes, draw_threshold);
        let ids = |list: &[&GroupOutcome]| -> Vec<String> {
            list.iter().map(|o| o.group_id.clone()).collect()
        };
        let near = ids(&split.near);
        let far = ids(&split.far);
        let unmatched = ids(&split.unmatched);

        Self {
            updated_at: Utc::now(),
            click: Click::from(point),
            metric,
            draw_threshold,
            summary,
            groups: outcomes,
            near,
            far,
            unmatched,
        }
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| GeonemoError::Serialization(e.to_string()))
    }

    /// Write the payload as pretty JSON, creating parent directories
    pub fn write_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_json_pretty()?)?;
        Ok(())
    }
}
