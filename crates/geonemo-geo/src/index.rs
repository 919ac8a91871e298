//! Per-file feature index.
//!
//! Built once from a parsed GeoJSON document and never mutated afterwards.
//! Entries keep their original feature order; an R-tree over their bounding
//! boxes answers "which entries could contain this point".

use geo::MultiPolygon;
use geojson::GeoJson;
use geonemo_core::models::{BoundingBox, DistanceMetric, FeatureMatch, Point, Surface};
use rstar::{RTree, RTreeObject, AABB};
use serde_json::{Map, Value};

use crate::convert::{into_feature_collection, is_polygonal, to_multipolygon};
use crate::primitives::bounding_box;
use crate::surface::resolve_surface;

/// Options applied while indexing
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexOptions {
    /// Metric used for the geometric area fallback
    pub metric: DistanceMetric,

    /// Precompute a surface for every entry
    pub compute_area: bool,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self { metric: DistanceMetric::Geodesic, compute_area: true }
    }
}

/// One indexed polygonal feature
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    /// Position of the feature in its source collection
    pub position: usize,
    pub id: Option<String>,
    pub properties: Map<String, Value>,
    pub geometry: MultiPolygon<f64>,
    /// Geometry as it was read, handed back out in outcomes
    pub raw_geometry: geojson::Geometry,
    pub bbox: BoundingBox,
    pub area: Option<Surface>,
}

impl IndexEntry {
    /// Copy the entry out as a self-contained feature match
    pub fn to_match(&self, source: &str) -> FeatureMatch {
        FeatureMatch {
            source: source.to_string(),
            position: self.position,
            id: self.id.clone(),
            properties: self.properties.clone(),
            geometry: self.raw_geometry.clone(),
            bbox: self.bbox,
            area: self.area.clone(),
        }
    }
}

/// Envelope of an entry, stored in the R-tree
#[derive(Debug, Clone, PartialEq)]
struct EntryEnvelope {
    slot: usize,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for EntryEnvelope {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Counts gathered while building an index
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexStats {
    /// Features in the source collection
    pub features: usize,
    pub indexed: usize,
    /// Features without polygonal geometry, skipped silently
    pub non_polygonal: usize,
    /// Polygonal features dropped because their geometry was unusable
    pub dropped: usize,
}

/// Indexed polygon features of one source file
pub struct FeatureIndex {
    source: String,
    entries: Vec<IndexEntry>,
    tree: RTree<EntryEnvelope>,
    stats: IndexStats,
}

impl FeatureIndex {
    /// An index with no entries
    pub fn empty(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            entries: Vec::new(),
            tree: RTree::new(),
            stats: IndexStats::default(),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Entries in source order
    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    pub fn stats(&self) -> IndexStats {
        self.stats
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Slots of entries whose bounding box contains `point`, in source order
    pub fn candidates_at(&self, point: &Point) -> Vec<usize> {
        let mut slots: Vec<usize> = self
            .tree
            .locate_in_envelope_intersecting(&AABB::from_point(point.xy()))
            .map(|e| e.slot)
            .collect();
        slots.sort_unstable();
        slots
    }

    /// Union of every entry's bounding box
    pub fn bbox(&self) -> Option<BoundingBox> {
        self.entries.iter().map(|e| e.bbox).reduce(|a, b| a.union(&b))
    }
}

impl std::fmt::Debug for FeatureIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeatureIndex")
            .field("source", &self.source)
            .field("entries", &self.entries.len())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

/// Build the index for one parsed document
///
/// Only Polygon and MultiPolygon features are kept. A polygonal feature whose
/// coordinates cannot be converted, or that has no bounding box, is dropped
/// with a warning. Building twice from the same document yields identical
/// entries.
pub fn build_index(source: impl Into<String>, geojson: GeoJson, options: IndexOptions) -> FeatureIndex {
    let source = source.into();
    let collection = into_feature_collection(geojson);

    let mut stats = IndexStats { features: collection.features.len(), ..Default::default() };
    let mut entries = Vec::with_capacity(collection.features.len());

    for (position, feature) in collection.features.into_iter().enumerate() {
        let Some(raw_geometry) = feature.geometry else {
            stats.non_polygonal += 1;
            continue;
        };
        if !is_polygonal(&raw_geometry.value) {
            stats.non_polygonal += 1;
            continue;
        }

        let geometry = match to_multipolygon(&raw_geometry.value) {
            Ok(Some(geometry)) => geometry,
            Ok(None) => {
                stats.non_polygonal += 1;
                continue;
            }
            Err(e) => {
                tracing::warn!("Dropping feature {} of {}: {}", position, source, e);
                stats.dropped += 1;
                continue;
            }
        };

        let Some(bbox) = bounding_box(&geometry) else {
            tracing::warn!("Dropping feature {} of {}: no bounding box", position, source);
            stats.dropped += 1;
            continue;
        };

        let area = if options.compute_area {
            resolve_surface(feature.properties.as_ref(), &geometry, options.metric)
        } else {
            None
        };

        entries.push(IndexEntry {
            position,
            id: feature.id.map(|id| match id {
                geojson::feature::Id::String(s) => s,
                geojson::feature::Id::Number(n) => n.to_string(),
            }),
            properties: feature.properties.unwrap_or_default(),
            geometry,
            raw_geometry,
            bbox,
            area,
        });
    }

    stats.indexed = entries.len();

    let envelopes = entries
        .iter()
        .enumerate()
        .map(|(slot, entry)| EntryEnvelope {
            slot,
            envelope: AABB::from_corners(entry.bbox.min(), entry.bbox.max()),
        })
        .collect();

    tracing::debug!(
        "Indexed {}: {} of {} features ({} non-polygonal, {} dropped)",
        source,
        stats.indexed,
        stats.features,
        stats.non_polygonal,
        stats.dropped
    );

    FeatureIndex { source, entries, tree: RTree::bulk_load(envelopes), stats }
}
