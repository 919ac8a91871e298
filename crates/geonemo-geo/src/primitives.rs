//! Geometry primitives: segment, ring and perimeter distances, bearings.
//!
//! All distance searches run in a planar frame. For [`DistanceMetric::Planar`]
//! that frame is the raw coordinate space. For [`DistanceMetric::Geodesic`] ring
//! vertices are projected into a local equirectangular frame centred on the
//! query point; the closest boundary point found there is mapped back to
//! degrees and measured with the haversine formula.

use geo::{
    Bearing, BoundingRect, Coord, Distance, Haversine, LineString, MultiPolygon, Point as GeoPoint,
};
use geonemo_core::models::{BoundingBox, DistanceMetric, Point};

use crate::error::GeometryError;

/// Meters per degree of latitude, used to turn meter radii into degree padding
pub const METERS_PER_DEGREE: f64 = 111_320.0;

const MIN_LON_SCALE: f64 = 1e-6;

/// Closest approach of a point to a segment, ring or boundary
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerimeterHit {
    pub distance: f64,
    pub closest: Coord<f64>,
}

/// Euclidean distance from `p` to the segment `a`-`b`, with the closest point
///
/// A degenerate segment (`a == b`) measures the distance to that single point.
pub fn point_to_segment_distance(p: Coord<f64>, a: Coord<f64>, b: Coord<f64>) -> PerimeterHit {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len_sq = dx * dx + dy * dy;

    let closest = if len_sq == 0.0 {
        a
    } else {
        let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / len_sq).clamp(0.0, 1.0);
        Coord { x: a.x + t * dx, y: a.y + t * dy }
    };

    PerimeterHit { distance: (p.x - closest.x).hypot(p.y - closest.y), closest }
}

/// Minimum distance from `p` to any segment of `ring`
///
/// Brute force over consecutive vertex pairs. A ring needs at least two
/// vertices; every vertex must be finite.
pub fn min_distance_to_ring(p: Coord<f64>, ring: &[Coord<f64>]) -> Result<PerimeterHit, GeometryError> {
    check_ring(ring, 2)?;

    let mut best: Option<PerimeterHit> = None;
    for pair in ring.windows(2) {
        let hit = point_to_segment_distance(p, pair[0], pair[1]);
        if best.map_or(true, |b| hit.distance < b.distance) {
            best = Some(hit);
        }
    }

    best.ok_or(GeometryError::TooFewVertices { found: ring.len(), required: 2 })
}

/// Distance from a point to the boundary of a (multi)polygon
///
/// Every ring counts, holes included, so a point deep inside still has a
/// positive distance: the distance to exit. The returned distance is in
/// coordinate units for `Planar` and in meters for `Geodesic`; the closest
/// point is always in the feature's own coordinates.
pub fn distance_to_perimeter(
    geometry: &MultiPolygon<f64>,
    point: &Point,
    metric: DistanceMetric,
) -> Result<PerimeterHit, GeometryError> {
    let origin = Coord { x: point.lon(), y: point.lat() };
    let frame = match metric {
        DistanceMetric::Planar => LocalFrame::identity(),
        DistanceMetric::Geodesic => LocalFrame::around(origin),
    };
    let query = frame.project(origin);

    let mut best: Option<PerimeterHit> = None;
    for ring in rings(geometry) {
        check_ring(&ring.0, 2)?;
        let projected: Vec<Coord<f64>> = ring.0.iter().map(|c| frame.project(*c)).collect();
        let hit = min_distance_to_ring(query, &projected)?;
        if best.map_or(true, |b| hit.distance < b.distance) {
            best = Some(hit);
        }
    }

    let hit = best.ok_or(GeometryError::NoRings)?;
    let closest = frame.unproject(hit.closest);

    let distance = match metric {
        DistanceMetric::Planar => hit.distance,
        DistanceMetric::Geodesic => {
            Haversine.distance(GeoPoint::from(origin), GeoPoint::from(closest))
        }
    };

    Ok(PerimeterHit { distance, closest })
}

/// Azimuth from `from` to `to`, degrees clockwise from north in `[0, 360)`
pub fn bearing(from: Coord<f64>, to: Coord<f64>, metric: DistanceMetric) -> f64 {
    let degrees = match metric {
        DistanceMetric::Planar => (to.x - from.x).atan2(to.y - from.y).to_degrees(),
        DistanceMetric::Geodesic => Haversine.bearing(GeoPoint::from(from), GeoPoint::from(to)),
    };

    let normalized = degrees.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if normalized >= 360.0 {
        0.0
    } else {
        normalized
    }
}

/// Bounding box of a (multi)polygon
///
/// `None` for a geometry without coordinates or with non-finite ones.
pub fn bounding_box(geometry: &MultiPolygon<f64>) -> Option<BoundingBox> {
    let rect = geometry.bounding_rect()?;
    BoundingBox::try_from([rect.min().x, rect.min().y, rect.max().x, rect.max().y]).ok()
}

/// Exterior and interior rings of every polygon, in order
pub fn rings(geometry: &MultiPolygon<f64>) -> impl Iterator<Item = &LineString<f64>> {
    geometry
        .0
        .iter()
        .flat_map(|polygon| std::iter::once(polygon.exterior()).chain(polygon.interiors()))
}

/// Total vertex count over all rings
pub fn vertex_count(geometry: &MultiPolygon<f64>) -> usize {
    rings(geometry).map(|ring| ring.0.len()).sum()
}

pub(crate) fn check_ring(ring: &[Coord<f64>], required: usize) -> Result<(), GeometryError> {
    if ring.is_empty() {
        return Err(GeometryError::EmptyRing);
    }
    if ring.len() < required {
        return Err(GeometryError::TooFewVertices { found: ring.len(), required });
    }
    if let Some(c) = ring.iter().find(|c| !c.x.is_finite() || !c.y.is_finite()) {
        return Err(GeometryError::NonFiniteCoordinate { x: c.x, y: c.y });
    }
    Ok(())
}

/// Equirectangular projection centred on a point
///
/// Longitudes are wrapped into `[-180, 180)` relative to the centre and scaled
/// by `cos(lat)`, so short distances come out proportional to ground distance.
#[derive(Debug, Clone, Copy)]
struct LocalFrame {
    origin: Coord<f64>,
    lon_scale: f64,
    wrap: bool,
}

impl LocalFrame {
    fn identity() -> Self {
        Self { origin: Coord { x: 0.0, y: 0.0 }, lon_scale: 1.0, wrap: false }
    }

    fn around(origin: Coord<f64>) -> Self {
        let lon_scale = origin.y.to_radians().cos().abs().max(MIN_LON_SCALE);
        Self { origin, lon_scale, wrap: true }
    }

    fn project(&self, c: Coord<f64>) -> Coord<f64> {
        let mut dx = c.x - self.origin.x;
        if self.wrap {
            dx = (dx + 180.0).rem_euclid(360.0) - 180.0;
        }
        Coord { x: dx * self.lon_scale, y: c.y - self.origin.y }
    }

    fn unproject(&self, c: Coord<f64>) -> Coord<f64> {
        Coord { x: self.origin.x + c.x / self.lon_scale, y: self.origin.y + c.y }
    }
}
