//! R-tree backed feature layers
//!
//! Every indexed geometry lives in lon/lat degrees. Nearest-neighbor search
//! ranks candidates by planar distance in degrees (cheap, and monotone enough
//! at city scale); reported distances are geodesic meters on the WGS84
//! ellipsoid between the query point and the nearest point of the winner.

use geo::{BoundingRect, Closest, ClosestPoint, Contains, GeodesicArea, GeodesicDistance};
use geo_types::{Geometry, LineString, MultiLineString, MultiPolygon, Point, Rect};
use rstar::{PointDistance, RTree, RTreeObject, AABB};

use crate::core::types::METERS_PER_DEGREE;

/// Geodesic distance in meters between two lon/lat points
#[inline]
pub fn geodesic_meters(a: &Point<f64>, b: &Point<f64>) -> f64 {
    a.geodesic_distance(b)
}

/// Pad in degrees (lon, lat) covering `pad_m` meters around latitude `lat_deg`
#[inline]
pub fn pad_degrees(lat_deg: f64, pad_m: f64) -> (f64, f64) {
    let m_per_deg_lon = METERS_PER_DEGREE * lat_deg.to_radians().cos().abs().max(1e-6);
    (pad_m / m_per_deg_lon, pad_m / METERS_PER_DEGREE)
}

fn rect_envelope(rect: Rect<f64>) -> AABB<[f64; 2]> {
    AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y])
}

fn closest_point(closest: Closest<f64>) -> Option<Point<f64>> {
    match closest {
        Closest::Intersection(p) | Closest::SinglePoint(p) => Some(p),
        Closest::Indeterminate => None,
    }
}

// ============================================================================
// Shapes
// ============================================================================

/// Geometry kinds the layers index
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Point(Point<f64>),
    Lines(MultiLineString<f64>),
    Area(MultiPolygon<f64>),
}

impl Shape {
    /// Line-like geometry (`LineString`, `MultiLineString`, `Line`)
    pub fn lines(geometry: &Geometry<f64>) -> Option<Shape> {
        match geometry {
            Geometry::LineString(line) => Some(Shape::Lines(MultiLineString::new(vec![line.clone()]))),
            Geometry::MultiLineString(lines) => Some(Shape::Lines(lines.clone())),
            Geometry::Line(line) => Some(Shape::Lines(MultiLineString::new(vec![
                LineString::from(vec![line.start, line.end]),
            ]))),
            _ => None,
        }
    }

    /// Areal geometry (`Polygon`, `MultiPolygon`, `Rect`, `Triangle`)
    pub fn area(geometry: &Geometry<f64>) -> Option<Shape> {
        match geometry {
            Geometry::Polygon(polygon) => Some(Shape::Area(MultiPolygon::new(vec![polygon.clone()]))),
            Geometry::MultiPolygon(polygons) => Some(Shape::Area(polygons.clone())),
            Geometry::Rect(rect) => Some(Shape::Area(MultiPolygon::new(vec![rect.to_polygon()]))),
            Geometry::Triangle(tri) => Some(Shape::Area(MultiPolygon::new(vec![tri.to_polygon()]))),
            _ => None,
        }
    }

    /// Point geometry; a `MultiPoint` expands to one shape per member
    pub fn points(geometry: &Geometry<f64>) -> Vec<Shape> {
        match geometry {
            Geometry::Point(point) => vec![Shape::Point(*point)],
            Geometry::MultiPoint(points) => points.iter().map(|p| Shape::Point(*p)).collect(),
            _ => Vec::new(),
        }
    }

    /// Nearest point of this shape to `p` (`p` itself when inside an area)
    pub fn closest_to(&self, p: &Point<f64>) -> Option<Point<f64>> {
        match self {
            Shape::Point(q) => Some(*q),
            Shape::Lines(lines) => closest_point(lines.closest_point(p)),
            Shape::Area(area) => {
                if area.contains(p) {
                    Some(*p)
                } else {
                    closest_point(area.closest_point(p))
                }
            }
        }
    }

    pub fn contains(&self, p: &Point<f64>) -> bool {
        match self {
            Shape::Area(area) => area.contains(p),
            _ => false,
        }
    }

    fn bounding_rect(&self) -> Option<Rect<f64>> {
        match self {
            Shape::Point(p) => Some(p.bounding_rect()),
            Shape::Lines(lines) => lines.bounding_rect(),
            Shape::Area(area) => area.bounding_rect(),
        }
    }
}

/// A shape stored in a [`FeatureLayer`], with its envelope and footprint area
#[derive(Debug, Clone)]
pub struct IndexedShape {
    pub shape: Shape,
    /// Geodesic area in square meters (0 for points and lines)
    pub area_m2: f64,
    envelope: AABB<[f64; 2]>,
}

impl IndexedShape {
    /// Index a shape; empty geometries (no bounding box) are rejected
    pub fn new(shape: Shape) -> Option<Self> {
        let envelope = rect_envelope(shape.bounding_rect()?);
        let area_m2 = match &shape {
            Shape::Area(area) => area.geodesic_area_unsigned(),
            _ => 0.0,
        };
        Some(Self {
            shape,
            area_m2,
            envelope,
        })
    }

    /// Geodesic distance in meters from `p` to the nearest point of the shape
    ///
    /// Returns infinity when no nearest point can be determined.
    pub fn distance_m(&self, p: &Point<f64>) -> f64 {
        self.shape
            .closest_to(p)
            .map(|c| geodesic_meters(p, &c))
            .unwrap_or(f64::INFINITY)
    }

    pub fn contains(&self, p: &Point<f64>) -> bool {
        self.shape.contains(p)
    }
}

impl RTreeObject for IndexedShape {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

impl PointDistance for IndexedShape {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let p = Point::new(point[0], point[1]);
        match self.shape.closest_to(&p) {
            Some(c) => {
                let dx = c.x() - p.x();
                let dy = c.y() - p.y();
                dx * dx + dy * dy
            }
            None => f64::INFINITY,
        }
    }
}

// ============================================================================
// Layers
// ============================================================================

/// A bulk-loaded R-tree over one class of shapes
#[derive(Clone)]
pub struct FeatureLayer {
    tree: RTree<IndexedShape>,
}

impl Default for FeatureLayer {
    fn default() -> Self {
        Self { tree: RTree::new() }
    }
}

impl FeatureLayer {
    pub fn bulk_load(shapes: Vec<IndexedShape>) -> Self {
        Self {
            tree: RTree::bulk_load(shapes),
        }
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// The shape nearest to `p`, if the layer has any
    pub fn nearest(&self, p: &Point<f64>) -> Option<&IndexedShape> {
        self.tree.nearest_neighbor(&[p.x(), p.y()])
    }

    /// Up to `k` shapes in ascending distance from `p`
    pub fn nearest_k(&self, p: &Point<f64>, k: usize) -> impl Iterator<Item = &IndexedShape> {
        self.tree.nearest_neighbor_iter(&[p.x(), p.y()]).take(k)
    }

    /// Geodesic meters to the nearest shape, `None` for an empty layer
    pub fn nearest_distance_m(&self, p: &Point<f64>) -> Option<f64> {
        self.nearest(p).map(|shape| shape.distance_m(p))
    }

    /// Whether the nearest shape lies within `radius_m` meters of `p`
    pub fn any_within(&self, p: &Point<f64>, radius_m: f64) -> bool {
        self.nearest_distance_m(p)
            .is_some_and(|d| d <= radius_m)
    }

    /// Whether the nearest shape to `p` contains it
    pub fn nearest_contains(&self, p: &Point<f64>) -> bool {
        self.nearest(p).is_some_and(|shape| shape.contains(p))
    }
}

/// A river centerline expanded to a corridor of half its width on each side
#[derive(Debug, Clone)]
pub struct RiverCorridor {
    pub centerline: LineString<f64>,
    pub half_width_m: f64,
    envelope: AABB<[f64; 2]>,
}

impl RiverCorridor {
    pub fn new(centerline: LineString<f64>, width_m: f64) -> Option<Self> {
        let rect = centerline.bounding_rect()?;
        let half_width_m = width_m / 2.0;
        // longitude pad is widest at the latitude furthest from the equator
        let max_lat = rect.min().y.abs().max(rect.max().y.abs());
        let (pad_lon, pad_lat) = pad_degrees(max_lat, half_width_m);
        let envelope = AABB::from_corners(
            [rect.min().x - pad_lon, rect.min().y - pad_lat],
            [rect.max().x + pad_lon, rect.max().y + pad_lat],
        );
        Some(Self {
            centerline,
            half_width_m,
            envelope,
        })
    }

    pub fn contains(&self, p: &Point<f64>) -> bool {
        closest_point(self.centerline.closest_point(p))
            .is_some_and(|c| geodesic_meters(p, &c) <= self.half_width_m)
    }
}

impl RTreeObject for RiverCorridor {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// R-tree over river corridors, queried by envelope then exact corridor test
#[derive(Clone)]
pub struct CorridorLayer {
    tree: RTree<RiverCorridor>,
}

impl Default for CorridorLayer {
    fn default() -> Self {
        Self { tree: RTree::new() }
    }
}

impl CorridorLayer {
    pub fn bulk_load(corridors: Vec<RiverCorridor>) -> Self {
        Self {
            tree: RTree::bulk_load(corridors),
        }
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    pub fn contains(&self, p: &Point<f64>) -> bool {
        let probe = AABB::from_point([p.x(), p.y()]);
        self.tree
            .locate_in_envelope_intersecting(&probe)
            .any(|corridor| corridor.contains(p))
    }
}
