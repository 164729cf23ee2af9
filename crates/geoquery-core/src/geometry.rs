//! Geometry types in the ArcGIS REST JSON shape
//!
//! Only what the explorer needs is modelled: reading geometries returned by
//! a feature service, sending region polygons back as spatial filters, and
//! deriving extents and centroids for navigation and popups. All spatial
//! predicates are evaluated remotely.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct SpatialReference {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wkid: Option<u32>,
    #[serde(
        default,
        rename = "latestWkid",
        skip_serializing_if = "Option::is_none"
    )]
    pub latest_wkid: Option<u32>,
}

impl SpatialReference {
    pub fn wgs84() -> Self {
        Self {
            wkid: Some(4326),
            latest_wkid: Some(4326),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    #[serde(
        default,
        rename = "spatialReference",
        skip_serializing_if = "Option::is_none"
    )]
    pub spatial_reference: Option<SpatialReference>,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            spatial_reference: None,
        }
    }
}

/// Axis-aligned bounding rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
    #[serde(
        default,
        rename = "spatialReference",
        skip_serializing_if = "Option::is_none"
    )]
    pub spatial_reference: Option<SpatialReference>,
}

impl Extent {
    pub fn new(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Self {
        Self {
            xmin,
            ymin,
            xmax,
            ymax,
            spatial_reference: None,
        }
    }

    pub fn from_point(point: &Point) -> Self {
        Self {
            xmin: point.x,
            ymin: point.y,
            xmax: point.x,
            ymax: point.y,
            spatial_reference: point.spatial_reference,
        }
    }

    pub fn width(&self) -> f64 {
        self.xmax - self.xmin
    }

    pub fn height(&self) -> f64 {
        self.ymax - self.ymin
    }

    pub fn center(&self) -> Point {
        Point {
            x: (self.xmin + self.xmax) / 2.0,
            y: (self.ymin + self.ymax) / 2.0,
            spatial_reference: self.spatial_reference,
        }
    }

    /// Services answer "no matching features" with NaN coordinates.
    pub fn is_valid(&self) -> bool {
        [self.xmin, self.ymin, self.xmax, self.ymax]
            .iter()
            .all(|v| v.is_finite())
            && self.xmin <= self.xmax
            && self.ymin <= self.ymax
    }

    /// A zero-area extent, typically the extent of a single point.
    pub fn is_degenerate(&self) -> bool {
        self.width() == 0.0 && self.height() == 0.0
    }

    pub fn union(&self, other: &Extent) -> Extent {
        Extent {
            xmin: self.xmin.min(other.xmin),
            ymin: self.ymin.min(other.ymin),
            xmax: self.xmax.max(other.xmax),
            ymax: self.ymax.max(other.ymax),
            spatial_reference: self.spatial_reference.or(other.spatial_reference),
        }
    }

    pub fn contains(&self, point: &Point) -> bool {
        point.x >= self.xmin && point.x <= self.xmax && point.y >= self.ymin && point.y <= self.ymax
    }

    /// Grows the extent around its center by `factor` (1.0 keeps it unchanged).
    pub fn expand(&self, factor: f64) -> Extent {
        let center = self.center();
        let half_w = self.width() * factor / 2.0;
        let half_h = self.height() * factor / 2.0;
        Extent {
            xmin: center.x - half_w,
            ymin: center.y - half_h,
            xmax: center.x + half_w,
            ymax: center.y + half_h,
            spatial_reference: self.spatial_reference,
        }
    }

    /// Union of every extent in `extents`, `None` when there are none.
    pub fn union_all<'a, I>(extents: I) -> Option<Extent>
    where
        I: IntoIterator<Item = &'a Extent>,
    {
        extents
            .into_iter()
            .fold(None, |acc: Option<Extent>, e| match acc {
                Some(a) => Some(a.union(e)),
                None => Some(*e),
            })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Multipoint {
    pub points: Vec<[f64; 2]>,
    #[serde(
        default,
        rename = "spatialReference",
        skip_serializing_if = "Option::is_none"
    )]
    pub spatial_reference: Option<SpatialReference>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polyline {
    pub paths: Vec<Vec<[f64; 2]>>,
    #[serde(
        default,
        rename = "spatialReference",
        skip_serializing_if = "Option::is_none"
    )]
    pub spatial_reference: Option<SpatialReference>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    pub rings: Vec<Vec<[f64; 2]>>,
    #[serde(
        default,
        rename = "spatialReference",
        skip_serializing_if = "Option::is_none"
    )]
    pub spatial_reference: Option<SpatialReference>,
}

impl Polygon {
    pub fn new(rings: Vec<Vec<[f64; 2]>>) -> Self {
        Self {
            rings,
            spatial_reference: None,
        }
    }

    /// Area-weighted centroid over all rings. Rings wound in opposite
    /// directions (holes) subtract from the total.
    pub fn centroid(&self) -> Option<Point> {
        let mut area2: f64 = 0.0;
        let mut cx: f64 = 0.0;
        let mut cy: f64 = 0.0;

        for ring in &self.rings {
            for pair in ring.windows(2) {
                let [x0, y0] = pair[0];
                let [x1, y1] = pair[1];
                let cross = x0 * y1 - x1 * y0;
                area2 += cross;
                cx += (x0 + x1) * cross;
                cy += (y0 + y1) * cross;
            }
            // close rings that don't repeat their first vertex
            if let (Some(first), Some(last)) = (ring.first(), ring.last()) {
                if first != last {
                    let cross = last[0] * first[1] - first[0] * last[1];
                    area2 += cross;
                    cx += (last[0] + first[0]) * cross;
                    cy += (last[1] + first[1]) * cross;
                }
            }
        }

        if area2.abs() < f64::EPSILON {
            return vertex_extent(self.rings.iter().flatten()).map(|e| e.center());
        }

        Some(Point {
            x: cx / (3.0 * area2),
            y: cy / (3.0 * area2),
            spatial_reference: self.spatial_reference,
        })
    }
}

/// Any geometry a feature service can return.
///
/// Untagged: the variant is recognised by its JSON keys (`x`/`y`,
/// `points`, `paths`, `rings`, `xmin`...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Geometry {
    Point(Point),
    Multipoint(Multipoint),
    Polyline(Polyline),
    Polygon(Polygon),
    Envelope(Extent),
}

impl Geometry {
    /// ArcGIS `geometryType` parameter value.
    pub fn geometry_type(&self) -> &'static str {
        match self {
            Geometry::Point(_) => "esriGeometryPoint",
            Geometry::Multipoint(_) => "esriGeometryMultipoint",
            Geometry::Polyline(_) => "esriGeometryPolyline",
            Geometry::Polygon(_) => "esriGeometryPolygon",
            Geometry::Envelope(_) => "esriGeometryEnvelope",
        }
    }

    pub fn spatial_reference(&self) -> Option<SpatialReference> {
        match self {
            Geometry::Point(p) => p.spatial_reference,
            Geometry::Multipoint(m) => m.spatial_reference,
            Geometry::Polyline(l) => l.spatial_reference,
            Geometry::Polygon(p) => p.spatial_reference,
            Geometry::Envelope(e) => e.spatial_reference,
        }
    }

    pub fn extent(&self) -> Option<Extent> {
        let extent = match self {
            Geometry::Point(p) => Some(Extent::from_point(p)),
            Geometry::Multipoint(m) => vertex_extent(m.points.iter()),
            Geometry::Polyline(l) => vertex_extent(l.paths.iter().flatten()),
            Geometry::Polygon(p) => vertex_extent(p.rings.iter().flatten()),
            Geometry::Envelope(e) => Some(*e),
        };
        extent.map(|mut e| {
            e.spatial_reference = self.spatial_reference();
            e
        })
    }

    /// Anchor point for popups: the point itself, the polygon's area
    /// centroid, or the extent center for everything else.
    pub fn centroid(&self) -> Option<Point> {
        match self {
            Geometry::Point(p) => Some(*p),
            Geometry::Polygon(p) => p.centroid(),
            Geometry::Multipoint(m) if !m.points.is_empty() => {
                let n = m.points.len() as f64;
                let (sx, sy) = m
                    .points
                    .iter()
                    .fold((0.0, 0.0), |(sx, sy), [x, y]| (sx + x, sy + y));
                Some(Point {
                    x: sx / n,
                    y: sy / n,
                    spatial_reference: m.spatial_reference,
                })
            }
            other => other.extent().map(|e| e.center()),
        }
    }
}

fn vertex_extent<'a, I>(vertices: I) -> Option<Extent>
where
    I: Iterator<Item = &'a [f64; 2]>,
{
    vertices.fold(None, |acc: Option<Extent>, [x, y]| {
        let p = Extent::new(*x, *y, *x, *y);
        Some(match acc {
            Some(e) => e.union(&p),
            None => p,
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn square(x0: f64, y0: f64, size: f64) -> Vec<[f64; 2]> {
        vec![
            [x0, y0],
            [x0, y0 + size],
            [x0 + size, y0 + size],
            [x0 + size, y0],
            [x0, y0],
        ]
    }

    #[test]
    fn test_deserialize_arcgis_shapes() {
        let point: Geometry = serde_json::from_value(json!({"x": 3.5, "y": -1.0})).unwrap();
        assert_eq!(point, Geometry::Point(Point::new(3.5, -1.0)));

        let polygon: Geometry = serde_json::from_value(json!({
            "rings": [[[0.0, 0.0], [0.0, 2.0], [2.0, 2.0], [2.0, 0.0], [0.0, 0.0]]],
            "spatialReference": {"wkid": 4326}
        }))
        .unwrap();
        assert_eq!(polygon.geometry_type(), "esriGeometryPolygon");
        assert_eq!(polygon.spatial_reference().and_then(|sr| sr.wkid), Some(4326));

        let envelope: Geometry = serde_json::from_value(json!({
            "xmin": -10.0, "ymin": -5.0, "xmax": 10.0, "ymax": 5.0
        }))
        .unwrap();
        assert!(matches!(envelope, Geometry::Envelope(_)));
    }

    #[test]
    fn test_polygon_centroid_with_hole() {
        // outer ring clockwise, hole counter-clockwise in the lower-left corner
        let outer = square(0.0, 0.0, 4.0);
        let mut hole = square(0.0, 0.0, 2.0);
        hole.reverse();
        let polygon = Polygon::new(vec![outer, hole]);

        let c = polygon.centroid().unwrap();
        // 16 - 4 = 12 area; hole center (1,1), outer center (2,2)
        let expected = (16.0 * 2.0 - 4.0 * 1.0) / 12.0;
        assert!((c.x - expected).abs() < 1e-9);
        assert!((c.y - expected).abs() < 1e-9);
    }

    #[test]
    fn test_degenerate_polygon_falls_back_to_extent_center() {
        let polygon = Polygon::new(vec![vec![[0.0, 0.0], [4.0, 0.0], [0.0, 0.0]]]);
        let c = polygon.centroid().unwrap();
        assert_eq!((c.x, c.y), (2.0, 0.0));
    }

    #[test]
    fn test_extent_union_and_validity() {
        let a = Extent::new(0.0, 0.0, 1.0, 1.0);
        let b = Extent::new(-2.0, 0.5, 0.5, 3.0);
        let u = Extent::union_all([a, b].iter()).unwrap();
        assert_eq!((u.xmin, u.ymin, u.xmax, u.ymax), (-2.0, 0.0, 1.0, 3.0));
        assert!(u.is_valid());
        assert!(!Extent::new(f64::NAN, 0.0, 1.0, 1.0).is_valid());
        assert!(Extent::union_all(std::iter::empty::<&Extent>()).is_none());
    }

    #[test]
    fn test_point_extent_is_degenerate() {
        let g = Geometry::Point(Point::new(12.5, 41.9));
        let e = g.extent().unwrap();
        assert!(e.is_degenerate());
        assert_eq!(g.centroid().unwrap().x, 12.5);
    }
}
