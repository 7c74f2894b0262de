//! Points les plus proches entre une feature et le contour d'un feu

use geo::line_intersection::{line_intersection, LineIntersection};
use geo::{
    Closest, ClosestPoint, CoordsIter, EuclideanDistance, Geometry, Intersects, Line,
    MultiLineString, MultiPolygon, Point, Polygon,
};

/// Contour d'un multipolygone (extérieurs et trous)
pub fn boundary(polygon: &MultiPolygon) -> MultiLineString {
    MultiLineString::new(
        polygon
            .iter()
            .flat_map(|p| std::iter::once(p.exterior()).chain(p.interiors()))
            .cloned()
            .collect(),
    )
}

fn closest(c: Closest<f64>) -> Option<Point> {
    match c {
        Closest::Intersection(p) | Closest::SinglePoint(p) => Some(p),
        Closest::Indeterminate => None,
    }
}

fn polygon_segments(polygon: &Polygon) -> impl Iterator<Item = Line> + '_ {
    std::iter::once(polygon.exterior())
        .chain(polygon.interiors())
        .flat_map(|ring| ring.lines())
}

/// Segments d'une géométrie (vide pour les points)
fn segments(geometry: &Geometry) -> Vec<Line> {
    match geometry {
        Geometry::Line(l) => vec![*l],
        Geometry::LineString(ls) => ls.lines().collect(),
        Geometry::MultiLineString(mls) => mls.iter().flat_map(|ls| ls.lines()).collect(),
        Geometry::Polygon(p) => polygon_segments(p).collect(),
        Geometry::MultiPolygon(mp) => mp.iter().flat_map(polygon_segments).collect(),
        Geometry::Rect(r) => polygon_segments(&r.to_polygon()).collect(),
        Geometry::Triangle(t) => polygon_segments(&t.to_polygon()).collect(),
        Geometry::GeometryCollection(gc) => gc.iter().flat_map(segments).collect(),
        Geometry::Point(_) | Geometry::MultiPoint(_) => Vec::new(),
    }
}

/// Premier point d'intersection entre les segments de la feature et le contour
fn crossing_point(geometry: &Geometry, boundary: &MultiLineString) -> Option<Point> {
    let edges: Vec<Line> = boundary.iter().flat_map(|ls| ls.lines()).collect();
    segments(geometry).into_iter().find_map(|segment| {
        edges.iter().find_map(|edge| match line_intersection(segment, *edge)? {
            LineIntersection::SinglePoint { intersection, .. } => Some(Point::from(intersection)),
            LineIntersection::Collinear { intersection } => Some(Point::from(intersection.start)),
        })
    })
}

/// Couple (point de la feature, point du contour) le plus proche
///
/// Renvoie `None` si l'une des géométries est vide.
pub fn nearest_points(geometry: &Geometry, boundary: &MultiLineString) -> Option<(Point, Point)> {
    let mut best: Option<(Point, Point, f64)> = None;
    let mut consider = |on_feature: Point, on_boundary: Point| {
        let d = on_feature.euclidean_distance(&on_boundary);
        if best.map_or(true, |(_, _, current)| d < current) {
            best = Some((on_feature, on_boundary, d));
        }
    };

    for coord in geometry.coords_iter() {
        let p = Point::from(coord);
        if let Some(q) = closest(boundary.closest_point(&p)) {
            consider(p, q);
        }
    }
    for coord in boundary.coords_iter() {
        let q = Point::from(coord);
        if let Some(p) = closest(geometry.closest_point(&q)) {
            consider(p, q);
        }
    }

    let (p, q, d) = best?;
    if d > 0.0 && geometry.intersects(boundary) {
        if let Some(x) = crossing_point(geometry, boundary) {
            return Some((x, x));
        }
    }
    Some((p, q))
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, LineString};

    fn fire() -> MultiPolygon {
        MultiPolygon::new(vec![polygon![
            (x: 0.0, y: 0.0),
            (x: 10.0, y: 0.0),
            (x: 10.0, y: 10.0),
            (x: 0.0, y: 10.0),
        ]])
    }

    #[test]
    fn test_point_outside() {
        let b = boundary(&fire());
        let (p, q) = nearest_points(&Geometry::Point(Point::new(5.0, 13.0)), &b).unwrap();
        assert_eq!(p, Point::new(5.0, 13.0));
        assert_eq!(q, Point::new(5.0, 10.0));
    }

    #[test]
    fn test_line_vertex_far_but_segment_close() {
        // Segment passant au-dessus du feu, sommets lointains
        let line = LineString::from(vec![(-50.0, 12.0), (60.0, 12.0)]);
        let b = boundary(&fire());
        let (p, q) = nearest_points(&Geometry::LineString(line), &b).unwrap();
        assert!((p.euclidean_distance(&q) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_crossing_line_has_zero_distance() {
        let line = LineString::from(vec![(-50.0, 5.0), (60.0, 5.0)]);
        let b = boundary(&fire());
        let (p, q) = nearest_points(&Geometry::LineString(line), &b).unwrap();
        assert_eq!(p.euclidean_distance(&q), 0.0);
    }
}
