//! Direction cardinale et format degrés-minutes décimales

use geo::Point;

const DIRECTIONS: [&str; 16] = [
    "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE", "S", "SSW", "SW", "WSW", "W", "WNW", "NW",
    "NNW",
];

/// Direction sur une rose à 16 points de `from` vers `to`
///
/// Deux points identiques donnent "None".
pub fn cardinal_direction(from: Point, to: Point) -> &'static str {
    let dx = to.x() - from.x();
    let dy = to.y() - from.y();

    if dx == 0.0 && dy == 0.0 {
        return "None";
    }

    let angle = dy.atan2(dx).to_degrees();
    let compass = (90.0 - angle).rem_euclid(360.0);
    let index = ((compass + 11.25) / 22.5) as usize % 16;

    DIRECTIONS[index]
}

fn ddm(coord: f64, positive: char, negative: char) -> String {
    let deg = coord.trunc().abs();
    let minutes = (coord.abs() - deg) * 60.0;
    let hemisphere = if coord > 0.0 { positive } else { negative };
    format!("{}° {:06.3}' {}", deg as i64, minutes, hemisphere)
}

/// Latitude en degrés-minutes décimales, ex: `64° 50.400' N`
pub fn ddm_lat(lat: f64) -> String {
    ddm(lat, 'N', 'S')
}

/// Longitude en degrés-minutes décimales, ex: `147° 43.200' W`
pub fn ddm_lng(lng: f64) -> String {
    ddm(lng, 'E', 'W')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coincident_points() {
        let p = Point::new(3.0, 4.0);
        assert_eq!(cardinal_direction(p, p), "None");
    }

    #[test]
    fn test_cardinal_points() {
        let origin = Point::new(0.0, 0.0);
        assert_eq!(cardinal_direction(origin, Point::new(0.0, 10.0)), "N");
        assert_eq!(cardinal_direction(origin, Point::new(10.0, 0.0)), "E");
        assert_eq!(cardinal_direction(origin, Point::new(0.0, -10.0)), "S");
        assert_eq!(cardinal_direction(origin, Point::new(-10.0, 0.0)), "W");
        assert_eq!(cardinal_direction(origin, Point::new(10.0, 10.0)), "NE");
        assert_eq!(cardinal_direction(origin, Point::new(-1.0, 10.0)), "N");
        assert_eq!(cardinal_direction(origin, Point::new(-10.0, 9.0)), "NW");
    }

    #[test]
    fn test_ddm() {
        assert_eq!(ddm_lat(64.84), "64° 50.400' N");
        assert_eq!(ddm_lng(-147.72), "147° 43.200' W");
        assert_eq!(ddm_lat(-0.5), "0° 30.000' S");
        assert_eq!(ddm_lng(10.05), "10° 03.000' E");
    }
}
