use geo::{Distance, Haversine, Point};

use super::Coordinate;

/// Great-circle distance between two coordinates, in metres.
///
/// n.b. geo points are x=lon, y=lat.
pub fn haversine_m(a: &Coordinate, b: &Coordinate) -> f64 {
    let p1 = Point::new(a.longitude, a.latitude);
    let p2 = Point::new(b.longitude, b.latitude);
    Haversine::distance(p1, p2)
}

/// Converts metres per second to kilometres per hour.
pub fn mps_to_kmh(mps: f64) -> f64 {
    mps * 3.6
}

/// Sum of the consecutive great-circle legs of a path.
pub fn path_length_m(points: &[Coordinate]) -> f64 {
    points.windows(2).map(|w| haversine_m(&w[0], &w[1])).sum()
}
