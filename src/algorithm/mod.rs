use geo::algorithm::geodesic_distance::GeodesicDistance;
use geo::algorithm::haversine_distance::HaversineDistance;
use geo::Point;

/// 计算linestring的半正弦距离, 坐标为 [lng, lat]
pub fn linestring_distance(coords: &[[f64; 2]]) -> f64 {
    if coords.len() < 2 {
        return 0.0;
    }
    let line1 = &coords[0..coords.len() - 1];
    let line2 = &coords[1..coords.len()];
    let mut distance = 0.0;
    for (p1, p2) in line1.iter().zip(line2.iter()) {
        distance += Point::new(p1[0], p1[1]).haversine_distance(&Point::new(p2[0], p2[1]));
    }
    distance
}

/// WGS-84 椭球上两点间的测地线距离, 单位米
pub fn geodesic_distance(lng1: f64, lat1: f64, lng2: f64, lat2: f64) -> f64 {
    Point::new(lng1, lat1).geodesic_distance(&Point::new(lng2, lat2))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_geodesic_meridian() {
        // 赤道附近 0.01 度纬度约 1105.74 米
        let d = geodesic_distance(0.0, 0.0, 0.0, 0.01);
        assert!((d - 1105.74).abs() < 0.5, "got {}", d);
        assert_eq!(geodesic_distance(116.4, 39.9, 116.4, 39.9), 0.0);
    }

    #[test]
    fn test_linestring_distance() {
        assert_eq!(linestring_distance(&[]), 0.0);
        assert_eq!(linestring_distance(&[[116.3, 39.9]]), 0.0);
        let one = linestring_distance(&[[116.3, 39.9], [116.31, 39.9]]);
        let two = linestring_distance(&[[116.3, 39.9], [116.31, 39.9], [116.32, 39.9]]);
        assert!(one > 800.0 && one < 900.0);
        assert!((two - 2.0 * one).abs() < 1e-6);
    }
}
