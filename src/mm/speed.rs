use super::traj::GeoPoint;
use crate::algorithm;

fn speed_between(from: &GeoPoint, to: &GeoPoint) -> f64 {
    let distance =
        algorithm::geodesic_distance(to.longitude, to.latitude, from.longitude, from.latitude);
    distance / (to.time - from.time) as f64
}

/// 计算每个点的速度 m/s
/// 第 i 个点使用到第 i+1 个点的前向区间, 最后一个点使用后向区间
pub fn estimate_speed(points: &mut [GeoPoint]) {
    let n = points.len();
    if n == 0 {
        return;
    }
    if n == 1 {
        points[0].speed = 0.0;
        return;
    }
    for i in 0..n - 1 {
        if points[i].time == points[i + 1].time {
            // 时间相同, 避免除零
            points[i].speed = if i == 0 { 0.0 } else { points[i - 1].speed };
            continue;
        }
        points[i].speed = speed_between(&points[i], &points[i + 1]);
    }
    let (front, last) = (&points[n - 2], &points[n - 1]);
    let speed = if front.time == last.time {
        front.speed
    } else {
        speed_between(front, last)
    };
    points[n - 1].speed = speed;
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_single_point() {
        let mut pts = vec![GeoPoint::new("A", 116.4, 39.9, 0)];
        pts[0].speed = 3.0;
        estimate_speed(&mut pts);
        assert_eq!(pts[0].speed, 0.0);
        estimate_speed(&mut []);
    }

    #[test]
    fn test_same_time_no_division() {
        let mut pts = vec![
            GeoPoint::new("A", 0.0, 0.0, 5),
            GeoPoint::new("A", 0.0, 0.01, 5),
        ];
        estimate_speed(&mut pts);
        assert_eq!(pts[0].speed, 0.0);
        assert_eq!(pts[1].speed, 0.0);
    }

    #[test]
    fn test_known_distance() {
        let mut pts = vec![
            GeoPoint::new("A", 0.0, 0.0, 0),
            GeoPoint::new("A", 0.0, 0.01, 10),
        ];
        estimate_speed(&mut pts);
        let d = algorithm::geodesic_distance(0.0, 0.0, 0.0, 0.01);
        assert!((pts[0].speed - d / 10.0).abs() < 1e-9);
        assert!((pts[0].speed - 110.574).abs() < 0.05);
        // 最后一个点使用后向区间
        assert!((pts[1].speed - d / 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_forward_interval_and_copy() {
        let mut pts = vec![
            GeoPoint::new("A", 0.0, 0.0, 0),
            GeoPoint::new("A", 0.0, 0.01, 10),
            GeoPoint::new("A", 0.0, 0.01, 10),
            GeoPoint::new("A", 0.0, 0.03, 30),
        ];
        estimate_speed(&mut pts);
        let d = algorithm::geodesic_distance(0.0, 0.0, 0.0, 0.01);
        assert!((pts[0].speed - d / 10.0).abs() < 1e-9);
        // 与下一个点时间相同, 复制前一个点的速度
        assert_eq!(pts[1].speed, pts[0].speed);
        let d2 = algorithm::geodesic_distance(0.0, 0.01, 0.0, 0.03);
        assert!((pts[2].speed - d2 / 20.0).abs() < 1e-9);
        assert!((pts[3].speed - d2 / 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_last_point_copies_on_same_time() {
        let mut pts = vec![
            GeoPoint::new("A", 0.0, 0.0, 0),
            GeoPoint::new("A", 0.0, 0.01, 10),
            GeoPoint::new("A", 0.0, 0.02, 10),
        ];
        estimate_speed(&mut pts);
        assert_eq!(pts[2].speed, pts[1].speed);
        assert_eq!(pts[1].speed, pts[0].speed);
    }
}
