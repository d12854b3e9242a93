use std::collections::BTreeMap;

pub type EdgeId = i64;

/// 一个gps轨迹点
/// (vehicle_id, time) 在导入后即确定, speed 与 matched_edge 由后续阶段填充
#[derive(Debug, Clone, PartialEq)]
pub struct GeoPoint {
    pub vehicle_id: String,
    pub longitude: f64,
    pub latitude: f64,
    pub time: i64,
    pub reported_speed: Option<f64>, // 原始日志中的速度
    pub speed: f64,                  // 推算出的速度 m/s
    pub matched_edge: Option<EdgeId>,
}

impl GeoPoint {
    pub fn new(vehicle_id: &str, longitude: f64, latitude: f64, time: i64) -> Self {
        GeoPoint {
            vehicle_id: vehicle_id.to_string(),
            longitude,
            latitude,
            time,
            reported_speed: None,
            speed: 0.0,
            matched_edge: None,
        }
    }
}

pub type Trajectory = Vec<GeoPoint>;

/// 车辆id -> 按时间排序的轨迹
pub type VehicleTrajectories = BTreeMap<String, Trajectory>;
