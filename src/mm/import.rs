use super::traj::{GeoPoint, Trajectory, VehicleTrajectories};
use crate::polygon::BoundaryPolygon;
use anyhow::Result;
use log::{debug, info, warn};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// 定位无效的记录标记
pub const INVALID_FIX_MARKER: &str = "定位无效";

/// 经纬度在日志中放大了 100000 倍
const COORD_SCALE: f64 = 100000.0;

/// 超过该点数的车辆才视为有效轨迹 (仅影响日志)
const REPORT_MIN_POINTS: usize = 10;

/// 闭区间 [begin, end]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub begin: i64,
    pub end: i64,
}

impl TimeWindow {
    pub fn new(begin: i64, end: i64) -> Self {
        TimeWindow { begin, end }
    }

    /// 只有 begin 和 end 同时给出时才生效
    pub fn from_bounds(begin: Option<i64>, end: Option<i64>) -> Option<Self> {
        match (begin, end) {
            (Some(begin), Some(end)) => Some(TimeWindow { begin, end }),
            _ => None,
        }
    }

    pub fn contains(&self, time: i64) -> bool {
        self.begin <= time && time <= self.end
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ImportFilter<'a> {
    pub window: Option<TimeWindow>,
    pub polygon: Option<&'a BoundaryPolygon>,
}

impl<'a> ImportFilter<'a> {
    pub fn with_window(mut self, window: Option<TimeWindow>) -> Self {
        self.window = window;
        self
    }

    pub fn with_polygon(mut self, polygon: &'a BoundaryPolygon) -> Self {
        self.polygon = Some(polygon);
        self
    }

    pub fn accepts(&self, point: &GeoPoint) -> bool {
        let in_window = self.window.map_or(true, |w| w.contains(point.time));
        in_window
            && self
                .polygon
                .map_or(true, |p| p.contains(point.longitude, point.latitude))
    }
}

// 逐行折叠的状态: (当前车辆, 当前缓冲, 结果)
#[derive(Default)]
struct ImportState {
    vehicle_id: Option<String>,
    buffer: Trajectory,
    result: VehicleTrajectories,
}

impl ImportState {
    fn feed(mut self, line_no: usize, line: &str, filter: &ImportFilter) -> Self {
        if line.contains(INVALID_FIX_MARKER) {
            return self;
        }
        let point = match parse_record(line) {
            Ok(point) => point,
            Err(e) => {
                warn!("skip line {}: {:#}", line_no, e);
                return self;
            }
        };
        if self.vehicle_id.as_deref() != Some(point.vehicle_id.as_str()) && !self.buffer.is_empty()
        {
            self.commit();
        }
        self.vehicle_id = Some(point.vehicle_id.clone());
        if filter.accepts(&point) {
            self.buffer.push(point);
        }
        self
    }

    // 把当前缓冲按时间排序后写入结果
    fn commit(&mut self) {
        let mut points = std::mem::take(&mut self.buffer);
        let vehicle_id = match self.vehicle_id.clone() {
            Some(id) if !points.is_empty() => id,
            _ => return,
        };
        points.sort_by_key(|p| p.time);
        if points.len() > REPORT_MIN_POINTS {
            debug!("finished: {}, numbers: {}", vehicle_id, points.len());
        } else {
            debug!("discard: {}, numbers: {}", vehicle_id, points.len());
        }
        let entry = self.result.entry(vehicle_id).or_default();
        if entry.is_empty() {
            *entry = points;
        } else {
            // 同一车辆在日志中不连续出现
            entry.extend(points);
            entry.sort_by_key(|p| p.time);
        }
    }

    fn finish(mut self) -> VehicleTrajectories {
        self.commit();
        self.result
    }
}

fn column_at<'a>(columns: &[&'a str], index: usize) -> Result<&'a str> {
    columns
        .get(index)
        .copied()
        .map(str::trim)
        .ok_or_else(|| anyhow::anyhow!("missing column {}", index))
}

/// 解析一行制表符分隔的记录
pub fn parse_record(line: &str) -> Result<GeoPoint> {
    let columns: Vec<&str> = line.split('\t').collect();
    let column = |index: usize| column_at(&columns, index);
    let vehicle_id = column(1)?;
    let raw_time = column(2)?;
    let time: i64 = raw_time
        .parse()
        .map_err(|e| anyhow::anyhow!("bad time {:?}: {}", raw_time, e))?;
    let latitude: f64 = column(4)?
        .parse::<f64>()
        .map_err(|e| anyhow::anyhow!("bad latitude: {}", e))?
        / COORD_SCALE;
    let longitude: f64 = column(5)?
        .parse::<f64>()
        .map_err(|e| anyhow::anyhow!("bad longitude: {}", e))?
        / COORD_SCALE;
    let reported_speed = column(7)?.parse::<f64>().ok();
    let mut point = GeoPoint::new(vehicle_id, longitude, latitude, time);
    point.reported_speed = reported_speed;
    Ok(point)
}

/// 导入轨迹, 日志按车辆连续分组
pub fn import_trajectories<R: BufRead>(
    reader: R,
    filter: &ImportFilter,
) -> Result<VehicleTrajectories> {
    let state = reader
        .split(b'\n')
        .enumerate()
        .try_fold(ImportState::default(), |state, (index, bytes)| {
            // 只有读取错误才中止导入
            let bytes = bytes?;
            let bytes = bytes.strip_suffix(b"\r").unwrap_or(&bytes[..]);
            let state = match std::str::from_utf8(bytes) {
                Ok(line) => state.feed(index + 1, line, filter),
                Err(e) => {
                    warn!("skip line {}: {}", index + 1, e);
                    state
                }
            };
            Ok::<_, anyhow::Error>(state)
        })?;
    let result = state.finish();
    info!("import {} vehicles", result.len());
    Ok(result)
}

pub fn import_file<P: AsRef<Path>>(path: P, filter: &ImportFilter) -> Result<VehicleTrajectories> {
    let path = path.as_ref();
    debug!("loading trajectory log from : {}", path.display());
    let file = File::open(path)
        .map_err(|e| anyhow::anyhow!("open trajectory log {} failed: {}", path.display(), e))?;
    import_trajectories(BufReader::new(file), filter)
}

/// 对已导入的轨迹再做一次时间窗与边界过滤
pub fn retain_within(points: Trajectory, filter: &ImportFilter) -> Trajectory {
    points.into_iter().filter(|p| filter.accepts(p)).collect()
}
