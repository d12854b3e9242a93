use super::traj::GeoPoint;
use log::debug;

#[derive(Debug, Clone)]
pub struct SegmentConfig {
    pub max_gap: i64,       // 连续点之间允许的最大时间间隔 秒
    pub min_points: usize,  // 一段轨迹的最小点数
    pub keep_tail: bool,    // 是否保留最后一个切分点之后的轨迹
}

impl Default for SegmentConfig {
    fn default() -> Self {
        SegmentConfig {
            max_gap: 120,
            min_points: 10,
            keep_tail: false,
        }
    }
}

/// 原始轨迹可能不连续, 按时间间隔切分成多段连续的轨迹
/// 每段内相邻点的时间间隔不超过 max_gap, 且点数大于 min_points
pub fn segment<'a>(points: &'a [GeoPoint], cfg: &SegmentConfig) -> Vec<&'a [GeoPoint]> {
    let mut segments = Vec::new();
    if points.len() < cfg.min_points {
        return segments;
    }
    let cuts = points
        .windows(2)
        .enumerate()
        .filter(|(_, pair)| pair[1].time - pair[0].time > cfg.max_gap)
        .map(|(index, _)| index);
    let mut begin = 0;
    for cut in cuts {
        if cut + 1 - begin > cfg.min_points {
            segments.push(&points[begin..=cut]);
        }
        begin = cut + 1;
    }
    if cfg.keep_tail && points.len() - begin > cfg.min_points {
        segments.push(&points[begin..]);
    }
    debug!("split {} points into {} segments", points.len(), segments.len());
    segments
}
