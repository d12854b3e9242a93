use super::traj::{EdgeId, Trajectory};
use anyhow::Result;
use thiserror::Error;

/**
 * 定义mm需要的一些结构体
 * */

#[derive(Debug, Clone)]
pub struct MatchConfig {
    pub k: usize,       // 候选点个数
    pub radius: f64,    // 搜索半径
    pub gps_error: f64, // gps误差
}

impl Default for MatchConfig {
    fn default() -> Self {
        MatchConfig {
            k: 8,
            radius: 100.0,
            gps_error: 50.0,
        }
    }
}

/// 增量匹配检查的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOutcome {
    /// 整条轨迹可以一次匹配
    Full,
    /// 只能匹配到该索引 (包含) 为止
    BreakAt(usize),
}

impl CheckOutcome {
    /// 引擎原始返回值, -1 表示可以完整匹配
    pub fn from_raw(raw: i64) -> Result<Self> {
        match raw {
            -1 => Ok(CheckOutcome::Full),
            i if i >= 0 => Ok(CheckOutcome::BreakAt(i as usize)),
            _ => Err(anyhow::anyhow!("unexpected check result {}", raw)),
        }
    }
}

/// 一次匹配调用的返回
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResponse {
    pub o_path: Vec<EdgeId>, // 每个轨迹点匹配到的edge
    pub mgeom: String,       // 修正后的轨迹 LINESTRING
}

#[derive(Debug, Clone, Default)]
pub struct MatchedTrajectory {
    pub points: Trajectory,           // 带有 matched_edge 与 speed 的轨迹点
    pub geometry: Vec<geo::Point<f64>>, // 修正后的轨迹
}

#[derive(Debug, Error)]
pub enum MatchError {
    #[error("trajectory is empty")]
    EmptyTrajectory,

    #[error("check match failed at offset {offset}: {reason}")]
    CheckFailed { offset: usize, reason: String },

    #[error("check match returned index {index} beyond {remaining} remaining points")]
    InvalidBoundary { index: usize, remaining: usize },

    #[error("match failed at offset {offset}: {reason}")]
    MatchFailed { offset: usize, reason: String },

    #[error("{len} points at offset {offset} are unmatched")]
    Unmatched { offset: usize, len: usize },

    #[error("matched {got} edges for {expected} points at offset {offset}")]
    LengthMismatch {
        offset: usize,
        expected: usize,
        got: usize,
    },

    #[error("bad matched geometry at offset {offset}: {reason}")]
    Geometry { offset: usize, reason: String },
}
