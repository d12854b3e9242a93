use super::backend::{MapMatchingBackend, MatchContext};
use super::model::{CheckOutcome, MatchConfig, MatchError, MatchedTrajectory};
use super::polyline;
use super::speed;
use super::traj::Trajectory;
use log::debug;

/// 匹配一条轨迹
/// 轨迹不连续时引擎只能匹配一个前缀, 此时分多次调用匹配
pub fn match_points<B: MapMatchingBackend>(
    backend: &B,
    ctx: &MatchContext<B>,
    points: Trajectory,
    cfg: &MatchConfig,
) -> Result<MatchedTrajectory, MatchError> {
    if points.is_empty() {
        return Err(MatchError::EmptyTrajectory);
    }
    let mut result = MatchedTrajectory::default();
    let mut remaining = points;
    let mut offset = 0;
    while !remaining.is_empty() {
        let wkt = polyline::to_linestring(&remaining);
        let outcome =
            backend
                .check_match(ctx, &wkt, cfg)
                .map_err(|e| MatchError::CheckFailed {
                    offset,
                    reason: format!("{:#}", e),
                })?;
        let take = match outcome {
            CheckOutcome::Full => remaining.len(),
            CheckOutcome::BreakAt(index) if index < remaining.len() => index + 1,
            CheckOutcome::BreakAt(index) => {
                return Err(MatchError::InvalidBoundary {
                    index,
                    remaining: remaining.len(),
                })
            }
        };
        let rest = remaining.split_off(take);
        let chunk_wkt = if rest.is_empty() {
            wkt
        } else {
            polyline::to_linestring(&remaining)
        };
        debug!(
            "match {} points at offset {}, {} left",
            remaining.len(),
            offset,
            rest.len()
        );
        match_chunk(backend, ctx, remaining, &chunk_wkt, cfg, offset, &mut result)?;
        offset += take;
        remaining = rest;
    }
    Ok(result)
}

fn match_chunk<B: MapMatchingBackend>(
    backend: &B,
    ctx: &MatchContext<B>,
    mut chunk: Trajectory,
    wkt: &str,
    cfg: &MatchConfig,
    offset: usize,
    result: &mut MatchedTrajectory,
) -> Result<(), MatchError> {
    let response = backend
        .match_polyline(ctx, wkt, cfg)
        .map_err(|e| MatchError::MatchFailed {
            offset,
            reason: format!("{:#}", e),
        })?;
    if response.o_path.is_empty() {
        return Err(MatchError::Unmatched {
            offset,
            len: chunk.len(),
        });
    }
    if response.o_path.len() != chunk.len() {
        return Err(MatchError::LengthMismatch {
            offset,
            expected: chunk.len(),
            got: response.o_path.len(),
        });
    }
    let geometry =
        polyline::parse_linestring(&response.mgeom).map_err(|e| MatchError::Geometry {
            offset,
            reason: format!("{:#}", e),
        })?;
    for (point, edge) in chunk.iter_mut().zip(response.o_path) {
        point.matched_edge = Some(edge);
    }
    speed::estimate_speed(&mut chunk);
    result.points.extend(chunk);
    result.geometry.extend(geometry);
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::mm::backend::NetworkSource;
    use crate::mm::model::MatchResponse;
    use crate::mm::traj::GeoPoint;
    use std::cell::RefCell;
    use std::path::Path;

    /// 按脚本返回检查结果, 匹配时每个点返回其经度取整后的edge
    struct ScriptedBackend {
        checks: RefCell<Vec<anyhow::Result<CheckOutcome>>>,
        matched: RefCell<Vec<usize>>,
        unmatched: bool,
        reply: Option<MatchResponse>, // 固定返回的匹配结果
    }

    impl ScriptedBackend {
        fn new(checks: Vec<anyhow::Result<CheckOutcome>>) -> Self {
            ScriptedBackend {
                checks: RefCell::new(checks.into_iter().rev().collect()),
                matched: RefCell::new(vec![]),
                unmatched: false,
                reply: None,
            }
        }
    }

    impl MapMatchingBackend for ScriptedBackend {
        type Network = ();
        type Graph = ();
        type RoutingTable = ();

        fn build_network(&self, _source: &NetworkSource) -> anyhow::Result<()> {
            Ok(())
        }

        fn build_graph(&self, _network: &()) -> anyhow::Result<()> {
            Ok(())
        }

        fn build_routing_table(&self, _: &(), _: &(), _: &Path, _: f64) -> anyhow::Result<()> {
            Ok(())
        }

        fn load_routing_table(&self, _path: &Path) -> anyhow::Result<()> {
            Ok(())
        }

        fn check_match(
            &self,
            _ctx: &MatchContext<Self>,
            _polyline: &str,
            _cfg: &MatchConfig,
        ) -> anyhow::Result<CheckOutcome> {
            self.checks
                .borrow_mut()
                .pop()
                .unwrap_or_else(|| Err(anyhow::anyhow!("script exhausted")))
        }

        fn match_polyline(
            &self,
            _ctx: &MatchContext<Self>,
            polyline: &str,
            _cfg: &MatchConfig,
        ) -> anyhow::Result<MatchResponse> {
            let points = polyline::parse_linestring(polyline)?;
            self.matched.borrow_mut().push(points.len());
            if let Some(reply) = &self.reply {
                return Ok(reply.clone());
            }
            if self.unmatched {
                return Ok(MatchResponse {
                    o_path: vec![],
                    mgeom: "LINESTRING()".to_string(),
                });
            }
            Ok(MatchResponse {
                o_path: points.iter().map(|p| p.x().round() as i64).collect(),
                mgeom: polyline.to_string(),
            })
        }
    }

    fn points(n: usize) -> Trajectory {
        (0..n)
            .map(|i| GeoPoint::new("A", i as f64, 0.0, i as i64 * 10))
            .collect()
    }

    fn run(backend: &ScriptedBackend, pts: Trajectory) -> Result<MatchedTrajectory, MatchError> {
        let ctx = MatchContext::<ScriptedBackend>::new(&(), &(), &());
        match_points(backend, &ctx, pts, &MatchConfig::default())
    }

    #[test]
    fn test_full_match() {
        let backend = ScriptedBackend::new(vec![Ok(CheckOutcome::Full)]);
        let result = run(&backend, points(4)).unwrap();
        assert_eq!(*backend.matched.borrow(), vec![4]);
        let edges: Vec<Option<i64>> = result.points.iter().map(|p| p.matched_edge).collect();
        assert_eq!(edges, vec![Some(0), Some(1), Some(2), Some(3)]);
        assert_eq!(result.geometry.len(), 4);
        assert!(result.points[0].speed > 0.0);
    }

    #[test]
    fn test_partial_matches() {
        let backend = ScriptedBackend::new(vec![
            Ok(CheckOutcome::BreakAt(1)),
            Ok(CheckOutcome::BreakAt(2)),
            Ok(CheckOutcome::Full),
        ]);
        let result = run(&backend, points(7)).unwrap();
        assert_eq!(*backend.matched.borrow(), vec![2, 3, 2]);
        let edges: Vec<i64> = result.points.iter().filter_map(|p| p.matched_edge).collect();
        assert_eq!(edges, vec![0, 1, 2, 3, 4, 5, 6]);
        assert_eq!(result.geometry.len(), 7);
    }

    #[test]
    fn test_break_at_last_index_stops() {
        let backend = ScriptedBackend::new(vec![Ok(CheckOutcome::BreakAt(2))]);
        let result = run(&backend, points(3)).unwrap();
        assert_eq!(result.points.len(), 3);
        assert_eq!(*backend.matched.borrow(), vec![3]);
    }

    #[test]
    fn test_failures() {
        let backend = ScriptedBackend::new(vec![]);
        assert!(matches!(run(&backend, vec![]), Err(MatchError::EmptyTrajectory)));

        let backend = ScriptedBackend::new(vec![Ok(CheckOutcome::BreakAt(5))]);
        assert!(matches!(
            run(&backend, points(3)),
            Err(MatchError::InvalidBoundary { index: 5, remaining: 3 })
        ));

        let backend = ScriptedBackend::new(vec![
            Ok(CheckOutcome::BreakAt(0)),
            Err(anyhow::anyhow!("boom")),
        ]);
        match run(&backend, points(3)) {
            Err(MatchError::CheckFailed { offset, reason }) => {
                assert_eq!(offset, 1);
                assert!(reason.contains("boom"));
            }
            other => panic!("unexpected {:?}", other),
        }

        let mut backend = ScriptedBackend::new(vec![Ok(CheckOutcome::Full)]);
        backend.unmatched = true;
        assert!(matches!(
            run(&backend, points(3)),
            Err(MatchError::Unmatched { offset: 0, len: 3 })
        ));
    }

    #[test]
    fn test_short_opath() {
        let mut backend = ScriptedBackend::new(vec![Ok(CheckOutcome::Full)]);
        backend.reply = Some(MatchResponse {
            o_path: vec![7, 7],
            mgeom: "LINESTRING(0 0,1 0)".to_string(),
        });
        assert!(matches!(
            run(&backend, points(3)),
            Err(MatchError::LengthMismatch {
                offset: 0,
                expected: 3,
                got: 2
            })
        ));
    }

    #[test]
    fn test_bad_geometry() {
        let mut backend =
            ScriptedBackend::new(vec![Ok(CheckOutcome::BreakAt(0)), Ok(CheckOutcome::Full)]);
        backend.reply = Some(MatchResponse {
            o_path: vec![1],
            mgeom: "LINESTRING(0 north)".to_string(),
        });
        match run(&backend, points(2)) {
            Err(MatchError::Geometry { offset, reason }) => {
                assert_eq!(offset, 0);
                assert!(reason.contains("north"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_speed_per_chunk() {
        let backend =
            ScriptedBackend::new(vec![Ok(CheckOutcome::BreakAt(1)), Ok(CheckOutcome::Full)]);
        let mut pts = points(4);
        // 第二段首个点与前一段最后一个点时间相同不影响第二段
        pts[2].time = pts[1].time;
        let result = run(&backend, pts).unwrap();
        // 第二段第一个点使用到下一个点的速度
        assert!(result.points[2].speed > 0.0);
        assert_eq!(result.points[1].speed, result.points[0].speed);
    }
}
