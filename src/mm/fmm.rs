use super::backend::{MapMatchingBackend, MatchContext, NetworkSource};
use super::model::{CheckOutcome, MatchConfig, MatchResponse};
use super::polyline;
use anyhow::Result;
use log::{debug, info, warn};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::Command;
use uuid::Uuid;

/**
 * 通过 FMM 命令行工具 (ubodt_gen, fmm) 完成 UBODT 生成与地图匹配
 */
#[derive(Debug, Clone)]
pub struct FmmCli {
    pub fmm_program: PathBuf,
    pub ubodt_gen_program: PathBuf,
    pub work_dir: PathBuf, // 临时gps文件与结果文件所在目录
    pub use_omp: bool,
}

impl Default for FmmCli {
    fn default() -> Self {
        FmmCli {
            fmm_program: PathBuf::from("fmm"),
            ubodt_gen_program: PathBuf::from("ubodt_gen"),
            work_dir: std::env::temp_dir(),
            use_omp: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FmmNetwork {
    pub source: NetworkSource,
}

/// 路网图由 fmm 在内部构建
#[derive(Debug, Clone, Copy)]
pub struct FmmGraph;

#[derive(Debug, Clone)]
pub struct FmmUbodt {
    pub path: PathBuf,
}

impl FmmCli {
    fn run(&self, program: &Path, args: &[String]) -> Result<()> {
        debug!("run {} {}", program.display(), args.join(" "));
        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|e| anyhow::anyhow!("run {} failed: {}", program.display(), e))?;
        if !output.status.success() {
            return Err(anyhow::anyhow!(
                "{} exited with {}: {}",
                program.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }
        Ok(())
    }

    fn network_args(network: &FmmNetwork) -> Vec<String> {
        let columns = &network.source.columns;
        vec![
            "--network".to_string(),
            network.source.path.display().to_string(),
            "--network_id".to_string(),
            columns.id.clone(),
            "--source".to_string(),
            columns.source.clone(),
            "--target".to_string(),
            columns.target.clone(),
        ]
    }

    pub fn ubodt_args(&self, network: &FmmNetwork, output: &Path, delta: f64) -> Vec<String> {
        let mut args = FmmCli::network_args(network);
        args.extend([
            "--output".to_string(),
            output.display().to_string(),
            "--delta".to_string(),
            delta.to_string(),
        ]);
        if self.use_omp {
            args.push("--use_omp".to_string());
        }
        args
    }

    pub fn match_args(
        &self,
        network: &FmmNetwork,
        ubodt: &FmmUbodt,
        gps: &Path,
        output: &Path,
        cfg: &MatchConfig,
    ) -> Vec<String> {
        let mut args = vec!["--ubodt".to_string(), ubodt.path.display().to_string()];
        args.extend(FmmCli::network_args(network));
        args.extend([
            "--gps".to_string(),
            gps.display().to_string(),
            "--gps_id".to_string(),
            "id".to_string(),
            "--gps_geom".to_string(),
            "geom".to_string(),
            "-k".to_string(),
            cfg.k.to_string(),
            "-r".to_string(),
            cfg.radius.to_string(),
            "-e".to_string(),
            cfg.gps_error.to_string(),
            "--output".to_string(),
            output.display().to_string(),
            "--output_fields".to_string(),
            "opath,mgeom".to_string(),
        ]);
        args
    }

    // 前缀的匹配结果是否覆盖全部点
    fn matches_prefix(
        &self,
        ctx: &MatchContext<Self>,
        coords: &[(f64, f64)],
        cfg: &MatchConfig,
    ) -> Result<bool> {
        let wkt = polyline::points_to_linestring(coords.iter().copied());
        let response = self.match_polyline(ctx, &wkt, cfg)?;
        Ok(response.o_path.len() == coords.len())
    }
}

/// 查找能完整匹配的最长前缀, matches(len) 判断前 len 个点能否完整匹配
/// 假设前缀可匹配性单调: 能匹配的前缀, 其更短的前缀也能匹配
pub fn search_prefix<F>(n: usize, mut matches: F) -> Result<CheckOutcome>
where
    F: FnMut(usize) -> Result<bool>,
{
    if matches(n)? {
        return Ok(CheckOutcome::Full);
    }
    // lo: 已知可匹配的最长前缀 (1 表示尚未找到), hi: 已知不可匹配的最短前缀
    let (mut lo, mut hi) = (1, n);
    while hi > lo + 1 {
        let mid = (lo + hi) / 2;
        if matches(mid)? {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    if lo < 2 {
        warn!("no matchable prefix in {} points", n);
        return Err(anyhow::anyhow!("no matchable prefix in {} points", n));
    }
    Ok(CheckOutcome::BreakAt(lo - 1))
}

/// 写入 fmm 的 gps 输入文件, 分隔符为 ;
pub fn write_gps_file(path: &Path, polyline: &str) -> Result<()> {
    let mut writer = csv::WriterBuilder::new().delimiter(b';').from_path(path)?;
    writer.write_record(["id", "geom"])?;
    writer.write_record(["1", polyline])?;
    writer.flush()?;
    Ok(())
}

/// 解析 fmm 输出 (id;opath;mgeom), 未匹配时 opath 为空
pub fn parse_output<R: Read>(reader: R) -> Result<MatchResponse> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .flexible(true)
        .from_reader(reader);
    let headers = reader.headers()?.clone();
    let position = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| anyhow::anyhow!("fmm output has no {} column", name))
    };
    let (opath_index, mgeom_index) = (position("opath")?, position("mgeom")?);
    let record = match reader.records().next() {
        Some(record) => record?,
        None => return Err(anyhow::anyhow!("fmm output is empty")),
    };
    let opath = record.get(opath_index).unwrap_or("").trim();
    let o_path = if opath.is_empty() {
        vec![]
    } else {
        opath
            .split(',')
            .map(|id| {
                id.trim()
                    .parse::<i64>()
                    .map_err(|e| anyhow::anyhow!("bad edge id {:?}: {}", id, e))
            })
            .collect::<Result<Vec<_>>>()?
    };
    Ok(MatchResponse {
        o_path,
        mgeom: record.get(mgeom_index).unwrap_or("").trim().to_string(),
    })
}

impl MapMatchingBackend for FmmCli {
    type Network = FmmNetwork;
    type Graph = FmmGraph;
    type RoutingTable = FmmUbodt;

    fn build_network(&self, source: &NetworkSource) -> Result<FmmNetwork> {
        if !source.path.exists() {
            return Err(anyhow::anyhow!(
                "network file {} not found",
                source.path.display()
            ));
        }
        info!("use road network {}", source.path.display());
        Ok(FmmNetwork {
            source: source.clone(),
        })
    }

    fn build_graph(&self, _network: &FmmNetwork) -> Result<FmmGraph> {
        Ok(FmmGraph)
    }

    fn build_routing_table(
        &self,
        network: &FmmNetwork,
        _graph: &FmmGraph,
        output: &Path,
        delta: f64,
    ) -> Result<()> {
        info!("generate ubodt {} with delta {}", output.display(), delta);
        self.run(&self.ubodt_gen_program, &self.ubodt_args(network, output, delta))
    }

    fn load_routing_table(&self, path: &Path) -> Result<FmmUbodt> {
        if !path.exists() {
            return Err(anyhow::anyhow!("ubodt file {} not found", path.display()));
        }
        Ok(FmmUbodt {
            path: path.to_path_buf(),
        })
    }

    /// 命令行没有检查接口, 用二分查找能完整匹配的最长前缀
    fn check_match(
        &self,
        ctx: &MatchContext<Self>,
        polyline: &str,
        cfg: &MatchConfig,
    ) -> Result<CheckOutcome> {
        let coords: Vec<(f64, f64)> = polyline::parse_linestring(polyline)?
            .iter()
            .map(|p| (p.x(), p.y()))
            .collect();
        search_prefix(coords.len(), |len| self.matches_prefix(ctx, &coords[..len], cfg))
    }

    fn match_polyline(
        &self,
        ctx: &MatchContext<Self>,
        polyline: &str,
        cfg: &MatchConfig,
    ) -> Result<MatchResponse> {
        let run_id = Uuid::new_v4();
        let gps = self.work_dir.join(format!("gps-{}.csv", run_id));
        let output = self.work_dir.join(format!("mr-{}.csv", run_id));
        write_gps_file(&gps, polyline)?;
        let args = self.match_args(ctx.network, ctx.routing_table, &gps, &output, cfg);
        let result = self
            .run(&self.fmm_program, &args)
            .and_then(|_| parse_output(fs::File::open(&output)?));
        let _ = fs::remove_file(&gps);
        let _ = fs::remove_file(&output);
        result
    }
}
