use crate::graph::{NetworkColumns, RoadGraph, RoadNetwork};
use crate::polygon::BoundaryPolygon;
use anyhow::Result;
use geojson::GeoJson;
use log::{debug, info};
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::process::Command;

pub const DEFAULT_CUSTOM_FILTER: &str = r#"["highway"~"motorway|trunk|primary|secondary|tertiary"]"#;

#[derive(Debug, Clone)]
pub struct DownloadOptions {
    pub simplify: bool,
    pub custom_filter: Option<String>, // 设置后 way_type 不生效
    pub way_type: Option<String>,
    pub consolidate: bool,
    pub tolerance: f64, // 合并路口的距离 米
    pub drop_minor_edges: bool,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        DownloadOptions {
            simplify: true,
            custom_filter: Some(DEFAULT_CUSTOM_FILTER.to_string()),
            way_type: Some("drive".to_string()),
            consolidate: true,
            tolerance: 48.0,
            drop_minor_edges: true,
        }
    }
}

impl DownloadOptions {
    pub fn validate(&self) -> Result<()> {
        if self.custom_filter.is_none() && self.way_type.is_none() {
            return Err(anyhow::anyhow!(
                "custom_filter and way_type cannot both be None"
            ));
        }
        Ok(())
    }
}

/// 地图文件的保存位置
#[derive(Debug, Clone)]
pub struct MapFiles {
    pub directory: PathBuf,
    pub edges_name: String,
    pub origin_graph_name: String, // 简化前的路网
    pub graph_name: String,        // 简化后的路网
}

impl MapFiles {
    pub fn edges_path(&self) -> PathBuf {
        self.directory.join(&self.edges_name)
    }

    pub fn origin_graph_path(&self) -> PathBuf {
        self.directory.join(&self.origin_graph_name)
    }

    pub fn graph_path(&self) -> PathBuf {
        self.directory.join(&self.graph_name)
    }
}

/// 外部下载得到的两份路网 edge
pub struct FetchedMap {
    pub origin: GeoJson,
    pub simplified: GeoJson,
}

/// 下载、简化、合并路口都由外部完成
pub trait MapProvider {
    fn fetch(&self, polygon: &BoundaryPolygon, opts: &DownloadOptions) -> Result<FetchedMap>;
}

/// 调用外部下载程序, 程序把两份 geojson 写到指定位置
#[derive(Debug, Clone)]
pub struct CommandMapProvider {
    pub program: PathBuf,
    pub work_dir: PathBuf,
}

impl CommandMapProvider {
    pub fn new<P: Into<PathBuf>>(program: P, work_dir: P) -> Self {
        CommandMapProvider {
            program: program.into(),
            work_dir: work_dir.into(),
        }
    }

    pub fn args(
        &self,
        polygon: &BoundaryPolygon,
        opts: &DownloadOptions,
        origin: &Path,
        simplified: &Path,
    ) -> Vec<String> {
        let mut args = vec![
            "--polygon".to_string(),
            polygon.to_wkt(),
            "--output-origin".to_string(),
            origin.display().to_string(),
            "--output-simplified".to_string(),
            simplified.display().to_string(),
        ];
        match (&opts.custom_filter, &opts.way_type) {
            (Some(filter), _) => args.extend(["--custom-filter".to_string(), filter.clone()]),
            (None, Some(way_type)) => args.extend(["--network-type".to_string(), way_type.clone()]),
            (None, None) => {}
        }
        if opts.simplify {
            args.push("--simplify".to_string());
        }
        if opts.consolidate {
            args.extend([
                "--consolidate".to_string(),
                "--tolerance".to_string(),
                opts.tolerance.to_string(),
            ]);
        }
        args
    }
}

fn read_geojson(path: &Path) -> Result<GeoJson> {
    let file = File::open(path)
        .map_err(|e| anyhow::anyhow!("open {} failed: {}", path.display(), e))?;
    Ok(GeoJson::from_reader(BufReader::new(file))?)
}

impl MapProvider for CommandMapProvider {
    fn fetch(&self, polygon: &BoundaryPolygon, opts: &DownloadOptions) -> Result<FetchedMap> {
        let origin = self.work_dir.join("origin_edges.geojson");
        let simplified = self.work_dir.join("simplified_edges.geojson");
        let args = self.args(polygon, opts, &origin, &simplified);
        debug!("run {} {}", self.program.display(), args.join(" "));
        let output = Command::new(&self.program)
            .args(&args)
            .output()
            .map_err(|e| anyhow::anyhow!("run {} failed: {}", self.program.display(), e))?;
        if !output.status.success() {
            return Err(anyhow::anyhow!(
                "{} exited with {}: {}",
                self.program.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }
        Ok(FetchedMap {
            origin: read_geojson(&origin)?,
            simplified: read_geojson(&simplified)?,
        })
    }
}

/// 下载并保存地图
/// 保存简化前的路网、供匹配使用的 edge 文件以及简化后的路网
pub fn download_map<M: MapProvider>(
    provider: &M,
    polygon: &BoundaryPolygon,
    files: &MapFiles,
    opts: &DownloadOptions,
) -> Result<()> {
    opts.validate()?;
    let fetched = provider.fetch(polygon, opts)?;
    let columns = NetworkColumns::default();

    let origin = RoadGraph::new(RoadNetwork::from_geojson(fetched.origin, &columns)?);
    origin.log_summary("before simplify");
    origin.save(files.origin_graph_path())?;

    let mut network = RoadNetwork::from_geojson(fetched.simplified, &columns)?;
    network.renumber_edges();
    info!("convert edge id complete.");
    fs::write(files.edges_path(), network.to_geojson(&columns).to_string())?;
    info!("save edge file {} complete.", files.edges_path().display());
    if opts.drop_minor_edges {
        let dropped = network.drop_minor_edges();
        debug!("drop {} minor edges", dropped);
    }
    let graph = RoadGraph::new(network);
    graph.log_summary("after simplify");
    graph.save(files.graph_path())?;
    info!("save road graph {} complete.", files.graph_path().display());
    Ok(())
}

pub fn load_map<P: AsRef<Path>>(directory: P, name: &str) -> Result<RoadGraph> {
    let graph = RoadGraph::load(directory.as_ref().join(name))?;
    graph.log_summary(name);
    Ok(graph)
}
