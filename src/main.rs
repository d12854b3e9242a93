use clap::Parser;
use log::{debug, info, warn};
use std::path::PathBuf;
use tsnap::mm::backend::{MapMatchingBackend, MatchContext, NetworkSource};
use tsnap::mm::fmm::FmmCli;
use tsnap::mm::import::{self, ImportFilter, TimeWindow};
use tsnap::mm::matcher;
use tsnap::mm::model::MatchConfig;
use tsnap::mm::segment::{self, SegmentConfig};
use tsnap::polygon;
use tsnap::provider::{self, CommandMapProvider, DownloadOptions, MapFiles};
use tsnap::render::{GeoJsonRenderer, MapStyle, PointStyle, Renderer};
use tsnap::utils;

/// UBODT 的距离上界, 约 3 公里
const UBODT_DELTA: f64 = 0.03;

#[derive(Parser, Debug)]
#[command(name = "tsnap")]
#[command(version = "0.1")]
#[command(about = "download a road network, clean gps trajectories and snap them with fmm", long_about = None)]
struct Args {
    /// directory of map files
    #[arg(long, default_value = "./")]
    file_directory: PathBuf,
    /// edge file used by fmm
    #[arg(long, default_value = "beijing_edge.geojson")]
    edge_name: String,
    /// road graph before simplify
    #[arg(long, default_value = "origin_beijing.bin")]
    origin_map_name: String,
    /// road graph after simplify
    #[arg(long, default_value = "beijing.bin")]
    map_name: String,
    /// ubodt file name
    #[arg(long, default_value = "beijing_ubodt.txt")]
    ubodt_name: String,
    /// skip downloading the map and reuse the saved files
    #[arg(long, default_value_t = false)]
    skip_download: bool,
    /// external map downloader
    #[arg(long, default_value = "fetch_osm_map")]
    downloader: PathBuf,
    /// fmm program
    #[arg(long, default_value = "fmm")]
    fmm: PathBuf,
    /// ubodt_gen program
    #[arg(long, default_value = "ubodt_gen")]
    ubodt_gen: PathBuf,
    /// number of candidates
    #[arg(short, long, default_value_t = 8)]
    k: usize,
    /// search radius
    #[arg(long, default_value_t = 100.0)]
    radius: f64,
    /// gps error
    #[arg(long, default_value_t = 50.0)]
    gps_error: f64,
    /// maximum duration between continuous points
    #[arg(long, default_value_t = 120)]
    duration: i64,
    /// minimum points of a trajectory to match
    #[arg(long, default_value_t = 10)]
    minimum_point_size: usize,
    /// begin of the time window
    #[arg(long)]
    time_begin: Option<i64>,
    /// end of the time window
    #[arg(long)]
    time_end: Option<i64>,
    /// rendered output of the matched trajectories
    #[arg(long, default_value = "beijing_matched.geojson")]
    output: PathBuf,
    /// input gps trajectory log
    #[arg(value_name = "GPS_LOG_FILE")]
    data_path: PathBuf,
}

fn main() -> anyhow::Result<()> {
    utils::log::log_init();
    let args = Args::parse();
    debug!("{:?}", args);

    // 1. 地图边界
    let polygon = polygon::beijing_second_ring()?;
    let files = MapFiles {
        directory: args.file_directory.clone(),
        edges_name: args.edge_name.clone(),
        origin_graph_name: args.origin_map_name.clone(),
        graph_name: args.map_name.clone(),
    };

    // 2. 下载地图
    if !args.skip_download {
        let map_provider =
            CommandMapProvider::new(args.downloader.clone(), args.file_directory.clone());
        provider::download_map(&map_provider, &polygon, &files, &DownloadOptions::default())?;
        info!("map download complete.");
    }

    // 3. 绘制简化前后的路网
    let origin_graph = provider::load_map(&files.directory, &files.origin_graph_name)?;
    let mut origin_renderer = GeoJsonRenderer::new("Beijing");
    origin_renderer.draw_map(&origin_graph, &MapStyle::default())?;
    origin_renderer.save(files.directory.join("origin_beijing.geojson"))?;
    let graph = provider::load_map(&files.directory, &files.graph_name)?;
    let mut renderer = GeoJsonRenderer::new("Beijing");
    renderer.draw_map(&graph, &MapStyle::default())?;

    // 4. 导入并切分轨迹
    let filter = ImportFilter::default()
        .with_window(TimeWindow::from_bounds(args.time_begin, args.time_end))
        .with_polygon(&polygon);
    let car_traj = import::import_file(&args.data_path, &filter)?;
    let segment_cfg = SegmentConfig {
        max_gap: args.duration,
        min_points: args.minimum_point_size,
        ..SegmentConfig::default()
    };
    let points_group: Vec<_> = car_traj
        .values()
        .flat_map(|points| segment::segment(points, &segment_cfg))
        .collect();
    info!("{} trajectories to match", points_group.len());

    // 5. 准备匹配需要的路网与 UBODT
    let backend = FmmCli {
        fmm_program: args.fmm.clone(),
        ubodt_gen_program: args.ubodt_gen.clone(),
        ..FmmCli::default()
    };
    let network = backend.build_network(&NetworkSource::new(files.edges_path()))?;
    let road_graph = backend.build_graph(&network)?;
    let ubodt_path = files.directory.join(&args.ubodt_name);
    backend.build_routing_table(&network, &road_graph, &ubodt_path, UBODT_DELTA)?;
    let ubodt = backend.load_routing_table(&ubodt_path)?;
    let ctx = MatchContext::<FmmCli>::new(&network, &road_graph, &ubodt);
    let match_cfg = MatchConfig {
        k: args.k,
        radius: args.radius,
        gps_error: args.gps_error,
    };

    // 6. 匹配, 失败的轨迹跳过
    let mut points_with_opath = Vec::new();
    let mut fix_trajectory = Vec::new();
    for (index, points) in points_group.iter().enumerate() {
        match matcher::match_points(&backend, &ctx, points.to_vec(), &match_cfg) {
            Ok(matched) => {
                points_with_opath.extend(matched.points);
                fix_trajectory.extend(matched.geometry);
            }
            Err(e) => {
                let vehicle = points.first().map_or("", |p| p.vehicle_id.as_str());
                warn!("skip trajectory {} of {}: {}", index, vehicle, e);
            }
        }
    }
    info!(
        "matched {} points, {} corrected points",
        points_with_opath.len(),
        fix_trajectory.len()
    );

    // 7. 绘制修正后的轨迹
    let style = PointStyle {
        color: "red".to_string(),
        alpha: 1.0,
        markersize: 10.0,
    };
    renderer.draw_points(&fix_trajectory, &style)?;
    renderer.save(&args.output)?;
    Ok(())
}
