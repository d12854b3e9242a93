use super::model::{CheckOutcome, MatchConfig, MatchResponse};
use crate::graph::NetworkColumns;
use anyhow::Result;
use std::path::{Path, PathBuf};

/// 路网文件以及 edge id / 起点 / 终点 的字段名
#[derive(Debug, Clone)]
pub struct NetworkSource {
    pub path: PathBuf,
    pub columns: NetworkColumns,
}

impl NetworkSource {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        NetworkSource {
            path: path.into(),
            columns: NetworkColumns::default(),
        }
    }
}

/// 匹配时需要的路网、图和 UBODT 句柄
pub struct MatchContext<'a, B: MapMatchingBackend + ?Sized> {
    pub network: &'a B::Network,
    pub graph: &'a B::Graph,
    pub routing_table: &'a B::RoutingTable,
}

impl<'a, B: MapMatchingBackend + ?Sized> MatchContext<'a, B> {
    pub fn new(
        network: &'a B::Network,
        graph: &'a B::Graph,
        routing_table: &'a B::RoutingTable,
    ) -> Self {
        MatchContext {
            network,
            graph,
            routing_table,
        }
    }
}

/// 外部地图匹配引擎
/// 路网、图和 UBODT 由引擎持有, 对流水线是不透明的
pub trait MapMatchingBackend {
    type Network;
    type Graph;
    type RoutingTable;

    fn build_network(&self, source: &NetworkSource) -> Result<Self::Network>;

    fn build_graph(&self, network: &Self::Network) -> Result<Self::Graph>;

    /// 生成 UBODT 文件, delta 为距离上界
    fn build_routing_table(
        &self,
        network: &Self::Network,
        graph: &Self::Graph,
        output: &Path,
        delta: f64,
    ) -> Result<()>;

    fn load_routing_table(&self, path: &Path) -> Result<Self::RoutingTable>;

    fn check_match(
        &self,
        ctx: &MatchContext<Self>,
        polyline: &str,
        cfg: &MatchConfig,
    ) -> Result<CheckOutcome>;

    fn match_polyline(
        &self,
        ctx: &MatchContext<Self>,
        polyline: &str,
        cfg: &MatchConfig,
    ) -> Result<MatchResponse>;
}
