use super::network::RoadNetwork;
use anyhow::Result;
use log::{debug, info};
use petgraph::graph::{Graph, NodeIndex};
use petgraph::Directed;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

pub struct RoadGraph {
    pub network: RoadNetwork,
    graph: Graph<usize, usize, Directed, usize>, // node 权重为 node 索引, edge 权重为 edge 索引
}

impl RoadGraph {
    pub fn new(network: RoadNetwork) -> Self {
        debug!("start construct graph...");
        let node_size = network.nodes.len();
        let edge_size = network.edges.len();
        debug!("node size: {}, edge size: {}", node_size, edge_size);
        let mut graph = Graph::with_capacity(node_size, edge_size);
        // 添加node
        for index in 0..node_size {
            graph.add_node(index);
        }
        // 添加edge
        for (index, edge) in network.edges.iter().enumerate() {
            let from = network.find_node_by_id(&edge.from);
            let to = network.find_node_by_id(&edge.to);
            if let (Some(from), Some(to)) = (from, to) {
                graph.add_edge(NodeIndex::new(from), NodeIndex::new(to), index);
            }
        }
        debug!("finish construct road network graph...");
        RoadGraph { network, graph }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// 弱连通分量个数
    pub fn component_count(&self) -> usize {
        petgraph::algo::connected_components(&self.graph)
    }

    /// 节点坐标, 取关联 edge 端点的坐标
    pub fn node_positions(&self) -> Vec<Option<[f64; 2]>> {
        let mut positions = vec![None; self.network.nodes.len()];
        for edge in &self.network.edges {
            let ends = [
                (&edge.from, edge.geometry.first()),
                (&edge.to, edge.geometry.last()),
            ];
            for (node, coord) in ends {
                if let (Some(index), Some(coord)) = (self.network.find_node_by_id(node), coord) {
                    positions[index].get_or_insert(*coord);
                }
            }
        }
        positions
    }

    pub fn log_summary(&self, name: &str) {
        info!(
            "{}: the number of nodes is {}, the number of edges is {}, {} components",
            name,
            self.node_count(),
            self.edge_count(),
            self.component_count()
        );
    }

    /// 以 bincode 持久化路网, 加载时重建图
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let mut writer = BufWriter::new(File::create(path)?);
        bincode::serde::encode_into_std_write(
            &self.network,
            &mut writer,
            bincode::config::standard(),
        )?;
        writer.flush()?;
        debug!("save road graph to {}", path.display());
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!("loading road graph from : {}", path.display());
        let file = File::open(path)
            .map_err(|e| anyhow::anyhow!("open road graph {} failed: {}", path.display(), e))?;
        let mut reader = BufReader::new(file);
        let network: RoadNetwork =
            bincode::serde::decode_from_std_read(&mut reader, bincode::config::standard())?;
        Ok(RoadGraph::new(network))
    }
}
