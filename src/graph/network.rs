use crate::algorithm;
use anyhow::Result;
use geojson::{Feature, FeatureCollection, GeoJson, Geometry, JsonObject, JsonValue, Value};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/**
 * @file network.rs
 * 定义路网信息结构体
 * 从geojson中读取路网信息, 并存储在内存中。
 */

/// 保留的主要道路等级
pub const MAJOR_HIGHWAYS: [&str; 5] = ["motorway", "trunk", "primary", "secondary", "tertiary"];

/// edge 文件中 edge id / 起点 / 终点 的字段名
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkColumns {
    pub id: String,
    pub source: String,
    pub target: String,
}

impl Default for NetworkColumns {
    fn default() -> Self {
        NetworkColumns {
            id: "fid".to_string(),
            source: "u".to_string(),
            target: "v".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoadNetwork {
    edges_index: HashMap<i64, usize>,    // edge的id对应的索引
    nodes_index: HashMap<String, usize>, // node的id对应的索引
    pub edges: Vec<Edge>,                // 所有的edge
    pub nodes: Vec<String>,              // 所有的node
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: i64,                   // edge的id
    pub from: String,              // edge的起点
    pub to: String,                // edge的终点
    pub length: f64,               // edge的长度 米制单位
    pub highway: Option<String>,   // 道路等级
    pub geometry: Vec<[f64; 2]>,   // edge的几何信息
}

impl Edge {
    pub fn new(
        id: i64,
        from: &str,
        to: &str,
        highway: Option<&str>,
        geometry: Vec<[f64; 2]>,
    ) -> Self {
        Edge {
            id,
            from: from.to_string(),
            to: to.to_string(),
            length: algorithm::linestring_distance(&geometry),
            highway: highway.map(|h| h.to_string()),
            geometry,
        }
    }

    pub fn is_major(&self) -> bool {
        self.highway
            .as_deref()
            .map_or(false, |h| MAJOR_HIGHWAYS.contains(&h))
    }
}

// 节点id 可能是整数也可能是字符串
fn node_id(value: Option<&JsonValue>, name: &str) -> Result<String> {
    match value {
        Some(JsonValue::String(s)) => Ok(s.clone()),
        Some(JsonValue::Number(n)) => Ok(n.to_string()),
        _ => Err(anyhow::anyhow!("property {} is missing or not an id", name)),
    }
}

// 整数形式的node id 写回为数字
fn node_value(id: &str) -> JsonValue {
    match id.parse::<i64>() {
        Ok(n) if n.to_string() == id => JsonValue::from(n),
        _ => JsonValue::from(id),
    }
}

fn edge_id(value: Option<&JsonValue>, name: &str) -> Result<i64> {
    match value {
        Some(JsonValue::Number(n)) => n
            .as_i64()
            .ok_or_else(|| anyhow::anyhow!("property {} is not an integer", name)),
        Some(JsonValue::String(s)) => s
            .parse()
            .map_err(|e| anyhow::anyhow!("property {} is not an integer: {}", name, e)),
        _ => Err(anyhow::anyhow!("property {} is missing", name)),
    }
}

// osm 中 highway 可能是列表, 取第一个
fn highway(value: Option<&JsonValue>) -> Option<String> {
    match value {
        Some(JsonValue::String(s)) => Some(s.clone()),
        Some(JsonValue::Array(items)) => items
            .first()
            .and_then(|v| v.as_str())
            .map(|s| s.to_string()),
        _ => None,
    }
}

impl RoadNetwork {
    pub fn from_geojson(value: GeoJson, columns: &NetworkColumns) -> Result<Self> {
        let mut network = RoadNetwork::default();
        let feature_collection = match value {
            GeoJson::FeatureCollection(fc) => fc,
            _ => return Err(anyhow::anyhow!("not a feature collection")),
        };
        for feature in feature_collection.features {
            let geometry = match feature.geometry.map(|g| g.value) {
                Some(Value::LineString(line)) => line
                    .into_iter()
                    .filter(|p| p.len() >= 2)
                    .map(|p| [p[0], p[1]])
                    .collect::<Vec<_>>(),
                _ => return Err(anyhow::anyhow!("geometry is not linestring")),
            };
            let properties = feature.properties.unwrap_or_default();
            let id = edge_id(properties.get(&columns.id), &columns.id)?;
            let from = node_id(properties.get(&columns.source), &columns.source)?;
            let to = node_id(properties.get(&columns.target), &columns.target)?;
            let highway = highway(properties.get("highway"));
            let edge = Edge::new(id, &from, &to, highway.as_deref(), geometry);
            if network.edges_index.contains_key(&edge.id) {
                continue;
            }
            network.add_edge(edge)?;
        }
        Ok(network)
    }

    pub fn to_geojson(&self, columns: &NetworkColumns) -> GeoJson {
        let features = self
            .edges
            .iter()
            .map(|edge| {
                let mut properties = JsonObject::new();
                properties.insert(columns.id.clone(), JsonValue::from(edge.id));
                properties.insert(columns.source.clone(), node_value(&edge.from));
                properties.insert(columns.target.clone(), node_value(&edge.to));
                properties.insert("length".to_string(), JsonValue::from(edge.length));
                if let Some(highway) = &edge.highway {
                    properties.insert("highway".to_string(), JsonValue::from(highway.clone()));
                }
                let line = edge.geometry.iter().map(|p| p.to_vec()).collect();
                Feature {
                    bbox: None,
                    geometry: Some(Geometry::new(Value::LineString(line))),
                    id: None,
                    properties: Some(properties),
                    foreign_members: None,
                }
            })
            .collect();
        GeoJson::FeatureCollection(FeatureCollection {
            bbox: None,
            features,
            foreign_members: None,
        })
    }

    pub fn find_edge_by_id(&self, id: i64) -> Option<&Edge> {
        self.edges_index.get(&id).map(|index| &self.edges[*index])
    }

    pub fn find_node_by_id(&self, id: &str) -> Option<usize> {
        self.nodes_index.get(id).copied()
    }

    /// 添加node, 已存在时返回原索引
    pub fn add_node(&mut self, node: &str) -> usize {
        if let Some(index) = self.nodes_index.get(node) {
            return *index;
        }
        self.nodes.push(node.to_string());
        self.nodes_index.insert(node.to_string(), self.nodes.len() - 1);
        self.nodes.len() - 1
    }

    /// 添加edge
    pub fn add_edge(&mut self, edge: Edge) -> Result<usize> {
        if self.edges_index.contains_key(&edge.id) {
            return Err(anyhow::anyhow!("edge {} already exists", edge.id));
        }
        self.add_node(&edge.from);
        self.add_node(&edge.to);
        self.edges_index.insert(edge.id, self.edges.len());
        self.edges.push(edge);
        Ok(self.edges.len() - 1)
    }

    /// 按顺序重新分配 edge id 0..n
    pub fn renumber_edges(&mut self) {
        self.edges_index.clear();
        for (index, edge) in self.edges.iter_mut().enumerate() {
            edge.id = index as i64;
            self.edges_index.insert(edge.id, index);
        }
    }

    /// 只保留 MAJOR_HIGHWAYS 中的道路, 返回删除的数量
    pub fn drop_minor_edges(&mut self) -> usize {
        let before = self.edges.len();
        let edges: Vec<Edge> = std::mem::take(&mut self.edges)
            .into_iter()
            .filter(|e| e.is_major())
            .collect();
        self.edges_index = edges
            .iter()
            .enumerate()
            .map(|(index, e)| (e.id, index))
            .collect();
        self.edges = edges;
        before - self.edges.len()
    }
}
