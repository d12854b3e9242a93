use crate::graph::RoadGraph;
use anyhow::Result;
use geojson::{Feature, FeatureCollection, GeoJson, Geometry, JsonObject, JsonValue, Value};
use log::info;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct MapStyle {
    pub edge_color: String,
    pub node_color: String,
    pub edge_linewidth: f64,
    pub node_size: f64,
}

impl Default for MapStyle {
    fn default() -> Self {
        MapStyle {
            edge_color: "gray".to_string(),
            node_color: "red".to_string(),
            edge_linewidth: 2.0,
            node_size: 3.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PointStyle {
    pub color: String,
    pub alpha: f64,
    pub markersize: f64,
}

pub trait Renderer {
    fn draw_map(&mut self, graph: &RoadGraph, style: &MapStyle) -> Result<()>;

    fn draw_points(&mut self, points: &[geo::Point<f64>], style: &PointStyle) -> Result<()>;
}

/// 把路网与轨迹点输出为 geojson, 样式使用 simplestyle 属性
pub struct GeoJsonRenderer {
    title: String,
    features: Vec<Feature>,
}

fn feature(value: Value, properties: JsonObject) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(Geometry::new(value)),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

fn point_properties(color: &str, size: f64, alpha: f64) -> JsonObject {
    let mut properties = JsonObject::new();
    properties.insert("marker-color".to_string(), JsonValue::from(color));
    properties.insert("marker-size".to_string(), JsonValue::from(size));
    properties.insert("fill-opacity".to_string(), JsonValue::from(alpha));
    properties
}

impl GeoJsonRenderer {
    pub fn new(title: &str) -> Self {
        GeoJsonRenderer {
            title: title.to_string(),
            features: vec![],
        }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn to_geojson(&self) -> GeoJson {
        let mut foreign_members = JsonObject::new();
        foreign_members.insert("title".to_string(), JsonValue::from(self.title.clone()));
        GeoJson::FeatureCollection(FeatureCollection {
            bbox: None,
            features: self.features.clone(),
            foreign_members: Some(foreign_members),
        })
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        fs::write(path, self.to_geojson().to_string())?;
        info!("save {} features to {}", self.features.len(), path.display());
        Ok(())
    }
}

impl Renderer for GeoJsonRenderer {
    fn draw_map(&mut self, graph: &RoadGraph, style: &MapStyle) -> Result<()> {
        for edge in &graph.network.edges {
            let mut properties = JsonObject::new();
            properties.insert("edge_id".to_string(), JsonValue::from(edge.id));
            properties.insert("stroke".to_string(), JsonValue::from(style.edge_color.clone()));
            properties.insert("stroke-width".to_string(), JsonValue::from(style.edge_linewidth));
            let line = edge.geometry.iter().map(|p| p.to_vec()).collect();
            self.features.push(feature(Value::LineString(line), properties));
        }
        for position in graph.node_positions().into_iter().flatten() {
            let properties = point_properties(&style.node_color, style.node_size, 1.0);
            self.features.push(feature(Value::Point(position.to_vec()), properties));
        }
        Ok(())
    }

    fn draw_points(&mut self, points: &[geo::Point<f64>], style: &PointStyle) -> Result<()> {
        for point in points {
            let properties = point_properties(&style.color, style.markersize, style.alpha);
            self.features
                .push(feature(Value::Point(vec![point.x(), point.y()]), properties));
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::graph::{Edge, RoadNetwork};

    fn graph() -> RoadGraph {
        let mut network = RoadNetwork::default();
        network
            .add_edge(Edge::new(0, "1", "2", Some("primary"), vec![[116.3, 39.9], [116.31, 39.9]]))
            .unwrap();
        RoadGraph::new(network)
    }

    #[test]
    fn test_draw_map() {
        let mut renderer = GeoJsonRenderer::new("Beijing");
        renderer.draw_map(&graph(), &MapStyle::default()).unwrap();
        // 一条edge 两个node
        assert_eq!(renderer.len(), 3);
        let text = renderer.to_geojson().to_string();
        assert!(text.contains("\"title\":\"Beijing\""));
        assert!(text.contains("\"stroke\":\"gray\""));
        assert!(text.contains("\"marker-color\":\"red\""));
    }

    #[test]
    fn test_draw_points() {
        let mut renderer = GeoJsonRenderer::new("points");
        let style = PointStyle {
            color: "red".to_string(),
            alpha: 1.0,
            markersize: 10.0,
        };
        renderer.draw_points(&[], &style).unwrap();
        assert!(renderer.is_empty());
        renderer
            .draw_points(&[geo::Point::new(116.4, 39.9)], &style)
            .unwrap();
        assert_eq!(renderer.len(), 1);

        let path = std::env::temp_dir().join(format!("{}.geojson", uuid::Uuid::new_v4()));
        renderer.save(&path).unwrap();
        let saved: GeoJson = fs::read_to_string(&path).unwrap().parse().unwrap();
        fs::remove_file(&path).unwrap();
        match saved {
            GeoJson::FeatureCollection(fc) => assert_eq!(fc.features.len(), 1),
            _ => panic!("not a feature collection"),
        }
    }
}
