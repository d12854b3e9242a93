use anyhow::Result;
use geo::{Contains, Geometry, Point, Polygon};

/// 北京二环的边界
const BEIJING_SECOND_RING: &str = "POLYGON((116.304 39.867, 116.308 39.857, 116.319 39.847, \
116.34 39.847, 116.365 39.855, 116.393 39.855, 116.443 39.857, 116.456 39.866, 116.457 39.899, \
116.457 39.952, 116.431 39.969, 116.314 39.967, 116.302 39.962, 116.303 39.942, 116.304 39.867))";

/// 由经纬度顶点构成的闭合边界, 只用于点包含判断
#[derive(Debug, Clone)]
pub struct BoundaryPolygon {
    polygon: Polygon<f64>,
}

impl BoundaryPolygon {
    pub fn from_wkt(content: &str) -> Result<Self> {
        let wkt: wkt::Wkt<f64> = content
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("parse polygon wkt failed: {}", e))?;
        let geometry: Geometry<f64> = wkt
            .item
            .try_into()
            .map_err(|e| anyhow::anyhow!("convert polygon wkt failed: {:?}", e))?;
        match geometry {
            Geometry::Polygon(polygon) => Ok(BoundaryPolygon { polygon }),
            _ => Err(anyhow::anyhow!("wkt only support POLYGON")),
        }
    }

    /// contains 语义: 边界上的点不算在内
    pub fn contains(&self, lng: f64, lat: f64) -> bool {
        self.polygon.contains(&Point::new(lng, lat))
    }

    pub fn exterior(&self) -> Vec<(f64, f64)> {
        self.polygon.exterior().coords().map(|c| (c.x, c.y)).collect()
    }

    pub fn to_wkt(&self) -> String {
        let ring: Vec<String> = self
            .exterior()
            .iter()
            .map(|(x, y)| format!("{} {}", x, y))
            .collect();
        format!("POLYGON(({}))", ring.join(","))
    }
}

pub fn beijing_second_ring() -> Result<BoundaryPolygon> {
    BoundaryPolygon::from_wkt(BEIJING_SECOND_RING)
}

#[cfg(test)]
mod test {
    use super::*;

    fn unit_square() -> BoundaryPolygon {
        BoundaryPolygon::from_wkt("POLYGON((0 0, 10 0, 10 10, 0 10, 0 0))").unwrap()
    }

    #[test]
    fn test_beijing_ring() {
        let ring = beijing_second_ring().unwrap();
        assert_eq!(ring.exterior().len(), 15);
        // 天安门
        assert!(ring.contains(116.3975, 39.9087));
        assert!(!ring.contains(116.5, 39.9));
    }

    #[test]
    fn test_boundary_excluded() {
        let square = unit_square();
        assert!(square.contains(5.0, 5.0));
        assert!(!square.contains(10.0, 5.0));
        assert!(!square.contains(0.0, 0.0));
        assert!(!square.contains(10.5, 5.0));
    }

    #[test]
    fn test_wkt_round_trip() {
        let square = unit_square();
        let again = BoundaryPolygon::from_wkt(&square.to_wkt()).unwrap();
        assert_eq!(square.exterior(), again.exterior());
    }

    #[test]
    fn test_reject_non_polygon() {
        assert!(BoundaryPolygon::from_wkt("LINESTRING(0 0, 1 1)").is_err());
        assert!(BoundaryPolygon::from_wkt("not wkt").is_err());
    }
}
