use super::traj::GeoPoint;
use anyhow::Result;
use geo::Point;

const PREFIX_LEN: usize = "LINESTRING(".len();

/// 把轨迹点转换为 LINESTRING(lng lat,lng lat,...)
pub fn to_linestring(points: &[GeoPoint]) -> String {
    points_to_linestring(points.iter().map(|p| (p.longitude, p.latitude)))
}

pub fn points_to_linestring<I: IntoIterator<Item = (f64, f64)>>(coords: I) -> String {
    let coords: Vec<String> = coords
        .into_iter()
        .map(|(lng, lat)| format!("{} {}", lng, lat))
        .collect();
    format!("LINESTRING({})", coords.join(","))
}

/// 解析匹配结果的几何, 去掉固定的 11 个字符前缀和最后一个字符
pub fn parse_linestring(wkt: &str) -> Result<Vec<Point<f64>>> {
    let body = match wkt.len().checked_sub(1) {
        Some(end) if end >= PREFIX_LEN => wkt.get(PREFIX_LEN..end).unwrap_or(""),
        _ => return Ok(vec![]),
    };
    let mut points = Vec::new();
    for coord in body.split(',') {
        let parts: Vec<&str> = coord.split_whitespace().collect();
        if parts.len() != 2 {
            continue;
        }
        let lng: f64 = parts[0]
            .parse()
            .map_err(|e| anyhow::anyhow!("bad longitude {:?}: {}", parts[0], e))?;
        let lat: f64 = parts[1]
            .parse()
            .map_err(|e| anyhow::anyhow!("bad latitude {:?}: {}", parts[1], e))?;
        points.push(Point::new(lng, lat));
    }
    Ok(points)
}
