//! 面积量算

use crate::crs::{Crs, UtmZone};
use crate::error::CoreError;
use crate::geometry::{Geometry, Polygon};
use crate::transform::Transform;

/// WGS84 面在其质心所在 UTM 带内的平面面积（平方米）
pub fn polygon_area_m2(polygon: &Polygon) -> Result<f64, CoreError> {
    // 闭合点不参与质心计算
    let ring = &polygon.exterior()[..polygon.exterior().len() - 1];
    let n = ring.len() as f64;
    let (lon, lat) = ring
        .iter()
        .fold((0.0, 0.0), |(x, y), p| (x + p.x / n, y + p.y / n));

    let zone = UtmZone::from_lon_lat(lon, lat);
    let transform = Transform::new(&Crs::wgs84(), &Crs::utm(zone))?;
    let projected = Polygon::new(transform.apply(polygon.exterior())?)?;
    Ok(projected.planar_area())
}

/// 任意几何的面积，点和线为 0
pub fn geometry_area_m2(geometry: &Geometry) -> Result<f64, CoreError> {
    match geometry {
        Geometry::Polygon(polygon) => polygon_area_m2(polygon),
        Geometry::Point(_) | Geometry::LineString(_) => Ok(0.0),
    }
}
