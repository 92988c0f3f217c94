//! 要素集合与CAD图纸互转
//!
//! 导出：在所有坐标质心所在的 UTM 带内投影，并在图纸原点放置
//! `UTM_ZONE=<带号><半球>` 文本标记。
//!
//! 导入：读取该标记并反投影回 WGS84。没有标记时返回空集合，
//! 不尝试启发式识别。导入永不失败，所有错误都变成诊断信息。

use crate::config::ExchangeConfig;
use crate::drawing::{CadDrawing, CadEntity, CadPoint, CadPolyline, CadText};
use crate::error::ExchangeError;
use geoport_core::crs::{Crs, UtmZone};
use geoport_core::feature::{Feature, FeatureCollection, FeatureId};
use geoport_core::geometry::{close_ring, is_closed, Geometry, LineString, Polygon};
use geoport_core::math::{points_approx_eq, Point2};
use geoport_core::transform::Transform;
use serde::Serialize;

/// 导出结果
#[derive(Debug, Clone)]
pub struct ExportedDrawing {
    pub drawing: CadDrawing,
    pub zone: UtmZone,
}

/// 要素集合 → CAD图纸
pub fn features_to_drawing(
    collection: &FeatureCollection,
    config: &ExchangeConfig,
) -> Result<ExportedDrawing, ExchangeError> {
    let centroid = collection
        .centroid()
        .unwrap_or_else(|| config.default_centroid.to_point());
    let zone = UtmZone::from_lon_lat(centroid.x, centroid.y);
    let transform = Transform::new(&Crs::wgs84(), &Crs::utm(zone))?;

    let mut drawing = CadDrawing::new();
    drawing.add_entity(CadEntity::Text(CadText::zone_marker(zone, config.text_height)));

    for feature in collection.iter() {
        let projected = feature
            .geometry
            .try_map_coords(|coords| transform.apply(coords))?;

        let entity = match projected {
            Geometry::Point(location) => CadEntity::Point(CadPoint { location }),
            Geometry::LineString(line) => {
                CadEntity::Polyline(CadPolyline::open(line.coords().to_vec()))
            }
            Geometry::Polygon(polygon) => {
                CadEntity::Polyline(CadPolyline::open(close_ring(polygon.exterior())))
            }
        };
        drawing.add_entity(entity);
    }

    tracing::info!(
        features = collection.len(),
        zone = %zone,
        "built CAD drawing"
    );
    Ok(ExportedDrawing { drawing, zone })
}

/// CAD导入结果：要素集合 + 可选诊断信息
#[derive(Debug, Clone, Default)]
pub struct CadImport {
    pub collection: FeatureCollection,
    pub zone: Option<UtmZone>,
    pub diagnostic: Option<String>,
}

/// 导入响应 `{ "geojson": FeatureCollection, "error"?: string }`
#[derive(Debug, Clone, Serialize)]
pub struct ImportResponse {
    pub geojson: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CadImport {
    /// 空结果 + 诊断
    pub fn failed(diagnostic: impl Into<String>) -> Self {
        Self {
            diagnostic: Some(diagnostic.into()),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.collection.is_empty()
    }

    pub fn to_response(&self) -> ImportResponse {
        ImportResponse {
            geojson: crate::geojson_io::to_value(&self.collection),
            error: self.diagnostic.clone(),
        }
    }
}

/// CAD图纸 → 要素集合（WGS84）
pub fn drawing_to_features(drawing: &CadDrawing) -> CadImport {
    let Some(zone) = drawing.zone_marker() else {
        tracing::warn!("no UTM_ZONE marker in drawing, returning empty result");
        return CadImport::failed("No UTM_ZONE marker found in drawing");
    };

    match convert_entities(drawing, zone) {
        Ok(collection) => {
            tracing::info!(features = collection.len(), zone = %zone, "imported CAD drawing");
            CadImport {
                collection,
                zone: Some(zone),
                diagnostic: None,
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "CAD import failed, returning empty result");
            CadImport {
                zone: Some(zone),
                ..CadImport::failed(e.to_string())
            }
        }
    }
}

fn convert_entities(drawing: &CadDrawing, zone: UtmZone) -> Result<FeatureCollection, ExchangeError> {
    let transform = Transform::new(&Crs::utm(zone), &Crs::wgs84())?;
    let mut features = Vec::new();

    for entity in drawing.entities() {
        let geometry = match entity {
            CadEntity::Point(point) => Geometry::Point(transform.apply_one(point.location)?),
            CadEntity::Polyline(polyline) => match classify_polyline(polyline) {
                Some(PolylineShape::Ring(ring)) => {
                    Geometry::Polygon(Polygon::new(transform.apply(&ring)?)?)
                }
                Some(PolylineShape::Line(coords)) => {
                    Geometry::LineString(LineString::new(transform.apply(&coords)?)?)
                }
                None => {
                    tracing::debug!(
                        vertices = polyline.point_count(),
                        "skipping degenerate polyline"
                    );
                    continue;
                }
            },
            CadEntity::Text(_) => continue,
        };
        features.push(Feature::new(FeatureId::Index(features.len()), geometry));
    }

    Ok(FeatureCollection::new(features))
}

#[derive(Debug, Clone, PartialEq)]
enum PolylineShape {
    /// 已闭合的环（至少4个坐标）
    Ring(Vec<Point2>),
    Line(Vec<Point2>),
}

/// 闭合（闭合标志或首尾相同）且至少3个不同顶点的多段线视为面，
/// 环补齐闭合点后至少4个坐标；其余视为线。少于2个顶点返回 None。
fn classify_polyline(polyline: &CadPolyline) -> Option<PolylineShape> {
    let vertices = &polyline.vertices;
    let explicitly_closed = is_closed(vertices);
    let open_part = if explicitly_closed {
        &vertices[..vertices.len() - 1]
    } else {
        &vertices[..]
    };

    // 相邻重复顶点不计入不同顶点
    let mut distinct: Vec<Point2> = Vec::with_capacity(open_part.len());
    for vertex in open_part {
        if !distinct.last().is_some_and(|last| points_approx_eq(last, vertex)) {
            distinct.push(*vertex);
        }
    }
    if distinct.len() > 1 && points_approx_eq(&distinct[0], &distinct[distinct.len() - 1]) {
        distinct.pop();
    }

    if (polyline.closed || explicitly_closed) && distinct.len() >= 3 {
        return Some(PolylineShape::Ring(close_ring(&distinct)));
    }
    (vertices.len() >= 2).then(|| PolylineShape::Line(vertices.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use geoport_core::geometry::GeometryType;

    fn single(geometry: Geometry) -> FeatureCollection {
        FeatureCollection::new(vec![Feature::new(FeatureId::Index(0), geometry)])
    }

    #[test]
    fn test_point_roundtrip() {
        let collection = single(Geometry::point(32.85, 39.93));
        let exported = features_to_drawing(&collection, &ExchangeConfig::default()).unwrap();
        assert_eq!(exported.zone.to_string(), "36N");

        let imported = drawing_to_features(&exported.drawing);
        assert!(imported.diagnostic.is_none());
        assert_eq!(imported.collection.len(), 1);

        let Geometry::Point(p) = imported.collection.features[0].geometry else {
            panic!("expected point");
        };
        assert_abs_diff_eq!(p.x, 32.85, epsilon = 1e-6);
        assert_abs_diff_eq!(p.y, 39.93, epsilon = 1e-6);
    }

    #[test]
    fn test_export_layout() {
        let polygon = Polygon::new(vec![
            Point2::new(32.80, 39.90),
            Point2::new(32.90, 39.90),
            Point2::new(32.90, 39.95),
        ])
        .unwrap();
        let collection = single(Geometry::Polygon(polygon));
        let exported = features_to_drawing(&collection, &ExchangeConfig::default()).unwrap();

        let entities = exported.drawing.entities();
        assert_eq!(entities.len(), 2);
        match &entities[0] {
            CadEntity::Text(text) => {
                assert_eq!(text.value, "UTM_ZONE=36N");
                assert_eq!(text.location, Point2::origin());
            }
            other => panic!("expected marker, got {}", other.type_name()),
        }
        match &entities[1] {
            CadEntity::Polyline(polyline) => {
                assert_eq!(polyline.point_count(), 4);
                assert!(is_closed(&polyline.vertices));
                assert!(polyline.vertices[0].x > 100_000.0);
            }
            other => panic!("expected polyline, got {}", other.type_name()),
        }
    }

    #[test]
    fn test_empty_collection_uses_default_centroid() {
        let exported =
            features_to_drawing(&FeatureCollection::default(), &ExchangeConfig::default()).unwrap();
        assert_eq!(exported.zone.to_string(), "36N");
        assert_eq!(exported.drawing.entity_count(), 1);
    }

    #[test]
    fn test_southern_centroid() {
        let collection = single(Geometry::point(-47.9, -15.8));
        let exported = features_to_drawing(&collection, &ExchangeConfig::default()).unwrap();
        assert_eq!(exported.zone.to_string(), "23S");

        let imported = drawing_to_features(&exported.drawing);
        let Geometry::Point(p) = imported.collection.features[0].geometry else {
            panic!("expected point");
        };
        assert_abs_diff_eq!(p.y, -15.8, epsilon = 1e-6);
    }

    #[test]
    fn test_missing_marker_yields_empty_result() {
        let mut drawing = CadDrawing::new();
        drawing.add_entity(CadEntity::Point(CadPoint {
            location: Point2::new(500_000.0, 4_400_000.0),
        }));

        let imported = drawing_to_features(&drawing);
        assert!(imported.is_empty());
        assert!(imported.zone.is_none());
        assert!(imported.diagnostic.is_some());
    }

    #[test]
    fn test_three_vertex_closed_polyline_padded() {
        let zone: UtmZone = "36N".parse().unwrap();
        let mut drawing = CadDrawing::new();
        drawing.add_entity(CadEntity::Text(CadText::zone_marker(zone, 1.0)));
        drawing.add_entity(CadEntity::Polyline(CadPolyline {
            vertices: vec![
                Point2::new(500_000.0, 4_400_000.0),
                Point2::new(500_100.0, 4_400_000.0),
                Point2::new(500_100.0, 4_400_100.0),
            ],
            closed: true,
        }));

        let imported = drawing_to_features(&drawing);
        let geometry = &imported.collection.features[0].geometry;
        assert_eq!(geometry.geometry_type(), GeometryType::Polygon);
        assert_eq!(geometry.coords().len(), 4);
    }

    #[test]
    fn test_polyline_classification() {
        let a = Point2::new(0.0, 0.0);
        let b = Point2::new(1.0, 0.0);
        let c = Point2::new(1.0, 1.0);

        let explicit = CadPolyline::open(vec![a, b, c, a]);
        assert_eq!(
            classify_polyline(&explicit),
            Some(PolylineShape::Ring(vec![a, b, c, a]))
        );

        let open = CadPolyline::open(vec![a, b, c]);
        assert_eq!(classify_polyline(&open), Some(PolylineShape::Line(vec![a, b, c])));

        // 只有两个不同顶点的闭合线不能构成面
        let degenerate = CadPolyline::open(vec![a, b, a]);
        assert_eq!(
            classify_polyline(&degenerate),
            Some(PolylineShape::Line(vec![a, b, a]))
        );

        assert_eq!(classify_polyline(&CadPolyline::open(vec![a])), None);
    }

    #[test]
    fn test_duplicate_vertices_not_polygon() {
        let a = Point2::new(0.0, 0.0);
        let b = Point2::new(1.0, 0.0);
        let c = Point2::new(1.0, 1.0);

        let repeated = CadPolyline::open(vec![a, b, b, a]);
        assert_eq!(
            classify_polyline(&repeated),
            Some(PolylineShape::Line(vec![a, b, b, a]))
        );

        let flagged = CadPolyline {
            vertices: vec![a, a, b, b],
            closed: true,
        };
        assert!(matches!(classify_polyline(&flagged), Some(PolylineShape::Line(_))));

        // 重复顶点被去除后仍有3个不同顶点
        let padded = CadPolyline::open(vec![a, b, b, c, a]);
        assert_eq!(
            classify_polyline(&padded),
            Some(PolylineShape::Ring(vec![a, b, c, a]))
        );

        let zone: UtmZone = "36N".parse().unwrap();
        let mut drawing = CadDrawing::new();
        drawing.add_entity(CadEntity::Text(CadText::zone_marker(zone, 1.0)));
        let p = |x: f64, y: f64| Point2::new(500_000.0 + x, 4_400_000.0 + y);
        drawing.add_entity(CadEntity::Polyline(CadPolyline::open(vec![
            p(0.0, 0.0),
            p(100.0, 0.0),
            p(100.0, 0.0),
            p(0.0, 0.0),
        ])));

        let imported = drawing_to_features(&drawing);
        let geometry = &imported.collection.features[0].geometry;
        assert_eq!(geometry.geometry_type(), GeometryType::LineString);
    }

    #[test]
    fn test_response_shape() {
        let response = CadImport::failed("corrupt drawing").to_response();
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["geojson"]["type"], "FeatureCollection");
        assert_eq!(value["geojson"]["features"].as_array().unwrap().len(), 0);
        assert_eq!(value["error"], "corrupt drawing");

        let ok = CadImport::default().to_response();
        let value = serde_json::to_value(&ok).unwrap();
        assert!(value.get("error").is_none());
    }
}
