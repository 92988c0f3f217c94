//! GeoJSON 读写
//!
//! 解析输入的 GeoJSON 文档为要素集合，或将要素集合序列化为
//! `{"type": "FeatureCollection", "features": [...]}`。
//! 面只保留外环，多部件几何不支持。

use crate::error::ExchangeError;
use geojson::feature::Id;
use geojson::{GeoJson, JsonObject, Value};
use geoport_core::crs::Crs;
use geoport_core::feature::{Attributes, Feature, FeatureCollection, FeatureId};
use geoport_core::geometry::{Geometry, GeometryType, LineString, Polygon};
use geoport_core::math::Point2;

/// 解析结果：要素集合 + 文档内嵌的坐标系（旧版 `crs` 成员）
#[derive(Debug, Clone)]
pub struct ParsedGeoJson {
    pub collection: FeatureCollection,
    pub embedded_crs: Option<Crs>,
}

/// 解析 GeoJSON 文本为要素集合
pub fn parse(raw: &str) -> Result<FeatureCollection, ExchangeError> {
    parse_document(raw).map(|parsed| parsed.collection)
}

/// 解析 GeoJSON 文本，同时读取内嵌坐标系
pub fn parse_document(raw: &str) -> Result<ParsedGeoJson, ExchangeError> {
    let document = raw
        .parse::<GeoJson>()
        .map_err(|e| ExchangeError::BadInput(format!("Invalid GeoJSON: {e}")))?;

    let (features, foreign_members) = match document {
        GeoJson::FeatureCollection(fc) => (fc.features, fc.foreign_members),
        GeoJson::Feature(feature) => (vec![feature], None),
        GeoJson::Geometry(geometry) => (vec![geojson::Feature::from(geometry)], None),
    };

    if features.is_empty() {
        return Err(ExchangeError::BadInput("No features found.".to_string()));
    }

    let total = features.len();
    let mut collection = Vec::with_capacity(total);
    for (index, feature) in features.into_iter().enumerate() {
        let Some(geometry) = &feature.geometry else {
            tracing::warn!(index, "skipping feature with null geometry");
            continue;
        };
        let geometry = convert_geometry(&geometry.value)
            .map_err(|e| ExchangeError::BadInput(format!("Feature {index}: {e}")))?;

        let attributes = feature
            .properties
            .as_ref()
            .map(Attributes::from_json)
            .unwrap_or_default();

        let id = match &feature.id {
            Some(Id::String(s)) => FeatureId::Key(s.clone()),
            Some(Id::Number(n)) => FeatureId::Key(n.to_string()),
            None => FeatureId::Index(index),
        };

        collection.push(Feature::new(id, geometry).with_attributes(attributes));
    }

    if collection.is_empty() {
        return Err(ExchangeError::BadInput(
            "All features have null geometry.".to_string(),
        ));
    }

    let embedded_crs = foreign_members.as_ref().and_then(embedded_crs);
    tracing::debug!(
        features = collection.len(),
        skipped = total - collection.len(),
        crs = ?embedded_crs,
        "parsed GeoJSON"
    );

    Ok(ParsedGeoJson {
        collection: FeatureCollection::new(collection),
        embedded_crs,
    })
}

/// 校验要素集合；`require_homogeneous` 时要求几何类型一致
pub fn validate(
    collection: &FeatureCollection,
    require_homogeneous: bool,
) -> Result<Option<GeometryType>, ExchangeError> {
    if collection.is_empty() {
        return Err(ExchangeError::BadInput("No features found.".to_string()));
    }
    if require_homogeneous {
        return Ok(Some(collection.ensure_homogeneous()?));
    }
    Ok(collection.geometry_type())
}

/// 序列化为 GeoJSON 文本
pub fn serialize(collection: &FeatureCollection) -> Result<String, ExchangeError> {
    serde_json::to_string(&to_geojson(collection)).map_err(ExchangeError::codec)
}

/// 序列化为 JSON 值（嵌入到响应中使用）
pub fn to_value(collection: &FeatureCollection) -> serde_json::Value {
    serde_json::to_value(to_geojson(collection)).unwrap_or(serde_json::Value::Null)
}

/// 转换为 geojson 模型
pub fn to_geojson(collection: &FeatureCollection) -> geojson::FeatureCollection {
    let features = collection
        .iter()
        .map(|feature| geojson::Feature {
            bbox: None,
            geometry: Some(geojson::Geometry::new(geometry_value(&feature.geometry))),
            id: match &feature.id {
                FeatureId::Index(_) => None,
                FeatureId::Key(key) => Some(match key.parse::<i64>() {
                    Ok(n) => Id::Number(n.into()),
                    Err(_) => Id::String(key.clone()),
                }),
            },
            properties: Some(feature.attributes.to_json()),
            foreign_members: None,
        })
        .collect();

    geojson::FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

fn geometry_value(geometry: &Geometry) -> Value {
    let position = |p: &Point2| vec![p.x, p.y];
    match geometry {
        Geometry::Point(p) => Value::Point(position(p)),
        Geometry::LineString(line) => Value::LineString(line.coords().iter().map(position).collect()),
        Geometry::Polygon(polygon) => {
            Value::Polygon(vec![polygon.exterior().iter().map(position).collect()])
        }
    }
}

/// 不支持的几何类型提示
pub fn unsupported_geometry_message(type_name: &str) -> String {
    format!(
        "Unsupported geometry type: {type_name}. Only Point, LineString and Polygon are supported"
    )
}

fn convert_geometry(value: &Value) -> Result<Geometry, ExchangeError> {
    match value {
        Value::Point(position) => Ok(Geometry::Point(to_point(position)?)),
        Value::LineString(positions) => {
            let coords = to_points(positions)?;
            Ok(Geometry::LineString(LineString::new(coords)?))
        }
        Value::Polygon(rings) => {
            let exterior = rings
                .first()
                .ok_or_else(|| ExchangeError::BadInput("Polygon has no rings".to_string()))?;
            if rings.len() > 1 {
                tracing::warn!(
                    holes = rings.len() - 1,
                    "dropping interior rings, only the exterior ring is kept"
                );
            }
            Ok(Geometry::Polygon(Polygon::new(to_points(exterior)?)?))
        }
        Value::MultiPoint(_) => Err(ExchangeError::BadInput(unsupported_geometry_message("MultiPoint"))),
        Value::MultiLineString(_) => Err(ExchangeError::BadInput(unsupported_geometry_message(
            "MultiLineString",
        ))),
        Value::MultiPolygon(_) => Err(ExchangeError::BadInput(unsupported_geometry_message(
            "MultiPolygon",
        ))),
        Value::GeometryCollection(_) => Err(ExchangeError::BadInput(
            unsupported_geometry_message("GeometryCollection"),
        )),
    }
}

fn to_point(position: &[f64]) -> Result<Point2, ExchangeError> {
    match position {
        [x, y, ..] if x.is_finite() && y.is_finite() => Ok(Point2::new(*x, *y)),
        _ => Err(ExchangeError::BadInput(format!(
            "Invalid position: {position:?}"
        ))),
    }
}

fn to_points(positions: &[Vec<f64>]) -> Result<Vec<Point2>, ExchangeError> {
    positions.iter().map(|p| to_point(p)).collect()
}

/// 读取旧版 `crs` 成员：`{"type": "name", "properties": {"name": "EPSG:32636"}}`
fn embedded_crs(members: &JsonObject) -> Option<Crs> {
    let name = members
        .get("crs")?
        .get("properties")?
        .get("name")?
        .as_str()?;

    match Crs::from_name(name) {
        Ok(crs) => Some(crs),
        Err(e) => {
            tracing::warn!(name, error = %e, "ignoring unrecognized embedded CRS");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geoport_core::feature::AttributeValue;
    use serde_json::json;

    fn collection_json(features: serde_json::Value) -> String {
        json!({ "type": "FeatureCollection", "features": features }).to_string()
    }

    #[test]
    fn test_parse_point_with_properties() {
        let raw = collection_json(json!([{
            "type": "Feature",
            "id": "field-7",
            "geometry": { "type": "Point", "coordinates": [32.85, 39.93] },
            "properties": { "name": "Ankara", "area": 12.5, "crop": null }
        }]));

        let collection = parse(&raw).unwrap();
        assert_eq!(collection.len(), 1);

        let feature = &collection.features[0];
        assert_eq!(feature.id, FeatureId::Key("field-7".to_string()));
        assert_eq!(feature.geometry, Geometry::point(32.85, 39.93));
        assert_eq!(
            feature.attributes.get("name"),
            Some(&AttributeValue::String("Ankara".to_string()))
        );
        assert_eq!(feature.attributes.get("area"), Some(&AttributeValue::Float(12.5)));
        assert!(feature.attributes.get("crop").is_none());
    }

    #[test]
    fn test_parse_closes_polygon_and_drops_holes() {
        let raw = collection_json(json!([{
            "type": "Feature",
            "geometry": {
                "type": "Polygon",
                "coordinates": [
                    [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]],
                    [[0.2, 0.2], [0.4, 0.2], [0.4, 0.4], [0.2, 0.2]]
                ]
            },
            "properties": {}
        }]));

        let collection = parse(&raw).unwrap();
        let coords = collection.features[0].geometry.coords();
        assert_eq!(coords.len(), 5);
        assert_eq!(coords[0], coords[4]);
    }

    #[test]
    fn test_parse_rejects_invalid_json() {
        let err = parse("{not json").unwrap_err();
        assert!(matches!(err, ExchangeError::BadInput(_)));
    }

    #[test]
    fn test_parse_rejects_empty_collection() {
        let err = parse(&collection_json(json!([]))).unwrap_err();
        assert_eq!(err.to_string(), "No features found.");
    }

    #[test]
    fn test_parse_rejects_all_null_geometries() {
        let raw = collection_json(json!([
            { "type": "Feature", "geometry": null, "properties": {} },
            { "type": "Feature", "geometry": null, "properties": {} }
        ]));
        assert!(matches!(parse(&raw), Err(ExchangeError::BadInput(_))));
    }

    #[test]
    fn test_parse_skips_some_null_geometries() {
        let raw = collection_json(json!([
            { "type": "Feature", "geometry": null, "properties": {} },
            { "type": "Feature", "geometry": { "type": "Point", "coordinates": [1.0, 2.0] }, "properties": {} }
        ]));
        let collection = parse(&raw).unwrap();
        assert_eq!(collection.len(), 1);
        assert_eq!(collection.features[0].id, FeatureId::Index(1));
    }

    #[test]
    fn test_parse_rejects_multi_geometry() {
        let raw = collection_json(json!([{
            "type": "Feature",
            "geometry": { "type": "MultiPoint", "coordinates": [[1.0, 2.0], [3.0, 4.0]] },
            "properties": {}
        }]));
        let err = parse(&raw).unwrap_err();
        assert!(err.to_string().contains("Unsupported geometry type: MultiPoint"));
    }

    #[test]
    fn test_embedded_crs() {
        let raw = json!({
            "type": "FeatureCollection",
            "crs": { "type": "name", "properties": { "name": "urn:ogc:def:crs:EPSG::32636" } },
            "features": [{
                "type": "Feature",
                "geometry": { "type": "Point", "coordinates": [500000.0, 4420000.0] },
                "properties": {}
            }]
        })
        .to_string();

        let parsed = parse_document(&raw).unwrap();
        assert_eq!(parsed.embedded_crs.and_then(|c| c.epsg()), Some(32636));
    }

    #[test]
    fn test_validate_homogeneity_is_optional() {
        let raw = collection_json(json!([
            { "type": "Feature", "geometry": { "type": "Point", "coordinates": [1.0, 2.0] }, "properties": {} },
            { "type": "Feature", "geometry": { "type": "LineString", "coordinates": [[0.0, 0.0], [1.0, 1.0]] }, "properties": {} }
        ]));
        let collection = parse(&raw).unwrap();

        assert_eq!(validate(&collection, false).unwrap(), None);
        let err = validate(&collection, true).unwrap_err();
        assert_eq!(err.to_string(), "All features must have the same geometry type");
    }

    #[test]
    fn test_serialize_shape() {
        let raw = collection_json(json!([{
            "type": "Feature",
            "id": 3,
            "geometry": { "type": "Polygon", "coordinates": [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]] },
            "properties": { "name": "plot" }
        }]));
        let collection = parse(&raw).unwrap();

        let value: serde_json::Value = serde_json::from_str(&serialize(&collection).unwrap()).unwrap();
        assert_eq!(value["type"], "FeatureCollection");
        assert_eq!(value["features"][0]["id"], 3);
        assert_eq!(value["features"][0]["geometry"]["type"], "Polygon");
        assert_eq!(
            value["features"][0]["geometry"]["coordinates"][0][0],
            json!([0.0, 0.0])
        );
        assert_eq!(value["features"][0]["properties"]["name"], "plot");
    }
}
