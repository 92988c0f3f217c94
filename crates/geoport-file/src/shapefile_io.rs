//! Shapefile 导出
//!
//! 将几何类型一致的要素集合写为 `.shp/.shx/.dbf` 三件套和 `.prj`。
//! 不做重投影，`.prj` 始终描述 WGS84 地理坐标。

use crate::error::ExchangeError;
use crate::workspace::Workspace;
use chrono::Datelike;
use geoport_core::crs::Crs;
use geoport_core::feature::{AttributeValue, Attributes, FeatureCollection};
use geoport_core::geometry::{Geometry, GeometryType};
use shapefile::dbase::{self, FieldName, FieldValue, Record, TableWriterBuilder};
use std::path::{Path, PathBuf};

/// 导出文件基础名
pub const BASENAME: &str = "export";

/// 三件套 + 投影文件的扩展名（打包顺序）
pub const EXTENSIONS: [&str; 4] = ["shp", "shx", "dbf", "prj"];

/// dbf 字段名最大字节数
const MAX_FIELD_NAME: usize = 10;

/// dbf 字符字段最大宽度
const MAX_CHARACTER_WIDTH: usize = 254;

/// 导出结果
#[derive(Debug, Clone)]
pub struct ShapefileTriad {
    pub shp: Vec<u8>,
    pub shx: Vec<u8>,
    pub dbf: Vec<u8>,
    pub prj: Vec<u8>,
}

/// 在临时工作区中生成并读回全部文件
pub fn write(collection: &FeatureCollection) -> Result<ShapefileTriad, ExchangeError> {
    let workspace = Workspace::create(None)?;
    let [shp, shx, dbf, prj] = write_files(collection, workspace.path(), BASENAME)?;
    Ok(ShapefileTriad {
        shp: std::fs::read(shp)?,
        shx: std::fs::read(shx)?,
        dbf: std::fs::read(dbf)?,
        prj: std::fs::read(prj)?,
    })
}

/// 写入 `dir/<basename>.{shp,shx,dbf,prj}`，返回四个文件路径
pub fn write_files(
    collection: &FeatureCollection,
    dir: &Path,
    basename: &str,
) -> Result<[PathBuf; 4], ExchangeError> {
    if collection.is_empty() {
        return Err(ExchangeError::BadInput("No features found.".to_string()));
    }
    let geometry_type = collection.ensure_homogeneous()?;

    let rows = attribute_rows(collection);
    let schema = build_schema(&rows);
    let records: Vec<Record> = rows.iter().map(|row| build_record(&schema, row)).collect();

    let paths = EXTENSIONS.map(|ext| dir.join(format!("{basename}.{ext}")));
    let [shp_path, _, _, prj_path] = &paths;

    let mut builder = TableWriterBuilder::new();
    for field in &schema {
        let name = FieldName::try_from(field.name.as_str()).map_err(|e| {
            ExchangeError::CodecFailure(format!("invalid field name {:?}: {e:?}", field.name))
        })?;
        builder = match field.kind {
            FieldKind::Integer => builder.add_numeric_field(name, 18, 0),
            FieldKind::Float => builder.add_numeric_field(name, 24, 8),
            FieldKind::Logical => builder.add_logical_field(name),
            FieldKind::Date => builder.add_date_field(name),
            FieldKind::Character(width) => builder.add_character_field(name, width),
        };
    }

    let mut writer = shapefile::Writer::from_path(shp_path, builder).map_err(ExchangeError::codec)?;
    let mixed = || {
        ExchangeError::BadInput("All features must have the same geometry type".to_string())
    };

    let pairs = collection.iter().zip(&records);
    match geometry_type {
        GeometryType::Point => {
            for (feature, record) in pairs {
                let Geometry::Point(p) = &feature.geometry else {
                    return Err(mixed());
                };
                let shape = shapefile::Point::new(p.x, p.y);
                writer
                    .write_shape_and_record(&shape, record)
                    .map_err(ExchangeError::codec)?;
            }
        }
        GeometryType::LineString => {
            for (feature, record) in pairs {
                let Geometry::LineString(line) = &feature.geometry else {
                    return Err(mixed());
                };
                let shape = shapefile::Polyline::new(
                    line.coords()
                        .iter()
                        .map(|p| shapefile::Point::new(p.x, p.y))
                        .collect(),
                );
                writer
                    .write_shape_and_record(&shape, record)
                    .map_err(ExchangeError::codec)?;
            }
        }
        GeometryType::Polygon => {
            for (feature, record) in pairs {
                let Geometry::Polygon(polygon) = &feature.geometry else {
                    return Err(mixed());
                };
                let ring = polygon
                    .exterior()
                    .iter()
                    .map(|p| shapefile::Point::new(p.x, p.y))
                    .collect();
                let shape = shapefile::Polygon::new(shapefile::PolygonRing::Outer(ring));
                writer
                    .write_shape_and_record(&shape, record)
                    .map_err(ExchangeError::codec)?;
            }
        }
    }
    // 写入器在析构时回填文件头
    drop(writer);

    std::fs::write(prj_path, Crs::wgs84().wkt())?;

    tracing::info!(
        features = collection.len(),
        geometry = %geometry_type,
        fields = schema.len(),
        path = %shp_path.display(),
        "wrote shapefile"
    );
    Ok(paths)
}

/// 每个要素的属性行；没有任何属性时注入 `id = 位置 + 1`
pub fn attribute_rows(collection: &FeatureCollection) -> Vec<Attributes> {
    collection
        .iter()
        .enumerate()
        .map(|(position, feature)| {
            if feature.attributes.is_empty() {
                let mut row = Attributes::new();
                row.insert("id", AttributeValue::Integer(position as i64 + 1));
                row
            } else {
                feature.attributes.clone()
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldKind {
    Integer,
    Float,
    Logical,
    Date,
    Character(u8),
}

#[derive(Debug, Clone)]
struct FieldSpec {
    /// 属性名
    source: String,
    /// dbf 字段名
    name: String,
    kind: FieldKind,
}

fn value_kind(value: &AttributeValue) -> FieldKind {
    match value {
        AttributeValue::Integer(_) => FieldKind::Integer,
        AttributeValue::Float(_) => FieldKind::Float,
        AttributeValue::Boolean(_) => FieldKind::Logical,
        AttributeValue::Timestamp(_) => FieldKind::Date,
        AttributeValue::String(_) => FieldKind::Character(0),
    }
}

fn merge_kind(a: FieldKind, b: FieldKind) -> FieldKind {
    match (a, b) {
        (a, b) if a == b => a,
        (FieldKind::Integer, FieldKind::Float) | (FieldKind::Float, FieldKind::Integer) => {
            FieldKind::Float
        }
        _ => FieldKind::Character(0),
    }
}

/// 所有行的字段并集，按首次出现顺序
fn build_schema(rows: &[Attributes]) -> Vec<FieldSpec> {
    let mut fields: Vec<(String, FieldKind, usize)> = Vec::new();

    for row in rows {
        for (name, value) in row.iter() {
            let kind = value_kind(value);
            let width = value.to_string().len();
            match fields.iter_mut().find(|(n, _, _)| n == name) {
                Some((_, existing, max_width)) => {
                    *existing = merge_kind(*existing, kind);
                    *max_width = (*max_width).max(width);
                }
                None => fields.push((name.to_string(), kind, width)),
            }
        }
    }

    let mut used: Vec<String> = Vec::new();
    fields
        .into_iter()
        .map(|(source, kind, max_width)| {
            let kind = match kind {
                FieldKind::Character(_) => {
                    FieldKind::Character(max_width.clamp(1, MAX_CHARACTER_WIDTH) as u8)
                }
                other => other,
            };
            let name = unique_field_name(&source, &used);
            used.push(name.clone());
            FieldSpec { source, name, kind }
        })
        .collect()
}

fn truncate_bytes(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// 截断到 10 字节并去重（重名时追加 `_1`、`_2` ...）
fn unique_field_name(source: &str, used: &[String]) -> String {
    let base = truncate_bytes(source, MAX_FIELD_NAME);
    let base = if base.is_empty() { "field" } else { base };
    if !used.iter().any(|u| u == base) {
        return base.to_string();
    }

    (1..)
        .map(|i| {
            let suffix = format!("_{i}");
            format!(
                "{}{}",
                truncate_bytes(base, MAX_FIELD_NAME - suffix.len()),
                suffix
            )
        })
        .find(|candidate| !used.contains(candidate))
        .unwrap_or_else(|| base.to_string())
}

fn build_record(schema: &[FieldSpec], row: &Attributes) -> Record {
    let mut record = Record::default();
    for field in schema {
        let value = row.get(&field.source);
        record.insert(field.name.clone(), field_value(field.kind, value));
    }
    record
}

fn field_value(kind: FieldKind, value: Option<&AttributeValue>) -> FieldValue {
    match kind {
        FieldKind::Integer | FieldKind::Float => FieldValue::Numeric(value.and_then(|v| match v {
            AttributeValue::Integer(i) => Some(*i as f64),
            AttributeValue::Float(f) => Some(*f),
            _ => None,
        })),
        FieldKind::Logical => FieldValue::Logical(value.and_then(|v| match v {
            AttributeValue::Boolean(b) => Some(*b),
            _ => None,
        })),
        FieldKind::Date => FieldValue::Date(value.and_then(|v| match v {
            AttributeValue::Timestamp(ts) => Some(dbase::Date::new(ts.day(), ts.month(), ts.year() as u32)),
            _ => None,
        })),
        FieldKind::Character(width) => FieldValue::Character(
            value.map(|v| truncate_bytes(&v.to_string(), width as usize).to_string()),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geoport_core::feature::{Feature, FeatureId};
    use geoport_core::geometry::{LineString, Polygon};
    use geoport_core::math::Point2;

    fn point_feature(i: usize, attributes: Attributes) -> Feature {
        Feature::new(FeatureId::Index(i), Geometry::point(30.0 + i as f64, 40.0))
            .with_attributes(attributes)
    }

    fn read_points(dir: &Path) -> Vec<(shapefile::Point, Record)> {
        shapefile::read_as::<_, shapefile::Point, Record>(dir.join("export.shp")).unwrap()
    }

    #[test]
    fn test_injects_id_when_no_attributes() {
        let collection = FeatureCollection::new(vec![
            point_feature(0, Attributes::new()),
            point_feature(1, Attributes::new()),
        ]);

        let rows = attribute_rows(&collection);
        assert_eq!(rows[0].get("id"), Some(&AttributeValue::Integer(1)));
        assert_eq!(rows[1].get("id"), Some(&AttributeValue::Integer(2)));

        let dir = tempfile::tempdir().unwrap();
        write_files(&collection, dir.path(), BASENAME).unwrap();

        let shapes = read_points(dir.path());
        assert_eq!(shapes.len(), 2);
        assert_eq!(shapes[1].1.get("id"), Some(&FieldValue::Numeric(Some(2.0))));
        assert_eq!(shapes[0].0, shapefile::Point::new(30.0, 40.0));
    }

    #[test]
    fn test_writes_all_four_files() {
        let mut attrs = Attributes::new();
        attrs.insert("name", AttributeValue::String("well".to_string()));
        let collection = FeatureCollection::new(vec![point_feature(0, attrs)]);

        let triad = write(&collection).unwrap();
        assert!(!triad.shp.is_empty());
        assert!(!triad.shx.is_empty());
        assert!(!triad.dbf.is_empty());
        let prj = String::from_utf8(triad.prj).unwrap();
        assert_eq!(prj, Crs::wgs84().wkt());
    }

    #[test]
    fn test_rejects_mixed_geometry() {
        let line = Feature::new(
            FeatureId::Index(1),
            Geometry::LineString(
                LineString::new(vec![Point2::new(0.0, 0.0), Point2::new(1.0, 1.0)]).unwrap(),
            ),
        );
        let collection = FeatureCollection::new(vec![point_feature(0, Attributes::new()), line]);

        let dir = tempfile::tempdir().unwrap();
        let err = write_files(&collection, dir.path(), BASENAME).unwrap_err();
        assert!(matches!(err, ExchangeError::BadInput(_)));
        assert_eq!(err.to_string(), "All features must have the same geometry type");
        // 校验失败时不产出任何文件
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_rejects_empty_collection() {
        let dir = tempfile::tempdir().unwrap();
        let err = write_files(&FeatureCollection::default(), dir.path(), BASENAME).unwrap_err();
        assert!(matches!(err, ExchangeError::BadInput(_)));
    }

    #[test]
    fn test_polygon_shapefile() {
        let polygon = Polygon::new(vec![
            Point2::new(30.0, 40.0),
            Point2::new(30.1, 40.0),
            Point2::new(30.1, 40.1),
        ])
        .unwrap();
        let collection = FeatureCollection::new(vec![Feature::new(
            FeatureId::Index(0),
            Geometry::Polygon(polygon),
        )]);

        let dir = tempfile::tempdir().unwrap();
        write_files(&collection, dir.path(), BASENAME).unwrap();
        let shapes =
            shapefile::read_as::<_, shapefile::Polygon, Record>(dir.path().join("export.shp"))
                .unwrap();
        assert_eq!(shapes.len(), 1);
        assert_eq!(shapes[0].0.rings().len(), 1);
    }

    #[test]
    fn test_schema_union_and_types() {
        let mut a = Attributes::new();
        a.insert("count", AttributeValue::Integer(3));
        a.insert("label", AttributeValue::String("north".to_string()));
        let mut b = Attributes::new();
        b.insert("count", AttributeValue::Float(2.5));
        b.insert("irrigated", AttributeValue::Boolean(true));

        let schema = build_schema(&[a, b]);
        let kinds: Vec<_> = schema.iter().map(|f| (f.name.as_str(), f.kind)).collect();
        assert_eq!(
            kinds,
            vec![
                ("count", FieldKind::Float),
                ("label", FieldKind::Character(5)),
                ("irrigated", FieldKind::Logical),
            ]
        );
    }

    #[test]
    fn test_field_names_truncated_and_unique() {
        let mut row = Attributes::new();
        row.insert("parcel_number_a", AttributeValue::Integer(1));
        row.insert("parcel_number_b", AttributeValue::Integer(2));

        let schema = build_schema(&[row]);
        assert_eq!(schema[0].name, "parcel_num");
        assert_eq!(schema[1].name, "parcel_n_1");
    }

    #[test]
    fn test_missing_values_are_null() {
        let mut a = Attributes::new();
        a.insert("name", AttributeValue::String("x".to_string()));
        let mut b = Attributes::new();
        b.insert("size", AttributeValue::Integer(4));
        let schema = build_schema(&[a.clone(), b]);

        let record = build_record(&schema, &a);
        assert_eq!(record.get("size"), Some(&FieldValue::Numeric(None)));
    }
}
