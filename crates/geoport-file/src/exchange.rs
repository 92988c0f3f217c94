//! 请求级转换操作
//!
//! 每个操作接收原始输入、返回完整输出，中间文件只存在于
//! 操作自己的临时工作区内，任何退出路径都会清理。

use crate::cad_io::{self, CadImport};
use crate::config::ExchangeConfig;
use crate::dxf_io;
use crate::error::ExchangeError;
use crate::geojson_io;
use crate::shapefile_io::{self, BASENAME, EXTENSIONS};
use crate::workspace::Workspace;
use geoport_core::crs::Crs;
use geoport_core::detect::CrsDetector;
use geoport_core::feature::{Feature, FeatureCollection, FeatureId};
use geoport_core::math::Point2;
use geoport_core::measure::geometry_area_m2;
use geoport_core::transform::Transform;

/// GeoJSON → 压缩包（export.shp/.shx/.dbf/.prj）
pub fn export_shapefile(raw: &str, config: &ExchangeConfig) -> Result<Vec<u8>, ExchangeError> {
    let collection = geojson_io::parse(raw)?;
    geojson_io::validate(&collection, true)?;

    let workspace = Workspace::create(config.workspace_root.as_deref())?;
    shapefile_io::write_files(&collection, workspace.path(), BASENAME)?;

    let names = EXTENSIONS.map(|ext| format!("{BASENAME}.{ext}"));
    let names: Vec<&str> = names.iter().map(String::as_str).collect();
    workspace.package_zip(&names)
}

/// GeoJSON → DXF 字节
pub fn export_cad(raw: &str, config: &ExchangeConfig) -> Result<Vec<u8>, ExchangeError> {
    let collection = geojson_io::parse(raw)?;
    geojson_io::validate(&collection, false)?;

    let header = config
        .cad_template
        .as_deref()
        .map(dxf_io::load_template_header)
        .transpose()?;

    let exported = cad_io::features_to_drawing(&collection, config)?;
    dxf_io::to_bytes(&exported.drawing, header)
}

/// DXF 字节 → WGS84 要素集合，失败时返回空集合和诊断信息
pub fn import_cad(bytes: &[u8]) -> CadImport {
    match dxf_io::from_bytes(bytes) {
        Ok(drawing) => cad_io::drawing_to_features(&drawing),
        Err(e) => {
            tracing::warn!(error = %e, "cannot read CAD drawing");
            CadImport::failed(e.to_string())
        }
    }
}

/// 归一化结果
#[derive(Debug, Clone)]
pub struct NormalizedGeoJson {
    /// WGS84 GeoJSON 文本
    pub geojson: String,
    /// 识别出的源坐标系
    pub source_crs: Crs,
    /// 生效的识别规则（内嵌坐标系为 "embedded"）
    pub rule: &'static str,
}

/// 任意坐标系的 GeoJSON → WGS84 GeoJSON
///
/// 优先使用文档内嵌的 `crs` 成员，否则按坐标范围识别。
pub fn normalize_geojson(
    raw: &str,
    config: &ExchangeConfig,
) -> Result<NormalizedGeoJson, ExchangeError> {
    let parsed = geojson_io::parse_document(raw)?;
    geojson_io::validate(&parsed.collection, false)?;

    let (source_crs, rule) = match parsed.embedded_crs {
        Some(crs) => (crs, "embedded"),
        None => {
            let detection = CrsDetector::from_config(&config.detection)
                .detect(parsed.collection.coordinates())
                .ok_or_else(|| {
                    ExchangeError::TransformFailure(
                        "Unable to determine coordinate reference system".to_string(),
                    )
                })?;
            (detection.crs, detection.rule)
        }
    };

    let transform = Transform::new(&source_crs, &Crs::wgs84())?;
    let features = parsed
        .collection
        .iter()
        .map(|feature| {
            let geometry = feature
                .geometry
                .try_map_coords(|coords| transform.apply(coords))?;
            Ok(Feature {
                geometry,
                ..feature.clone()
            })
        })
        .collect::<Result<Vec<_>, ExchangeError>>()?;

    tracing::info!(
        features = features.len(),
        source = %source_crs,
        rule,
        "normalized GeoJSON to WGS84"
    );
    Ok(NormalizedGeoJson {
        geojson: geojson_io::serialize(&FeatureCollection::new(features))?,
        source_crs,
        rule,
    })
}

/// 按 EPSG 代码转换单个坐标
pub fn convert_coordinate(
    x: f64,
    y: f64,
    from_epsg: u32,
    to_epsg: u32,
) -> Result<Point2, ExchangeError> {
    let source = Crs::from_epsg(from_epsg)?;
    let target = Crs::from_epsg(to_epsg)?;
    let transform = Transform::new(&source, &target)?;
    Ok(transform.apply_one(Point2::new(x, y))?)
}

/// WGS84 GeoJSON 中每个要素的面积（平方米）
pub fn feature_areas(raw: &str) -> Result<Vec<(FeatureId, f64)>, ExchangeError> {
    let collection = geojson_io::parse(raw)?;
    collection
        .iter()
        .map(|feature| Ok((feature.id.clone(), geometry_area_m2(&feature.geometry)?)))
        .collect()
}
