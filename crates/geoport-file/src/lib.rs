//! GeoPort 文件格式处理
//!
//! 支持：
//! - GeoJSON 解析与序列化（含坐标系识别后的归一化）
//! - Shapefile 导出（`.shp/.shx/.dbf/.prj` 打包为 zip）
//! - `.dxf` CAD图纸导入/导出，图纸原点带 `UTM_ZONE=` 坐标系标记
//!
//! 请求级入口见 [`exchange`]。

pub mod cad_io;
pub mod config;
pub mod drawing;
pub mod dxf_io;
pub mod error;
pub mod exchange;
pub mod geojson_io;
pub mod shapefile_io;
pub mod workspace;

pub use cad_io::CadImport;
pub use config::ExchangeConfig;
pub use drawing::CadDrawing;
pub use error::{ErrorKind, ExchangeError};
pub use exchange::{
    convert_coordinate, export_cad, export_shapefile, feature_areas, import_cad,
    normalize_geojson, NormalizedGeoJson,
};
