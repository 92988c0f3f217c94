//! 转换配置
//!
//! 所有字段都有默认值，可以从 JSON 文件部分覆盖：
//!
//! ```json
//! {
//!   "default_centroid": { "lon": 33.0, "lat": 40.0 },
//!   "cad_template": "templates/base.dxf",
//!   "detection": { "west_split": 400000.0 }
//! }
//! ```

use crate::error::ExchangeError;
use geoport_core::detect::DetectionConfig;
use geoport_core::math::Point2;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// 经纬度
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoCoordinate {
    pub lon: f64,
    pub lat: f64,
}

impl GeoCoordinate {
    pub fn to_point(self) -> Point2 {
        Point2::new(self.lon, self.lat)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExchangeConfig {
    /// 空集合导出 CAD 时使用的质心
    pub default_centroid: GeoCoordinate,
    /// CAD模板（只使用文件头）；配置了但不存在时导出失败
    pub cad_template: Option<PathBuf>,
    /// 临时工作区的父目录，默认系统临时目录
    pub workspace_root: Option<PathBuf>,
    /// 坐标系标记文本高度
    pub text_height: f64,
    /// 坐标系启发式识别阈值
    pub detection: DetectionConfig,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            default_centroid: GeoCoordinate {
                lon: 33.0,
                lat: 40.0,
            },
            cad_template: None,
            workspace_root: None,
            text_height: 2.5,
            detection: DetectionConfig::default(),
        }
    }
}

impl ExchangeConfig {
    /// 从 JSON 文件加载
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ExchangeError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            ExchangeError::ResourceMissing(format!("config {}: {e}", path.display()))
        })?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, ExchangeError> {
        serde_json::from_str(text)
            .map_err(|e| ExchangeError::BadInput(format!("invalid configuration: {e}")))
    }
}
