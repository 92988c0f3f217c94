//! GeoPort 核心
//!
//! 提供要素几何模型、坐标参考系与投影变换。
//!
//! # 架构设计
//!
//! - `Geometry`: 点、线、面（仅外环）三种几何
//! - `Feature` / `FeatureCollection`: 几何 + 有序标量属性
//! - `Crs`: WGS84 / ED50 地理坐标系与横轴墨卡托（UTM）投影
//! - `Transform`: 基于 geodesy 的坐标系间可逆变换
//! - `CrsDetector`: 未知坐标系时的启发式识别
//!
//! # 示例
//!
//! ```rust
//! use geoport_core::prelude::*;
//!
//! let zone = UtmZone::from_lon_lat(32.85, 39.93);
//! let transform = Transform::new(&Crs::wgs84(), &Crs::utm(zone)).unwrap();
//! let projected = transform.apply_one(Point2::new(32.85, 39.93)).unwrap();
//! println!("UTM {zone}: {projected}");
//! ```

pub mod crs;
pub mod detect;
pub mod error;
pub mod feature;
pub mod geometry;
pub mod math;
pub mod measure;
pub mod transform;

pub use error::CoreError;

pub mod prelude {
    //! 常用类型的便捷导入
    pub use crate::crs::{Crs, Datum, Hemisphere, UtmZone};
    pub use crate::detect::{CrsDetector, Detection, DetectionConfig};
    pub use crate::error::CoreError;
    pub use crate::feature::{AttributeValue, Attributes, Feature, FeatureCollection, FeatureId};
    pub use crate::geometry::{close_ring, Geometry, GeometryType, LineString, Polygon};
    pub use crate::math::{BoundingBox2, Point2};
    pub use crate::transform::Transform;
}
