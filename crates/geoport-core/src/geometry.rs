//! 要素几何定义
//!
//! 仅支持三种简单几何：
//! - 点 (Point)
//! - 线 (LineString)，至少2个坐标
//! - 面 (Polygon)，仅外环，环必须闭合
//!
//! 多部件几何和内环不在支持范围内。

use crate::error::CoreError;
use crate::math::{points_approx_eq, BoundingBox2, Point2};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 几何类型标签
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GeometryType {
    Point,
    LineString,
    Polygon,
}

impl GeometryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GeometryType::Point => "Point",
            GeometryType::LineString => "LineString",
            GeometryType::Polygon => "Polygon",
        }
    }
}

impl fmt::Display for GeometryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 闭合坐标环：首尾不相等时追加首点
///
/// 幂等：对已闭合的环调用不会再次追加。
pub fn close_ring(coords: &[Point2]) -> Vec<Point2> {
    let mut ring = coords.to_vec();
    if let (Some(first), Some(last)) = (coords.first(), coords.last()) {
        if !points_approx_eq(first, last) {
            ring.push(*first);
        }
    }
    ring
}

/// 判断坐标序列是否首尾相接
pub fn is_closed(coords: &[Point2]) -> bool {
    match (coords.first(), coords.last()) {
        (Some(first), Some(last)) => coords.len() > 1 && points_approx_eq(first, last),
        _ => false,
    }
}

/// 几何枚举
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Geometry {
    Point(Point2),
    LineString(LineString),
    Polygon(Polygon),
}

impl Geometry {
    pub fn point(x: f64, y: f64) -> Self {
        Geometry::Point(Point2::new(x, y))
    }

    /// 获取几何类型标签
    pub fn geometry_type(&self) -> GeometryType {
        match self {
            Geometry::Point(_) => GeometryType::Point,
            Geometry::LineString(_) => GeometryType::LineString,
            Geometry::Polygon(_) => GeometryType::Polygon,
        }
    }

    /// 几何的全部坐标（面包含闭合点）
    pub fn coords(&self) -> &[Point2] {
        match self {
            Geometry::Point(p) => std::slice::from_ref(p),
            Geometry::LineString(l) => l.coords(),
            Geometry::Polygon(p) => p.exterior(),
        }
    }

    pub fn bounding_box(&self) -> Option<BoundingBox2> {
        BoundingBox2::from_points(self.coords())
    }

    /// 对整个坐标序列做一次批量映射，生成同类型的新几何
    ///
    /// 面在映射后重新闭合，映射结果数量必须与输入一致。
    pub fn try_map_coords<F>(&self, mut f: F) -> Result<Geometry, CoreError>
    where
        F: FnMut(&[Point2]) -> Result<Vec<Point2>, CoreError>,
    {
        let source = self.coords();
        let mapped = f(source)?;
        if mapped.len() != source.len() {
            return Err(CoreError::Transform(format!(
                "expected {} coordinates, got {}",
                source.len(),
                mapped.len()
            )));
        }

        match self {
            Geometry::Point(_) => Ok(Geometry::Point(mapped[0])),
            Geometry::LineString(_) => Ok(Geometry::LineString(LineString::new(mapped)?)),
            Geometry::Polygon(_) => Ok(Geometry::Polygon(Polygon::new(mapped)?)),
        }
    }
}

/// 线
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineString {
    coords: Vec<Point2>,
}

impl LineString {
    pub fn new(coords: Vec<Point2>) -> Result<Self, CoreError> {
        if coords.len() < 2 {
            return Err(CoreError::InvalidGeometry(format!(
                "LineString requires at least 2 coordinates, got {}",
                coords.len()
            )));
        }
        Ok(Self { coords })
    }

    pub fn coords(&self) -> &[Point2] {
        &self.coords
    }

    /// 线长度（平面坐标单位）
    pub fn length(&self) -> f64 {
        self.coords
            .windows(2)
            .map(|w| (w[1] - w[0]).norm())
            .sum()
    }
}

/// 面（仅外环）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    exterior: Vec<Point2>,
}

impl Polygon {
    /// 最小环坐标数（含闭合点）
    pub const MIN_RING_SIZE: usize = 4;

    /// 创建面，环会被自动闭合
    pub fn new(ring: Vec<Point2>) -> Result<Self, CoreError> {
        let exterior = close_ring(&ring);
        if exterior.len() < Self::MIN_RING_SIZE {
            return Err(CoreError::InvalidGeometry(format!(
                "Polygon ring requires at least {} positions, got {}",
                Self::MIN_RING_SIZE,
                exterior.len()
            )));
        }
        Ok(Self { exterior })
    }

    pub fn exterior(&self) -> &[Point2] {
        &self.exterior
    }

    /// 平面面积（鞋带公式，取绝对值）
    pub fn planar_area(&self) -> f64 {
        let twice: f64 = self
            .exterior
            .windows(2)
            .map(|w| w[0].x * w[1].y - w[1].x * w[0].y)
            .sum();
        twice.abs() / 2.0
    }
}
