//! 数学基础类型
//!
//! 基于 nalgebra 提供的点类型别名，以及坐标比较和包围盒。

use nalgebra as na;
use serde::{Deserialize, Serialize};

/// 2D点类型（地理坐标时 x = 经度, y = 纬度）
pub type Point2 = na::Point2<f64>;

/// 数值容差，用于坐标比较
pub const EPSILON: f64 = 1e-10;

/// 判断两个浮点数是否近似相等
#[inline]
pub fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < EPSILON
}

/// 判断两个2D点是否近似相等
#[inline]
pub fn points_approx_eq(a: &Point2, b: &Point2) -> bool {
    approx_eq(a.x, b.x) && approx_eq(a.y, b.y)
}

/// 2D包围盒
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox2 {
    pub min: Point2,
    pub max: Point2,
}

impl BoundingBox2 {
    /// 创建新的包围盒
    pub fn new(min: Point2, max: Point2) -> Self {
        Self { min, max }
    }

    /// 从点集创建包围盒，点集为空时返回 None
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point2>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bbox = Self::new(*first, *first);
        for p in iter {
            bbox.expand_to_include(p);
        }
        Some(bbox)
    }

    /// 扩展包围盒以包含指定点
    pub fn expand_to_include(&mut self, point: &Point2) {
        self.min.x = self.min.x.min(point.x);
        self.min.y = self.min.y.min(point.y);
        self.max.x = self.max.x.max(point.x);
        self.max.y = self.max.y.max(point.y);
    }

    /// 检查是否包含指定点（含边界）
    pub fn contains(&self, point: &Point2) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
    }

    /// 检查是否完全落在闭区间 [x_min, x_max] × [y_min, y_max] 内
    pub fn within(&self, x: (f64, f64), y: (f64, f64)) -> bool {
        self.min.x >= x.0 && self.max.x <= x.1 && self.min.y >= y.0 && self.max.y <= y.1
    }

    /// 检查是否完全落在开区间 (x_min, x_max) × (y_min, y_max) 内
    pub fn strictly_within(&self, x: (f64, f64), y: (f64, f64)) -> bool {
        self.min.x > x.0 && self.max.x < x.1 && self.min.y > y.0 && self.max.y < y.1
    }

    /// 获取中心点
    pub fn center(&self) -> Point2 {
        Point2::new(
            (self.min.x + self.max.x) / 2.0,
            (self.min.y + self.max.y) / 2.0,
        )
    }
}
