//! 坐标变换
//!
//! 变换由源坐标系和目标坐标系构造，内部经由 WGS84 地理坐标中转：
//! 源 →(逆算子)→ WGS84 →(正算子)→ 目标。
//! 每次请求新建，不跨请求共享状态。

use crate::crs::Crs;
use crate::error::CoreError;
use crate::math::Point2;
use geodesy::prelude::*;

/// 两个坐标系之间的可逆变换
pub struct Transform {
    source: Crs,
    target: Crs,
    context: Minimal,
    source_op: Option<OpHandle>,
    target_op: Option<OpHandle>,
}

impl Transform {
    pub fn new(source: &Crs, target: &Crs) -> Result<Self, CoreError> {
        let mut context = Minimal::new();
        let mut register = |crs: &Crs| -> Result<Option<OpHandle>, CoreError> {
            crs.geodesy_definition()
                .map(|definition| {
                    context.op(&definition).map_err(|e| {
                        CoreError::Crs(format!("cannot build operator for {crs}: {e}"))
                    })
                })
                .transpose()
        };

        let source_op = register(source)?;
        let target_op = register(target)?;

        Ok(Self {
            source: *source,
            target: *target,
            context,
            source_op,
            target_op,
        })
    }

    pub fn source(&self) -> &Crs {
        &self.source
    }

    pub fn target(&self) -> &Crs {
        &self.target
    }

    pub fn is_identity(&self) -> bool {
        self.source == self.target
    }

    /// 反向变换
    pub fn inverse(&self) -> Result<Self, CoreError> {
        Self::new(&self.target, &self.source)
    }

    /// 批量变换，输出与输入一一对应且顺序不变
    ///
    /// 地理坐标以度为单位，x 为经度，y 为纬度。
    pub fn apply(&self, points: &[Point2]) -> Result<Vec<Point2>, CoreError> {
        if self.is_identity() || points.is_empty() {
            return Ok(points.to_vec());
        }

        let mut data: Vec<Coor4D> = points
            .iter()
            .map(|p| {
                if self.source.is_geographic() {
                    Coor4D([p.x.to_radians(), p.y.to_radians(), 0.0, 0.0])
                } else {
                    Coor4D([p.x, p.y, 0.0, 0.0])
                }
            })
            .collect();

        if let Some(op) = self.source_op {
            self.context
                .apply(op, Inv, &mut data)
                .map_err(|e| CoreError::Transform(e.to_string()))?;
        }
        if let Some(op) = self.target_op {
            self.context
                .apply(op, Fwd, &mut data)
                .map_err(|e| CoreError::Transform(e.to_string()))?;
        }

        data.iter()
            .enumerate()
            .map(|(i, c)| {
                let (x, y) = (c.0[0], c.0[1]);
                if !x.is_finite() || !y.is_finite() {
                    return Err(CoreError::Transform(format!(
                        "coordinate {i} ({}, {}) cannot be transformed from {} to {}",
                        points[i].x, points[i].y, self.source, self.target
                    )));
                }
                Ok(if self.target.is_geographic() {
                    Point2::new(x.to_degrees(), y.to_degrees())
                } else {
                    Point2::new(x, y)
                })
            })
            .collect()
    }

    /// 变换单个坐标
    pub fn apply_one(&self, point: Point2) -> Result<Point2, CoreError> {
        let mut out = self.apply(std::slice::from_ref(&point))?;
        out.pop()
            .ok_or_else(|| CoreError::Transform("empty transform result".to_string()))
    }
}

impl std::fmt::Debug for Transform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transform")
            .field("source", &self.source)
            .field("target", &self.target)
            .finish()
    }
}
