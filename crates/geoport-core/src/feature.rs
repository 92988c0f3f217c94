//! 要素与要素集合
//!
//! 要素 = 标识 + 几何 + 有序属性行。属性值仅限标量类型，
//! 其他 JSON 值在构建时被转换为字符串。

use crate::error::CoreError;
use crate::geometry::{Geometry, GeometryType};
use crate::math::{BoundingBox2, Point2};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 要素标识
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeatureId {
    /// 集合中的位置（从0开始）
    Index(usize),
    /// 来自源数据的标识
    Key(String),
}

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureId::Index(i) => write!(f, "#{i}"),
            FeatureId::Key(k) => f.write_str(k),
        }
    }
}

/// 标量属性值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Timestamp(DateTime<Utc>),
}

impl AttributeValue {
    /// 从 JSON 值转换；null 返回 None，数组和对象转换为 JSON 文本
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        use serde_json::Value;

        match value {
            Value::Null => None,
            Value::Bool(b) => Some(AttributeValue::Boolean(*b)),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Some(AttributeValue::Integer(i)),
                None => n.as_f64().map(AttributeValue::Float),
            },
            Value::String(s) => Some(match DateTime::parse_from_rfc3339(s) {
                Ok(ts) => AttributeValue::Timestamp(ts.with_timezone(&Utc)),
                Err(_) => AttributeValue::String(s.clone()),
            }),
            Value::Array(_) | Value::Object(_) => Some(AttributeValue::String(value.to_string())),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value;

        match self {
            AttributeValue::String(s) => Value::String(s.clone()),
            AttributeValue::Integer(i) => Value::from(*i),
            AttributeValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            AttributeValue::Boolean(b) => Value::Bool(*b),
            AttributeValue::Timestamp(ts) => Value::String(ts.to_rfc3339()),
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::String(s) => f.write_str(s),
            AttributeValue::Integer(i) => write!(f, "{i}"),
            AttributeValue::Float(v) => write!(f, "{v}"),
            AttributeValue::Boolean(b) => write!(f, "{b}"),
            AttributeValue::Timestamp(ts) => f.write_str(&ts.to_rfc3339()),
        }
    }
}

/// 有序属性行（保持插入顺序，名称唯一）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Attributes {
    entries: Vec<(String, AttributeValue)>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从 JSON 对象构建，丢弃 null 值
    pub fn from_json(object: &serde_json::Map<String, serde_json::Value>) -> Self {
        let mut attributes = Self::new();
        for (name, value) in object {
            if let Some(value) = AttributeValue::from_json(value) {
                attributes.insert(name.clone(), value);
            }
        }
        attributes
    }

    pub fn to_json(&self) -> serde_json::Map<String, serde_json::Value> {
        self.entries
            .iter()
            .map(|(name, value)| (name.clone(), value.to_json()))
            .collect()
    }

    /// 插入属性，同名时覆盖并返回旧值
    pub fn insert(&mut self, name: impl Into<String>, value: AttributeValue) -> Option<AttributeValue> {
        let name = name.into();
        if let Some(slot) = self.entries.iter_mut().find(|(n, _)| *n == name) {
            return Some(std::mem::replace(&mut slot.1, value));
        }
        self.entries.push((name, value));
        None
    }

    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeValue)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// 要素
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub id: FeatureId,
    pub geometry: Geometry,
    pub attributes: Attributes,
}

impl Feature {
    pub fn new(id: FeatureId, geometry: Geometry) -> Self {
        Self {
            id,
            geometry,
            attributes: Attributes::new(),
        }
    }

    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }
}

/// 要素集合（有序）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>) -> Self {
        Self { features }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Feature> {
        self.features.iter()
    }

    /// 所有要素共同的几何类型；集合为空或类型混杂时返回 None
    pub fn geometry_type(&self) -> Option<GeometryType> {
        let first = self.features.first()?.geometry.geometry_type();
        self.features
            .iter()
            .all(|f| f.geometry.geometry_type() == first)
            .then_some(first)
    }

    /// 校验集合非空且几何类型一致
    pub fn ensure_homogeneous(&self) -> Result<GeometryType, CoreError> {
        if self.is_empty() {
            return Err(CoreError::InvalidGeometry("No features found.".to_string()));
        }
        self.geometry_type().ok_or_else(|| {
            CoreError::InvalidGeometry("All features must have the same geometry type".to_string())
        })
    }

    /// 遍历全部坐标
    pub fn coordinates(&self) -> impl Iterator<Item = &Point2> {
        self.features.iter().flat_map(|f| f.geometry.coords())
    }

    pub fn bounds(&self) -> Option<BoundingBox2> {
        BoundingBox2::from_points(self.coordinates())
    }

    /// 所有坐标的算术平均
    pub fn centroid(&self) -> Option<Point2> {
        let (count, sum_x, sum_y) = self
            .coordinates()
            .fold((0usize, 0.0, 0.0), |(n, sx, sy), p| (n + 1, sx + p.x, sy + p.y));
        (count > 0).then(|| Point2::new(sum_x / count as f64, sum_y / count as f64))
    }
}

impl FromIterator<Feature> for FeatureCollection {
    fn from_iter<T: IntoIterator<Item = Feature>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
