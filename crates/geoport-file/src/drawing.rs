//! CAD图纸数据模型
//!
//! 与具体文件格式无关的实体列表，只包含交换需要的三种实体：
//! 点、多段线、文本。图纸从空实体列表开始逐个追加。

use geoport_core::crs::UtmZone;
use geoport_core::math::Point2;
use serde::{Deserialize, Serialize};

/// 坐标系标记文本前缀
pub const UTM_ZONE_PREFIX: &str = "UTM_ZONE=";

/// 点实体
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CadPoint {
    pub location: Point2,
}

/// 多段线实体
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CadPolyline {
    pub vertices: Vec<Point2>,
    /// 文件中的闭合标志（顶点列表本身可能不含闭合点）
    pub closed: bool,
}

impl CadPolyline {
    pub fn open(vertices: Vec<Point2>) -> Self {
        Self {
            vertices,
            closed: false,
        }
    }

    pub fn point_count(&self) -> usize {
        self.vertices.len()
    }
}

/// 文本实体
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CadText {
    pub value: String,
    pub location: Point2,
    pub height: f64,
}

impl CadText {
    /// 图纸原点处的 `UTM_ZONE=<带号><半球>` 标记
    pub fn zone_marker(zone: UtmZone, height: f64) -> Self {
        Self {
            value: format!("{UTM_ZONE_PREFIX}{zone}"),
            location: Point2::origin(),
            height,
        }
    }

    /// 解析 `UTM_ZONE=<数字><N|S>` 标记，不匹配时返回 None
    pub fn parse_zone_marker(&self) -> Option<UtmZone> {
        self.value
            .trim()
            .strip_prefix(UTM_ZONE_PREFIX)?
            .parse::<UtmZone>()
            .ok()
    }
}

/// 图纸实体
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CadEntity {
    Point(CadPoint),
    Polyline(CadPolyline),
    Text(CadText),
}

impl CadEntity {
    pub fn type_name(&self) -> &'static str {
        match self {
            CadEntity::Point(_) => "Point",
            CadEntity::Polyline(_) => "Polyline",
            CadEntity::Text(_) => "Text",
        }
    }
}

/// CAD图纸
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CadDrawing {
    entities: Vec<CadEntity>,
}

impl CadDrawing {
    /// 创建空图纸
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加实体
    pub fn add_entity(&mut self, entity: CadEntity) {
        self.entities.push(entity);
    }

    pub fn entities(&self) -> &[CadEntity] {
        &self.entities
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// 查找第一个有效的坐标系标记
    pub fn zone_marker(&self) -> Option<UtmZone> {
        self.entities.iter().find_map(|entity| match entity {
            CadEntity::Text(text) => text.parse_zone_marker(),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geoport_core::crs::Hemisphere;

    #[test]
    fn test_zone_marker_roundtrip() {
        let zone = UtmZone::new(36, Hemisphere::North).unwrap();
        let marker = CadText::zone_marker(zone, 2.5);
        assert_eq!(marker.value, "UTM_ZONE=36N");
        assert_eq!(marker.location, Point2::origin());
        assert_eq!(marker.parse_zone_marker(), Some(zone));
    }

    #[test]
    fn test_zone_marker_rejects_other_text() {
        let text = |value: &str| CadText {
            value: value.to_string(),
            location: Point2::origin(),
            height: 1.0,
        };
        assert_eq!(text("Parcel 12").parse_zone_marker(), None);
        assert_eq!(text("UTM_ZONE=").parse_zone_marker(), None);
        assert_eq!(text("UTM_ZONE=36").parse_zone_marker(), None);
        assert_eq!(text("UTM_ZONE=3a6N").parse_zone_marker(), None);
        assert!(text("UTM_ZONE=35S").parse_zone_marker().is_some());
    }

    #[test]
    fn test_drawing_finds_marker_among_entities() {
        let mut drawing = CadDrawing::new();
        drawing.add_entity(CadEntity::Point(CadPoint {
            location: Point2::new(1.0, 2.0),
        }));
        assert_eq!(drawing.zone_marker(), None);

        let zone = UtmZone::new(37, Hemisphere::South).unwrap();
        drawing.add_entity(CadEntity::Text(CadText::zone_marker(zone, 1.0)));
        assert_eq!(drawing.zone_marker(), Some(zone));
        assert_eq!(drawing.entity_count(), 2);
    }
}
