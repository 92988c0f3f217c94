//! 坐标系启发式识别
//!
//! 当输入数据未携带坐标系时，根据全部坐标的范围猜测坐标系。
//! 识别器按顺序排列，第一个给出结果的识别器生效。
//! 默认顺序：
//! 1. 地理坐标（经纬度范围内）→ WGS84
//! 2. 区域 UTM（东/北坐标落在配置范围内）→ WGS84 UTM 35N/36N/37N
//! 3. 兜底 → ED50 UTM 36N，中央经线 33°
//!
//! 阈值为经验值，全部可配置。

use crate::crs::{Crs, Datum, Hemisphere, UtmZone};
use crate::math::{BoundingBox2, Point2};
use serde::{Deserialize, Serialize};

/// 启发式识别的阈值配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// 区域 UTM 的东坐标开区间
    pub regional_easting: (f64, f64),
    /// 区域 UTM 的北坐标开区间
    pub regional_northing: (f64, f64),
    /// 东坐标小于该值时使用 `west_zone`
    ///
    /// 设为 300000 时 (350000, 4450000) 落在中间带 36N。
    pub west_split: f64,
    /// 东坐标大于该值时使用 `east_zone`
    pub east_split: f64,
    pub west_zone: u8,
    pub central_zone: u8,
    pub east_zone: u8,
    /// ED50 兜底分带
    pub fallback_zone: u8,
    /// ED50 兜底中央经线
    pub fallback_central_meridian: f64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            regional_easting: (200_000.0, 900_000.0),
            regional_northing: (4_000_000.0, 5_000_000.0),
            west_split: 400_000.0,
            east_split: 700_000.0,
            west_zone: 35,
            central_zone: 36,
            east_zone: 37,
            fallback_zone: 36,
            fallback_central_meridian: 33.0,
        }
    }
}

/// 识别器
pub trait CrsClassifier: Send + Sync {
    /// 识别规则名称（用于日志和诊断）
    fn name(&self) -> &'static str;

    /// 根据坐标范围给出坐标系，不适用时返回 None
    fn classify(&self, bounds: &BoundingBox2) -> Option<Crs>;
}

/// 所有坐标都在经纬度范围内
#[derive(Debug, Clone, Copy, Default)]
pub struct GeographicClassifier;

impl CrsClassifier for GeographicClassifier {
    fn name(&self) -> &'static str {
        "geographic"
    }

    fn classify(&self, bounds: &BoundingBox2) -> Option<Crs> {
        bounds
            .within((-180.0, 180.0), (-90.0, 90.0))
            .then(Crs::wgs84)
    }
}

/// 区域 UTM 投影（北半球），按东坐标选带
#[derive(Debug, Clone)]
pub struct RegionalUtmClassifier {
    config: DetectionConfig,
}

impl RegionalUtmClassifier {
    pub fn new(config: DetectionConfig) -> Self {
        Self { config }
    }

    fn zone_for_easting(&self, easting: f64) -> u8 {
        if easting < self.config.west_split {
            self.config.west_zone
        } else if easting > self.config.east_split {
            self.config.east_zone
        } else {
            self.config.central_zone
        }
    }
}

impl CrsClassifier for RegionalUtmClassifier {
    fn name(&self) -> &'static str {
        "regional-utm"
    }

    fn classify(&self, bounds: &BoundingBox2) -> Option<Crs> {
        if !bounds.strictly_within(self.config.regional_easting, self.config.regional_northing) {
            return None;
        }
        let zone = self.zone_for_easting(bounds.center().x);
        UtmZone::new(zone, Hemisphere::North).ok().map(Crs::utm)
    }
}

/// ED50 兜底，总是匹配
#[derive(Debug, Clone)]
pub struct LegacyEd50Classifier {
    zone: u8,
    central_meridian: f64,
}

impl LegacyEd50Classifier {
    pub fn new(zone: u8, central_meridian: f64) -> Self {
        Self {
            zone,
            central_meridian,
        }
    }
}

impl CrsClassifier for LegacyEd50Classifier {
    fn name(&self) -> &'static str {
        "legacy-ed50"
    }

    fn classify(&self, _bounds: &BoundingBox2) -> Option<Crs> {
        let zone = UtmZone::new(self.zone, Hemisphere::North).ok()?;
        Some(Crs::transverse_mercator(Datum::Ed50, zone, self.central_meridian))
    }
}

/// 识别结果
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub crs: Crs,
    /// 生效的识别规则
    pub rule: &'static str,
}

/// 有序识别器列表
pub struct CrsDetector {
    classifiers: Vec<Box<dyn CrsClassifier>>,
}

impl CrsDetector {
    /// 空识别器列表
    pub fn empty() -> Self {
        Self {
            classifiers: Vec::new(),
        }
    }

    /// 默认顺序：地理 → 区域 UTM → ED50 兜底
    pub fn from_config(config: &DetectionConfig) -> Self {
        Self::empty()
            .with_classifier(GeographicClassifier)
            .with_classifier(RegionalUtmClassifier::new(config.clone()))
            .with_classifier(LegacyEd50Classifier::new(
                config.fallback_zone,
                config.fallback_central_meridian,
            ))
    }

    /// 追加识别器（排在已有识别器之后）
    pub fn with_classifier(mut self, classifier: impl CrsClassifier + 'static) -> Self {
        self.classifiers.push(Box::new(classifier));
        self
    }

    /// 插入识别器到最前面
    pub fn with_priority_classifier(mut self, classifier: impl CrsClassifier + 'static) -> Self {
        self.classifiers.insert(0, Box::new(classifier));
        self
    }

    /// 识别坐标集合的坐标系
    ///
    /// 没有坐标时视为 WGS84；所有识别器都不匹配时返回 None。
    pub fn detect<'a>(&self, points: impl IntoIterator<Item = &'a Point2>) -> Option<Detection> {
        let Some(bounds) = BoundingBox2::from_points(points) else {
            return Some(Detection {
                crs: Crs::wgs84(),
                rule: "empty",
            });
        };

        let detection = self.classifiers.iter().find_map(|classifier| {
            classifier.classify(&bounds).map(|crs| Detection {
                crs,
                rule: classifier.name(),
            })
        });

        if let Some(detection) = &detection {
            tracing::debug!(
                rule = detection.rule,
                crs = %detection.crs,
                "detected coordinate reference system"
            );
        }
        detection
    }
}

impl Default for CrsDetector {
    fn default() -> Self {
        Self::from_config(&DetectionConfig::default())
    }
}
