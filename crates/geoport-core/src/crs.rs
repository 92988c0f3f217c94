//! 坐标参考系
//!
//! 支持两类坐标系：
//! - 地理坐标系（WGS84 / ED50，单位：度）
//! - 横轴墨卡托投影（UTM 分带，单位：米）
//!
//! 每个坐标系可以输出 ESRI 风格的 WKT 描述（用于 `.prj`），
//! 以及 geodesy 的算子定义（从 WGS84 地理坐标到该坐标系的正向变换）。

use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// UTM 比例因子
pub const UTM_SCALE_FACTOR: f64 = 0.9996;

/// UTM 东伪偏移
pub const UTM_FALSE_EASTING: f64 = 500_000.0;

/// 南半球 UTM 北伪偏移
pub const UTM_SOUTH_FALSE_NORTHING: f64 = 10_000_000.0;

/// 大地基准
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Datum {
    Wgs84,
    /// 欧洲1950基准（国际1924椭球）
    Ed50,
}

impl Datum {
    /// geodesy 椭球名称
    fn ellipsoid(&self) -> &'static str {
        match self {
            Datum::Wgs84 => "WGS84",
            Datum::Ed50 => "intl",
        }
    }

    /// 长半轴与扁率倒数
    pub fn spheroid(&self) -> (f64, f64) {
        match self {
            Datum::Wgs84 => (6_378_137.0, 298.257223563),
            Datum::Ed50 => (6_378_388.0, 297.0),
        }
    }

    /// 本基准到 WGS84 的三参数平移（米）
    pub fn to_wgs84_shift(&self) -> Option<[f64; 3]> {
        match self {
            Datum::Wgs84 => None,
            Datum::Ed50 => Some([-87.0, -98.0, -121.0]),
        }
    }

    fn wkt_names(&self) -> (&'static str, &'static str, &'static str) {
        match self {
            Datum::Wgs84 => ("GCS_WGS_1984", "D_WGS_1984", "WGS_1984"),
            Datum::Ed50 => ("GCS_European_1950", "D_European_1950", "International_1924"),
        }
    }

    fn short_name(&self) -> &'static str {
        match self {
            Datum::Wgs84 => "WGS_1984",
            Datum::Ed50 => "ED_1950",
        }
    }
}

/// 半球
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Hemisphere {
    North,
    South,
}

impl Hemisphere {
    /// 纬度 >= 0 为北半球
    pub fn from_latitude(lat: f64) -> Self {
        if lat >= 0.0 {
            Hemisphere::North
        } else {
            Hemisphere::South
        }
    }

    pub fn as_char(&self) -> char {
        match self {
            Hemisphere::North => 'N',
            Hemisphere::South => 'S',
        }
    }

    pub fn false_northing(&self) -> f64 {
        match self {
            Hemisphere::North => 0.0,
            Hemisphere::South => UTM_SOUTH_FALSE_NORTHING,
        }
    }
}

/// 经度对应的 UTM 带号，限制在 [1, 60]
pub fn utm_zone_number(lon: f64) -> u8 {
    let zone = ((lon + 180.0) / 6.0).floor() + 1.0;
    zone.clamp(1.0, 60.0) as u8
}

/// UTM 带号的中央经线
pub fn central_meridian(zone: u8) -> f64 {
    -183.0 + 6.0 * zone as f64
}

/// UTM 分带（带号 + 半球）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UtmZone {
    number: u8,
    hemisphere: Hemisphere,
}

impl UtmZone {
    pub fn new(number: u8, hemisphere: Hemisphere) -> Result<Self, CoreError> {
        if !(1..=60).contains(&number) {
            return Err(CoreError::Crs(format!(
                "UTM zone must be between 1 and 60, got {number}"
            )));
        }
        Ok(Self { number, hemisphere })
    }

    /// 根据经纬度推导分带
    pub fn from_lon_lat(lon: f64, lat: f64) -> Self {
        Self {
            number: utm_zone_number(lon),
            hemisphere: Hemisphere::from_latitude(lat),
        }
    }

    pub fn number(&self) -> u8 {
        self.number
    }

    pub fn hemisphere(&self) -> Hemisphere {
        self.hemisphere
    }

    pub fn central_meridian(&self) -> f64 {
        central_meridian(self.number)
    }
}

impl fmt::Display for UtmZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.number, self.hemisphere.as_char())
    }
}

impl FromStr for UtmZone {
    type Err = CoreError;

    /// 解析 "36N" / "35S" 形式
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || CoreError::Crs(format!("invalid UTM zone designation: {s:?}"));

        let hemisphere = match s.chars().last() {
            Some('N') => Hemisphere::North,
            Some('S') => Hemisphere::South,
            _ => return Err(invalid()),
        };
        let digits = &s[..s.len() - 1];
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        let number: u8 = digits.parse().map_err(|_| invalid())?;
        Self::new(number, hemisphere)
    }
}

/// 横轴墨卡托投影参数
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransverseMercator {
    datum: Datum,
    zone: UtmZone,
    central_meridian: f64,
    scale_factor: f64,
    false_easting: f64,
    false_northing: f64,
}

impl TransverseMercator {
    pub fn datum(&self) -> Datum {
        self.datum
    }

    pub fn zone(&self) -> UtmZone {
        self.zone
    }

    pub fn central_meridian(&self) -> f64 {
        self.central_meridian
    }

    pub fn scale_factor(&self) -> f64 {
        self.scale_factor
    }

    pub fn false_easting(&self) -> f64 {
        self.false_easting
    }

    pub fn false_northing(&self) -> f64 {
        self.false_northing
    }
}

/// 坐标参考系（构造后不可变）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Crs {
    Geographic(Datum),
    TransverseMercator(TransverseMercator),
}

impl Crs {
    /// WGS84 地理坐标系
    pub fn wgs84() -> Self {
        Crs::Geographic(Datum::Wgs84)
    }

    /// WGS84 UTM 投影
    pub fn utm(zone: UtmZone) -> Self {
        Self::utm_with_datum(Datum::Wgs84, zone)
    }

    /// 指定基准的标准 UTM 投影
    pub fn utm_with_datum(datum: Datum, zone: UtmZone) -> Self {
        Self::transverse_mercator(datum, zone, zone.central_meridian())
    }

    /// 指定中央经线的横轴墨卡托投影（其余参数为 UTM 标准值）
    pub fn transverse_mercator(datum: Datum, zone: UtmZone, central_meridian: f64) -> Self {
        Crs::TransverseMercator(TransverseMercator {
            datum,
            zone,
            central_meridian,
            scale_factor: UTM_SCALE_FACTOR,
            false_easting: UTM_FALSE_EASTING,
            false_northing: zone.hemisphere().false_northing(),
        })
    }

    pub fn datum(&self) -> Datum {
        match self {
            Crs::Geographic(datum) => *datum,
            Crs::TransverseMercator(tm) => tm.datum,
        }
    }

    pub fn is_geographic(&self) -> bool {
        matches!(self, Crs::Geographic(_))
    }

    pub fn utm_zone(&self) -> Option<UtmZone> {
        match self {
            Crs::Geographic(_) => None,
            Crs::TransverseMercator(tm) => Some(tm.zone),
        }
    }

    /// 由 EPSG 代码构造
    pub fn from_epsg(code: u32) -> Result<Self, CoreError> {
        match code {
            4326 => Ok(Crs::wgs84()),
            4230 => Ok(Crs::Geographic(Datum::Ed50)),
            32601..=32660 => Ok(Crs::utm(UtmZone::new((code - 32600) as u8, Hemisphere::North)?)),
            32701..=32760 => Ok(Crs::utm(UtmZone::new((code - 32700) as u8, Hemisphere::South)?)),
            23028..=23038 => Ok(Crs::utm_with_datum(
                Datum::Ed50,
                UtmZone::new((code - 23000) as u8, Hemisphere::North)?,
            )),
            _ => Err(CoreError::Crs(format!("unsupported EPSG code: {code}"))),
        }
    }

    /// 对应的 EPSG 代码（非标准参数时为 None）
    pub fn epsg(&self) -> Option<u32> {
        match self {
            Crs::Geographic(Datum::Wgs84) => Some(4326),
            Crs::Geographic(Datum::Ed50) => Some(4230),
            Crs::TransverseMercator(tm) => {
                if tm.central_meridian != tm.zone.central_meridian() {
                    return None;
                }
                let zone = tm.zone.number() as u32;
                match (tm.datum, tm.zone.hemisphere()) {
                    (Datum::Wgs84, Hemisphere::North) => Some(32600 + zone),
                    (Datum::Wgs84, Hemisphere::South) => Some(32700 + zone),
                    (Datum::Ed50, Hemisphere::North) if (28..=38).contains(&zone) => {
                        Some(23000 + zone)
                    }
                    _ => None,
                }
            }
        }
    }

    /// 解析坐标系名称：`EPSG:32636`、`urn:ogc:def:crs:EPSG::32636`、`urn:ogc:def:crs:OGC:1.3:CRS84`
    pub fn from_name(name: &str) -> Result<Self, CoreError> {
        let name = name.trim();
        if name.ends_with("CRS84") {
            return Ok(Crs::wgs84());
        }

        let code = name
            .rsplit(':')
            .next()
            .filter(|_| name.to_ascii_uppercase().contains("EPSG"))
            .and_then(|code| code.parse::<u32>().ok())
            .ok_or_else(|| CoreError::Crs(format!("unrecognized CRS name: {name}")))?;
        Self::from_epsg(code)
    }

    /// ESRI 风格的 WKT 描述
    pub fn wkt(&self) -> String {
        match self {
            Crs::Geographic(datum) => geogcs_wkt(*datum),
            Crs::TransverseMercator(tm) => format!(
                "PROJCS[\"{}_UTM_Zone_{}\",{},PROJECTION[\"Transverse_Mercator\"],\
                 PARAMETER[\"False_Easting\",{:?}],PARAMETER[\"False_Northing\",{:?}],\
                 PARAMETER[\"Central_Meridian\",{:?}],PARAMETER[\"Scale_Factor\",{:?}],\
                 PARAMETER[\"Latitude_Of_Origin\",0.0],UNIT[\"Meter\",1.0]]",
                tm.datum.short_name(),
                tm.zone,
                geogcs_wkt(tm.datum),
                tm.false_easting,
                tm.false_northing,
                tm.central_meridian,
                tm.scale_factor,
            ),
        }
    }

    /// geodesy 算子定义：WGS84 地理坐标（弧度）→ 本坐标系
    ///
    /// WGS84 地理坐标系本身返回 None（恒等）。
    pub fn geodesy_definition(&self) -> Option<String> {
        let datum = self.datum();
        let mut steps = Vec::new();

        if let Some([x, y, z]) = datum.to_wgs84_shift() {
            steps.push("cart ellps=WGS84".to_string());
            steps.push(format!("inv helmert x={x} y={y} z={z}"));
            steps.push(format!("inv cart ellps={}", datum.ellipsoid()));
        }

        if let Crs::TransverseMercator(tm) = self {
            steps.push(format!(
                "tmerc ellps={} lon_0={} k_0={} x_0={} y_0={}",
                datum.ellipsoid(),
                tm.central_meridian,
                tm.scale_factor,
                tm.false_easting,
                tm.false_northing,
            ));
        }

        (!steps.is_empty()).then(|| steps.join(" | "))
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Crs::Geographic(Datum::Wgs84) => f.write_str("WGS84"),
            Crs::Geographic(Datum::Ed50) => f.write_str("ED50"),
            Crs::TransverseMercator(tm) => write!(
                f,
                "{} / UTM {} (lon_0={})",
                match tm.datum {
                    Datum::Wgs84 => "WGS84",
                    Datum::Ed50 => "ED50",
                },
                tm.zone,
                tm.central_meridian
            ),
        }
    }
}

fn geogcs_wkt(datum: Datum) -> String {
    let (gcs, datum_name, spheroid) = datum.wkt_names();
    let (a, rf) = datum.spheroid();
    format!(
        "GEOGCS[\"{gcs}\",DATUM[\"{datum_name}\",SPHEROID[\"{spheroid}\",{a:?},{rf:?}]],\
         PRIMEM[\"Greenwich\",0.0],UNIT[\"Degree\",0.0174532925199433]]"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utm_zone_number() {
        assert_eq!(utm_zone_number(-180.0), 1);
        assert_eq!(utm_zone_number(179.9), 60);
        assert_eq!(utm_zone_number(180.0), 60);
        assert_eq!(utm_zone_number(32.85), 36);
        assert_eq!(utm_zone_number(-200.0), 1);
        // 超出范围的经度被截断，而不是按 360 度周期折回
        assert_ne!(utm_zone_number(10.0), utm_zone_number(370.0));
    }

    #[test]
    fn test_central_meridian() {
        assert_eq!(central_meridian(36), 33.0);
        assert_eq!(central_meridian(1), -177.0);
        assert_eq!(central_meridian(60), 177.0);
    }

    #[test]
    fn test_hemisphere() {
        assert_eq!(Hemisphere::from_latitude(0.0), Hemisphere::North);
        assert_eq!(Hemisphere::from_latitude(-0.1), Hemisphere::South);
        assert_eq!(Hemisphere::South.false_northing(), 10_000_000.0);
    }

    #[test]
    fn test_zone_parse_and_display() {
        let zone: UtmZone = "36N".parse().unwrap();
        assert_eq!(zone.number(), 36);
        assert_eq!(zone.hemisphere(), Hemisphere::North);
        assert_eq!(zone.to_string(), "36N");

        assert!("61N".parse::<UtmZone>().is_err());
        assert!("0S".parse::<UtmZone>().is_err());
        assert!("N".parse::<UtmZone>().is_err());
        assert!("36X".parse::<UtmZone>().is_err());
    }

    #[test]
    fn test_epsg_roundtrip() {
        for code in [4326, 4230, 32636, 32735, 23036] {
            assert_eq!(Crs::from_epsg(code).unwrap().epsg(), Some(code));
        }
        assert!(Crs::from_epsg(3857).is_err());
    }

    #[test]
    fn test_from_name() {
        assert_eq!(Crs::from_name("EPSG:4326").unwrap(), Crs::wgs84());
        assert_eq!(
            Crs::from_name("urn:ogc:def:crs:EPSG::32636").unwrap().epsg(),
            Some(32636)
        );
        assert_eq!(
            Crs::from_name("urn:ogc:def:crs:OGC:1.3:CRS84").unwrap(),
            Crs::wgs84()
        );
        assert!(Crs::from_name("LOCAL:1").is_err());
    }

    #[test]
    fn test_utm_wkt_parameters() {
        let zone = UtmZone::new(36, Hemisphere::South).unwrap();
        let wkt = Crs::utm(zone).wkt();
        assert!(wkt.starts_with("PROJCS[\"WGS_1984_UTM_Zone_36S\""));
        assert!(wkt.contains("PARAMETER[\"Scale_Factor\",0.9996]"));
        assert!(wkt.contains("PARAMETER[\"False_Easting\",500000.0]"));
        assert!(wkt.contains("PARAMETER[\"False_Northing\",10000000.0]"));
        assert!(wkt.contains("PARAMETER[\"Central_Meridian\",33.0]"));
    }

    #[test]
    fn test_geographic_wkt() {
        let wkt = Crs::wgs84().wkt();
        assert!(wkt.starts_with("GEOGCS[\"GCS_WGS_1984\""));
        assert!(wkt.contains("SPHEROID[\"WGS_1984\",6378137.0,298.257223563]"));
    }

    #[test]
    fn test_geodesy_definition() {
        assert_eq!(Crs::wgs84().geodesy_definition(), None);

        let zone = UtmZone::new(36, Hemisphere::North).unwrap();
        let def = Crs::utm(zone).geodesy_definition().unwrap();
        assert_eq!(def, "tmerc ellps=WGS84 lon_0=33 k_0=0.9996 x_0=500000 y_0=0");

        let ed50 = Crs::utm_with_datum(Datum::Ed50, zone).geodesy_definition().unwrap();
        assert!(ed50.starts_with("cart ellps=WGS84 | inv helmert"));
        assert!(ed50.ends_with("tmerc ellps=intl lon_0=33 k_0=0.9996 x_0=500000 y_0=0"));
    }
}
