//! DXF文件读写
//!
//! CAD图纸模型与 DXF 之间的转换：
//! - 点 ↔ POINT
//! - 多段线 ↔ LWPOLYLINE（读取时也接受 POLYLINE 和 LINE）
//! - 文本 ↔ TEXT（读取时也接受 MTEXT）
//!
//! 导出时实体总是追加到空图纸上，模板文件只提供文件头。

use crate::drawing::{CadDrawing, CadEntity, CadPoint, CadPolyline, CadText};
use crate::error::ExchangeError;
use dxf::entities::EntityType;
use dxf::enums::AcadVersion;
use geoport_core::math::Point2;
use std::io::{Cursor, Read, Write};
use std::path::Path;

/// LWPOLYLINE 需要的最低版本
const MIN_VERSION: AcadVersion = AcadVersion::R2000;

/// 读取模板文件头
pub fn load_template_header(path: &Path) -> Result<dxf::Header, ExchangeError> {
    if !path.is_file() {
        return Err(ExchangeError::ResourceMissing(format!(
            "CAD template not found: {}",
            path.display()
        )));
    }
    let template = dxf::Drawing::load_file(path).map_err(|e| {
        ExchangeError::CodecFailure(format!("cannot read CAD template {}: {e}", path.display()))
    })?;
    Ok(template.header)
}

/// 将图纸写为 DXF
pub fn write<W: Write>(
    drawing: &CadDrawing,
    header: Option<dxf::Header>,
    writer: &mut W,
) -> Result<(), ExchangeError> {
    let mut dxf_drawing = dxf::Drawing::new();
    if let Some(header) = header {
        dxf_drawing.header = header;
    }
    if dxf_drawing.header.version < MIN_VERSION {
        dxf_drawing.header.version = MIN_VERSION;
    }

    for entity in drawing.entities() {
        dxf_drawing.add_entity(convert_to_dxf_entity(entity));
    }

    dxf_drawing.save(writer).map_err(ExchangeError::codec)?;
    Ok(())
}

/// 将图纸写为 DXF 字节
pub fn to_bytes(drawing: &CadDrawing, header: Option<dxf::Header>) -> Result<Vec<u8>, ExchangeError> {
    let mut buffer = Cursor::new(Vec::new());
    write(drawing, header, &mut buffer)?;
    Ok(buffer.into_inner())
}

/// 从 DXF 读取图纸
pub fn read<R: Read>(reader: &mut R) -> Result<CadDrawing, ExchangeError> {
    let dxf_drawing = dxf::Drawing::load(reader).map_err(ExchangeError::codec)?;

    let mut drawing = CadDrawing::new();
    let mut skipped = 0usize;
    for entity in dxf_drawing.entities() {
        match convert_dxf_entity(entity) {
            Some(entity) => drawing.add_entity(entity),
            None => skipped += 1,
        }
    }

    tracing::debug!(
        entities = drawing.entity_count(),
        skipped,
        "read DXF drawing"
    );
    Ok(drawing)
}

/// 从 DXF 字节读取图纸
pub fn from_bytes(bytes: &[u8]) -> Result<CadDrawing, ExchangeError> {
    read(&mut Cursor::new(bytes))
}

fn point2(p: &dxf::Point) -> Point2 {
    Point2::new(p.x, p.y)
}

/// 将DXF实体转换为图纸实体
fn convert_dxf_entity(entity: &dxf::entities::Entity) -> Option<CadEntity> {
    let converted = match &entity.specific {
        EntityType::ModelPoint(point) => CadEntity::Point(CadPoint {
            location: point2(&point.location),
        }),

        EntityType::LwPolyline(lwpoly) => CadEntity::Polyline(CadPolyline {
            vertices: lwpoly
                .vertices
                .iter()
                .map(|v| Point2::new(v.x, v.y))
                .collect(),
            closed: lwpoly.is_closed(),
        }),

        EntityType::Polyline(poly) => CadEntity::Polyline(CadPolyline {
            vertices: poly.vertices().map(|v| point2(&v.location)).collect(),
            closed: poly.is_closed(),
        }),

        EntityType::Line(line) => {
            CadEntity::Polyline(CadPolyline::open(vec![point2(&line.p1), point2(&line.p2)]))
        }

        EntityType::Text(text) => CadEntity::Text(CadText {
            value: text.value.clone(),
            location: point2(&text.location),
            height: text.text_height,
        }),

        EntityType::MText(mtext) => CadEntity::Text(CadText {
            value: mtext.text.clone(),
            location: point2(&mtext.insertion_point),
            height: mtext.initial_text_height,
        }),

        _ => {
            tracing::debug!(layer = %entity.common.layer, "skipping unsupported DXF entity");
            return None;
        }
    };
    Some(converted)
}

/// 将图纸实体转换为DXF实体
fn convert_to_dxf_entity(entity: &CadEntity) -> dxf::entities::Entity {
    let specific = match entity {
        CadEntity::Point(point) => {
            let mut dxf_point = dxf::entities::ModelPoint::default();
            dxf_point.location = dxf::Point::new(point.location.x, point.location.y, 0.0);
            EntityType::ModelPoint(dxf_point)
        }

        CadEntity::Polyline(polyline) => {
            let mut lwpoly = dxf::entities::LwPolyline::default();
            lwpoly.set_is_closed(polyline.closed);
            lwpoly.vertices = polyline
                .vertices
                .iter()
                .map(|p| {
                    let mut vertex = dxf::LwPolylineVertex::default();
                    vertex.x = p.x;
                    vertex.y = p.y;
                    vertex
                })
                .collect();
            EntityType::LwPolyline(lwpoly)
        }

        CadEntity::Text(text) => {
            let mut dxf_text = dxf::entities::Text::default();
            dxf_text.location = dxf::Point::new(text.location.x, text.location.y, 0.0);
            dxf_text.text_height = text.height;
            dxf_text.value = text.value.clone();
            EntityType::Text(dxf_text)
        }
    };

    dxf::entities::Entity::new(specific)
}
