//! 核心错误定义

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("CRS error: {0}")]
    Crs(String),

    #[error("Transform error: {0}")]
    Transform(String),
}
