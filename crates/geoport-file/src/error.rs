//! 格式转换错误定义

use geoport_core::CoreError;
use thiserror::Error;

/// 错误类别（供调用方映射到传输层状态码）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    BadInput,
    ResourceMissing,
    CodecFailure,
    TransformFailure,
}

#[derive(Error, Debug)]
pub enum ExchangeError {
    #[error("{0}")]
    BadInput(String),

    #[error("Resource missing: {0}")]
    ResourceMissing(String),

    #[error("Export failed: {0}")]
    CodecFailure(String),

    #[error("Transform failed: {0}")]
    TransformFailure(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExchangeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExchangeError::BadInput(_) => ErrorKind::BadInput,
            ExchangeError::ResourceMissing(_) => ErrorKind::ResourceMissing,
            ExchangeError::CodecFailure(_) | ExchangeError::Io(_) => ErrorKind::CodecFailure,
            ExchangeError::TransformFailure(_) => ErrorKind::TransformFailure,
        }
    }

    pub(crate) fn codec(err: impl std::fmt::Display) -> Self {
        ExchangeError::CodecFailure(err.to_string())
    }
}

impl From<CoreError> for ExchangeError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidGeometry(msg) => ExchangeError::BadInput(msg),
            CoreError::Crs(msg) | CoreError::Transform(msg) => ExchangeError::TransformFailure(msg),
        }
    }
}
