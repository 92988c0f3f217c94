//! 请求级临时工作区
//!
//! 每个请求在唯一命名的临时目录中生成中间文件，工作区被丢弃时
//! 目录连同内容一并删除（成功、校验失败或中途出错都一样）。

use crate::error::ExchangeError;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const PREFIX: &str = "geoport-";

/// 临时工作区
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    /// 在 `root` 下（默认系统临时目录）创建工作区
    pub fn create(root: Option<&Path>) -> Result<Self, ExchangeError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(PREFIX);
        let dir = match root {
            Some(root) => builder.tempdir_in(root)?,
            None => builder.tempdir()?,
        };
        tracing::debug!(path = %dir.path().display(), "created workspace");
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// 工作区内的文件路径
    pub fn file(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// 将工作区内的文件按顺序打包为 zip
    ///
    /// 任一文件缺失时整体失败，不产出部分结果。
    pub fn package_zip(&self, names: &[&str]) -> Result<Vec<u8>, ExchangeError> {
        let mut contents = Vec::with_capacity(names.len());
        for name in names {
            let path = self.file(name);
            let data = std::fs::read(&path).map_err(|e| {
                ExchangeError::CodecFailure(format!("missing artifact {name}: {e}"))
            })?;
            contents.push((*name, data));
        }

        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, data) in contents {
            zip.start_file::<_, ()>(name, zip::write::FileOptions::default())
                .map_err(ExchangeError::codec)?;
            zip.write_all(&data)?;
        }
        let writer = zip.finish().map_err(ExchangeError::codec)?;
        Ok(writer.into_inner())
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        tracing::debug!(path = %self.dir.path().display(), "removing workspace");
    }
}
