//! GeoPort 命令行入口
//!
//! ```text
//! geoport [--config geoport.json] [--verbose] <command> ...
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use geoport_file::ExchangeConfig;

/// GeoJSON / Shapefile / DXF 格式转换
#[derive(Parser, Debug)]
#[command(name = "geoport", version)]
struct Cli {
    /// JSON 配置文件
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// 输出调试日志
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Command {
    /// GeoJSON → Shapefile 压缩包
    ExportShp { input: PathBuf, output: PathBuf },
    /// GeoJSON → DXF
    ExportCad { input: PathBuf, output: PathBuf },
    /// DXF → GeoJSON 响应（省略输出时打印到标准输出）
    ImportCad { input: PathBuf, output: Option<PathBuf> },
    /// 任意坐标系 GeoJSON → WGS84 GeoJSON
    Normalize { input: PathBuf, output: Option<PathBuf> },
    /// 按 EPSG 代码转换单个坐标
    #[command(allow_negative_numbers = true)]
    Convert { x: f64, y: f64, from: u32, to: u32 },
    /// 每个要素的面积（平方米）
    Area { input: PathBuf },
}

fn read_text(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))
}

fn write_output(path: Option<&Path>, bytes: &[u8]) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, bytes)
                .with_context(|| format!("cannot write {}", path.display()))?;
            info!("wrote {} bytes to {}", bytes.len(), path.display());
        }
        None => println!("{}", String::from_utf8_lossy(bytes)),
    }
    Ok(())
}

fn run(command: &Command, config: &ExchangeConfig) -> Result<()> {
    match command {
        Command::ExportShp { input, output } => {
            let zip = geoport_file::export_shapefile(&read_text(input)?, config)?;
            write_output(Some(output), &zip)?;
        }
        Command::ExportCad { input, output } => {
            let dxf = geoport_file::export_cad(&read_text(input)?, config)?;
            write_output(Some(output), &dxf)?;
        }
        Command::ImportCad { input, output } => {
            let bytes = std::fs::read(input)
                .with_context(|| format!("cannot read {}", input.display()))?;
            let imported = geoport_file::import_cad(&bytes);
            let response = serde_json::to_vec_pretty(&imported.to_response())?;
            write_output(output.as_deref(), &response)?;
        }
        Command::Normalize { input, output } => {
            let normalized = geoport_file::normalize_geojson(&read_text(input)?, config)?;
            info!(
                "source CRS {} detected by rule {}",
                normalized.source_crs, normalized.rule
            );
            write_output(output.as_deref(), normalized.geojson.as_bytes())?;
        }
        Command::Convert { x, y, from, to } => {
            let point = geoport_file::convert_coordinate(*x, *y, *from, *to)?;
            println!("{} {}", point.x, point.y);
        }
        Command::Area { input } => {
            for (id, area) in geoport_file::feature_areas(&read_text(input)?)? {
                println!("{id}\t{area:.3}");
            }
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // 初始化日志
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing::subscriber::set_global_default(
        FmtSubscriber::builder()
            .with_max_level(level)
            .with_writer(std::io::stderr)
            .finish(),
    )?;

    info!("Starting GeoPort...");

    let config = match &cli.config {
        Some(path) => ExchangeConfig::load(path)?,
        None => ExchangeConfig::default(),
    };

    run(&cli.command, &config)
}
