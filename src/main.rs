use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use density_slices::{AppState, FigureConfig, run};

#[derive(Parser, Debug)]
#[command(name = "density-slices", version, about = "三维密度张量的等值线切片对比图")]
struct Cli {
    /// JSON 配置文件，缺省的键取默认值
    #[arg(long)]
    config: Option<PathBuf>,

    /// 输出 PNG 路径
    #[arg(long)]
    output: Option<PathBuf>,

    /// 写出各阶段耗时的 JSON 报告
    #[arg(long)]
    timing_report: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 列出 MAT 文件的头部信息和变量（不读取数据）
    Inspect {
        file: PathBuf,
        /// 只输出该变量的维度
        #[arg(long)]
        field: Option<String>,
    },
    /// 以 JSON 输出默认配置
    DefaultConfig,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match &cli.command {
        Some(Command::Inspect { file, field }) => {
            print!("{}", inspect_report(file, field.as_deref())?);
            Ok(())
        }
        Some(Command::DefaultConfig) => {
            println!("{}", default_config_json()?);
            Ok(())
        }
        None => render(&cli),
    }
}

fn render(cli: &Cli) -> anyhow::Result<()> {
    let mut config = match &cli.config {
        Some(path) => FigureConfig::from_file(path)
            .with_context(|| format!("加载配置失败: {}", path.display()))?,
        None => FigureConfig::default(),
    };
    if let Some(output) = &cli.output {
        config.output = output.clone();
    }

    let app_state = AppState::new(config);
    let extensions = app_state.parser_registry.supported_extensions();
    info!(?extensions, "已注册的解析器");

    let result = run(&app_state).context("绘图失败");

    // 失败时同样写出已记录的耗时，便于定位慢的阶段；绘图错误优先上报
    if let Some(path) = &cli.timing_report {
        match app_state.performance_store.write_report(path) {
            Ok(()) => info!(path = %path.display(), "耗时报告已写出"),
            Err(e) if result.is_err() => {
                warn!(path = %path.display(), error = %e, "写出耗时报告失败");
            }
            Err(e) => {
                return Err(e).with_context(|| format!("写出耗时报告失败: {}", path.display()));
            }
        }
    }

    let summary = result?;
    let perf = &app_state.performance_store;
    info!(
        output = %summary.output.display(),
        panels = summary.panels,
        vmin = summary.colorbar_range.0,
        vmax = summary.colorbar_range.1,
        load_ms = perf.total_ms("load"),
        render_ms = perf.total_ms("render"),
        save_ms = perf.total_ms("save"),
        "完成"
    );
    Ok(())
}

/// 文件头和变量列表；指定 `field` 时只读取该变量的维度
fn inspect_report(file: &Path, field: Option<&str>) -> anyhow::Result<String> {
    let app_state = AppState::new(FigureConfig::default());
    let parser = app_state.parser_registry.require_parser(file)?;
    let mut out = String::new();

    if let Some(field) = field {
        let dims = parser
            .get_shape_from_file(file, field)
            .with_context(|| format!("读取文件失败: {}", file.display()))?;
        writeln!(out, "{} {:?}", field, dims)?;
        return Ok(out);
    }

    let summary = parser
        .describe(file)
        .with_context(|| format!("读取文件失败: {}", file.display()))?;
    writeln!(out, "{}", summary.header.trim_end())?;
    for field in &summary.fields {
        writeln!(
            out,
            "  {:<24} {:<8} {:?}{}",
            field.name,
            field.class,
            field.dims,
            if field.complex { " complex" } else { "" }
        )?;
    }
    Ok(out)
}

fn default_config_json() -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(&FigureConfig::default())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use density_slices::parsers::MatWriter;
    use density_slices::{Error, PanelSpec};
    use tempfile::TempDir;

    fn write_fixture(tmp: &TempDir) -> PathBuf {
        let path = tmp.path().join("fixture.mat");
        let writer = MatWriter::new().compressed(true);
        let mut bytes = Vec::new();
        writer.write_header(&mut bytes).unwrap();
        writer
            .write_variable(&mut bytes, "density", &[4, 3, 2], &[0.5; 24])
            .unwrap();
        writer
            .write_variable(&mut bytes, "mask", &[2, 1], &[1.0, 0.0])
            .unwrap();
        std::fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn test_inspect_lists_header_and_fields() {
        let tmp = TempDir::new().unwrap();
        let path = write_fixture(&tmp);

        let report = inspect_report(&path, None).unwrap();
        let lines: Vec<&str> = report.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("MATLAB 5.0"));
        assert!(lines[1].trim_start().starts_with("density"));
        assert!(lines[1].contains("double"));
        assert!(lines[1].ends_with("[4, 3, 2]"));
        assert!(lines[2].trim_start().starts_with("mask"));
    }

    #[test]
    fn test_inspect_single_field_shape() {
        let tmp = TempDir::new().unwrap();
        let path = write_fixture(&tmp);

        assert_eq!(
            inspect_report(&path, Some("density")).unwrap(),
            "density [4, 3, 2]\n"
        );
        let err = inspect_report(&path, Some("missing")).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::FieldNotFound { .. })
        ));
    }

    #[test]
    fn test_inspect_rejects_unknown_extension() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("density.h5");
        std::fs::write(&path, b"").unwrap();
        let err = inspect_report(&path, None).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn test_default_config_parses_back() {
        let text = default_config_json().unwrap();
        let config: FigureConfig = serde_json::from_str(&text).unwrap();
        assert_eq!(config.panels.len(), FigureConfig::default().panels.len());
        assert_eq!(config.grid_shape, FigureConfig::default().grid_shape);
    }

    #[test]
    fn test_render_error_wins_over_report_error() {
        let tmp = TempDir::new().unwrap();
        let mut config = FigureConfig::default();
        config.panels = vec![PanelSpec::new(tmp.path().join("missing.mat"), "a")];
        let config_path = tmp.path().join("config.json");
        std::fs::write(&config_path, serde_json::to_vec(&config).unwrap()).unwrap();

        let cli = Cli {
            config: Some(config_path),
            output: Some(tmp.path().join("out.png")),
            timing_report: Some(tmp.path().join("no_such_dir").join("timing.json")),
            command: None,
        };
        let err = render(&cli).unwrap_err();
        assert!(
            err.chain()
                .any(|e| matches!(e.downcast_ref::<Error>(), Some(Error::FileNotFound(_))))
        );
        assert!(!tmp.path().join("out.png").exists());
    }

    #[test]
    fn test_report_error_surfaces_after_successful_render() {
        let tmp = TempDir::new().unwrap();
        let path = write_fixture(&tmp);
        let mut config = FigureConfig::default();
        config.grid_shape = [3, 4, 2];
        config.panels = vec![PanelSpec::new(&path, "a")];
        config.figure.width_in = 3.0;
        config.figure.height_in = 1.5;
        let config_path = tmp.path().join("config.json");
        std::fs::write(&config_path, serde_json::to_vec(&config).unwrap()).unwrap();

        let cli = Cli {
            config: Some(config_path),
            output: Some(tmp.path().join("out.png")),
            timing_report: Some(tmp.path().join("no_such_dir").join("timing.json")),
            command: None,
        };
        let err = render(&cli).unwrap_err();
        assert!(err.to_string().contains("写出耗时报告失败"));
        assert!(tmp.path().join("out.png").exists());
    }
}
