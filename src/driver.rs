use std::path::PathBuf;

use plotters::prelude::*;
use tracing::info;

use crate::app_state::AppState;
use crate::config::Normalization;
use crate::contour::ContourSet;
use crate::error::{Error, Result};
use crate::layout::{GridSpec, PixelRect};
use crate::render::{Axes3d, Figure, SliceRenderer, draw_colorbar};

/// 一次绘图运行的结果摘要
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub output: PathBuf,
    pub panels: usize,
    /// 色条显示的范围
    pub colorbar_range: (f64, f64),
}

/// 绘制完整的多子图对比图并写出 PNG
///
/// ## 流程
/// 1. 校验配置并计算子图网格、色条位置
/// 2. 共享归一化时先扫描全部文件得到全局范围
/// 3. 按行优先顺序依次加载、绘制每个子图
/// 4. 用最后一个子图的等值线对象绘制色条
/// 5. 编码并写出 PNG
///
/// 任一子图加载失败都会立即返回错误，此时不会写出任何文件。
pub fn run(app_state: &AppState) -> Result<RunSummary> {
    let config = &app_state.config;
    let perf = &app_state.performance_store;

    // ==================== 步骤 1: 配置校验与布局 ====================
    config.validate()?;
    let figure_size = config.figure.pixels();
    let cells = GridSpec::new(config.layout.clone()).cells(figure_size);
    let colorbar_rect = PixelRect::from_fraction(figure_size, config.colorbar.rect);
    info!(
        width = figure_size.0,
        height = figure_size.1,
        panels = config.panels.len(),
        "开始绘制"
    );

    // ==================== 步骤 2: 颜色范围 ====================
    let shared_range = match config.colorbar.normalization {
        Normalization::PerPanel => None,
        Normalization::Shared => {
            let range = perf.measure("load", "global_range", "扫描全局范围", || {
                global_range(app_state)
            })?;
            info!(vmin = range.0, vmax = range.1, "全局颜色范围");
            Some(range)
        }
    };
    let renderer = SliceRenderer::new(app_state).with_shared_range(shared_range);

    // ==================== 步骤 3 & 4: 子图与色条 ====================
    let mut figure = Figure::new(figure_size);
    let contour = figure.draw(|root| {
        root.fill(&WHITE).map_err(Error::draw)?;

        let mut last: Option<ContourSet> = None;
        for (index, (panel, rect)) in config.panels.iter().zip(cells.iter()).enumerate() {
            let axes = Axes3d::new(root, *rect);
            last = Some(renderer.render(index, panel, &axes)?);
        }

        let contour = last.ok_or_else(|| Error::InvalidConfig("没有可绘制的子图".to_string()))?;
        perf.measure("render", "colorbar", &config.colorbar.label, || {
            draw_colorbar(
                root,
                colorbar_rect,
                &contour,
                &config.colorbar.label,
                config.figure.points_to_pixels(config.label_font_pt),
            )
        })?;
        Ok(contour)
    })?;

    // ==================== 步骤 5: 写出 PNG ====================
    let output_name = config.output.display().to_string();
    perf.measure("save", "output", &output_name, || figure.save_png(&config.output))?;
    info!(output = %output_name, "图像已保存");

    Ok(RunSummary {
        output: config.output.clone(),
        panels: config.panels.len(),
        colorbar_range: (contour.levels.vmin(), contour.levels.vmax()),
    })
}

/// 全部子图数据的最小/最大值
pub fn global_range(app_state: &AppState) -> Result<(f64, f64)> {
    let renderer = SliceRenderer::new(app_state);
    let mut range: Option<(f64, f64)> = None;
    for panel in &app_state.config.panels {
        let (lo, hi) = renderer.load_field(panel)?.value_range()?;
        range = Some(match range {
            Some((vmin, vmax)) => (vmin.min(lo), vmax.max(hi)),
            None => (lo, hi),
        });
    }
    range.ok_or(Error::NoFiniteValues)
}
