//! 基于 plotters 的绘制：画布、三维切片子图与色条。

pub mod colorbar;
pub mod figure;
pub mod panel;

use plotters::coord::Shift;
use plotters::prelude::*;
use tracing::warn;

pub use colorbar::draw_colorbar;
pub use figure::Figure;
pub use panel::{Axes3d, PanelScene, SliceRenderer};

/// 立方体线框颜色
pub const EDGE_COLOR: RGBColor = RGBColor(102, 102, 102);

/// 绘制文字；字体不可用时只记录警告，不中断绘图
pub(crate) fn draw_text_best_effort<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    text: &str,
    style: &TextStyle<'_>,
    pos: (i32, i32),
) {
    if let Err(e) = area.draw_text(text, style, pos) {
        warn!(text, error = %e, "文字绘制失败，已跳过");
    }
}
