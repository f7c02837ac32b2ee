use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::FontTransform;
use plotters::style::text_anchor::{HPos, Pos, VPos};

use crate::contour::ContourSet;
use crate::error::{Error, Result};
use crate::layout::PixelRect;
use crate::render::draw_text_best_effort;

/// 刻度线长度（像素）
const TICK_LEN: i32 = 4;
const TICK_PAD: i32 = 2;

/// 色条上每个色带的矩形与颜色，自下而上
pub fn band_rects(rect: PixelRect, contour: &ContourSet) -> Vec<(PixelRect, RGBColor)> {
    let bands = contour.levels.band_count();
    let h = rect.height as f64;
    let edge = |k: usize| rect.bottom() - (k as f64 * h / bands as f64).round() as i32;

    (0..bands)
        .map(|k| {
            let (top, bottom) = (edge(k + 1), edge(k));
            let band_rect = PixelRect {
                x: rect.x,
                y: top,
                width: rect.width,
                height: bottom - top,
            };
            (band_rect, contour.band_color(k))
        })
        .collect()
}

/// 每个层级的刻度位置 (y 像素, 数值)；数值相同的层级只保留一个
pub fn tick_positions(rect: PixelRect, contour: &ContourSet) -> Vec<(i32, f64)> {
    let levels = contour.levels.levels();
    let steps = levels.len().saturating_sub(1).max(1) as f64;
    let mut ticks: Vec<(i32, f64)> = Vec::with_capacity(levels.len());
    for (i, &level) in levels.iter().enumerate() {
        if ticks.last().is_some_and(|&(_, last)| last == level) {
            continue;
        }
        let y = rect.bottom() - (i as f64 * rect.height as f64 / steps).round() as i32;
        ticks.push((y, level));
    }
    ticks
}

/// 刻度文字：常规量级保留 4 位有效数字，过大或过小时使用科学计数法
pub fn format_tick(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    let magnitude = value.abs().log10().floor();
    if !(-3.0..4.0).contains(&magnitude) {
        return format!("{:.2e}", value);
    }
    let decimals = (3.0 - magnitude).clamp(0.0, 6.0) as usize;
    let text = format!("{:.*}", decimals, value);
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        text
    }
}

/// 在画布右侧绘制共享色条：色带、层级刻度和竖排标签
pub fn draw_colorbar<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    rect: PixelRect,
    contour: &ContourSet,
    label: &str,
    font_px: f64,
) -> Result<()> {
    for (band_rect, color) in band_rects(rect, contour) {
        if band_rect.height <= 0 {
            continue;
        }
        area.draw(&Rectangle::new(
            [
                (band_rect.x, band_rect.y),
                (band_rect.right(), band_rect.bottom()),
            ],
            color.filled(),
        ))
        .map_err(Error::draw)?;
    }

    area.draw(&Rectangle::new(
        [(rect.x, rect.y), (rect.right(), rect.bottom())],
        BLACK.stroke_width(1),
    ))
    .map_err(Error::draw)?;

    let tick_style = TextStyle::from(("sans-serif", font_px).into_font())
        .color(&BLACK)
        .pos(Pos::new(HPos::Left, VPos::Center));
    let mut widest = 0usize;
    for (y, value) in tick_positions(rect, contour) {
        area.draw(&PathElement::new(
            vec![(rect.right(), y), (rect.right() + TICK_LEN, y)],
            BLACK.stroke_width(1),
        ))
        .map_err(Error::draw)?;

        let text = format_tick(value);
        widest = widest.max(text.chars().count());
        draw_text_best_effort(area, &text, &tick_style, (rect.right() + TICK_LEN + TICK_PAD, y));
    }

    // 按平均字宽估算刻度文字占用的宽度
    let label_x = rect.right()
        + TICK_LEN
        + TICK_PAD
        + (widest as f64 * font_px * 0.6 + font_px * 0.5).round() as i32;
    let label_style = TextStyle::from(
        ("sans-serif", font_px)
            .into_font()
            .transform(FontTransform::Rotate270),
    )
    .color(&BLACK)
    .pos(Pos::new(HPos::Center, VPos::Center));
    draw_text_best_effort(
        area,
        label,
        &label_style,
        (label_x, rect.y + rect.height / 2),
    );
    Ok(())
}
