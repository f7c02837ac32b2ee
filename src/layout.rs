//! 画布布局：子图网格单元与色条位置（像素坐标，原点在左上角）。

use crate::config::LayoutConfig;

/// 像素矩形
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl PixelRect {
    /// 由画布比例 [left, bottom, width, height]（原点在左下角）换算
    pub fn from_fraction(figure: (u32, u32), rect: [f64; 4]) -> Self {
        let (fw, fh) = (figure.0 as f64, figure.1 as f64);
        let [left, bottom, width, height] = rect;
        PixelRect {
            x: (left * fw).round() as i32,
            y: ((1.0 - bottom - height) * fh).round() as i32,
            width: (width * fw).round() as i32,
            height: (height * fh).round() as i32,
        }
    }

    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    /// 矩形内相对坐标（原点在左下角，与 matplotlib 的 transAxes 一致）换算为像素
    pub fn relative_point(&self, rx: f64, ry: f64) -> (i32, i32) {
        (
            (self.x as f64 + rx * self.width as f64).round() as i32,
            (self.bottom() as f64 - ry * self.height as f64).round() as i32,
        )
    }

    pub fn contains(&self, point: (i32, i32)) -> bool {
        point.0 >= self.x && point.0 <= self.right() && point.1 >= self.y && point.1 <= self.bottom()
    }
}

/// rows × cols 的子图网格，单元间距为单元尺寸的 wspace / hspace 倍
#[derive(Debug, Clone)]
pub struct GridSpec {
    config: LayoutConfig,
}

impl GridSpec {
    pub fn new(config: LayoutConfig) -> Self {
        GridSpec { config }
    }

    pub fn rows(&self) -> usize {
        self.config.rows
    }

    pub fn cols(&self) -> usize {
        self.config.cols
    }

    /// 单元 (row, col) 的像素矩形，第 0 行在最上方
    pub fn cell(&self, row: usize, col: usize, figure: (u32, u32)) -> PixelRect {
        let c = &self.config;
        let (rows, cols) = (c.rows.max(1) as f64, c.cols.max(1) as f64);

        let cell_w = (c.right - c.left) / (cols + c.wspace * (cols - 1.0));
        let sep_w = c.wspace * cell_w;
        let cell_h = (c.top - c.bottom) / (rows + c.hspace * (rows - 1.0));
        let sep_h = c.hspace * cell_h;

        let left = c.left + col as f64 * (cell_w + sep_w);
        let top = c.top - row as f64 * (cell_h + sep_h);
        PixelRect::from_fraction(figure, [left, top - cell_h, cell_w, cell_h])
    }

    /// 按行优先顺序列出全部单元
    pub fn cells(&self, figure: (u32, u32)) -> Vec<PixelRect> {
        let mut cells = Vec::with_capacity(self.rows() * self.cols());
        for row in 0..self.rows() {
            for col in 0..self.cols() {
                cells.push(self.cell(row, col, figure));
            }
        }
        cells
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_grid_geometry() {
        let grid = GridSpec::new(LayoutConfig::default());
        let figure = (1200, 600);
        let cells = grid.cells(figure);
        assert_eq!(cells.len(), 6);

        // 左上单元从 left = 0.125 开始，顶部在 top = 0.88
        assert_eq!(cells[0].x, 150);
        assert_eq!(cells[0].y, 72);
        // 右下单元贴住 right = 0.9 与 bottom = 0.11
        assert!((cells[5].right() - 1080).abs() <= 1);
        assert!((cells[5].bottom() - 534).abs() <= 1);

        // 同一行的单元高度一致，列之间有间隔
        assert_eq!(cells[0].y, cells[2].y);
        assert!(cells[1].x > cells[0].right());
        assert!(cells[3].y > cells[0].bottom());
    }

    #[test]
    fn test_colorbar_fraction() {
        let rect = PixelRect::from_fraction((1200, 600), [0.91, 0.25, 0.015, 0.5]);
        assert_eq!(rect, PixelRect { x: 1092, y: 150, width: 18, height: 300 });
    }

    #[test]
    fn test_relative_point_below_panel() {
        let rect = PixelRect { x: 100, y: 50, width: 200, height: 100 };
        assert_eq!(rect.relative_point(0.5, -0.1), (200, 160));
        assert_eq!(rect.relative_point(0.0, 1.0), (100, 50));
    }
}
