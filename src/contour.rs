//! 填充等值线：层级划分、色带归类，以及三个边界面的色块生成。

use ndarray::ArrayView2;
use plotters::style::RGBColor;
use plotters::style::colors::colormaps::{ColorMap, ViridisRGB};

use crate::density_field::{DensityField, GridAxis};

/// 等值线层级（色带边界）
#[derive(Debug, Clone, PartialEq)]
pub struct ContourLevels {
    levels: Vec<f64>,
}

impl ContourLevels {
    /// 在 [vmin, vmax] 上均匀取 `count` 个边界，与 numpy.linspace 一致：
    /// `level[i] = vmin + i * (vmax - vmin) / (count - 1)`，最后一个强制等于 vmax
    pub fn linspace(vmin: f64, vmax: f64, count: usize) -> Self {
        let count = count.max(1);
        if count == 1 {
            return ContourLevels { levels: vec![vmin] };
        }

        let step = (vmax - vmin) / (count - 1) as f64;
        let mut levels: Vec<f64> = (0..count).map(|i| vmin + i as f64 * step).collect();
        levels[count - 1] = vmax;
        ContourLevels { levels }
    }

    pub fn levels(&self) -> &[f64] {
        &self.levels
    }

    pub fn vmin(&self) -> f64 {
        self.levels[0]
    }

    pub fn vmax(&self) -> f64 {
        self.levels[self.levels.len() - 1]
    }

    /// 所有层级都相同（常数场）
    pub fn is_degenerate(&self) -> bool {
        self.vmax() <= self.vmin()
    }

    /// 色带数；常数场只有一个色带
    pub fn band_count(&self) -> usize {
        if self.is_degenerate() {
            return 1;
        }
        self.levels.len().saturating_sub(1).max(1)
    }

    /// 数值所在的色带编号
    ///
    /// 色带 k 覆盖 `[level[k], level[k+1])`，vmax 归入最高色带。
    /// NaN 以及超出 [vmin, vmax] 的值不填充，返回 None。
    pub fn band_of(&self, value: f64) -> Option<usize> {
        if !value.is_finite() || value < self.vmin() || value > self.vmax() {
            return None;
        }
        if self.is_degenerate() {
            return Some(0);
        }
        let below = self.levels.partition_point(|&level| level <= value);
        Some(below.saturating_sub(1).min(self.band_count() - 1))
    }

    /// 色带在颜色映射中的位置 (0..1)，取色带中点
    pub fn band_fraction(&self, band: usize) -> f64 {
        if self.is_degenerate() {
            return 0.0;
        }
        (band as f64 + 0.5) / self.band_count() as f64
    }
}

/// 填充等值线的颜色映射对象，供共享色条使用
#[derive(Debug, Clone, PartialEq)]
pub struct ContourSet {
    pub levels: ContourLevels,
}

impl ContourSet {
    pub fn new(levels: ContourLevels) -> Self {
        ContourSet { levels }
    }

    /// 色带颜色取自 viridis
    pub fn band_color(&self, band: usize) -> RGBColor {
        ViridisRGB.get_color(self.levels.band_fraction(band))
    }
}

/// 箱体上绘制等值线的三个边界面
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryFace {
    /// 顶面 z = Zmax，覆盖 X–Y
    ZMax,
    /// 前面 y = 0，覆盖 X–Z
    YMin,
    /// 右面 x = Xmax，覆盖 Y–Z
    XMax,
}

impl BoundaryFace {
    /// 绘制顺序，最后一个面的等值线对象作为返回值
    pub const ALL: [BoundaryFace; 3] = [BoundaryFace::ZMax, BoundaryFace::YMin, BoundaryFace::XMax];

    pub fn normal(self) -> GridAxis {
        match self {
            BoundaryFace::ZMax => GridAxis::Z,
            BoundaryFace::YMin => GridAxis::Y,
            BoundaryFace::XMax => GridAxis::X,
        }
    }

    /// 切片在法向上的下标
    pub fn slice_index(self, shape: [usize; 3]) -> usize {
        match self {
            BoundaryFace::ZMax => shape[2].saturating_sub(1),
            BoundaryFace::YMin => 0,
            BoundaryFace::XMax => shape[0].saturating_sub(1),
        }
    }

    /// 面内坐标 (u, v) 对应的三维坐标
    pub fn point(self, shape: [usize; 3], u: f64, v: f64) -> [f64; 3] {
        let plane = self.slice_index(shape) as f64;
        match self {
            BoundaryFace::ZMax => [u, v, plane],
            BoundaryFace::YMin => [u, plane, v],
            BoundaryFace::XMax => [plane, u, v],
        }
    }

    /// 面的中心点
    pub fn center(self, shape: [usize; 3]) -> [f64; 3] {
        let half = |n: usize| n.saturating_sub(1) as f64 / 2.0;
        match self {
            BoundaryFace::ZMax => self.point(shape, half(shape[0]), half(shape[1])),
            BoundaryFace::YMin => self.point(shape, half(shape[0]), half(shape[2])),
            BoundaryFace::XMax => self.point(shape, half(shape[1]), half(shape[2])),
        }
    }

    pub fn values<'a>(self, field: &'a DensityField) -> ArrayView2<'a, f64> {
        field.slice(self.normal(), self.slice_index(field.shape()))
    }
}

/// 同一色带的四边形色块，顶点为三维坐标
#[derive(Debug, Clone, PartialEq)]
pub struct BandQuad {
    pub band: usize,
    pub corners: [[f64; 3]; 4],
}

/// 采样节点下标：首尾节点总会保留，除最后一段可能较短外相邻节点间隔一致，单元数不超过 `max_cells`
pub fn sample_nodes(n: usize, max_cells: usize) -> Vec<usize> {
    if n <= 1 {
        return (0..n).collect();
    }
    let cells = n - 1;
    let stride = cells.div_ceil(max_cells.max(1)).max(1);
    let mut nodes: Vec<usize> = (0..n).step_by(stride).collect();
    if nodes.last() != Some(&(n - 1)) {
        nodes.push(n - 1);
    }
    nodes
}

/// 把一个边界面切成色块
///
/// 每个单元取四个角点的平均值归类到色带；同一行内相邻的同色带单元合并为一个四边形。
pub fn face_quads(
    field: &DensityField,
    face: BoundaryFace,
    levels: &ContourLevels,
    max_cells: usize,
) -> Vec<BandQuad> {
    let shape = field.shape();
    let values = face.values(field);
    let (nu, nv) = values.dim();
    let us = sample_nodes(nu, max_cells);
    let vs = sample_nodes(nv, max_cells);

    let mut quads = Vec::new();
    let mut flush = |band: usize, u_start: usize, u_end: usize, v0: usize, v1: usize| {
        let (a, b) = (u_start as f64, u_end as f64);
        let (c, d) = (v0 as f64, v1 as f64);
        quads.push(BandQuad {
            band,
            corners: [
                face.point(shape, a, c),
                face.point(shape, b, c),
                face.point(shape, b, d),
                face.point(shape, a, d),
            ],
        });
    };

    for vw in vs.windows(2) {
        let (v0, v1) = (vw[0], vw[1]);
        let mut run: Option<(usize, usize)> = None;

        for uw in us.windows(2) {
            let (u0, u1) = (uw[0], uw[1]);
            let mean = (values[[u0, v0]] + values[[u1, v0]] + values[[u0, v1]] + values[[u1, v1]])
                / 4.0;
            let band = levels.band_of(mean);

            match (run, band) {
                (Some((current, _)), Some(next)) if current == next => {}
                _ => {
                    if let Some((current, start)) = run {
                        flush(current, start, u0, v0, v1);
                    }
                    run = band.map(|b| (b, u0));
                }
            }
        }

        if let (Some((current, start)), Some(&last)) = (run, us.last()) {
            flush(current, start, last, v0, v1);
        }
    }

    quads
}
