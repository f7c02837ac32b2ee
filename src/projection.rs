//! 三维箱体到子图像素坐标的正交投影，基于 plotters 的 `Cartesian3d`。
//!
//! 相机由仰角和方位角确定（与 matplotlib 的 `view_init(elev, azim)` 含义相同），
//! z 轴朝上。plotters 的纵轴是逻辑 Y，因此网格坐标 (x, y, z) 按 (y, z, x) 传入；
//! 此时 yaw 等于方位角、pitch 等于仰角。
//! 箱体按 `box_aspect` 设定各轴像素长度，居中放入子图矩形，`zoom` 控制占比。

use plotters::coord::CoordTranslate;
use plotters::coord::ranged3d::{Cartesian3d, ProjectionMatrixBuilder};
use plotters::coord::types::RangedCoordf64;

use crate::layout::PixelRect;

/// zoom = 1 时投影包围盒占子图的比例
const BASE_FILL: f64 = 0.7;

/// 箱体最长轴在投影前的像素长度
const LOGIC_SIZE: f64 = 1000.0;

pub type BoxCoord = Cartesian3d<RangedCoordf64, RangedCoordf64, RangedCoordf64>;

/// 箱体角点下标的位含义：bit0 → x 取最大，bit1 → y 取最大，bit2 → z 取最大
pub fn box_corners(shape: [usize; 3]) -> [[f64; 3]; 8] {
    let max = |n: usize| n.saturating_sub(1) as f64;
    let mut corners = [[0.0; 3]; 8];
    for (index, corner) in corners.iter_mut().enumerate() {
        for axis in 0..3 {
            if index & (1 << axis) != 0 {
                corner[axis] = max(shape[axis]);
            }
        }
    }
    corners
}

/// 箱体的 12 条棱（以角点下标表示）
pub fn box_edges() -> Vec<(usize, usize)> {
    let mut edges = Vec::with_capacity(12);
    for corner in 0..8usize {
        for axis in 0..3 {
            let bit = 1 << axis;
            if corner & bit == 0 {
                edges.push((corner, corner | bit));
            }
        }
    }
    edges
}

/// 网格坐标 → plotters 逻辑坐标
pub fn to_logic(p: [f64; 3]) -> (f64, f64, f64) {
    (p[1], p[2], p[0])
}

pub struct BoxProjector {
    coord: BoxCoord,
}

impl BoxProjector {
    pub fn new(
        shape: [usize; 3],
        box_aspect: [f64; 3],
        elevation_deg: f64,
        azimuth_deg: f64,
        zoom: f64,
        rect: PixelRect,
    ) -> Self {
        let extent = shape.map(|n| n.saturating_sub(1).max(1) as f64);
        let largest = box_aspect.iter().cloned().fold(f64::MIN_POSITIVE, f64::max);
        let size = box_aspect.map(|a| ((a / largest) * LOGIC_SIZE).round().max(1.0) as i32);

        let pixels_x = rect.x..rect.right();
        let pixels_y = rect.y..rect.bottom();
        let (yaw, pitch) = (azimuth_deg.to_radians(), elevation_deg.to_radians());

        let mut coord: BoxCoord = Cartesian3d::new(
            0.0..extent[1],
            0.0..extent[2],
            0.0..extent[0],
            (pixels_x.clone(), pixels_y.clone()),
        );
        coord.set_coord_pixel_range(
            pixels_x.clone(),
            pixels_y.clone(),
            (size[1], size[2], size[0]),
        );
        let oriented = move |scale: f64| {
            move |mut pb: ProjectionMatrixBuilder| {
                pb.yaw = yaw;
                pb.pitch = pitch;
                pb.scale = scale;
                pb.into_matrix()
            }
        };

        // 先以原始比例投影八个角点，由包围盒确定缩放
        coord.set_projection(pixels_x.clone(), pixels_y.clone(), oriented(1.0));
        let (mut min_x, mut max_x) = (i32::MAX, i32::MIN);
        let (mut min_y, mut max_y) = (i32::MAX, i32::MIN);
        for corner in box_corners(shape) {
            let (sx, sy) = coord.translate(&to_logic(corner));
            min_x = min_x.min(sx);
            max_x = max_x.max(sx);
            min_y = min_y.min(sy);
            max_y = max_y.max(sy);
        }
        let span_x = (max_x - min_x).max(1) as f64;
        let span_y = (max_y - min_y).max(1) as f64;
        let scale = (rect.width as f64 / span_x).min(rect.height as f64 / span_y)
            * BASE_FILL
            * zoom;

        coord.set_projection(pixels_x, pixels_y, oriented(scale));
        BoxProjector { coord }
    }

    /// 已设置好投影的坐标系，可直接作为绘图区域的坐标
    pub fn coord(&self) -> &BoxCoord {
        &self.coord
    }

    /// 网格坐标投影到像素坐标
    pub fn project(&self, p: [f64; 3]) -> (i32, i32) {
        self.coord.translate(&to_logic(p))
    }

    /// 到屏幕的距离（像素），数值越大离相机越远
    pub fn depth(&self, p: [f64; 3]) -> i32 {
        let (x, y, z) = to_logic(p);
        self.coord.projected_depth(&x, &y, &z)
    }

    /// 离相机最远、被箱体遮住的角点
    pub fn hidden_corner(&self, shape: [usize; 3]) -> usize {
        let corners = box_corners(shape);
        (0..corners.len())
            .max_by_key(|&index| self.depth(corners[index]))
            .unwrap_or(0)
    }

    /// 可见的棱：去掉与被遮挡角点相连的三条
    pub fn visible_edges(&self, shape: [usize; 3]) -> Vec<[[f64; 3]; 2]> {
        let corners = box_corners(shape);
        let hidden = self.hidden_corner(shape);
        box_edges()
            .into_iter()
            .filter(|&(a, b)| a != hidden && b != hidden)
            .map(|(a, b)| [corners[a], corners[b]])
            .collect()
    }
}
