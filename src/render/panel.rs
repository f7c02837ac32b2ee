use std::time::Instant;

use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use tracing::{debug, info};

use crate::app_state::AppState;
use crate::config::PanelSpec;
use crate::contour::{BandQuad, BoundaryFace, ContourLevels, ContourSet, face_quads};
use crate::density_field::DensityField;
use crate::error::{Error, Result};
use crate::layout::PixelRect;
use crate::projection::{BoxProjector, to_logic};
use crate::render::{EDGE_COLOR, draw_text_best_effort};

/// 三维子图：画布上的一块矩形区域
pub struct Axes3d<'a, DB: DrawingBackend> {
    area: &'a DrawingArea<DB, Shift>,
    rect: PixelRect,
}

impl<'a, DB: DrawingBackend> Axes3d<'a, DB> {
    pub fn new(area: &'a DrawingArea<DB, Shift>, rect: PixelRect) -> Self {
        Axes3d { area, rect }
    }
}

/// 一个子图要绘制的全部几何，与绘图后端无关
#[derive(Debug, Clone)]
pub struct PanelScene {
    pub shape: [usize; 3],
    /// 按由远及近的顺序排列
    pub faces: Vec<(BoundaryFace, Vec<BandQuad>)>,
    pub edges: Vec<[[f64; 3]; 2]>,
    pub contour: ContourSet,
}

impl PanelScene {
    pub fn build(
        field: &DensityField,
        levels: ContourLevels,
        projector: &BoxProjector,
        max_face_cells: usize,
    ) -> Self {
        let shape = field.shape();
        let mut order = BoundaryFace::ALL.to_vec();
        order.sort_by_key(|face| std::cmp::Reverse(projector.depth(face.center(shape))));

        let faces = order
            .into_iter()
            .map(|face| (face, face_quads(field, face, &levels, max_face_cells)))
            .collect();

        PanelScene {
            shape,
            faces,
            edges: projector.visible_edges(shape),
            contour: ContourSet::new(levels),
        }
    }

    pub fn quad_count(&self) -> usize {
        self.faces.iter().map(|(_, quads)| quads.len()).sum()
    }
}

/// 读取密度文件并绘制成三维等值线切片子图
pub struct SliceRenderer<'a> {
    state: &'a AppState,
    shared_range: Option<(f64, f64)>,
}

impl<'a> SliceRenderer<'a> {
    pub fn new(state: &'a AppState) -> Self {
        SliceRenderer {
            state,
            shared_range: None,
        }
    }

    /// 所有子图使用同一个颜色范围
    pub fn with_shared_range(mut self, range: Option<(f64, f64)>) -> Self {
        self.shared_range = range;
        self
    }

    /// 加载子图对应的密度场，并校验网格形状
    pub fn load_field(&self, panel: &PanelSpec) -> Result<DensityField> {
        let config = &self.state.config;
        let parser = self.state.parser_registry.require_parser(&panel.file)?;
        debug!(file = %panel.file.display(), parser = parser.name(), "读取密度文件");
        let raw = parser.parse_from_file(&panel.file, config.field_for(panel))?;
        let field = DensityField::from_raw(raw, config.axis_order)?;
        field.check_shape(config.grid_shape)?;
        Ok(field)
    }

    /// 绘制一个子图，返回其等值线对象（供色条使用）
    ///
    /// 任何加载错误都会直接返回，不会绘制半成品子图。
    pub fn render<DB: DrawingBackend>(
        &self,
        index: usize,
        panel: &PanelSpec,
        axes: &Axes3d<'_, DB>,
    ) -> Result<ContourSet> {
        let config = &self.state.config;
        let perf = &self.state.performance_store;
        let channel = format!("panel_{}", index + 1);
        let started = Instant::now();

        let field = perf.measure("load", &channel, &panel.label, || self.load_field(panel))?;
        let (vmin, vmax) = match self.shared_range {
            Some(range) => range,
            None => field.value_range()?,
        };
        debug!(file = %panel.file.display(), vmin, vmax, "密度范围");

        let levels = ContourLevels::linspace(vmin, vmax, config.contour.levels);
        let projector = BoxProjector::new(
            field.shape(),
            config.box_aspect(),
            config.view.elevation_deg,
            config.view.azimuth_deg,
            config.view.zoom,
            axes.rect,
        );
        let scene = PanelScene::build(&field, levels, &projector, config.contour.max_face_cells);

        perf.measure("render", &channel, &panel.label, || {
            draw_scene(axes, &scene, &projector, &panel.label, self.label_px())
        })?;

        info!(
            panel = index + 1,
            label = %panel.label,
            quads = scene.quad_count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "子图绘制完成"
        );
        Ok(scene.contour)
    }

    fn label_px(&self) -> f64 {
        let config = &self.state.config;
        config.figure.points_to_pixels(config.label_font_pt)
    }
}

/// 按由远及近的顺序画三个面，再画线框和标注
fn draw_scene<DB: DrawingBackend>(
    axes: &Axes3d<'_, DB>,
    scene: &PanelScene,
    projector: &BoxProjector,
    label: &str,
    label_px: f64,
) -> Result<()> {
    let box_area = axes.area.apply_coord_spec(projector.coord().clone());
    for (_, quads) in &scene.faces {
        for quad in quads {
            let points: Vec<(f64, f64, f64)> = quad.corners.iter().map(|&c| to_logic(c)).collect();
            let color = scene.contour.band_color(quad.band);
            box_area
                .draw(&Polygon::new(points, color.filled()))
                .map_err(Error::draw)?;
        }
    }

    for [a, b] in &scene.edges {
        box_area
            .draw(&PathElement::new(
                vec![to_logic(*a), to_logic(*b)],
                EDGE_COLOR.stroke_width(1),
            ))
            .map_err(Error::draw)?;
    }

    let style = TextStyle::from(("sans-serif", label_px).into_font())
        .color(&BLACK)
        .pos(Pos::new(HPos::Left, VPos::Bottom));
    draw_text_best_effort(axes.area, label, &style, axes.rect.relative_point(0.5, -0.1));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    use crate::config::FigureConfig;
    use crate::parsers::MatWriter;
    use crate::render::Figure;

    const SHAPE: [usize; 3] = [12, 6, 6];

    fn rect() -> PixelRect {
        PixelRect { x: 20, y: 20, width: 160, height: 120 }
    }

    fn ramp_field() -> DensityField {
        DensityField::new(Array3::from_shape_fn((12, 6, 6), |(x, y, z)| {
            x as f64 + 0.5 * y as f64 + 0.25 * z as f64
        }))
    }

    #[test]
    fn test_scene_orders_faces_far_to_near() {
        let field = ramp_field();
        let (vmin, vmax) = field.value_range().unwrap();
        let projector = BoxProjector::new(SHAPE, [12.0, 6.0, 6.0], 30.0, -40.0, 1.4, rect());
        let scene = PanelScene::build(
            &field,
            ContourLevels::linspace(vmin, vmax, 10),
            &projector,
            512,
        );

        assert_eq!(scene.faces.len(), 3);
        let depths: Vec<i32> = scene
            .faces
            .iter()
            .map(|(face, _)| projector.depth(face.center(SHAPE)))
            .collect();
        // 深度越大离相机越远
        assert!(depths.windows(2).all(|w| w[0] >= w[1]));
        assert_eq!(scene.edges.len(), 9);
        assert!(scene.quad_count() > 0);
        assert_eq!(scene.contour.levels.vmax(), vmax);
    }

    #[test]
    fn test_render_panel_from_mat_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("panel.mat");
        // 磁盘上的维度顺序为 (Ny, Nx, Nz)
        let dims = [SHAPE[1], SHAPE[0], SHAPE[2]];
        let data: Vec<f64> = (0..dims.iter().product::<usize>()).map(|i| i as f64).collect();
        MatWriter::new()
            .write_file(&path, "density", &dims[..], &data[..])
            .unwrap();

        let mut config = FigureConfig::default();
        config.grid_shape = SHAPE;
        let state = AppState::new(config);
        let renderer = SliceRenderer::new(&state);
        let panel = PanelSpec::new(&path, "thr = 1e-1");

        let mut figure = Figure::new((200, 160));
        let contour = figure
            .draw(|root| {
                root.fill(&WHITE).map_err(Error::draw)?;
                renderer.render(0, &panel, &Axes3d::new(root, rect()))
            })
            .unwrap();
        assert_eq!(contour.levels.vmin(), 0.0);
        assert_eq!(contour.levels.vmax(), (data.len() - 1) as f64);

        let r = rect();
        let painted = (r.x..r.right())
            .flat_map(|x| (r.y..r.bottom()).map(move |y| (x as u32, y as u32)))
            .filter(|&(x, y)| figure.pixel(x, y) != Some((255, 255, 255)))
            .count();
        assert!(painted > 100);

        let records = state.performance_store.get_records();
        assert!(records.iter().any(|r| r.channel_group == "load"));
        assert!(records.iter().any(|r| r.channel_group == "render"));
    }

    #[test]
    fn test_render_rejects_wrong_shape() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("small.mat");
        MatWriter::new()
            .write_file(&path, "density", &[2, 2, 2][..], &[1.0; 8][..])
            .unwrap();

        let mut config = FigureConfig::default();
        config.grid_shape = SHAPE;
        let state = AppState::new(config);
        let err = SliceRenderer::new(&state)
            .load_field(&PanelSpec::new(&path, "small"))
            .unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { .. }));
    }
}
