use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// 单个子图：输入文件、标注文本和变量名
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelSpec {
    pub file: PathBuf,
    pub label: String,
    /// 变量名，缺省时使用 [`FigureConfig::field`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl PanelSpec {
    pub fn new(file: impl Into<PathBuf>, label: impl Into<String>) -> Self {
        PanelSpec {
            file: file.into(),
            label: label.into(),
            field: None,
        }
    }
}

/// 画布尺寸（英寸 × dpi）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FigureSize {
    pub width_in: f64,
    pub height_in: f64,
    pub dpi: f64,
}

impl Default for FigureSize {
    fn default() -> Self {
        FigureSize {
            width_in: 12.0,
            height_in: 6.0,
            dpi: 100.0,
        }
    }
}

impl FigureSize {
    /// 画布像素尺寸
    pub fn pixels(&self) -> (u32, u32) {
        (
            (self.width_in * self.dpi).round() as u32,
            (self.height_in * self.dpi).round() as u32,
        )
    }

    /// 字号（磅）换算为像素
    pub fn points_to_pixels(&self, points: f64) -> f64 {
        points * self.dpi / 72.0
    }
}

/// 子图网格与边距，取值为画布比例（与 matplotlib 的默认 subplot 参数一致）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub rows: usize,
    pub cols: usize,
    pub left: f64,
    pub right: f64,
    pub bottom: f64,
    pub top: f64,
    pub wspace: f64,
    pub hspace: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        LayoutConfig {
            rows: 2,
            cols: 3,
            left: 0.125,
            right: 0.9,
            bottom: 0.11,
            top: 0.88,
            wspace: 0.2,
            hspace: 0.2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContourConfig {
    /// 等值线层级数
    pub levels: usize,
    /// 每个面在单个方向上的最大单元数，超过时均匀抽样
    pub max_face_cells: usize,
}

impl Default for ContourConfig {
    fn default() -> Self {
        ContourConfig {
            levels: 10,
            max_face_cells: 512,
        }
    }
}

/// 相机视角
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    pub elevation_deg: f64,
    pub azimuth_deg: f64,
    pub zoom: f64,
    /// 箱体比例，缺省时与网格形状成比例
    #[serde(skip_serializing_if = "Option::is_none")]
    pub box_aspect: Option<[f64; 3]>,
}

impl Default for ViewConfig {
    fn default() -> Self {
        ViewConfig {
            elevation_deg: 30.0,
            azimuth_deg: -40.0,
            zoom: 1.4,
            box_aspect: None,
        }
    }
}

/// 色条的颜色范围来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Normalization {
    /// 每个子图按自身最小/最大值归一化，色条显示最后一个子图的范围
    #[default]
    PerPanel,
    /// 先扫描全部文件得到全局范围，所有子图与色条共用
    Shared,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorbarConfig {
    /// [left, bottom, width, height]，画布比例，原点在左下角
    pub rect: [f64; 4],
    pub label: String,
    pub normalization: Normalization,
}

impl Default for ColorbarConfig {
    fn default() -> Self {
        ColorbarConfig {
            rect: [0.91, 0.25, 0.015, 0.5],
            label: "Density".to_string(),
            normalization: Normalization::PerPanel,
        }
    }
}

/// 完整的绘图配置
///
/// 所有字段都有默认值，JSON 中缺省的键取默认值。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FigureConfig {
    /// 逻辑网格形状 [Nx, Ny, Nz]
    pub grid_shape: [usize; 3],
    /// 逻辑轴 a 对应的磁盘轴 axis_order[a]
    pub axis_order: [usize; 3],
    /// 默认变量名
    pub field: String,
    pub panels: Vec<PanelSpec>,
    pub output: PathBuf,
    pub figure: FigureSize,
    pub layout: LayoutConfig,
    pub contour: ContourConfig,
    pub view: ViewConfig,
    pub colorbar: ColorbarConfig,
    /// 标注文字字号（磅）
    pub label_font_pt: f64,
}

impl Default for FigureConfig {
    fn default() -> Self {
        let mut panels: Vec<PanelSpec> = (1..=5)
            .map(|e| {
                PanelSpec::new(
                    format!("compressionResults/compressedTensor_e-{}.mat", e),
                    format!("thr = 1e-{}", e),
                )
            })
            .collect();
        panels.push(PanelSpec::new("../density.mat", "original"));

        FigureConfig {
            grid_shape: [2048, 256, 256],
            axis_order: [1, 0, 2],
            field: "density".to_string(),
            panels,
            output: PathBuf::from("visualize_compression_3d.png"),
            figure: FigureSize::default(),
            layout: LayoutConfig::default(),
            contour: ContourConfig::default(),
            view: ViewConfig::default(),
            colorbar: ColorbarConfig::default(),
            label_font_pt: 10.0,
        }
    }
}

impl FigureConfig {
    /// 从 JSON 文件加载并校验
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| Error::from_open(e, path))?;
        let config: FigureConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn field_for<'a>(&'a self, panel: &'a PanelSpec) -> &'a str {
        panel.field.as_deref().unwrap_or(&self.field)
    }

    /// 箱体比例
    pub fn box_aspect(&self) -> [f64; 3] {
        self.view.box_aspect.unwrap_or([
            self.grid_shape[0] as f64,
            self.grid_shape[1] as f64,
            self.grid_shape[2] as f64,
        ])
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(Error::InvalidConfig(msg));

        if self.grid_shape.contains(&0) {
            return invalid(format!("grid_shape 不能包含 0: {:?}", self.grid_shape));
        }
        let mut order = self.axis_order;
        order.sort_unstable();
        if order != [0, 1, 2] {
            return invalid(format!(
                "axis_order {:?} 不是 [0, 1, 2] 的排列",
                self.axis_order
            ));
        }
        if self.panels.is_empty() {
            return invalid("至少需要一个子图".to_string());
        }
        let cells = self.layout.rows * self.layout.cols;
        if self.panels.len() > cells {
            return invalid(format!(
                "{} 个子图超过 {}x{} 网格的容量",
                self.panels.len(),
                self.layout.rows,
                self.layout.cols
            ));
        }
        if self.contour.levels < 2 {
            return invalid(format!("contour.levels 至少为 2，实际 {}", self.contour.levels));
        }
        if self.contour.max_face_cells == 0 {
            return invalid("contour.max_face_cells 必须大于 0".to_string());
        }
        let (width, height) = self.figure.pixels();
        if width == 0 || height == 0 || !(self.figure.dpi > 0.0) {
            return invalid(format!("画布尺寸无效: {}x{} 像素", width, height));
        }
        if !(self.layout.left < self.layout.right && self.layout.bottom < self.layout.top) {
            return invalid("layout 边距无效: 需要 left < right 且 bottom < top".to_string());
        }
        if !(self.view.zoom > 0.0) {
            return invalid(format!("view.zoom 必须为正数，实际 {}", self.view.zoom));
        }
        if self.box_aspect().iter().any(|&a| !(a > 0.0)) {
            return invalid(format!("box_aspect 必须为正数: {:?}", self.box_aspect()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_original_figure() {
        let config = FigureConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.grid_shape, [2048, 256, 256]);
        assert_eq!(config.panels.len(), 6);
        assert_eq!(
            config.panels[0].file,
            PathBuf::from("compressionResults/compressedTensor_e-1.mat")
        );
        assert_eq!(config.panels[4].label, "thr = 1e-5");
        assert_eq!(config.panels[5].label, "original");
        assert_eq!(config.figure.pixels(), (1200, 600));
        assert_eq!(config.field_for(&config.panels[0]), "density");
        assert_eq!(config.box_aspect(), [2048.0, 256.0, 256.0]);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{
            "grid_shape": [16, 8, 8],
            "panels": [{"file": "a.mat", "label": "a", "field": "compressedTensor"}],
            "colorbar": {"normalization": "shared"}
        }"#;
        let config: FigureConfig = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.grid_shape, [16, 8, 8]);
        assert_eq!(config.field_for(&config.panels[0]), "compressedTensor");
        assert_eq!(config.colorbar.normalization, Normalization::Shared);
        assert_eq!(config.colorbar.label, "Density");
        assert_eq!(config.view.elevation_deg, 30.0);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = FigureConfig::default();
        config.axis_order = [0, 0, 2];
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));

        let mut config = FigureConfig::default();
        config.contour.levels = 1;
        assert!(config.validate().is_err());

        let mut config = FigureConfig::default();
        config.panels.push(PanelSpec::new("extra.mat", "extra"));
        assert!(config.validate().is_err());

        let mut config = FigureConfig::default();
        config.view.zoom = 0.0;
        assert!(config.validate().is_err());
    }
}
