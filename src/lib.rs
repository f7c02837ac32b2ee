//! 三维密度张量的等值线切片可视化
//!
//! 从 MATLAB v5 `.mat` 文件读取密度场，在箱体的三个边界面上绘制填充等值线，
//! 按网格排列多个子图并附共享色条，输出 PNG。

pub mod app_state;
pub mod config;
pub mod contour;
pub mod density_field;
pub mod driver;
pub mod error;
pub mod layout;
pub mod parsers;
pub mod performance;
pub mod projection;
pub mod render;
pub mod utils;

pub use app_state::AppState;
pub use config::{FigureConfig, Normalization, PanelSpec};
pub use driver::{RunSummary, run};
pub use error::{Error, Result};
