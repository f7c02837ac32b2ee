use std::path::PathBuf;

use thiserror::Error;

/// 渲染流程中所有可能出现的错误
#[derive(Debug, Error)]
pub enum Error {
    #[error("文件不存在: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("文件 {} 中找不到变量 '{field}'", .path.display())]
    FieldNotFound { path: PathBuf, field: String },

    #[error("不支持的文件格式: {} (支持的扩展名: {})", .path.display(), .supported.join(", "))]
    UnsupportedFormat { path: PathBuf, supported: Vec<String> },

    /// MAT 容器结构错误或不支持的内容
    #[error("MAT 文件解析失败: {0}")]
    Mat(String),

    #[error("数据形状不匹配: 期望 {expected:?}，实际 {actual:?}")]
    ShapeMismatch {
        expected: [usize; 3],
        actual: Vec<usize>,
    },

    #[error("数据中没有有限值，无法确定颜色范围")]
    NoFiniteValues,

    #[error("配置无效: {0}")]
    InvalidConfig(String),

    #[error("绘图失败: {0}")]
    Draw(String),

    #[error("PNG 编码失败: {0}")]
    Encode(#[from] image::ImageError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// 把 plotters 的绘图错误统一转换为 [`Error::Draw`]
    pub fn draw(err: impl std::fmt::Display) -> Self {
        Error::Draw(err.to_string())
    }

    /// 打开文件时把 NotFound 映射为 [`Error::FileNotFound`]
    pub fn from_open(err: std::io::Error, path: &std::path::Path) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            Error::FileNotFound(path.to_path_buf())
        } else {
            Error::Io(err)
        }
    }
}
