use std::path::Path;

use serde::Serialize;

use crate::error::Result;

/// 从文件中读取的原始数组，数据按 MATLAB 列优先顺序存放
/// 索引计算: index = i + j * dims[0] + k * dims[0] * dims[1]
#[derive(Debug, Clone)]
pub struct RawTensor {
    pub dims: Vec<usize>,
    pub data: Vec<f64>,
}

/// 文件中单个变量的元数据
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldInfo {
    pub name: String,
    pub class: String,
    pub dims: Vec<usize>,
    pub complex: bool,
}

/// 文件概要：文件头描述和变量列表
#[derive(Debug, Clone, Serialize)]
pub struct FileSummary {
    pub header: String,
    pub fields: Vec<FieldInfo>,
}

/// 密度场解析器 trait
/// 不同文件格式需要实现这个 trait
pub trait DensityParser: Send + Sync {
    /// 获取支持的文件扩展名（不含点号），例如: "mat"
    fn supported_extensions(&self) -> Vec<&'static str>;

    /// 检查文件扩展名是否被支持
    fn supports(&self, extension: &str) -> bool {
        self.supported_extensions()
            .iter()
            .any(|ext| ext.eq_ignore_ascii_case(extension))
    }

    /// 从文件中读取指定名称的数组
    fn parse_from_file(&self, file_path: &Path, field: &str) -> Result<RawTensor>;

    /// 快速获取变量的维度（只读取元数据，不解析完整数据）
    fn get_shape_from_file(&self, file_path: &Path, field: &str) -> Result<Vec<usize>>;

    /// 列出文件头与全部变量
    fn describe(&self, file_path: &Path) -> Result<FileSummary>;

    /// 获取解析器名称（用于日志和错误信息）
    fn name(&self) -> &'static str;
}
