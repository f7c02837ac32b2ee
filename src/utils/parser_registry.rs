use std::path::Path;

use crate::error::{Error, Result};
use crate::utils::parser::DensityParser;

/// 解析器注册表
/// 管理所有可用的密度场解析器，并根据文件扩展名匹配对应的解析器
pub struct ParserRegistry {
    parsers: Vec<Box<dyn DensityParser>>,
}

impl ParserRegistry {
    /// 创建新的解析器注册表，自动注册所有可用的解析器
    pub fn new() -> Self {
        let parsers = crate::parsers::get_all_parsers();
        Self { parsers }
    }

    /// 根据文件扩展名查找匹配的解析器
    /// extension: 文件扩展名（不含点号），例如 "mat"
    pub fn find_parser(&self, extension: &str) -> Option<&dyn DensityParser> {
        self.parsers
            .iter()
            .find(|parser| parser.supports(extension))
            .map(|p| p.as_ref())
    }

    /// 根据文件路径查找匹配的解析器
    /// 自动提取文件扩展名
    pub fn find_parser_for_file(&self, file_path: &Path) -> Option<&dyn DensityParser> {
        let extension = file_path.extension().and_then(|ext| ext.to_str())?;
        self.find_parser(extension)
    }

    /// 与 [`find_parser_for_file`](Self::find_parser_for_file) 相同，找不到时返回错误
    pub fn require_parser(&self, file_path: &Path) -> Result<&dyn DensityParser> {
        self.find_parser_for_file(file_path)
            .ok_or_else(|| Error::UnsupportedFormat {
                path: file_path.to_path_buf(),
                supported: self.supported_extensions(),
            })
    }

    /// 获取所有支持的扩展名列表
    pub fn supported_extensions(&self) -> Vec<String> {
        let mut extensions = Vec::new();
        for parser in &self.parsers {
            extensions.extend(
                parser
                    .supported_extensions()
                    .iter()
                    .map(|s| s.to_lowercase()),
            );
        }
        extensions.sort();
        extensions.dedup();
        extensions
    }
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::new()
    }
}
