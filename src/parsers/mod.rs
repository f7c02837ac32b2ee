pub mod mat;

pub use mat::{MatParser, MatWriter};

/// 获取所有可用的解析器
pub fn get_all_parsers() -> Vec<Box<dyn crate::utils::parser::DensityParser>> {
    vec![Box::new(MatParser::new())]
}
