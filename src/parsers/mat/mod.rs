//! MATLAB v5 `.mat` 文件解析器

pub mod format;
pub mod reader;
pub mod writer;

use std::path::Path;

use crate::error::{Error, Result};
use crate::utils::parser::{DensityParser, FileSummary, RawTensor};

pub use format::Endian;
pub use reader::{MatHeader, MatReader, MatVariable};
pub use writer::MatWriter;

/// MAT 文件格式解析器
pub struct MatParser;

impl MatParser {
    pub fn new() -> Self {
        MatParser
    }
}

impl Default for MatParser {
    fn default() -> Self {
        Self::new()
    }
}

impl DensityParser for MatParser {
    fn supported_extensions(&self) -> Vec<&'static str> {
        vec!["mat"]
    }

    fn name(&self) -> &'static str {
        "MAT v5 Parser"
    }

    fn parse_from_file(&self, file_path: &Path, field: &str) -> Result<RawTensor> {
        let variable = MatReader::open(file_path)?
            .read_variable(field)?
            .ok_or_else(|| Error::FieldNotFound {
                path: file_path.to_path_buf(),
                field: field.to_string(),
            })?;

        Ok(RawTensor {
            dims: variable.info.dims,
            data: variable.data,
        })
    }

    fn get_shape_from_file(&self, file_path: &Path, field: &str) -> Result<Vec<usize>> {
        let info = MatReader::open(file_path)?
            .find_info(field)?
            .ok_or_else(|| Error::FieldNotFound {
                path: file_path.to_path_buf(),
                field: field.to_string(),
            })?;
        Ok(info.dims)
    }

    fn describe(&self, file_path: &Path) -> Result<FileSummary> {
        let reader = MatReader::open(file_path)?;
        let header = reader.header().text.clone();
        let fields = reader.variables()?;
        Ok(FileSummary { header, fields })
    }
}
