use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use byteorder::{BigEndian, ByteOrder, LittleEndian, WriteBytesExt};
use flate2::Compression;
use flate2::write::ZlibEncoder;

use super::format::{
    ArrayClass, Endian, HEADER_TEXT_LEN, MI_COMPRESSED, MI_DOUBLE, MI_INT8, MI_INT32, MI_MATRIX,
    MI_UINT32, VERSION_5, pad8,
};
use crate::error::{Error, Result};

const HEADER_TEXT: &str = "MATLAB 5.0 MAT-file, written by density-slices";

/// MAT v5 写入器，每个变量写为一个 double 数组
#[derive(Debug, Clone, Copy)]
pub struct MatWriter {
    endian: Endian,
    compress: bool,
}

impl Default for MatWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl MatWriter {
    pub fn new() -> Self {
        MatWriter {
            endian: Endian::Little,
            compress: false,
        }
    }

    /// 是否使用 miCOMPRESSED（zlib）包装每个变量
    pub fn compressed(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    pub fn endian(mut self, endian: Endian) -> Self {
        self.endian = endian;
        self
    }

    /// 把单个变量写入新文件
    ///
    /// `data` 必须按 MATLAB 列优先顺序排列，长度等于 `dims` 各维之积。
    pub fn write_file(&self, path: &Path, name: &str, dims: &[usize], data: &[f64]) -> Result<()> {
        let mut out = BufWriter::new(File::create(path)?);
        self.write_header(&mut out)?;
        self.write_variable(&mut out, name, dims, data)?;
        out.flush()?;
        Ok(())
    }

    pub fn write_header<W: Write>(&self, out: &mut W) -> Result<()> {
        let mut text = [b' '; HEADER_TEXT_LEN];
        text[..HEADER_TEXT.len()].copy_from_slice(HEADER_TEXT.as_bytes());
        out.write_all(&text)?;
        // 子系统数据偏移
        out.write_all(&[0u8; 8])?;
        self.endian.write_u16(out, VERSION_5)?;
        out.write_all(&self.endian.indicator())?;
        Ok(())
    }

    pub fn write_variable<W: Write>(
        &self,
        out: &mut W,
        name: &str,
        dims: &[usize],
        data: &[f64],
    ) -> Result<()> {
        let expected: usize = dims.iter().product();
        if expected != data.len() {
            return Err(Error::Mat(format!(
                "维度 {:?} 需要 {} 个元素，但提供了 {} 个",
                dims,
                expected,
                data.len()
            )));
        }

        let element = match self.endian {
            Endian::Little => encode_matrix::<LittleEndian>(name, dims, data)?,
            Endian::Big => encode_matrix::<BigEndian>(name, dims, data)?,
        };

        if !self.compress {
            out.write_all(&element)?;
            return Ok(());
        }

        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&element)?;
        let compressed = encoder.finish()?;
        let len = element_len(compressed.len())?;
        match self.endian {
            Endian::Little => write_tag::<LittleEndian, W>(out, MI_COMPRESSED, len)?,
            Endian::Big => write_tag::<BigEndian, W>(out, MI_COMPRESSED, len)?,
        }
        out.write_all(&compressed)?;
        Ok(())
    }
}

fn element_len(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| Error::Mat("数据超过 MAT v5 单元素 4GiB 限制".to_string()))
}

fn write_tag<B: ByteOrder, W: Write>(out: &mut W, data_type: u32, nbytes: u32) -> Result<()> {
    out.write_u32::<B>(data_type)?;
    out.write_u32::<B>(nbytes)?;
    Ok(())
}

fn write_padding(out: &mut Vec<u8>, written: usize) {
    out.resize(out.len() + pad8(written) - written, 0);
}

/// 编码完整的 miMATRIX 单元（含标签）
fn encode_matrix<B: ByteOrder>(name: &str, dims: &[usize], data: &[f64]) -> Result<Vec<u8>> {
    let mut body = Vec::with_capacity(64 + name.len() + data.len() * 8);

    // 数组标志
    write_tag::<B, _>(&mut body, MI_UINT32, 8)?;
    body.write_u32::<B>(ArrayClass::Double.code() as u32)?;
    body.write_u32::<B>(0)?;

    // 维度
    write_tag::<B, _>(&mut body, MI_INT32, element_len(dims.len() * 4)?)?;
    for &dim in dims {
        let dim = i32::try_from(dim).map_err(|_| Error::Mat(format!("维度过大: {}", dim)))?;
        body.write_i32::<B>(dim)?;
    }
    write_padding(&mut body, dims.len() * 4);

    // 名称
    write_tag::<B, _>(&mut body, MI_INT8, element_len(name.len())?)?;
    body.extend_from_slice(name.as_bytes());
    write_padding(&mut body, name.len());

    // 实部
    write_tag::<B, _>(&mut body, MI_DOUBLE, element_len(data.len() * 8)?)?;
    for &value in data {
        body.write_f64::<B>(value)?;
    }

    let mut element = Vec::with_capacity(body.len() + 8);
    write_tag::<B, _>(&mut element, MI_MATRIX, element_len(body.len())?)?;
    element.extend_from_slice(&body);
    Ok(element)
}
