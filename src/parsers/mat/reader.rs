use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use flate2::read::ZlibDecoder;
use tracing::debug;

use super::format::{
    ArrayClass, Endian, FLAG_COMPLEX, HEADER_LEN, HEADER_TEXT_LEN, MI_COMPRESSED, MI_INT8,
    MI_INT32, MI_MATRIX, MI_UINT32, Tag, skip, type_size,
};
use crate::error::{Error, Result};
use crate::utils::parser::FieldInfo;

/// MAT 文件头信息
#[derive(Debug, Clone, PartialEq)]
pub struct MatHeader {
    /// 描述文本（去掉尾部空白）
    pub text: String,
    pub version: u16,
    pub endian: Endian,
}

impl MatHeader {
    fn parse(bytes: &[u8; HEADER_LEN]) -> Result<Self> {
        let text = String::from_utf8_lossy(&bytes[..HEADER_TEXT_LEN])
            .trim_end_matches(|c: char| c == ' ' || c == '\0')
            .to_string();

        if text.starts_with("MATLAB 7.3") {
            return Err(Error::Mat(
                "MATLAB 7.3 (HDF5) 格式暂不支持，请使用 -v7 或 -v6 保存".to_string(),
            ));
        }
        if !text.starts_with("MATLAB") {
            return Err(Error::Mat(
                "缺少 MATLAB 5.0 文件头，可能是 v4 或其他格式".to_string(),
            ));
        }

        let endian = Endian::from_indicator([bytes[126], bytes[127]])
            .ok_or_else(|| Error::Mat("无法识别的字节序标识".to_string()))?;
        let version = endian.u16_from(&bytes[124..126]);

        Ok(MatHeader {
            text,
            version,
            endian,
        })
    }
}

/// 一个完整读取的数值变量，数据按 MATLAB 列优先顺序存放
#[derive(Debug, Clone)]
pub struct MatVariable {
    pub info: FieldInfo,
    pub data: Vec<f64>,
}

/// 遍历文件时对变量的处理方式
enum Scan<'a> {
    /// 只读取元数据，跳过数据部分
    Headers,
    /// 读取指定名称变量的数据
    Data(&'a str),
}

struct Entry {
    info: FieldInfo,
    data: Option<Vec<f64>>,
}

/// MAT v5 顺序读取器
///
/// 压缩单元以流的方式解压，数据直接写入最终的 `Vec<f64>`，
/// 不会整体缓存解压后的字节。
pub struct MatReader<R> {
    inner: R,
    header: MatHeader,
}

impl MatReader<BufReader<File>> {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| Error::from_open(e, path))?;
        MatReader::new(BufReader::new(file))
    }
}

impl<R: Read> MatReader<R> {
    pub fn new(mut inner: R) -> Result<Self> {
        let mut bytes = [0u8; HEADER_LEN];
        inner.read_exact(&mut bytes).map_err(|e| {
            if e.kind() == io::ErrorKind::UnexpectedEof {
                Error::Mat("文件太短，不是有效的 MAT 文件".to_string())
            } else {
                Error::Io(e)
            }
        })?;
        let header = MatHeader::parse(&bytes)?;
        Ok(MatReader { inner, header })
    }

    pub fn header(&self) -> &MatHeader {
        &self.header
    }

    /// 列出文件中所有变量（不读取数据）
    pub fn variables(mut self) -> Result<Vec<FieldInfo>> {
        let mut fields = Vec::new();
        while let Some(entry) = self.next_entry(&Scan::Headers)? {
            fields.push(entry.info);
        }
        Ok(fields)
    }

    /// 查找指定变量的元数据
    pub fn find_info(mut self, name: &str) -> Result<Option<FieldInfo>> {
        while let Some(entry) = self.next_entry(&Scan::Headers)? {
            if entry.info.name == name {
                return Ok(Some(entry.info));
            }
        }
        Ok(None)
    }

    /// 读取指定变量；找不到时返回 None
    pub fn read_variable(mut self, name: &str) -> Result<Option<MatVariable>> {
        let scan = Scan::Data(name);
        while let Some(entry) = self.next_entry(&scan)? {
            if let Some(data) = entry.data {
                return Ok(Some(MatVariable {
                    info: entry.info,
                    data,
                }));
            }
        }
        Ok(None)
    }

    /// 读取下一个顶层变量；其它类型的顶层单元直接跳过
    fn next_entry(&mut self, scan: &Scan<'_>) -> Result<Option<Entry>> {
        let endian = self.header.endian;
        loop {
            let Some(tag) = Tag::read_opt(&mut self.inner, endian)? else {
                return Ok(None);
            };

            match tag.data_type {
                MI_COMPRESSED => {
                    // 压缩单元没有对齐填充；剩余的压缩字节原样跳过，不再解压
                    let limited = Read::take(&mut self.inner, tag.nbytes as u64);
                    let mut decoder = ZlibDecoder::new(limited);
                    let entry = read_matrix_element(&mut decoder, endian, scan)?;
                    let mut limited = decoder.into_inner();
                    io::copy(&mut limited, &mut io::sink())?;
                    if let Some(entry) = entry {
                        return Ok(Some(entry));
                    }
                }
                MI_MATRIX => {
                    let mut limited = Read::take(&mut self.inner, tag.nbytes as u64);
                    let entry = read_matrix_body(&mut limited, endian, scan)?;
                    io::copy(&mut limited, &mut io::sink())?;
                    skip(&mut self.inner, tag.padding())?;
                    return Ok(Some(entry));
                }
                other => {
                    debug!(data_type = other, nbytes = tag.nbytes, "跳过非矩阵顶层单元");
                    skip(&mut self.inner, tag.padded_len())?;
                }
            }
        }
    }
}

/// 解析压缩流中的单个 miMATRIX 单元
fn read_matrix_element<R: Read>(
    reader: &mut R,
    endian: Endian,
    scan: &Scan<'_>,
) -> Result<Option<Entry>> {
    let Some(tag) = Tag::read_opt(reader, endian)? else {
        return Ok(None);
    };
    if tag.data_type != MI_MATRIX {
        debug!(data_type = tag.data_type, "压缩单元中不是矩阵，已跳过");
        return Ok(None);
    }

    let mut limited = Read::take(&mut *reader, tag.nbytes as u64);
    read_matrix_body(&mut limited, endian, scan).map(Some)
}

/// 解析 miMATRIX 的内容：数组标志、维度、名称，以及按需读取实部数据
fn read_matrix_body<R: Read>(reader: &mut R, endian: Endian, scan: &Scan<'_>) -> Result<Entry> {
    // 数组标志
    let flags_tag = Tag::read(reader, endian)?;
    if flags_tag.data_type != MI_UINT32 || flags_tag.nbytes != 8 {
        return Err(Error::Mat(format!(
            "数组标志格式错误 (类型 {}, 长度 {})",
            flags_tag.data_type, flags_tag.nbytes
        )));
    }
    let flags = endian.read_u32(reader)?;
    let _nzmax = endian.read_u32(reader)?;
    let class = ArrayClass::from_code((flags & 0xFF) as u8);
    let complex = flags & FLAG_COMPLEX != 0;

    // 维度
    let dims_tag = Tag::read(reader, endian)?;
    if dims_tag.data_type != MI_INT32 {
        return Err(Error::Mat(format!(
            "维度单元类型错误: {}",
            dims_tag.data_type
        )));
    }
    let mut dims = Vec::with_capacity(dims_tag.nbytes / 4);
    for _ in 0..dims_tag.nbytes / 4 {
        let dim = endian.read_i32(reader)?;
        if dim < 0 {
            return Err(Error::Mat(format!("维度不能为负数: {}", dim)));
        }
        dims.push(dim as usize);
    }
    skip(reader, dims_tag.padding())?;

    // 名称
    let name_tag = Tag::read(reader, endian)?;
    if name_tag.data_type != MI_INT8 {
        return Err(Error::Mat(format!(
            "变量名单元类型错误: {}",
            name_tag.data_type
        )));
    }
    let mut name_bytes = vec![0u8; name_tag.nbytes];
    reader.read_exact(&mut name_bytes)?;
    skip(reader, name_tag.padding())?;
    let name = String::from_utf8_lossy(&name_bytes).into_owned();

    let info = FieldInfo {
        name,
        class: class.as_str().to_string(),
        dims,
        complex,
    };
    debug!(name = %info.name, class = %info.class, dims = ?info.dims, "读取变量头");

    let wanted = matches!(scan, Scan::Data(target) if *target == info.name);
    if !wanted {
        return Ok(Entry { info, data: None });
    }

    if !class.is_numeric() || complex {
        return Err(Error::Mat(format!(
            "变量 '{}' 的类型 {}{} 不受支持，只能读取实数数值数组",
            info.name,
            info.class,
            if complex { " (complex)" } else { "" }
        )));
    }

    let data_tag = Tag::read(reader, endian)?;
    let size = type_size(data_tag.data_type).ok_or_else(|| {
        Error::Mat(format!("不支持的数值存储类型: {}", data_tag.data_type))
    })?;
    let count = data_tag.nbytes / size;
    let expected: usize = info.dims.iter().product();
    if count != expected {
        return Err(Error::Mat(format!(
            "变量 '{}' 的元素数量 {} 与维度 {:?} 不符",
            info.name, count, info.dims
        )));
    }

    let mut data = Vec::new();
    endian.read_values(reader, data_tag.data_type, count, &mut data)?;
    skip(reader, data_tag.padding())?;

    Ok(Entry {
        info,
        data: Some(data),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::mat::writer::MatWriter;
    use std::io::Cursor;

    fn encode(writer: &MatWriter, vars: &[(&str, &[usize], &[f64])]) -> Vec<u8> {
        let mut bytes = Vec::new();
        writer.write_header(&mut bytes).unwrap();
        for (name, dims, data) in vars {
            writer.write_variable(&mut bytes, name, dims, data).unwrap();
        }
        bytes
    }

    #[test]
    fn test_reads_uncompressed_little_endian() {
        let data: Vec<f64> = (0..24).map(|v| v as f64).collect();
        let bytes = encode(&MatWriter::new(), &[("density", &[2, 3, 4][..], &data[..])]);

        let reader = MatReader::new(Cursor::new(bytes)).unwrap();
        assert_eq!(reader.header().endian, Endian::Little);
        assert_eq!(reader.header().version, 0x0100);

        let var = reader.read_variable("density").unwrap().unwrap();
        assert_eq!(var.info.dims, vec![2, 3, 4]);
        assert_eq!(var.info.class, "double");
        assert_eq!(var.data, data);
    }

    #[test]
    fn test_reads_compressed_big_endian() {
        let data: Vec<f64> = (0..8).map(|v| v as f64 * 0.5).collect();
        let writer = MatWriter::new().compressed(true).endian(Endian::Big);
        let bytes = encode(&writer, &[("x", &[2, 2, 2][..], &data[..])]);

        let reader = MatReader::new(Cursor::new(bytes)).unwrap();
        assert_eq!(reader.header().endian, Endian::Big);
        let var = reader.read_variable("x").unwrap().unwrap();
        assert_eq!(var.data, data);
    }

    #[test]
    fn test_skips_other_variables() {
        let first = [1.0, 2.0];
        let second = [3.0, 4.0, 5.0];
        let writer = MatWriter::new().compressed(true);
        let bytes = encode(
            &writer,
            &[("a", &[1, 2][..], &first[..]), ("density", &[3, 1][..], &second[..])],
        );

        let names: Vec<String> = MatReader::new(Cursor::new(bytes.clone()))
            .unwrap()
            .variables()
            .unwrap()
            .into_iter()
            .map(|f| f.name)
            .collect();
        assert_eq!(names, vec!["a".to_string(), "density".to_string()]);

        let var = MatReader::new(Cursor::new(bytes))
            .unwrap()
            .read_variable("density")
            .unwrap()
            .unwrap();
        assert_eq!(var.data, second.to_vec());
    }

    #[test]
    fn test_listing_does_not_inflate_skipped_payload() {
        // 正弦数据几乎不可压缩，压缩流的尾部远在变量头之后
        let data: Vec<f64> = (0..32 * 32 * 32).map(|i| (i as f64 * 0.7).sin()).collect();
        let writer = MatWriter::new().compressed(true);
        let mut bytes = Vec::new();
        writer.write_header(&mut bytes).unwrap();
        writer
            .write_variable(&mut bytes, "density", &[32, 32, 32], &data)
            .unwrap();
        let first_end = bytes.len();
        writer
            .write_variable(&mut bytes, "mask", &[2, 1], &[1.0, 0.0])
            .unwrap();

        // 破坏第一个压缩流的末尾（deflate 数据和 adler32 校验）
        bytes[first_end - 64] ^= 0xFF;
        bytes[first_end - 63] ^= 0xFF;
        for b in &mut bytes[first_end - 4..first_end] {
            *b ^= 0xFF;
        }

        let names: Vec<String> = MatReader::new(Cursor::new(bytes.clone()))
            .unwrap()
            .variables()
            .unwrap()
            .into_iter()
            .map(|f| f.name)
            .collect();
        assert_eq!(names, vec!["density".to_string(), "mask".to_string()]);

        let info = MatReader::new(Cursor::new(bytes.clone()))
            .unwrap()
            .find_info("density")
            .unwrap()
            .unwrap();
        assert_eq!(info.dims, vec![32, 32, 32]);

        let mask = MatReader::new(Cursor::new(bytes))
            .unwrap()
            .read_variable("mask")
            .unwrap()
            .unwrap();
        assert_eq!(mask.data, vec![1.0, 0.0]);
    }

    #[test]
    fn test_missing_variable_returns_none() {
        let bytes = encode(&MatWriter::new(), &[("a", &[1, 1][..], &[1.0][..])]);
        let reader = MatReader::new(Cursor::new(bytes)).unwrap();
        assert!(reader.read_variable("density").unwrap().is_none());
    }

    #[test]
    fn test_find_info_without_data() {
        let data = vec![0.0; 30];
        let bytes = encode(&MatWriter::new(), &[("density", &[5, 3, 2][..], &data[..])]);
        let info = MatReader::new(Cursor::new(bytes))
            .unwrap()
            .find_info("density")
            .unwrap()
            .unwrap();
        assert_eq!(info.dims, vec![5, 3, 2]);
        assert!(!info.complex);
    }

    #[test]
    fn test_rejects_hdf5_and_short_files() {
        let mut bytes = vec![b' '; HEADER_LEN];
        bytes[..19].copy_from_slice(b"MATLAB 7.3 MAT-file");
        assert!(matches!(
            MatReader::new(Cursor::new(bytes)),
            Err(Error::Mat(_))
        ));

        assert!(matches!(
            MatReader::new(Cursor::new(vec![0u8; 10])),
            Err(Error::Mat(_))
        ));
    }

    #[test]
    fn test_rejects_unsupported_class() {
        // 手工构造一个 char 数组
        let mut body = Vec::new();
        let push = |buf: &mut Vec<u8>, v: u32| buf.extend_from_slice(&v.to_le_bytes());
        push(&mut body, MI_UINT32);
        push(&mut body, 8);
        push(&mut body, 4); // mxCHAR_CLASS
        push(&mut body, 0);
        push(&mut body, MI_INT32);
        push(&mut body, 8);
        push(&mut body, 1);
        push(&mut body, 1);
        // 紧凑格式的名称 "s"
        push(&mut body, (1 << 16) | MI_INT8);
        body.extend_from_slice(&[b's', 0, 0, 0]);

        let mut bytes = Vec::new();
        MatWriter::new().write_header(&mut bytes).unwrap();
        push(&mut bytes, MI_MATRIX);
        push(&mut bytes, body.len() as u32);
        bytes.extend_from_slice(&body);

        let infos = MatReader::new(Cursor::new(bytes.clone()))
            .unwrap()
            .variables()
            .unwrap();
        assert_eq!(infos[0].name, "s");
        assert_eq!(infos[0].class, "char");

        let err = MatReader::new(Cursor::new(bytes))
            .unwrap()
            .read_variable("s")
            .unwrap_err();
        assert!(matches!(err, Error::Mat(_)));
    }
}
