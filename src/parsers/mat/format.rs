//! MAT v5 容器的底层格式定义：数据类型编码、数组类别、字节序与数据单元标签。

use std::io::{self, Read, Write};

use byteorder::{BigEndian, ByteOrder, LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::Serialize;

/// 文件头总长度
pub const HEADER_LEN: usize = 128;
/// 文件头中描述文本的长度
pub const HEADER_TEXT_LEN: usize = 116;
/// MAT v5 版本号
pub const VERSION_5: u16 = 0x0100;

pub const MI_INT8: u32 = 1;
pub const MI_UINT8: u32 = 2;
pub const MI_INT16: u32 = 3;
pub const MI_UINT16: u32 = 4;
pub const MI_INT32: u32 = 5;
pub const MI_UINT32: u32 = 6;
pub const MI_SINGLE: u32 = 7;
pub const MI_DOUBLE: u32 = 9;
pub const MI_INT64: u32 = 12;
pub const MI_UINT64: u32 = 13;
pub const MI_MATRIX: u32 = 14;
pub const MI_COMPRESSED: u32 = 15;

/// 数组标志中的复数位
pub const FLAG_COMPLEX: u32 = 0x0800;

/// 单个数值元素占用的字节数，非数值类型返回 None
pub fn type_size(data_type: u32) -> Option<usize> {
    match data_type {
        MI_INT8 | MI_UINT8 => Some(1),
        MI_INT16 | MI_UINT16 => Some(2),
        MI_INT32 | MI_UINT32 | MI_SINGLE => Some(4),
        MI_DOUBLE | MI_INT64 | MI_UINT64 => Some(8),
        _ => None,
    }
}

/// 数据部分按 8 字节对齐后的长度
pub fn pad8(len: usize) -> usize {
    (len + 7) & !7
}

/// miMATRIX 的数组类别（数组标志的低 8 位）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArrayClass {
    Cell,
    Struct,
    Object,
    Char,
    Sparse,
    Double,
    Single,
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Unknown(u8),
}

impl ArrayClass {
    pub fn from_code(code: u8) -> Self {
        match code {
            1 => ArrayClass::Cell,
            2 => ArrayClass::Struct,
            3 => ArrayClass::Object,
            4 => ArrayClass::Char,
            5 => ArrayClass::Sparse,
            6 => ArrayClass::Double,
            7 => ArrayClass::Single,
            8 => ArrayClass::Int8,
            9 => ArrayClass::UInt8,
            10 => ArrayClass::Int16,
            11 => ArrayClass::UInt16,
            12 => ArrayClass::Int32,
            13 => ArrayClass::UInt32,
            14 => ArrayClass::Int64,
            15 => ArrayClass::UInt64,
            other => ArrayClass::Unknown(other),
        }
    }

    pub fn code(self) -> u8 {
        match self {
            ArrayClass::Cell => 1,
            ArrayClass::Struct => 2,
            ArrayClass::Object => 3,
            ArrayClass::Char => 4,
            ArrayClass::Sparse => 5,
            ArrayClass::Double => 6,
            ArrayClass::Single => 7,
            ArrayClass::Int8 => 8,
            ArrayClass::UInt8 => 9,
            ArrayClass::Int16 => 10,
            ArrayClass::UInt16 => 11,
            ArrayClass::Int32 => 12,
            ArrayClass::UInt32 => 13,
            ArrayClass::Int64 => 14,
            ArrayClass::UInt64 => 15,
            ArrayClass::Unknown(code) => code,
        }
    }

    /// 是否为可以转换成 f64 的数值数组
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            ArrayClass::Double
                | ArrayClass::Single
                | ArrayClass::Int8
                | ArrayClass::UInt8
                | ArrayClass::Int16
                | ArrayClass::UInt16
                | ArrayClass::Int32
                | ArrayClass::UInt32
                | ArrayClass::Int64
                | ArrayClass::UInt64
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ArrayClass::Cell => "cell",
            ArrayClass::Struct => "struct",
            ArrayClass::Object => "object",
            ArrayClass::Char => "char",
            ArrayClass::Sparse => "sparse",
            ArrayClass::Double => "double",
            ArrayClass::Single => "single",
            ArrayClass::Int8 => "int8",
            ArrayClass::UInt8 => "uint8",
            ArrayClass::Int16 => "int16",
            ArrayClass::UInt16 => "uint16",
            ArrayClass::Int32 => "int32",
            ArrayClass::UInt32 => "uint32",
            ArrayClass::Int64 => "int64",
            ArrayClass::UInt64 => "uint64",
            ArrayClass::Unknown(_) => "unknown",
        }
    }
}

/// 文件字节序，由文件头最后两个字节决定（"IM" 为小端，"MI" 为大端）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Little,
    Big,
}

impl Endian {
    pub fn from_indicator(bytes: [u8; 2]) -> Option<Self> {
        match &bytes {
            b"IM" => Some(Endian::Little),
            b"MI" => Some(Endian::Big),
            _ => None,
        }
    }

    pub fn indicator(self) -> [u8; 2] {
        match self {
            Endian::Little => *b"IM",
            Endian::Big => *b"MI",
        }
    }

    pub fn u16_from(self, bytes: &[u8]) -> u16 {
        match self {
            Endian::Little => LittleEndian::read_u16(bytes),
            Endian::Big => BigEndian::read_u16(bytes),
        }
    }

    pub fn u32_from(self, bytes: &[u8]) -> u32 {
        match self {
            Endian::Little => LittleEndian::read_u32(bytes),
            Endian::Big => BigEndian::read_u32(bytes),
        }
    }

    pub fn read_u32<R: Read>(self, reader: &mut R) -> io::Result<u32> {
        match self {
            Endian::Little => reader.read_u32::<LittleEndian>(),
            Endian::Big => reader.read_u32::<BigEndian>(),
        }
    }

    pub fn read_i32<R: Read>(self, reader: &mut R) -> io::Result<i32> {
        match self {
            Endian::Little => reader.read_i32::<LittleEndian>(),
            Endian::Big => reader.read_i32::<BigEndian>(),
        }
    }

    pub fn write_u16<W: Write>(self, writer: &mut W, value: u16) -> io::Result<()> {
        match self {
            Endian::Little => writer.write_u16::<LittleEndian>(value),
            Endian::Big => writer.write_u16::<BigEndian>(value),
        }
    }

    /// 读取 `count` 个 `data_type` 类型的数值，转换为 f64 追加到 `out`
    pub fn read_values<R: Read>(
        self,
        reader: &mut R,
        data_type: u32,
        count: usize,
        out: &mut Vec<f64>,
    ) -> io::Result<()> {
        match self {
            Endian::Little => read_values::<LittleEndian, R>(reader, data_type, count, out),
            Endian::Big => read_values::<BigEndian, R>(reader, data_type, count, out),
        }
    }
}

fn read_values<B: ByteOrder, R: Read>(
    reader: &mut R,
    data_type: u32,
    count: usize,
    out: &mut Vec<f64>,
) -> io::Result<()> {
    out.reserve(count);
    match data_type {
        MI_DOUBLE => {
            let start = out.len();
            out.resize(start + count, 0.0);
            reader.read_f64_into::<B>(&mut out[start..])?;
        }
        MI_SINGLE => {
            for _ in 0..count {
                out.push(reader.read_f32::<B>()? as f64);
            }
        }
        MI_INT8 => {
            for _ in 0..count {
                out.push(reader.read_i8()? as f64);
            }
        }
        MI_UINT8 => {
            for _ in 0..count {
                out.push(reader.read_u8()? as f64);
            }
        }
        MI_INT16 => {
            for _ in 0..count {
                out.push(reader.read_i16::<B>()? as f64);
            }
        }
        MI_UINT16 => {
            for _ in 0..count {
                out.push(reader.read_u16::<B>()? as f64);
            }
        }
        MI_INT32 => {
            for _ in 0..count {
                out.push(reader.read_i32::<B>()? as f64);
            }
        }
        MI_UINT32 => {
            for _ in 0..count {
                out.push(reader.read_u32::<B>()? as f64);
            }
        }
        MI_INT64 => {
            for _ in 0..count {
                out.push(reader.read_i64::<B>()? as f64);
            }
        }
        MI_UINT64 => {
            for _ in 0..count {
                out.push(reader.read_u64::<B>()? as f64);
            }
        }
        other => {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("不支持的数值存储类型: {}", other),
            ));
        }
    }
    Ok(())
}

/// 数据单元标签
///
/// 普通标签占 8 字节（类型 + 字节数）；当第一个字的高 16 位非零时为
/// 紧凑格式，字节数放在高 16 位，数据紧随其后占用 4 字节。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tag {
    pub data_type: u32,
    pub nbytes: usize,
    pub small: bool,
}

impl Tag {
    pub fn read<R: Read>(reader: &mut R, endian: Endian) -> io::Result<Tag> {
        Tag::read_opt(reader, endian)?
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "数据单元标签不完整"))
    }

    /// 读取标签；如果流恰好在标签开始处结束则返回 None
    pub fn read_opt<R: Read>(reader: &mut R, endian: Endian) -> io::Result<Option<Tag>> {
        let mut word = [0u8; 4];
        let mut filled = 0;
        while filled < word.len() {
            match reader.read(&mut word[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        if filled == 0 {
            return Ok(None);
        }
        if filled < word.len() {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "数据单元标签不完整",
            ));
        }

        let first = endian.u32_from(&word);
        let small_len = first >> 16;
        if small_len != 0 {
            return Ok(Some(Tag {
                data_type: first & 0xFFFF,
                nbytes: small_len as usize,
                small: true,
            }));
        }

        let nbytes = endian.read_u32(reader)? as usize;
        Ok(Some(Tag {
            data_type: first,
            nbytes,
            small: false,
        }))
    }

    /// 标签之后数据部分实际占用的字节数（包含对齐填充）
    pub fn padded_len(&self) -> usize {
        if self.small { 4 } else { pad8(self.nbytes) }
    }

    /// 数据之后的填充字节数
    pub fn padding(&self) -> usize {
        self.padded_len() - self.nbytes
    }
}

/// 丢弃接下来的 `len` 个字节
pub fn skip<R: Read>(reader: &mut R, len: usize) -> io::Result<()> {
    let copied = io::copy(&mut Read::take(&mut *reader, len as u64), &mut io::sink())?;
    if copied < len as u64 {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "数据单元长度超出文件末尾",
        ));
    }
    Ok(())
}
