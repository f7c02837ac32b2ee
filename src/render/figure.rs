use std::path::Path;

use image::ImageEncoder;
use image::codecs::png::PngEncoder;
use plotters::coord::Shift;
use plotters::prelude::*;

use crate::error::{Error, Result};

/// 内存中的 RGB 画布
///
/// 所有绘制都落在内存缓冲区上，只有 [`Figure::save_png`] 会写文件，
/// 中途失败时不会留下残缺的输出。
pub struct Figure {
    width: u32,
    height: u32,
    buffer: Vec<u8>,
}

impl Figure {
    pub fn new(size: (u32, u32)) -> Self {
        let (width, height) = size;
        Figure {
            width,
            height,
            buffer: vec![255; width as usize * height as usize * 3],
        }
    }

    /// 在画布上绘制，根区域使用像素坐标（原点在左上角）
    pub fn draw<T>(
        &mut self,
        f: impl FnOnce(&DrawingArea<BitMapBackend<'_>, Shift>) -> Result<T>,
    ) -> Result<T> {
        let size = (self.width, self.height);
        let root = BitMapBackend::with_buffer(&mut self.buffer, size).into_drawing_area();
        let out = f(&root)?;
        root.present().map_err(Error::draw)?;
        Ok(out)
    }

    /// 像素颜色，越界时返回 None
    pub fn pixel(&self, x: u32, y: u32) -> Option<(u8, u8, u8)> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * 3;
        Some((
            self.buffer[offset],
            self.buffer[offset + 1],
            self.buffer[offset + 2],
        ))
    }

    /// 编码为 PNG 字节流
    pub fn encode_png(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        PngEncoder::new(&mut bytes).write_image(
            &self.buffer,
            self.width,
            self.height,
            image::ColorType::Rgb8,
        )?;
        Ok(bytes)
    }

    /// 先在内存中完成编码，再一次性写出文件
    pub fn save_png(&self, path: &Path) -> Result<()> {
        let bytes = self.encode_png()?;
        std::fs::write(path, bytes)?;
        Ok(())
    }
}
