// 该文件是 Goutu （构图顾问） 项目的一部分。
// src/layout.rs - 检测框布局图合成
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use image::{Rgb, RgbImage};
use thiserror::Error;
use tracing::debug;

use crate::catalog::Palette;
use crate::model::DetectItem;

pub const LAYOUT_SIZE: u32 = 480;
/// 检测坐标 (640) 到布局图坐标 (480) 的比例
pub const LAYOUT_SCALE: f64 = 0.75;

#[derive(Error, Debug)]
pub enum LayoutError {
  #[error("调色板缺少类别 {class_id} 的颜色 (共 {palette_len} 种颜色)")]
  MissingColor { class_id: usize, palette_len: usize },
}

/// 不透明 ARGB 打包为有符号 32 位整数
pub fn pack_argb(rgb: [u8; 3]) -> i32 {
  (0xFFu32 << 24 | (rgb[0] as u32) << 16 | (rgb[1] as u32) << 8 | rgb[2] as u32) as i32
}

pub fn unpack_rgb(packed: i32) -> [u8; 3] {
  let bits = packed as u32;
  [(bits >> 16) as u8, (bits >> 8) as u8, bits as u8]
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutSynthesizer {
  size: u32,
  scale: f64,
}

impl Default for LayoutSynthesizer {
  fn default() -> Self {
    Self {
      size: LAYOUT_SIZE,
      scale: LAYOUT_SCALE,
    }
  }
}

impl LayoutSynthesizer {
  /// 按检测顺序把每个框内的像素设为目前为止所有覆盖颜色的打包整数平均值
  pub fn synthesize(&self, items: &[DetectItem], palette: &Palette) -> Result<RgbImage, LayoutError> {
    let size = self.size as usize;
    let background = palette.background();
    let mut raster = RgbImage::from_pixel(self.size, self.size, Rgb(background));
    let mut sums = vec![0i64; size * size];
    let mut counts = vec![0i64; size * size];

    for item in items {
      let color = palette
        .get(item.class_id + 1)
        .ok_or(LayoutError::MissingColor {
          class_id: item.class_id,
          palette_len: palette.len(),
        })?;
      let packed = pack_argb(color) as i64;

      let [left, top, right, bottom] = item.bbox.map(|v| (self.scale * v as f64) as i32);
      let x0 = left.clamp(0, self.size as i32) as usize;
      let x1 = right.clamp(0, self.size as i32) as usize;
      let y0 = top.clamp(0, self.size as i32) as usize;
      let y1 = bottom.clamp(0, self.size as i32) as usize;

      for y in y0..y1 {
        for x in x0..x1 {
          let index = y * size + x;
          sums[index] += packed;
          counts[index] += 1;
          let average = (sums[index] / counts[index]) as i32;
          raster.put_pixel(x as u32, y as u32, Rgb(unpack_rgb(average)));
        }
      }
    }

    debug!("布局图合成完成, 检测框数: {}", items.len());
    Ok(raster)
  }
}
