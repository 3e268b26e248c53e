// 该文件是 Goutu （构图顾问） 项目的一部分。
// src/frame.rs - 输入帧定义
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

use image::{DynamicImage, ImageBuffer, Rgb, Rgb32FImage, RgbImage};
use imageproc::geometric_transformations::{Interpolation, warp_into_with};
use thiserror::Error;

pub const RGB_CHANNELS: usize = 3;
const RGBA_CHANNELS: usize = 4;

#[derive(Error, Debug)]
pub enum FrameError {
  #[error("帧尺寸无效: {0}x{1}")]
  Empty(u32, u32),
  #[error("不支持的旋转角度: {0}")]
  Rotation(u32),
  #[error("数据长度不匹配: 期望长度 {expected}, 实际长度 {actual}")]
  LengthMismatch { expected: usize, actual: usize },
}

/// 帧的旋转信息，表示需要顺时针旋转多少度才能得到正向图像
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rotation {
  #[default]
  Deg0,
  Deg90,
  Deg180,
  Deg270,
}

impl TryFrom<u32> for Rotation {
  type Error = FrameError;

  fn try_from(degrees: u32) -> Result<Self, Self::Error> {
    match degrees % 360 {
      0 => Ok(Rotation::Deg0),
      90 => Ok(Rotation::Deg90),
      180 => Ok(Rotation::Deg180),
      270 => Ok(Rotation::Deg270),
      _ => Err(FrameError::Rotation(degrees)),
    }
  }
}

impl Rotation {
  pub fn degrees(&self) -> u32 {
    match self {
      Rotation::Deg0 => 0,
      Rotation::Deg90 => 90,
      Rotation::Deg180 => 180,
      Rotation::Deg270 => 270,
    }
  }
}

/// 一帧输入图像（RGB 或 RGBA），可以来自相机也可以来自文件
#[derive(Debug, Clone)]
pub struct Frame {
  image: DynamicImage,
  rotation: Rotation,
}

impl From<DynamicImage> for Frame {
  fn from(image: DynamicImage) -> Self {
    Self {
      image,
      rotation: Rotation::default(),
    }
  }
}

impl From<RgbImage> for Frame {
  fn from(image: RgbImage) -> Self {
    Self::from(DynamicImage::ImageRgb8(image))
  }
}

impl Frame {
  pub fn with_rotation(mut self, rotation: Rotation) -> Self {
    self.rotation = rotation;
    self
  }

  /// 从紧密排列的 RGBA 像素数据构造帧
  pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Result<Self, FrameError> {
    let expected = RGBA_CHANNELS * width as usize * height as usize;
    if data.len() != expected {
      return Err(FrameError::LengthMismatch {
        expected,
        actual: data.len(),
      });
    }
    let buffer = ImageBuffer::from_raw(width, height, data).ok_or(FrameError::LengthMismatch {
      expected,
      actual: 0,
    })?;
    Ok(Self::from(DynamicImage::ImageRgba8(buffer)))
  }

  /// 从紧密排列的 RGB 像素数据构造帧
  pub fn from_rgb(width: u32, height: u32, data: Vec<u8>) -> Result<Self, FrameError> {
    let expected = RGB_CHANNELS * width as usize * height as usize;
    if data.len() != expected {
      return Err(FrameError::LengthMismatch {
        expected,
        actual: data.len(),
      });
    }
    let buffer = ImageBuffer::from_raw(width, height, data).ok_or(FrameError::LengthMismatch {
      expected,
      actual: 0,
    })?;
    Ok(Self::from(DynamicImage::ImageRgb8(buffer)))
  }

  pub fn width(&self) -> u32 {
    self.image.width()
  }

  pub fn height(&self) -> u32 {
    self.image.height()
  }

  pub fn rotation(&self) -> Rotation {
    self.rotation
  }

  /// 空帧或零面积帧在进入任何数值计算前即被拒绝
  pub fn check(&self) -> Result<(), FrameError> {
    if self.width() == 0 || self.height() == 0 {
      return Err(FrameError::Empty(self.width(), self.height()));
    }
    Ok(())
  }

  /// 按旋转信息转正后的帧
  pub fn upright(&self) -> Frame {
    let image = match self.rotation {
      Rotation::Deg0 => return self.clone(),
      Rotation::Deg90 => self.image.rotate90(),
      Rotation::Deg180 => self.image.rotate180(),
      Rotation::Deg270 => self.image.rotate270(),
    };
    Frame {
      image,
      rotation: Rotation::Deg0,
    }
  }

  /// 去掉 alpha 通道后的 RGB 图像
  pub fn to_rgb(&self) -> Result<RgbImage, FrameError> {
    self.check()?;
    Ok(self.image.to_rgb8())
  }

  /// 去掉 alpha 通道并缩放到指定尺寸
  pub fn resized_rgb(&self, width: u32, height: u32) -> Result<RgbImage, FrameError> {
    let rgb = self.to_rgb()?;
    if rgb.dimensions() == (width, height) {
      return Ok(rgb);
    }
    Ok(resize_bilinear(&rgb, width, height))
  }
}

/// 像素中心对齐的双线性缩放
///
/// 目标像素 x 取源坐标 (x + 0.5) * src / dst - 0.5，越界坐标钳到边缘像素。
/// 缩小时只取相邻两个像素插值，不随缩放倍数扩大采样核。
pub fn resize_bilinear(image: &RgbImage, width: u32, height: u32) -> RgbImage {
  let (src_w, src_h) = image.dimensions();
  if (src_w, src_h) == (width, height) {
    return image.clone();
  }
  if src_w == 0 || src_h == 0 || width == 0 || height == 0 {
    return RgbImage::new(width, height);
  }

  // 多复制一行一列边缘像素，使钳到边缘的坐标也能取到右下邻居
  let padded = Rgb32FImage::from_fn(src_w + 1, src_h + 1, |x, y| {
    let p = image.get_pixel(x.min(src_w - 1), y.min(src_h - 1));
    Rgb(p.0.map(f32::from))
  });

  let scale_x = src_w as f32 / width as f32;
  let scale_y = src_h as f32 / height as f32;
  let max_x = (src_w - 1) as f32;
  let max_y = (src_h - 1) as f32;
  let mapping = move |x: f32, y: f32| {
    (
      ((x + 0.5) * scale_x - 0.5).clamp(0.0, max_x),
      ((y + 0.5) * scale_y - 0.5).clamp(0.0, max_y),
    )
  };

  let mut resized = Rgb32FImage::new(width, height);
  warp_into_with(
    &padded,
    mapping,
    Interpolation::Bilinear,
    Rgb([0.0; 3]),
    &mut resized,
  );

  RgbImage::from_fn(width, height, |x, y| {
    Rgb(resized.get_pixel(x, y).0.map(|v| v.round().clamp(0.0, 255.0) as u8))
  })
}

/// 将 RGB 图像转为 NCHW 排列的浮点数据: (pixel / 255 - mean) / std
pub fn rgb_to_nchw(image: &RgbImage, mean: [f32; 3], std: [f32; 3]) -> Vec<f32> {
  let (width, height) = image.dimensions();
  let plane = (width as usize) * (height as usize);
  let mut data = vec![0.0f32; RGB_CHANNELS * plane];

  for c in 0..RGB_CHANNELS {
    for h in 0..height {
      for w in 0..width {
        let pixel = image.get_pixel(w, h);
        let value = pixel[c] as f32 / 255.0;
        let index = c * plane + (h as usize) * (width as usize) + (w as usize);
        data[index] = (value - mean[c]) / std[c];
      }
    }
  }
  data
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::Rgb;

  #[test]
  fn empty_frame_is_rejected() {
    let frame = Frame::from_rgb(0, 0, Vec::new()).unwrap();
    assert!(matches!(frame.to_rgb(), Err(FrameError::Empty(0, 0))));
  }

  #[test]
  fn rgba_length_is_checked() {
    let err = Frame::from_rgba(2, 2, vec![0; 15]).unwrap_err();
    assert!(matches!(
      err,
      FrameError::LengthMismatch {
        expected: 16,
        actual: 15
      }
    ));
  }

  #[test]
  fn alpha_is_dropped() {
    let frame = Frame::from_rgba(1, 1, vec![10, 20, 30, 40]).unwrap();
    let rgb = frame.to_rgb().unwrap();
    assert_eq!(rgb.get_pixel(0, 0), &Rgb([10, 20, 30]));
  }

  #[test]
  fn upright_swaps_dimensions_for_quarter_turns() {
    let frame = Frame::from(RgbImage::new(4, 2)).with_rotation(Rotation::try_from(90).unwrap());
    let upright = frame.upright();
    assert_eq!((upright.width(), upright.height()), (2, 4));
    assert_eq!(upright.rotation(), Rotation::Deg0);
  }

  #[test]
  fn odd_rotation_is_rejected() {
    assert!(matches!(Rotation::try_from(45), Err(FrameError::Rotation(45))));
    assert_eq!(Rotation::try_from(450).unwrap(), Rotation::Deg90);
  }

  #[test]
  fn halving_averages_pixel_pairs() {
    let mut image = RgbImage::new(8, 1);
    for (x, v) in [0u8, 100, 50, 150, 0, 0, 240, 240].into_iter().enumerate() {
      image.put_pixel(x as u32, 0, Rgb([v, v, 255 - v]));
    }
    let half = resize_bilinear(&image, 4, 1);
    let row: Vec<u8> = half.pixels().map(|p| p.0[0]).collect();
    assert_eq!(row, vec![50, 100, 0, 240]);
    assert_eq!(half.get_pixel(0, 0).0[2], 205);
  }

  #[test]
  fn downscale_does_not_blur_step_edges() {
    let mut image = RgbImage::new(8, 1);
    for x in 4..8 {
      image.put_pixel(x, 0, Rgb([240, 240, 240]));
    }
    let row: Vec<u8> = resize_bilinear(&image, 4, 1).pixels().map(|p| p.0[0]).collect();
    assert_eq!(row, vec![0, 0, 240, 240]);
  }

  #[test]
  fn upscale_replicates_borders() {
    let mut image = RgbImage::new(2, 1);
    image.put_pixel(1, 0, Rgb([200, 200, 200]));
    let row: Vec<u8> = resize_bilinear(&image, 4, 1).pixels().map(|p| p.0[0]).collect();
    assert_eq!(row, vec![0, 50, 150, 200]);
  }

  #[test]
  fn resized_frame_uses_bilinear_sampling() {
    let frame = Frame::from(RgbImage::from_pixel(300, 200, Rgb([7, 8, 9])));
    let resized = frame.resized_rgb(128, 128).unwrap();
    assert_eq!(resized.dimensions(), (128, 128));
    assert!(resized.pixels().all(|p| p.0 == [7, 8, 9]));
  }

  #[test]
  fn nchw_layout_is_planar() {
    let mut image = RgbImage::new(2, 1);
    image.put_pixel(0, 0, Rgb([255, 0, 0]));
    image.put_pixel(1, 0, Rgb([0, 255, 0]));
    let data = rgb_to_nchw(&image, [0.0; 3], [1.0; 3]);
    assert_eq!(data, vec![1.0, 0.0, 0.0, 1.0, 0.0, 0.0]);
  }
}
