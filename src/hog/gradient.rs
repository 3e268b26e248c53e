// 该文件是 Goutu （构图顾问） 项目的一部分。
// src/hog/gradient.rs - 梯度幅值与方向
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

use image::RgbImage;

use crate::frame::RGB_CHANNELS;

/// Sobel 算子：微分方向 [-1, 0, 1]，平滑方向 [1, 2, 1]
const SOBEL_DERIV: [f64; 3] = [-1.0, 0.0, 1.0];
const SOBEL_SMOOTH: [f64; 3] = [1.0, 2.0, 1.0];

/// 归一化后梯度的最大值
const GRADIENT_SCALE: f64 = 255.0;

/// 行优先的单通道 f64 平面
#[derive(Debug, Clone)]
pub struct Plane {
  pub width: usize,
  pub height: usize,
  pub data: Vec<f64>,
}

impl Plane {
  pub fn zeros(width: usize, height: usize) -> Self {
    Self {
      width,
      height,
      data: vec![0.0; width * height],
    }
  }

  pub fn channel(image: &RgbImage, c: usize) -> Self {
    let (width, height) = image.dimensions();
    let data = image.pixels().map(|p| p[c] as f64).collect();
    Self {
      width: width as usize,
      height: height as usize,
      data,
    }
  }

  #[inline]
  pub fn get(&self, x: usize, y: usize) -> f64 {
    self.data[y * self.width + x]
  }
}

/// BORDER_REFLECT_101: -1 -> 1, n -> n - 2
#[inline]
fn reflect101(i: isize, n: usize) -> usize {
  if n == 1 {
    return 0;
  }
  let n = n as isize;
  let mut i = i;
  while i < 0 || i >= n {
    if i < 0 {
      i = -i;
    }
    if i >= n {
      i = 2 * (n - 1) - i;
    }
  }
  i as usize
}

/// 3x3 Sobel，返回 (gx, gy)
pub fn sobel(plane: &Plane) -> (Plane, Plane) {
  let (w, h) = (plane.width, plane.height);
  let mut gx = Plane::zeros(w, h);
  let mut gy = Plane::zeros(w, h);

  for y in 0..h {
    for x in 0..w {
      let mut sx = 0.0;
      let mut sy = 0.0;
      for (j, dy) in (-1isize..=1).enumerate() {
        let yy = reflect101(y as isize + dy, h);
        for (i, dx) in (-1isize..=1).enumerate() {
          let xx = reflect101(x as isize + dx, w);
          let v = plane.get(xx, yy);
          sx += v * SOBEL_DERIV[i] * SOBEL_SMOOTH[j];
          sy += v * SOBEL_SMOOTH[i] * SOBEL_DERIV[j];
        }
      }
      gx.data[y * w + x] = sx;
      gy.data[y * w + x] = sy;
    }
  }
  (gx, gy)
}

/// 除以自身最大绝对值（最大值为 0 时除以 1）后乘以 255
pub fn normalize(plane: &mut Plane) {
  let max = plane.data.iter().fold(0.0f64, |acc, v| acc.max(v.abs()));
  let dv = if max != 0.0 { max } else { 1.0 };
  for v in plane.data.iter_mut() {
    *v = *v / dv * GRADIENT_SCALE;
  }
}

/// 单通道的梯度幅值与无符号方向（角度，[0, 180)）
pub fn magnitude_orientation(plane: &Plane) -> (Plane, Plane) {
  let (mut gx, mut gy) = sobel(plane);
  normalize(&mut gx);
  normalize(&mut gy);

  let mut magnitude = Plane::zeros(plane.width, plane.height);
  let mut orientation = Plane::zeros(plane.width, plane.height);
  for i in 0..plane.data.len() {
    let (x, y) = (gx.data[i], gy.data[i]);
    magnitude.data[i] = (x * x + y * y).sqrt();
    let mut phase = y.atan2(x).to_degrees();
    if phase < 0.0 {
      phase += 360.0;
    }
    orientation.data[i] = phase % 180.0;
  }
  (magnitude, orientation)
}

/// 融合三个通道：只对幅值非零的通道求平均
pub fn fused_gradient(image: &RgbImage) -> (Plane, Plane) {
  let (width, height) = image.dimensions();
  let (width, height) = (width as usize, height as usize);
  let mut magnitude = Plane::zeros(width, height);
  let mut orientation = Plane::zeros(width, height);
  let mut count = vec![0u8; width * height];

  for c in 0..RGB_CHANNELS {
    let (m, o) = magnitude_orientation(&Plane::channel(image, c));
    for i in 0..m.data.len() {
      magnitude.data[i] += m.data[i];
      if m.data[i] != 0.0 {
        orientation.data[i] += o.data[i];
        count[i] += 1;
      }
    }
  }

  for (i, &n) in count.iter().enumerate() {
    if n != 0 {
      magnitude.data[i] /= n as f64;
      orientation.data[i] /= n as f64;
    }
  }
  (magnitude, orientation)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn ramp(width: usize, height: usize) -> Plane {
    let mut plane = Plane::zeros(width, height);
    for y in 0..height {
      for x in 0..width {
        plane.data[y * width + x] = x as f64;
      }
    }
    plane
  }

  #[test]
  fn reflect101_mirrors_without_edge_repeat() {
    assert_eq!(reflect101(-1, 5), 1);
    assert_eq!(reflect101(5, 5), 3);
    assert_eq!(reflect101(2, 5), 2);
    assert_eq!(reflect101(-1, 1), 0);
  }

  #[test]
  fn sobel_on_horizontal_ramp() {
    let (gx, gy) = sobel(&ramp(6, 4));
    // 内部像素: (1 + 2 + 1) * 2 = 8
    assert_eq!(gx.get(2, 1), 8.0);
    // 边界反射使得首列梯度为 0
    assert_eq!(gx.get(0, 1), 0.0);
    assert!(gy.data.iter().all(|v| *v == 0.0));
  }

  #[test]
  fn normalize_scales_to_255() {
    let mut plane = Plane {
      width: 3,
      height: 1,
      data: vec![-4.0, 2.0, 0.0],
    };
    normalize(&mut plane);
    assert_eq!(plane.data, vec![-255.0, 127.5, 0.0]);
  }

  #[test]
  fn normalize_keeps_zero_plane() {
    let mut plane = Plane::zeros(3, 3);
    normalize(&mut plane);
    assert!(plane.data.iter().all(|v| *v == 0.0));
  }

  #[test]
  fn orientation_is_unsigned() {
    let mut plane = Plane::zeros(5, 5);
    for y in 0..5 {
      for x in 0..5 {
        // 向左变亮，gx < 0，方向 180 度折回 0
        plane.data[y * 5 + x] = (4 - x) as f64;
      }
    }
    let (m, o) = magnitude_orientation(&plane);
    assert!(m.get(2, 2) > 0.0);
    assert!(o.get(2, 2).abs() < 1e-9);
    assert!(o.data.iter().all(|v| (0.0..180.0).contains(v)));
  }

  #[test]
  fn fused_gradient_skips_flat_channels() {
    let mut image = RgbImage::new(5, 5);
    for (x, _, p) in image.enumerate_pixels_mut() {
      p[0] = (x * 40) as u8;
    }
    let (m, _) = fused_gradient(&image);
    let (single, _) = magnitude_orientation(&Plane::channel(&image, 0));
    // 只有 R 通道有梯度，平均时只计入一个通道
    assert_eq!(m.get(2, 2), single.get(2, 2));
  }
}
