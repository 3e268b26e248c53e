// 该文件是 Goutu （构图顾问） 项目的一部分。
// src/hog/histogram.rs - 单元方向直方图
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

use super::gradient::Plane;

const MAX_DEGREE: f64 = 180.0;

/// 全图幅值二值化：大于 mean * threshold / 10 的像素记为 1，其余为 0
pub fn binarize_magnitude(magnitude: &mut Plane, threshold: f64) {
  let mean = magnitude.data.iter().sum::<f64>() / magnitude.data.len() as f64;
  let cut = mean * threshold / 10.0;
  for v in magnitude.data.iter_mut() {
    *v = if *v > cut { 1.0 } else { 0.0 };
  }
}

/// 只保留第一个最大值所在的 bin；全零时保持全零
pub fn one_hot_max(histogram: &mut [f64]) {
  let mut best = 0usize;
  for (i, v) in histogram.iter().enumerate() {
    if *v > histogram[best] {
      best = i;
    }
  }
  let max = histogram[best];
  for (i, v) in histogram.iter_mut().enumerate() {
    *v = if i == best && max != 0.0 { 1.0 } else { 0.0 };
  }
}

/// 对一个 cell 统计方向直方图，幅值按角度距离在相邻两个 bin 之间线性分配
pub fn cell_histogram(
  magnitude: &Plane,
  orientation: &Plane,
  x0: usize,
  y0: usize,
  cell_size: usize,
  n_bins: usize,
) -> Vec<f64> {
  let diff = MAX_DEGREE / n_bins as f64;
  let mut histogram = vec![0.0; n_bins];

  for y in y0..y0 + cell_size {
    for x in x0..x0 + cell_size {
      let m = magnitude.get(x, y);
      let o = orientation.get(x, y);

      let index = ((o / diff) as usize).min(n_bins - 1);
      let deg = index as f64 * diff;
      histogram[index] += m * (1.0 - (o - deg) / diff);

      let next = (index + 1) % n_bins;
      histogram[next] += m * ((o - deg) / diff);
    }
  }

  one_hot_max(&mut histogram);
  histogram
}
