// 该文件是 Goutu （构图顾问） 项目的一部分。
// src/hog.rs - 方向梯度直方图特征提取
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

use thiserror::Error;
use tracing::debug;

use crate::frame::{Frame, FrameError};

mod gradient;
mod histogram;

pub const HOG_IMAGE_RESIZE: u32 = 128;
pub const HOG_CELL_SIZE: u32 = 16;
pub const HOG_BLOCK_SIZE: (u32, u32) = (1, 1);
pub const HOG_MAGNITUDE_THRESHOLD: f64 = 10.0;
pub const HOG_N_BINS: usize = 9;

#[derive(Error, Debug)]
pub enum HogError {
  #[error("帧错误: {0}")]
  Frame(#[from] FrameError),
  #[error("HOG 配置无效: {0}")]
  Config(String),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HogConfig {
  /// 缩放后的正方形边长
  pub image_resize: u32,
  /// 正方形 cell 边长（像素）
  pub cell_size: u32,
  /// block 尺寸 (宽, 高)，以 cell 为单位
  pub block_size: (u32, u32),
  pub magnitude_threshold: f64,
  pub n_bins: usize,
}

impl Default for HogConfig {
  fn default() -> Self {
    Self {
      image_resize: HOG_IMAGE_RESIZE,
      cell_size: HOG_CELL_SIZE,
      block_size: HOG_BLOCK_SIZE,
      magnitude_threshold: HOG_MAGNITUDE_THRESHOLD,
      n_bins: HOG_N_BINS,
    }
  }
}

impl HogConfig {
  /// cell 网格的边长
  pub fn grid_size(&self) -> usize {
    (self.image_resize / self.cell_size.max(1)) as usize
  }

  /// 特征向量长度
  pub fn feature_len(&self) -> usize {
    let grid = self.grid_size();
    let (bw, bh) = (self.block_size.0 as usize, self.block_size.1 as usize);
    (grid + 1).saturating_sub(bw) * (grid + 1).saturating_sub(bh) * bw * bh * self.n_bins
  }

  /// 特征向量按 n_bins 切分后的行数
  pub fn cell_rows(&self) -> usize {
    self.feature_len() / self.n_bins.max(1)
  }

  pub fn validate(&self) -> Result<(), HogError> {
    if self.n_bins == 0 {
      return Err(HogError::Config("n_bins 不能为 0".to_string()));
    }
    if self.cell_size == 0 || self.cell_size > self.image_resize {
      return Err(HogError::Config(format!(
        "cell 尺寸 {} 与缩放尺寸 {} 不匹配",
        self.cell_size, self.image_resize
      )));
    }
    let grid = self.grid_size() as u32;
    let (bw, bh) = self.block_size;
    if bw == 0 || bh == 0 || bw > grid || bh > grid {
      return Err(HogError::Config(format!(
        "block 尺寸 {}x{} 超出 cell 网格 {}x{}",
        bw, bh, grid, grid
      )));
    }
    Ok(())
  }
}

/// HOG 风格特征提取器（幅值与主方向都做硬二值化）
#[derive(Debug, Clone)]
pub struct FeatureExtractor {
  config: HogConfig,
}

impl FeatureExtractor {
  pub fn new(config: HogConfig) -> Result<Self, HogError> {
    config.validate()?;
    Ok(Self { config })
  }

  pub fn config(&self) -> &HogConfig {
    &self.config
  }

  pub fn extract(&self, frame: &Frame) -> Result<Vec<f64>, HogError> {
    let size = self.config.image_resize;
    let resized = frame.resized_rgb(size, size)?;

    let (mut magnitude, orientation) = gradient::fused_gradient(&resized);
    histogram::binarize_magnitude(&mut magnitude, self.config.magnitude_threshold);

    let grid = self.config.grid_size();
    let cell = self.config.cell_size as usize;
    let n_bins = self.config.n_bins;

    // histogram_map[row][col]
    let mut histogram_map = Vec::with_capacity(grid * grid);
    for row in 0..grid {
      for col in 0..grid {
        histogram_map.push(histogram::cell_histogram(
          &magnitude,
          &orientation,
          col * cell,
          row * cell,
          cell,
          n_bins,
        ));
      }
    }

    let (bw, bh) = (
      self.config.block_size.0 as usize,
      self.config.block_size.1 as usize,
    );
    let mut hog = Vec::with_capacity(self.config.feature_len());
    for by in 0..=grid - bh {
      for bx in 0..=grid - bw {
        for row in by..by + bh {
          for col in bx..bx + bw {
            hog.extend_from_slice(&histogram_map[row * grid + col]);
          }
        }
      }
    }

    debug!(
      "HOG 特征长度: {}, 非零 cell 数: {}",
      hog.len(),
      histogram_map
        .iter()
        .filter(|h| h.iter().any(|v| *v != 0.0))
        .count()
    );
    Ok(hog)
  }
}
