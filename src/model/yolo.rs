// 该文件是 Goutu （构图顾问） 项目的一部分。
// src/model/yolo.rs - YOLO 检测输出解码
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

use super::{
  DetectItem, DetectResult, Forward, Model, ModelError, NO_MEAN_RGB, NO_STD_RGB, Tensor,
  non_max_suppression, take_output,
};
use crate::frame::Frame;

pub const YOLO_INPUT_SIZE: u32 = 640;
pub const YOLO_OUTPUT_ROWS: usize = 25200;
pub const YOLO_OUTPUT_COLUMNS: usize = 85;
pub const YOLO_OBJECT_THRESH: f32 = 0.3;
pub const YOLO_NMS_THRESH: f32 = 0.3;
pub const YOLO_NMS_LIMIT: usize = 15;

/// cx, cy, w, h, objectness 之后才是类别分数
const YOLO_BOX_COLUMNS: usize = 5;

#[derive(Error, Debug)]
pub enum DecodeError {
  #[error("检测输出过短: 期望 {expected} 个值, 实际 {actual} 个")]
  ShortBuffer { expected: usize, actual: usize },
  #[error("检测输出列数过少: {0}")]
  TooFewColumns(usize),
  #[error("模型错误: {0}")]
  Model(#[from] ModelError),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectorConfig {
  pub input_size: u32,
  pub rows: usize,
  pub columns: usize,
  pub confidence_threshold: f32,
  pub iou_threshold: f32,
  pub nms_limit: usize,
}

impl Default for DetectorConfig {
  fn default() -> Self {
    Self {
      input_size: YOLO_INPUT_SIZE,
      rows: YOLO_OUTPUT_ROWS,
      columns: YOLO_OUTPUT_COLUMNS,
      confidence_threshold: YOLO_OBJECT_THRESH,
      iou_threshold: YOLO_NMS_THRESH,
      nms_limit: YOLO_NMS_LIMIT,
    }
  }
}

impl DetectorConfig {
  /// 帧尺寸到模型输入尺寸的缩放系数 (sx, sy)
  pub fn scale_for(&self, width: u32, height: u32) -> (f32, f32) {
    let size = self.input_size.max(1) as f32;
    (width as f32 / size, height as f32 / size)
  }

  /// 解码行优先的 rows x columns 输出，并做非极大值抑制
  pub fn decode(
    &self,
    raw: &[f32],
    rows: usize,
    columns: usize,
    scale: (f32, f32),
  ) -> Result<Vec<DetectItem>, DecodeError> {
    if columns <= YOLO_BOX_COLUMNS {
      return Err(DecodeError::TooFewColumns(columns));
    }
    let expected = rows * columns;
    if raw.len() < expected {
      return Err(DecodeError::ShortBuffer {
        expected,
        actual: raw.len(),
      });
    }

    let (sx, sy) = (scale.0 as f64, scale.1 as f64);
    let mut candidates = Vec::new();
    for row in raw[..expected].chunks_exact(columns) {
      let objectness = row[4];
      // NaN 同样丢弃
      if objectness.is_nan() || objectness <= self.confidence_threshold {
        continue;
      }

      let (cx, cy, w, h) = (row[0], row[1], row[2], row[3]);
      let left = (sx * (cx - w / 2.0) as f64) as i32;
      let top = (sy * (cy - h / 2.0) as f64) as i32;
      let right = (sx * (cx + w / 2.0) as f64) as i32;
      let bottom = (sy * (cy + h / 2.0) as f64) as i32;

      let mut class_id = 0;
      let mut best = row[YOLO_BOX_COLUMNS];
      for (index, &score) in row[YOLO_BOX_COLUMNS..].iter().enumerate().skip(1) {
        if score > best {
          best = score;
          class_id = index;
        }
      }

      candidates.push(DetectItem {
        class_id,
        score: objectness,
        bbox: [left, top, right, bottom],
      });
    }

    debug!("候选检测框数: {}", candidates.len());
    let items = non_max_suppression(candidates, self.iou_threshold, self.nms_limit);
    debug!("抑制后检测框数: {}", items.len());
    Ok(items)
  }
}

/// 使用默认阈值解码
pub fn decode(
  raw: &[f32],
  rows: usize,
  columns: usize,
  scale: (f32, f32),
) -> Result<Vec<DetectItem>, DecodeError> {
  DetectorConfig::default().decode(raw, rows, columns, scale)
}

/// 目标检测模型：帧 -> 抑制后的检测框
pub struct Yolo<H> {
  handle: H,
  config: DetectorConfig,
}

impl<H: Forward> Yolo<H> {
  pub fn new(handle: H, config: DetectorConfig) -> Self {
    Self { handle, config }
  }

  pub fn config(&self) -> &DetectorConfig {
    &self.config
  }
}

impl<H: Forward> Model for Yolo<H> {
  type Input = Frame;
  type Output = DetectResult;
  type Error = DecodeError;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    let frame = input.upright();
    frame.check().map_err(ModelError::from)?;
    let scale = self.config.scale_for(frame.width(), frame.height());

    debug!("设置检测模型输入");
    let size = self.config.input_size;
    let tensor =
      Tensor::from_frame(&frame, size, NO_MEAN_RGB, NO_STD_RGB).map_err(ModelError::from)?;

    debug!("执行检测模型推理");
    let output = take_output(self.handle.forward(&[tensor])?, 0)?;

    let items = self
      .config
      .decode(&output.data, self.config.rows, self.config.columns, scale)?;
    Ok(DetectResult {
      items: items.into_boxed_slice(),
    })
  }
}
