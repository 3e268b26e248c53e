// 该文件是 Goutu （构图顾问） 项目的一部分。
// src/model.rs - 模型
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

use crate::frame::{Frame, FrameError, RGB_CHANNELS, rgb_to_nchw};

pub trait Model {
  type Input;
  type Output;
  type Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error>;
}

#[derive(Error, Debug)]
pub enum ModelError {
  #[error("模型不可用 {asset}: {reason}")]
  Unavailable { asset: String, reason: String },
  #[error("帧错误: {0}")]
  Frame(#[from] FrameError),
  #[error("模型推理错误: {0}")]
  Forward(String),
  #[error("模型输出不符合预期: {0}")]
  UnexpectedOutput(String),
}

impl ModelError {
  pub fn unavailable(asset: &str, reason: impl ToString) -> Self {
    ModelError::Unavailable {
      asset: asset.to_string(),
      reason: reason.to_string(),
    }
  }
}

/// 稠密 f32 张量
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
  pub shape: Vec<usize>,
  pub data: Vec<f32>,
}

impl Tensor {
  pub fn new(shape: Vec<usize>, data: Vec<f32>) -> Self {
    Self { shape, data }
  }

  /// 帧缩放到 size x size 后得到的 [1, 3, size, size] 张量
  pub fn from_frame(
    frame: &Frame,
    size: u32,
    mean: [f32; 3],
    std: [f32; 3],
  ) -> Result<Self, FrameError> {
    let image = frame.resized_rgb(size, size)?;
    Ok(Self::from_rgb(&image, mean, std))
  }

  pub fn from_rgb(image: &image::RgbImage, mean: [f32; 3], std: [f32; 3]) -> Self {
    let (width, height) = image.dimensions();
    Self {
      shape: vec![1, RGB_CHANNELS, height as usize, width as usize],
      data: rgb_to_nchw(image, mean, std),
    }
  }
}

/// 不做均值/方差归一化，只把像素缩放到 [0, 1]
pub const NO_MEAN_RGB: [f32; 3] = [0.0, 0.0, 0.0];
pub const NO_STD_RGB: [f32; 3] = [1.0, 1.0, 1.0];

/// 不透明的前向推理句柄
pub trait Forward: Send + Sync {
  fn forward(&self, inputs: &[Tensor]) -> Result<Vec<Tensor>, ModelError>;
}

impl<T: Forward + ?Sized> Forward for std::sync::Arc<T> {
  fn forward(&self, inputs: &[Tensor]) -> Result<Vec<Tensor>, ModelError> {
    (**self).forward(inputs)
  }
}

/// 取第 index 个输出
pub(crate) fn take_output(mut outputs: Vec<Tensor>, index: usize) -> Result<Tensor, ModelError> {
  if index >= outputs.len() {
    return Err(ModelError::UnexpectedOutput(format!(
      "期望至少 {} 个输出, 实际 {} 个",
      index + 1,
      outputs.len()
    )));
  }
  Ok(outputs.swap_remove(index))
}

#[derive(Debug, Clone)]
pub struct DetectItem {
  pub class_id: usize,
  pub score: f32,
  pub bbox: [i32; 4], // [left, top, right, bottom]
}

#[derive(Debug, Clone, Default)]
pub struct DetectResult {
  pub items: Box<[DetectItem]>,
}

mod asset;
mod composition;
mod embedding;
mod nms;
mod yolo;

pub use self::asset::{
  AssetStore, BOX_MODEL_ASSET, DETECTOR_MODEL_ASSET, EMBEDDING_MODEL_ASSET, ModelBackend,
};
pub use self::composition::{BOX_INPUT_SIZE, CompositionBox, CompositionPredictor};
pub use self::embedding::{
  EMBEDDING_INPUT_SIZE, EmbeddingClient, IMAGENET_MEAN_RGB, IMAGENET_STD_RGB,
};
pub use self::nms::{iou, non_max_suppression};
pub use self::yolo::{
  DecodeError, DetectorConfig, YOLO_INPUT_SIZE, YOLO_NMS_LIMIT, YOLO_NMS_THRESH, YOLO_OBJECT_THRESH,
  YOLO_OUTPUT_COLUMNS, YOLO_OUTPUT_ROWS, Yolo, decode,
};
