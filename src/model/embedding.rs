// 该文件是 Goutu （构图顾问） 项目的一部分。
// src/model/embedding.rs - 图像嵌入模型
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

use tracing::debug;

use super::{Forward, Model, ModelError, Tensor, take_output};
use crate::frame::Frame;

pub const EMBEDDING_INPUT_SIZE: u32 = 224;
pub const IMAGENET_MEAN_RGB: [f32; 3] = [0.485, 0.456, 0.406];
pub const IMAGENET_STD_RGB: [f32; 3] = [0.229, 0.224, 0.225];

pub struct EmbeddingClient<H> {
  handle: H,
}

impl<H: Forward> EmbeddingClient<H> {
  pub fn new(handle: H) -> Self {
    Self { handle }
  }

  pub fn embed(&self, frame: &Frame) -> Result<Vec<f64>, ModelError> {
    let frame = frame.upright();
    let tensor = Tensor::from_frame(
      &frame,
      EMBEDDING_INPUT_SIZE,
      IMAGENET_MEAN_RGB,
      IMAGENET_STD_RGB,
    )?;
    let output = take_output(self.handle.forward(&[tensor])?, 0)?;
    if output.data.is_empty() {
      return Err(ModelError::UnexpectedOutput("嵌入向量为空".to_string()));
    }
    debug!("嵌入向量长度: {}", output.data.len());
    Ok(output.data.iter().map(|&v| v as f64).collect())
  }
}

impl<H: Forward> Model for EmbeddingClient<H> {
  type Input = Frame;
  type Output = Vec<f64>;
  type Error = ModelError;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    self.embed(input)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::{Rgb, RgbImage};

  /// 返回每个通道第一个值
  struct FirstValues;

  impl Forward for FirstValues {
    fn forward(&self, inputs: &[Tensor]) -> Result<Vec<Tensor>, ModelError> {
      let t = &inputs[0];
      assert_eq!(t.shape, vec![1, 3, 224, 224]);
      let plane = 224 * 224;
      let data = (0..3).map(|c| t.data[c * plane]).collect();
      Ok(vec![Tensor::new(vec![1, 3], data)])
    }
  }

  #[test]
  fn input_uses_imagenet_normalization() {
    let frame = Frame::from(RgbImage::from_pixel(32, 16, Rgb([255, 0, 255])));
    let e = EmbeddingClient::new(FirstValues).embed(&frame).unwrap();
    assert!((e[0] - ((1.0 - 0.485) / 0.229) as f32 as f64).abs() < 1e-5);
    assert!((e[1] - (-0.456f32 / 0.224) as f64).abs() < 1e-5);
    assert!((e[2] - ((1.0 - 0.406) / 0.225) as f32 as f64).abs() < 1e-5);
  }

  struct NoOutput;

  impl Forward for NoOutput {
    fn forward(&self, _: &[Tensor]) -> Result<Vec<Tensor>, ModelError> {
      Ok(Vec::new())
    }
  }

  #[test]
  fn missing_output_is_error() {
    let frame = Frame::from(RgbImage::new(4, 4));
    assert!(matches!(
      EmbeddingClient::new(NoOutput).embed(&frame),
      Err(ModelError::UnexpectedOutput(_))
    ));
  }

  #[test]
  fn empty_frame_is_rejected_before_forward() {
    let frame = Frame::from(RgbImage::new(0, 0));
    assert!(matches!(
      EmbeddingClient::new(NoOutput).embed(&frame),
      Err(ModelError::Frame(_))
    ));
  }
}
