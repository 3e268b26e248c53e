// 该文件是 Goutu （构图顾问） 项目的一部分。
// src/model/composition.rs - 构图框预测
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
use tracing::debug;

use super::{Forward, ModelError, NO_MEAN_RGB, NO_STD_RGB, Tensor, take_output};
use crate::frame::{Frame, resize_bilinear};

pub const BOX_INPUT_SIZE: u32 = 480;

/// 归一化的推荐构图框
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompositionBox {
  pub center_x: f64,
  pub center_y: f64,
  pub width: f64,
  pub height: f64,
}

impl CompositionBox {
  /// 换算到 width x height 图像上的 [left, top, right, bottom]
  pub fn to_pixels(&self, width: u32, height: u32) -> [i32; 4] {
    let (w, h) = (width as f64, height as f64);
    [
      ((self.center_x - self.width / 2.0) * w) as i32,
      ((self.center_y - self.height / 2.0) * h) as i32,
      ((self.center_x + self.width / 2.0) * w) as i32,
      ((self.center_y + self.height / 2.0) * h) as i32,
    ]
  }
}

pub struct CompositionPredictor<H> {
  handle: H,
}

impl<H: Forward> CompositionPredictor<H> {
  pub fn new(handle: H) -> Self {
    Self { handle }
  }

  /// 以 (帧, 布局图) 两个张量调用构图模型
  pub fn predict(&self, frame: &Frame, layout: &RgbImage) -> Result<CompositionBox, ModelError> {
    let frame = frame.upright();
    let frame_tensor = Tensor::from_frame(&frame, BOX_INPUT_SIZE, NO_MEAN_RGB, NO_STD_RGB)?;

    let layout = if layout.dimensions() == (BOX_INPUT_SIZE, BOX_INPUT_SIZE) {
      layout.clone()
    } else {
      resize_bilinear(layout, BOX_INPUT_SIZE, BOX_INPUT_SIZE)
    };
    let layout_tensor = Tensor::from_rgb(&layout, NO_MEAN_RGB, NO_STD_RGB);

    let output = take_output(self.handle.forward(&[frame_tensor, layout_tensor])?, 0)?;
    if output.data.len() < 4 {
      return Err(ModelError::UnexpectedOutput(format!(
        "构图框输出至少需要 4 个值, 实际 {} 个",
        output.data.len()
      )));
    }
    let v = &output.data;
    let result = CompositionBox {
      center_x: v[0] as f64,
      center_y: v[1] as f64,
      width: v[2] as f64,
      height: v[3] as f64,
    };
    debug!("构图框: {:?}", result);
    Ok(result)
  }
}
