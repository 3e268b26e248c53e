// 该文件是 Goutu （构图顾问） 项目的一部分。
// src/output/draw.rs - 在帧上绘制推荐框
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
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

use crate::model::CompositionBox;

pub const COMPOSITION_COLOR: [u8; 3] = [255, 215, 0];
const BOX_THICKNESS: i32 = 2;

#[derive(Debug, Clone, Copy)]
pub struct Draw {
  thickness: i32,
}

impl Default for Draw {
  fn default() -> Self {
    Self {
      thickness: BOX_THICKNESS,
    }
  }
}

impl Draw {
  /// 在 [left, top, right, bottom] 处画空心框，超出图像的部分被裁掉
  pub fn draw_box(&self, image: &mut RgbImage, bbox: [i32; 4], color: [u8; 3]) {
    let (w, h) = (image.width() as i32, image.height() as i32);
    if w == 0 || h == 0 {
      return;
    }

    let x_min = bbox[0].clamp(0, w - 1);
    let y_min = bbox[1].clamp(0, h - 1);
    let x_max = bbox[2].clamp(0, w - 1);
    let y_max = bbox[3].clamp(0, h - 1);

    for t in 0..self.thickness {
      let (left, top) = (x_min + t, y_min + t);
      let (right, bottom) = (x_max - t, y_max - t);
      if left >= right || top >= bottom {
        break;
      }
      let rect = Rect::at(left, top).of_size((right - left + 1) as u32, (bottom - top + 1) as u32);
      draw_hollow_rect_mut(image, rect, Rgb(color));
    }
  }

  pub fn draw_composition(&self, image: &mut RgbImage, composition: &CompositionBox) {
    let bbox = composition.to_pixels(image.width(), image.height());
    self.draw_box(image, bbox, COMPOSITION_COLOR);
  }
}
