// 该文件是 Goutu （构图顾问） 项目的一部分。
// src/input/read_image_file.rs - 从图像文件读取帧
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

use image::ImageReader;
use thiserror::Error;
use tracing::{debug, error};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::{Frame, FrameError, Rotation},
};

#[derive(Error, Debug)]
pub enum ImageFileInputError {
  #[error("URI 方案不匹配")]
  SchemaMismatch,
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("图像加载错误: {0}")]
  ImageLoadError(#[from] image::ImageError),
  #[error("旋转参数错误: {0}")]
  Rotation(String),
  #[error("帧错误: {0}")]
  Frame(#[from] FrameError),
}

const ROTATION_QUERY: &str = "rotation";

/// `image:///path/to/frame.jpg?rotation=90`，只产生一帧
pub struct ImageFileInput {
  frame: Option<Frame>,
}

impl FromUrlWithScheme for ImageFileInput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for ImageFileInput {
  type Error = ImageFileInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI 方案不匹配: 期望 '{}', 实际 '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(ImageFileInputError::SchemaMismatch);
    }

    let rotation = match url.query_pairs().find(|(k, _)| k == ROTATION_QUERY) {
      Some((_, v)) => {
        let degrees: u32 = v
          .parse()
          .map_err(|_| ImageFileInputError::Rotation(v.to_string()))?;
        Rotation::try_from(degrees)?
      }
      None => Rotation::Deg0,
    };

    let path = url.path();
    let image = ImageReader::open(path)?.decode()?;
    debug!(
      "读取图像 {}: {}x{}, 旋转 {} 度",
      path,
      image.width(),
      image.height(),
      rotation.degrees()
    );

    let frame = Frame::from(image).with_rotation(rotation);
    frame.check()?;
    Ok(ImageFileInput { frame: Some(frame) })
  }
}

impl Iterator for ImageFileInput {
  type Item = Frame;

  fn next(&mut self) -> Option<Self::Item> {
    self.frame.take()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::{Rgb, RgbImage};

  fn write_png(dir: &std::path::Path) -> String {
    let path = dir.join("frame.png");
    RgbImage::from_pixel(6, 3, Rgb([9, 8, 7])).save(&path).unwrap();
    path.display().to_string()
  }

  #[test]
  fn reads_one_frame_with_rotation() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_png(dir.path());
    let url = Url::parse(&format!("image://{}?rotation=270", path)).unwrap();
    let mut input = ImageFileInput::from_url(&url).unwrap();
    let frame = input.next().unwrap();
    assert_eq!(frame.rotation(), Rotation::Deg270);
    assert_eq!((frame.width(), frame.height()), (6, 3));
    assert!(input.next().is_none());
  }

  #[test]
  fn invalid_rotation_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_png(dir.path());
    for q in ["45", "abc"] {
      let url = Url::parse(&format!("image://{}?rotation={}", path, q)).unwrap();
      assert!(ImageFileInput::from_url(&url).is_err());
    }
  }

  #[test]
  fn missing_file_is_io_error() {
    let url = Url::parse("image:///definitely/not/here.png").unwrap();
    assert!(matches!(
      ImageFileInput::from_url(&url),
      Err(ImageFileInputError::IoError(_))
    ));
  }

  #[test]
  fn read_frame_dispatches_on_scheme() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_png(dir.path());
    let url = Url::parse(&format!("image://{}", path)).unwrap();
    assert!(crate::input::read_frame(&url).is_ok());
    let url = Url::parse(&format!("video://{}", path)).unwrap();
    assert!(crate::input::read_frame(&url).is_err());
  }
}
