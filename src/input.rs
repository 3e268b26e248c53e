// 该文件是 Goutu （构图顾问） 项目的一部分。
// src/input.rs - 输入
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

use crate::frame::Frame;

#[cfg(feature = "read_image_file")]
mod read_image_file;
#[cfg(feature = "read_image_file")]
pub use self::read_image_file::{ImageFileInput, ImageFileInputError};

#[derive(Error, Debug)]
pub enum InputError {
  #[cfg(feature = "read_image_file")]
  #[error("图像文件输入错误: {0}")]
  ImageFileInputError(#[from] ImageFileInputError),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("输入中没有帧")]
  NoFrame,
}

/// 按 URI 方案打开输入并取第一帧
pub fn read_frame(url: &url::Url) -> Result<Frame, InputError> {
  #[cfg(feature = "read_image_file")]
  {
    use crate::{FromUrl, FromUrlWithScheme};

    if url.scheme() == ImageFileInput::SCHEME {
      return ImageFileInput::from_url(url)?.next().ok_or(InputError::NoFrame);
    }
  }
  Err(InputError::SchemeMismatch(url.scheme().to_string()))
}
