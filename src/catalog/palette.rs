// 该文件是 Goutu （构图顾问） 项目的一部分。
// src/catalog/palette.rs - 布局调色板
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

use super::CatalogError;

/// 有序的 RGB 颜色表，0 号为背景色，i + 1 号对应第 i 类目标
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
  colors: Box<[[u8; 3]]>,
}

impl Palette {
  /// 解析形如 `[[0, 0, 0], [255, 0, 0], ...]` 的嵌套数组文本
  pub fn parse(text: &str) -> Result<Self, CatalogError> {
    let colors: Vec<[u8; 3]> =
      serde_json::from_str(text).map_err(|e| CatalogError::Palette(e.to_string()))?;
    Self::try_from(colors)
  }

  pub fn len(&self) -> usize {
    self.colors.len()
  }

  pub fn is_empty(&self) -> bool {
    self.colors.is_empty()
  }

  pub fn get(&self, index: usize) -> Option<[u8; 3]> {
    self.colors.get(index).copied()
  }

  pub fn background(&self) -> [u8; 3] {
    self.colors[0]
  }

  /// 调色板能否覆盖 `classes` 个检测类别（外加背景）
  pub fn covers(&self, classes: usize) -> bool {
    self.colors.len() > classes
  }
}

impl TryFrom<Vec<[u8; 3]>> for Palette {
  type Error = CatalogError;

  fn try_from(colors: Vec<[u8; 3]>) -> Result<Self, Self::Error> {
    if colors.is_empty() {
      return Err(CatalogError::Palette("调色板为空".to_string()));
    }
    Ok(Self {
      colors: colors.into_boxed_slice(),
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parse_nested_array_with_spaces() {
    let palette = Palette::parse("[[0, 0, 0],\n [255, 10, 3], [1,2,3]]").unwrap();
    assert_eq!(palette.len(), 3);
    assert_eq!(palette.background(), [0, 0, 0]);
    assert_eq!(palette.get(1), Some([255, 10, 3]));
    assert!(palette.covers(2));
    assert!(!palette.covers(3));
  }

  #[test]
  fn short_triple_fails() {
    assert!(matches!(
      Palette::parse("[[0, 0, 0], [1, 2]]"),
      Err(CatalogError::Palette(_))
    ));
  }

  #[test]
  fn out_of_range_component_fails() {
    assert!(Palette::parse("[[0, 0, 256]]").is_err());
  }

  #[test]
  fn empty_palette_fails() {
    assert!(Palette::parse("[]").is_err());
  }
}
