// 该文件是 Goutu （构图顾问） 项目的一部分。
// src/catalog/asset_index.rs - 关键点图片资源索引
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

/// 第 i 行即第 i 号关键点对应的图片资源
#[derive(Debug, Clone, Default)]
pub struct AssetIndex {
  assets: Box<[String]>,
}

impl AssetIndex {
  pub fn parse(text: &str) -> Self {
    let assets: Vec<String> = text.lines().map(|l| l.trim().to_string()).collect();
    Self {
      assets: assets.into_boxed_slice(),
    }
  }

  /// 没有登记或登记为空行的关键点返回 None
  pub fn get(&self, keypoint: usize) -> Option<&str> {
    self
      .assets
      .get(keypoint)
      .map(String::as_str)
      .filter(|s| !s.is_empty())
  }

  pub fn len(&self) -> usize {
    self.assets.len()
  }

  pub fn is_empty(&self) -> bool {
    self.assets.is_empty()
  }
}
