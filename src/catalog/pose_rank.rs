// 该文件是 Goutu （构图顾问） 项目的一部分。
// src/catalog/pose_rank.rs - 聚类对应的姿态排序表
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

use std::collections::BTreeMap;

use super::CatalogError;

const POSE_RANK_HEADER: &str = "pose_ids";

/// 某个聚类下按推荐顺序排列的关键点/姿态编号
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoseRank {
  keypoints: Box<[usize]>,
}

impl PoseRank {
  pub fn new(keypoints: Vec<usize>) -> Self {
    Self {
      keypoints: keypoints.into_boxed_slice(),
    }
  }

  pub fn keypoints(&self) -> &[usize] {
    &self.keypoints
  }
}

#[derive(Debug, Clone, Default)]
pub struct PoseRankTable {
  ranks: BTreeMap<usize, PoseRank>,
}

fn malformed(line: usize, reason: String) -> CatalogError {
  CatalogError::Malformed {
    table: "pose_ranks",
    line,
    reason,
  }
}

impl PoseRankTable {
  /// 解析 `cluster_id,"[i0, i1, ...]"` 形式的 CSV 文本，第二列为 `pose_ids` 的表头行被跳过
  pub fn parse(text: &str) -> Result<Self, CatalogError> {
    let mut ranks = BTreeMap::new();

    for (index, raw) in text.lines().enumerate() {
      let line = index + 1;
      let raw = raw.trim();
      if raw.is_empty() {
        continue;
      }

      let (id, rest) = raw
        .split_once(',')
        .ok_or_else(|| malformed(line, "缺少 pose_ids 列".to_string()))?;
      let rest = rest.trim();

      // 带引号的字段内部可以包含逗号
      let field = match rest.strip_prefix('"') {
        Some(quoted) => quoted
          .split_once('"')
          .map(|(inner, _)| inner)
          .ok_or_else(|| malformed(line, "引号未闭合".to_string()))?,
        None => rest,
      };

      if field == POSE_RANK_HEADER {
        continue;
      }

      let id = id
        .trim()
        .parse::<usize>()
        .map_err(|_| malformed(line, format!("无法解析聚类编号 '{}'", id.trim())))?;

      let values: Vec<f64> = serde_json::from_str(field.trim())
        .map_err(|e| malformed(line, format!("无法解析姿态列表 '{}': {}", field, e)))?;

      let mut keypoints = Vec::with_capacity(values.len());
      for value in values {
        if value < 0.0 {
          return Err(malformed(line, format!("姿态编号无效 '{}'", value)));
        }
        keypoints.push(value as usize);
      }

      if ranks.insert(id, PoseRank::new(keypoints)).is_some() {
        return Err(malformed(line, format!("重复的聚类编号 {}", id)));
      }
    }

    Ok(Self { ranks })
  }

  pub fn get(&self, cluster: usize) -> Option<&PoseRank> {
    self.ranks.get(&cluster)
  }

  pub fn insert(&mut self, cluster: usize, rank: PoseRank) {
    self.ranks.insert(cluster, rank);
  }

  pub fn len(&self) -> usize {
    self.ranks.len()
  }

  pub fn is_empty(&self) -> bool {
    self.ranks.is_empty()
  }
}
