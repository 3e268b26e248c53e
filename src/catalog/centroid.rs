// 该文件是 Goutu （构图顾问） 项目的一部分。
// src/catalog/centroid.rs - 姿态聚类中心表
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

const CENTROID_HEADER_MARK: &str = "label";

/// 一个聚类中心：前 embedding_dim 个值是嵌入向量，其余是 HOG 向量
#[derive(Debug, Clone, PartialEq)]
pub struct Centroid {
  pub id: usize,
  vector: Box<[f64]>,
  embedding_dim: usize,
}

impl Centroid {
  pub fn new(id: usize, vector: Vec<f64>, embedding_dim: usize) -> Self {
    let embedding_dim = embedding_dim.min(vector.len());
    Self {
      id,
      vector: vector.into_boxed_slice(),
      embedding_dim,
    }
  }

  pub fn len(&self) -> usize {
    self.vector.len()
  }

  pub fn is_empty(&self) -> bool {
    self.vector.is_empty()
  }

  pub fn embedding(&self) -> &[f64] {
    &self.vector[..self.embedding_dim]
  }

  pub fn hog(&self) -> &[f64] {
    &self.vector[self.embedding_dim..]
  }
}

/// 按文件顺序排列的聚类中心
#[derive(Debug, Clone)]
pub struct CentroidTable {
  centroids: Box<[Centroid]>,
}

fn malformed(line: usize, reason: String) -> CatalogError {
  CatalogError::Malformed {
    table: "centroids",
    line,
    reason,
  }
}

impl CentroidTable {
  /// 解析 `label,[v0,v1,...,vn]` 形式的 CSV 文本，包含 `label` 的表头行被跳过
  pub fn parse(text: &str, embedding_dim: usize, hog_dim: usize) -> Result<Self, CatalogError> {
    let expected = embedding_dim + hog_dim;
    let mut centroids = Vec::new();

    for (index, raw) in text.lines().enumerate() {
      let line = index + 1;
      let raw = raw.trim();
      if raw.is_empty() || raw.contains(CENTROID_HEADER_MARK) {
        continue;
      }

      let (id, rest) = raw
        .split_once(',')
        .ok_or_else(|| malformed(line, "缺少数值列".to_string()))?;

      let id = id
        .trim()
        .parse::<usize>()
        .map_err(|_| malformed(line, format!("无法解析标签 '{}'", id.trim())))?;

      let vector: Vec<f64> = serde_json::from_str(rest.trim())
        .map_err(|e| malformed(line, format!("无法解析数值列表: {}", e)))?;

      if vector.len() != expected {
        return Err(malformed(
          line,
          format!("期望 {} 个数值, 实际 {} 个", expected, vector.len()),
        ));
      }

      centroids.push(Centroid::new(id, vector, embedding_dim));
    }

    Ok(Self {
      centroids: centroids.into_boxed_slice(),
    })
  }

  pub fn from_centroids(
    centroids: Vec<Centroid>,
    embedding_dim: usize,
    hog_dim: usize,
  ) -> Result<Self, CatalogError> {
    for (index, centroid) in centroids.iter().enumerate() {
      if centroid.len() != embedding_dim + hog_dim
        || centroid.embedding().len() != embedding_dim
      {
        return Err(malformed(
          index + 1,
          format!(
            "期望 {} 个数值, 实际 {} 个",
            embedding_dim + hog_dim,
            centroid.len()
          ),
        ));
      }
    }
    Ok(Self {
      centroids: centroids.into_boxed_slice(),
    })
  }

  pub fn iter(&self) -> std::slice::Iter<'_, Centroid> {
    self.centroids.iter()
  }

  pub fn get(&self, index: usize) -> Option<&Centroid> {
    self.centroids.get(index)
  }

  pub fn len(&self) -> usize {
    self.centroids.len()
  }

  pub fn is_empty(&self) -> bool {
    self.centroids.is_empty()
  }
}
