// 该文件是 Goutu （构图顾问） 项目的一部分。
// src/pose.rs - 姿态匹配
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
use tracing::debug;

use crate::catalog::{Catalog, Centroid, PoseRank};

mod distance;
pub use self::distance::{CellMatrix, calculate_distance, embedding_distance, hog_distance};

/// HOG 距离的权重
pub const POSE_HOG_WEIGHT: f64 = 50.0;

#[derive(Error, Debug)]
pub enum PoseError {
  #[error("聚类中心表为空")]
  EmptyCatalog,
  #[error("{what} 形状不匹配: 期望 {expected}, 实际 {actual}")]
  ShapeMismatch {
    what: &'static str,
    expected: usize,
    actual: usize,
  },
  #[error("聚类 {0} 没有对应的姿态排序")]
  MissingPoseRank(usize),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatcherConfig {
  pub hog_weight: f64,
  /// HOG 向量切分的每行 bin 数
  pub n_bins: usize,
}

impl Default for MatcherConfig {
  fn default() -> Self {
    Self {
      hog_weight: POSE_HOG_WEIGHT,
      n_bins: crate::hog::HOG_N_BINS,
    }
  }
}

/// 推荐结果中的单个姿态
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoseData {
  /// 关键点/姿态编号
  pub pose_id: usize,
  /// 对应的图片资源，未登记时为 None
  pub asset: Option<String>,
  /// 匹配到的聚类在表中的序号
  pub rank_index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoseRecommendation {
  pub pose_id: usize,
  pub poses: Vec<PoseData>,
}

/// 最近聚类中心匹配器
#[derive(Debug, Clone, Default)]
pub struct PoseMatcher {
  config: MatcherConfig,
}

impl PoseMatcher {
  pub fn new(config: MatcherConfig) -> Self {
    Self { config }
  }

  /// weight * hog_distance + embedding_distance
  pub fn distance(
    &self,
    hog: &[f64],
    embedding: &[f64],
    centroid: &Centroid,
  ) -> Result<f64, PoseError> {
    let centroid_hog = centroid.hog();
    if hog.len() != centroid_hog.len() {
      return Err(PoseError::ShapeMismatch {
        what: "hog",
        expected: centroid_hog.len(),
        actual: hog.len(),
      });
    }
    let n_bins = self.config.n_bins.max(1);
    let rows = hog.len() / n_bins;
    let hog_term = hog_distance(hog, centroid_hog, rows, n_bins)?;
    let embedding_term = embedding_distance(embedding, centroid.embedding())?;
    Ok(self.config.hog_weight * hog_term + embedding_term)
  }

  /// 返回 (聚类序号, 聚类编号, 距离)，相同距离时保留较早的聚类
  pub fn nearest(
    &self,
    hog: &[f64],
    embedding: &[f64],
    catalog: &Catalog,
  ) -> Result<(usize, usize, f64), PoseError> {
    let mut best: Option<(usize, usize, f64)> = None;
    for (index, centroid) in catalog.centroids.iter().enumerate() {
      let d = self.distance(hog, embedding, centroid)?;
      let closer = match best {
        Some((_, _, best_d)) => d < best_d,
        None => true,
      };
      if closer {
        best = Some((index, centroid.id, d));
      }
    }
    best.ok_or(PoseError::EmptyCatalog)
  }

  /// 最近聚类的 (序号, 编号, 姿态排序)
  fn locate<'a>(
    &self,
    hog: &[f64],
    embedding: &[f64],
    catalog: &'a Catalog,
  ) -> Result<(usize, usize, &'a PoseRank), PoseError> {
    let (index, id, d) = self.nearest(hog, embedding, catalog)?;
    debug!("最近聚类: {} (序号 {}), 距离: {:.6}", id, index, d);
    let rank = catalog
      .pose_ranks
      .get(id)
      .ok_or(PoseError::MissingPoseRank(id))?;
    Ok((index, id, rank))
  }

  /// 返回最近聚类的编号及其姿态排序
  pub fn match_pose<'a>(
    &self,
    hog: &[f64],
    embedding: &[f64],
    catalog: &'a Catalog,
  ) -> Result<(usize, &'a PoseRank), PoseError> {
    let (_, id, rank) = self.locate(hog, embedding, catalog)?;
    Ok((id, rank))
  }

  /// 匹配并展开为带图片资源的推荐列表
  pub fn recommend(
    &self,
    hog: &[f64],
    embedding: &[f64],
    catalog: &Catalog,
  ) -> Result<PoseRecommendation, PoseError> {
    let (index, id, rank) = self.locate(hog, embedding, catalog)?;
    let poses = rank
      .keypoints()
      .iter()
      .map(|&k| PoseData {
        pose_id: k,
        asset: catalog.assets.get(k).map(str::to_string),
        rank_index: index,
      })
      .collect();
    Ok(PoseRecommendation { pose_id: id, poses })
  }
}
