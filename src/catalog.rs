// 该文件是 Goutu （构图顾问） 项目的一部分。
// src/catalog.rs - 只读数据表
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

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme};

mod asset_index;
mod centroid;
mod palette;
mod pose_rank;

pub use self::asset_index::AssetIndex;
pub use self::centroid::{Centroid, CentroidTable};
pub use self::palette::Palette;
pub use self::pose_rank::{PoseRank, PoseRankTable};

pub const PALETTE_FILE: &str = "color_palette.json";
pub const CENTROID_FILE: &str = "centroids.csv";
pub const POSE_RANK_FILE: &str = "pose_ranks.csv";
pub const ASSET_INDEX_FILE: &str = "keypoint_assets.txt";

/// 嵌入模型输出长度
pub const EMBEDDING_DIM: usize = 2048;

#[derive(Error, Debug)]
pub enum CatalogError {
  #[error("读取数据表 {0} 失败: {1}")]
  Io(PathBuf, std::io::Error),
  #[error("调色板格式错误: {0}")]
  Palette(String),
  #[error("数据表 {table} 第 {line} 行格式错误: {reason}")]
  Malformed {
    table: &'static str,
    line: usize,
    reason: String,
  },
  #[error("聚类 {0} 没有对应的姿态排序")]
  MissingPoseRank(usize),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

/// 在启动时一次性加载、之后只读共享的数据表集合
#[derive(Debug, Clone)]
pub struct Catalog {
  pub palette: Palette,
  pub centroids: CentroidTable,
  pub pose_ranks: PoseRankTable,
  pub assets: AssetIndex,
}

fn read_table(dir: &Path, name: &str) -> Result<String, CatalogError> {
  let path = dir.join(name);
  std::fs::read_to_string(&path).map_err(|e| CatalogError::Io(path, e))
}

impl Catalog {
  /// 组装并校验：每个聚类中心都必须有对应的姿态排序
  pub fn new(
    palette: Palette,
    centroids: CentroidTable,
    pose_ranks: PoseRankTable,
    assets: AssetIndex,
  ) -> Result<Self, CatalogError> {
    if let Some(missing) = centroids
      .iter()
      .find(|c| pose_ranks.get(c.id).is_none())
    {
      return Err(CatalogError::MissingPoseRank(missing.id));
    }
    Ok(Self {
      palette,
      centroids,
      pose_ranks,
      assets,
    })
  }

  /// 从目录加载全部数据表，任何一张表出错则整体失败
  pub fn load(dir: &Path, embedding_dim: usize, hog_dim: usize) -> Result<Self, CatalogError> {
    info!("加载数据表目录: {}", dir.display());

    let palette = Palette::parse(&read_table(dir, PALETTE_FILE)?)?;
    debug!("调色板颜色数: {}", palette.len());

    let centroids = CentroidTable::parse(&read_table(dir, CENTROID_FILE)?, embedding_dim, hog_dim)?;
    debug!("聚类中心数: {}", centroids.len());

    let pose_ranks = PoseRankTable::parse(&read_table(dir, POSE_RANK_FILE)?)?;
    debug!("姿态排序条目数: {}", pose_ranks.len());

    let assets = if dir.join(ASSET_INDEX_FILE).exists() {
      AssetIndex::parse(&read_table(dir, ASSET_INDEX_FILE)?)
    } else {
      AssetIndex::default()
    };
    debug!("关键点图片资源数: {}", assets.len());

    let catalog = Self::new(palette, centroids, pose_ranks, assets)?;
    info!("数据表加载完成");
    Ok(catalog)
  }
}

/// `catalog:///path/to/dir` 形式的数据表目录地址
#[derive(Debug, Clone)]
pub struct CatalogSource {
  dir: PathBuf,
}

impl FromUrlWithScheme for CatalogSource {
  const SCHEME: &'static str = "catalog";
}

impl FromUrl for CatalogSource {
  type Error = CatalogError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(CatalogError::SchemeMismatch(format!(
        "期望 '{}', 实际 '{}'",
        Self::SCHEME,
        url.scheme()
      )));
    }
    Ok(Self {
      dir: PathBuf::from(url.path()),
    })
  }
}

impl CatalogSource {
  pub fn load(&self, embedding_dim: usize, hog_dim: usize) -> Result<Catalog, CatalogError> {
    Catalog::load(&self.dir, embedding_dim, hog_dim)
  }

  /// 只加载调色板
  pub fn load_palette(&self) -> Result<Palette, CatalogError> {
    Palette::parse(&read_table(&self.dir, PALETTE_FILE)?)
  }
}
