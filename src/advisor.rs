// 该文件是 Goutu （构图顾问） 项目的一部分。
// src/advisor.rs - 姿态与构图推荐
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

use std::sync::Arc;
use std::time::Instant;

use image::RgbImage;
use thiserror::Error;
use tracing::{debug, info};

use crate::catalog::{Catalog, CatalogError};
use crate::frame::{Frame, FrameError};
use crate::hog::{FeatureExtractor, HogConfig, HogError};
use crate::layout::{LayoutError, LayoutSynthesizer};
use crate::model::{
  AssetStore, BOX_MODEL_ASSET, CompositionBox, CompositionPredictor, DETECTOR_MODEL_ASSET,
  DecodeError, DetectResult, DetectorConfig, EMBEDDING_MODEL_ASSET, EmbeddingClient, Forward,
  Model, ModelBackend, ModelError, Yolo,
};
use crate::pose::{MatcherConfig, PoseError, PoseMatcher, PoseRecommendation};

/// 在线程间共享的推理句柄
pub type SharedHandle = Arc<dyn Forward>;

#[derive(Error, Debug)]
pub enum AdvisorError {
  #[error("帧错误: {0}")]
  Frame(#[from] FrameError),
  #[error("数据表错误: {0}")]
  Catalog(#[from] CatalogError),
  #[error("特征提取错误: {0}")]
  Hog(#[from] HogError),
  #[error("姿态匹配错误: {0}")]
  Pose(#[from] PoseError),
  #[error("检测解码错误: {0}")]
  Decode(#[from] DecodeError),
  #[error("布局合成错误: {0}")]
  Layout(#[from] LayoutError),
  #[error("模型错误: {0}")]
  Model(#[from] ModelError),
  #[error("调色板只有 {colors} 种颜色, 无法覆盖 {classes} 个检测类别")]
  PaletteTooSmall { colors: usize, classes: usize },
}

/// 三个模型的推理句柄
#[derive(Clone)]
pub struct AdvisorModels {
  pub embedding: SharedHandle,
  pub detector: SharedHandle,
  pub composition: SharedHandle,
}

impl AdvisorModels {
  /// 从资源目录依次加载三个模型，任一失败即返回模型不可用
  pub fn load<B>(store: &AssetStore, backend: &B) -> Result<Self, ModelError>
  where
    B: ModelBackend,
    B::Handle: 'static,
  {
    let embedding: SharedHandle = Arc::new(store.load_model(backend, EMBEDDING_MODEL_ASSET)?);
    let detector: SharedHandle = Arc::new(store.load_model(backend, DETECTOR_MODEL_ASSET)?);
    let composition: SharedHandle = Arc::new(store.load_model(backend, BOX_MODEL_ASSET)?);
    Ok(Self {
      embedding,
      detector,
      composition,
    })
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AdvisorConfig {
  pub hog: HogConfig,
  pub matcher: MatcherConfig,
  pub detector: DetectorConfig,
}

/// 组合特征提取、姿态匹配、检测与构图预测
///
/// 所有组件在构造时注入，之后只读，可放入 `Arc` 在工作线程间共享。
pub struct Advisor {
  catalog: Arc<Catalog>,
  extractor: FeatureExtractor,
  matcher: PoseMatcher,
  embedding: EmbeddingClient<SharedHandle>,
  detector: Yolo<SharedHandle>,
  layout: LayoutSynthesizer,
  composition: CompositionPredictor<SharedHandle>,
}

impl Advisor {
  pub fn new(
    catalog: Arc<Catalog>,
    models: AdvisorModels,
    config: AdvisorConfig,
  ) -> Result<Self, AdvisorError> {
    let classes = config.detector.columns.saturating_sub(5);
    if !catalog.palette.covers(classes) {
      return Err(AdvisorError::PaletteTooSmall {
        colors: catalog.palette.len(),
        classes,
      });
    }

    let extractor = FeatureExtractor::new(config.hog)?;
    info!(
      "推荐器初始化完成, 聚类中心数: {}, HOG 长度: {}",
      catalog.centroids.len(),
      extractor.config().feature_len()
    );
    Ok(Self {
      catalog,
      extractor,
      matcher: PoseMatcher::new(config.matcher),
      embedding: EmbeddingClient::new(models.embedding),
      detector: Yolo::new(models.detector, config.detector),
      layout: LayoutSynthesizer::default(),
      composition: CompositionPredictor::new(models.composition),
    })
  }

  pub fn catalog(&self) -> &Arc<Catalog> {
    &self.catalog
  }

  /// 帧 -> HOG + 嵌入 -> 最近聚类 -> 姿态推荐
  pub fn recommend_pose(&self, frame: &Frame) -> Result<PoseRecommendation, AdvisorError> {
    let frame = frame.upright();
    frame.check()?;

    let start = Instant::now();
    let hog = self.extractor.extract(&frame)?;
    debug!("HOG 特征耗时: {:?}", start.elapsed());

    let start = Instant::now();
    let embedding = self.embedding.embed(&frame)?;
    debug!("嵌入推理耗时: {:?}", start.elapsed());

    let start = Instant::now();
    let recommendation = self.matcher.recommend(&hog, &embedding, &self.catalog)?;
    debug!(
      "姿态匹配耗时: {:?}, 推荐姿态: {}",
      start.elapsed(),
      recommendation.pose_id
    );
    Ok(recommendation)
  }

  pub fn detect(&self, frame: &Frame) -> Result<DetectResult, AdvisorError> {
    let start = Instant::now();
    let result = self.detector.infer(frame)?;
    debug!("检测耗时: {:?}, 检测框数: {}", start.elapsed(), result.items.len());
    Ok(result)
  }

  /// 帧 -> 检测 -> 布局图
  pub fn layout(&self, frame: &Frame) -> Result<RgbImage, AdvisorError> {
    let detections = self.detect(frame)?;
    Ok(self.layout.synthesize(&detections.items, &self.catalog.palette)?)
  }

  /// 帧 -> 检测 -> 布局图 -> 构图框
  pub fn recommend_composition(&self, frame: &Frame) -> Result<CompositionBox, AdvisorError> {
    let frame = frame.upright();
    frame.check()?;
    let layout = self.layout(&frame)?;

    let start = Instant::now();
    let result = self.composition.predict(&frame, &layout)?;
    debug!("构图预测耗时: {:?}", start.elapsed());
    Ok(result)
  }
}

#[cfg(test)]
pub(crate) mod tests {
  use super::*;
  use crate::catalog::{AssetIndex, Centroid, CentroidTable, Palette, PoseRank, PoseRankTable};
  use crate::model::Tensor;
  use image::Rgb;

  pub(crate) const EMB: usize = 3;
  pub(crate) const COLS: usize = 7;

  /// 返回固定输出的模型
  pub(crate) struct Fixed(pub Vec<f32>);

  impl Forward for Fixed {
    fn forward(&self, _: &[Tensor]) -> Result<Vec<Tensor>, ModelError> {
      Ok(vec![Tensor::new(vec![self.0.len()], self.0.clone())])
    }
  }

  pub(crate) struct Failing;

  impl Forward for Failing {
    fn forward(&self, _: &[Tensor]) -> Result<Vec<Tensor>, ModelError> {
      Err(ModelError::Forward("推理失败".to_string()))
    }
  }

  pub(crate) fn config() -> AdvisorConfig {
    AdvisorConfig {
      hog: HogConfig {
        image_resize: 32,
        ..HogConfig::default()
      },
      detector: DetectorConfig {
        input_size: 64,
        rows: 2,
        columns: COLS,
        ..DetectorConfig::default()
      },
      ..AdvisorConfig::default()
    }
  }

  pub(crate) fn catalog() -> Arc<Catalog> {
    let hog_len = config().hog.feature_len();
    let centroids = vec![
      Centroid::new(4, [vec![0.0; EMB], vec![0.0; hog_len]].concat(), EMB),
      Centroid::new(9, [vec![5.0; EMB], vec![0.0; hog_len]].concat(), EMB),
    ];
    let mut ranks = PoseRankTable::default();
    ranks.insert(4, PoseRank::new(vec![1, 0]));
    ranks.insert(9, PoseRank::new(vec![2]));
    Arc::new(
      Catalog::new(
        Palette::try_from(vec![[0, 0, 0], [255, 0, 0], [0, 255, 0]]).unwrap(),
        CentroidTable::from_centroids(centroids, EMB, hog_len).unwrap(),
        ranks,
        AssetIndex::parse("zero.png\none.png\n"),
      )
      .unwrap(),
    )
  }

  pub(crate) fn detections() -> Vec<f32> {
    vec![
      16.0, 16.0, 16.0, 16.0, 0.9, 0.1, 0.8, //
      48.0, 48.0, 8.0, 8.0, 0.1, 1.0, 0.0,
    ]
  }

  pub(crate) fn advisor(embedding: SharedHandle, composition: SharedHandle) -> Advisor {
    let models = AdvisorModels {
      embedding,
      detector: Arc::new(Fixed(detections())),
      composition,
    };
    Advisor::new(catalog(), models, config()).unwrap()
  }

  pub(crate) fn frame() -> Frame {
    Frame::from(RgbImage::from_pixel(64, 64, Rgb([90, 90, 90])))
  }

  #[test]
  fn pose_follows_nearest_embedding() {
    let a = advisor(Arc::new(Fixed(vec![4.9, 5.0, 5.1])), Arc::new(Failing));
    let rec = a.recommend_pose(&frame()).unwrap();
    assert_eq!(rec.pose_id, 9);
    assert_eq!(rec.poses.len(), 1);
    assert_eq!(rec.poses[0].pose_id, 2);
    assert_eq!(rec.poses[0].asset, None);
    assert_eq!(rec.poses[0].rank_index, 1);

    let a = advisor(Arc::new(Fixed(vec![0.0; EMB])), Arc::new(Failing));
    let rec = a.recommend_pose(&frame()).unwrap();
    assert_eq!(rec.pose_id, 4);
    assert_eq!(rec.poses[0].asset.as_deref(), Some("one.png"));
  }

  #[test]
  fn embedding_length_mismatch_is_reported() {
    let a = advisor(Arc::new(Fixed(vec![0.0; EMB + 1])), Arc::new(Failing));
    assert!(matches!(
      a.recommend_pose(&frame()),
      Err(AdvisorError::Pose(PoseError::ShapeMismatch { .. }))
    ));
  }

  #[test]
  fn layout_paints_detected_class() {
    let a = advisor(Arc::new(Failing), Arc::new(Failing));
    let layout = a.layout(&frame()).unwrap();
    // 帧与检测输入同为 64，框 [8, 8, 24, 24] * 0.75 = [6, 6, 18, 18]
    assert_eq!(layout.get_pixel(10, 10).0, [0, 255, 0]);
    assert_eq!(layout.get_pixel(18, 18).0, [0, 0, 0]);
  }

  #[test]
  fn composition_box_comes_from_box_model() {
    let a = advisor(
      Arc::new(Failing),
      Arc::new(Fixed(vec![0.5, 0.4, 0.3, 0.2])),
    );
    let b = a.recommend_composition(&frame()).unwrap();
    assert_eq!(b.center_x, 0.5);
    assert!((b.height - 0.2).abs() < 1e-6);
  }

  #[test]
  fn failing_model_is_reported() {
    let a = advisor(Arc::new(Failing), Arc::new(Failing));
    assert!(matches!(
      a.recommend_composition(&frame()),
      Err(AdvisorError::Model(ModelError::Forward(_)))
    ));
  }

  #[test]
  fn empty_frame_is_rejected() {
    let a = advisor(Arc::new(Failing), Arc::new(Failing));
    let empty = Frame::from(RgbImage::new(0, 0));
    assert!(matches!(a.recommend_pose(&empty), Err(AdvisorError::Frame(_))));
  }

  #[test]
  fn palette_must_cover_detector_classes() {
    let models = AdvisorModels {
      embedding: Arc::new(Failing),
      detector: Arc::new(Failing),
      composition: Arc::new(Failing),
    };
    let mut c = config();
    c.detector.columns = 85;
    assert!(matches!(
      Advisor::new(catalog(), models, c),
      Err(AdvisorError::PaletteTooSmall {
        colors: 3,
        classes: 80
      })
    ));
  }
}
