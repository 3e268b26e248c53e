// 该文件是 Goutu （构图顾问） 项目的一部分。
// src/main.rs - 命令行入口
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

mod args;

use std::path::Path;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::{info, warn};

use goutu::FromUrl;
use goutu::catalog::{CatalogSource, EMBEDDING_DIM};
use goutu::hog::{FeatureExtractor, HogConfig};
use goutu::input::read_frame;
use goutu::layout::LayoutSynthesizer;
use goutu::model::DetectorConfig;
use goutu::output::SaveImageFileOutput;
use goutu::pose::PoseMatcher;

use args::{Args, Command};

fn read_f32_dump(path: &Path) -> Result<Vec<f32>> {
  let bytes =
    std::fs::read(path).with_context(|| format!("读取检测输出失败: {}", path.display()))?;
  if bytes.len() % 4 != 0 {
    bail!("检测输出长度 {} 不是 4 的整数倍", bytes.len());
  }
  Ok(
    bytes
      .chunks_exact(4)
      .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
      .collect(),
  )
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  match args.command {
    Command::Features { input, hog } => {
      let frame = read_frame(&input).context("读取输入帧失败")?;
      let extractor = FeatureExtractor::new(HogConfig::from(&hog))?;
      let features = extractor.extract(&frame.upright())?;
      info!("HOG 特征长度: {}", features.len());
      println!("{}", serde_json::to_string(&features)?);
    }

    Command::Pose {
      input,
      embedding,
      catalog,
      hog_weight,
      hog,
    } => {
      let text = std::fs::read_to_string(&embedding)
        .with_context(|| format!("读取嵌入向量失败: {}", embedding.display()))?;
      let embedding: Vec<f64> = serde_json::from_str(&text).context("嵌入向量不是数字数组")?;
      if embedding.len() != EMBEDDING_DIM {
        warn!("嵌入向量长度 {} 与默认长度 {} 不同", embedding.len(), EMBEDDING_DIM);
      }

      let config = HogConfig::from(&hog);
      let extractor = FeatureExtractor::new(config)?;
      let catalog = CatalogSource::from_url(&catalog)?.load(embedding.len(), config.feature_len())?;

      let frame = read_frame(&input).context("读取输入帧失败")?;
      let features = extractor.extract(&frame.upright())?;
      let matcher = PoseMatcher::new(hog.matcher(hog_weight));
      let recommendation = matcher.recommend(&features, &embedding, &catalog)?;
      info!("推荐姿态: {}", recommendation.pose_id);

      let poses: Vec<_> = recommendation
        .poses
        .iter()
        .map(|p| {
          serde_json::json!({
            "pose_id": p.pose_id,
            "asset": p.asset,
            "rank_index": p.rank_index,
          })
        })
        .collect();
      let output = serde_json::json!({
        "pose_id": recommendation.pose_id,
        "poses": poses,
      });
      println!("{}", serde_json::to_string_pretty(&output)?);
    }

    Command::Layout {
      detections,
      catalog,
      output,
      frame_width,
      frame_height,
      detector,
    } => {
      let config = DetectorConfig::from(&detector);
      let raw = read_f32_dump(&detections)?;
      let scale = config.scale_for(frame_width, frame_height);
      let items = config.decode(&raw, config.rows, config.columns, scale)?;
      info!("检测框数: {}", items.len());

      let palette = CatalogSource::from_url(&catalog)?.load_palette()?;
      let raster = LayoutSynthesizer::default().synthesize(&items, &palette)?;
      let output = SaveImageFileOutput::from_url(&output)?;
      output.save_image(&raster)?;
      info!("布局图已保存: {}", output.path().display());
    }
  }

  Ok(())
}
