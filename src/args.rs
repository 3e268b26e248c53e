// 该文件是 Goutu （构图顾问） 项目的一部分。
// src/args.rs - 命令行参数
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

use clap::{Args as ClapArgs, Parser, Subcommand};
use url::Url;

use goutu::hog::{
  HOG_CELL_SIZE, HOG_IMAGE_RESIZE, HOG_MAGNITUDE_THRESHOLD, HOG_N_BINS, HogConfig,
};
use goutu::model::{
  DetectorConfig, YOLO_INPUT_SIZE, YOLO_NMS_LIMIT, YOLO_NMS_THRESH, YOLO_OBJECT_THRESH,
  YOLO_OUTPUT_COLUMNS, YOLO_OUTPUT_ROWS,
};
use goutu::pose::{MatcherConfig, POSE_HOG_WEIGHT};

/// Goutu 构图顾问
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  #[command(subcommand)]
  pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
  /// 提取一帧的 HOG 特征并以 JSON 输出
  Features {
    /// 输入帧，例如 image:///path/to/frame.jpg?rotation=90
    #[arg(long, value_name = "URL")]
    input: Url,

    #[command(flatten)]
    hog: HogArgs,
  },

  /// 用帧与嵌入向量在数据表中匹配推荐姿态
  Pose {
    #[arg(long, value_name = "URL")]
    input: Url,

    /// 嵌入向量 JSON 文件（数字数组）
    #[arg(long, value_name = "FILE")]
    embedding: std::path::PathBuf,

    /// 数据表目录，例如 catalog:///opt/goutu/data
    #[arg(long, value_name = "URL")]
    catalog: Url,

    /// HOG 距离的权重
    #[arg(long, default_value_t = POSE_HOG_WEIGHT)]
    hog_weight: f64,

    #[command(flatten)]
    hog: HogArgs,
  },

  /// 解码检测模型的原始输出（小端 f32）并保存布局图
  Layout {
    /// 原始检测输出文件
    #[arg(long, value_name = "FILE")]
    detections: std::path::PathBuf,

    #[arg(long, value_name = "URL")]
    catalog: Url,

    /// 布局图输出，例如 image:///tmp/layout.png
    #[arg(long, value_name = "URL")]
    output: Url,

    /// 原始帧宽度，用于换算检测框
    #[arg(long, default_value_t = YOLO_INPUT_SIZE)]
    frame_width: u32,

    /// 原始帧高度，用于换算检测框
    #[arg(long, default_value_t = YOLO_INPUT_SIZE)]
    frame_height: u32,

    #[command(flatten)]
    detector: DetectorArgs,
  },
}

#[derive(ClapArgs, Debug, Clone)]
pub struct HogArgs {
  /// 缩放后的正方形边长
  #[arg(long, default_value_t = HOG_IMAGE_RESIZE)]
  pub resize: u32,

  /// cell 边长（像素）
  #[arg(long, default_value_t = HOG_CELL_SIZE)]
  pub cell: u32,

  /// block 宽度（cell 数）
  #[arg(long, default_value_t = 1)]
  pub block_width: u32,

  /// block 高度（cell 数）
  #[arg(long, default_value_t = 1)]
  pub block_height: u32,

  /// 幅值二值化阈值，实际阈值为 均值 * threshold / 10
  #[arg(long, default_value_t = HOG_MAGNITUDE_THRESHOLD)]
  pub threshold: f64,

  #[arg(long, default_value_t = HOG_N_BINS)]
  pub bins: usize,
}

impl From<&HogArgs> for HogConfig {
  fn from(args: &HogArgs) -> Self {
    HogConfig {
      image_resize: args.resize,
      cell_size: args.cell,
      block_size: (args.block_width, args.block_height),
      magnitude_threshold: args.threshold,
      n_bins: args.bins,
    }
  }
}

impl HogArgs {
  pub fn matcher(&self, hog_weight: f64) -> MatcherConfig {
    MatcherConfig {
      hog_weight,
      n_bins: self.bins,
    }
  }
}

#[derive(ClapArgs, Debug, Clone)]
pub struct DetectorArgs {
  #[arg(long, default_value_t = YOLO_OUTPUT_ROWS)]
  pub rows: usize,

  #[arg(long, default_value_t = YOLO_OUTPUT_COLUMNS)]
  pub columns: usize,

  /// 置信度阈值 (0.0 - 1.0)
  #[arg(long, default_value_t = YOLO_OBJECT_THRESH, value_name = "THRESHOLD")]
  pub confidence: f32,

  /// NMS IOU 阈值 (0.0 - 1.0)
  #[arg(long, default_value_t = YOLO_NMS_THRESH, value_name = "THRESHOLD")]
  pub nms_threshold: f32,

  /// 最多保留的检测框数
  #[arg(long, default_value_t = YOLO_NMS_LIMIT)]
  pub nms_limit: usize,
}

impl From<&DetectorArgs> for DetectorConfig {
  fn from(args: &DetectorArgs) -> Self {
    DetectorConfig {
      rows: args.rows,
      columns: args.columns,
      confidence_threshold: args.confidence,
      iou_threshold: args.nms_threshold,
      nms_limit: args.nms_limit,
      ..DetectorConfig::default()
    }
  }
}
