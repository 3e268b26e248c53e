// 该文件是 Goutu （构图顾问） 项目的一部分。
// src/model/asset.rs - 模型资源加载
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

use tracing::{debug, error, info};

use super::{Forward, ModelError};

pub const EMBEDDING_MODEL_ASSET: &str = "model_resnet.ptl";
pub const DETECTOR_MODEL_ASSET: &str = "model_yolov5s.ptl";
pub const BOX_MODEL_ASSET: &str = "model_bbprediction_dqlite.ptl";

/// 推理后端：从可写目录中的模型文件创建推理句柄
pub trait ModelBackend {
  type Handle: Forward;

  fn load(&self, path: &Path) -> Result<Self::Handle, ModelError>;
}

/// 随程序打包的只读资源目录与可写的缓存目录
#[derive(Debug, Clone)]
pub struct AssetStore {
  bundle_dir: PathBuf,
  writable_dir: PathBuf,
}

impl AssetStore {
  pub fn new(bundle_dir: impl Into<PathBuf>, writable_dir: impl Into<PathBuf>) -> Self {
    Self {
      bundle_dir: bundle_dir.into(),
      writable_dir: writable_dir.into(),
    }
  }

  /// 首次使用时把打包资源复制到可写目录；已存在且非空时直接复用
  pub fn materialize(&self, asset: &str) -> Result<PathBuf, ModelError> {
    let target = self.writable_dir.join(asset);
    if let Ok(meta) = std::fs::metadata(&target)
      && meta.len() > 0
    {
      debug!("复用已复制的模型文件: {}", target.display());
      return Ok(target);
    }

    let source = self.bundle_dir.join(asset);
    std::fs::create_dir_all(&self.writable_dir).map_err(|e| ModelError::unavailable(asset, e))?;
    let copied = std::fs::copy(&source, &target).map_err(|e| {
      error!("复制模型文件失败: {} -> {}: {}", source.display(), target.display(), e);
      ModelError::unavailable(asset, e)
    })?;
    debug!(
      "模型文件已复制: {} ({:.2} MB)",
      target.display(),
      copied as f64 / (1024.0 * 1024.0)
    );
    Ok(target)
  }

  pub fn load_model<B: ModelBackend>(
    &self,
    backend: &B,
    asset: &str,
  ) -> Result<B::Handle, ModelError> {
    let path = self.materialize(asset)?;
    info!("加载模型文件: {}", path.display());
    let handle = backend.load(&path).map_err(|e| match e {
      ModelError::Unavailable { .. } => e,
      other => ModelError::unavailable(asset, other),
    })?;
    info!("模型加载完成: {}", asset);
    Ok(handle)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::Tensor;
  use std::sync::atomic::{AtomicUsize, Ordering};

  struct Echo;

  impl Forward for Echo {
    fn forward(&self, inputs: &[Tensor]) -> Result<Vec<Tensor>, ModelError> {
      Ok(inputs.to_vec())
    }
  }

  #[derive(Default)]
  struct CountingBackend {
    loads: AtomicUsize,
  }

  impl ModelBackend for CountingBackend {
    type Handle = Echo;

    fn load(&self, path: &Path) -> Result<Echo, ModelError> {
      self.loads.fetch_add(1, Ordering::SeqCst);
      let bytes = std::fs::read(path).map_err(|e| ModelError::Forward(e.to_string()))?;
      if bytes.starts_with(b"MODEL") {
        Ok(Echo)
      } else {
        Err(ModelError::Forward("损坏的模型文件".to_string()))
      }
    }
  }

  #[test]
  fn asset_is_copied_once() {
    let bundle = tempfile::tempdir().unwrap();
    let writable = tempfile::tempdir().unwrap();
    std::fs::write(bundle.path().join("m.ptl"), b"MODEL-1").unwrap();

    let store = AssetStore::new(bundle.path(), writable.path());
    let first = store.materialize("m.ptl").unwrap();
    assert_eq!(std::fs::read(&first).unwrap(), b"MODEL-1");

    // 打包资源更新后仍复用已复制的文件
    std::fs::write(bundle.path().join("m.ptl"), b"MODEL-2").unwrap();
    let second = store.materialize("m.ptl").unwrap();
    assert_eq!(first, second);
    assert_eq!(std::fs::read(&second).unwrap(), b"MODEL-1");
  }

  #[test]
  fn empty_copy_is_refreshed() {
    let bundle = tempfile::tempdir().unwrap();
    let writable = tempfile::tempdir().unwrap();
    std::fs::write(bundle.path().join("m.ptl"), b"MODEL").unwrap();
    std::fs::write(writable.path().join("m.ptl"), b"").unwrap();

    let store = AssetStore::new(bundle.path(), writable.path());
    let path = store.materialize("m.ptl").unwrap();
    assert_eq!(std::fs::read(path).unwrap(), b"MODEL");
  }

  #[test]
  fn missing_asset_is_unavailable() {
    let bundle = tempfile::tempdir().unwrap();
    let writable = tempfile::tempdir().unwrap();
    let store = AssetStore::new(bundle.path(), writable.path());
    let backend = CountingBackend::default();
    assert!(matches!(
      store.load_model(&backend, "missing.ptl"),
      Err(ModelError::Unavailable { .. })
    ));
    assert_eq!(backend.loads.load(Ordering::SeqCst), 0);
  }

  #[test]
  fn corrupt_asset_is_unavailable() {
    let bundle = tempfile::tempdir().unwrap();
    let writable = tempfile::tempdir().unwrap();
    std::fs::write(bundle.path().join("bad.ptl"), b"garbage").unwrap();
    let store = AssetStore::new(bundle.path(), writable.path());
    let err = store
      .load_model(&CountingBackend::default(), "bad.ptl")
      .err()
      .unwrap();
    assert!(matches!(err, ModelError::Unavailable { ref asset, .. } if asset == "bad.ptl"));
  }
}
