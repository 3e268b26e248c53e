// 该文件是 Goutu （构图顾问） 项目的一部分。
// src/pose/distance.rs - 嵌入与 HOG 混合距离
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

use super::PoseError;

/// 判定 cell 为空的容差
const EMPTY_CELL_TOLERANCE: f64 = 1e-6;
/// 每行追加的空 cell 标记维度
const EMPTY_MARK_DIMS: usize = 2;

/// 逐元素 sqrt(|q^2 - c^2|) 的平均值
pub fn embedding_distance(query: &[f64], centroid: &[f64]) -> Result<f64, PoseError> {
  if query.len() != centroid.len() {
    return Err(PoseError::ShapeMismatch {
      what: "embedding",
      expected: centroid.len(),
      actual: query.len(),
    });
  }
  if query.is_empty() {
    return Ok(0.0);
  }
  let sum: f64 = query
    .iter()
    .zip(centroid)
    .map(|(q, c)| (q.powi(2) - c.powi(2)).abs().sqrt())
    .sum();
  Ok(sum / query.len() as f64)
}

/// 行优先的 rows x cols 矩阵
#[derive(Debug, Clone, PartialEq)]
pub struct CellMatrix {
  rows: usize,
  cols: usize,
  data: Vec<f64>,
}

impl CellMatrix {
  pub fn reshape(values: &[f64], rows: usize, cols: usize) -> Result<Self, PoseError> {
    if values.len() != rows * cols {
      return Err(PoseError::ShapeMismatch {
        what: "hog",
        expected: rows * cols,
        actual: values.len(),
      });
    }
    Ok(Self {
      rows,
      cols,
      data: values.to_vec(),
    })
  }

  pub fn rows(&self) -> usize {
    self.rows
  }

  pub fn cols(&self) -> usize {
    self.cols
  }

  pub fn row(&self, r: usize) -> &[f64] {
    &self.data[r * self.cols..(r + 1) * self.cols]
  }

  /// 每行追加两维：全零行追加 (1, 1)，否则追加 (0, 0)
  pub fn with_empty_mark(&self) -> Self {
    let cols = self.cols + EMPTY_MARK_DIMS;
    let mut data = Vec::with_capacity(self.rows * cols);
    for r in 0..self.rows {
      let row = self.row(r);
      let empty = row.iter().all(|v| v.abs() < EMPTY_CELL_TOLERANCE);
      let mark = if empty { 1.0 } else { 0.0 };
      data.extend_from_slice(row);
      data.extend(std::iter::repeat_n(mark, EMPTY_MARK_DIMS));
    }
    Self {
      rows: self.rows,
      cols,
      data,
    }
  }
}

/// sqrt(Σ(a - b)^2) / (rows * cols)
pub fn calculate_distance(a: &CellMatrix, b: &CellMatrix) -> Result<f64, PoseError> {
  if a.rows != b.rows || a.cols != b.cols {
    return Err(PoseError::ShapeMismatch {
      what: "cell matrix",
      expected: a.rows * a.cols,
      actual: b.rows * b.cols,
    });
  }
  if a.rows == 0 || a.cols == 0 {
    return Err(PoseError::ShapeMismatch {
      what: "cell matrix",
      expected: 1,
      actual: 0,
    });
  }
  let sum: f64 = a
    .data
    .iter()
    .zip(&b.data)
    .map(|(x, y)| {
      let d = x - y;
      d * d
    })
    .sum();
  Ok(sum.sqrt() / (a.rows * a.cols) as f64)
}

/// 两个 HOG 向量按 (rows, n_bins) 切分并加上空 cell 标记后的距离
pub fn hog_distance(a: &[f64], b: &[f64], rows: usize, n_bins: usize) -> Result<f64, PoseError> {
  let a = CellMatrix::reshape(a, rows, n_bins)?.with_empty_mark();
  let b = CellMatrix::reshape(b, rows, n_bins)?.with_empty_mark();
  calculate_distance(&a, &b)
}
