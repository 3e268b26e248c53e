// 该文件是 Goutu （构图顾问） 项目的一部分。
// src/model/nms.rs - 非极大值抑制
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

use super::DetectItem;

fn area(bbox: &[i32; 4]) -> i64 {
  (bbox[2] as i64 - bbox[0] as i64) * (bbox[3] as i64 - bbox[1] as i64)
}

/// 交并比，任一框面积非正时为 0
pub fn iou(a: &[i32; 4], b: &[i32; 4]) -> f32 {
  let area_a = area(a);
  let area_b = area(b);
  if area_a <= 0 || area_b <= 0 {
    return 0.0;
  }

  let left = a[0].max(b[0]) as i64;
  let top = a[1].max(b[1]) as i64;
  let right = a[2].min(b[2]) as i64;
  let bottom = a[3].min(b[3]) as i64;
  let inter = (right - left).max(0) * (bottom - top).max(0);

  inter as f32 / (area_a + area_b - inter) as f32
}

/// 不区分类别的贪心抑制
///
/// 候选框按置信度升序稳定排序后依次扫描：仍有效的框被选中，
/// 然后其后所有与之 IOU 超过阈值的框失效。选中数达到 `limit` 时停止。
pub fn non_max_suppression(
  mut items: Vec<DetectItem>,
  iou_threshold: f32,
  limit: usize,
) -> Vec<DetectItem> {
  items.sort_by(|a, b| a.score.total_cmp(&b.score));

  let mut active = vec![true; items.len()];
  let mut selected = Vec::new();

  for i in 0..items.len() {
    if !active[i] {
      continue;
    }
    if selected.len() >= limit {
      break;
    }
    selected.push(items[i].clone());

    for j in (i + 1)..items.len() {
      if active[j] && iou(&items[i].bbox, &items[j].bbox) > iou_threshold {
        active[j] = false;
      }
    }
  }
  selected
}

#[cfg(test)]
mod tests {
  use super::*;

  fn item(score: f32, bbox: [i32; 4]) -> DetectItem {
    DetectItem {
      class_id: 0,
      score,
      bbox,
    }
  }

  #[test]
  fn iou_of_identical_box_is_one() {
    let b = [10, 10, 50, 40];
    assert_eq!(iou(&b, &b), 1.0);
  }

  #[test]
  fn iou_of_disjoint_boxes_is_zero() {
    assert_eq!(iou(&[0, 0, 10, 10], &[20, 20, 30, 30]), 0.0);
    // 仅边相接
    assert_eq!(iou(&[0, 0, 10, 10], &[10, 0, 20, 10]), 0.0);
  }

  #[test]
  fn degenerate_box_has_zero_iou() {
    assert_eq!(iou(&[5, 5, 5, 20], &[5, 5, 5, 20]), 0.0);
    assert_eq!(iou(&[10, 10, 0, 0], &[0, 0, 10, 10]), 0.0);
  }

  #[test]
  fn lower_confidence_box_survives_overlap() {
    let a = [0, 0, 30, 10];
    let b = [10, 0, 40, 10];
    // 交 20x10 = 200，并 300 + 300 - 200 = 400
    assert_eq!(iou(&a, &b), 0.5);

    let kept = non_max_suppression(vec![item(0.9, a), item(0.4, b)], 0.3, 15);
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].score, 0.4);
    assert_eq!(kept[0].bbox, b);
  }

  #[test]
  fn output_is_bounded() {
    let items = (0..40)
      .map(|i| item(i as f32 / 40.0, [i * 100, 0, i * 100 + 50, 50]))
      .collect();
    let kept = non_max_suppression(items, 0.3, 15);
    assert_eq!(kept.len(), 15);
    // 升序扫描，保留的是置信度最低的 15 个
    assert_eq!(kept[0].score, 0.0);
    assert!(kept.windows(2).all(|w| w[0].score <= w[1].score));
  }

  #[test]
  fn empty_input_gives_empty_output() {
    assert!(non_max_suppression(Vec::new(), 0.3, 15).is_empty());
  }

  #[test]
  fn suppression_ignores_class() {
    let mut a = item(0.5, [0, 0, 10, 10]);
    let mut b = item(0.6, [0, 0, 10, 10]);
    a.class_id = 1;
    b.class_id = 2;
    let kept = non_max_suppression(vec![a, b], 0.3, 15);
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].class_id, 1);
  }

  #[test]
  fn equal_scores_keep_input_order() {
    let kept = non_max_suppression(
      vec![item(0.5, [0, 0, 10, 10]), item(0.5, [1, 1, 11, 11])],
      0.3,
      15,
    );
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].bbox, [0, 0, 10, 10]);
  }
}
