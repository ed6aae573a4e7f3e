// 该文件是 Yinyi （译音） 项目的一部分。
// src/model/postprocess.rs - 检测结果后处理
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

use crate::model::{DetectItem, Labels, Letterbox, ModelError};

/// 模型输入坐标系下的候选框
#[derive(Debug, Clone, PartialEq)]
pub struct RawDetection {
  pub bbox: [f32; 4],
  pub score: f32,
  pub class_id: u32,
}

impl RawDetection {
  pub fn into_item(self, letterbox: &Letterbox, labels: &Labels) -> DetectItem {
    DetectItem {
      class_id: self.class_id,
      label: labels.name(self.class_id),
      score: self.score,
      bbox: letterbox.to_frame(self.bbox),
    }
  }
}

/// 把 `[1, N, F]` 输出展开为逐行特征
pub fn rows(shape: &[usize], data: &[f32]) -> Result<Vec<Vec<f32>>, ModelError> {
  if shape.len() != 3 || shape[0] != 1 || data.len() != shape[1] * shape[2] {
    return Err(ModelError::UnexpectedShape(shape.to_vec()));
  }
  let num_feats = shape[2];
  if num_feats == 0 {
    return Ok(Vec::new());
  }
  Ok(data.chunks_exact(num_feats).map(<[f32]>::to_vec).collect())
}

pub fn bbox_iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
  let x1 = a[0].max(b[0]);
  let y1 = a[1].max(b[1]);
  let x2 = a[2].min(b[2]);
  let y2 = a[3].min(b[3]);

  let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
  if inter == 0.0 {
    return 0.0;
  }
  let area_a = (a[2] - a[0]) * (a[3] - a[1]);
  let area_b = (b[2] - b[0]) * (b[3] - b[1]);
  inter / (area_a + area_b - inter)
}

/// 按类别的贪心 NMS，结果按置信度降序
pub fn nms(mut dets: Vec<RawDetection>, iou_thresh: f32, max_det: usize) -> Vec<RawDetection> {
  dets.sort_by(|a, b| {
    b.score
      .partial_cmp(&a.score)
      .unwrap_or(std::cmp::Ordering::Equal)
  });

  let mut keep: Vec<RawDetection> = Vec::new();
  let mut suppressed = vec![false; dets.len()];

  for i in 0..dets.len() {
    if suppressed[i] {
      continue;
    }
    for j in (i + 1)..dets.len() {
      if suppressed[j] || dets[i].class_id != dets[j].class_id {
        continue;
      }
      if bbox_iou(&dets[i].bbox, &dets[j].bbox) > iou_thresh {
        suppressed[j] = true;
      }
    }
    keep.push(dets[i].clone());
    if keep.len() >= max_det {
      break;
    }
  }
  keep
}

#[cfg(test)]
mod tests {
  use super::*;
  use approx::assert_abs_diff_eq;

  fn raw(bbox: [f32; 4], score: f32, class_id: u32) -> RawDetection {
    RawDetection {
      bbox,
      score,
      class_id,
    }
  }

  #[test]
  fn rows_reads_row_major_output() {
    let data = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
    let rows = rows(&[1, 3, 2], &data).unwrap();
    assert_eq!(rows, vec![vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]]);
  }

  #[test]
  fn rows_rejects_bad_shape() {
    assert!(rows(&[1, 6], &[0.0; 6]).is_err());
    assert!(rows(&[1, 2, 3], &[0.0; 5]).is_err());
  }

  #[test]
  fn nms_suppresses_same_class_overlap() {
    let dets = vec![
      raw([0.0, 0.0, 100.0, 100.0], 0.8, 0),
      raw([5.0, 5.0, 105.0, 105.0], 0.9, 0),
    ];
    let kept = nms(dets, 0.45, 100);
    assert_eq!(kept.len(), 1);
    assert_abs_diff_eq!(kept[0].score, 0.9);
  }

  #[test]
  fn nms_keeps_overlap_of_different_classes() {
    let dets = vec![
      raw([0.0, 0.0, 100.0, 100.0], 0.9, 0),
      raw([5.0, 5.0, 105.0, 105.0], 0.8, 1),
    ];
    assert_eq!(nms(dets, 0.45, 100).len(), 2);
  }

  #[test]
  fn nms_respects_max_detections() {
    let dets = (0..10)
      .map(|i| raw([i as f32 * 20.0, 0.0, i as f32 * 20.0 + 10.0, 10.0], 0.5, 0))
      .collect();
    assert_eq!(nms(dets, 0.45, 4).len(), 4);
  }

  #[test]
  fn iou_of_partial_overlap() {
    let iou = bbox_iou(&[0.0, 0.0, 10.0, 10.0], &[5.0, 5.0, 15.0, 15.0]);
    assert_abs_diff_eq!(iou, 25.0 / 175.0, epsilon = 1e-6);
    assert_eq!(bbox_iou(&[0.0, 0.0, 1.0, 1.0], &[2.0, 2.0, 3.0, 3.0]), 0.0);
  }
}
