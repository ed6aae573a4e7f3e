// 该文件是 Yinyi （译音） 项目的一部分。
// src/model/yolov5.rs - YOLOv5 模型
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

use tracing::{debug, error};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::Frame,
  model::{
    DetectResult, Detector, Letterbox, ModelError, ModelOptions, postprocess::{self, RawDetection},
    run_session,
  },
};

// [cx, cy, w, h, obj]
const YOLOV5_BOX_FEATURES: usize = 5;
const YOLOV5_MAX_DET: usize = 1000;

/// YOLOv5 ONNX 模型，输出 `[1, N, 5 + 类别数]`，需要 NMS
pub struct Yolov5 {
  session: ort::session::Session,
  options: ModelOptions,
}

impl FromUrlWithScheme for Yolov5 {
  const SCHEME: &'static str = "yolov5";
}

impl FromUrl for Yolov5 {
  type Error = ModelError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(ModelError::SchemeMismatch(url.scheme().to_string()));
    }
    let options = ModelOptions::from_url(url)?;
    Self::with_options(options)
  }
}

impl Yolov5 {
  pub fn with_options(options: ModelOptions) -> Result<Self, ModelError> {
    let session = options.load_session()?;
    Ok(Self { session, options })
  }
}

impl Detector for Yolov5 {
  type Error = ModelError;

  fn detect(&mut self, frame: &Frame) -> Result<DetectResult, Self::Error> {
    let letterbox = Letterbox::new(&frame.image, self.options.input_size);
    let (shape, data) = run_session(&mut self.session, &letterbox)?;
    let raw = decode(&shape, &data, self.options.confidence)?;
    let kept = postprocess::nms(raw, self.options.iou_threshold, YOLOV5_MAX_DET);
    debug!("YOLOv5 检测到 {} 个物体", kept.len());

    let items = kept
      .into_iter()
      .map(|det| det.into_item(&letterbox, &self.options.labels))
      .collect::<Vec<_>>();
    Ok(items.into())
  }
}

/// 解析原始输出：置信度 = 目标分数 × 最大类别分数
fn decode(shape: &[usize], data: &[f32], confidence: f32) -> Result<Vec<RawDetection>, ModelError> {
  let mut dets = Vec::new();
  for row in postprocess::rows(shape, data)? {
    if row.len() <= YOLOV5_BOX_FEATURES {
      continue;
    }
    let objectness = row[4];
    if objectness < confidence {
      continue;
    }

    let (class_id, class_score) = row[YOLOV5_BOX_FEATURES..]
      .iter()
      .enumerate()
      .fold((0usize, f32::MIN), |best, (idx, &score)| {
        if score > best.1 { (idx, score) } else { best }
      });
    let score = objectness * class_score;
    if score < confidence {
      continue;
    }

    let (cx, cy, w, h) = (row[0], row[1], row[2], row[3]);
    dets.push(RawDetection {
      bbox: [cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0],
      score,
      class_id: class_id as u32,
    });
  }
  Ok(dets)
}

#[cfg(test)]
mod tests {
  use super::*;
  use approx::assert_abs_diff_eq;

  #[test]
  fn decode_combines_objectness_and_class_score() {
    // 两个候选，三类
    let data = vec![
      30.0, 30.0, 40.0, 40.0, 0.9, 0.1, 0.8, 0.1, //
      10.0, 10.0, 4.0, 4.0, 0.2, 0.9, 0.0, 0.0,
    ];
    let dets = decode(&[1, 2, 8], &data, 0.25).unwrap();
    assert_eq!(dets.len(), 1);
    assert_eq!(dets[0].class_id, 1);
    assert_abs_diff_eq!(dets[0].score, 0.72, epsilon = 1e-6);
    assert_eq!(dets[0].bbox, [10.0, 10.0, 50.0, 50.0]);
  }

  #[test]
  fn decode_drops_low_combined_score() {
    let data = vec![30.0, 30.0, 40.0, 40.0, 0.5, 0.4, 0.1];
    assert!(decode(&[1, 1, 7], &data, 0.25).unwrap().is_empty());
  }
}
