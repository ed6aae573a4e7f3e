// 该文件是 Yinyi （译音） 项目的一部分。
// src/model/yolov10.rs - YOLOv10 模型
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

// [x1, y1, x2, y2, score, class]
const YOLOV10_FEATURES: usize = 6;

/// YOLOv10 ONNX 模型，端到端输出 `[1, 300, 6]`，无需 NMS
pub struct Yolov10 {
  session: ort::session::Session,
  options: ModelOptions,
}

impl FromUrlWithScheme for Yolov10 {
  const SCHEME: &'static str = "yolov10";
}

impl FromUrl for Yolov10 {
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

impl Yolov10 {
  pub fn with_options(options: ModelOptions) -> Result<Self, ModelError> {
    let session = options.load_session()?;
    Ok(Self { session, options })
  }
}

impl Detector for Yolov10 {
  type Error = ModelError;

  fn detect(&mut self, frame: &Frame) -> Result<DetectResult, Self::Error> {
    let letterbox = Letterbox::new(&frame.image, self.options.input_size);
    let (shape, data) = run_session(&mut self.session, &letterbox)?;
    let raw = decode(&shape, &data, self.options.confidence)?;
    debug!("YOLOv10 检测到 {} 个物体", raw.len());

    let items = raw
      .into_iter()
      .map(|det| det.into_item(&letterbox, &self.options.labels))
      .collect::<Vec<_>>();
    Ok(items.into())
  }
}

fn decode(shape: &[usize], data: &[f32], confidence: f32) -> Result<Vec<RawDetection>, ModelError> {
  if shape.last().copied() != Some(YOLOV10_FEATURES) {
    return Err(ModelError::UnexpectedShape(shape.to_vec()));
  }
  let dets = postprocess::rows(shape, data)?
    .into_iter()
    .filter(|row| row[4] >= confidence)
    .map(|row| RawDetection {
      bbox: [row[0], row[1], row[2], row[3]],
      score: row[4],
      class_id: row[5].max(0.0) as u32,
    })
    .collect();
  Ok(dets)
}
