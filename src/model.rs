// 该文件是 Yinyi （译音） 项目的一部分。
// src/model.rs - 检测模型
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

use crate::{FromUrl, FromUrlWithScheme, frame::Frame};

mod letterbox;
mod postprocess;
mod yolov10;
mod yolov5;

pub use self::letterbox::Letterbox;
pub use self::yolov5::Yolov5;
pub use self::yolov10::Yolov10;

const COCO_LABELS: &str = include_str!("../labels/coco.txt");

const DEFAULT_INPUT_SIZE: u32 = 640;
const DEFAULT_CONFIDENCE: f32 = 0.25;
const DEFAULT_IOU_THRESHOLD: f32 = 0.45;

/// 检测模型接口
///
/// 输入帧应已缩放到处理分辨率。模型内部阈值之外不再做任何过滤，
/// 结果按模型原生顺序返回。
pub trait Detector {
  type Error;

  fn detect(&mut self, frame: &Frame) -> Result<DetectResult, Self::Error>;
}

impl<D: Detector + ?Sized> Detector for Box<D> {
  type Error = D::Error;

  fn detect(&mut self, frame: &Frame) -> Result<DetectResult, Self::Error> {
    (**self).detect(frame)
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetectItem {
  pub class_id: u32,
  pub label: String,
  pub score: f32,
  pub bbox: [f32; 4], // [x_min, y_min, x_max, y_max]，帧像素坐标
}

#[derive(Debug, Clone, Default)]
pub struct DetectResult {
  pub items: Box<[DetectItem]>,
}

impl DetectResult {
  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  pub fn len(&self) -> usize {
    self.items.len()
  }

  pub fn iter(&self) -> std::slice::Iter<'_, DetectItem> {
    self.items.iter()
  }
}

impl From<Vec<DetectItem>> for DetectResult {
  fn from(items: Vec<DetectItem>) -> Self {
    Self {
      items: items.into_boxed_slice(),
    }
  }
}

#[derive(Error, Debug)]
pub enum ModelError {
  #[error("模型加载错误: {0}")]
  ModelLoadError(#[from] std::io::Error),
  #[error("ONNX Runtime 错误: {0}")]
  OrtError(String),
  #[error("模型路径错误: {0}")]
  ModelPathError(String),
  #[error("模型没有输出")]
  NoOutput,
  #[error("模型输出形状异常: {0:?}")]
  UnexpectedShape(Vec<usize>),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

impl ModelError {
  pub(crate) fn ort(err: impl std::fmt::Display) -> Self {
    ModelError::OrtError(err.to_string())
  }
}

/// 类别名称表
#[derive(Debug, Clone)]
pub struct Labels {
  names: Vec<String>,
}

impl Labels {
  pub fn coco() -> Self {
    Self::parse(COCO_LABELS)
  }

  pub fn from_file(path: &Path) -> Result<Self, ModelError> {
    let text = std::fs::read_to_string(path)?;
    Ok(Self::parse(&text))
  }

  fn parse(text: &str) -> Self {
    let names = text
      .lines()
      .map(str::trim)
      .filter(|line| !line.is_empty())
      .map(String::from)
      .collect();
    Self { names }
  }

  pub fn len(&self) -> usize {
    self.names.len()
  }

  pub fn is_empty(&self) -> bool {
    self.names.is_empty()
  }

  pub fn name(&self, class_id: u32) -> String {
    self
      .names
      .get(class_id as usize)
      .cloned()
      .unwrap_or_else(|| format!("class_{}", class_id))
  }
}

/// 模型公共参数，从 URL 查询串读取
///
/// `yolov5:///path/best.onnx?size=640&conf=0.25&iou=0.45&labels=/path/labels.txt`
#[derive(Debug, Clone)]
pub struct ModelOptions {
  pub model_path: PathBuf,
  pub input_size: u32,
  pub confidence: f32,
  pub iou_threshold: f32,
  pub labels: Labels,
}

impl ModelOptions {
  pub fn new(model_path: impl Into<PathBuf>) -> Self {
    Self {
      model_path: model_path.into(),
      input_size: DEFAULT_INPUT_SIZE,
      confidence: DEFAULT_CONFIDENCE,
      iou_threshold: DEFAULT_IOU_THRESHOLD,
      labels: Labels::coco(),
    }
  }

  fn from_url(url: &Url) -> Result<Self, ModelError> {
    let path = crate::url_path(url);
    if path.is_empty() {
      return Err(ModelError::ModelPathError(url.to_string()));
    }

    let mut options = Self::new(path);
    for (key, value) in url.query_pairs() {
      let invalid = || ModelError::ModelPathError(format!("参数 {}={} 无效", key, value));
      match key.as_ref() {
        "size" => {
          options.input_size = value
            .parse()
            .ok()
            .filter(|size: &u32| *size > 0)
            .ok_or_else(invalid)?
        }
        "conf" => options.confidence = value.parse().map_err(|_| invalid())?,
        "iou" => options.iou_threshold = value.parse().map_err(|_| invalid())?,
        "labels" => options.labels = Labels::from_file(Path::new(value.as_ref()))?,
        _ => debug!("忽略未知模型参数: {}={}", key, value),
      }
    }
    Ok(options)
  }

  fn load_session(&self) -> Result<ort::session::Session, ModelError> {
    info!("加载模型文件: {}", self.model_path.display());
    if !self.model_path.is_file() {
      return Err(ModelError::ModelPathError(format!(
        "模型文件不存在: {}",
        self.model_path.display()
      )));
    }
    let session = ort::session::Session::builder()
      .map_err(ModelError::ort)?
      .commit_from_file(&self.model_path)
      .map_err(ModelError::ort)?;
    info!(
      "模型加载完成，输入尺寸 {0}x{0}，类别数 {1}",
      self.input_size,
      self.labels.len()
    );
    Ok(session)
  }
}

/// 执行一次推理，返回第一个输出张量的形状与数据
fn run_session(
  session: &mut ort::session::Session,
  letterbox: &Letterbox,
) -> Result<(Vec<usize>, Vec<f32>), ModelError> {
  let input = ort::value::Tensor::from_array(letterbox.tensor.clone()).map_err(ModelError::ort)?;
  let outputs = session.run(ort::inputs![input]).map_err(ModelError::ort)?;
  if outputs.len() == 0 {
    return Err(ModelError::NoOutput);
  }
  let array = outputs[0]
    .try_extract_array::<f32>()
    .map_err(ModelError::ort)?;
  let shape = array.shape().to_vec();
  let data = array.iter().copied().collect();
  debug!("模型输出形状: {:?}", shape);
  Ok((shape, data))
}

/// 检测后端，按 URL 方案选择
pub enum DetectionBackend {
  Yolov5(Yolov5),
  Yolov10(Yolov10),
}

impl FromUrl for DetectionBackend {
  type Error = ModelError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    match url.scheme() {
      Yolov5::SCHEME => Ok(DetectionBackend::Yolov5(Yolov5::from_url(url)?)),
      Yolov10::SCHEME => Ok(DetectionBackend::Yolov10(Yolov10::from_url(url)?)),
      other => Err(ModelError::SchemeMismatch(other.to_string())),
    }
  }
}

impl Detector for DetectionBackend {
  type Error = ModelError;

  fn detect(&mut self, frame: &Frame) -> Result<DetectResult, Self::Error> {
    match self {
      DetectionBackend::Yolov5(model) => model.detect(frame),
      DetectionBackend::Yolov10(model) => model.detect(frame),
    }
  }
}
