// 该文件是 Yinyi （译音） 项目的一部分。
// src/pipeline.rs - 单帧处理流程
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

//! # 单帧处理流程
//!
//! 一帧图像依次经过：
//!
//! 1. 检测模型，得到按模型原生顺序排列的检测结果；
//! 2. 对每个检测（按顺序，不重排）：翻译类别名、合成语音写入
//!    `<类别名>.<扩展名>`、在工作副本上绘制检测框；
//! 3. 返回标注后的帧和三个逐项对齐的序列。
//!
//! 翻译与合成逐个同步调用。同一类别名总是写到同一个音频文件，
//! 后写入的覆盖先写入的。流程不保证原子性：中途失败时，之前写出的
//! 音频文件仍留在输出目录中。
//!
//! 单个检测的翻译或合成失败如何处理由 [`OnDetectionError`] 决定；
//! 检测模型本身的错误总是直接返回。

use std::error::Error as StdError;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
  config::DEFAULT_AUDIO_EXTENSION,
  frame::Frame,
  model::{DetectItem, Detector},
  output::{Annotator, OutputSink, RecordError, ResultRecord},
  speech::{SpeechError, SpeechSynthesizer},
  translate::{TranslateError, Translator},
};

/// 单个检测翻译或合成失败时的处理方式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OnDetectionError {
  /// 放弃整帧，错误返回给调用方
  #[default]
  AbortFrame,
  /// 记录日志后跳过该检测，其余检测照常处理
  SkipDetection,
}

#[derive(Error, Debug)]
pub enum PipelineError {
  #[error("检测失败: {0}")]
  Detection(#[source] Box<dyn StdError + Send + Sync>),
  #[error("第 {index} 个检测（{label}）翻译失败: {source}")]
  Translation {
    index: usize,
    label: String,
    #[source]
    source: TranslateError,
  },
  #[error("第 {index} 个检测（{label}）语音合成失败: {source}")]
  Synthesis {
    index: usize,
    label: String,
    #[source]
    source: SpeechError,
  },
  #[error("输出目录错误: {0}")]
  Output(#[from] RecordError),
}

/// 一帧的处理结果
#[derive(Debug, Clone)]
pub struct FrameOutput {
  pub annotated: Frame,
  pub detected_words: Vec<String>,
  pub translated_texts: Vec<String>,
  pub audio_files: Vec<String>,
}

impl FrameOutput {
  pub fn len(&self) -> usize {
    self.detected_words.len()
  }

  pub fn is_empty(&self) -> bool {
    self.detected_words.is_empty()
  }

  pub fn to_record(&self, filename: impl Into<String>) -> ResultRecord {
    ResultRecord {
      filename: filename.into(),
      detected_words: self.detected_words.clone(),
      translated_texts: self.translated_texts.clone(),
      audio_files: self.audio_files.clone(),
      processing_time: None,
    }
  }
}

pub struct FramePipeline<D, T, S> {
  detector: D,
  translator: T,
  synthesizer: S,
  annotator: Annotator,
  sink: OutputSink,
  audio_extension: String,
  on_error: OnDetectionError,
}

impl<D, T, S> FramePipeline<D, T, S>
where
  D: Detector,
  D::Error: StdError + Send + Sync + 'static,
  T: Translator,
  S: SpeechSynthesizer,
{
  pub fn new(detector: D, translator: T, synthesizer: S, sink: OutputSink) -> Self {
    Self {
      detector,
      translator,
      synthesizer,
      annotator: Annotator::default(),
      sink,
      audio_extension: DEFAULT_AUDIO_EXTENSION.to_string(),
      on_error: OnDetectionError::default(),
    }
  }

  pub fn with_annotator(mut self, annotator: Annotator) -> Self {
    self.annotator = annotator;
    self
  }

  pub fn with_audio_extension(mut self, extension: impl Into<String>) -> Self {
    self.audio_extension = extension.into();
    self
  }

  pub fn with_error_policy(mut self, on_error: OnDetectionError) -> Self {
    self.on_error = on_error;
    self
  }

  pub fn sink(&self) -> &OutputSink {
    &self.sink
  }

  pub fn error_policy(&self) -> OnDetectionError {
    self.on_error
  }

  /// 音频文件名只由类别名决定
  pub fn audio_name(&self, label: &str) -> String {
    format!("{}.{}", label, self.audio_extension)
  }

  pub fn process(&mut self, frame: &Frame, language: &str) -> Result<FrameOutput, PipelineError> {
    let result = self
      .detector
      .detect(frame)
      .map_err(|e| PipelineError::Detection(Box::new(e)))?;
    info!("帧 {}: 检测到 {} 个对象", frame.index, result.len());

    let mut output = FrameOutput {
      annotated: frame.clone(),
      detected_words: Vec::with_capacity(result.len()),
      translated_texts: Vec::with_capacity(result.len()),
      audio_files: Vec::with_capacity(result.len()),
    };
    if result.is_empty() {
      return Ok(output);
    }
    self.sink.ensure()?;

    for (index, item) in result.iter().enumerate() {
      match self.describe(index, item, language) {
        Ok((translated, audio)) => {
          output.detected_words.push(item.label.clone());
          output.translated_texts.push(translated);
          output.audio_files.push(audio);
        }
        Err(e) if self.on_error == OnDetectionError::SkipDetection => {
          warn!("跳过检测: {}", e);
          continue;
        }
        Err(e) => return Err(e),
      }
      self.annotator.draw_item(&mut output.annotated.image, item);
    }

    Ok(output)
  }

  /// 翻译并合成一个检测，返回（译文，音频文件名）
  fn describe(
    &self,
    index: usize,
    item: &DetectItem,
    language: &str,
  ) -> Result<(String, String), PipelineError> {
    debug!(
      "  - {}: {:.2}% at ({:.0}, {:.0})-({:.0}, {:.0})",
      item.label,
      item.score * 100.0,
      item.bbox[0],
      item.bbox[1],
      item.bbox[2],
      item.bbox[3]
    );

    let translated = self
      .translator
      .translate(&item.label, language)
      .map_err(|source| PipelineError::Translation {
        index,
        label: item.label.clone(),
        source,
      })?;

    let audio = self.audio_name(&item.label);
    self
      .synthesizer
      .synthesize(&translated, language, &self.sink.path(&audio))
      .map_err(|source| PipelineError::Synthesis {
        index,
        label: item.label.clone(),
        source,
      })?;
    info!("{} -> {} ({})", item.label, translated, audio);

    Ok((translated, audio))
  }
}
