// 该文件是 Yinyi （译音） 项目的一部分。
// tests/common/mod.rs - 测试用的检测、翻译、合成与帧来源
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

#![allow(dead_code)]

use std::{cell::Cell, collections::VecDeque, path::Path};

use image::{Rgb, RgbImage};
use yinyi::{
  frame::Frame,
  input::{FrameSource, InputError},
  model::{DetectItem, DetectResult, Detector},
  output::OutputSink,
  pipeline::FramePipeline,
  speech::{SpeechError, SpeechSynthesizer},
  translate::{TranslateError, Translator},
};

pub const BACKGROUND: Rgb<u8> = Rgb([40, 40, 40]);
pub const GREEN: Rgb<u8> = Rgb([0, 255, 0]);

pub fn item(label: &str, bbox: [f32; 4]) -> DetectItem {
  DetectItem {
    class_id: 0,
    label: label.to_string(),
    score: 0.9,
    bbox,
  }
}

pub fn blank_frame(width: u32, height: u32) -> Frame {
  Frame::new(RgbImage::from_pixel(width, height, BACKGROUND))
}

/// 按调用顺序返回预设结果；用完后一直返回最后一个，`None` 表示检测失败
pub struct ScriptedDetector {
  script: VecDeque<Option<Vec<DetectItem>>>,
  last: Option<Vec<DetectItem>>,
}

impl ScriptedDetector {
  pub fn fixed(items: Vec<DetectItem>) -> Self {
    Self::scripted(vec![Some(items)])
  }

  pub fn scripted(script: Vec<Option<Vec<DetectItem>>>) -> Self {
    Self {
      script: script.into(),
      last: Some(Vec::new()),
    }
  }
}

impl Detector for ScriptedDetector {
  type Error = std::io::Error;

  fn detect(&mut self, _frame: &Frame) -> Result<DetectResult, Self::Error> {
    if let Some(next) = self.script.pop_front() {
      self.last = next;
    }
    match &self.last {
      Some(items) => Ok(DetectResult::from(items.clone())),
      None => Err(std::io::Error::other("detector offline")),
    }
  }
}

/// 译文为 `<语言>:<原文>`，遇到 `fail_label` 时失败
pub struct PrefixTranslator {
  pub fail_label: Option<String>,
  pub calls: Cell<usize>,
}

impl PrefixTranslator {
  pub fn new() -> Self {
    Self {
      fail_label: None,
      calls: Cell::new(0),
    }
  }

  pub fn failing_on(label: &str) -> Self {
    Self {
      fail_label: Some(label.to_string()),
      calls: Cell::new(0),
    }
  }
}

impl Translator for PrefixTranslator {
  fn translate(&self, text: &str, language: &str) -> Result<String, TranslateError> {
    self.calls.set(self.calls.get() + 1);
    if self.fail_label.as_deref() == Some(text) {
      return Err(TranslateError::MalformedResponse);
    }
    Ok(format!("{}:{}", language, text))
  }
}

/// 把 `<译文>#<调用序号>` 写入目标文件，遇到 `fail_text` 时失败
pub struct RecordingSynthesizer {
  pub fail_text: Option<String>,
  pub calls: Cell<usize>,
}

impl RecordingSynthesizer {
  pub fn new() -> Self {
    Self {
      fail_text: None,
      calls: Cell::new(0),
    }
  }

  pub fn failing_on(text: &str) -> Self {
    Self {
      fail_text: Some(text.to_string()),
      calls: Cell::new(0),
    }
  }
}

impl SpeechSynthesizer for RecordingSynthesizer {
  fn synthesize(&self, text: &str, _language: &str, destination: &Path) -> Result<(), SpeechError> {
    let call = self.calls.get() + 1;
    self.calls.set(call);
    if self.fail_text.as_deref() == Some(text) {
      return Err(SpeechError::EmptyText);
    }
    std::fs::write(destination, format!("{}#{}", text, call))?;
    Ok(())
  }
}

/// 依次返回预设帧，用完后报错
pub struct QueuedSource {
  frames: VecDeque<Frame>,
}

impl QueuedSource {
  pub fn new(frames: Vec<Frame>) -> Self {
    Self {
      frames: frames.into(),
    }
  }
}

impl FrameSource for QueuedSource {
  fn read_frame(&mut self) -> Result<Frame, InputError> {
    self.frames.pop_front().ok_or(InputError::Exhausted)
  }
}

/// 永不结束的帧来源
pub struct EndlessSource {
  pub width: u32,
  pub height: u32,
}

impl FrameSource for EndlessSource {
  fn read_frame(&mut self) -> Result<Frame, InputError> {
    Ok(blank_frame(self.width, self.height))
  }
}

pub type TestPipeline = FramePipeline<ScriptedDetector, PrefixTranslator, RecordingSynthesizer>;

pub fn pipeline(detector: ScriptedDetector, translator: PrefixTranslator, dir: &Path) -> TestPipeline {
  pipeline_with(detector, translator, RecordingSynthesizer::new(), dir)
}

pub fn pipeline_with(
  detector: ScriptedDetector,
  translator: PrefixTranslator,
  synthesizer: RecordingSynthesizer,
  dir: &Path,
) -> TestPipeline {
  FramePipeline::new(detector, translator, synthesizer, OutputSink::new(dir))
}
