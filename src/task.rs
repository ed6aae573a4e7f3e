// 该文件是 Yinyi （译音） 项目的一部分。
// src/task.rs - 任务
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

use std::{
  error::Error as StdError,
  path::PathBuf,
  sync::mpsc::Receiver,
  time::{Duration, Instant},
};

use anyhow::Context;
use tracing::{error, info, warn};

use crate::{
  config::{DEFAULT_HEIGHT, DEFAULT_LANGUAGE, DEFAULT_WIDTH},
  input::{FrameSource, ImageFileInput},
  model::Detector,
  output::{ResultRecord, WEBCAM_RECORD_NAME, annotated_name, result_record_name, webcam_frame_name},
  pipeline::FramePipeline,
  speech::SpeechSynthesizer,
  translate::Translator,
};

pub trait Task<D, T, S>: Sized {
  type Output;
  type Error;
  fn run_task(self, pipeline: &mut FramePipeline<D, T, S>) -> Result<Self::Output, Self::Error>;
}

/// 单张图像任务
///
/// 要么返回完整结果并写出 `result_<名称>.json`，要么返回错误且不写 JSON。
pub struct OneShotTask {
  path: PathBuf,
  language: String,
  width: u32,
  height: u32,
}

impl OneShotTask {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self {
      path: path.into(),
      language: DEFAULT_LANGUAGE.to_string(),
      width: DEFAULT_WIDTH,
      height: DEFAULT_HEIGHT,
    }
  }

  pub fn with_language(mut self, language: impl Into<String>) -> Self {
    self.language = language.into();
    self
  }

  pub fn with_size(mut self, width: u32, height: u32) -> Self {
    self.width = width;
    self.height = height;
    self
  }
}

impl<D, T, S> Task<D, T, S> for OneShotTask
where
  D: Detector,
  D::Error: StdError + Send + Sync + 'static,
  T: Translator,
  S: SpeechSynthesizer,
{
  type Output = ResultRecord;
  type Error = anyhow::Error;

  fn run_task(self, pipeline: &mut FramePipeline<D, T, S>) -> Result<Self::Output, Self::Error> {
    info!("开始任务: {}", self.path.display());
    let now = Instant::now();

    let mut input = ImageFileInput::open(&self.path)
      .with_context(|| format!("无法读取图像: {}", self.path.display()))?;
    let frame = input.read_frame()?.resize_to(self.width, self.height);

    let output = pipeline
      .process(&frame, &self.language)
      .with_context(|| format!("处理图像失败: {}", self.path.display()))?;

    info!("检测到 {} 个对象", output.len());

    let sink = pipeline.sink();
    let filename = annotated_name(input.path());
    if let Err(e) = sink.save_image(&filename, &output.annotated.image) {
      error!("保存标注图像失败: {}", e);
    }

    let elapsed = now.elapsed();
    info!("处理完成，耗时: {:.2?}", elapsed);
    let record = output.to_record(filename).with_processing_time(elapsed);

    if let Err(e) = sink.save_record(&result_record_name(&self.path), &record) {
      error!("保存 JSON 文件失败: {}", e);
    }

    Ok(record)
  }
}

/// 采集循环状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
  Idle,
  Running,
  Stopped,
}

/// 采集循环结束时的汇总
#[derive(Debug, Clone)]
pub struct CaptureSummary {
  pub state: LoopState,
  /// 成功读到帧的迭代次数（含处理失败被跳过的帧）
  pub iterations: usize,
  /// 处理失败被跳过的帧数
  pub skipped: usize,
  pub elapsed: Duration,
  /// 最后一次写出的记录，已带上会话总耗时
  pub record: Option<ResultRecord>,
}

/// 连续采集任务
///
/// 每次迭代：读帧、处理、写出标注图像与 `webcam_result.json`。
/// 读帧失败立即结束；处理失败只跳过当前帧。结束时把整个会话的耗时
/// 写入最后一条记录。
pub struct ContinuousTask<I> {
  source: I,
  language: String,
  width: u32,
  height: u32,
  frame_number: Option<usize>,
  stop: Option<Receiver<()>>,
  state: LoopState,
}

impl<I: FrameSource> ContinuousTask<I> {
  pub fn new(source: I) -> Self {
    Self {
      source,
      language: DEFAULT_LANGUAGE.to_string(),
      width: DEFAULT_WIDTH,
      height: DEFAULT_HEIGHT,
      frame_number: None,
      stop: None,
      state: LoopState::Idle,
    }
  }

  pub fn with_language(mut self, language: impl Into<String>) -> Self {
    self.language = language.into();
    self
  }

  pub fn with_size(mut self, width: u32, height: u32) -> Self {
    self.width = width;
    self.height = height;
    self
  }

  pub fn with_frame_number(mut self, frame_number: Option<usize>) -> Self {
    self.frame_number = frame_number;
    self
  }

  /// 每次迭代末尾检查一次停止信号
  pub fn with_stop_signal(mut self, stop: Receiver<()>) -> Self {
    self.stop = Some(stop);
    self
  }

  pub fn state(&self) -> LoopState {
    self.state
  }

  fn stop_requested(&self) -> bool {
    self
      .stop
      .as_ref()
      .map(|rx| rx.try_recv().is_ok())
      .unwrap_or(false)
  }
}

impl<I, D, T, S> Task<D, T, S> for ContinuousTask<I>
where
  I: FrameSource,
  D: Detector,
  D::Error: StdError + Send + Sync + 'static,
  T: Translator,
  S: SpeechSynthesizer,
{
  type Output = CaptureSummary;
  type Error = anyhow::Error;

  fn run_task(mut self, pipeline: &mut FramePipeline<D, T, S>) -> Result<Self::Output, Self::Error> {
    info!("开始采集任务...");
    self.state = LoopState::Running;
    let sink = pipeline.sink().clone();
    let started = Instant::now();

    let mut iterations = 0usize;
    let mut skipped = 0usize;
    let mut last_record: Option<ResultRecord> = None;

    while self.state == LoopState::Running {
      let frame = match self.source.read_frame() {
        Ok(frame) => frame.resize_to(self.width, self.height),
        Err(e) => {
          error!("无法从摄像头读取帧: {}", e);
          self.state = LoopState::Stopped;
          break;
        }
      };
      iterations += 1;

      let frame_started = Instant::now();
      match pipeline.process(&frame, &self.language) {
        Ok(output) => {
          let filename = webcam_frame_name(chrono::Utc::now().timestamp());
          if let Err(e) = sink.save_image(&filename, &output.annotated.image) {
            error!("保存标注图像失败: {}", e);
          }
          let record = output.to_record(filename);
          if let Err(e) = sink.save_record(WEBCAM_RECORD_NAME, &record) {
            error!("保存 JSON 文件失败: {}", e);
          }
          last_record = Some(record);
          info!(
            "第 {} 帧处理完成，{} 个对象，耗时: {:.2?}",
            iterations,
            output.len(),
            frame_started.elapsed()
          );
        }
        Err(e) => {
          skipped += 1;
          error!("第 {} 帧处理失败，跳过: {:#}", iterations, anyhow::Error::new(e));
        }
      }

      if self.frame_number.is_some_and(|n| iterations >= n) {
        info!("达到指定帧数 {}, 退出任务循环", iterations);
        self.state = LoopState::Stopped;
      } else if self.stop_requested() {
        warn!("中断信号接收，退出任务循环");
        self.state = LoopState::Stopped;
      }
    }

    let elapsed = started.elapsed();
    let record = match last_record {
      Some(record) => {
        let record = record.with_processing_time(elapsed);
        match sink.save_record(WEBCAM_RECORD_NAME, &record) {
          Ok(path) => info!("JSON 文件已写入会话耗时: {}", path.display()),
          Err(e) => error!("保存 JSON 文件失败: {}", e),
        }
        Some(record)
      }
      None => {
        warn!("没有成功处理的帧，不写入会话耗时");
        None
      }
    };

    info!(
      "任务完成，共 {} 帧，跳过 {} 帧，耗时: {:.2?}",
      iterations, skipped, elapsed
    );
    Ok(CaptureSummary {
      state: self.state,
      iterations,
      skipped,
      elapsed,
      record,
    })
  }
}
