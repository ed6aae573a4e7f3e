// 该文件是 Yinyi （译音） 项目的一部分。
// src/main.rs - 项目主程序
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

mod args;

use std::{thread, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};

use yinyi::{
  FromUrl,
  input::InputWrapper,
  model::DetectionBackend,
  output::{Annotator, OutputSink},
  pipeline::{FramePipeline, OnDetectionError},
  speech::GoogleTts,
  task::{ContinuousTask, OneShotTask, Task},
  translate::GoogleTranslator,
};

fn main() -> Result<()> {
  // 标准输出只留给 JSON 结果
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .init();

  let args = args::Args::parse();
  let config = args.config();

  info!("模型地址: {}", args.model);
  info!("目标语言: {}", args.lang);
  info!("输出目录: {}", config.output_dir.display());

  if args.image.is_none() && !args.webcam {
    error!("请指定图像文件或使用 --webcam");
    anyhow::bail!("未指定输入");
  }

  let detector = DetectionBackend::from_url(&args.model)
    .with_context(|| format!("无法加载模型: {}", args.model))?;
  let translator = GoogleTranslator::from_config(&config)?;
  let synthesizer = GoogleTts::from_config(&config)?;
  let annotator = match &config.font {
    Some(font) => Annotator::with_font_file(font)
      .with_context(|| format!("无法加载字体: {}", font.display()))?,
    None => Annotator::with_system_font(),
  };

  // 单张图像模式总是放弃整帧
  let policy = match args.image {
    Some(_) => OnDetectionError::AbortFrame,
    None => args.on_detection_error,
  };

  let mut pipeline = FramePipeline::new(
    detector,
    translator,
    synthesizer,
    OutputSink::new(&config.output_dir),
  )
  .with_annotator(annotator)
  .with_audio_extension(config.audio_extension.clone())
  .with_error_policy(policy);

  if let Some(image) = &args.image {
    let record = OneShotTask::new(image)
      .with_language(&args.lang)
      .with_size(config.width, config.height)
      .run_task(&mut pipeline)?;
    println!("{}", record.to_pretty_json()?);
    return Ok(());
  }

  let (tx, rx) = std::sync::mpsc::channel();
  ctrlc::set_handler(move || {
    info!("收到中断信号，准备退出...");
    let _ = tx.send(());
    thread::spawn(|| {
      thread::sleep(Duration::from_secs(30));
      warn!("强制退出程序");
      std::process::exit(1);
    });
  })?;

  let source = InputWrapper::from_url(&args.device)
    .with_context(|| format!("无法打开摄像头: {}", args.device))?;
  let summary = ContinuousTask::new(source)
    .with_language(&args.lang)
    .with_size(config.width, config.height)
    .with_frame_number(args.max_frames)
    .with_stop_signal(rx)
    .run_task(&mut pipeline)?;
  info!(
    "采集结束: {} 帧，跳过 {} 帧",
    summary.iterations, summary.skipped
  );

  Ok(())
}
