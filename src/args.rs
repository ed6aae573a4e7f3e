// 该文件是 Yinyi （译音） 项目的一部分。
// src/args.rs - 项目参数配置
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

use std::{path::PathBuf, time::Duration};

use clap::Parser;
use url::Url;

use yinyi::{
  config::{
    Config, DEFAULT_HEIGHT, DEFAULT_LANGUAGE, DEFAULT_OUTPUT_DIR, DEFAULT_TIMEOUT_SECS,
    DEFAULT_TRANSLATE_ENDPOINT, DEFAULT_TTS_ENDPOINT, DEFAULT_WIDTH,
  },
  pipeline::OnDetectionError,
};

/// Yinyi 项目参数配置
///
/// 检测图像中的对象，把类别名翻译成目标语言并合成语音。
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 待处理的图像文件
  #[arg(value_name = "IMAGE")]
  pub image: Option<PathBuf>,

  /// 从摄像头连续采集
  #[arg(long, conflicts_with = "image")]
  pub webcam: bool,

  /// 目标语言代码
  #[arg(long, default_value = DEFAULT_LANGUAGE, value_name = "LANG")]
  pub lang: String,

  /// 模型地址，例如 yolov5:///path/to/yolov5s.onnx?conf=0.25
  #[arg(long, value_name = "MODEL")]
  pub model: Url,

  /// 摄像头地址
  #[arg(long, default_value = "v4l:///dev/video0", value_name = "DEVICE")]
  pub device: Url,

  /// 输出目录
  #[arg(long, default_value = DEFAULT_OUTPUT_DIR, value_name = "DIR")]
  pub output_dir: PathBuf,

  /// 处理分辨率（宽）
  #[arg(long, default_value_t = DEFAULT_WIDTH)]
  pub width: u32,

  /// 处理分辨率（高）
  #[arg(long, default_value_t = DEFAULT_HEIGHT)]
  pub height: u32,

  /// 标签字体文件，缺省时查找系统字体
  #[arg(long, value_name = "FONT")]
  pub font: Option<PathBuf>,

  /// 最大处理帧数（仅摄像头模式）
  #[arg(long, value_name = "COUNT")]
  pub max_frames: Option<usize>,

  /// 单个检测翻译或合成失败时的处理方式
  #[arg(long, value_enum, default_value_t = OnDetectionError::AbortFrame)]
  pub on_detection_error: OnDetectionError,

  #[arg(long, default_value = DEFAULT_TRANSLATE_ENDPOINT, value_name = "URL")]
  pub translate_endpoint: String,

  #[arg(long, default_value = DEFAULT_TTS_ENDPOINT, value_name = "URL")]
  pub tts_endpoint: String,

  /// 外部服务请求超时（秒）
  #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS, value_name = "SECS")]
  pub timeout_secs: u64,
}

impl Args {
  pub fn config(&self) -> Config {
    Config {
      output_dir: self.output_dir.clone(),
      width: self.width,
      height: self.height,
      font: self.font.clone(),
      translate_endpoint: self.translate_endpoint.clone(),
      tts_endpoint: self.tts_endpoint.clone(),
      timeout: Duration::from_secs(self.timeout_secs),
      ..Config::default()
    }
  }
}
