// 该文件是 Yinyi （译音） 项目的一部分。
// src/config.rs - 运行配置
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

pub const DEFAULT_OUTPUT_DIR: &str = "static/annotated_results";
pub const DEFAULT_WIDTH: u32 = 256;
pub const DEFAULT_HEIGHT: u32 = 256;
pub const DEFAULT_LANGUAGE: &str = "hi";
pub const DEFAULT_AUDIO_EXTENSION: &str = "mp3";
pub const DEFAULT_TRANSLATE_ENDPOINT: &str = "https://translate.googleapis.com/translate_a/single";
pub const DEFAULT_TTS_ENDPOINT: &str = "https://translate.google.com/translate_tts";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// 处理流程的运行配置
#[derive(Debug, Clone)]
pub struct Config {
  /// 输出目录
  pub output_dir: PathBuf,
  /// 处理分辨率（宽）
  pub width: u32,
  /// 处理分辨率（高）
  pub height: u32,
  /// 音频文件扩展名
  pub audio_extension: String,
  /// 标签字体文件
  pub font: Option<PathBuf>,
  pub translate_endpoint: String,
  pub tts_endpoint: String,
  /// 外部服务请求超时
  pub timeout: Duration,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
      width: DEFAULT_WIDTH,
      height: DEFAULT_HEIGHT,
      audio_extension: DEFAULT_AUDIO_EXTENSION.to_string(),
      font: None,
      translate_endpoint: DEFAULT_TRANSLATE_ENDPOINT.to_string(),
      tts_endpoint: DEFAULT_TTS_ENDPOINT.to_string(),
      timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
    }
  }
}
