// 该文件是 Yinyi （译音） 项目的一部分。
// src/output/record.rs - 结果记录
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

use std::{path::Path, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const WEBCAM_RECORD_NAME: &str = "webcam_result.json";

#[derive(Error, Debug)]
pub enum RecordError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("JSON 错误: {0}")]
  JsonError(#[from] serde_json::Error),
}

/// 一帧（或一次采集会话）的持久化结果
///
/// 三个序列按检测顺序逐项对齐。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
  pub filename: String,
  pub detected_words: Vec<String>,
  pub translated_texts: Vec<String>,
  pub audio_files: Vec<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub processing_time: Option<f64>,
}

impl ResultRecord {
  /// 写入耗时（秒，保留两位小数）
  pub fn with_processing_time(mut self, elapsed: Duration) -> Self {
    self.processing_time = Some(round_secs(elapsed));
    self
  }

  pub fn len(&self) -> usize {
    self.detected_words.len()
  }

  pub fn is_empty(&self) -> bool {
    self.detected_words.is_empty()
  }

  /// 四个空格缩进的 JSON 文本，用于标准输出
  pub fn to_pretty_json(&self) -> Result<String, RecordError> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    self.serialize(&mut serializer)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
  }

  pub fn is_aligned(&self) -> bool {
    self.detected_words.len() == self.translated_texts.len()
      && self.detected_words.len() == self.audio_files.len()
  }
}

fn round_secs(elapsed: Duration) -> f64 {
  (elapsed.as_secs_f64() * 100.0).round() / 100.0
}

fn file_name(input: &Path) -> String {
  input
    .file_name()
    .map(|name| name.to_string_lossy().into_owned())
    .unwrap_or_default()
}

/// `annotated_<文件名>`
pub fn annotated_name(input: &Path) -> String {
  format!("annotated_{}", file_name(input))
}

/// `result_<不含扩展名的文件名>.json`
pub fn result_record_name(input: &Path) -> String {
  let stem = input
    .file_stem()
    .map(|stem| stem.to_string_lossy().into_owned())
    .unwrap_or_default();
  format!("result_{}.json", stem)
}

/// `webcam_output_<unix 秒>.jpg`
pub fn webcam_frame_name(timestamp: i64) -> String {
  format!("webcam_output_{}.jpg", timestamp)
}

#[cfg(test)]
mod tests {
  use super::*;
  use rstest::rstest;

  #[rstest]
  #[case("uploads/cat.jpg", "annotated_cat.jpg", "result_cat.json")]
  #[case("/tmp/two.dots.png", "annotated_two.dots.png", "result_two.dots.json")]
  #[case("noext", "annotated_noext", "result_noext.json")]
  fn names_follow_input_basename(
    #[case] input: &str,
    #[case] annotated: &str,
    #[case] record: &str,
  ) {
    let input = Path::new(input);
    assert_eq!(annotated_name(input), annotated);
    assert_eq!(result_record_name(input), record);
  }

  #[test]
  fn processing_time_is_rounded() {
    let record = ResultRecord::default().with_processing_time(Duration::from_millis(1234));
    assert_eq!(record.processing_time, Some(1.23));
  }

  #[test]
  fn processing_time_is_omitted_until_set() {
    let record = ResultRecord {
      filename: "webcam_output_1.jpg".to_string(),
      detected_words: vec!["cat".to_string()],
      translated_texts: vec!["chat".to_string()],
      audio_files: vec!["cat.mp3".to_string()],
      processing_time: None,
    };
    let json = serde_json::to_value(&record).unwrap();
    assert!(json.get("processing_time").is_none());
    assert_eq!(json["detected_words"][0], "cat");

    let json = serde_json::to_value(record.with_processing_time(Duration::from_secs(3))).unwrap();
    assert_eq!(json["processing_time"], 3.0);
  }

  #[test]
  fn pretty_json_uses_four_space_indent() {
    let record = ResultRecord {
      filename: "annotated_cat.jpg".to_string(),
      detected_words: vec!["cat".to_string()],
      translated_texts: vec!["बिल्ली".to_string()],
      audio_files: vec!["cat.mp3".to_string()],
      processing_time: Some(0.42),
    };
    let text = record.to_pretty_json().unwrap();
    assert!(text.starts_with("{\n    \"filename\": \"annotated_cat.jpg\","));
    assert!(text.contains("\n    \"detected_words\": [\n        \"cat\"\n    ],"));
    assert!(text.contains("बिल्ली"));
    let parsed: ResultRecord = serde_json::from_str(&text).unwrap();
    assert_eq!(parsed, record);
  }

  #[test]
  fn alignment_detects_mismatch() {
    let mut record = ResultRecord {
      detected_words: vec!["cat".to_string()],
      translated_texts: vec!["chat".to_string()],
      audio_files: vec!["cat.mp3".to_string()],
      ..ResultRecord::default()
    };
    assert!(record.is_aligned());
    record.audio_files.clear();
    assert!(!record.is_aligned());
  }
}
