// 该文件是 Yinyi （译音） 项目的一部分。
// src/speech.rs - 语音合成
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

use reqwest::blocking::Client;
use thiserror::Error;
use tracing::debug;

use crate::config::Config;

// 单次请求的最大字符数
const TTS_MAX_CHARS: usize = 100;

/// 语音合成接口，把音频写到 `destination`，已存在则覆盖
pub trait SpeechSynthesizer {
  fn synthesize(&self, text: &str, language: &str, destination: &Path) -> Result<(), SpeechError>;
}

#[derive(Error, Debug)]
pub enum SpeechError {
  #[error("HTTP 请求失败: {0}")]
  HttpError(#[from] reqwest::Error),
  #[error("语音服务返回状态 {0}")]
  ServiceError(reqwest::StatusCode),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("没有可朗读的文本")]
  EmptyText,
}

/// Google 翻译朗读接口，返回 MP3
pub struct GoogleTts {
  client: Client,
  endpoint: String,
}

impl GoogleTts {
  pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, SpeechError> {
    let client = Client::builder().timeout(timeout).build()?;
    Ok(Self {
      client,
      endpoint: endpoint.into(),
    })
  }

  pub fn from_config(config: &Config) -> Result<Self, SpeechError> {
    Self::new(config.tts_endpoint.clone(), config.timeout)
  }

  fn fetch(
    &self,
    chunk: &str,
    language: &str,
    idx: usize,
    total: usize,
  ) -> Result<Vec<u8>, SpeechError> {
    let idx = idx.to_string();
    let total = total.to_string();
    let textlen = chunk.chars().count().to_string();
    let response = self
      .client
      .get(&self.endpoint)
      .query(&[
        ("ie", "UTF-8"),
        ("client", "tw-ob"),
        ("tl", language),
        ("q", chunk),
        ("idx", idx.as_str()),
        ("total", total.as_str()),
        ("textlen", textlen.as_str()),
      ])
      .send()?;

    let status = response.status();
    if !status.is_success() {
      return Err(SpeechError::ServiceError(status));
    }
    Ok(response.bytes()?.to_vec())
  }
}

impl SpeechSynthesizer for GoogleTts {
  fn synthesize(&self, text: &str, language: &str, destination: &Path) -> Result<(), SpeechError> {
    let chunks = split_text(text, TTS_MAX_CHARS);
    if chunks.is_empty() {
      return Err(SpeechError::EmptyText);
    }

    // MP3 帧可以直接首尾拼接
    let mut audio = Vec::new();
    for (idx, chunk) in chunks.iter().enumerate() {
      audio.extend(self.fetch(chunk, language, idx, chunks.len())?);
    }
    std::fs::write(destination, audio)?;
    debug!("音频已写入: {}", destination.display());
    Ok(())
  }
}

/// 按空白把文本切成不超过 `max_chars` 个字符的片段，超长单词硬切
fn split_text(text: &str, max_chars: usize) -> Vec<String> {
  let mut chunks = Vec::new();
  let mut current = String::new();

  for word in text.split_whitespace() {
    let mut word = word;
    while word.chars().count() > max_chars {
      if !current.is_empty() {
        chunks.push(std::mem::take(&mut current));
      }
      let split = word
        .char_indices()
        .nth(max_chars)
        .map(|(i, _)| i)
        .unwrap_or(word.len());
      chunks.push(word[..split].to_string());
      word = &word[split..];
    }
    if word.is_empty() {
      continue;
    }

    let extra = if current.is_empty() { 0 } else { 1 };
    if current.chars().count() + extra + word.chars().count() > max_chars {
      chunks.push(std::mem::take(&mut current));
    }
    if !current.is_empty() {
      current.push(' ');
    }
    current.push_str(word);
  }

  if !current.is_empty() {
    chunks.push(current);
  }
  chunks
}
