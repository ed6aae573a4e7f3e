// 该文件是 Yinyi （译音） 项目的一部分。
// src/translate.rs - 标签翻译
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

use std::time::Duration;

use reqwest::blocking::Client;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::config::Config;

/// 文本翻译接口
///
/// 每次调用都是一次独立请求，不做缓存。
pub trait Translator {
  fn translate(&self, text: &str, language: &str) -> Result<String, TranslateError>;
}

#[derive(Error, Debug)]
pub enum TranslateError {
  #[error("HTTP 请求失败: {0}")]
  HttpError(#[from] reqwest::Error),
  #[error("翻译服务返回状态 {status}: {body}")]
  ServiceError {
    status: reqwest::StatusCode,
    body: String,
  },
  #[error("JSON 解析失败: {0}")]
  JsonError(#[from] serde_json::Error),
  #[error("翻译结果格式异常")]
  MalformedResponse,
}

/// Google 翻译网页接口
pub struct GoogleTranslator {
  client: Client,
  endpoint: String,
}

impl GoogleTranslator {
  pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, TranslateError> {
    let client = Client::builder().timeout(timeout).build()?;
    Ok(Self {
      client,
      endpoint: endpoint.into(),
    })
  }

  pub fn from_config(config: &Config) -> Result<Self, TranslateError> {
    Self::new(config.translate_endpoint.clone(), config.timeout)
  }
}

impl Translator for GoogleTranslator {
  fn translate(&self, text: &str, language: &str) -> Result<String, TranslateError> {
    debug!("请求翻译: {} -> {}", text, language);
    let response = self
      .client
      .get(&self.endpoint)
      .query(&[
        ("client", "gtx"),
        ("sl", "auto"),
        ("tl", language),
        ("dt", "t"),
        ("q", text),
      ])
      .send()?;

    let status = response.status();
    let body = response.text()?;
    if !status.is_success() {
      return Err(TranslateError::ServiceError { status, body });
    }
    parse_response(&body)
  }
}

/// 响应形如 `[[["chat","cat",null,null,10]],null,"en",...]`，按分段拼接译文
fn parse_response(body: &str) -> Result<String, TranslateError> {
  let value: Value = serde_json::from_str(body)?;
  let segments = value
    .get(0)
    .and_then(Value::as_array)
    .ok_or(TranslateError::MalformedResponse)?;

  let text = segments
    .iter()
    .filter_map(|segment| segment.get(0).and_then(Value::as_str))
    .collect::<String>();
  if text.is_empty() {
    return Err(TranslateError::MalformedResponse);
  }
  Ok(text)
}
