// 该文件是 Yinyi （译音） 项目的一部分。
// src/output/sink.rs - 输出目录
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

use image::RgbImage;
use tracing::{debug, info};

use crate::output::record::{RecordError, ResultRecord};

/// 所有产物（标注图像、音频、JSON）的写入位置
///
/// 同名文件总是被覆盖；不同会话可用 [`OutputSink::session`] 隔离。
#[derive(Debug, Clone)]
pub struct OutputSink {
  base: PathBuf,
}

impl OutputSink {
  pub fn new(base: impl Into<PathBuf>) -> Self {
    Self { base: base.into() }
  }

  pub fn base(&self) -> &Path {
    &self.base
  }

  /// 子目录输出
  pub fn session(&self, name: &str) -> Self {
    Self::new(self.base.join(name))
  }

  pub fn ensure(&self) -> Result<(), RecordError> {
    if !self.base.exists() {
      std::fs::create_dir_all(&self.base)?;
      debug!("创建输出目录: {}", self.base.display());
    }
    Ok(())
  }

  pub fn path(&self, name: &str) -> PathBuf {
    self.base.join(name)
  }

  pub fn write_bytes(&self, name: &str, bytes: &[u8]) -> Result<PathBuf, RecordError> {
    self.ensure()?;
    let path = self.path(name);
    std::fs::write(&path, bytes)?;
    Ok(path)
  }

  pub fn save_image(&self, name: &str, image: &RgbImage) -> Result<PathBuf, RecordError> {
    self.ensure()?;
    let path = self.path(name);
    image.save(&path)?;
    info!("保存图像到文件: {}", path.display());
    Ok(path)
  }

  /// 先完整序列化再写入，序列化失败不会留下残缺文件
  pub fn save_record(&self, name: &str, record: &ResultRecord) -> Result<PathBuf, RecordError> {
    let json = serde_json::to_vec(record)?;
    let path = self.write_bytes(name, &json)?;
    info!("JSON 文件已保存: {}", path.display());
    Ok(path)
  }

  pub fn load_record(&self, name: &str) -> Result<ResultRecord, RecordError> {
    let data = std::fs::read(self.path(name))?;
    Ok(serde_json::from_slice(&data)?)
  }
}
