// 该文件是 Yinyi （译音） 项目的一部分。
// src/output/draw.rs - 目标检测结果可视化
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

use std::path::Path;

use ab_glyph::{FontArc, PxScale};
use image::{Rgb, RgbImage};
use imageproc::{
  drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size},
  rect::Rect,
};
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
  frame::Frame,
  model::{DetectItem, DetectResult},
};

// 文本渲染常量
const LABEL_FONT_SIZE: f32 = 16.0;
const LABEL_TEXT_HEIGHT: i32 = 20;
const LABEL_CHAR_WIDTH: f32 = 9.0; // 无字体时的每字符宽度估计
const LABEL_TEXT_VERTICAL_PADDING: i32 = 2;
// 标签放在框上方所需的最小上边距
const LABEL_MIN_MARGIN: i32 = 10;
const BOX_THICKNESS: i32 = 2;
const BOX_COLOR: [u8; 3] = [0, 255, 0]; // 绿色
const TEXT_COLOR: [u8; 3] = [0, 0, 0]; // 黑色

const SYSTEM_FONT_CANDIDATES: &[&str] = &[
  "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
  "/usr/share/fonts/TTF/DejaVuSans.ttf",
  "/usr/share/fonts/dejavu/DejaVuSans.ttf",
  "/Library/Fonts/Arial.ttf",
  "C:\\Windows\\Fonts\\arial.ttf",
];

#[derive(Error, Debug)]
pub enum DrawError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("字体无效: {0}")]
  InvalidFont(#[from] ab_glyph::InvalidFont),
}

/// 检测框与标签绘制
///
/// 没有可用字体时只绘制框与标签底色，不绘制文字。
pub struct Annotator {
  font: Option<FontArc>,
  font_size: f32,
  label_text_height: i32,
  label_char_width: f32,
  label_text_vertical_padding: i32,
  box_color: [u8; 3],
  text_color: [u8; 3],
}

impl Default for Annotator {
  fn default() -> Self {
    Self {
      font: None,
      font_size: LABEL_FONT_SIZE,
      label_text_height: LABEL_TEXT_HEIGHT,
      label_char_width: LABEL_CHAR_WIDTH,
      label_text_vertical_padding: LABEL_TEXT_VERTICAL_PADDING,
      box_color: BOX_COLOR,
      text_color: TEXT_COLOR,
    }
  }
}

impl Annotator {
  pub fn with_font_file(path: &Path) -> Result<Self, DrawError> {
    let data = std::fs::read(path)?;
    let font = FontArc::try_from_vec(data)?;
    debug!("加载标签字体: {}", path.display());
    Ok(Self {
      font: Some(font),
      ..Self::default()
    })
  }

  /// 依次尝试常见系统字体
  pub fn with_system_font() -> Self {
    for candidate in SYSTEM_FONT_CANDIDATES {
      let path = Path::new(candidate);
      if path.is_file()
        && let Ok(annotator) = Self::with_font_file(path)
      {
        return annotator;
      }
    }
    warn!("未找到可用字体，标签将不绘制文字");
    Self::default()
  }

  /// 在帧的副本上绘制全部检测结果
  pub fn annotate(&self, frame: &Frame, result: &DetectResult) -> Frame {
    let mut annotated = frame.clone();
    for item in result.iter() {
      self.draw_item(&mut annotated.image, item);
    }
    annotated
  }

  /// 绘制单个检测框及其 `"{label} {score:.2}"` 标签
  pub fn draw_item(&self, image: &mut RgbImage, item: &DetectItem) {
    let (w, h) = (image.width() as i32, image.height() as i32);
    if w == 0 || h == 0 {
      return;
    }

    let x_min = (item.bbox[0].floor() as i32).clamp(0, w - 1);
    let y_min = (item.bbox[1].floor() as i32).clamp(0, h - 1);
    let x_max = (item.bbox[2].ceil() as i32).clamp(0, w - 1);
    let y_max = (item.bbox[3].ceil() as i32).clamp(0, h - 1);

    if x_min >= x_max || y_min >= y_max {
      return;
    }

    let box_color = Rgb(self.box_color);
    for t in 0..BOX_THICKNESS {
      let width = x_max - x_min + 1 - 2 * t;
      let height = y_max - y_min + 1 - 2 * t;
      if width <= 0 || height <= 0 {
        break;
      }
      let rect = Rect::at(x_min + t, y_min + t).of_size(width as u32, height as u32);
      draw_hollow_rect_mut(image, rect, box_color);
    }

    let label = format!("{} {:.2}", item.label, item.score);
    let scale = PxScale::from(self.font_size);

    let text_width = match &self.font {
      Some(font) => text_size(scale, font, &label).0 as i32,
      None => (label.chars().count() as f32 * self.label_char_width) as i32,
    };
    let text_height = self.label_text_height;

    // 上方留白足够时标签底边距框顶 LABEL_MIN_MARGIN，否则放到框内同样距离处
    let label_x = x_min;
    let (label_y, label_bottom) = if y_min - LABEL_MIN_MARGIN > LABEL_MIN_MARGIN {
      let bottom = y_min - LABEL_MIN_MARGIN;
      ((bottom - text_height).max(0), bottom)
    } else {
      let top = (y_min + LABEL_MIN_MARGIN).min((h - text_height).max(0));
      (top, (top + text_height).min(h))
    };

    let label_width = text_width.min(w - label_x).max(0) as u32;
    let label_height = (label_bottom - label_y).max(0) as u32;
    if label_width == 0 || label_height == 0 {
      return;
    }

    let rect = Rect::at(label_x, label_y).of_size(label_width, label_height);
    draw_filled_rect_mut(image, rect, box_color);

    if let Some(font) = &self.font {
      draw_text_mut(
        image,
        Rgb(self.text_color),
        label_x,
        label_y + self.label_text_vertical_padding,
        scale,
        font,
        &label,
      );
    }
  }
}
