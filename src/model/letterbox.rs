// 该文件是 Yinyi （译音） 项目的一部分。
// src/model/letterbox.rs - 模型输入预处理
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

use image::RgbImage;
use ndarray::Array4;

// YOLO 约定的填充灰度
const PAD_VALUE: f32 = 114.0 / 255.0;

/// 等比缩放并填充到正方形输入，记录坐标映射参数
pub struct Letterbox {
  /// NCHW float32，取值 [0, 1]
  pub tensor: Array4<f32>,
  pub scale: f32,
  pub pad_x: u32,
  pub pad_y: u32,
  frame_width: u32,
  frame_height: u32,
}

impl Letterbox {
  pub fn new(image: &RgbImage, target_size: u32) -> Self {
    let (fw, fh) = image.dimensions();
    let target = target_size as f32;

    let scale = (target / fw as f32).min(target / fh as f32);
    let new_w = ((fw as f32 * scale).round() as u32).min(target_size);
    let new_h = ((fh as f32 * scale).round() as u32).min(target_size);
    let pad_x = (target_size - new_w) / 2;
    let pad_y = (target_size - new_h) / 2;

    let size = target_size as usize;
    let mut tensor = Array4::<f32>::from_elem((1, 3, size, size), PAD_VALUE);

    // 最近邻缩放
    for y in 0..new_h {
      let src_y = ((y as f32 / scale) as u32).min(fh - 1);
      for x in 0..new_w {
        let src_x = ((x as f32 / scale) as u32).min(fw - 1);
        let pixel = image.get_pixel(src_x, src_y);
        let ty = (pad_y + y) as usize;
        let tx = (pad_x + x) as usize;
        for c in 0..3 {
          tensor[[0, c, ty, tx]] = pixel[c] as f32 / 255.0;
        }
      }
    }

    Self {
      tensor,
      scale,
      pad_x,
      pad_y,
      frame_width: fw,
      frame_height: fh,
    }
  }

  /// 将模型输入坐标系下的框映射回原始帧像素坐标，并裁剪到帧内
  pub fn to_frame(&self, bbox: [f32; 4]) -> [f32; 4] {
    let w = self.frame_width as f32;
    let h = self.frame_height as f32;
    [
      ((bbox[0] - self.pad_x as f32) / self.scale).clamp(0.0, w),
      ((bbox[1] - self.pad_y as f32) / self.scale).clamp(0.0, h),
      ((bbox[2] - self.pad_x as f32) / self.scale).clamp(0.0, w),
      ((bbox[3] - self.pad_y as f32) / self.scale).clamp(0.0, h),
    ]
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use approx::assert_abs_diff_eq;
  use image::Rgb;

  #[test]
  fn wide_frame_is_padded_vertically() {
    let image = RgbImage::from_pixel(200, 100, Rgb([255, 255, 255]));
    let letterbox = Letterbox::new(&image, 640);

    assert_eq!(letterbox.tensor.shape(), &[1, 3, 640, 640]);
    assert_abs_diff_eq!(letterbox.scale, 3.2, epsilon = 1e-4);
    assert_eq!(letterbox.pad_x, 0);
    assert_eq!(letterbox.pad_y, 160);

    assert_abs_diff_eq!(letterbox.tensor[[0, 0, 0, 0]], PAD_VALUE, epsilon = 1e-6);
    assert_abs_diff_eq!(letterbox.tensor[[0, 1, 161, 1]], 1.0, epsilon = 1e-6);
  }

  #[test]
  fn square_frame_has_no_padding() {
    let image = RgbImage::new(256, 256);
    let letterbox = Letterbox::new(&image, 640);
    assert_eq!((letterbox.pad_x, letterbox.pad_y), (0, 0));
    assert_abs_diff_eq!(letterbox.scale, 2.5, epsilon = 1e-6);
  }

  #[test]
  fn boxes_map_back_to_frame_pixels() {
    let image = RgbImage::new(200, 100);
    let letterbox = Letterbox::new(&image, 640);
    // 模型坐标 (32, 192)-(160, 320) => 帧坐标 (10, 10)-(50, 50)
    let bbox = letterbox.to_frame([32.0, 192.0, 160.0, 320.0]);
    assert_abs_diff_eq!(bbox[0], 10.0, epsilon = 1e-3);
    assert_abs_diff_eq!(bbox[1], 10.0, epsilon = 1e-3);
    assert_abs_diff_eq!(bbox[2], 50.0, epsilon = 1e-3);
    assert_abs_diff_eq!(bbox[3], 50.0, epsilon = 1e-3);
  }

  #[test]
  fn boxes_are_clamped_to_frame() {
    let image = RgbImage::new(100, 100);
    let letterbox = Letterbox::new(&image, 100);
    let bbox = letterbox.to_frame([-5.0, -5.0, 150.0, 120.0]);
    assert_eq!(bbox, [0.0, 0.0, 100.0, 100.0]);
  }
}
