// 该文件是 Yinyi （译音） 项目的一部分。
// src/input/v4l_input.rs - V4L 视频输入
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

use std::time::Instant;

use image::{ImageFormat, RgbImage};
use thiserror::Error;
use tracing::{error, info};
use url::Url;
use v4l::{
  Device, FourCC, buffer::Type, io::mmap::Stream, io::traits::CaptureStream, video::Capture,
};

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::Frame,
  input::{FrameSource, InputError},
};

const DEFAULT_DEVICE: &str = "/dev/video0";
const BUFFER_COUNT: u32 = 4;

#[derive(Error, Debug)]
pub enum V4lInputError {
  #[error("URI schema mismatch")]
  SchemaMismatch,
  #[error("I/O error: {0}")]
  IoError(#[from] std::io::Error),
  #[error("MJPEG 解码失败: {0}")]
  DecodeError(#[from] image::ImageError),
  #[error("缓冲区大小不匹配: 期望 {expected} 字节, 实际 {actual} 字节")]
  BufferSizeMismatch { expected: usize, actual: usize },
  #[error("Unsupported pixel format: {0}")]
  UnsupportedPixelFormat(String),
}

/// V4L2 摄像头输入
///
/// `v4l:///dev/video0`，优先请求 MJPEG，也接受 YUYV 与 RGB3。
pub struct V4lInput {
  stream: Stream<'static>,
  fourcc: FourCC,
  width: u32,
  height: u32,
  frame_index: u64,
  started: Instant,
  // 保持设备句柄存活
  _device: Device,
}

impl FromUrlWithScheme for V4lInput {
  const SCHEME: &'static str = "v4l";
}

impl FromUrl for V4lInput {
  type Error = V4lInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(V4lInputError::SchemaMismatch);
    }

    let device_path = match crate::url_path(url) {
      path if path.is_empty() || path == "/" => DEFAULT_DEVICE.to_string(),
      path => path,
    };
    Self::open(&device_path)
  }
}

impl V4lInput {
  pub fn open(device_path: &str) -> Result<Self, V4lInputError> {
    info!("打开摄像头: {}", device_path);
    let device = Device::with_path(device_path)?;

    let mut format = device.format()?;
    format.fourcc = FourCC::new(b"MJPG");
    // 驱动可能拒绝 MJPEG 并回落到其他格式
    let format = device.set_format(&format)?;
    info!(
      "摄像头格式: {}x{} {}",
      format.width, format.height, format.fourcc
    );

    let stream = Stream::with_buffers(&device, Type::VideoCapture, BUFFER_COUNT)?;

    Ok(V4lInput {
      stream,
      fourcc: format.fourcc,
      width: format.width,
      height: format.height,
      frame_index: 0,
      started: Instant::now(),
      _device: device,
    })
  }

  fn capture_image(&mut self) -> Result<RgbImage, V4lInputError> {
    let (buf, meta) = self.stream.next()?;
    let data = &buf[..(meta.bytesused as usize).min(buf.len())];

    match &self.fourcc.repr {
      b"MJPG" => Ok(image::load_from_memory_with_format(data, ImageFormat::Jpeg)?.to_rgb8()),
      b"YUYV" => yuyv_to_rgb(data, self.width, self.height),
      b"RGB3" => {
        let expected = (self.width * self.height * 3) as usize;
        if data.len() < expected {
          return Err(V4lInputError::BufferSizeMismatch {
            expected,
            actual: data.len(),
          });
        }
        RgbImage::from_raw(self.width, self.height, data[..expected].to_vec()).ok_or(
          V4lInputError::BufferSizeMismatch {
            expected,
            actual: data.len(),
          },
        )
      }
      _ => Err(V4lInputError::UnsupportedPixelFormat(self.fourcc.to_string())),
    }
  }
}

impl FrameSource for V4lInput {
  fn read_frame(&mut self) -> Result<Frame, InputError> {
    let image = self.capture_image().inspect_err(|e| {
      error!("Failed to capture frame: {}", e);
    })?;
    self.frame_index += 1;
    let timestamp_ms = self.started.elapsed().as_millis() as u64;
    Ok(Frame::new(image).with_index(self.frame_index, timestamp_ms))
  }
}

/// YUYV (YUV 4:2:2) 转 RGB，BT.601
fn yuyv_to_rgb(data: &[u8], width: u32, height: u32) -> Result<RgbImage, V4lInputError> {
  let expected = (width * height * 2) as usize;
  if data.len() < expected {
    return Err(V4lInputError::BufferSizeMismatch {
      expected,
      actual: data.len(),
    });
  }

  let mut rgb = Vec::with_capacity((width * height * 3) as usize);
  for chunk in data[..expected].chunks_exact(4) {
    let (y0, u, y1, v) = (chunk[0], chunk[1], chunk[2], chunk[3]);
    for y in [y0, y1] {
      rgb.extend_from_slice(&yuv_pixel(y, u, v));
    }
  }

  RgbImage::from_raw(width, height, rgb).ok_or(V4lInputError::BufferSizeMismatch {
    expected,
    actual: data.len(),
  })
}

fn yuv_pixel(y: u8, u: u8, v: u8) -> [u8; 3] {
  let c = y as f32 - 16.0;
  let d = u as f32 - 128.0;
  let e = v as f32 - 128.0;
  let r = 1.164 * c + 1.596 * e;
  let g = 1.164 * c - 0.392 * d - 0.813 * e;
  let b = 1.164 * c + 2.017 * d;
  [
    r.round().clamp(0.0, 255.0) as u8,
    g.round().clamp(0.0, 255.0) as u8,
    b.round().clamp(0.0, 255.0) as u8,
  ]
}
