// 该文件是 Shenhai （深海） 项目的一部分。
// src/enhance/edge.rs - 边缘估计叠加层
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

use image::{RgbImage, imageops};
use imageproc::edges::canny;

use super::to_u8;

pub const CANNY_LOW: f32 = 50.0;
pub const CANNY_HIGH: f32 = 150.0;

const IMAGE_WEIGHT: f32 = 0.75;
const EDGE_WEIGHT: f32 = 0.8;
// 边缘只写入绿色通道
const EDGE_CHANNEL: usize = 1;

/// 在图像上叠加绿色的 Canny 边缘图，用于确认结构边缘在增强后仍然保留
pub fn overlay_edges(image: RgbImage) -> RgbImage {
  let gray = imageops::grayscale(&image);
  let edges = canny(&gray, CANNY_LOW, CANNY_HIGH);

  let mut out = image;
  for (x, y, px) in out.enumerate_pixels_mut() {
    let edge = edges.get_pixel(x, y)[0] as f32;
    for ch in 0..3 {
      let overlay = if ch == EDGE_CHANNEL { edge } else { 0.0 };
      px[ch] = to_u8(px[ch] as f32 * IMAGE_WEIGHT + overlay * EDGE_WEIGHT);
    }
  }
  out
}
