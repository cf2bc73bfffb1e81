// 该文件是 Shenhai （深海） 项目的一部分。
// src/enhance/color.rs - 绿水色偏校正
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

use super::to_u8;

pub const GREEN_WATER_STRENGTH: f32 = 0.6;

/// 通道增益 (R, G, B)：略增红色，增强绿色，削弱蓝色
fn gains(s: f32) -> [f32; 3] {
  [1.0 + 0.15 * s, 1.0 + 0.4 * s, 1.0 - 0.3 * s]
}

pub fn correct_green_water(image: RgbImage, strength: f32) -> RgbImage {
  let g = gains(strength);
  let mut out = image;
  for px in out.pixels_mut() {
    for ch in 0..3 {
      px[ch] = to_u8(px[ch] as f32 * g[ch]);
    }
  }
  out
}
