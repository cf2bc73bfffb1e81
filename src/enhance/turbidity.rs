// 该文件是 Shenhai （深海） 项目的一部分。
// src/enhance/turbidity.rs - 浑浊水体模拟与校正
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

use image::{Rgb, Rgb32FImage, RgbImage};
use imageproc::filter::separable_filter_equal;
use rand::{Rng, SeedableRng, rngs::StdRng};

use super::{MIN_TURBIDITY, to_u8};

// 雾色 (R, G, B)
const HAZE_COLOR: [f32; 3] = [80.0, 110.0, 60.0];
const CONTRAST_PIVOT: f32 = 128.0;
const MIN_DIVISOR: f32 = 0.01;

/// 蓝绿色偏的通道增益 (R, G, B)
fn tint(s: f32) -> [f32; 3] {
  [1.0 + 0.05 * s, 1.0 + 0.25 * s, 1.0 - 0.15 * s]
}

fn contrast(s: f32) -> f32 {
  1.0 - 0.35 * s
}

fn haze(s: f32) -> f32 {
  0.10 + 0.35 * s
}

/// 奇数核尺寸，随强度增大
fn blur_kernel_size(s: f32) -> usize {
  let k = (1.0 + 4.0 * s) as usize;
  if k % 2 == 1 { k } else { k + 1 }
}

/// 与 OpenCV 一致：由核尺寸推算 sigma
fn blur_sigma(k: usize) -> f32 {
  0.3 * ((k as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

/// sigma 为 0 时 OpenCV 的一维高斯核，小尺寸使用固定表
fn blur_kernel(k: usize) -> Vec<f32> {
  match k {
    0 | 1 => vec![1.0],
    3 => vec![0.25, 0.5, 0.25],
    5 => vec![0.0625, 0.25, 0.375, 0.25, 0.0625],
    7 => vec![0.03125, 0.109375, 0.21875, 0.28125, 0.21875, 0.109375, 0.03125],
    _ => {
      let sigma = blur_sigma(k);
      let r = (k / 2) as i32;
      let mut kernel: Vec<f32> = (-r..=r)
        .map(|i| (-((i * i) as f32) / (2.0 * sigma * sigma)).exp())
        .collect();
      let sum: f32 = kernel.iter().sum();
      kernel.iter_mut().for_each(|v| *v /= sum);
      kernel
    }
  }
}

fn noise_sigma(s: f32) -> f32 {
  6.0 + 14.0 * s
}

/// Box-Muller 标准正态采样
fn standard_normal(rng: &mut StdRng) -> f32 {
  let u1: f32 = rng.gen_range(f32::EPSILON..1.0);
  let u2: f32 = rng.r#gen();
  (-2.0 * u1.ln()).sqrt() * (2.0 * std::f32::consts::PI * u2).cos()
}

/// 模拟浑浊的绿水环境：色偏、对比度下降、雾化、模糊与噪声
pub fn simulate_turbidity(image: RgbImage, strength: f32, seed: u64) -> RgbImage {
  let s = strength.clamp(0.0, 1.0);
  if s < MIN_TURBIDITY {
    return image;
  }

  let gains = tint(s);
  let c = contrast(s);
  let h = haze(s);

  let mut degraded = Rgb32FImage::from_fn(image.width(), image.height(), |x, y| {
    let px = image.get_pixel(x, y);
    Rgb([0, 1, 2].map(|ch| {
      let v = px[ch] as f32 * gains[ch];
      let v = (v - CONTRAST_PIVOT) * c + CONTRAST_PIVOT;
      v * (1.0 - h) + HAZE_COLOR[ch] * h
    }))
  });

  let k = blur_kernel_size(s);
  if k > 1 {
    degraded = separable_filter_equal(&degraded, &blur_kernel(k));
  }

  let mut rng = StdRng::seed_from_u64(seed);
  let sigma = noise_sigma(s);
  let mut out = image;
  for (x, y, px) in out.enumerate_pixels_mut() {
    let src = degraded.get_pixel(x, y);
    *px = Rgb([0, 1, 2].map(|ch| to_u8(src[ch] + standard_normal(&mut rng) * sigma)));
  }
  out
}

/// 近似反演：按相同的雾化、对比度、色偏因子依次相除
pub fn correct_turbidity(image: RgbImage, strength: f32) -> RgbImage {
  let s = strength.clamp(0.0, 1.0);
  if s < MIN_TURBIDITY {
    return image;
  }

  let gains = tint(s);
  let c = contrast(s).max(MIN_DIVISOR);
  let h = haze(s);
  let keep = (1.0 - h).max(MIN_DIVISOR);

  let mut out = image;
  for px in out.pixels_mut() {
    for ch in 0..3 {
      let v = px[ch] as f32;
      let v = (v - HAZE_COLOR[ch] * h) / keep;
      let v = (v - CONTRAST_PIVOT) / c + CONTRAST_PIVOT;
      let v = v / gains[ch].max(MIN_DIVISOR);
      px[ch] = to_u8(v);
    }
  }
  out
}
