// 该文件是 Shenhai （深海） 项目的一部分。
// src/heatmap.rs - 风险密度热力图
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

use image::{ImageBuffer, Luma, Rgb, RgbImage};
use imageproc::filter::separable_filter_equal;
use tracing::debug;

use crate::detection::{Detection, severity_or_default};
use crate::enhance::to_u8;

/// 单通道浮点风险密度
pub type DensityGrid = ImageBuffer<Luma<f32>, Vec<f32>>;

/// 底图亮度保留比例
pub const BACKGROUND_BRIGHTNESS: f32 = 0.4;
/// 热力层不透明度
pub const OVERLAY_ALPHA: f32 = 0.62;
pub const MIN_SIGMA: f32 = 30.0;
pub const SIGMA_PER_SIDE: f32 = 0.35;
const TRUNCATE: f32 = 4.0;

// plasma 色带，等间距控制点
const PLASMA: [[u8; 3]; 11] = [
  [13, 8, 135],
  [65, 4, 157],
  [106, 0, 168],
  [143, 13, 164],
  [177, 42, 144],
  [204, 71, 120],
  [225, 100, 98],
  [242, 132, 75],
  [252, 166, 54],
  [252, 206, 37],
  [240, 249, 33],
];

/// 将 [0, 1] 的值映射到 plasma 色带
pub fn plasma(value: f32) -> Rgb<u8> {
  let t = value.clamp(0.0, 1.0) * (PLASMA.len() - 1) as f32;
  let i = (t.floor() as usize).min(PLASMA.len() - 2);
  let frac = t - i as f32;
  let (a, b) = (PLASMA[i], PLASMA[i + 1]);
  Rgb([0, 1, 2].map(|c| to_u8(a[c] as f32 + (b[c] as f32 - a[c] as f32) * frac)))
}

/// 平均检测尺寸越大，风险扩散半径越大
pub fn adaptive_sigma(detections: &[Detection]) -> f32 {
  if detections.is_empty() {
    return MIN_SIGMA;
  }
  let mean_area =
    detections.iter().map(|d| d.area().max(0) as f64).sum::<f64>() / detections.len() as f64;
  ((mean_area.sqrt() as f32) * SIGMA_PER_SIDE).max(MIN_SIGMA)
}

/// 截断在 truncate * sigma 处的归一化高斯核
fn gaussian_kernel(sigma: f32) -> Vec<f32> {
  let radius = (TRUNCATE * sigma + 0.5).floor() as i32;
  let denom = 2.0 * sigma * sigma;
  let mut kernel: Vec<f32> = (-radius..=radius)
    .map(|i| (-((i * i) as f32) / denom).exp())
    .collect();
  let sum: f32 = kernel.iter().sum();
  kernel.iter_mut().for_each(|k| *k /= sum);
  kernel
}

fn peak(grid: &DensityGrid) -> f32 {
  grid.pixels().map(|p| p[0]).fold(0.0, f32::max)
}

/// 每个检测把等级权重累加到其中心像素
pub fn density_grid(width: u32, height: u32, detections: &[Detection]) -> DensityGrid {
  let mut grid = DensityGrid::new(width, height);
  if width == 0 || height == 0 {
    return grid;
  }
  for d in detections {
    let (cx, cy) = d.center();
    let x = cx.clamp(0, width as i64 - 1) as u32;
    let y = cy.clamp(0, height as i64 - 1) as u32;
    grid.get_pixel_mut(x, y)[0] += severity_or_default(d).weight() as f32;
  }
  grid
}

fn darken(image: &RgbImage) -> RgbImage {
  let mut out = image.clone();
  for px in out.pixels_mut() {
    for ch in 0..3 {
      px[ch] = to_u8(px[ch] as f32 * BACKGROUND_BRIGHTNESS);
    }
  }
  out
}

/// 生成与输入同尺寸的风险热力图
pub fn build_heatmap(image: &RgbImage, detections: &[Detection]) -> RgbImage {
  let (w, h) = image.dimensions();
  let mut out = darken(image);

  let grid = density_grid(w, h, detections);
  if peak(&grid) <= 0.0 {
    debug!("热力网格为空，仅返回暗化底图");
    return out;
  }

  // 合法检测框的 sigma 不会超过图像长边
  let sigma = adaptive_sigma(detections).min((w.max(h) as f32).max(MIN_SIGMA));
  debug!("热力图模糊 sigma = {:.1}", sigma);
  let blurred = separable_filter_equal(&grid, &gaussian_kernel(sigma));
  let top = peak(&blurred);
  if top <= 0.0 {
    return out;
  }

  for (x, y, px) in out.enumerate_pixels_mut() {
    // 先量化到 0..=255，再查色带
    let level = (blurred.get_pixel(x, y)[0] / top * 255.0) as u8;
    let color = plasma(level as f32 / 255.0);
    for ch in 0..3 {
      px[ch] = to_u8(px[ch] as f32 * (1.0 - OVERLAY_ALPHA) + color[ch] as f32 * OVERLAY_ALPHA);
    }
  }
  out
}
