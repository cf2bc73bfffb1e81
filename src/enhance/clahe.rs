// 该文件是 Shenhai （深海） 项目的一部分。
// src/enhance/clahe.rs - 亮度通道上的限制对比度自适应直方图均衡
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

use image::{GrayImage, Luma, Rgb, RgbImage};

use super::to_u8;

pub const CLAHE_GRID: u32 = 8;

const HIST_SIZE: usize = 256;

// D65 白点
const WHITE: [f32; 3] = [0.950_456, 1.0, 1.088_754];
const EPSILON: f32 = 0.008_856;
const KAPPA: f32 = 903.3;

fn srgb_to_linear(c: u8) -> f32 {
  let c = c as f32 / 255.0;
  if c <= 0.040_45 {
    c / 12.92
  } else {
    ((c + 0.055) / 1.055).powf(2.4)
  }
}

fn linear_to_srgb(c: f32) -> u8 {
  let c = c.clamp(0.0, 1.0);
  let v = if c <= 0.003_130_8 {
    c * 12.92
  } else {
    1.055 * c.powf(1.0 / 2.4) - 0.055
  };
  to_u8(v * 255.0)
}

fn lab_f(t: f32) -> f32 {
  if t > EPSILON {
    t.cbrt()
  } else {
    7.787 * t + 16.0 / 116.0
  }
}

fn lab_f_inv(t: f32) -> f32 {
  let t3 = t * t * t;
  if t3 > EPSILON {
    t3
  } else {
    (t - 16.0 / 116.0) / 7.787
  }
}

/// sRGB -> CIE L*a*b*，L 在 [0, 100]
pub fn rgb_to_lab(px: Rgb<u8>) -> [f32; 3] {
  let [r, g, b] = px.0.map(srgb_to_linear);
  let x = (0.412_453 * r + 0.357_580 * g + 0.180_423 * b) / WHITE[0];
  let y = (0.212_671 * r + 0.715_160 * g + 0.072_169 * b) / WHITE[1];
  let z = (0.019_334 * r + 0.119_193 * g + 0.950_227 * b) / WHITE[2];

  let (fx, fy, fz) = (lab_f(x), lab_f(y), lab_f(z));
  let l = if y > EPSILON { 116.0 * fy - 16.0 } else { KAPPA * y };
  [l, 500.0 * (fx - fy), 200.0 * (fy - fz)]
}

pub fn lab_to_rgb(lab: [f32; 3]) -> Rgb<u8> {
  let [l, a, b] = lab;
  let y = if l > KAPPA * EPSILON {
    lab_f_inv((l + 16.0) / 116.0)
  } else {
    l / KAPPA
  };
  let fy = lab_f(y);
  let x = lab_f_inv(fy + a / 500.0) * WHITE[0];
  let z = lab_f_inv(fy - b / 200.0) * WHITE[2];

  let r = 3.240_479 * x - 1.537_150 * y - 0.498_535 * z;
  let g = -0.969_256 * x + 1.875_992 * y + 0.041_556 * z;
  let bl = 0.055_648 * x - 0.204_043 * y + 1.057_311 * z;
  Rgb([linear_to_srgb(r), linear_to_srgb(g), linear_to_srgb(bl)])
}

/// 单个网格块的映射表
fn tile_lut(hist: &mut [u32; HIST_SIZE], area: u32, clip_limit: f32) -> [u8; HIST_SIZE] {
  let limit = ((clip_limit * area as f32 / HIST_SIZE as f32) as u32).max(1);

  let mut excess = 0u32;
  for bin in hist.iter_mut() {
    if *bin > limit {
      excess += *bin - limit;
      *bin = limit;
    }
  }

  // 多余部分均匀回填，余数按步长分散
  let batch = excess / HIST_SIZE as u32;
  let residual = (excess % HIST_SIZE as u32) as usize;
  hist.iter_mut().for_each(|bin| *bin += batch);
  if residual > 0 {
    let step = (HIST_SIZE / residual).max(1);
    for bin in hist.iter_mut().step_by(step).take(residual) {
      *bin += 1;
    }
  }

  let scale = 255.0 / area.max(1) as f32;
  let mut lut = [0u8; HIST_SIZE];
  let mut sum = 0u32;
  for (i, bin) in hist.iter().enumerate() {
    sum += bin;
    lut[i] = to_u8(sum as f32 * scale);
  }
  lut
}

/// 对单通道图像执行 CLAHE
pub fn clahe(gray: &GrayImage, clip_limit: f32, grid: u32) -> GrayImage {
  let (w, h) = gray.dimensions();
  if w == 0 || h == 0 {
    return gray.clone();
  }
  let nx = grid.clamp(1, w);
  let ny = grid.clamp(1, h);
  let tile_w = w as f32 / nx as f32;
  let tile_h = h as f32 / ny as f32;
  let bound = |i: u32, size: f32| (i as f32 * size).floor() as u32;

  let mut luts = vec![[0u8; HIST_SIZE]; (nx * ny) as usize];
  for ty in 0..ny {
    for tx in 0..nx {
      let (x0, x1) = (bound(tx, tile_w), bound(tx + 1, tile_w).min(w));
      let (y0, y1) = (bound(ty, tile_h), bound(ty + 1, tile_h).min(h));
      let mut hist = [0u32; HIST_SIZE];
      for y in y0..y1 {
        for x in x0..x1 {
          hist[gray.get_pixel(x, y)[0] as usize] += 1;
        }
      }
      let area = (x1 - x0) * (y1 - y0);
      luts[(ty * nx + tx) as usize] = tile_lut(&mut hist, area, clip_limit);
    }
  }

  // 相邻四块映射表之间双线性插值
  let neighbours = |pos: u32, size: f32, n: u32| {
    let f = (pos as f32 + 0.5) / size - 0.5;
    let i0 = f.floor();
    let t = f - i0;
    let clamp = |i: f32| (i.max(0.0) as u32).min(n - 1);
    (clamp(i0), clamp(i0 + 1.0), t)
  };

  GrayImage::from_fn(w, h, |x, y| {
    let v = gray.get_pixel(x, y)[0] as usize;
    let (tx0, tx1, xa) = neighbours(x, tile_w, nx);
    let (ty0, ty1, ya) = neighbours(y, tile_h, ny);
    let lut = |tx: u32, ty: u32| luts[(ty * nx + tx) as usize][v] as f32;
    let top = lut(tx0, ty0) * (1.0 - xa) + lut(tx1, ty0) * xa;
    let bottom = lut(tx0, ty1) * (1.0 - xa) + lut(tx1, ty1) * xa;
    Luma([to_u8(top * (1.0 - ya) + bottom * ya)])
  })
}

/// 转到 Lab 空间，只均衡亮度通道，再转回 RGB
pub fn equalize_local_contrast(image: RgbImage, clip_limit: f32, grid: u32) -> RgbImage {
  let (w, h) = image.dimensions();
  let labs: Vec<[f32; 3]> = image.pixels().map(|p| rgb_to_lab(*p)).collect();

  let lightness = GrayImage::from_fn(w, h, |x, y| {
    Luma([to_u8(labs[(y * w + x) as usize][0] * 255.0 / 100.0)])
  });
  let equalized = clahe(&lightness, clip_limit, grid);

  let mut out = image;
  for (x, y, px) in out.enumerate_pixels_mut() {
    let [_, a, b] = labs[(y * w + x) as usize];
    let l = equalized.get_pixel(x, y)[0] as f32 * 100.0 / 255.0;
    *px = lab_to_rgb([l, a, b]);
  }
  out
}

#[cfg(test)]
mod tests {
  use super::*;

  fn std_dev(values: impl Iterator<Item = f32> + Clone) -> f32 {
    let n = values.clone().count() as f32;
    let mean = values.clone().sum::<f32>() / n;
    (values.map(|v| (v - mean).powi(2)).sum::<f32>() / n).sqrt()
  }

  #[test]
  fn lab_round_trip_is_close() {
    for px in [
      Rgb([0, 0, 0]),
      Rgb([255, 255, 255]),
      Rgb([30, 140, 90]),
      Rgb([200, 20, 60]),
    ] {
      let back = lab_to_rgb(rgb_to_lab(px));
      for c in 0..3 {
        assert!((back[c] as i32 - px[c] as i32).abs() <= 1, "{:?} -> {:?}", px, back);
      }
    }
    let white = rgb_to_lab(Rgb([255, 255, 255]));
    assert!((white[0] - 100.0).abs() < 0.1);
    assert!(white[1].abs() < 0.5 && white[2].abs() < 0.5);
  }

  #[test]
  fn clahe_stretches_low_contrast_tiles() {
    let gray = GrayImage::from_fn(64, 64, |x, y| Luma([100 + ((x + y) % 8) as u8]));
    let out = clahe(&gray, 4.0, 8);
    let before = std_dev(gray.pixels().map(|p| p[0] as f32));
    let after = std_dev(out.pixels().map(|p| p[0] as f32));
    assert!(after > before * 2.0);
  }

  #[test]
  fn clip_limit_bounds_amplification() {
    let gray = GrayImage::from_fn(64, 64, |x, y| Luma([100 + ((x * 3 + y) % 8) as u8]));
    let gentle = clahe(&gray, 1.0, 8);
    let strong = clahe(&gray, 8.0, 8);
    let spread = |img: &GrayImage| std_dev(img.pixels().map(|p| p[0] as f32));
    assert!(spread(&strong) >= spread(&gentle));
  }

  #[test]
  fn handles_images_smaller_than_grid() {
    let gray = GrayImage::from_fn(3, 5, |x, y| Luma([(x * 40 + y * 10) as u8]));
    let out = clahe(&gray, 3.0, 8);
    assert_eq!(out.dimensions(), (3, 5));
  }

  #[test]
  fn colour_image_keeps_dimensions() {
    let image = RgbImage::from_fn(40, 30, |x, y| Rgb([(x * 6) as u8, 90, (y * 8) as u8]));
    let out = equalize_local_contrast(image, 3.0, CLAHE_GRID);
    assert_eq!(out.dimensions(), (40, 30));
  }
}
