// 该文件是 Shenhai （深海） 项目的一部分。
// src/annotate.rs - 检测结果标注
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
use chrono::NaiveDateTime;
use image::{DynamicImage, Rgb, RgbImage, Rgba, RgbaImage};
use imageproc::drawing::{
  Blend, draw_filled_circle_mut, draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut,
  text_size,
};
use imageproc::rect::Rect;
use tracing::{debug, warn};

use crate::detection::{Detection, severity_or_default};

// 文本渲染常量
const LABEL_FONT_SIZE: f32 = 16.0;
const WATERMARK_FONT_SIZE: f32 = 12.0;
const LABEL_TEXT_COLOR: [u8; 3] = [10, 20, 30];
const WATERMARK_TEXT_COLOR: [u8; 4] = [76, 201, 255, 220];
const WATERMARK_BAR_COLOR: [u8; 4] = [5, 12, 26, 210];
const WATERMARK_BAR_HEIGHT: u32 = 22;
const WATERMARK_BRAND: &str = "Shenhai";

// 透明度
const FILL_ALPHA: u8 = 35;
const OUTLINE_ALPHA: u8 = 210;
const BADGE_ALPHA: u8 = 200;

const CORNER_LENGTH: i32 = 14;
const CORNER_WIDTH: u32 = 3;
const OUTLINE_WIDTH: i32 = 2;
const MARKER_RADIUS: i32 = 4;

fn with_alpha(color: Rgb<u8>, alpha: u8) -> Rgba<u8> {
  Rgba([color[0], color[1], color[2], alpha])
}

/// 检测结果标注器
pub struct Annotator {
  font: FontArc,
  label_scale: PxScale,
  watermark_scale: PxScale,
}

impl Default for Annotator {
  fn default() -> Self {
    let font_data = include_bytes!("../assets/DejaVuSans.ttf"); // default font
    let font = FontArc::try_from_slice(font_data).expect("无法加载嵌入的字体文件");
    Self::with_font(font)
  }
}

impl Annotator {
  pub fn with_font(font: FontArc) -> Self {
    Self {
      font,
      label_scale: PxScale::from(LABEL_FONT_SIZE),
      watermark_scale: PxScale::from(WATERMARK_FONT_SIZE),
    }
  }

  /// 加载指定字体，失败时回退到内置字体
  pub fn with_font_file(path: impl AsRef<Path>) -> Self {
    let path = path.as_ref();
    let font = std::fs::read(path)
      .map_err(|e| e.to_string())
      .and_then(|data| FontArc::try_from_vec(data).map_err(|e| e.to_string()));
    match font {
      Ok(font) => {
        debug!("已加载字体: {}", path.display());
        Self::with_font(font)
      }
      Err(e) => {
        warn!("无法加载字体 {}: {}，使用内置字体", path.display(), e);
        Self::default()
      }
    }
  }

  fn stroke(canvas: &mut Blend<RgbaImage>, x0: i32, y0: i32, x1: i32, y1: i32, color: Rgba<u8>) {
    // 只有水平与竖直两种笔画
    let half = (CORNER_WIDTH / 2) as i32;
    let rect = if y0 == y1 {
      Rect::at(x0.min(x1), y0.saturating_sub(half)).of_size(x0.abs_diff(x1) + 1, CORNER_WIDTH)
    } else {
      Rect::at(x0.saturating_sub(half), y0.min(y1)).of_size(CORNER_WIDTH, y0.abs_diff(y1) + 1)
    };
    draw_filled_rect_mut(canvas, rect, color);
  }

  fn draw_detection(&self, canvas: &mut Blend<RgbaImage>, detection: &Detection) {
    let color = severity_or_default(detection).draw_color();
    let outline = with_alpha(color, OUTLINE_ALPHA);
    let [x1, y1, x2, y2] = detection.bbox;
    let (w, h) = (x1.abs_diff(x2) + 1, y1.abs_diff(y2) + 1);

    // 半透明填充与加粗边框
    draw_filled_rect_mut(canvas, Rect::at(x1, y1).of_size(w, h), with_alpha(color, FILL_ALPHA));
    for t in 0..OUTLINE_WIDTH {
      let (tw, th) = (w.saturating_sub(2 * t as u32), h.saturating_sub(2 * t as u32));
      if tw > 0 && th > 0 {
        draw_hollow_rect_mut(canvas, Rect::at(x1.saturating_add(t), y1.saturating_add(t)).of_size(tw, th), outline);
      }
    }

    // 四角强调线
    let a = CORNER_LENGTH;
    for (sx, sy, ex, ey) in [
      (x1, y1, x1.saturating_add(a), y1),
      (x1, y1, x1, y1.saturating_add(a)),
      (x2, y1, x2.saturating_sub(a), y1),
      (x2, y1, x2, y1.saturating_add(a)),
      (x1, y2, x1.saturating_add(a), y2),
      (x1, y2, x1, y2.saturating_sub(a)),
      (x2, y2, x2.saturating_sub(a), y2),
      (x2, y2, x2, y2.saturating_sub(a)),
    ] {
      Self::stroke(canvas, sx, sy, ex, ey, outline);
    }

    // 标签：空间足够时放在框上方，否则放在框内顶部
    let label = format!(
      "[{:02}] {} {:.0}%",
      detection.id,
      detection.label,
      detection.confidence * 100.0
    );
    let (tw, th) = text_size(self.label_scale, &self.font, &label);
    let th = th as i32;
    let above = y1.saturating_sub(th + 6);
    let ty = if above > 0 { above } else { y1.saturating_add(4) };
    let badge = Rect::at(x1, ty.saturating_sub(2)).of_size(tw + 10, (th + 6).max(1) as u32);
    draw_filled_rect_mut(canvas, badge, with_alpha(color, BADGE_ALPHA));
    draw_text_mut(
      canvas,
      with_alpha(Rgb(LABEL_TEXT_COLOR), 255),
      x1.saturating_add(5),
      ty,
      self.label_scale,
      &self.font,
      &label,
    );

    // 左上角定位点
    draw_filled_circle_mut(canvas, (x1.saturating_add(8), y1.saturating_add(8)), MARKER_RADIUS, outline);
  }

  fn draw_watermark(&self, canvas: &mut Blend<RgbaImage>, count: usize, timestamp: NaiveDateTime) {
    let (w, h) = canvas.0.dimensions();
    let bar_height = WATERMARK_BAR_HEIGHT.min(h);
    if w == 0 || bar_height == 0 {
      return;
    }
    let bar = Rect::at(0, (h - bar_height) as i32).of_size(w, bar_height);
    draw_filled_rect_mut(canvas, bar, Rgba(WATERMARK_BAR_COLOR));

    let text = format!(
      "{} · {} · {} detections",
      WATERMARK_BRAND,
      timestamp.format("%Y-%m-%d %H:%M"),
      count
    );
    let (tw, _) = text_size(self.watermark_scale, &self.font, &text);
    let x = (w as i32 - tw as i32) / 2;
    let y = h as i32 - bar_height as i32 + 4;
    draw_text_mut(
      canvas,
      Rgba(WATERMARK_TEXT_COLOR),
      x,
      y,
      self.watermark_scale,
      &self.font,
      &text,
    );
  }

  /// 在图像副本上绘制检测框、标签和底部水印
  pub fn annotate(
    &self,
    image: &RgbImage,
    detections: &[Detection],
    timestamp: NaiveDateTime,
  ) -> RgbImage {
    let mut canvas = Blend(DynamicImage::ImageRgb8(image.clone()).to_rgba8());
    for detection in detections {
      self.draw_detection(&mut canvas, detection);
    }
    self.draw_watermark(&mut canvas, detections.len(), timestamp);
    DynamicImage::ImageRgba8(canvas.0).to_rgb8()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::severity::Severity;
  use chrono::NaiveDate;

  fn timestamp() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 3, 14)
      .and_then(|d| d.and_hms_opt(9, 26, 0))
      .unwrap()
  }

  fn leak() -> Detection {
    Detection::new(1, "leakage", 0.9, [50, 80, 150, 160]).classified()
  }

  #[test]
  fn keeps_dimensions() {
    let image = RgbImage::new(120, 90);
    let out = Annotator::default().annotate(&image, &[], timestamp());
    assert_eq!(out.dimensions(), (120, 90));
  }

  #[test]
  fn box_interior_outline_and_exterior() {
    let image = RgbImage::new(200, 200);
    let out = Annotator::default().annotate(&image, &[leak()], timestamp());

    let interior = out.get_pixel(100, 120);
    assert!(interior[0] > 10 && interior[0] < 80);

    let edge = out.get_pixel(100, 80);
    assert!(edge[0] > 150 && edge[0] as i32 > edge[1] as i32 + 100);

    assert_eq!(*out.get_pixel(10, 40), Rgb([0, 0, 0]));
  }

  #[test]
  fn label_badge_sits_above_box() {
    let image = RgbImage::new(200, 200);
    let out = Annotator::default().annotate(&image, &[leak()], timestamp());
    let badge = (30..80).any(|y| out.get_pixel(51, y)[0] > 150);
    assert!(badge);
  }

  #[test]
  fn label_moves_inside_when_no_room() {
    let image = RgbImage::new(200, 200);
    let det = Detection::new(2, "rudder", 0.7, [60, 2, 150, 120]).classified();
    let out = Annotator::default().annotate(&image, &[det], timestamp());
    let badge = (6..40).any(|y| {
      let p = out.get_pixel(63, y);
      p[0] > 150 && p[1] > 100
    });
    assert!(badge);
  }

  /// 与像素最接近的等级颜色（按给定不透明度缩放后比较）
  fn nearest_tier(px: &Rgb<u8>, opacity: f32) -> Severity {
    let dist = |tier: Severity| {
      let c = tier.draw_color();
      (0..3)
        .map(|ch| (px[ch] as f32 - c[ch] as f32 * opacity).abs())
        .sum::<f32>()
    };
    Severity::ALL
      .into_iter()
      .min_by(|a, b| dist(*a).total_cmp(&dist(*b)))
      .unwrap()
  }

  #[test]
  fn every_detection_gets_outline_and_badge() {
    let image = RgbImage::new(300, 300);
    let dets: Vec<Detection> = [
      (1, "leakage", 0.9, [30, 60, 110, 140]),
      (2, "flange", 0.7, [160, 60, 260, 140]),
      (3, "hull", 0.6, [30, 190, 110, 260]),
      (4, "pipeline", 0.5, [160, 190, 260, 260]),
    ]
    .into_iter()
    .map(|(id, label, conf, bbox)| Detection::new(id, label, conf, bbox).classified())
    .collect();
    let expected = [
      Severity::Critical,
      Severity::High,
      Severity::Medium,
      Severity::Low,
    ];
    let out = Annotator::default().annotate(&image, &dets, timestamp());

    for (d, tier) in dets.iter().zip(expected) {
      assert_eq!(d.severity(), Some(tier));
      let [x1, y1, x2, _] = d.bbox;
      let edge = out.get_pixel(((x1 + x2) / 2) as u32, y1 as u32);
      assert_eq!(nearest_tier(edge, 0.85), tier, "outline of {}", d.id);
      let badge = out.get_pixel((x1 + 1) as u32, (y1 - 4) as u32);
      assert_eq!(nearest_tier(badge, 0.78), tier, "badge of {}", d.id);
      assert!(badge.0.iter().map(|c| *c as u32).sum::<u32>() > 100);
    }
    assert_eq!(*out.get_pixel(5, 5), Rgb([0, 0, 0]));
    assert_eq!(*out.get_pixel(135, 100), Rgb([0, 0, 0]));
  }

  #[test]
  fn watermark_bar_at_bottom() {
    let image = RgbImage::new(160, 100);
    let out = Annotator::default().annotate(&image, &[], timestamp());
    assert!(out.get_pixel(2, 99)[2] > 0);
    assert_eq!(*out.get_pixel(2, 10), Rgb([0, 0, 0]));
  }

  #[test]
  fn deterministic_for_same_inputs() {
    let image = RgbImage::from_pixel(180, 180, Rgb([20, 60, 50]));
    let annotator = Annotator::default();
    let a = annotator.annotate(&image, &[leak()], timestamp());
    let b = annotator.annotate(&image, &[leak()], timestamp());
    assert_eq!(a, b);
  }

  #[test]
  fn missing_font_falls_back() {
    let annotator = Annotator::with_font_file("/nonexistent/font.ttf");
    let image = RgbImage::new(64, 64);
    let out = annotator.annotate(&image, &[], timestamp());
    assert_eq!(out.dimensions(), (64, 64));
  }
}
