// 该文件是 Shenhai （深海） 项目的一部分。
// src/detection.rs - 检测结果定义
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
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::severity::{Assessment, Severity, classify};

/// 外部检测器的边界：输入增强后的图像，输出检测框
pub trait Detector {
  type Error;

  fn detect(&self, image: &RgbImage) -> Result<Vec<Detection>, Self::Error>;
}

/// 单个检测结果，bbox 为像素坐标 [x1, y1, x2, y2]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
  pub id: u32,
  pub label: String,
  pub confidence: f64,
  pub bbox: [i32; 4],
  /// 序列巡检时检测所在的帧序号
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub frame: Option<u64>,
  #[serde(default, skip_deserializing)]
  pub assessment: Option<Assessment>,
}

#[derive(Error, Debug, PartialEq)]
pub enum InvalidDetection {
  #[error("检测 {0} 的边界框面积为零或为负")]
  Degenerate(u32),
  #[error("检测 {0} 的边界框超出图像范围 {1}x{2}")]
  OutOfBounds(u32, u32, u32),
  #[error("检测 {0} 的置信度 {1} 不在 [0, 1] 内")]
  Confidence(u32, f64),
}

impl Detection {
  pub fn new(id: u32, label: impl Into<String>, confidence: f64, bbox: [i32; 4]) -> Self {
    Self {
      id,
      label: label.into(),
      confidence,
      bbox,
      frame: None,
      assessment: None,
    }
  }

  // 坐标运算在 i64 中进行，极端坐标不会溢出
  pub fn width(&self) -> i64 {
    self.bbox[2] as i64 - self.bbox[0] as i64
  }

  pub fn height(&self) -> i64 {
    self.bbox[3] as i64 - self.bbox[1] as i64
  }

  pub fn area(&self) -> i64 {
    self.width().saturating_mul(self.height())
  }

  /// 边界框中心（整数除法，与像素网格对齐）
  pub fn center(&self) -> (i64, i64) {
    (
      (self.bbox[0] as i64 + self.bbox[2] as i64).div_euclid(2),
      (self.bbox[1] as i64 + self.bbox[3] as i64).div_euclid(2),
    )
  }

  /// 未分类时返回 None
  pub fn severity(&self) -> Option<Severity> {
    self.assessment.as_ref().map(|a| a.severity)
  }

  /// 附加严重等级，返回新的检测结果
  pub fn classified(mut self) -> Self {
    self.assessment = Some(classify(&self.label, self.confidence));
    self
  }

  pub fn validate(&self, width: u32, height: u32) -> Result<(), InvalidDetection> {
    if !(0.0..=1.0).contains(&self.confidence) {
      return Err(InvalidDetection::Confidence(self.id, self.confidence));
    }
    if self.width() <= 0 || self.height() <= 0 {
      return Err(InvalidDetection::Degenerate(self.id));
    }
    let [x1, y1, x2, y2] = self.bbox;
    if x1 < 0 || y1 < 0 || x2 as i64 > width as i64 || y2 as i64 > height as i64 {
      return Err(InvalidDetection::OutOfBounds(self.id, width, height));
    }
    Ok(())
  }
}

/// 未分类的检测按 Medium 处理，保证每个检测都有且只有一个等级
pub fn severity_or_default(detection: &Detection) -> Severity {
  detection
    .severity()
    .unwrap_or_else(|| classify(&detection.label, detection.confidence).severity)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn derived_geometry() {
    let d = Detection::new(1, "flange", 0.7, [10, 20, 50, 80]);
    assert_eq!(d.width(), 40);
    assert_eq!(d.height(), 60);
    assert_eq!(d.area(), 2400);
    assert_eq!(d.center(), (30, 50));
    assert_eq!(d.severity(), None);
  }

  #[test]
  fn extreme_coordinates_do_not_overflow() {
    let d = Detection::new(1, "hull", 0.5, [i32::MIN, i32::MIN, i32::MAX, i32::MAX]);
    assert_eq!(d.width(), u32::MAX as i64);
    assert_eq!(d.center(), (-1, -1));
    assert!(d.area() > 0);
    assert_eq!(
      Detection::new(2, "hull", 0.5, [i32::MAX, 0, i32::MAX, 10]).center(),
      (i32::MAX as i64, 5)
    );
    assert!(matches!(d.validate(100, 100), Err(InvalidDetection::OutOfBounds(1, 100, 100))));
  }

  #[test]
  fn classification_enriches_detection() {
    let d = Detection::new(3, "Sea Chest", 0.6, [0, 0, 10, 10]).classified();
    assert_eq!(d.severity(), Some(Severity::High));
    assert_eq!(d.id, 3);
    assert_eq!(severity_or_default(&d), Severity::High);
  }

  #[test]
  fn validation_rejects_bad_boxes() {
    let ok = Detection::new(1, "buoy", 0.5, [0, 0, 100, 100]);
    assert!(ok.validate(100, 100).is_ok());

    let flat = Detection::new(2, "buoy", 0.5, [10, 10, 10, 40]);
    assert_eq!(flat.validate(100, 100), Err(InvalidDetection::Degenerate(2)));

    let inverted = Detection::new(3, "buoy", 0.5, [40, 40, 10, 10]);
    assert_eq!(inverted.validate(100, 100), Err(InvalidDetection::Degenerate(3)));

    let outside = Detection::new(4, "buoy", 0.5, [90, 90, 120, 100]);
    assert_eq!(
      outside.validate(100, 100),
      Err(InvalidDetection::OutOfBounds(4, 100, 100))
    );

    let conf = Detection::new(5, "buoy", 1.5, [0, 0, 10, 10]);
    assert!(matches!(
      conf.validate(100, 100),
      Err(InvalidDetection::Confidence(5, _))
    ));
  }

  #[test]
  fn deserialize_from_detector_json() {
    let json = r#"[{"id": 1, "label": "rudder", "confidence": 0.91, "bbox": [4, 5, 30, 40]}]"#;
    let dets: Vec<Detection> = serde_json::from_str(json).unwrap();
    assert_eq!(dets.len(), 1);
    assert_eq!(dets[0].label, "rudder");
    assert_eq!(dets[0].assessment, None);
  }
}
