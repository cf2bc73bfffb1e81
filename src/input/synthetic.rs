// 该文件是 Shenhai （深海） 项目的一部分。
// src/input/synthetic.rs - 演示用的合成检测器
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

use std::str::FromStr;

use image::RgbImage;
use rand::{Rng, SeedableRng, rngs::StdRng};
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  detection::{Detection, Detector},
  severity::known_classes,
};

const EDGE_MARGIN: u32 = 60;
const MIN_BOX_WIDTH: u32 = 40;
const MIN_BOX_HEIGHT: u32 = 30;
const MAX_CONFIDENCE: f64 = 0.98;
const DEFAULT_THRESHOLD: f64 = 0.25;

const PIPELINE_CLASSES: &[&str] = &[
  "leakage",
  "anomaly",
  "pipe_coupling",
  "flange",
  "anode",
  "bend_restrictor",
  "biofouling",
  "pipeline",
  "concrete",
];
const CABLE_CLASSES: &[&str] = &["anomaly", "biofouling", "buoy", "concrete", "bend_restrictor"];
const HULL_CLASSES: &[&str] = &[
  "bilge_keel",
  "draft_mark",
  "hull",
  "propeller",
  "ropeguard",
  "rudder",
  "sea_chest",
  "thruster_blades",
  "thruster_grating",
];

#[derive(Error, Debug)]
pub enum SyntheticDetectorError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("未知的巡检模式: {0}")]
  UnknownMode(String),
  #[error("无效参数 {0}: {1}")]
  InvalidParameter(String, String),
}

/// 巡检模式，决定合成检测的类别池
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InspectionMode {
  Pipeline,
  Cable,
  Hull,
  All,
}

impl FromStr for InspectionMode {
  type Err = SyntheticDetectorError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "pipeline" => Ok(InspectionMode::Pipeline),
      "cable" => Ok(InspectionMode::Cable),
      "hull" => Ok(InspectionMode::Hull),
      "all" | "" => Ok(InspectionMode::All),
      other => Err(SyntheticDetectorError::UnknownMode(other.to_string())),
    }
  }
}

impl InspectionMode {
  fn classes(self) -> Vec<&'static str> {
    match self {
      InspectionMode::Pipeline => PIPELINE_CLASSES.to_vec(),
      InspectionMode::Cable => CABLE_CLASSES.to_vec(),
      InspectionMode::Hull => HULL_CLASSES.to_vec(),
      InspectionMode::All => known_classes().collect(),
    }
  }
}

/// 无模型时的演示检测器，给定种子时输出可复现
pub struct SyntheticDetector {
  mode: InspectionMode,
  seed: u64,
  threshold: f64,
}

impl FromUrlWithScheme for SyntheticDetector {
  const SCHEME: &'static str = "synthetic";
}

impl FromUrl for SyntheticDetector {
  type Error = SyntheticDetectorError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(SyntheticDetectorError::SchemeMismatch);
    }

    let mode = url.host_str().unwrap_or_default().parse()?;
    let mut detector = SyntheticDetector::new(mode, 0);
    for (k, v) in url.query_pairs() {
      let invalid = || SyntheticDetectorError::InvalidParameter(k.to_string(), v.to_string());
      match &*k {
        "seed" => detector.seed = v.parse().map_err(|_| invalid())?,
        "threshold" => {
          let threshold: f64 = v.parse().map_err(|_| invalid())?;
          if !threshold.is_finite() {
            return Err(invalid());
          }
          detector.threshold = threshold;
        }
        _ => {}
      }
    }
    Ok(detector)
  }
}

impl SyntheticDetector {
  pub fn new(mode: InspectionMode, seed: u64) -> Self {
    Self {
      mode,
      seed,
      threshold: DEFAULT_THRESHOLD,
    }
  }

  pub fn with_threshold(mut self, threshold: f64) -> Self {
    self.threshold = threshold;
    self
  }
}

impl Detector for SyntheticDetector {
  type Error = SyntheticDetectorError;

  fn detect(&self, image: &RgbImage) -> Result<Vec<Detection>, Self::Error> {
    let (w, h) = image.dimensions();
    if w <= 2 * EDGE_MARGIN
      || h <= 2 * EDGE_MARGIN
      || w / 4 <= MIN_BOX_WIDTH
      || h / 5 <= MIN_BOX_HEIGHT
    {
      debug!("图像 {}x{} 过小，不生成合成检测", w, h);
      return Ok(Vec::new());
    }

    let classes = self.mode.classes();
    let threshold = if self.threshold.is_finite() {
      self.threshold.clamp(0.0, MAX_CONFIDENCE - f64::EPSILON)
    } else {
      DEFAULT_THRESHOLD
    };
    let mut rng = StdRng::seed_from_u64(self.seed);
    let n = rng.gen_range(3..9);

    let detections = (1..=n)
      .map(|id| {
        let cx = rng.gen_range(EDGE_MARGIN..w - EDGE_MARGIN) as i32;
        let cy = rng.gen_range(EDGE_MARGIN..h - EDGE_MARGIN) as i32;
        let bw = rng.gen_range(MIN_BOX_WIDTH..w / 4) as i32;
        let bh = rng.gen_range(MIN_BOX_HEIGHT..h / 5) as i32;
        let confidence = rng.gen_range(threshold..MAX_CONFIDENCE);
        let label = classes[rng.gen_range(0..classes.len())];

        let bbox = [
          (cx - bw / 2).max(0),
          (cy - bh / 2).max(0),
          (cx + bw / 2).min(w as i32),
          (cy + bh / 2).min(h as i32),
        ];
        Detection::new(id, label, confidence, bbox)
      })
      .collect::<Vec<_>>();

    debug!("合成检测 {} 个目标", detections.len());
    Ok(detections)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_url() {
    let url = Url::parse("synthetic://hull?seed=9&threshold=0.5").unwrap();
    let d = SyntheticDetector::from_url(&url).unwrap();
    assert_eq!(d.mode, InspectionMode::Hull);
    assert_eq!(d.seed, 9);
    assert_eq!(d.threshold, 0.5);

    let bad = Url::parse("synthetic://reef").unwrap();
    assert!(matches!(
      SyntheticDetector::from_url(&bad),
      Err(SyntheticDetectorError::UnknownMode(_))
    ));
    let bad = Url::parse("synthetic://hull?seed=abc").unwrap();
    assert!(matches!(
      SyntheticDetector::from_url(&bad),
      Err(SyntheticDetectorError::InvalidParameter(_, _))
    ));
  }

  #[test]
  fn non_finite_threshold_is_rejected() {
    for value in ["NaN", "inf", "-inf"] {
      let url = Url::parse(&format!("synthetic://all?threshold={value}")).unwrap();
      assert!(
        matches!(
          SyntheticDetector::from_url(&url),
          Err(SyntheticDetectorError::InvalidParameter(_, _))
        ),
        "{value}"
      );
    }

    let image = RgbImage::new(640, 480);
    let dets = SyntheticDetector::new(InspectionMode::All, 2)
      .with_threshold(f64::NAN)
      .detect(&image)
      .unwrap();
    assert!(!dets.is_empty());
    assert!(dets.iter().all(|d| d.confidence >= DEFAULT_THRESHOLD));
  }

  #[test]
  fn generates_valid_sequential_detections() {
    let image = RgbImage::new(640, 480);
    let detector = SyntheticDetector::new(InspectionMode::Pipeline, 3).with_threshold(0.3);
    let dets = detector.detect(&image).unwrap();
    assert!((3..=8).contains(&dets.len()));
    for (i, d) in dets.iter().enumerate() {
      assert_eq!(d.id, i as u32 + 1);
      assert!(d.validate(640, 480).is_ok(), "{:?}", d);
      assert!(d.confidence >= 0.3 && d.confidence < MAX_CONFIDENCE);
      assert!(PIPELINE_CLASSES.contains(&d.label.as_str()));
    }
  }

  #[test]
  fn same_seed_same_detections() {
    let image = RgbImage::new(800, 600);
    let a = SyntheticDetector::new(InspectionMode::All, 5).detect(&image).unwrap();
    let b = SyntheticDetector::new(InspectionMode::All, 5).detect(&image).unwrap();
    assert_eq!(a, b);
  }

  #[test]
  fn small_images_yield_nothing() {
    let image = RgbImage::new(100, 100);
    let dets = SyntheticDetector::new(InspectionMode::Cable, 1).detect(&image).unwrap();
    assert!(dets.is_empty());
  }
}
