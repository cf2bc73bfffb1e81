// 该文件是 Shenhai （深海） 项目的一部分。
// src/risk.rs - 结构风险评分与等级
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

use std::fmt;

use serde::Serialize;

use crate::detection::{Detection, severity_or_default};
use crate::severity::Severity;

pub const MAX_SCORE: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Grade {
  A,
  B,
  C,
  D,
}

impl Grade {
  pub fn from_score(score: u32) -> Self {
    match score {
      76.. => Grade::A,
      51..=75 => Grade::B,
      26..=50 => Grade::C,
      _ => Grade::D,
    }
  }
}

impl fmt::Display for Grade {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let s = match self {
      Grade::A => "A",
      Grade::B => "B",
      Grade::C => "C",
      Grade::D => "D",
    };
    f.write_str(s)
  }
}

/// 100 减去各检测的等级权重之和，截断到 [0, 100]
pub fn score(detections: &[Detection]) -> u32 {
  let penalty: u32 = detections
    .iter()
    .map(|d| severity_or_default(d).weight())
    .fold(0u32, u32::saturating_add);
  MAX_SCORE.saturating_sub(penalty)
}

pub fn grade(score: u32) -> Grade {
  Grade::from_score(score)
}

/// 各等级的检测数量，按 Low..Critical 排列
pub fn tier_counts(detections: &[Detection]) -> [(Severity, usize); 4] {
  Severity::ALL.map(|tier| {
    let n = detections
      .iter()
      .filter(|d| severity_or_default(d) == tier)
      .count();
    (tier, n)
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  fn det(id: u32, label: &str) -> Detection {
    Detection::new(id, label, 0.5, [0, 0, 10, 10]).classified()
  }

  #[test]
  fn no_detections_is_perfect() {
    assert_eq!(score(&[]), 100);
    assert_eq!(grade(score(&[])), Grade::A);
  }

  #[test]
  fn single_critical() {
    let s = score(&[det(1, "leakage")]);
    assert_eq!(s, 75);
    assert_eq!(grade(s), Grade::B);
  }

  #[test]
  fn four_criticals_hit_zero() {
    let dets: Vec<_> = (1..=4).map(|i| det(i, "anomaly")).collect();
    assert_eq!(score(&dets), 0);
    assert_eq!(grade(0), Grade::D);
  }

  #[test]
  fn score_saturates_at_zero() {
    let dets: Vec<_> = (1..=30).map(|i| det(i, "leakage")).collect();
    assert_eq!(score(&dets), 0);
  }

  #[test]
  fn mixed_weights() {
    let dets = vec![
      det(1, "rudder"),
      det(2, "hull"),
      det(3, "buoy"),
      det(4, "unknown thing"),
    ];
    // 12 + 6 + 2 + 6
    assert_eq!(score(&dets), 74);
  }

  #[test]
  fn unclassified_detections_are_classified_on_the_fly() {
    let raw = Detection::new(1, "flange", 0.3, [0, 0, 5, 5]);
    assert_eq!(score(&[raw]), 88);
  }

  #[test]
  fn grade_band_edges() {
    assert_eq!(grade(100), Grade::A);
    assert_eq!(grade(76), Grade::A);
    assert_eq!(grade(75), Grade::B);
    assert_eq!(grade(51), Grade::B);
    assert_eq!(grade(50), Grade::C);
    assert_eq!(grade(26), Grade::C);
    assert_eq!(grade(25), Grade::D);
    assert_eq!(grade(0), Grade::D);
  }

  #[test]
  fn counts_per_tier() {
    let dets = vec![det(1, "leakage"), det(2, "leakage"), det(3, "buoy")];
    let counts = tier_counts(&dets);
    assert_eq!(counts[0], (Severity::Low, 1));
    assert_eq!(counts[1], (Severity::Medium, 0));
    assert_eq!(counts[3], (Severity::Critical, 2));
  }
}
