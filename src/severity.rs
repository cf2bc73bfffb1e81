// 该文件是 Shenhai （深海） 项目的一部分。
// src/severity.rs - 异常类别严重等级分类
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

use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

use image::Rgb;
use serde::{Deserialize, Serialize};

/// 低置信度提升阈值：Low 等级且置信度严格大于该值时提升为 Medium
pub const ESCALATION_CONFIDENCE: f64 = 0.85;

/// 严重等级，按风险权重全序
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
  Low,
  Medium,
  High,
  Critical,
}

impl Severity {
  pub const ALL: [Severity; 4] = [
    Severity::Low,
    Severity::Medium,
    Severity::High,
    Severity::Critical,
  ];

  /// 风险扣分权重，评分与热力图共用
  pub fn weight(self) -> u32 {
    match self {
      Severity::Critical => 25,
      Severity::High => 12,
      Severity::Medium => 6,
      Severity::Low => 2,
    }
  }

  /// 标注框绘制颜色
  pub fn draw_color(self) -> Rgb<u8> {
    match self {
      Severity::Critical => Rgb([220, 50, 50]),
      Severity::High => Rgb([255, 165, 0]),
      Severity::Medium => Rgb([0, 180, 255]),
      Severity::Low => Rgb([0, 220, 130]),
    }
  }
}

impl fmt::Display for Severity {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let s = match self {
      Severity::Low => "Low",
      Severity::Medium => "Medium",
      Severity::High => "High",
      Severity::Critical => "Critical",
    };
    f.write_str(s)
  }
}

/// 分类结果：等级、界面展示颜色（十六进制）和建议处置
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Assessment {
  pub severity: Severity,
  pub color: &'static str,
  pub action: &'static str,
}

const CRITICAL_COLOR: &str = "#FF4444";
const HIGH_COLOR: &str = "#FF8800";
const MEDIUM_COLOR: &str = "#FFCC00";
const LOW_COLOR: &str = "#44BB44";

const DEFAULT_ASSESSMENT: Assessment = Assessment {
  severity: Severity::Medium,
  color: MEDIUM_COLOR,
  action: "Monitor and log finding",
};

const ESCALATED_ASSESSMENT: Assessment = Assessment {
  severity: Severity::Medium,
  color: MEDIUM_COLOR,
  action: "High confidence — monitor closely",
};

// (类别, 等级, 建议处置)
const SEVERITY_TABLE: &[(&str, Severity, &str)] = &[
  // 海底基础设施
  ("leakage", Severity::Critical, "Immediate intervention — active leak detected"),
  ("anomaly", Severity::Critical, "Unknown anomaly — flag for immediate review"),
  ("pipe_coupling", Severity::High, "Check seal integrity — schedule inspection"),
  ("flange", Severity::High, "Inspect flange seal and bolt integrity"),
  ("anode", Severity::Medium, "Check sacrificial anode depletion level"),
  ("bend_restrictor", Severity::Medium, "Check for fatigue cracking at bend"),
  ("biofouling", Severity::Medium, "Monitor — re-inspect in 90 days"),
  ("pipeline", Severity::Low, "Structural element — log condition"),
  ("concrete", Severity::Low, "Foundation element — check displacement"),
  ("buoy", Severity::Low, "Navigation aid — check mooring"),
  // 船体
  ("bilge_keel", Severity::Medium, "Inspect for corrosion and structural damage"),
  ("draft_mark", Severity::Low, "Draft mark visible — log reading"),
  ("hull", Severity::Medium, "Check hull coating and corrosion level"),
  ("propeller", Severity::High, "Inspect propeller for cavitation damage"),
  ("ropeguard", Severity::Medium, "Check ropeguard integrity"),
  ("rudder", Severity::High, "Inspect rudder bearings and pintles"),
  ("sea_chest", Severity::High, "Check sea chest grating for blockage"),
  ("thruster_blades", Severity::High, "Inspect thruster blades for damage"),
  ("thruster_grating", Severity::Medium, "Check grating for marine growth blockage"),
];

static SEVERITY_MAP: LazyLock<HashMap<&'static str, Assessment>> = LazyLock::new(|| {
  SEVERITY_TABLE
    .iter()
    .map(|&(name, severity, action)| {
      let color = match severity {
        Severity::Critical => CRITICAL_COLOR,
        Severity::High => HIGH_COLOR,
        Severity::Medium => MEDIUM_COLOR,
        Severity::Low => LOW_COLOR,
      };
      (
        name,
        Assessment {
          severity,
          color,
          action,
        },
      )
    })
    .collect()
});

/// 所有已知的类别名称（归一化形式）
pub fn known_classes() -> impl Iterator<Item = &'static str> {
  SEVERITY_TABLE.iter().map(|(name, _, _)| *name)
}

/// 类别名称归一化：小写，空格与连字符统一为下划线
pub fn normalize_label(label: &str) -> String {
  label.trim().to_lowercase().replace([' ', '-'], "_")
}

/// 根据类别与置信度给出严重等级，未知类别落入 Medium
pub fn classify(label: &str, confidence: f64) -> Assessment {
  let key = normalize_label(label);
  let assessment = SEVERITY_MAP
    .get(key.as_str())
    .cloned()
    .unwrap_or(DEFAULT_ASSESSMENT);

  if assessment.severity == Severity::Low && confidence > ESCALATION_CONFIDENCE {
    return ESCALATED_ASSESSMENT;
  }

  assessment
}
