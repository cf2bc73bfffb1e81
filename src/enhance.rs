// 该文件是 Shenhai （深海） 项目的一部分。
// src/enhance.rs - 水下能见度增强流水线
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
use tracing::debug;

mod clahe;
mod color;
mod edge;
mod turbidity;

pub use self::clahe::{CLAHE_GRID, equalize_local_contrast};
pub use self::color::{GREEN_WATER_STRENGTH, correct_green_water};
pub use self::edge::{CANNY_HIGH, CANNY_LOW, overlay_edges};
pub use self::turbidity::{correct_turbidity, simulate_turbidity};

/// 低于该强度时浑浊模拟/校正视为关闭
pub const MIN_TURBIDITY: f32 = 0.01;
/// 校正强度相对模拟强度的比例
pub const CORRECTION_RATIO: f32 = 0.85;

/// 增强流水线的配置项
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnhanceConfig {
  /// 浑浊度模拟强度 [0, 1]，0 表示关闭
  pub turbidity: f32,
  pub correct_turbidity: bool,
  pub green_water: bool,
  pub local_contrast: bool,
  /// CLAHE 裁剪限制，通常在 [1, 8]
  pub clip_limit: f32,
  pub edge_overlay: bool,
  /// 浑浊噪声的随机种子
  pub seed: u64,
}

impl Default for EnhanceConfig {
  fn default() -> Self {
    Self {
      turbidity: 0.0,
      correct_turbidity: true,
      green_water: true,
      local_contrast: true,
      clip_limit: 3.0,
      edge_overlay: false,
      seed: 0,
    }
  }
}

impl EnhanceConfig {
  /// 所有阶段关闭
  pub fn disabled() -> Self {
    Self {
      turbidity: 0.0,
      correct_turbidity: false,
      green_water: false,
      local_contrast: false,
      clip_limit: 3.0,
      edge_overlay: false,
      seed: 0,
    }
  }
}

/// 阶段种类及其参数，参数只能随对应的阶段出现
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StageKind {
  TurbiditySimulation { strength: f32, seed: u64 },
  TurbidityCorrection { strength: f32 },
  GreenWater,
  LocalContrast { clip_limit: f32 },
  EdgeOverlay,
}

/// 固定执行顺序
pub const STAGE_ORDER: [&str; 5] = [
  "turbidity_simulation",
  "turbidity_correction",
  "green_water",
  "local_contrast",
  "edge_overlay",
];

impl StageKind {
  pub fn name(&self) -> &'static str {
    match self {
      StageKind::TurbiditySimulation { .. } => STAGE_ORDER[0],
      StageKind::TurbidityCorrection { .. } => STAGE_ORDER[1],
      StageKind::GreenWater => STAGE_ORDER[2],
      StageKind::LocalContrast { .. } => STAGE_ORDER[3],
      StageKind::EdgeOverlay => STAGE_ORDER[4],
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stage {
  kind: StageKind,
  enabled: bool,
}

impl Stage {
  pub fn kind(&self) -> StageKind {
    self.kind
  }

  pub fn enabled(&self) -> bool {
    self.enabled
  }

  /// 关闭的阶段原样返回图像
  pub fn apply(&self, image: RgbImage) -> RgbImage {
    if !self.enabled {
      return image;
    }
    match self.kind {
      StageKind::TurbiditySimulation { strength, seed } => {
        simulate_turbidity(image, strength, seed)
      }
      StageKind::TurbidityCorrection { strength } => correct_turbidity(image, strength),
      StageKind::GreenWater => correct_green_water(image, GREEN_WATER_STRENGTH),
      StageKind::LocalContrast { clip_limit } => {
        equalize_local_contrast(image, clip_limit, CLAHE_GRID)
      }
      StageKind::EdgeOverlay => overlay_edges(image),
    }
  }
}

/// 按固定顺序排列的阶段表
#[derive(Debug, Clone)]
pub struct Pipeline {
  stages: [Stage; 5],
}

impl From<&EnhanceConfig> for Pipeline {
  fn from(config: &EnhanceConfig) -> Self {
    let strength = config.turbidity.clamp(0.0, 1.0);
    let turbid = strength >= MIN_TURBIDITY;

    let stages = [
      Stage {
        kind: StageKind::TurbiditySimulation {
          strength,
          seed: config.seed,
        },
        enabled: turbid,
      },
      Stage {
        kind: StageKind::TurbidityCorrection {
          strength: strength * CORRECTION_RATIO,
        },
        enabled: turbid && config.correct_turbidity,
      },
      Stage {
        kind: StageKind::GreenWater,
        enabled: config.green_water,
      },
      Stage {
        kind: StageKind::LocalContrast {
          clip_limit: config.clip_limit.max(f32::EPSILON),
        },
        enabled: config.local_contrast,
      },
      Stage {
        kind: StageKind::EdgeOverlay,
        enabled: config.edge_overlay,
      },
    ];

    Pipeline { stages }
  }
}

impl Pipeline {
  pub fn stages(&self) -> &[Stage] {
    &self.stages
  }

  pub fn run(&self, image: RgbImage) -> RgbImage {
    self.stages.iter().fold(image, |image, stage| {
      if stage.enabled {
        debug!("执行增强阶段: {}", stage.kind.name());
      }
      stage.apply(image)
    })
  }
}

/// 根据配置执行整条增强流水线
pub fn enhance(image: RgbImage, config: &EnhanceConfig) -> RgbImage {
  Pipeline::from(config).run(image)
}

pub(crate) fn to_u8(v: f32) -> u8 {
  v.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
pub(crate) mod tests {
  use super::*;
  use image::Rgb;

  pub fn gradient_image(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
      Rgb([
        ((x * 255) / width.max(1)) as u8,
        ((y * 255) / height.max(1)) as u8,
        (((x + y) * 97) % 256) as u8,
      ])
    })
  }

  #[test]
  fn all_disabled_is_identity() {
    let image = gradient_image(37, 23);
    let out = enhance(image.clone(), &EnhanceConfig::disabled());
    assert_eq!(out, image);
  }

  #[test]
  fn zero_turbidity_with_correction_is_identity() {
    let image = gradient_image(16, 16);
    let config = EnhanceConfig {
      turbidity: 0.0,
      correct_turbidity: true,
      ..EnhanceConfig::disabled()
    };
    assert_eq!(enhance(image.clone(), &config), image);
  }

  #[test]
  fn stages_follow_fixed_order() {
    let pipeline = Pipeline::from(&EnhanceConfig::default());
    let names: Vec<&str> = pipeline.stages().iter().map(|s| s.kind().name()).collect();
    assert_eq!(names, STAGE_ORDER.to_vec());

    let disabled = Pipeline::from(&EnhanceConfig::disabled());
    let names: Vec<&str> = disabled.stages().iter().map(|s| s.kind().name()).collect();
    assert_eq!(names, STAGE_ORDER.to_vec());
  }

  #[test]
  fn correction_requires_simulation() {
    let config = EnhanceConfig {
      turbidity: 0.0,
      correct_turbidity: true,
      ..EnhanceConfig::default()
    };
    let pipeline = Pipeline::from(&config);
    assert!(!pipeline.stages()[0].enabled());
    assert!(!pipeline.stages()[1].enabled());

    let config = EnhanceConfig {
      turbidity: 0.4,
      ..config
    };
    let pipeline = Pipeline::from(&config);
    assert!(pipeline.stages()[1].enabled());
    match pipeline.stages()[1].kind() {
      StageKind::TurbidityCorrection { strength } => assert!((strength - 0.34).abs() < 1e-6),
      other => panic!("unexpected stage {:?}", other),
    }
  }

  #[test]
  fn stage_parameters_travel_with_kind() {
    let config = EnhanceConfig {
      turbidity: 0.5,
      seed: 9,
      clip_limit: 2.5,
      ..EnhanceConfig::default()
    };
    let pipeline = Pipeline::from(&config);
    assert_eq!(
      pipeline.stages()[0].kind(),
      StageKind::TurbiditySimulation {
        strength: 0.5,
        seed: 9
      }
    );
    assert_eq!(
      pipeline.stages()[3].kind(),
      StageKind::LocalContrast { clip_limit: 2.5 }
    );
    for stage in pipeline.stages() {
      assert_eq!(stage.apply(gradient_image(12, 12)).dimensions(), (12, 12));
    }
  }

  #[test]
  fn seeded_pipeline_is_reproducible() {
    let image = gradient_image(24, 24);
    let config = EnhanceConfig {
      turbidity: 0.7,
      seed: 42,
      ..EnhanceConfig::default()
    };
    let a = enhance(image.clone(), &config);
    let b = enhance(image.clone(), &config);
    assert_eq!(a, b);
    assert_eq!(a.dimensions(), image.dimensions());
  }

  #[test]
  fn config_deserializes_with_defaults() {
    let config: EnhanceConfig = serde_json::from_str(r#"{"turbidity": 0.5}"#).unwrap();
    assert_eq!(config.turbidity, 0.5);
    assert!(config.local_contrast);
    assert_eq!(config.clip_limit, 3.0);
  }
}
