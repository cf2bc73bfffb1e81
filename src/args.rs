// 该文件是 Shenhai （深海） 项目的一部分。
// src/args.rs - 增强参数配置
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

use std::path::PathBuf;

use thiserror::Error;
use tracing::debug;

use crate::enhance::EnhanceConfig;

#[derive(Error, Debug)]
pub enum ConfigError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("JSON 错误: {0}")]
  JsonError(#[from] serde_json::Error),
}

/// 增强流水线参数，命令行参数覆盖配置文件中的对应项
#[derive(clap::Args, Debug, Default)]
pub struct EnhanceArgs {
  /// JSON 格式的增强配置文件
  #[arg(long, value_name = "FILE")]
  pub config: Option<PathBuf>,

  /// 模拟浑浊强度 (0.0 - 1.0)，0 表示不模拟
  #[arg(long, value_name = "STRENGTH")]
  pub turbidity: Option<f32>,

  /// 关闭浑浊校正
  #[arg(long)]
  pub no_correct_turbidity: bool,

  /// 关闭绿水校正
  #[arg(long)]
  pub no_green_water: bool,

  /// 关闭局部对比度均衡
  #[arg(long)]
  pub no_local_contrast: bool,

  /// CLAHE 裁剪上限
  #[arg(long, value_name = "LIMIT")]
  pub clip_limit: Option<f32>,

  /// 叠加边缘
  #[arg(long)]
  pub edge_overlay: bool,

  /// 浑浊噪声随机种子
  #[arg(long, value_name = "SEED")]
  pub seed: Option<u64>,
}

impl EnhanceArgs {
  pub fn to_config(&self) -> Result<EnhanceConfig, ConfigError> {
    let mut config = match &self.config {
      Some(path) => {
        let data = std::fs::read(path)?;
        serde_json::from_slice(&data)?
      }
      None => EnhanceConfig::default(),
    };

    if let Some(turbidity) = self.turbidity {
      config.turbidity = turbidity.clamp(0.0, 1.0);
    }
    if let Some(clip_limit) = self.clip_limit {
      config.clip_limit = clip_limit;
    }
    if let Some(seed) = self.seed {
      config.seed = seed;
    }
    config.correct_turbidity &= !self.no_correct_turbidity;
    config.green_water &= !self.no_green_water;
    config.local_contrast &= !self.no_local_contrast;
    config.edge_overlay |= self.edge_overlay;

    debug!("增强配置: {:?}", config);
    Ok(config)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use clap::Parser;

  #[derive(Parser)]
  struct Cli {
    #[command(flatten)]
    enhance: EnhanceArgs,
  }

  #[test]
  fn flags_override_defaults() {
    let cli = Cli::parse_from([
      "shenhai",
      "--turbidity",
      "1.5",
      "--no-green-water",
      "--edge-overlay",
      "--seed",
      "42",
    ]);
    let config = cli.enhance.to_config().unwrap();
    assert_eq!(config.turbidity, 1.0);
    assert!(!config.green_water);
    assert!(config.edge_overlay);
    assert!(config.local_contrast);
    assert_eq!(config.seed, 42);
  }

  #[test]
  fn flags_apply_on_top_of_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("enhance.json");
    std::fs::write(&path, r#"{"clip_limit": 2.0, "edge_overlay": true}"#).unwrap();

    let args = EnhanceArgs {
      config: Some(path),
      no_local_contrast: true,
      ..Default::default()
    };
    let config = args.to_config().unwrap();
    assert_eq!(config.clip_limit, 2.0);
    assert!(config.edge_overlay);
    assert!(!config.local_contrast);
    assert!(config.correct_turbidity);
  }
}
