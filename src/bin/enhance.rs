// 该文件是 Shenhai （深海） 项目的一部分。
// src/bin/enhance.rs - 只运行增强流水线
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

use anyhow::Result;
use clap::Parser;
use url::Url;

use shenhai::{
  FromUrl,
  args::EnhanceArgs,
  enhance::Pipeline,
  input::ImageFileInput,
  output::{Render, SaveImageFileOutput},
};
use tracing::info;

/// Shenhai 图像增强参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 输入图像
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 输出图像
  #[arg(long, value_name = "OUTPUT")]
  pub output: Url,
  #[command(flatten)]
  pub enhance: EnhanceArgs,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("输入来源: {}", args.input);
  info!("输出路径: {}", args.output);

  let config = args.enhance.to_config()?;
  let pipeline = Pipeline::from(&config);
  for stage in pipeline.stages() {
    let state = if stage.enabled() { "启用" } else { "关闭" };
    info!("阶段 {}: {}", stage.kind().name(), state);
  }

  let input = ImageFileInput::from_url(&args.input)?;
  let output = SaveImageFileOutput::from_url(&args.output)?;

  let now = std::time::Instant::now();
  for image in input {
    let enhanced = pipeline.run(image);
    info!("增强完成，耗时: {:.2?}", now.elapsed());
    output.render_result(&enhanced)?;
  }

  Ok(())
}
