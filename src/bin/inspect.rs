// 该文件是 Shenhai （深海） 项目的一部分。
// src/bin/inspect.rs - 单帧与序列巡检
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

use anyhow::Result;
use clap::Parser;
use url::Url;

use shenhai::{
  FromUrl, FromUrlWithScheme,
  annotate::Annotator,
  args::EnhanceArgs,
  input::{DetectorWrapper, ImageFileInput, ImageSequenceInput},
  inspection::{InspectionReport, Inspector},
  output::{OutputWrapper, Render},
};
use tracing::{info, warn};

/// Shenhai 巡检参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 输入图像，如 image:///data/frame.png；或图像序列目录，如 frames:///data/dive
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 序列巡检时每隔多少帧取一帧
  #[arg(long, value_name = "N", default_value_t = 1)]
  pub sample_every: usize,
  /// 检测结果来源，json:///path/dets.json 或 synthetic://pipeline?seed=7
  #[arg(long, value_name = "DETECTIONS", default_value = "synthetic://all")]
  pub detections: Url,
  /// 输出路径，folder:///out 或 image:///out.png?view=heatmap
  #[arg(long, value_name = "OUTPUT")]
  pub output: Url,
  /// 标注用字体文件
  #[arg(long, value_name = "FONT")]
  pub font: Option<PathBuf>,
  #[command(flatten)]
  pub enhance: EnhanceArgs,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("输入来源: {}", args.input);
  info!("检测来源: {}", args.detections);
  info!("输出路径: {}", args.output);

  let config = args.enhance.to_config()?;
  let annotator = match &args.font {
    Some(path) => Annotator::with_font_file(path),
    None => Annotator::default(),
  };
  let inspector = Inspector::new(&config, annotator);

  let detector = DetectorWrapper::from_url(&args.detections)?;
  let output = OutputWrapper::from_url(&args.output)?;

  info!("开始巡检...");
  if args.input.scheme() == ImageSequenceInput::SCHEME {
    let frames = ImageSequenceInput::from_url(&args.input)?;
    match inspector.inspect_sequence(frames, &detector, args.sample_every)? {
      Some(report) => finish(&report, &output)?,
      None => warn!("序列中没有可读取的帧"),
    }
  } else {
    for image in ImageFileInput::from_url(&args.input)? {
      let report = inspector.inspect(image, &detector)?;
      finish(&report, &output)?;
    }
  }

  Ok(())
}

fn finish(report: &InspectionReport, output: &OutputWrapper) -> Result<()> {
  if report.rejected > 0 {
    warn!("{} 个检测结果无效，已丢弃", report.rejected);
  }
  info!(
    "{} 帧，{} 个目标，风险评分 {}，等级 {}",
    report.frames,
    report.detections.len(),
    report.risk_score,
    report.grade
  );
  output.render_result(report)?;
  Ok(())
}
