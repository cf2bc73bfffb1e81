// 该文件是 Shenhai （深海） 项目的一部分。
// src/output/directory_record.rs - 巡检报告目录输出
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

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use crate::{
  FromUrl, FromUrlWithScheme, detection::Detection, inspection::InspectionReport,
  output::Render,
};

const CSV_HEADER: &str = "id,class,severity,confidence,x1,y1,x2,y2,area_px";

#[derive(Error, Debug)]
pub enum ReportDirectoryOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("JSON 错误: {0}")]
  JsonError(#[from] serde_json::Error),
}

/// 把一次巡检写入目录：四张 PNG、report.json 与 detections.csv。
/// 带 `?stamp` 时按巡检时间建立子目录。
pub struct ReportDirectoryOutput {
  directory: PathBuf,
  stamp: bool,
}

impl FromUrlWithScheme for ReportDirectoryOutput {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for ReportDirectoryOutput {
  type Error = ReportDirectoryOutputError;

  fn from_url(uri: &url::Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(ReportDirectoryOutputError::SchemeMismatch);
    }

    let stamp = uri.query_pairs().any(|(k, _)| k == "stamp");

    Ok(ReportDirectoryOutput {
      directory: PathBuf::from(uri.path()),
      stamp,
    })
  }
}

impl ReportDirectoryOutput {
  pub fn new(directory: impl Into<PathBuf>) -> Self {
    Self {
      directory: directory.into(),
      stamp: false,
    }
  }

  fn report_dir(&self, report: &InspectionReport) -> PathBuf {
    if self.stamp {
      self
        .directory
        .join(report.timestamp.format("%Y%m%d-%H%M%S").to_string())
    } else {
      self.directory.clone()
    }
  }
}

/// RFC 4180：含逗号、引号或换行的字段加引号，引号加倍
fn csv_field(value: &str) -> Cow<'_, str> {
  if value.contains([',', '"', '\n', '\r']) {
    Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
  } else {
    Cow::Borrowed(value)
  }
}

fn csv_row(d: &Detection) -> String {
  let severity = d
    .severity()
    .map(|s| s.to_string())
    .unwrap_or_default();
  format!(
    "{},{},{},{:.4},{},{},{},{},{}",
    d.id,
    csv_field(&d.label),
    severity,
    d.confidence,
    d.bbox[0],
    d.bbox[1],
    d.bbox[2],
    d.bbox[3],
    d.area()
  )
}

fn write_csv(path: &Path, detections: &[Detection]) -> Result<(), std::io::Error> {
  let mut records = Vec::with_capacity(detections.len() + 1);
  records.push(CSV_HEADER.to_string());
  records.extend(detections.iter().map(csv_row));
  std::fs::write(path, records.join("\r\n") + "\r\n")
}

impl Render<InspectionReport> for ReportDirectoryOutput {
  type Error = ReportDirectoryOutputError;

  fn render_result(&self, result: &InspectionReport) -> Result<(), Self::Error> {
    let directory = self.report_dir(result);
    if !directory.exists() {
      std::fs::create_dir_all(&directory)?;
    }

    result.original.save(directory.join("original.png"))?;
    result.enhanced.save(directory.join("enhanced.png"))?;
    result.annotated.save(directory.join("annotated.png"))?;
    result.heatmap.save(directory.join("heatmap.png"))?;

    let json = serde_json::to_vec_pretty(&result.summary())?;
    std::fs::write(directory.join("report.json"), json)?;
    write_csv(&directory.join("detections.csv"), &result.detections)?;

    info!("巡检报告已写入: {}", directory.display());
    Ok(())
  }
}
