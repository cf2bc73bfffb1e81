// 该文件是 Shenhai （深海） 项目的一部分。
// src/output/save_image_file.rs - 保存图像文件
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

use image::RgbImage;
use thiserror::Error;
use tracing::info;
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, inspection::InspectionReport, output::Render};

/// 保存报告时选用的图像
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportView {
  Original,
  Enhanced,
  Annotated,
  Heatmap,
}

impl ReportView {
  fn select(self, report: &InspectionReport) -> &RgbImage {
    match self {
      ReportView::Original => &report.original,
      ReportView::Enhanced => &report.enhanced,
      ReportView::Annotated => &report.annotated,
      ReportView::Heatmap => &report.heatmap,
    }
  }
}

pub struct SaveImageFileOutput {
  path: String,
  view: ReportView,
}

#[derive(Error, Debug)]
pub enum SaveImageFileError {
  #[error("I/O 错误: {0}")]
  IoError(std::io::Error),
  #[error("图像错误: {0}")]
  ImageError(image::ImageError),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("未知的图像视图: {0}")]
  UnknownView(String),
}

impl FromUrlWithScheme for SaveImageFileOutput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for SaveImageFileOutput {
  type Error = SaveImageFileError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(SaveImageFileError::SchemeMismatch(format!(
        "期望保存方式 '{}', 实际保存方式 '{}'",
        Self::SCHEME,
        uri.scheme()
      )));
    }

    let mut view = ReportView::Annotated;
    for (k, v) in uri.query_pairs() {
      if k == "view" {
        view = match &*v {
          "original" => ReportView::Original,
          "enhanced" => ReportView::Enhanced,
          "annotated" => ReportView::Annotated,
          "heatmap" => ReportView::Heatmap,
          other => return Err(SaveImageFileError::UnknownView(other.to_string())),
        };
      }
    }

    Ok(SaveImageFileOutput {
      path: uri.path().to_string(),
      view,
    })
  }
}

impl SaveImageFileOutput {
  fn save_image(&self, image: &RgbImage) -> Result<(), SaveImageFileError> {
    if let Some(parent) = Path::new(&self.path).parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent).map_err(SaveImageFileError::IoError)?;
    }

    image
      .save(&self.path)
      .map_err(SaveImageFileError::ImageError)?;

    info!("保存图像到文件: {}", self.path);

    Ok(())
  }
}

impl Render<RgbImage> for SaveImageFileOutput {
  type Error = SaveImageFileError;

  fn render_result(&self, result: &RgbImage) -> Result<(), Self::Error> {
    self.save_image(result)
  }
}

impl Render<InspectionReport> for SaveImageFileOutput {
  type Error = SaveImageFileError;

  fn render_result(&self, result: &InspectionReport) -> Result<(), Self::Error> {
    self.save_image(self.view.select(result))
  }
}
