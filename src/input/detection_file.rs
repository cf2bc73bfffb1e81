// 该文件是 Shenhai （深海） 项目的一部分。
// src/input/detection_file.rs - 外部检测器输出的 JSON 文件
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
use thiserror::Error;
use tracing::{debug, error};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  detection::{Detection, Detector},
};

#[derive(Error, Debug)]
pub enum DetectionFileError {
  #[error("URI schema mismatch")]
  SchemaMismatch,
  #[error("I/O error: {0}")]
  IoError(#[from] std::io::Error),
  #[error("JSON error: {0}")]
  JsonError(#[from] serde_json::Error),
}

/// 预先计算好的检测结果，格式为
/// `[{"id": 1, "label": "flange", "confidence": 0.8, "bbox": [x1, y1, x2, y2]}]`
pub struct DetectionFile {
  detections: Vec<Detection>,
}

impl FromUrlWithScheme for DetectionFile {
  const SCHEME: &'static str = "json";
}

impl FromUrl for DetectionFile {
  type Error = DetectionFileError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(DetectionFileError::SchemaMismatch);
    }

    let data = std::fs::read(url.path())?;
    let detections = Self::parse(&data)?.detections;
    debug!("读取 {} 个检测结果: {}", detections.len(), url.path());
    Ok(DetectionFile { detections })
  }
}

impl DetectionFile {
  pub fn parse(data: &[u8]) -> Result<Self, DetectionFileError> {
    let detections: Vec<Detection> = serde_json::from_slice(data)?;
    Ok(DetectionFile { detections })
  }
}

impl Detector for DetectionFile {
  type Error = DetectionFileError;

  fn detect(&self, _image: &RgbImage) -> Result<Vec<Detection>, Self::Error> {
    Ok(self.detections.clone())
  }
}
