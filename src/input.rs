// 该文件是 Shenhai （深海） 项目的一部分。
// src/input.rs - 图像与检测结果输入
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

use crate::{
  FromUrl,
  detection::{Detection, Detector},
};

#[cfg(feature = "read_image_file")]
mod read_image_file;
#[cfg(feature = "read_image_file")]
pub use self::read_image_file::{ImageFileInput, ImageFileInputError};

#[cfg(feature = "read_image_file")]
mod image_sequence;
#[cfg(feature = "read_image_file")]
pub use self::image_sequence::{ImageSequenceInput, ImageSequenceInputError};

#[cfg(feature = "detection_file")]
mod detection_file;
#[cfg(feature = "detection_file")]
pub use self::detection_file::{DetectionFile, DetectionFileError};

mod synthetic;
pub use self::synthetic::{InspectionMode, SyntheticDetector, SyntheticDetectorError};

#[derive(Error, Debug)]
pub enum InputError {
  #[cfg(feature = "read_image_file")]
  #[error("Image file input error: {0}")]
  ImageFileInputError(#[from] ImageFileInputError),
  #[cfg(feature = "read_image_file")]
  #[error("Image sequence input error: {0}")]
  ImageSequenceInputError(#[from] ImageSequenceInputError),
  #[cfg(feature = "detection_file")]
  #[error("Detection file error: {0}")]
  DetectionFileError(#[from] DetectionFileError),
  #[error("Synthetic detector error: {0}")]
  SyntheticDetectorError(#[from] SyntheticDetectorError),
  #[error("URI scheme mismatch")]
  SchemeMismatch,
}

/// 按 URI 方案选择检测结果来源
pub enum DetectorWrapper {
  #[cfg(feature = "detection_file")]
  DetectionFile(DetectionFile),
  Synthetic(SyntheticDetector),
}

impl FromUrl for DetectorWrapper {
  type Error = InputError;

  fn from_url(url: &url::Url) -> Result<Self, Self::Error> {
    use crate::FromUrlWithScheme;

    #[cfg(feature = "detection_file")]
    {
      if url.scheme() == DetectionFile::SCHEME {
        let input = DetectionFile::from_url(url)?;
        return Ok(DetectorWrapper::DetectionFile(input));
      }
    }
    if url.scheme() == SyntheticDetector::SCHEME {
      let input = SyntheticDetector::from_url(url)?;
      return Ok(DetectorWrapper::Synthetic(input));
    }
    Err(InputError::SchemeMismatch)
  }
}

impl Detector for DetectorWrapper {
  type Error = InputError;

  fn detect(&self, image: &RgbImage) -> Result<Vec<Detection>, Self::Error> {
    match self {
      #[cfg(feature = "detection_file")]
      DetectorWrapper::DetectionFile(input) => Ok(input.detect(image)?),
      DetectorWrapper::Synthetic(input) => Ok(input.detect(image)?),
    }
  }
}
