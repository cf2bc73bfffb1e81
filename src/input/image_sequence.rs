// 该文件是 Shenhai （深海） 项目的一部分。
// src/input/image_sequence.rs - 图像序列输入
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

use image::{ImageReader, RgbImage};
use thiserror::Error;
use tracing::{debug, error, warn};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme};

const EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "bmp", "tiff"];

#[derive(Error, Debug)]
pub enum ImageSequenceInputError {
  #[error("URI schema mismatch")]
  SchemaMismatch,
  #[error("I/O error: {0}")]
  IoError(#[from] std::io::Error),
  #[error("No image frames in {0}")]
  Empty(String),
}

/// 目录中的图像按文件名排序逐帧读取，无法解码的文件跳过
pub struct ImageSequenceInput {
  paths: std::vec::IntoIter<PathBuf>,
}

impl FromUrlWithScheme for ImageSequenceInput {
  const SCHEME: &'static str = "frames";
}

impl FromUrl for ImageSequenceInput {
  type Error = ImageSequenceInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(ImageSequenceInputError::SchemaMismatch);
    }

    let mut paths = Vec::new();
    for entry in std::fs::read_dir(url.path())? {
      let path = entry?.path();
      let known = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()));
      if path.is_file() && known {
        paths.push(path);
      }
    }
    if paths.is_empty() {
      return Err(ImageSequenceInputError::Empty(url.path().to_string()));
    }
    paths.sort();
    debug!("图像序列 {}: {} 帧", url.path(), paths.len());

    Ok(ImageSequenceInput {
      paths: paths.into_iter(),
    })
  }
}

impl Iterator for ImageSequenceInput {
  type Item = RgbImage;

  fn next(&mut self) -> Option<Self::Item> {
    for path in self.paths.by_ref() {
      let decoded = ImageReader::open(&path)
        .map_err(image::ImageError::from)
        .and_then(|r| r.with_guessed_format().map_err(image::ImageError::from))
        .and_then(|r| r.decode());
      match decoded {
        Ok(image) => return Some(image.to_rgb8()),
        Err(e) => warn!("跳过无法读取的帧 {}: {}", path.display(), e),
      }
    }
    None
  }
}
