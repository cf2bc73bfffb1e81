// 该文件是 Shenhai （深海） 项目的一部分。
// src/inspection.rs - 单帧与序列巡检流程
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

use std::collections::BTreeMap;
use std::time::Instant;

use chrono::{Local, NaiveDateTime};
use image::RgbImage;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
  annotate::Annotator,
  detection::{Detection, Detector},
  enhance::{EnhanceConfig, Pipeline},
  heatmap::build_heatmap,
  risk::{self, Grade},
  severity::Severity,
};

/// 一次巡检的全部产出，四张图像与输入尺寸一致
pub struct InspectionReport {
  pub timestamp: NaiveDateTime,
  pub original: RgbImage,
  pub enhanced: RgbImage,
  pub annotated: RgbImage,
  pub heatmap: RgbImage,
  pub detections: Vec<Detection>,
  pub rejected: usize,
  pub risk_score: u32,
  pub grade: Grade,
  /// 参与评分的帧数，单帧巡检为 1
  pub frames: usize,
}

/// 写入 report.json 的摘要
#[derive(Debug, Serialize)]
pub struct InspectionSummary<'a> {
  pub timestamp: String,
  pub width: u32,
  pub height: u32,
  pub risk_score: u32,
  pub grade: Grade,
  pub rejected: usize,
  pub frames: usize,
  pub tier_counts: BTreeMap<Severity, usize>,
  pub detections: &'a [Detection],
}

impl InspectionReport {
  pub fn summary(&self) -> InspectionSummary<'_> {
    InspectionSummary {
      timestamp: self.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
      width: self.original.width(),
      height: self.original.height(),
      risk_score: self.risk_score,
      grade: self.grade,
      rejected: self.rejected,
      frames: self.frames,
      tier_counts: risk::tier_counts(&self.detections).into_iter().collect(),
      detections: &self.detections,
    }
  }
}

pub struct Inspector {
  pipeline: Pipeline,
  annotator: Annotator,
}

impl Inspector {
  pub fn new(config: &EnhanceConfig, annotator: Annotator) -> Self {
    Self {
      pipeline: Pipeline::from(config),
      annotator,
    }
  }

  pub fn enhance(&self, image: RgbImage) -> RgbImage {
    self.pipeline.run(image)
  }

  /// 增强、检测、分级、绘制与评分
  pub fn inspect<D: Detector>(
    &self,
    image: RgbImage,
    detector: &D,
  ) -> Result<InspectionReport, D::Error> {
    let now = Instant::now();
    let enhanced = self.enhance(image.clone());
    info!("增强完成，耗时: {:.2?}", now.elapsed());

    let now = Instant::now();
    let detections = detector.detect(&enhanced)?;
    info!("检测完成，{} 个目标，耗时: {:.2?}", detections.len(), now.elapsed());

    Ok(self.assess(image, enhanced, detections, Local::now().naive_local()))
  }

  /// 对已有检测结果执行分级、标注、热力图与评分
  pub fn assess(
    &self,
    original: RgbImage,
    enhanced: RgbImage,
    detections: Vec<Detection>,
    timestamp: NaiveDateTime,
  ) -> InspectionReport {
    let (w, h) = enhanced.dimensions();
    let total = detections.len();
    let detections = screen(detections, w, h);
    let rejected = total - detections.len();

    let now = Instant::now();
    let annotated = self.annotator.annotate(&enhanced, &detections, timestamp);
    let heatmap = build_heatmap(&enhanced, &detections);
    let risk_score = risk::score(&detections);
    let grade = risk::grade(risk_score);
    info!(
      "渲染完成，耗时: {:.2?}，风险评分 {} ({})",
      now.elapsed(),
      risk_score,
      grade
    );

    InspectionReport {
      timestamp,
      original,
      enhanced,
      annotated,
      heatmap,
      detections,
      rejected,
      risk_score,
      grade,
      frames: 1,
    }
  }

  /// 序列巡检：每 `sample_every` 帧取一帧增强并检测，
  /// 检测编号在整个序列内从 1 连续编号，评分与等级按全部检测汇总。
  /// 检测最多的帧（并列取最早）作为代表帧给出增强图与标注图，
  /// 热力图在代表帧上叠加全部检测。序列为空时返回 `None`。
  pub fn inspect_sequence<I, D>(
    &self,
    frames: I,
    detector: &D,
    sample_every: usize,
  ) -> Result<Option<InspectionReport>, D::Error>
  where
    I: IntoIterator<Item = RgbImage>,
    D: Detector,
  {
    self.inspect_sequence_at(frames, detector, sample_every, Local::now().naive_local())
  }

  pub fn inspect_sequence_at<I, D>(
    &self,
    frames: I,
    detector: &D,
    sample_every: usize,
    timestamp: NaiveDateTime,
  ) -> Result<Option<InspectionReport>, D::Error>
  where
    I: IntoIterator<Item = RgbImage>,
    D: Detector,
  {
    let now = Instant::now();
    let mut original = None;
    let mut best: Option<(RgbImage, Vec<Detection>)> = None;
    let mut detections = Vec::new();
    let mut rejected = 0;
    let mut sampled = 0;

    for (index, frame) in frames.into_iter().enumerate().step_by(sample_every.max(1)) {
      if original.is_none() {
        original = Some(frame.clone());
      }
      let enhanced = self.enhance(frame);
      let (w, h) = enhanced.dimensions();
      let raw = detector.detect(&enhanced)?;
      let total = raw.len();
      let mut found = screen(raw, w, h);
      rejected += total - found.len();

      for d in found.iter_mut() {
        d.id = detections.len() as u32 + 1;
        d.frame = Some(index as u64);
        detections.push(d.clone());
      }
      debug!("第 {} 帧: {} 个目标", index, found.len());
      sampled += 1;

      if best.as_ref().is_none_or(|(_, b)| found.len() > b.len()) {
        best = Some((enhanced, found));
      }
    }

    let (Some(original), Some((enhanced, representative))) = (original, best) else {
      warn!("序列中没有可用的帧");
      return Ok(None);
    };
    info!(
      "序列检测完成，{} 帧，{} 个目标，耗时: {:.2?}",
      sampled,
      detections.len(),
      now.elapsed()
    );

    let now = Instant::now();
    let annotated = self.annotator.annotate(&enhanced, &representative, timestamp);
    let heatmap = build_heatmap(&enhanced, &detections);
    let risk_score = risk::score(&detections);
    let grade = risk::grade(risk_score);
    info!(
      "渲染完成，耗时: {:.2?}，风险评分 {} ({})",
      now.elapsed(),
      risk_score,
      grade
    );

    Ok(Some(InspectionReport {
      timestamp,
      original,
      enhanced,
      annotated,
      heatmap,
      detections,
      rejected,
      risk_score,
      grade,
      frames: sampled,
    }))
  }
}

/// 丢弃越界或退化的检测框，其余按类别分级
fn screen(detections: Vec<Detection>, width: u32, height: u32) -> Vec<Detection> {
  detections
    .into_iter()
    .filter(|d| match d.validate(width, height) {
      Ok(()) => true,
      Err(e) => {
        warn!("丢弃无效检测: {}", e);
        false
      }
    })
    .map(Detection::classified)
    .collect()
}
