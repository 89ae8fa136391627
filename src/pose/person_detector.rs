use anyhow::{bail, Context, Result};
use image::RgbImage;
use ndarray::ArrayViewD;
use ort::session::Session;
use ort::value::Tensor;
use tracing::debug;

use super::crop::BBox;
use super::detector::build_session;
use super::preprocess::to_nchw;
use crate::config::PersonConfig;

/// YOLOv8ベースの人物検出器
pub struct PersonDetector {
    session: Session,
    input_name: String,
    output_name: String,
    input_size: u32,
    min_score: f32,
}

impl PersonDetector {
    /// ONNXモデルを読み込んで初期化
    pub fn new(config: &PersonConfig) -> Result<Self> {
        let session = build_session(&config.path)
            .context("Failed to load person detection ONNX model")?;
        Ok(Self {
            session,
            input_name: config.input_name.clone(),
            output_name: config.output_name.clone(),
            input_size: config.input_size,
            min_score: config.min_score,
        })
    }

    /// フレームから人物を検出し、最もスコアの高い人物のBBoxを返す
    pub fn detect(&mut self, image: &RgbImage) -> Result<Option<BBox>> {
        let (frame_w, frame_h) = image.dimensions();
        let input = to_nchw(image, self.input_size);

        let input_tensor = Tensor::from_array(input)?;
        let outputs = self
            .session
            .run(ort::inputs![self.input_name.as_str() => input_tensor])
            .context("Person detection inference failed")?;

        let output: ArrayViewD<f32> = outputs
            .get(self.output_name.as_str())
            .with_context(|| format!("person model has no output {:?}", self.output_name))?
            .try_extract_array()
            .context("Failed to extract person detection output")?;

        let scale_x = frame_w as f32 / self.input_size as f32;
        let scale_y = frame_h as f32 / self.input_size as f32;
        let bbox = best_person(&output, self.min_score, scale_x, scale_y)?;
        debug!(?bbox, "person detection");
        Ok(bbox)
    }
}

/// 出力 [1, 4+C, N] から class 0 (person) の最高スコアの検出を選び、フレーム座標に変換
pub fn best_person(
    output: &ArrayViewD<f32>,
    min_score: f32,
    scale_x: f32,
    scale_y: f32,
) -> Result<Option<BBox>> {
    let shape = output.shape();
    if shape.len() != 3 || shape[0] != 1 || shape[1] < 5 {
        bail!("unexpected person detection output shape {:?}", shape);
    }

    let n_detections = shape[2];
    let mut best_score: f32 = 0.0;
    let mut best_idx: Option<usize> = None;

    for i in 0..n_detections {
        let person_score = output[[0, 4, i]];
        if person_score > best_score && person_score >= min_score {
            best_score = person_score;
            best_idx = Some(i);
        }
    }

    let Some(idx) = best_idx else {
        return Ok(None);
    };

    // 座標変換: 入力サイズ基準 → フレーム座標
    let cx = output[[0, 0, idx]];
    let cy = output[[0, 1, idx]];
    let w = output[[0, 2, idx]];
    let h = output[[0, 3, idx]];

    Ok(Some(BBox {
        x: (cx - w / 2.0) * scale_x,
        y: (cy - h / 2.0) * scale_y,
        width: w * scale_x,
        height: h * scale_y,
    }))
}
