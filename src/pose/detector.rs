use anyhow::{bail, Context, Result};
use image::RgbImage;
use ndarray::ArrayViewD;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;
use std::borrow::Cow;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

use super::crop::{crop, square_region, BBox, CropRegion};
use super::keypoint::{BodyLandmark, Landmark};
use super::person_detector::PersonDetector;
use super::preprocess::{letterbox, LetterboxInfo};
use crate::config::Config;

/// 1フレーム分の姿勢推定
///
/// `Ok(None)` は「姿勢なし」。`Some` の場合は BodyLandmark 順のランドマーク列で、
/// 各座標はフレーム全体に対する正規化座標（クランプ前）。
pub trait PoseEstimator {
    fn estimate(&mut self, image: &RgbImage) -> Result<Option<Vec<Option<Landmark>>>>;
}

/// ONNX セッションを構築（cuda feature 時は CUDA を試す）
pub fn build_session<P: AsRef<Path>>(model_path: P) -> Result<Session> {
    let model_path = model_path.as_ref();
    open_session(model_path)
        .with_context(|| format!("Failed to load ONNX model {}", model_path.display()))
}

fn open_session(model_path: &Path) -> Result<Session> {
    let builder = Session::builder()?
        .with_optimization_level(GraphOptimizationLevel::Level3)?;

    #[cfg(feature = "cuda")]
    let builder = {
        debug!("[ort] Attempting CUDA execution provider...");
        builder.with_execution_providers([ort::execution_providers::CUDAExecutionProvider::default().build()])?
    };

    Ok(builder.commit_from_file(model_path)?)
}

/// BlazePose (33点) を使用した姿勢検出器
///
/// 人物検出器が設定されていれば、検出した人物の周囲を切り出してから推論する。
pub struct BlazePoseDetector {
    session: Session,
    input_name: String,
    landmarks_output: String,
    pose_flag_output: String,
    input_size: u32,
    min_detection_confidence: f32,
    person: Option<(PersonDetector, f32)>,
}

impl BlazePoseDetector {
    /// ONNXモデルを読み込んで初期化
    pub fn new(config: &Config) -> Result<Self> {
        let start = Instant::now();
        let model = &config.model;
        let session = build_session(&model.path)?;

        let person = match &config.person {
            Some(pc) => Some((PersonDetector::new(pc)?, pc.expand)),
            None => None,
        };

        info!(
            model = %model.path,
            person_detector = person.is_some(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "pose model loaded"
        );

        Ok(Self {
            session,
            input_name: model.input_name.clone(),
            landmarks_output: model.landmarks_output.clone(),
            pose_flag_output: model.pose_flag_output.clone(),
            input_size: model.input_size,
            min_detection_confidence: model.min_detection_confidence,
            person,
        })
    }

    /// 推論対象の領域を決める。人物が見つからなければ None
    fn region_of_interest(&mut self, image: &RgbImage) -> Result<Option<CropRegion>> {
        let (w, h) = image.dimensions();
        match self.person.as_mut() {
            None => Ok(Some(CropRegion::full())),
            Some((detector, expand)) => Ok(person_region(detector.detect(image)?, w, h, *expand)),
        }
    }
}

/// 人物検出結果からクロップ領域を決める。人物なしなら None（姿勢なし扱い）
pub fn person_region(bbox: Option<BBox>, frame_w: u32, frame_h: u32, expand: f32) -> Option<CropRegion> {
    bbox.map(|bbox| square_region(&bbox, frame_w, frame_h, expand))
}

/// 存在スコア（先頭要素）が閾値以上か。空・NaN は「姿勢なし」
pub fn pose_present(flag: &ArrayViewD<f32>, threshold: f32) -> bool {
    flag.iter().next().is_some_and(|&score| score >= threshold)
}

impl PoseEstimator for BlazePoseDetector {
    fn estimate(&mut self, image: &RgbImage) -> Result<Option<Vec<Option<Landmark>>>> {
        let (w, h) = image.dimensions();
        if w == 0 || h == 0 {
            bail!("empty image ({}x{})", w, h);
        }

        let Some(region) = self.region_of_interest(image)? else {
            debug!("no person detected");
            return Ok(None);
        };
        let roi: Cow<RgbImage> = if region.is_full() {
            Cow::Borrowed(image)
        } else {
            Cow::Owned(crop(image, &region))
        };

        let (input, letterbox_info) = letterbox(&roi, self.input_size)?;
        let input_tensor = Tensor::from_array(input)?;
        let outputs = self
            .session
            .run(ort::inputs![self.input_name.as_str() => input_tensor])
            .context("Inference failed")?;

        let flag: ArrayViewD<f32> = outputs
            .get(self.pose_flag_output.as_str())
            .with_context(|| format!("model has no output {:?}", self.pose_flag_output))?
            .try_extract_array()
            .context("Failed to extract pose flag")?;
        if !pose_present(&flag, self.min_detection_confidence) {
            debug!(flag = ?flag.iter().next(), "pose flag below threshold");
            return Ok(None);
        }

        let raw: ArrayViewD<f32> = outputs
            .get(self.landmarks_output.as_str())
            .with_context(|| format!("model has no output {:?}", self.landmarks_output))?
            .try_extract_array()
            .context("Failed to extract landmarks")?;
        let values: Vec<f32> = raw.iter().copied().collect();

        decode_landmarks(&values, &letterbox_info, &region).map(Some)
    }
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// モデル出力 (x, y, z, visibility, presence) x N をフレーム正規化座標に変換
///
/// x, y, z は入力ピクセル単位、visibility / presence はロジット。
/// 先頭 33 点のみ使う（残りは補助点）。
pub fn decode_landmarks(
    values: &[f32],
    letterbox: &LetterboxInfo,
    region: &CropRegion,
) -> Result<Vec<Option<Landmark>>> {
    const STRIDE: usize = 5;
    if values.len() % STRIDE != 0 || values.len() / STRIDE < BodyLandmark::COUNT {
        bail!(
            "landmark tensor has {} values, expected at least {} x {}",
            values.len(),
            BodyLandmark::COUNT,
            STRIDE
        );
    }

    // z は幅で正規化
    let z_scale = region.width / (letterbox.scale_x * letterbox.src_width as f32);

    let landmarks = values
        .chunks_exact(STRIDE)
        .take(BodyLandmark::COUNT)
        .map(|v| {
            let (rx, ry) = letterbox.to_source(v[0], v[1]);
            let (x, y) = region.to_frame(rx, ry);
            Some(Landmark {
                x,
                y,
                z: v[2] * z_scale,
                visibility: sigmoid(v[3]),
                presence: sigmoid(v[4]),
            })
        })
        .collect();
    Ok(landmarks)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity_letterbox(size: u32) -> LetterboxInfo {
        LetterboxInfo {
            scale_x: 1.0,
            scale_y: 1.0,
            pad_x: 0.0,
            pad_y: 0.0,
            src_width: size,
            src_height: size,
        }
    }

    #[test]
    fn test_decode_landmarks_full_frame() {
        let mut values = vec![0.0f32; 39 * 5];
        let i = BodyLandmark::LeftKnee.index();
        values[i * 5] = 64.0;
        values[i * 5 + 1] = 192.0;
        values[i * 5 + 3] = 0.0;

        let landmarks =
            decode_landmarks(&values, &identity_letterbox(256), &CropRegion::full()).unwrap();
        assert_eq!(landmarks.len(), BodyLandmark::COUNT);

        let knee = landmarks[i].unwrap();
        assert!((knee.x - 0.25).abs() < 1e-6);
        assert!((knee.y - 0.75).abs() < 1e-6);
        assert!((knee.visibility - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_decode_landmarks_with_crop_and_padding() {
        // 元画像 128x256 → 128x256 に縮小, pad_x = 64
        let letterbox_info = LetterboxInfo {
            scale_x: 1.0,
            scale_y: 1.0,
            pad_x: 64.0,
            pad_y: 0.0,
            src_width: 128,
            src_height: 256,
        };
        let region = CropRegion { x: 0.5, y: 0.25, width: 0.5, height: 0.5 };

        let mut values = vec![0.0f32; 33 * 5];
        let i = BodyLandmark::RightWrist.index();
        values[i * 5] = 128.0; // クロップ内 x = 0.5
        values[i * 5 + 1] = 64.0; // クロップ内 y = 0.25

        let landmarks = decode_landmarks(&values, &letterbox_info, &region).unwrap();
        let wrist = landmarks[i].unwrap();
        assert!((wrist.x - 0.75).abs() < 1e-6);
        assert!((wrist.y - 0.375).abs() < 1e-6);

        // パディング上の点はフレーム外（後段でクランプ）
        let nose = landmarks[BodyLandmark::Nose.index()].unwrap();
        assert!(nose.x < region.x);
    }

    #[test]
    fn test_decode_landmarks_rejects_short_tensor() {
        let values = vec![0.0f32; 32 * 5];
        let err = decode_landmarks(&values, &identity_letterbox(256), &CropRegion::full());
        assert!(err.is_err());

        let values = vec![0.0f32; 33 * 5 + 2];
        let err = decode_landmarks(&values, &identity_letterbox(256), &CropRegion::full());
        assert!(err.is_err());
    }

    #[test]
    fn test_pose_present_threshold() {
        let flag = ndarray::arr2(&[[0.3f32]]).into_dyn();
        assert!(pose_present(&flag.view(), 0.3));
        assert!(!pose_present(&flag.view(), 0.31));

        let nan = ndarray::arr2(&[[f32::NAN]]).into_dyn();
        assert!(!pose_present(&nan.view(), 0.3));

        let empty = ndarray::ArrayD::<f32>::zeros(ndarray::IxDyn(&[1, 0]));
        assert!(!pose_present(&empty.view(), 0.0));
    }

    #[test]
    fn test_person_region() {
        // 人物なし → 姿勢なし
        assert!(person_region(None, 640, 480, 1.25).is_none());

        let bbox = BBox { x: 200.0, y: 100.0, width: 80.0, height: 160.0 };
        let region = person_region(Some(bbox), 640, 480, 1.25).unwrap();
        assert_eq!(region, square_region(&bbox, 640, 480, 1.25));
        assert!(!region.is_full());
    }

    #[test]
    fn test_sigmoid() {
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-6);
        assert!(sigmoid(10.0) > 0.99);
        assert!(sigmoid(-10.0) < 0.01);
    }
}
