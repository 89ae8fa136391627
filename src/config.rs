use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::pose::LANDMARK_INPUT_SIZE;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// stderr 診断ログのフィルタ (tracing の directive 形式)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub model: ModelConfig,
    /// 未設定ならフレーム全体をそのまま推論する
    #[serde(default)]
    pub person: Option<PersonConfig>,
}

fn default_log_level() -> String { "warn".to_string() }

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            model: ModelConfig::default(),
            person: None,
        }
    }
}

/// ランドマーク推定モデル (BlazePose 33点)
#[derive(Debug, Deserialize, Clone)]
pub struct ModelConfig {
    /// ONNXモデルのパス
    #[serde(default = "default_model_path")]
    pub path: String,
    #[serde(default = "default_model_input")]
    pub input_name: String,
    /// [1, N*5] (x, y, z, visibility, presence)
    #[serde(default = "default_landmarks_output")]
    pub landmarks_output: String,
    /// [1, 1] 姿勢の存在スコア
    #[serde(default = "default_pose_flag_output")]
    pub pose_flag_output: String,
    /// 入力の辺長（ピクセル）
    #[serde(default = "default_model_input_size")]
    pub input_size: u32,
    /// これ未満の存在スコアは「姿勢なし」
    #[serde(default = "default_min_detection_confidence")]
    pub min_detection_confidence: f32,
}

fn default_model_path() -> String { "models/pose_landmark_heavy.onnx".to_string() }
fn default_model_input() -> String { "input_1".to_string() }
fn default_landmarks_output() -> String { "Identity".to_string() }
fn default_pose_flag_output() -> String { "Identity_1".to_string() }
fn default_model_input_size() -> u32 { LANDMARK_INPUT_SIZE }
fn default_min_detection_confidence() -> f32 { 0.3 }

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: default_model_path(),
            input_name: default_model_input(),
            landmarks_output: default_landmarks_output(),
            pose_flag_output: default_pose_flag_output(),
            input_size: default_model_input_size(),
            min_detection_confidence: default_min_detection_confidence(),
        }
    }
}

/// 人物検出モデル (YOLOv8, class 0 = person)
#[derive(Debug, Deserialize, Clone)]
pub struct PersonConfig {
    #[serde(default = "default_person_path")]
    pub path: String,
    #[serde(default = "default_person_input")]
    pub input_name: String,
    /// [1, 4+C, N]
    #[serde(default = "default_person_output")]
    pub output_name: String,
    #[serde(default = "default_person_input_size")]
    pub input_size: u32,
    /// 人物検出の信頼度閾値
    #[serde(default = "default_min_score")]
    pub min_score: f32,
    /// BBox の拡張率（中心を保持）
    #[serde(default = "default_expand")]
    pub expand: f32,
}

fn default_person_path() -> String { "models/yolov8n.onnx".to_string() }
fn default_person_input() -> String { "images".to_string() }
fn default_person_output() -> String { "output0".to_string() }
fn default_person_input_size() -> u32 { 640 }
fn default_min_score() -> f32 { 0.25 }
fn default_expand() -> f32 { 1.25 }

impl Default for PersonConfig {
    fn default() -> Self {
        Self {
            path: default_person_path(),
            input_name: default_person_input(),
            output_name: default_person_output(),
            input_size: default_person_input_size(),
            min_score: default_min_score(),
            expand: default_expand(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("invalid config {}", path.display()))
    }

    /// ファイルが無ければデフォルト。あるのに壊れていればエラー
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }
}
