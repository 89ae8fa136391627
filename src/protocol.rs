//! JSON documents exchanged on stdin/stdout.
//!
//! Input:  `{"frames": [{"idx": <any>, "base64Image": "<base64>"}]}`
//! Output: `{"frames": [{"idx": <any>, "pose": {"leftShoulder": {"x": .., "y": ..} | null, ..}}]}`

use serde::ser::SerializeMap;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use crate::pose::TrackedJoint;

// --- Input ---

#[derive(Debug, Default)]
pub struct FrameBatch {
    pub frames: Vec<FrameInput>,
}

impl FrameBatch {
    /// Parses the input document.
    ///
    /// The document and every frame must be JSON objects; serde's derived
    /// visitors would otherwise read `[]` or `[7, "..."]` positionally.
    /// A missing or `null` `frames` reads as an empty batch.
    pub fn from_json(input: &str) -> Result<Self> {
        let doc: Value = serde_json::from_str(input).context("invalid input JSON")?;
        let mut doc = match doc {
            Value::Object(doc) => doc,
            other => bail!("input must be a JSON object, got {}", kind(&other)),
        };
        let frames = match doc.remove("frames") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(frames)) => frames
                .into_iter()
                .enumerate()
                .map(|(i, frame)| FrameInput::from_value(frame).with_context(|| format!("frame {}", i)))
                .collect::<Result<_>>()?,
            Some(other) => bail!("\"frames\" must be an array, got {}", kind(&other)),
        };
        Ok(Self { frames })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FrameInput {
    /// Opaque identifier, echoed back untouched. Missing reads as `null`.
    #[serde(default)]
    pub idx: Value,
    #[serde(default, rename = "base64Image")]
    pub base64_image: Option<String>,
}

impl FrameInput {
    fn from_value(frame: Value) -> Result<Self> {
        if !frame.is_object() {
            bail!("frame must be a JSON object, got {}", kind(&frame));
        }
        serde_json::from_value(frame).context("invalid frame")
    }

    /// Image payload, if any. An empty string counts as no image.
    pub fn image_data(&self) -> Option<&str> {
        self.base64_image.as_deref().filter(|s| !s.is_empty())
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// --- Output ---

#[derive(Debug, Default, Serialize)]
pub struct PoseBatch {
    pub frames: Vec<FramePose>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FramePose {
    pub idx: Value,
    pub pose: PoseLandmarks,
}

/// Normalized 2D joint position. A coordinate the model could not produce is `null`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point2 {
    pub x: Option<f64>,
    pub y: Option<f64>,
}

/// One entry per tracked joint; serializes as an object with all twelve keys.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PoseLandmarks {
    joints: [Option<Point2>; TrackedJoint::COUNT],
}

impl PoseLandmarks {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn get(&self, joint: TrackedJoint) -> Option<&Point2> {
        self.joints[joint as usize].as_ref()
    }

    pub fn set(&mut self, joint: TrackedJoint, point: Option<Point2>) {
        self.joints[joint as usize] = point;
    }

    pub fn is_empty(&self) -> bool {
        self.joints.iter().all(Option::is_none)
    }
}

impl Serialize for PoseLandmarks {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(TrackedJoint::COUNT))?;
        for joint in TrackedJoint::ALL {
            map.serialize_entry(joint.name(), &self.get(joint))?;
        }
        map.end()
    }
}
