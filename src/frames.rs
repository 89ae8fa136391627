//! Per-frame loop: decode, estimate, extract, in input order.

use anyhow::{Context, Result};
use std::time::Instant;
use tracing::debug;

use crate::decode::decode_image;
use crate::pose::{extract_pose, PoseEstimator};
use crate::protocol::{FrameBatch, FrameInput, FramePose, PoseBatch, PoseLandmarks};

/// Runs frames through a pose estimator that is created on first use.
///
/// The estimator is loaded at most once and reused for every later frame.
/// Batches without images never load it.
pub struct FrameProcessor<E, F> {
    estimator: Option<E>,
    load: F,
}

impl<E, F> FrameProcessor<E, F>
where
    E: PoseEstimator,
    F: FnMut() -> Result<E>,
{
    pub fn new(load: F) -> Self {
        Self {
            estimator: None,
            load,
        }
    }

    fn estimator(&mut self) -> Result<&mut E> {
        let estimator = match self.estimator.take() {
            Some(estimator) => estimator,
            None => (self.load)()?,
        };
        Ok(self.estimator.insert(estimator))
    }

    /// Landmarks for a single frame. No image means all joints are `null`.
    pub fn process_frame(&mut self, frame: &FrameInput) -> Result<PoseLandmarks> {
        let Some(data) = frame.image_data() else {
            return Ok(PoseLandmarks::empty());
        };
        let image = decode_image(data)?;
        let landmarks = self.estimator()?.estimate(&image)?;
        Ok(extract_pose(landmarks.as_deref()))
    }

    /// Processes every frame in order. The first failing frame aborts the batch.
    pub fn process_batch(&mut self, batch: FrameBatch) -> Result<PoseBatch> {
        let mut frames = Vec::with_capacity(batch.frames.len());
        for (position, frame) in batch.frames.into_iter().enumerate() {
            let start = Instant::now();
            let pose = self
                .process_frame(&frame)
                .with_context(|| format!("frame {} (idx {})", position, frame.idx))?;
            debug!(
                position,
                detected = !pose.is_empty(),
                elapsed_ms = start.elapsed().as_millis() as u64,
                "frame processed"
            );
            frames.push(FramePose {
                idx: frame.idx,
                pose,
            });
        }
        Ok(PoseBatch { frames })
    }

    /// Parses an input document and renders the output document.
    pub fn process_json(&mut self, input: &str) -> Result<String> {
        let batch = FrameBatch::from_json(input)?;
        let output = self.process_batch(batch)?;
        serde_json::to_string(&output).context("failed to serialize output")
    }
}
