pub mod crop;
pub mod detector;
pub mod keypoint;
pub mod person_detector;
pub mod preprocess;

pub use crop::{crop, square_region, BBox, CropRegion};
pub use detector::{BlazePoseDetector, PoseEstimator};
pub use keypoint::{clamp01, extract_pose, BodyLandmark, Landmark, TrackedJoint};
pub use person_detector::PersonDetector;
pub use preprocess::{letterbox, to_nchw, LetterboxInfo, LANDMARK_INPUT_SIZE};
