use crate::protocol::{Point2, PoseLandmarks};

/// BlazePose の 33 ランドマークインデックス
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum BodyLandmark {
    Nose = 0,
    LeftEyeInner = 1,
    LeftEye = 2,
    LeftEyeOuter = 3,
    RightEyeInner = 4,
    RightEye = 5,
    RightEyeOuter = 6,
    LeftEar = 7,
    RightEar = 8,
    MouthLeft = 9,
    MouthRight = 10,
    LeftShoulder = 11,
    RightShoulder = 12,
    LeftElbow = 13,
    RightElbow = 14,
    LeftWrist = 15,
    RightWrist = 16,
    LeftPinky = 17,
    RightPinky = 18,
    LeftIndex = 19,
    RightIndex = 20,
    LeftThumb = 21,
    RightThumb = 22,
    LeftHip = 23,
    RightHip = 24,
    LeftKnee = 25,
    RightKnee = 26,
    LeftAnkle = 27,
    RightAnkle = 28,
    LeftHeel = 29,
    RightHeel = 30,
    LeftFootIndex = 31,
    RightFootIndex = 32,
}

impl BodyLandmark {
    pub const COUNT: usize = 33;

    pub fn index(self) -> usize {
        self as usize
    }
}

/// 出力対象の 12 関節（出力 JSON のキー順）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackedJoint {
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
}

impl TrackedJoint {
    pub const COUNT: usize = 12;

    pub const ALL: [TrackedJoint; Self::COUNT] = [
        Self::LeftShoulder,
        Self::RightShoulder,
        Self::LeftElbow,
        Self::RightElbow,
        Self::LeftWrist,
        Self::RightWrist,
        Self::LeftHip,
        Self::RightHip,
        Self::LeftKnee,
        Self::RightKnee,
        Self::LeftAnkle,
        Self::RightAnkle,
    ];

    /// 出力 JSON のキー名
    pub fn name(self) -> &'static str {
        match self {
            Self::LeftShoulder => "leftShoulder",
            Self::RightShoulder => "rightShoulder",
            Self::LeftElbow => "leftElbow",
            Self::RightElbow => "rightElbow",
            Self::LeftWrist => "leftWrist",
            Self::RightWrist => "rightWrist",
            Self::LeftHip => "leftHip",
            Self::RightHip => "rightHip",
            Self::LeftKnee => "leftKnee",
            Self::RightKnee => "rightKnee",
            Self::LeftAnkle => "leftAnkle",
            Self::RightAnkle => "rightAnkle",
        }
    }

    /// 33点トポロジ上の対応ランドマーク
    pub fn landmark(self) -> BodyLandmark {
        match self {
            Self::LeftShoulder => BodyLandmark::LeftShoulder,
            Self::RightShoulder => BodyLandmark::RightShoulder,
            Self::LeftElbow => BodyLandmark::LeftElbow,
            Self::RightElbow => BodyLandmark::RightElbow,
            Self::LeftWrist => BodyLandmark::LeftWrist,
            Self::RightWrist => BodyLandmark::RightWrist,
            Self::LeftHip => BodyLandmark::LeftHip,
            Self::RightHip => BodyLandmark::RightHip,
            Self::LeftKnee => BodyLandmark::LeftKnee,
            Self::RightKnee => BodyLandmark::RightKnee,
            Self::LeftAnkle => BodyLandmark::LeftAnkle,
            Self::RightAnkle => BodyLandmark::RightAnkle,
        }
    }
}

/// 単一ランドマーク
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Landmark {
    /// 正規化されたX座標（画像外では 0.0〜1.0 を超える）
    pub x: f32,
    /// 正規化されたY座標
    pub y: f32,
    /// 腰中心からの相対深度（X と同じスケール）
    pub z: f32,
    /// 可視度 (0.0〜1.0)
    pub visibility: f32,
    /// 存在確率 (0.0〜1.0)
    pub presence: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            z: 0.0,
            visibility: 1.0,
            presence: 1.0,
        }
    }

    /// 出力用の2D座標（[0, 1] にクランプ）
    pub fn to_point(&self) -> Point2 {
        Point2 {
            x: clamp01(self.x),
            y: clamp01(self.y),
        }
    }
}

/// [0, 1] にクランプ。NaN は None
pub fn clamp01(value: f32) -> Option<f64> {
    if value.is_nan() {
        return None;
    }
    Some(f64::from(value.clamp(0.0, 1.0)))
}

/// 検出結果から 12 関節を抜き出す
///
/// ランドマーク列が無い・短い・該当要素が None の関節は None。
pub fn extract_pose(landmarks: Option<&[Option<Landmark>]>) -> PoseLandmarks {
    let mut pose = PoseLandmarks::empty();
    let Some(landmarks) = landmarks else {
        return pose;
    };
    for joint in TrackedJoint::ALL {
        if let Some(Some(lm)) = landmarks.get(joint.landmark().index()) {
            pose.set(joint, Some(lm.to_point()));
        }
    }
    pose
}
