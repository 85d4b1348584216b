use serde::{Deserialize, Serialize};

use crate::geometry::{mean_point, Point2};

/// COCO 17 キーポイントインデックス（YOLOv8-pose の出力順）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum KeypointIndex {
    Nose = 0,
    LeftEye = 1,
    RightEye = 2,
    LeftEar = 3,
    RightEar = 4,
    LeftShoulder = 5,
    RightShoulder = 6,
    LeftElbow = 7,
    RightElbow = 8,
    LeftWrist = 9,
    RightWrist = 10,
    LeftHip = 11,
    RightHip = 12,
    LeftKnee = 13,
    RightKnee = 14,
    LeftAnkle = 15,
    RightAnkle = 16,
}

impl KeypointIndex {
    pub const COUNT: usize = 17;
}

/// 単一キーポイント
///
/// ダンプ上は `[x, y, confidence]` の3要素配列
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 3]", into = "[f32; 3]")]
pub struct Keypoint {
    /// X座標（ピクセル）
    pub x: f32,
    /// Y座標（ピクセル）
    pub y: f32,
    /// 信頼度スコア (0.0〜1.0)
    pub confidence: f32,
}

impl Keypoint {
    pub fn new(x: f32, y: f32, confidence: f32) -> Self {
        Self { x, y, confidence }
    }

    /// 信頼度が閾値以上か（閾値未満は欠損扱い）
    pub fn is_valid(&self, threshold: f32) -> bool {
        self.confidence >= threshold
    }

    pub fn position(&self) -> Point2 {
        Point2::new(self.x, self.y)
    }
}

impl Default for Keypoint {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            confidence: 0.0,
        }
    }
}

impl From<[f32; 3]> for Keypoint {
    fn from(v: [f32; 3]) -> Self {
        Self::new(v[0], v[1], v[2])
    }
}

impl From<Keypoint> for [f32; 3] {
    fn from(kp: Keypoint) -> Self {
        [kp.x, kp.y, kp.confidence]
    }
}

/// 1フレーム中の1人分の姿勢（PoseSet）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub keypoints: [Keypoint; KeypointIndex::COUNT],
}

impl Pose {
    pub fn new(keypoints: [Keypoint; KeypointIndex::COUNT]) -> Self {
        Self { keypoints }
    }

    /// インデックスでキーポイントを取得
    pub fn get(&self, index: KeypointIndex) -> &Keypoint {
        &self.keypoints[index as usize]
    }

    /// 閾値以上のキーポイント座標。閾値未満なら None
    pub fn valid_position(&self, index: KeypointIndex, threshold: f32) -> Option<Point2> {
        let kp = self.get(index);
        kp.is_valid(threshold).then(|| kp.position())
    }

    /// 全キーポイントの平均信頼度
    pub fn average_confidence(&self) -> f32 {
        let sum: f32 = self.keypoints.iter().map(|k| k.confidence).sum();
        sum / KeypointIndex::COUNT as f32
    }

    /// 選手の重心
    ///
    /// 左右ヒップの中点 → 片側ヒップ → 有効キーポイントの平均、の順にフォールバック
    pub fn centroid(&self, threshold: f32) -> Option<Point2> {
        let left_hip = self.valid_position(KeypointIndex::LeftHip, threshold);
        let right_hip = self.valid_position(KeypointIndex::RightHip, threshold);
        match (left_hip, right_hip) {
            (Some(l), Some(r)) => Some(l.midpoint(&r)),
            (Some(p), None) | (None, Some(p)) => Some(p),
            (None, None) => {
                let points: Vec<Point2> = self
                    .keypoints
                    .iter()
                    .filter(|k| k.is_valid(threshold))
                    .map(|k| k.position())
                    .collect();
                mean_point(&points)
            }
        }
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self {
            keypoints: [Keypoint::default(); KeypointIndex::COUNT],
        }
    }
}
