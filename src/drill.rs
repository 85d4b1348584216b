//! 合成ドリル
//!
//! 実動画の代わりに、ジャンプ・ドリブル・パスを1回ずつ含む検出列を生成する。
//! 座標は 720p 基準のピクセル。

use crate::geometry::Point2;
use crate::perception::{BallDetection, FrameDetections};
use crate::pose::{Keypoint, KeypointIndex, Pose};

/// ボール検出の一辺（px）
pub const BALL_SIZE: f32 = 22.0;

/// 腰の中点 `hip` を基準にした直立姿勢
///
/// 膝は腰の 50px 下、足首は 100px 下
pub fn standing_pose(hip: Point2, confidence: f32) -> Pose {
    use KeypointIndex::*;
    let offsets: [(KeypointIndex, f32, f32); KeypointIndex::COUNT] = [
        (Nose, 0.0, -160.0),
        (LeftEye, -5.0, -165.0),
        (RightEye, 5.0, -165.0),
        (LeftEar, -10.0, -160.0),
        (RightEar, 10.0, -160.0),
        (LeftShoulder, -20.0, -110.0),
        (RightShoulder, 20.0, -110.0),
        (LeftElbow, -25.0, -70.0),
        (RightElbow, 25.0, -70.0),
        (LeftWrist, -25.0, -30.0),
        (RightWrist, 25.0, -30.0),
        (LeftHip, -10.0, 0.0),
        (RightHip, 10.0, 0.0),
        (LeftKnee, -10.0, 50.0),
        (RightKnee, 10.0, 50.0),
        (LeftAnkle, -10.0, 100.0),
        (RightAnkle, 10.0, 100.0),
    ];
    let mut keypoints = [Keypoint::default(); KeypointIndex::COUNT];
    for (index, dx, dy) in offsets {
        keypoints[index as usize] = Keypoint::new(hip.x + dx, hip.y + dy, confidence);
    }
    Pose::new(keypoints)
}

/// 中心が `center` のボール検出
pub fn ball_at(center: Point2, confidence: f32) -> BallDetection {
    let half = BALL_SIZE / 2.0;
    BallDetection::new(center.x - half, center.y - half, BALL_SIZE, BALL_SIZE, confidence)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Drill {
    /// 5〜8 フレームでジャンプしながら膝でボールに触れる
    Jump,
    /// 10〜49 フレームで足元にボールを置いたまま走る
    Run,
    /// 20 フレームで足元のボールを蹴り出す
    Pass,
}

impl Drill {
    pub const ALL: [Drill; 3] = [Self::Jump, Self::Run, Self::Pass];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Jump => "jump",
            Self::Run => "run",
            Self::Pass => "pass",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.name() == name)
    }

    pub fn frames(&self) -> Vec<FrameDetections> {
        match self {
            Self::Jump => jump_frames(),
            Self::Run => run_frames(),
            Self::Pass => pass_frames(),
        }
    }
}

const CONFIDENCE: f32 = 0.9;
const GROUND_HIP_Y: f32 = 420.0;

fn frame(index: u64, hip: Point2, ball: Point2) -> FrameDetections {
    FrameDetections::new(
        index,
        vec![standing_pose(hip, CONFIDENCE)],
        vec![ball_at(ball, CONFIDENCE)],
    )
}

fn jump_frames() -> Vec<FrameDetections> {
    let x = 640.0;
    // 地面に置いたボール
    let resting = Point2::new(x + 200.0, GROUND_HIP_Y + 100.0);
    (0..30u64)
        .map(|i| {
            let lift = match i {
                5..=8 => 8.0 * (i - 4) as f32,
                9..=12 => 8.0 * (12 - i) as f32,
                _ => 0.0,
            };
            let hip = Point2::new(x, GROUND_HIP_Y - lift);
            let ball = if (5..=8).contains(&i) {
                // 左膝の少し外側、足首からは離れた位置
                Point2::new(hip.x - 30.0, hip.y + 35.0)
            } else {
                resting
            };
            frame(i, hip, ball)
        })
        .collect()
}

fn run_frames() -> Vec<FrameDetections> {
    let start_x = 200.0;
    let hip_at = |i: u64| {
        let steps = i.clamp(9, 49) - 9;
        Point2::new(start_x + 4.0 * steps as f32, GROUND_HIP_Y)
    };
    (0..60u64)
        .map(|i| {
            let hip = hip_at(i);
            // 右足首の 8px 前
            let ball = Point2::new(hip.x + 18.0, hip.y + 100.0);
            frame(i, hip, ball)
        })
        .collect()
}

fn pass_frames() -> Vec<FrameDetections> {
    let hip = Point2::new(400.0, GROUND_HIP_Y);
    let at_feet = Point2::new(hip.x + 20.0, hip.y + 100.0);
    (0..40u64)
        .map(|i| {
            let ball = if i < 20 {
                at_feet
            } else {
                Point2::new(at_feet.x + 30.0 * (i - 19) as f32, at_feet.y)
            };
            frame(i, hip, ball)
        })
        .collect()
}
