use std::collections::VecDeque;

use tracing::trace;

use super::{KeypointDistances, Signal};
use crate::config::AnalysisConfig;
use crate::geometry::{joint_angle_deg, Point2};
use crate::perception::{select_ball, BallDetection, Frame, FrameDetections};
use crate::pose::{KeypointIndex, PlayerSelector, Pose};

/// フレームごとの検出 → Signal 変換
///
/// 速度計算のために直近 `history_frames` フレーム分の Signal だけを保持する。
pub struct SignalExtractor {
    confidence_threshold: f32,
    history_frames: u64,
    fps: f32,
    selector: Box<dyn PlayerSelector>,
    history: VecDeque<Signal>,
}

impl SignalExtractor {
    pub fn new(confidence_threshold: f32, history_frames: u32, fps: f32, selector: Box<dyn PlayerSelector>) -> Self {
        Self {
            confidence_threshold,
            history_frames: history_frames as u64,
            fps,
            selector,
            history: VecDeque::with_capacity(history_frames as usize + 1),
        }
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self::new(
            config.min_detection_confidence,
            config.history_frames,
            config.fps,
            config.player_selection.selector(),
        )
    }

    /// 選手とボールを選択してから Signal を作る
    pub fn extract_frame(&mut self, detections: &FrameDetections) -> Signal {
        let frame = Frame::new(detections.frame_index, self.fps);
        let player = self
            .selector
            .select(&detections.poses, self.confidence_threshold)
            .map(|i| &detections.poses[i]);
        let ball = select_ball(&detections.balls, self.confidence_threshold);
        self.extract(frame, player, ball)
    }

    /// 選択済みの Pose / ボールから Signal を作る
    ///
    /// 閾値未満の Pose・ボール・キーポイントは欠損として扱う。
    pub fn extract(&mut self, frame: Frame, pose: Option<&Pose>, ball: Option<&BallDetection>) -> Signal {
        let threshold = self.confidence_threshold;
        self.evict(frame.index);

        let pose = pose.filter(|p| p.average_confidence() >= threshold);
        let ball_center = ball
            .filter(|b| b.confidence >= threshold)
            .map(|b| b.center());

        let mut signal = Signal::empty(frame);
        signal.ball_center = ball_center;
        signal.ball_velocity = ball_center
            .and_then(|c| self.velocity(frame.index, c, |s| s.ball_center));

        if let Some(pose) = pose {
            let joint = |index| pose.valid_position(index, threshold);
            let left_hip = joint(KeypointIndex::LeftHip);
            let right_hip = joint(KeypointIndex::RightHip);
            let left_knee = joint(KeypointIndex::LeftKnee);
            let right_knee = joint(KeypointIndex::RightKnee);
            let left_ankle = joint(KeypointIndex::LeftAnkle);
            let right_ankle = joint(KeypointIndex::RightAnkle);

            let centroid = pose.centroid(threshold);
            signal.player_centroid = centroid;
            signal.player_velocity = centroid
                .and_then(|c| self.velocity(frame.index, c, |s| s.player_centroid));
            signal.feet_center = match (left_ankle, right_ankle) {
                (Some(l), Some(r)) => Some(l.midpoint(&r)),
                (l, r) => l.or(r),
            };
            signal.left_knee_angle = angle(left_hip, left_knee, left_ankle);
            signal.right_knee_angle = angle(right_hip, right_knee, right_ankle);

            if let Some(center) = ball_center {
                let dist = |p: Option<Point2>| p.map(|p| p.distance(&center));
                let hip_center = match (left_hip, right_hip) {
                    (Some(l), Some(r)) => Some(l.midpoint(&r)),
                    (l, r) => l.or(r),
                };
                signal.distances = KeypointDistances {
                    left_knee: dist(left_knee),
                    right_knee: dist(right_knee),
                    left_ankle: dist(left_ankle),
                    right_ankle: dist(right_ankle),
                    hip_center: dist(hip_center),
                };
            }
        }

        trace!(
            frame = frame.index,
            ball = signal.has_ball(),
            player = signal.has_player(),
            "signal"
        );
        self.history.push_back(signal.clone());
        signal
    }

    pub fn history(&self) -> &VecDeque<Signal> {
        &self.history
    }

    /// 窓外の履歴を捨てる
    fn evict(&mut self, current: u64) {
        while let Some(front) = self.history.front() {
            if front.index().saturating_add(self.history_frames) < current {
                self.history.pop_front();
            } else {
                break;
            }
        }
    }

    /// 直近の非欠損位置からの速度（px/frame）
    fn velocity<F>(&self, current: u64, position: Point2, field: F) -> Option<Point2>
    where
        F: Fn(&Signal) -> Option<Point2>,
    {
        let (prev_index, prev) = self
            .history
            .iter()
            .rev()
            .find_map(|s| field(s).map(|p| (s.index(), p)))?;
        if prev_index >= current {
            return None;
        }
        let delta = (current - prev_index) as f32;
        Some(position.sub(&prev).scale(1.0 / delta))
    }
}

fn angle(hip: Option<Point2>, knee: Option<Point2>, ankle: Option<Point2>) -> Option<f32> {
    joint_angle_deg(&hip?, &knee?, &ankle?)
}
