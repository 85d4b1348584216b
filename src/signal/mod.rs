pub mod extractor;

pub use extractor::SignalExtractor;

use crate::geometry::Point2;
use crate::perception::Frame;

/// ボール中心から各キーポイントまでの距離（ピクセル）
///
/// キーポイントかボールのどちらかが欠損していれば None
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct KeypointDistances {
    pub left_knee: Option<f32>,
    pub right_knee: Option<f32>,
    pub left_ankle: Option<f32>,
    pub right_ankle: Option<f32>,
    pub hip_center: Option<f32>,
}

fn min_opt(a: Option<f32>, b: Option<f32>) -> Option<f32> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, None) => a,
        (None, b) => b,
    }
}

impl KeypointDistances {
    /// 左右の膝のうち近い方
    pub fn knee(&self) -> Option<f32> {
        min_opt(self.left_knee, self.right_knee)
    }

    /// 左右の足首のうち近い方
    pub fn feet(&self) -> Option<f32> {
        min_opt(self.left_ankle, self.right_ankle)
    }
}

/// 1フレーム分の派生信号
///
/// 欠損はすべて None で表す（ゼロ座標のような番兵値は使わない）
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    pub frame: Frame,
    pub ball_center: Option<Point2>,
    /// px/frame。直近の非欠損ボール位置との差分
    pub ball_velocity: Option<Point2>,
    pub player_centroid: Option<Point2>,
    /// px/frame
    pub player_velocity: Option<Point2>,
    /// 足首の中点（片側のみならその足首）
    pub feet_center: Option<Point2>,
    pub distances: KeypointDistances,
    /// 腰-膝-足首の角度（度）
    pub left_knee_angle: Option<f32>,
    pub right_knee_angle: Option<f32>,
}

impl Signal {
    /// 検出が何もないフレーム
    pub fn empty(frame: Frame) -> Self {
        Self {
            frame,
            ball_center: None,
            ball_velocity: None,
            player_centroid: None,
            player_velocity: None,
            feet_center: None,
            distances: KeypointDistances::default(),
            left_knee_angle: None,
            right_knee_angle: None,
        }
    }

    pub fn index(&self) -> u64 {
        self.frame.index
    }

    pub fn has_player(&self) -> bool {
        self.player_centroid.is_some()
    }

    pub fn has_ball(&self) -> bool {
        self.ball_center.is_some()
    }

    pub fn ball_speed(&self) -> Option<f32> {
        self.ball_velocity.map(|v| v.norm())
    }

    pub fn player_speed(&self) -> Option<f32> {
        self.player_velocity.map(|v| v.norm())
    }

    /// 重心の鉛直速度の大きさ（上昇・下降どちらも）
    pub fn vertical_speed(&self) -> Option<f32> {
        self.player_velocity.map(|v| v.y.abs())
    }

    /// ボールに近い方の膝の角度
    pub fn contact_knee_angle(&self) -> Option<f32> {
        match (self.distances.left_knee, self.distances.right_knee) {
            (Some(l), Some(r)) if r < l => self.right_knee_angle,
            (Some(_), _) => self.left_knee_angle,
            (None, Some(_)) => self.right_knee_angle,
            (None, None) => None,
        }
    }
}
