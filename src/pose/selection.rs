use serde::{Deserialize, Serialize};

use super::bbox::bbox_from_keypoints;
use super::keypoint::Pose;
use crate::geometry::Point2;

/// 複数検出された人物から「選手」を1人選ぶポリシー
///
/// 返り値は `poses` 内のインデックス。平均信頼度が閾値未満のPoseは候補にならない。
pub trait PlayerSelector: Send {
    fn select(&mut self, poses: &[Pose], min_confidence: f32) -> Option<usize>;
}

fn usable(poses: &[Pose], min_confidence: f32) -> impl Iterator<Item = (usize, &Pose)> {
    poses
        .iter()
        .enumerate()
        .filter(move |(_, p)| p.average_confidence() >= min_confidence)
}

/// 最大値を持つ最初の候補（同値なら先勝ち）
fn first_max<I: Iterator<Item = (usize, f32)>>(candidates: I) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, score) in candidates {
        match best {
            Some((_, s)) if score <= s => {}
            _ => best = Some((i, score)),
        }
    }
    best.map(|(i, _)| i)
}

/// 平均信頼度が最も高い人物
#[derive(Debug, Default)]
pub struct HighestConfidence;

impl PlayerSelector for HighestConfidence {
    fn select(&mut self, poses: &[Pose], min_confidence: f32) -> Option<usize> {
        first_max(usable(poses, min_confidence).map(|(i, p)| (i, p.average_confidence())))
    }
}

/// 有効キーポイントのBBox面積が最大の人物
#[derive(Debug, Default)]
pub struct LargestBox;

impl PlayerSelector for LargestBox {
    fn select(&mut self, poses: &[Pose], min_confidence: f32) -> Option<usize> {
        first_max(usable(poses, min_confidence).filter_map(|(i, p)| {
            bbox_from_keypoints(p, min_confidence).map(|b| (i, b.area()))
        }))
    }
}

/// 前フレームの選手に最も近い人物
///
/// 前フレームの選手がいなければ HighestConfidence にフォールバック
#[derive(Debug, Default)]
pub struct ClosestToPrevious {
    previous: Option<Point2>,
}

impl PlayerSelector for ClosestToPrevious {
    fn select(&mut self, poses: &[Pose], min_confidence: f32) -> Option<usize> {
        let selected = match self.previous {
            Some(prev) => first_max(usable(poses, min_confidence).filter_map(|(i, p)| {
                p.centroid(min_confidence)
                    .map(|c| (i, -c.distance(&prev)))
            })),
            None => HighestConfidence.select(poses, min_confidence),
        };
        if let Some(i) = selected {
            if let Some(c) = poses[i].centroid(min_confidence) {
                self.previous = Some(c);
            }
        }
        selected
    }
}

/// 設定ファイルで指定する選択ポリシー
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionPolicy {
    #[default]
    HighestConfidence,
    LargestBox,
    ClosestToPrevious,
}

impl SelectionPolicy {
    pub fn selector(&self) -> Box<dyn PlayerSelector> {
        match self {
            Self::HighestConfidence => Box::new(HighestConfidence),
            Self::LargestBox => Box::new(LargestBox),
            Self::ClosestToPrevious => Box::new(ClosestToPrevious::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::keypoint::{Keypoint, KeypointIndex};

    /// 中心 (cx, cy)、半サイズ half の人物。全キーポイント同一信頼度
    fn make_pose(cx: f32, cy: f32, half: f32, confidence: f32) -> Pose {
        let mut keypoints = [Keypoint::new(cx, cy, confidence); KeypointIndex::COUNT];
        keypoints[KeypointIndex::Nose as usize] = Keypoint::new(cx, cy - half, confidence);
        keypoints[KeypointIndex::LeftAnkle as usize] = Keypoint::new(cx - half, cy + half, confidence);
        keypoints[KeypointIndex::RightAnkle as usize] = Keypoint::new(cx + half, cy + half, confidence);
        Pose::new(keypoints)
    }

    #[test]
    fn test_highest_confidence() {
        let poses = vec![make_pose(100.0, 100.0, 50.0, 0.6), make_pose(300.0, 100.0, 10.0, 0.9)];
        assert_eq!(HighestConfidence.select(&poses, 0.3), Some(1));
    }

    #[test]
    fn test_highest_confidence_tie_keeps_first() {
        let poses = vec![make_pose(100.0, 100.0, 50.0, 0.8), make_pose(300.0, 100.0, 10.0, 0.8)];
        assert_eq!(HighestConfidence.select(&poses, 0.3), Some(0));
    }

    #[test]
    fn test_below_threshold_never_selected() {
        let poses = vec![make_pose(100.0, 100.0, 50.0, 0.2)];
        assert_eq!(HighestConfidence.select(&poses, 0.3), None);
        assert_eq!(LargestBox.select(&poses, 0.3), None);
        assert_eq!(ClosestToPrevious::default().select(&poses, 0.3), None);
    }

    #[test]
    fn test_largest_box() {
        let poses = vec![make_pose(100.0, 100.0, 50.0, 0.6), make_pose(300.0, 100.0, 10.0, 0.9)];
        assert_eq!(LargestBox.select(&poses, 0.3), Some(0));
    }

    #[test]
    fn test_closest_to_previous_follows_player() {
        let mut selector = ClosestToPrevious::default();
        let first = vec![make_pose(100.0, 100.0, 20.0, 0.9), make_pose(400.0, 100.0, 20.0, 0.5)];
        assert_eq!(selector.select(&first, 0.3), Some(0));

        // 2フレーム目: 低信頼度でも前フレームに近い方を選ぶ
        let second = vec![make_pose(390.0, 100.0, 20.0, 0.95), make_pose(110.0, 100.0, 20.0, 0.4)];
        assert_eq!(selector.select(&second, 0.3), Some(1));
    }

    #[test]
    fn test_policy_deserialize() {
        let p: SelectionPolicy = serde_json::from_str("\"largest_box\"").unwrap();
        assert_eq!(p, SelectionPolicy::LargestBox);
    }
}
