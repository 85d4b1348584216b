use serde::{Deserialize, Serialize};

use super::keypoint::Pose;
use crate::geometry::Point2;

/// BBox（ピクセル座標, 左上 + 幅高さ）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BBox {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn center(&self) -> Point2 {
        Point2::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn area(&self) -> f32 {
        self.width.max(0.0) * self.height.max(0.0)
    }
}

/// PoseからBBoxを推定（KP-based）
///
/// confidence_threshold以上のキーポイントのmin/maxからBBoxを返す。
/// 有効なキーポイントが2個未満ならNone。
pub fn bbox_from_keypoints(pose: &Pose, confidence_threshold: f32) -> Option<BBox> {
    let mut min_x = f32::MAX;
    let mut min_y = f32::MAX;
    let mut max_x = f32::MIN;
    let mut max_y = f32::MIN;
    let mut count = 0u32;

    for kp in &pose.keypoints {
        if kp.is_valid(confidence_threshold) {
            min_x = min_x.min(kp.x);
            min_y = min_y.min(kp.y);
            max_x = max_x.max(kp.x);
            max_y = max_y.max(kp.y);
            count += 1;
        }
    }

    if count < 2 {
        return None;
    }

    Some(BBox {
        x: min_x,
        y: min_y,
        width: max_x - min_x,
        height: max_y - min_y,
    })
}
