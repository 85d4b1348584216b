use serde::{Deserialize, Serialize};

/// 画像ピクセル空間の2D点（ベクトルとしても使う）
///
/// 原点は左上、yは下向きが正
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f32,
    pub y: f32,
}

impl Point2 {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn sub(&self, other: &Point2) -> Point2 {
        Point2::new(self.x - other.x, self.y - other.y)
    }

    pub fn scale(&self, factor: f32) -> Point2 {
        Point2::new(self.x * factor, self.y * factor)
    }

    pub fn norm(&self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    /// ユークリッド距離（ピクセル）
    pub fn distance(&self, other: &Point2) -> f32 {
        self.sub(other).norm()
    }

    pub fn midpoint(&self, other: &Point2) -> Point2 {
        Point2::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }
}

/// a-b-c の b における角度（度, 0〜180）
///
/// 長さ0の辺がある場合は None
pub fn joint_angle_deg(a: &Point2, b: &Point2, c: &Point2) -> Option<f32> {
    let ba = a.sub(b);
    let bc = c.sub(b);
    let len = ba.norm() * bc.norm();
    if len <= f32::EPSILON {
        return None;
    }
    let cos = ((ba.x * bc.x + ba.y * bc.y) / len).clamp(-1.0, 1.0);
    Some(cos.acos().to_degrees())
}

/// 点列の平均。空なら None
pub fn mean_point(points: &[Point2]) -> Option<Point2> {
    if points.is_empty() {
        return None;
    }
    let n = points.len() as f32;
    let (sx, sy) = points
        .iter()
        .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
    Some(Point2::new(sx / n, sy / n))
}
