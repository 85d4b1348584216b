pub mod jsonl;

use serde::{Deserialize, Serialize};

use crate::error::PerceptionError;
use crate::geometry::Point2;
use crate::pose::{BBox, Pose};

pub use jsonl::JsonlSource;

/// フレーム番号とタイムスタンプ
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub index: u64,
    /// 秒（index / fps）
    pub timestamp: f32,
}

impl Frame {
    pub fn new(index: u64, fps: f32) -> Self {
        Self {
            index,
            timestamp: index as f32 / fps,
        }
    }
}

/// ボール検出（ピクセル座標のBBox + 信頼度）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BallDetection {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub confidence: f32,
}

impl BallDetection {
    pub fn new(x: f32, y: f32, width: f32, height: f32, confidence: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            confidence,
        }
    }

    pub fn bbox(&self) -> BBox {
        BBox::new(self.x, self.y, self.width, self.height)
    }

    pub fn center(&self) -> Point2 {
        self.bbox().center()
    }
}

/// 閾値以上で最も信頼度の高いボール（同値なら先勝ち）
pub fn select_ball(balls: &[BallDetection], min_confidence: f32) -> Option<&BallDetection> {
    let mut best: Option<&BallDetection> = None;
    for ball in balls.iter().filter(|b| b.confidence >= min_confidence) {
        match best {
            Some(b) if ball.confidence <= b.confidence => {}
            _ => best = Some(ball),
        }
    }
    best
}

/// 知覚アダプタが1フレームについて返す検出結果
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FrameDetections {
    pub frame_index: u64,
    #[serde(default)]
    pub poses: Vec<Pose>,
    #[serde(default)]
    pub balls: Vec<BallDetection>,
}

impl FrameDetections {
    pub fn new(frame_index: u64, poses: Vec<Pose>, balls: Vec<BallDetection>) -> Self {
        Self {
            frame_index,
            poses,
            balls,
        }
    }
}

/// フレーム取得 + 知覚アダプタの境界
///
/// フレーム順に検出結果を返す。終端で None。
/// エラーはそのまま呼び出し元へ返し、コア側で再試行はしない。
pub trait DetectionSource {
    fn next_frame(&mut self) -> Option<Result<FrameDetections, PerceptionError>>;
}

impl<S: DetectionSource + ?Sized> DetectionSource for &mut S {
    fn next_frame(&mut self) -> Option<Result<FrameDetections, PerceptionError>> {
        (**self).next_frame()
    }
}

/// メモリ上の検出列をソースとして扱う
pub struct IterSource<I> {
    inner: I,
}

impl<I: Iterator<Item = FrameDetections>> IterSource<I> {
    pub fn new<T: IntoIterator<IntoIter = I>>(frames: T) -> Self {
        Self {
            inner: frames.into_iter(),
        }
    }
}

impl<I: Iterator<Item = FrameDetections>> DetectionSource for IterSource<I> {
    fn next_frame(&mut self) -> Option<Result<FrameDetections, PerceptionError>> {
        self.inner.next().map(Ok)
    }
}
