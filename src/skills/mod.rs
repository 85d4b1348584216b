pub mod debounce;
pub mod jump;
pub mod pass;
pub mod run;

pub use debounce::{Debounce, GapTracker};
pub use jump::{JumpSegmenter, JumpState};
pub use pass::{PassSegmenter, PassState};
pub use run::{ControlSpan, RunSegmenter, RunState};

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::signal::Signal;

/// イベント種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SkillKind {
    JumpContact,
    RunControl,
    Pass,
}

impl SkillKind {
    pub const ALL: [SkillKind; 3] = [Self::JumpContact, Self::RunControl, Self::Pass];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::JumpContact => "JUMP_CONTACT",
            Self::RunControl => "RUN_CONTROL",
            Self::Pass => "PASS",
        }
    }

    /// 結果レコード上のスキル名
    pub fn skill_name(&self) -> &'static str {
        match self {
            Self::JumpContact => "jumping",
            Self::RunControl => "running",
            Self::Pass => "passing",
        }
    }
}

impl fmt::Display for SkillKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 採点対象となる1回のスキル発生
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SkillEvent {
    #[serde(rename = "type")]
    pub kind: SkillKind,
    pub start_frame: u64,
    pub end_frame: u64,
    /// 接触距離 / 制御時間 / パス距離など種別ごとの品質値
    pub quality: f32,
}

impl SkillEvent {
    pub fn new(kind: SkillKind, start_frame: u64, end_frame: u64, quality: f32) -> Self {
        Self {
            kind,
            start_frame,
            end_frame,
            quality,
        }
    }

    /// 瞬間イベント（start == end）
    pub fn instant(kind: SkillKind, frame: u64, quality: f32) -> Self {
        Self::new(kind, frame, frame, quality)
    }
}

/// セグメンタ内で回復した異常の記録
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SegmenterReport {
    /// 欠損が許容を超えて打ち切ったフレーム
    pub gap_resets: Vec<u64>,
    /// 成立しなかった候補の数
    pub discarded: usize,
}

/// スキルごとのイベント分割ステートマシン
///
/// Signal をフレーム順に1つずつ受け取り、確定したイベントを蓄積する。
/// 各インスタンスは独立した状態を持つので、別スレッドで並行に動かせる。
pub trait Segmenter: Send {
    fn kind(&self) -> SkillKind;
    fn observe(&mut self, signal: &Signal);
    /// ストリーム終端。進行中のイベントを確定または破棄する
    fn finish(&mut self);
    fn events(&self) -> &[SkillEvent];
    fn report(&self) -> &SegmenterReport;
}
