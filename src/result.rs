use serde::Serialize;

use crate::skills::{SkillEvent, SkillKind};

/// 1スキル分の結果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkillResult {
    #[serde(skip)]
    pub kind: SkillKind,
    /// フレーム順
    pub events: Vec<SkillEvent>,
    /// 0〜100
    pub score: f32,
}

impl SkillResult {
    pub fn empty(kind: SkillKind) -> Self {
        Self {
            kind,
            events: Vec::new(),
            score: 0.0,
        }
    }
}

/// 動画1本の解析結果
///
/// JSON は `{"jumping": {...}, "running": {...}, "passing": {...}, "overall_score": f}`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    pub jumping: SkillResult,
    pub running: SkillResult,
    pub passing: SkillResult,
    pub overall_score: f32,
}

impl AnalysisResult {
    /// 使えるフレームが無い動画の結果（全スコア0）
    pub fn empty() -> Self {
        Self {
            jumping: SkillResult::empty(SkillKind::JumpContact),
            running: SkillResult::empty(SkillKind::RunControl),
            passing: SkillResult::empty(SkillKind::Pass),
            overall_score: 0.0,
        }
    }

    pub fn skill(&self, kind: SkillKind) -> &SkillResult {
        match kind {
            SkillKind::JumpContact => &self.jumping,
            SkillKind::RunControl => &self.running,
            SkillKind::Pass => &self.passing,
        }
    }

    pub fn event_count(&self) -> usize {
        SkillKind::ALL.iter().map(|k| self.skill(*k).events.len()).sum()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
