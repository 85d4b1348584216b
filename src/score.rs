use crate::config::{AnalysisConfig, SkillWeights};
use crate::result::{AnalysisResult, SkillResult};
use crate::skills::{SkillEvent, SkillKind};

pub const MAX_SCORE: f32 = 100.0;

/// イベント列 → サブスコア / 総合スコア
///
/// サブスコア = clamp(base_per_event × 件数 + quality_bonus_scale × Σ正規化品質, 0, 100)
/// 正規化品質は 0〜1 なので、件数を増やしてもスコアは下がらない。
#[derive(Debug, Clone)]
pub struct Scorer {
    base_per_event: f32,
    quality_bonus_scale: f32,
    proximity_threshold: f32,
    reference_run_seconds: f32,
    reference_pass: f32,
    weights: SkillWeights,
}

impl Scorer {
    pub fn from_config(config: &AnalysisConfig) -> Self {
        let scale = config.pixel_scale();
        Self {
            base_per_event: config.base_per_event,
            quality_bonus_scale: config.quality_bonus_scale,
            proximity_threshold: config.proximity_threshold_px * scale,
            reference_run_seconds: config.reference_run_seconds,
            reference_pass: config.reference_pass_px * scale,
            weights: config.skill_weights,
        }
    }

    /// 品質値を 0〜1 に正規化
    ///
    /// JUMP_CONTACT は距離が小さいほど、RUN_CONTROL と PASS は大きいほど高い
    pub fn normalized_quality(&self, event: &SkillEvent) -> f32 {
        let q = event.quality.max(0.0);
        let n = match event.kind {
            SkillKind::JumpContact => 1.0 - q / self.proximity_threshold,
            SkillKind::RunControl => q / self.reference_run_seconds,
            SkillKind::Pass => q / self.reference_pass,
        };
        if n.is_finite() {
            n.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    /// `kind` のイベントだけを数える
    pub fn sub_score(&self, kind: SkillKind, events: &[SkillEvent]) -> f32 {
        let (count, bonus) = events
            .iter()
            .filter(|e| e.kind == kind)
            .fold((0usize, 0.0f32), |(n, b), e| (n + 1, b + self.normalized_quality(e)));
        if count == 0 {
            return 0.0;
        }
        let raw = self.base_per_event * count as f32 + self.quality_bonus_scale * bonus;
        raw.clamp(0.0, MAX_SCORE)
    }

    /// 重み付き平均。`sub_scores` は jumping, running, passing の順
    pub fn overall(&self, sub_scores: [f32; 3]) -> f32 {
        let weights = self.weights.as_array();
        let total: f32 = weights.iter().sum();
        if total <= 0.0 {
            return 0.0;
        }
        let sum: f32 = weights.iter().zip(sub_scores).map(|(w, s)| w * s).sum();
        (sum / total).clamp(0.0, MAX_SCORE)
    }

    pub fn score(&self, jumping: &[SkillEvent], running: &[SkillEvent], passing: &[SkillEvent]) -> AnalysisResult {
        let skill = |kind, events: &[SkillEvent]| SkillResult {
            kind,
            events: events.to_vec(),
            score: self.sub_score(kind, events),
        };
        let jumping = skill(SkillKind::JumpContact, jumping);
        let running = skill(SkillKind::RunControl, running);
        let passing = skill(SkillKind::Pass, passing);
        let overall_score = self.overall([jumping.score, running.score, passing.score]);
        AnalysisResult {
            jumping,
            running,
            passing,
            overall_score,
        }
    }
}
