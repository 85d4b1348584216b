use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::ConfigError;
use crate::pose::SelectionPolicy;

/// 解析ラン全体の設定（フラットなキー/値マッピング）
///
/// ピクセル単位の閾値はすべて `reference_height_px` の解像度基準。
/// `frame_height_px` を指定すると `pixel_scale()` 倍して使われる。
/// 閾値はすべて排他的境界: 「閾値未満」は `d < T`、「閾値超過」は `v > T`。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnalysisConfig {
    /// 膝-ボール接触とみなす距離（px）
    #[serde(default = "default_proximity_threshold_px")]
    pub proximity_threshold_px: f32,
    /// ジャンプ中とみなす重心の鉛直速度（px/frame）
    #[serde(default = "default_jump_velocity_threshold")]
    pub jump_velocity_threshold: f32,
    /// 接触終了に必要な連続非接近フレーム数
    #[serde(default = "default_contact_debounce_frames")]
    pub contact_debounce_frames: u32,
    /// 膝角度（腰-膝-足首）の上限（度）。未指定なら判定しない
    #[serde(default)]
    pub knee_angle_max_deg: Option<f32>,

    /// ランニングとみなす選手速度（px/frame）
    #[serde(default = "default_run_speed_threshold")]
    pub run_speed_threshold: f32,
    /// 足元コントロールとみなすボール距離（px）
    #[serde(default = "default_control_distance_threshold")]
    pub control_distance_threshold: f32,
    /// 「良いコントロール」とみなすボール距離（px）
    #[serde(default = "default_good_control_distance_px")]
    pub good_control_distance_px: f32,
    /// コントロール開始に必要な連続フレーム数
    #[serde(default = "default_control_min_frames")]
    pub control_min_frames: u32,
    /// コントロール終了に必要な連続違反フレーム数
    #[serde(default = "default_control_debounce_frames")]
    pub control_debounce_frames: u32,

    /// キック判定のボール速度（px/frame）
    #[serde(default = "default_pass_velocity_spike_threshold")]
    pub pass_velocity_spike_threshold: f32,
    /// これ以上のボール移動量は検出の飛びとして無視（px/frame）
    #[serde(default = "default_pass_max_step_px")]
    pub pass_max_step_px: f32,
    /// パス成立に必要なキック後の移動フレーム数
    #[serde(default = "default_pass_sustain_frames")]
    pub pass_sustain_frames: u32,
    /// キック直前に足元にあったとみなすフレーム幅
    #[serde(default = "default_pass_contact_window_frames")]
    pub pass_contact_window_frames: u32,

    /// 検出を採用する最低信頼度（Pose/ボール/キーポイント共通）
    #[serde(default = "default_min_detection_confidence")]
    pub min_detection_confidence: f32,
    #[serde(default)]
    pub player_selection: SelectionPolicy,
    /// イベント途中で許容する連続欠損フレーム数
    #[serde(default = "default_gap_tolerance_frames")]
    pub gap_tolerance_frames: u32,
    /// 速度計算に使う過去フレームの窓（フレームインデックス幅）
    #[serde(default = "default_history_frames")]
    pub history_frames: u32,
    /// N フレームに1回だけ解析する
    #[serde(default = "default_frame_skip")]
    pub frame_skip: u32,
    #[serde(default = "default_fps")]
    pub fps: f32,
    /// 入力動画の高さ（px）。指定時はピクセル閾値をスケール
    #[serde(default)]
    pub frame_height_px: Option<f32>,
    #[serde(default = "default_reference_height_px")]
    pub reference_height_px: f32,

    #[serde(default)]
    pub skill_weights: SkillWeights,
    #[serde(default = "default_base_per_event")]
    pub base_per_event: f32,
    #[serde(default = "default_quality_bonus_scale")]
    pub quality_bonus_scale: f32,
    /// RUN_CONTROL の品質基準（秒）
    #[serde(default = "default_reference_run_seconds")]
    pub reference_run_seconds: f32,
    /// PASS の品質基準（px）
    #[serde(default = "default_reference_pass_px")]
    pub reference_pass_px: f32,
}

/// 総合スコアの重み
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SkillWeights {
    #[serde(default = "default_weight")]
    pub jumping: f32,
    #[serde(default = "default_weight")]
    pub running: f32,
    #[serde(default = "default_weight")]
    pub passing: f32,
}

fn default_proximity_threshold_px() -> f32 { 40.0 }
fn default_jump_velocity_threshold() -> f32 { 2.0 }
fn default_contact_debounce_frames() -> u32 { 2 }
fn default_run_speed_threshold() -> f32 { 1.5 }
fn default_control_distance_threshold() -> f32 { 60.0 }
fn default_good_control_distance_px() -> f32 { 25.0 }
fn default_control_min_frames() -> u32 { 3 }
fn default_control_debounce_frames() -> u32 { 3 }
fn default_pass_velocity_spike_threshold() -> f32 { 20.0 }
fn default_pass_max_step_px() -> f32 { 150.0 }
fn default_pass_sustain_frames() -> u32 { 8 }
fn default_pass_contact_window_frames() -> u32 { 3 }
fn default_min_detection_confidence() -> f32 { 0.3 }
fn default_gap_tolerance_frames() -> u32 { 2 }
fn default_history_frames() -> u32 { 30 }
fn default_frame_skip() -> u32 { 1 }
fn default_fps() -> f32 { 30.0 }
fn default_reference_height_px() -> f32 { 720.0 }
fn default_weight() -> f32 { 1.0 }
fn default_base_per_event() -> f32 { 20.0 }
fn default_quality_bonus_scale() -> f32 { 10.0 }
fn default_reference_run_seconds() -> f32 { 2.0 }
fn default_reference_pass_px() -> f32 { 200.0 }

impl Default for SkillWeights {
    fn default() -> Self {
        Self {
            jumping: default_weight(),
            running: default_weight(),
            passing: default_weight(),
        }
    }
}

impl SkillWeights {
    pub fn as_array(&self) -> [f32; 3] {
        [self.jumping, self.running, self.passing]
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            proximity_threshold_px: default_proximity_threshold_px(),
            jump_velocity_threshold: default_jump_velocity_threshold(),
            contact_debounce_frames: default_contact_debounce_frames(),
            knee_angle_max_deg: None,
            run_speed_threshold: default_run_speed_threshold(),
            control_distance_threshold: default_control_distance_threshold(),
            good_control_distance_px: default_good_control_distance_px(),
            control_min_frames: default_control_min_frames(),
            control_debounce_frames: default_control_debounce_frames(),
            pass_velocity_spike_threshold: default_pass_velocity_spike_threshold(),
            pass_max_step_px: default_pass_max_step_px(),
            pass_sustain_frames: default_pass_sustain_frames(),
            pass_contact_window_frames: default_pass_contact_window_frames(),
            min_detection_confidence: default_min_detection_confidence(),
            player_selection: SelectionPolicy::default(),
            gap_tolerance_frames: default_gap_tolerance_frames(),
            history_frames: default_history_frames(),
            frame_skip: default_frame_skip(),
            fps: default_fps(),
            frame_height_px: None,
            reference_height_px: default_reference_height_px(),
            skill_weights: SkillWeights::default(),
            base_per_event: default_base_per_event(),
            quality_bonus_scale: default_quality_bonus_scale(),
            reference_run_seconds: default_reference_run_seconds(),
            reference_pass_px: default_reference_pass_px(),
        }
    }
}

impl AnalysisConfig {
    /// TOMLファイルから読み込み（省略キーはデフォルト）
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// ピクセル閾値に掛ける解像度係数
    pub fn pixel_scale(&self) -> f32 {
        match self.frame_height_px {
            Some(h) => h / self.reference_height_px,
            None => 1.0,
        }
    }

    /// 全オプションの値域チェック。フレーム処理前に呼ぶ
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("proximity_threshold_px", self.proximity_threshold_px)?;
        non_negative("jump_velocity_threshold", self.jump_velocity_threshold)?;
        at_least_one("contact_debounce_frames", self.contact_debounce_frames)?;
        if let Some(angle) = self.knee_angle_max_deg {
            positive("knee_angle_max_deg", angle)?;
            if angle > 180.0 {
                return Err(out_of_range("knee_angle_max_deg", angle, "must be at most 180 degrees"));
            }
        }

        non_negative("run_speed_threshold", self.run_speed_threshold)?;
        positive("control_distance_threshold", self.control_distance_threshold)?;
        positive("good_control_distance_px", self.good_control_distance_px)?;
        if self.good_control_distance_px > self.control_distance_threshold {
            return Err(out_of_range(
                "good_control_distance_px",
                self.good_control_distance_px,
                "must not exceed control_distance_threshold",
            ));
        }
        at_least_one("control_min_frames", self.control_min_frames)?;
        at_least_one("control_debounce_frames", self.control_debounce_frames)?;

        positive("pass_velocity_spike_threshold", self.pass_velocity_spike_threshold)?;
        positive("pass_max_step_px", self.pass_max_step_px)?;
        if self.pass_max_step_px <= self.pass_velocity_spike_threshold {
            return Err(out_of_range(
                "pass_max_step_px",
                self.pass_max_step_px,
                "must exceed pass_velocity_spike_threshold",
            ));
        }
        at_least_one("pass_sustain_frames", self.pass_sustain_frames)?;
        at_least_one("pass_contact_window_frames", self.pass_contact_window_frames)?;

        finite("min_detection_confidence", self.min_detection_confidence)?;
        if !(0.0..=1.0).contains(&self.min_detection_confidence) {
            return Err(out_of_range(
                "min_detection_confidence",
                self.min_detection_confidence,
                "must be within [0, 1]",
            ));
        }
        if self.history_frames < 2 {
            return Err(out_of_range("history_frames", self.history_frames as f32, "must be at least 2"));
        }
        at_least_one("frame_skip", self.frame_skip)?;
        positive("fps", self.fps)?;
        if let Some(h) = self.frame_height_px {
            positive("frame_height_px", h)?;
        }
        positive("reference_height_px", self.reference_height_px)?;

        let weights = self.skill_weights;
        non_negative("skill_weights.jumping", weights.jumping)?;
        non_negative("skill_weights.running", weights.running)?;
        non_negative("skill_weights.passing", weights.passing)?;
        if weights.as_array().iter().sum::<f32>() <= 0.0 {
            return Err(ConfigError::Invalid {
                field: "skill_weights",
                reason: "at least one weight must be positive".to_string(),
            });
        }
        non_negative("base_per_event", self.base_per_event)?;
        non_negative("quality_bonus_scale", self.quality_bonus_scale)?;
        positive("reference_run_seconds", self.reference_run_seconds)?;
        positive("reference_pass_px", self.reference_pass_px)?;
        Ok(())
    }
}

fn out_of_range(field: &'static str, value: f32, reason: &'static str) -> ConfigError {
    ConfigError::OutOfRange {
        field,
        value: value as f64,
        reason,
    }
}

fn finite(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(out_of_range(field, value, "must be a finite number"))
    }
}

fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    finite(field, value)?;
    if value > 0.0 {
        Ok(())
    } else {
        Err(out_of_range(field, value, "must be greater than 0"))
    }
}

fn non_negative(field: &'static str, value: f32) -> Result<(), ConfigError> {
    finite(field, value)?;
    if value >= 0.0 {
        Ok(())
    } else {
        Err(out_of_range(field, value, "must not be negative"))
    }
}

fn at_least_one(field: &'static str, value: u32) -> Result<(), ConfigError> {
    if value >= 1 {
        Ok(())
    } else {
        Err(out_of_range(field, value as f32, "must be at least 1"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(AnalysisConfig::default().validate().is_ok());
    }

    #[test]
    fn test_omitted_keys_fall_back_to_defaults() {
        let config = AnalysisConfig::from_toml_str("proximity_threshold_px = 55.0\n").unwrap();
        assert_eq!(config.proximity_threshold_px, 55.0);
        assert_eq!(config.pass_sustain_frames, default_pass_sustain_frames());
        assert_eq!(config.skill_weights, SkillWeights::default());
    }

    #[test]
    fn test_partial_weights() {
        let config = AnalysisConfig::from_json_str(r#"{"skill_weights": {"passing": 2.0}}"#).unwrap();
        assert_eq!(config.skill_weights.as_array(), [1.0, 1.0, 2.0]);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = AnalysisConfig::from_toml_str("proximity_treshold_px = 10.0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_negative_distance_rejected() {
        let config = AnalysisConfig {
            proximity_threshold_px: -5.0,
            ..AnalysisConfig::default()
        };
        match config.validate() {
            Err(ConfigError::OutOfRange { field, .. }) => assert_eq!(field, "proximity_threshold_px"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_zero_weights_rejected() {
        let config = AnalysisConfig {
            skill_weights: SkillWeights {
                jumping: 0.0,
                running: 0.0,
                passing: 0.0,
            },
            ..AnalysisConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_confidence_out_of_range() {
        let config = AnalysisConfig {
            min_detection_confidence: 1.5,
            ..AnalysisConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_good_control_must_be_tighter() {
        let config = AnalysisConfig {
            good_control_distance_px: 80.0,
            ..AnalysisConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_pixel_scale() {
        let mut config = AnalysisConfig::default();
        assert_eq!(config.pixel_scale(), 1.0);
        config.frame_height_px = Some(1080.0);
        assert!((config.pixel_scale() - 1.5).abs() < 1e-6);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("skills.toml");
        fs::write(&path, "player_selection = \"largest_box\"\nfps = 25.0\n").unwrap();
        let config = AnalysisConfig::load(&path).unwrap();
        assert_eq!(config.player_selection, SelectionPolicy::LargestBox);
        assert_eq!(config.fps, 25.0);
    }
}
