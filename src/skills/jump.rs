use tracing::debug;

use super::debounce::{Debounce, GapTracker};
use super::{Segmenter, SegmenterReport, SkillEvent, SkillKind};
use crate::config::AnalysisConfig;
use crate::signal::Signal;

/// ジャンプ中の膝-ボール接触の状態
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum JumpState {
    Idle,
    InContact { start: u64, min_distance: f32 },
}

/// 1フレーム分の入力分類
#[derive(Debug, Clone, Copy, PartialEq)]
enum ContactInput {
    /// 膝またはボールが欠損
    Absent,
    /// 膝がボールに接近（`airborne` は開始条件の成立）
    Near { distance: f32, airborne: bool },
    Far,
}

/// Jumping-with-Ball セグメンタ
///
/// IDLE → IN_CONTACT: 膝距離 < proximity かつ 鉛直速度 > jump_velocity
/// IN_CONTACT → IDLE: 非接近が contact_debounce_frames 連続
/// 欠損が gap_tolerance_frames を超えたら、イベントを出さずに IDLE へ戻す
pub struct JumpSegmenter {
    proximity_threshold: f32,
    jump_velocity_threshold: f32,
    knee_angle_max_deg: Option<f32>,
    state: JumpState,
    release: Debounce,
    gap: GapTracker,
    events: Vec<SkillEvent>,
    report: SegmenterReport,
}

impl JumpSegmenter {
    pub fn new(
        proximity_threshold: f32,
        jump_velocity_threshold: f32,
        debounce_frames: u32,
        gap_tolerance: u32,
    ) -> Self {
        Self {
            proximity_threshold,
            jump_velocity_threshold,
            knee_angle_max_deg: None,
            state: JumpState::Idle,
            release: Debounce::new(debounce_frames),
            gap: GapTracker::new(gap_tolerance),
            events: Vec::new(),
            report: SegmenterReport::default(),
        }
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        let scale = config.pixel_scale();
        Self::new(
            config.proximity_threshold_px * scale,
            config.jump_velocity_threshold * scale,
            config.contact_debounce_frames,
            config.gap_tolerance_frames,
        )
        .with_knee_angle_limit(config.knee_angle_max_deg)
    }

    /// 膝角度の上限を設定
    pub fn with_knee_angle_limit(mut self, max_deg: Option<f32>) -> Self {
        self.knee_angle_max_deg = max_deg;
        self
    }

    pub fn state(&self) -> JumpState {
        self.state
    }

    fn classify(&self, signal: &Signal) -> ContactInput {
        let Some(distance) = signal.distances.knee() else {
            return ContactInput::Absent;
        };
        if distance >= self.proximity_threshold {
            return ContactInput::Far;
        }
        let moving = signal
            .vertical_speed()
            .is_some_and(|v| v > self.jump_velocity_threshold);
        let knee_ok = match self.knee_angle_max_deg {
            Some(max) => signal.contact_knee_angle().is_some_and(|a| a < max),
            None => true,
        };
        ContactInput::Near {
            distance,
            airborne: moving && knee_ok,
        }
    }

    fn commit(&mut self, start: u64, min_distance: f32) {
        debug!(frame = start, min_distance, "jump contact");
        self.events
            .push(SkillEvent::instant(SkillKind::JumpContact, start, min_distance));
    }
}

impl Segmenter for JumpSegmenter {
    fn kind(&self) -> SkillKind {
        SkillKind::JumpContact
    }

    fn observe(&mut self, signal: &Signal) {
        let frame = signal.index();
        let input = self.classify(signal);

        self.state = match (self.state, input) {
            (JumpState::Idle, ContactInput::Near { distance, airborne: true }) => {
                self.release.reset();
                self.gap.clear();
                JumpState::InContact {
                    start: frame,
                    min_distance: distance,
                }
            }
            (JumpState::Idle, _) => JumpState::Idle,

            (JumpState::InContact { start, min_distance }, ContactInput::Near { distance, .. }) => {
                self.release.reset();
                self.gap.clear();
                JumpState::InContact {
                    start,
                    min_distance: min_distance.min(distance),
                }
            }
            (JumpState::InContact { start, min_distance }, ContactInput::Far) => {
                self.gap.clear();
                if self.release.hit() {
                    self.commit(start, min_distance);
                    JumpState::Idle
                } else {
                    self.state
                }
            }
            (JumpState::InContact { start, .. }, ContactInput::Absent) => {
                if self.gap.miss() {
                    debug!(frame, start, "jump contact dropped: detection gap");
                    self.report.gap_resets.push(frame);
                    self.report.discarded += 1;
                    JumpState::Idle
                } else {
                    self.state
                }
            }
        };
    }

    fn finish(&mut self) {
        if let JumpState::InContact { start, min_distance } = self.state {
            self.commit(start, min_distance);
        }
        self.state = JumpState::Idle;
    }

    fn events(&self) -> &[SkillEvent] {
        &self.events
    }

    fn report(&self) -> &SegmenterReport {
        &self.report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point2;
    use crate::perception::Frame;

    fn make_segmenter() -> JumpSegmenter {
        // proximity 40px, 鉛直 2px/frame, debounce 2, gap 2
        JumpSegmenter::new(40.0, 2.0, 2, 2)
    }

    fn signal(frame: u64, knee_distance: Option<f32>, vy: f32) -> Signal {
        let mut s = Signal::empty(Frame::new(frame, 30.0));
        s.distances.left_knee = knee_distance;
        s.player_velocity = Some(Point2::new(0.0, vy));
        s
    }

    fn feed(seg: &mut JumpSegmenter, frames: impl IntoIterator<Item = Signal>) {
        for s in frames {
            seg.observe(&s);
        }
    }

    #[test]
    fn test_single_contact() {
        let mut seg = make_segmenter();
        feed(&mut seg, (0..30).map(|i| {
            if (5..=8).contains(&i) {
                signal(i, Some(20.0 - i as f32), -5.0)
            } else {
                signal(i, Some(200.0), 0.0)
            }
        }));
        seg.finish();

        assert_eq!(seg.events().len(), 1);
        let e = seg.events()[0];
        assert_eq!(e.start_frame, 5);
        assert_eq!(e.end_frame, 5);
        assert_eq!(e.quality, 12.0);
    }

    #[test]
    fn test_no_contact_without_jump() {
        let mut seg = make_segmenter();
        feed(&mut seg, (0..10).map(|i| signal(i, Some(10.0), 0.5)));
        seg.finish();
        assert!(seg.events().is_empty());
        assert_eq!(seg.state(), JumpState::Idle);
    }

    #[test]
    fn test_single_frame_noise_does_not_split_contact() {
        let mut seg = make_segmenter();
        // 12 だけ一瞬離れる（debounce 2 未満）
        feed(&mut seg, (10..=20).map(|i| match i {
            12 => signal(i, Some(80.0), 3.0),
            10..=14 => signal(i, Some(15.0), 3.0),
            _ => signal(i, Some(200.0), 3.0),
        }));
        seg.finish();
        assert_eq!(seg.events().len(), 1);
        assert_eq!(seg.events()[0].start_frame, 10);
    }

    #[test]
    fn test_dropout_within_tolerance_holds_contact() {
        let mut seg = make_segmenter();
        feed(&mut seg, (10..=20).map(|i| match i {
            12 => signal(i, None, 3.0),
            10..=14 => signal(i, Some(15.0), 3.0),
            _ => signal(i, Some(200.0), 3.0),
        }));
        seg.finish();
        assert_eq!(seg.events().len(), 1);
        assert!(seg.report().gap_resets.is_empty());
    }

    #[test]
    fn test_gap_exceeded_drops_contact() {
        let mut seg = make_segmenter();
        feed(&mut seg, (0..10).map(|i| match i {
            0 | 1 => signal(i, Some(10.0), 3.0),
            _ => signal(i, None, 3.0),
        }));
        assert_eq!(seg.state(), JumpState::Idle);
        seg.finish();
        assert!(seg.events().is_empty());
        assert_eq!(seg.report().gap_resets, vec![4]);
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let mut seg = make_segmenter();
        // 距離 == 閾値、速度 == 閾値 はどちらも不成立
        feed(&mut seg, [signal(0, Some(40.0), 3.0), signal(1, Some(10.0), 2.0)]);
        assert_eq!(seg.state(), JumpState::Idle);
        seg.observe(&signal(2, Some(39.9), 2.1));
        assert!(matches!(seg.state(), JumpState::InContact { start: 2, .. }));
    }

    #[test]
    fn test_finish_commits_open_contact() {
        let mut seg = make_segmenter();
        feed(&mut seg, [signal(0, Some(10.0), 3.0), signal(1, Some(5.0), 0.0)]);
        seg.finish();
        assert_eq!(seg.events().len(), 1);
        assert_eq!(seg.events()[0].quality, 5.0);
    }

    #[test]
    fn test_knee_angle_gate() {
        let mut seg = make_segmenter().with_knee_angle_limit(Some(60.0));
        let mut straight = signal(0, Some(10.0), 3.0);
        straight.left_knee_angle = Some(170.0);
        seg.observe(&straight);
        assert_eq!(seg.state(), JumpState::Idle);

        let mut bent = signal(1, Some(10.0), 3.0);
        bent.left_knee_angle = Some(45.0);
        seg.observe(&bent);
        assert!(matches!(seg.state(), JumpState::InContact { start: 1, .. }));
    }
}
