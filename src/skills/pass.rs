use tracing::{debug, warn};

use super::debounce::GapTracker;
use super::{Segmenter, SegmenterReport, SkillEvent, SkillKind};
use crate::config::AnalysisConfig;
use crate::geometry::Point2;
use crate::signal::Signal;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PassState {
    Idle,
    /// キック候補。`travel_frames` は足元から遠ざかり続けたフレーム数
    Candidate {
        impulse_frame: u64,
        ball_origin: Point2,
        travel_frames: u32,
        departed: bool,
        /// キック後に観測したフレーム数
        elapsed: u32,
        /// 直前フレームのボール-足元距離
        last_away: f32,
    },
}

/// Passing セグメンタ
///
/// 足元にあったボールの速度が閾値を跨いで立ち上がったフレームをキック候補とし、
/// その後 pass_sustain_frames フレーム足元から遠ざかり続けたら PASS を確定する。
/// 戻った・止まった・検出が途切れた・離れなかった候補はイベントを出さずに捨てる。
/// フレーム数はすべて観測したフレームで数える（インデックス差ではない）。
pub struct PassSegmenter {
    spike_threshold: f32,
    max_step: f32,
    control_distance: f32,
    sustain_frames: u32,
    contact_window: u32,
    state: PassState,
    gap: GapTracker,
    /// 遠ざからなかったフレーム（候補ごとの累計）
    stall: GapTracker,
    /// ボールが足元にあってから観測したフレーム数
    since_near: Option<u32>,
    prev_ball_speed: Option<f32>,
    last_ball: Option<Point2>,
    last_feet: Option<Point2>,
    events: Vec<SkillEvent>,
    report: SegmenterReport,
}

impl PassSegmenter {
    pub fn new(
        spike_threshold: f32,
        max_step: f32,
        control_distance: f32,
        sustain_frames: u32,
        contact_window: u32,
        gap_tolerance: u32,
    ) -> Self {
        Self {
            spike_threshold,
            max_step,
            control_distance,
            sustain_frames,
            contact_window,
            state: PassState::Idle,
            gap: GapTracker::new(gap_tolerance),
            stall: GapTracker::new(gap_tolerance),
            since_near: None,
            prev_ball_speed: None,
            last_ball: None,
            last_feet: None,
            events: Vec::new(),
            report: SegmenterReport::default(),
        }
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        let scale = config.pixel_scale();
        Self::new(
            config.pass_velocity_spike_threshold * scale,
            config.pass_max_step_px * scale,
            config.control_distance_threshold * scale,
            config.pass_sustain_frames,
            config.pass_contact_window_frames,
            config.gap_tolerance_frames,
        )
    }

    pub fn state(&self) -> PassState {
        self.state
    }

    /// ボールと足元の距離。今フレームの足首が無ければ最後に見えた足元で測る
    fn feet_distance(&self, signal: &Signal) -> Option<f32> {
        signal.distances.feet().or_else(|| {
            let ball = signal.ball_center?;
            self.last_feet.map(|f| f.distance(&ball))
        })
    }

    fn near_recently(&self) -> bool {
        self.since_near
            .is_some_and(|n| (1..=self.contact_window).contains(&n))
    }

    fn discard(&mut self, frame: u64, reason: &str) {
        if let PassState::Candidate { impulse_frame, .. } = self.state {
            debug!(frame, impulse_frame, reason, "pass candidate discarded");
        }
        self.report.discarded += 1;
        self.gap.clear();
        self.stall.clear();
        self.state = PassState::Idle;
    }

    fn observe_idle(&mut self, signal: &Signal, ball: Point2, distance: Option<f32>) {
        let frame = signal.index();
        let Some(speed) = signal.ball_speed() else {
            return;
        };
        let rising = self.prev_ball_speed.map_or(true, |p| p <= self.spike_threshold);
        if speed <= self.spike_threshold || !rising {
            return;
        }
        if speed >= self.max_step {
            warn!(frame, speed, "ball step too large, ignored as detection jump");
            return;
        }
        if !self.near_recently() {
            return;
        }
        let ball_origin = match (self.last_ball, signal.ball_velocity) {
            (Some(prev), _) => prev,
            (None, Some(v)) => ball.sub(&v),
            (None, None) => ball,
        };
        debug!(frame, speed, "kick impulse");
        self.gap.clear();
        self.stall.clear();
        self.state = PassState::Candidate {
            impulse_frame: frame,
            ball_origin,
            travel_frames: 0,
            departed: false,
            elapsed: 0,
            last_away: distance.unwrap_or_else(|| ball.distance(&ball_origin)),
        };
    }
}

impl Segmenter for PassSegmenter {
    fn kind(&self) -> SkillKind {
        SkillKind::Pass
    }

    fn observe(&mut self, signal: &Signal) {
        let frame = signal.index();
        let distance = self.feet_distance(signal);
        let near = distance.is_some_and(|d| d < self.control_distance);
        if let Some(n) = self.since_near.as_mut() {
            *n = n.saturating_add(1);
        }

        match (self.state, signal.ball_center) {
            (PassState::Idle, Some(ball)) => self.observe_idle(signal, ball, distance),
            (PassState::Idle, None) => {}

            (PassState::Candidate { .. }, None) => {
                if self.gap.miss() {
                    self.report.gap_resets.push(frame);
                    self.discard(frame, "detection gap");
                }
            }
            (
                PassState::Candidate {
                    impulse_frame,
                    ball_origin,
                    travel_frames,
                    departed,
                    elapsed,
                    last_away,
                },
                Some(ball),
            ) => {
                self.gap.clear();
                let elapsed = elapsed.saturating_add(1);
                let away = distance.unwrap_or_else(|| ball.distance(&ball_origin));
                let mut next = PassState::Candidate {
                    impulse_frame,
                    ball_origin,
                    travel_frames,
                    departed,
                    elapsed,
                    last_away: away,
                };
                if near && departed {
                    self.discard(frame, "ball returned");
                } else if near {
                    // 足元から離れないまま窓を過ぎたらキックではない
                    if elapsed > self.contact_window {
                        self.discard(frame, "ball stayed at feet");
                    } else {
                        self.state = next;
                    }
                } else if away <= last_away {
                    if self.stall.miss() {
                        self.discard(frame, "ball stopped");
                    } else {
                        if let PassState::Candidate { departed, .. } = &mut next {
                            *departed = true;
                        }
                        self.state = next;
                    }
                } else {
                    let travel_frames = travel_frames + 1;
                    if travel_frames >= self.sustain_frames {
                        let displacement = ball.distance(&ball_origin);
                        debug!(impulse_frame, frame, displacement, "pass");
                        self.events
                            .push(SkillEvent::instant(SkillKind::Pass, impulse_frame, displacement));
                        self.stall.clear();
                        self.state = PassState::Idle;
                    } else {
                        self.state = PassState::Candidate {
                            impulse_frame,
                            ball_origin,
                            travel_frames,
                            departed: true,
                            elapsed,
                            last_away: away,
                        };
                    }
                }
            }
        }

        if near {
            self.since_near = Some(0);
        }
        if signal.feet_center.is_some() {
            self.last_feet = signal.feet_center;
        }
        if signal.ball_center.is_some() {
            self.last_ball = signal.ball_center;
        }
        self.prev_ball_speed = signal.ball_speed();
    }

    fn finish(&mut self) {
        if let PassState::Candidate { impulse_frame, .. } = self.state {
            self.discard(impulse_frame, "stream ended");
        }
    }

    fn events(&self) -> &[SkillEvent] {
        &self.events
    }

    fn report(&self) -> &SegmenterReport {
        &self.report
    }
}
