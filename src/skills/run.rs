use tracing::debug;

use super::debounce::{Debounce, GapTracker};
use super::{Segmenter, SegmenterReport, SkillEvent, SkillKind};
use crate::config::AnalysisConfig;
use crate::signal::Signal;

/// コントロール区間の集計
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlSpan {
    pub start: u64,
    /// 走行とコントロールが両方成立した最後のフレーム
    pub end: u64,
    /// 区間内で計測できたフレーム数
    pub measured: u32,
    /// うち good_control 閾値未満だったフレーム数
    pub good: u32,
}

impl ControlSpan {
    fn begin(frame: u64, good: bool) -> Self {
        Self {
            start: frame,
            end: frame,
            measured: 1,
            good: good as u32,
        }
    }

    fn extend(&mut self, frame: u64, good: bool) {
        self.end = frame;
        self.measured += 1;
        self.good += good as u32;
    }

    /// good / measured
    pub fn consistency(&self) -> f32 {
        if self.measured == 0 {
            0.0
        } else {
            self.good as f32 / self.measured as f32
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// `streak` は開始条件を満たしている連続フレーム
    Idle { streak: Option<ControlSpan> },
    Controlling(ControlSpan),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum RunInput {
    /// 足首またはボールが欠損
    Absent,
    Measured {
        controlled: bool,
        good: bool,
        running: bool,
    },
}

/// Running-with-Ball セグメンタ
///
/// IDLE → CONTROLLING: 速度 > run_speed かつ 足元距離 < control_distance が control_min_frames 連続
/// CONTROLLING → IDLE: 距離超過 または 速度低下 が control_debounce_frames 連続
/// 終了時に区間 [start, end] の RUN_CONTROL を出す。品質 = 秒数 × good 比率
pub struct RunSegmenter {
    run_speed_threshold: f32,
    control_distance: f32,
    good_control_distance: f32,
    fps: f32,
    state: RunState,
    entry: Debounce,
    lost_control: Debounce,
    slowed: Debounce,
    gap: GapTracker,
    /// 終了判定中のフレーム（再開すれば区間に含める）
    pending: Option<ControlSpan>,
    events: Vec<SkillEvent>,
    report: SegmenterReport,
}

impl RunSegmenter {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        run_speed_threshold: f32,
        control_distance: f32,
        good_control_distance: f32,
        min_frames: u32,
        debounce_frames: u32,
        gap_tolerance: u32,
        fps: f32,
    ) -> Self {
        Self {
            run_speed_threshold,
            control_distance,
            good_control_distance,
            fps,
            state: RunState::Idle { streak: None },
            entry: Debounce::new(min_frames),
            lost_control: Debounce::new(debounce_frames),
            slowed: Debounce::new(debounce_frames),
            gap: GapTracker::new(gap_tolerance),
            pending: None,
            events: Vec::new(),
            report: SegmenterReport::default(),
        }
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        let scale = config.pixel_scale();
        Self::new(
            config.run_speed_threshold * scale,
            config.control_distance_threshold * scale,
            config.good_control_distance_px * scale,
            config.control_min_frames,
            config.control_debounce_frames,
            config.gap_tolerance_frames,
            config.fps,
        )
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    fn classify(&self, signal: &Signal) -> RunInput {
        let Some(distance) = signal.distances.feet() else {
            return RunInput::Absent;
        };
        RunInput::Measured {
            controlled: distance < self.control_distance,
            good: distance < self.good_control_distance,
            running: signal
                .player_speed()
                .is_some_and(|v| v > self.run_speed_threshold),
        }
    }

    fn reset_counters(&mut self) {
        self.lost_control.reset();
        self.slowed.reset();
        self.gap.clear();
        self.pending = None;
    }

    fn commit(&mut self, span: ControlSpan) {
        let seconds = (span.end - span.start + 1) as f32 / self.fps;
        let quality = seconds * span.consistency();
        debug!(
            start = span.start,
            end = span.end,
            consistency = span.consistency(),
            "run with control"
        );
        self.events
            .push(SkillEvent::new(SkillKind::RunControl, span.start, span.end, quality));
    }

    fn observe_idle(&mut self, streak: Option<ControlSpan>, frame: u64, input: RunInput) -> RunState {
        match input {
            RunInput::Measured {
                controlled: true,
                running: true,
                good,
            } => {
                let streak = match streak {
                    Some(mut s) => {
                        s.extend(frame, good);
                        s
                    }
                    None => ControlSpan::begin(frame, good),
                };
                if self.entry.hit() {
                    self.entry.reset();
                    self.reset_counters();
                    debug!(frame, start = streak.start, "control established");
                    RunState::Controlling(streak)
                } else {
                    RunState::Idle {
                        streak: Some(streak),
                    }
                }
            }
            // 連続性が切れたら数え直し
            _ => {
                self.entry.reset();
                RunState::Idle { streak: None }
            }
        }
    }

    fn observe_controlling(&mut self, mut span: ControlSpan, frame: u64, input: RunInput) -> RunState {
        match input {
            RunInput::Absent => {
                if self.gap.miss() {
                    debug!(frame, start = span.start, "run dropped: detection gap");
                    self.report.gap_resets.push(frame);
                    self.report.discarded += 1;
                    self.reset_counters();
                    RunState::Idle { streak: None }
                } else {
                    RunState::Controlling(span)
                }
            }
            RunInput::Measured {
                controlled: true,
                running: true,
                good,
            } => {
                if let Some(p) = self.pending.take() {
                    span.measured += p.measured;
                    span.good += p.good;
                }
                span.extend(frame, good);
                self.reset_counters();
                RunState::Controlling(span)
            }
            RunInput::Measured {
                controlled,
                running,
                good,
            } => {
                self.gap.clear();
                let pending = self.pending.get_or_insert(ControlSpan {
                    start: frame,
                    end: frame,
                    measured: 0,
                    good: 0,
                });
                pending.measured += 1;
                pending.good += good as u32;

                let lost = if controlled {
                    self.lost_control.reset();
                    false
                } else {
                    self.lost_control.hit()
                };
                let slow = if running {
                    self.slowed.reset();
                    false
                } else {
                    self.slowed.hit()
                };
                if lost || slow {
                    self.commit(span);
                    self.reset_counters();
                    RunState::Idle { streak: None }
                } else {
                    RunState::Controlling(span)
                }
            }
        }
    }
}

impl Segmenter for RunSegmenter {
    fn kind(&self) -> SkillKind {
        SkillKind::RunControl
    }

    fn observe(&mut self, signal: &Signal) {
        let frame = signal.index();
        let input = self.classify(signal);
        self.state = match self.state {
            RunState::Idle { streak } => self.observe_idle(streak, frame, input),
            RunState::Controlling(span) => self.observe_controlling(span, frame, input),
        };
    }

    fn finish(&mut self) {
        if let RunState::Controlling(span) = self.state {
            self.commit(span);
        }
        self.reset_counters();
        self.entry.reset();
        self.state = RunState::Idle { streak: None };
    }

    fn events(&self) -> &[SkillEvent] {
        &self.events
    }

    fn report(&self) -> &SegmenterReport {
        &self.report
    }
}
