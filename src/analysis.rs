use std::panic;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::perception::{DetectionSource, FrameDetections};
use crate::result::AnalysisResult;
use crate::score::Scorer;
use crate::signal::{Signal, SignalExtractor};
use crate::skills::{JumpSegmenter, PassSegmenter, RunSegmenter, Segmenter, SkillKind};

/// フレーム間で確認される中断フラグ
///
/// `handle()` をシグナルハンドラや別スレッドに渡して使う
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    pub fn handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.0)
    }
}

/// 欠損で打ち切られたイベント
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DetectionGap {
    pub skill: SkillKind,
    pub frame: u64,
}

/// 解析ランの統計（結果 JSON には含めない）
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Diagnostics {
    pub frames_seen: u64,
    pub frames_analyzed: u64,
    /// frame_skip で読み飛ばしたフレーム
    pub frames_skipped: u64,
    /// 選手かボールのどちらかが使えたフレーム
    pub usable_frames: u64,
    pub discarded_pass_candidates: usize,
    pub detection_gaps: Vec<DetectionGap>,
    pub cancelled: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    pub result: AnalysisResult,
    pub diagnostics: Diagnostics,
}

/// フレーム順序チェックと間引き
struct FrameGate {
    frame_skip: u64,
    previous: Option<u64>,
}

impl FrameGate {
    fn new(frame_skip: u32) -> Self {
        Self {
            frame_skip: frame_skip.max(1) as u64,
            previous: None,
        }
    }

    /// 解析対象なら true。順序違反はエラー
    fn admit(&mut self, index: u64) -> Result<bool, AnalysisError> {
        if let Some(previous) = self.previous {
            if index <= previous {
                return Err(AnalysisError::InvalidFrameOrder { frame: index, previous });
            }
        }
        self.previous = Some(index);
        Ok(index % self.frame_skip == 0)
    }

    fn last(&self) -> Option<u64> {
        self.previous
    }
}

/// 動画1本分の解析ラン
///
/// 設定・抽出器・3つのセグメンタを所有する。ラン間で状態は共有しない。
pub struct Analyzer {
    extractor: SignalExtractor,
    gate: FrameGate,
    segmenters: [Box<dyn Segmenter>; 3],
    scorer: Scorer,
    diagnostics: Diagnostics,
}

impl Analyzer {
    /// 設定を検証してから構築する。フレームは1つも処理しない
    pub fn new(config: AnalysisConfig) -> Result<Self, AnalysisError> {
        config.validate()?;
        debug!(?config, "analyzer configured");
        Ok(Self {
            extractor: SignalExtractor::from_config(&config),
            gate: FrameGate::new(config.frame_skip),
            segmenters: [
                Box::new(JumpSegmenter::from_config(&config)),
                Box::new(RunSegmenter::from_config(&config)),
                Box::new(PassSegmenter::from_config(&config)),
            ],
            scorer: Scorer::from_config(&config),
            diagnostics: Diagnostics::default(),
        })
    }

    /// 1フレームを取り込み、全セグメンタに流す
    pub fn process_frame(&mut self, detections: &FrameDetections) -> Result<(), AnalysisError> {
        if let Some(signal) = self.ingest(detections)? {
            for segmenter in self.segmenters.iter_mut() {
                segmenter.observe(&signal);
            }
        }
        Ok(())
    }

    /// 最後に受け付けたフレーム
    pub fn last_frame(&self) -> Option<u64> {
        self.gate.last()
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// 中断されたことを記録する。確定済みのイベントはそのまま採点される
    pub fn mark_cancelled(&mut self) {
        self.diagnostics.cancelled = true;
    }

    /// 進行中のイベントを閉じて採点する
    pub fn finish(mut self) -> RunOutcome {
        for segmenter in self.segmenters.iter_mut() {
            segmenter.finish();
        }
        self.conclude()
    }

    fn ingest(&mut self, detections: &FrameDetections) -> Result<Option<Signal>, AnalysisError> {
        self.diagnostics.frames_seen += 1;
        if !self.gate.admit(detections.frame_index)? {
            self.diagnostics.frames_skipped += 1;
            return Ok(None);
        }
        self.diagnostics.frames_analyzed += 1;
        let signal = self.extractor.extract_frame(detections);
        if signal.has_player() || signal.has_ball() {
            self.diagnostics.usable_frames += 1;
        }
        Ok(Some(signal))
    }

    /// 終了済みのセグメンタから結果と統計をまとめる
    fn conclude(self) -> RunOutcome {
        let mut diagnostics = self.diagnostics;
        for segmenter in &self.segmenters {
            let report = segmenter.report();
            diagnostics.detection_gaps.extend(report.gap_resets.iter().map(|&frame| DetectionGap {
                skill: segmenter.kind(),
                frame,
            }));
            if segmenter.kind() == SkillKind::Pass {
                diagnostics.discarded_pass_candidates = report.discarded;
            }
        }

        let [jump, run, pass] = &self.segmenters;
        let result = if diagnostics.usable_frames == 0 {
            warn!(frames = diagnostics.frames_seen, "no usable frames, all scores are 0");
            AnalysisResult::empty()
        } else {
            self.scorer.score(jump.events(), run.events(), pass.events())
        };

        info!(
            frames = diagnostics.frames_analyzed,
            events = result.event_count(),
            overall = result.overall_score,
            cancelled = diagnostics.cancelled,
            "analysis finished"
        );
        RunOutcome { result, diagnostics }
    }
}

/// 検出ソースを先頭から順に解析する
///
/// 中断フラグはフレームの間で確認する。中断時はそこまでの確定イベントで採点する。
pub fn analyze<S: DetectionSource>(
    mut source: S,
    config: AnalysisConfig,
    cancel: &CancelFlag,
) -> Result<RunOutcome, AnalysisError> {
    let mut analyzer = Analyzer::new(config)?;
    info!("analysis started");
    loop {
        // 中断後はソースを読み進めない
        if cancel.is_cancelled() {
            info!(last_frame = ?analyzer.last_frame(), "analysis cancelled");
            analyzer.mark_cancelled();
            break;
        }
        let Some(next) = source.next_frame() else {
            break;
        };
        let detections = next.map_err(|source| AnalysisError::Perception {
            frame: analyzer.last_frame(),
            source,
        })?;
        analyzer.process_frame(&detections)?;
    }
    Ok(analyzer.finish())
}

/// 信号抽出は順に1回だけ行い、3つのセグメンタを別スレッドで並行に回す
///
/// 各スレッドは同じ Signal 列を読むだけなので結果は `analyze` と一致する。
pub fn analyze_parallel(
    frames: &[FrameDetections],
    config: AnalysisConfig,
    cancel: &CancelFlag,
) -> Result<RunOutcome, AnalysisError> {
    let mut analyzer = Analyzer::new(config)?;
    info!(frames = frames.len(), "parallel analysis started");

    let mut signals = Vec::with_capacity(frames.len());
    for detections in frames {
        if cancel.is_cancelled() {
            info!(last_frame = ?analyzer.last_frame(), "analysis cancelled");
            analyzer.mark_cancelled();
            break;
        }
        if let Some(signal) = analyzer.ingest(detections)? {
            signals.push(signal);
        }
    }

    let signals = &signals;
    thread::scope(|scope| {
        let workers: Vec<_> = analyzer
            .segmenters
            .iter_mut()
            .map(|segmenter| {
                scope.spawn(move || {
                    for signal in signals {
                        segmenter.observe(signal);
                    }
                    segmenter.finish();
                })
            })
            .collect();
        for worker in workers {
            if let Err(payload) = worker.join() {
                panic::resume_unwind(payload);
            }
        }
    });
    Ok(analyzer.conclude())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drill::{ball_at, standing_pose, Drill};
    use crate::error::{ConfigError, PerceptionError};
    use crate::geometry::Point2;
    use crate::perception::IterSource;

    fn analyze_frames(frames: Vec<FrameDetections>, config: AnalysisConfig) -> RunOutcome {
        analyze(IterSource::new(frames), config, &CancelFlag::new()).unwrap()
    }

    #[test]
    fn test_cancel_flag_shared_handle() {
        let flag = CancelFlag::new();
        assert!(!flag.is_cancelled());
        flag.handle().store(true, Ordering::Relaxed);
        assert!(flag.is_cancelled());
    }

    #[test]
    fn test_frame_gate_order_and_skip() {
        let mut gate = FrameGate::new(2);
        assert!(gate.admit(0).unwrap());
        assert!(!gate.admit(1).unwrap());
        assert!(gate.admit(4).unwrap());
        assert!(matches!(
            gate.admit(4),
            Err(AnalysisError::InvalidFrameOrder { frame: 4, previous: 4 })
        ));
    }

    #[test]
    fn test_invalid_config_rejected_before_frames() {
        let config = AnalysisConfig {
            control_distance_threshold: -1.0,
            ..AnalysisConfig::default()
        };
        let err = Analyzer::new(config).err().unwrap();
        assert!(matches!(err, AnalysisError::Configuration(ConfigError::OutOfRange { .. })));
    }

    #[test]
    fn test_frames_without_detections_are_not_usable() {
        let frames = (0..10).map(|i| FrameDetections::new(i, vec![], vec![])).collect();
        let outcome = analyze_frames(frames, AnalysisConfig::default());
        assert_eq!(outcome.result, AnalysisResult::empty());
        assert_eq!(outcome.diagnostics.frames_seen, 10);
        assert_eq!(outcome.diagnostics.usable_frames, 0);
    }

    #[test]
    fn test_frame_skip_counts() {
        let frames = Drill::Run.frames();
        let total = frames.len() as u64;
        let config = AnalysisConfig {
            frame_skip: 2,
            ..AnalysisConfig::default()
        };
        let outcome = analyze_frames(frames, config);
        let d = &outcome.diagnostics;
        assert_eq!(d.frames_seen, total);
        assert_eq!(d.frames_analyzed + d.frames_skipped, total);
        assert_eq!(d.frames_analyzed, total.div_ceil(2));
    }

    #[test]
    fn test_perception_error_reports_last_frame() {
        struct Failing(u64);
        impl DetectionSource for Failing {
            fn next_frame(&mut self) -> Option<Result<FrameDetections, PerceptionError>> {
                self.0 += 1;
                if self.0 <= 3 {
                    Some(Ok(FrameDetections::new(self.0 - 1, vec![], vec![])))
                } else {
                    Some(Err(PerceptionError::Malformed {
                        line: 4,
                        reason: "truncated".to_string(),
                    }))
                }
            }
        }
        let err = analyze(Failing(0), AnalysisConfig::default(), &CancelFlag::new()).unwrap_err();
        assert!(matches!(err, AnalysisError::Perception { frame: Some(2), .. }));
    }

    #[test]
    fn test_detection_gap_is_recorded() {
        // 接触中にボールが消える
        let pose = standing_pose(Point2::new(300.0, 300.0), 0.9);
        let mut frames = Vec::new();
        for i in 0..12u64 {
            let mut p = pose.clone();
            // 上下に揺らして鉛直速度を作る
            let dy = if i % 2 == 0 { 0.0 } else { -10.0 };
            for kp in p.keypoints.iter_mut() {
                kp.y += dy;
            }
            let balls = if i < 4 {
                vec![ball_at(Point2::new(290.0, 350.0 + dy), 0.9)]
            } else {
                vec![]
            };
            frames.push(FrameDetections::new(i, vec![p], balls));
        }
        let outcome = analyze_frames(frames, AnalysisConfig::default());
        assert!(outcome.result.jumping.events.is_empty());
        assert!(outcome
            .diagnostics
            .detection_gaps
            .contains(&DetectionGap { skill: SkillKind::JumpContact, frame: 6 }));
    }

    #[test]
    fn test_cancel_stops_polling_the_source() {
        struct Counting {
            polls: u32,
            cancel: CancelFlag,
        }
        impl DetectionSource for Counting {
            fn next_frame(&mut self) -> Option<Result<FrameDetections, PerceptionError>> {
                self.polls += 1;
                if self.polls == 3 {
                    self.cancel.cancel();
                }
                Some(Ok(FrameDetections::new(u64::from(self.polls) - 1, vec![], vec![])))
            }
        }
        let cancel = CancelFlag::new();
        let mut source = Counting { polls: 0, cancel: cancel.clone() };
        let outcome = analyze(&mut source, AnalysisConfig::default(), &cancel).unwrap();
        assert!(outcome.diagnostics.cancelled);
        // 中断を立てたフレームまでは解析し、次は読まない
        assert_eq!(source.polls, 3);
        assert_eq!(outcome.diagnostics.frames_seen, 3);
    }
}
