use anyhow::{bail, Context, Result};
use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::info;
use tracing_subscriber::EnvFilter;

use soccer_skills::perception::JsonlSource;
use soccer_skills::{analyze, AnalysisConfig, CancelFlag, RunOutcome};

const USAGE: &str = "usage: soccer_skills [-o <result.json>] <detections.jsonl> [config.toml]";

struct Args {
    input: PathBuf,
    config: Option<PathBuf>,
    output: Option<PathBuf>,
}

fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<Args> {
    let mut positional = Vec::new();
    let mut output = None;
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-o" | "--output" => {
                let Some(path) = args.next() else {
                    bail!("{arg} requires a path\n{USAGE}");
                };
                output = Some(PathBuf::from(path));
            }
            "-h" | "--help" => bail!(USAGE),
            _ => positional.push(PathBuf::from(arg)),
        }
    }
    let mut positional = positional.into_iter();
    let Some(input) = positional.next() else {
        bail!(USAGE);
    };
    let config = positional.next();
    if positional.next().is_some() {
        bail!(USAGE);
    }
    Ok(Args { input, config, output })
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_summary(outcome: &RunOutcome, elapsed: Duration) {
    let r = &outcome.result;
    let d = &outcome.diagnostics;
    eprintln!("=== Soccer Skills ===");
    eprintln!("フレーム: {} 解析 / {} 入力 (使用可能 {})", d.frames_analyzed, d.frames_seen, d.usable_frames);
    eprintln!("  jumping : {:6.1}  ({} events)", r.jumping.score, r.jumping.events.len());
    eprintln!("  running : {:6.1}  ({} events)", r.running.score, r.running.events.len());
    eprintln!("  passing : {:6.1}  ({} events)", r.passing.score, r.passing.events.len());
    eprintln!("  overall : {:6.1}", r.overall_score);
    eprintln!("処理時間: {:.2}s", elapsed.as_secs_f64());
    if !d.detection_gaps.is_empty() {
        eprintln!("欠損で打ち切ったイベント: {}", d.detection_gaps.len());
    }
    if d.cancelled {
        eprintln!("中断されました（確定済みのイベントのみ採点）");
    }
}

fn main() -> Result<()> {
    init_logging();

    let Args { input, config: config_path, output } = parse_args(std::env::args().skip(1))?;

    info!("Soccer Skills ({})", env!("GIT_VERSION"));

    let config = match &config_path {
        Some(path) => AnalysisConfig::load(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => AnalysisConfig::default(),
    };

    // SIGINT → フレーム間で中断
    let cancel = CancelFlag::new();
    signal_hook::flag::register(signal_hook::consts::SIGINT, cancel.handle())
        .context("failed to register SIGINT handler")?;

    let source = JsonlSource::open(&input)
        .with_context(|| format!("failed to open {}", input.display()))?;
    let started = Instant::now();
    let outcome = analyze(source, config, &cancel)
        .with_context(|| format!("analysis of {} failed", input.display()))?;
    let elapsed = started.elapsed();

    print_summary(&outcome, elapsed);
    let json = outcome.result.to_json_pretty()?;
    match output {
        Some(path) => {
            fs::write(&path, format!("{json}\n"))
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!(path = %path.display(), "result written");
        }
        None => println!("{json}"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_output_flag_anywhere() {
        let a = parse_args(args(&["dump.jsonl", "-o", "out.json", "cfg.toml"])).unwrap();
        assert_eq!(a.input, PathBuf::from("dump.jsonl"));
        assert_eq!(a.config, Some(PathBuf::from("cfg.toml")));
        assert_eq!(a.output, Some(PathBuf::from("out.json")));

        let a = parse_args(args(&["--output", "out.json", "dump.jsonl"])).unwrap();
        assert_eq!(a.input, PathBuf::from("dump.jsonl"));
        assert!(a.config.is_none());
    }

    #[test]
    fn test_missing_output_path_is_error() {
        assert!(parse_args(args(&["dump.jsonl", "-o"])).is_err());
        assert!(parse_args(args(&[])).is_err());
        assert!(parse_args(args(&["a", "b", "c"])).is_err());
    }
}
