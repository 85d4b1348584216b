use anyhow::{bail, Result};
use std::io::{self, BufWriter, Write};

use soccer_skills::drill::Drill;

/// 合成ドリルの検出ダンプを標準出力に書く
///
/// `synth_drill [jump|run|pass|all]`。all はフレーム番号を通しで振り直して連結する
fn main() -> Result<()> {
    let name = std::env::args().nth(1).unwrap_or_else(|| "all".to_string());
    let drills: Vec<Drill> = if name == "all" {
        Drill::ALL.to_vec()
    } else if let Some(drill) = Drill::from_name(&name) {
        vec![drill]
    } else {
        bail!("unknown drill `{name}` (expected jump, run, pass or all)");
    };

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let mut next_index = 0u64;
    for drill in drills {
        let frames = drill.frames();
        let count = frames.len() as u64;
        for mut frame in frames {
            frame.frame_index += next_index;
            serde_json::to_writer(&mut out, &frame)?;
            out.write_all(b"\n")?;
        }
        eprintln!("[{}] {} frames (from {})", drill.name(), count, next_index);
        next_index += count;
    }
    out.flush()?;
    Ok(())
}
