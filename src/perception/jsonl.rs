use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;

use super::{DetectionSource, FrameDetections};
use crate::error::PerceptionError;

/// 検出ダンプ（1行1フレームのJSON Lines）を読むソース
///
/// 外部の推論パイプラインが書き出した結果をそのまま流し込む用途。空行は読み飛ばす。
pub struct JsonlSource<R> {
    lines: Lines<R>,
    line_no: usize,
}

impl JsonlSource<BufReader<File>> {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, PerceptionError> {
        let file = File::open(path)?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> JsonlSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_no: 0,
        }
    }
}

impl<R: BufRead> DetectionSource for JsonlSource<R> {
    fn next_frame(&mut self) -> Option<Result<FrameDetections, PerceptionError>> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(e.into())),
            };
            self.line_no += 1;
            if line.trim().is_empty() {
                continue;
            }
            return Some(serde_json::from_str(&line).map_err(|e| PerceptionError::Malformed {
                line: self.line_no,
                reason: e.to_string(),
            }));
        }
    }
}
