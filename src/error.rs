use thiserror::Error;

/// 設定値の検証エラー（フレーム処理前に検出される）
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config option `{field}` = {value} is out of range: {reason}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        reason: &'static str,
    },

    #[error("config option `{field}` is invalid: {reason}")]
    Invalid {
        field: &'static str,
        reason: String,
    },

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
}

/// 知覚層（フレーム取得・検出ダンプ）のエラー。コア側では再試行しない
#[derive(Debug, Error)]
pub enum PerceptionError {
    #[error("detection source I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed detection record at line {line}: {reason}")]
    Malformed { line: usize, reason: String },
}

/// 解析ランを中断する致命的エラー
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("frame {frame} arrived after frame {previous}: frame indices must be strictly increasing")]
    InvalidFrameOrder { frame: u64, previous: u64 },

    #[error(transparent)]
    Configuration(#[from] ConfigError),

    #[error("perception failed{}: {source}", after_frame(.frame))]
    Perception {
        frame: Option<u64>,
        #[source]
        source: PerceptionError,
    },
}

fn after_frame(frame: &Option<u64>) -> String {
    frame.map(|f| format!(" after frame {f}")).unwrap_or_default()
}

impl AnalysisError {
    /// エラーを引き起こしたフレーム（分かる場合）
    pub fn frame(&self) -> Option<u64> {
        match self {
            Self::InvalidFrameOrder { frame, .. } => Some(*frame),
            Self::Perception { frame, .. } => *frame,
            Self::Configuration(_) => None,
        }
    }
}
