pub mod analysis;
pub mod config;
pub mod drill;
pub mod error;
pub mod geometry;
pub mod perception;
pub mod pose;
pub mod result;
pub mod score;
pub mod signal;
pub mod skills;

pub use analysis::{analyze, analyze_parallel, Analyzer, CancelFlag, Diagnostics, RunOutcome};
pub use config::AnalysisConfig;
pub use error::{AnalysisError, ConfigError, PerceptionError};
pub use result::{AnalysisResult, SkillResult};
pub use skills::{SkillEvent, SkillKind};
