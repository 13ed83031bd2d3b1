pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::CliConfig;

pub use adapters::{LocalReportSink, TokioSpawner};
pub use config::pipeline::PipelineConfig;
pub use core::engine::RunnerEngine;
pub use core::sequence::{FailureMode, RunContext, StepSequence};
pub use core::step::CommandStep;
pub use domain::model::{Invocation, RunReport, SpawnResult, StepOutcome, StepStatus};
pub use utils::error::{Result, RunnerError};
