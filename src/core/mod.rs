pub mod engine;
pub mod sequence;
pub mod step;

pub use crate::domain::model::{Invocation, RunReport, SpawnResult, StepOutcome, StepStatus};
pub use crate::domain::ports::{ReportSink, Spawner};
pub use crate::utils::error::Result;
