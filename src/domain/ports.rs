use crate::domain::model::{Invocation, RunReport, SpawnResult};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Execution port. The production adapter spawns real child processes; tests
/// substitute a recording implementation to assert on the invocation trace.
#[async_trait]
pub trait Spawner: Send + Sync {
    async fn run(&self, invocation: &Invocation, timeout: Option<Duration>) -> Result<SpawnResult>;
}

/// Where the run report ends up after a pipeline finishes.
#[async_trait]
pub trait ReportSink: Send + Sync {
    /// Returns the location the report was written to.
    async fn write_report(&self, report: &RunReport) -> Result<String>;
}
