use crate::core::step::CommandStep;
use crate::domain::model::{Invocation, SpawnResult, StepOutcome, StepStatus};
use crate::domain::ports::Spawner;
use crate::utils::error::{Result, RunnerError};
use crate::utils::monitor::SystemMonitor;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

/// What happens to the rest of the pipeline when a required step fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailureMode {
    /// Stop at the first failing step; remaining steps are marked skipped.
    #[default]
    Halt,
    /// Run every step regardless and report all failures at the end.
    Continue,
}

/// Bookkeeping for one run: every outcome plus the ordered trace of
/// invocations actually dispatched. Skipped steps never enter the trace.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub execution_id: String,
    pub root: PathBuf,
    pub outcomes: Vec<StepOutcome>,
    pub trace: Vec<Invocation>,
}

impl RunContext {
    pub fn new(execution_id: String, root: PathBuf) -> Self {
        Self {
            execution_id,
            root,
            outcomes: Vec::new(),
            trace: Vec::new(),
        }
    }

    pub fn record_dispatch(&mut self, invocation: Invocation) {
        self.trace.push(invocation);
    }

    pub fn record(&mut self, outcome: StepOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn last_outcome(&self) -> Option<&StepOutcome> {
        self.outcomes.last()
    }

    pub fn outcome_by_name(&self, name: &str) -> Option<&StepOutcome> {
        self.outcomes.iter().find(|o| o.step_name == name)
    }

    pub fn failed_steps(&self) -> Vec<&StepOutcome> {
        self.outcomes
            .iter()
            .filter(|o| o.status == StepStatus::Failed)
            .collect()
    }

    pub fn success(&self) -> bool {
        !self.outcomes.iter().any(StepOutcome::blocks_pipeline)
    }
}

/// What one step's attempt loop settled on.
struct StepExecution {
    status: StepStatus,
    exit_code: Option<i32>,
    attempts: u32,
    timed_out: bool,
    spawn_error: Option<String>,
}

/// Executes a fixed, ordered list of steps, one child process at a time.
/// Each step blocks until its process exits; there is no parallelism between
/// steps and no data flows from one step to the next.
pub struct StepSequence {
    steps: Vec<CommandStep>,
    spawner: Arc<dyn Spawner>,
    failure_mode: FailureMode,
    monitor: Option<SystemMonitor>,
    monitor_enabled: bool,
    execution_id: String,
    root: PathBuf,
}

impl StepSequence {
    pub fn new(execution_id: String, root: PathBuf, spawner: Arc<dyn Spawner>) -> Self {
        Self {
            steps: Vec::new(),
            spawner,
            failure_mode: FailureMode::default(),
            monitor: None,
            monitor_enabled: false,
            execution_id,
            root,
        }
    }

    pub fn with_failure_mode(mut self, mode: FailureMode) -> Self {
        self.failure_mode = mode;
        self
    }

    pub fn with_monitoring(mut self, enabled: bool) -> Self {
        self.monitor_enabled = enabled;
        if enabled {
            self.monitor = Some(SystemMonitor::new(enabled));
        }
        self
    }

    pub fn add_step(&mut self, step: CommandStep) {
        self.steps.push(step);
    }

    /// The full invocation trace this sequence would produce, without
    /// spawning anything. Dry-run mode prints exactly this.
    pub fn plan(&self) -> Vec<Invocation> {
        self.steps.iter().map(|s| s.resolve(&self.root)).collect()
    }

    /// Runs every step in definition order. Returns `Err` only for
    /// infrastructure problems; step failures are reported through the
    /// outcomes so the caller can still produce a full report.
    pub async fn execute_all(&mut self) -> Result<RunContext> {
        let mut context = RunContext::new(self.execution_id.clone(), self.root.clone());
        let mut halted = false;

        if self.monitor_enabled {
            if let Some(monitor) = &self.monitor {
                monitor.log_stats("Pipeline started");
            }
        }

        for step in &self.steps {
            let invocation = step.resolve(&self.root);

            if halted {
                tracing::info!("⏭️ Skipping step: {} (pipeline halted)", step.name);
                context.record(StepOutcome::skipped(
                    step.name.clone(),
                    invocation,
                    step.allow_failure,
                ));
                continue;
            }

            tracing::info!(
                "▶️ Running step: {} ({}) in {}",
                step.name,
                invocation.display_command(),
                invocation.cwd.display()
            );

            context.record_dispatch(invocation.clone());
            let start = Instant::now();
            let execution = Self::execute_step(self.spawner.as_ref(), step, &invocation).await?;
            let duration = start.elapsed();

            match execution.status {
                StepStatus::Succeeded => {
                    tracing::info!(
                        "✅ Step succeeded: {} (attempts: {}, duration: {:?})",
                        step.name,
                        execution.attempts,
                        duration
                    );
                }
                StepStatus::Failed if step.allow_failure => {
                    tracing::warn!(
                        "⚠️ Advisory step failed: {} (exit code: {:?}), continuing",
                        step.name,
                        execution.exit_code
                    );
                }
                StepStatus::Failed => {
                    tracing::error!(
                        "❌ Step failed: {} (exit code: {:?}, attempts: {})",
                        step.name,
                        execution.exit_code,
                        execution.attempts
                    );
                    if self.failure_mode == FailureMode::Halt {
                        halted = true;
                    }
                }
                StepStatus::Skipped => unreachable!("dispatched steps are never skipped"),
            }

            if self.monitor_enabled {
                if let Some(monitor) = &self.monitor {
                    monitor.log_stats(&format!("After step '{}'", step.name));
                }
            }

            context.record(StepOutcome {
                step_name: step.name.clone(),
                invocation,
                status: execution.status,
                exit_code: execution.exit_code,
                attempts: execution.attempts,
                duration,
                allow_failure: step.allow_failure,
                timed_out: execution.timed_out,
                spawn_error: execution.spawn_error,
            });
        }

        if self.monitor_enabled {
            if let Some(monitor) = &self.monitor {
                monitor.log_final_stats();
            }
        }

        Ok(context)
    }

    /// One step, including its retry loop. Spawn failures and timeouts count
    /// as failed attempts so a flaky environment still gets its retries.
    async fn execute_step(
        spawner: &dyn Spawner,
        step: &CommandStep,
        invocation: &Invocation,
    ) -> Result<StepExecution> {
        let max_attempts = step.retry_attempts.saturating_add(1);
        let mut last_exit: Option<i32> = None;
        let mut last_timed_out = false;
        let mut last_spawn_error: Option<String> = None;

        for attempt in 1..=max_attempts {
            if attempt > 1 {
                tracing::info!(
                    "🔁 Retrying step: {} (attempt {}/{})",
                    step.name,
                    attempt,
                    max_attempts
                );
                tokio::time::sleep(step.retry_delay).await;
            }

            match spawner.run(invocation, step.timeout).await {
                Ok(SpawnResult::Exited { code: Some(0) }) => {
                    return Ok(StepExecution {
                        status: StepStatus::Succeeded,
                        exit_code: Some(0),
                        attempts: attempt,
                        timed_out: false,
                        spawn_error: None,
                    });
                }
                Ok(SpawnResult::Exited { code }) => {
                    last_exit = code;
                    last_timed_out = false;
                    last_spawn_error = None;
                    match code {
                        Some(code) => tracing::warn!(
                            "⚠️ '{}' exited with code {} in step '{}'",
                            step.program,
                            code,
                            step.name
                        ),
                        None => tracing::warn!(
                            "⚠️ '{}' was terminated by a signal in step '{}'",
                            step.program,
                            step.name
                        ),
                    }
                }
                Ok(SpawnResult::TimedOut) => {
                    last_exit = None;
                    last_timed_out = true;
                    last_spawn_error = None;
                    tracing::warn!(
                        "⏱️ Step timed out: {} (limit: {:?})",
                        step.name,
                        step.timeout
                    );
                }
                Err(RunnerError::IoError(source)) => {
                    last_exit = None;
                    last_timed_out = false;
                    let message = source.to_string();
                    tracing::warn!(
                        "⚠️ Failed to spawn '{}' for step '{}': {}",
                        step.program,
                        step.name,
                        message
                    );
                    last_spawn_error = Some(message);
                }
                Err(e) => return Err(e),
            }
        }

        Ok(StepExecution {
            status: StepStatus::Failed,
            exit_code: last_exit,
            attempts: max_attempts,
            timed_out: last_timed_out,
            spawn_error: last_spawn_error,
        })
    }

    pub fn execution_summary(outcomes: &[StepOutcome]) -> HashMap<String, serde_json::Value> {
        let mut summary = HashMap::new();

        let executed: Vec<&StepOutcome> = outcomes
            .iter()
            .filter(|o| o.status != StepStatus::Skipped)
            .collect();
        let succeeded = executed
            .iter()
            .filter(|o| o.status == StepStatus::Succeeded)
            .count();
        let failed = executed
            .iter()
            .filter(|o| o.status == StepStatus::Failed)
            .count();
        let skipped = outcomes.len() - executed.len();
        let total_duration: std::time::Duration = executed.iter().map(|o| o.duration).sum();

        summary.insert(
            "total_steps".to_string(),
            serde_json::Value::Number(outcomes.len().into()),
        );
        summary.insert(
            "succeeded".to_string(),
            serde_json::Value::Number(succeeded.into()),
        );
        summary.insert(
            "failed".to_string(),
            serde_json::Value::Number(failed.into()),
        );
        summary.insert(
            "skipped".to_string(),
            serde_json::Value::Number(skipped.into()),
        );
        summary.insert(
            "total_duration_ms".to_string(),
            serde_json::Value::Number((total_duration.as_millis() as u64).into()),
        );

        let executed_steps: Vec<serde_json::Value> = executed
            .iter()
            .map(|o| serde_json::Value::String(o.step_name.clone()))
            .collect();
        summary.insert(
            "executed_steps".to_string(),
            serde_json::Value::Array(executed_steps),
        );

        summary
    }
}
