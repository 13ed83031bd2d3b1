use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// One fully resolved external program invocation: what gets spawned, with
/// which argument vector, in which working directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub env: HashMap<String, String>,
}

impl Invocation {
    /// Single-line rendering for logs and the dry-run trace.
    pub fn display_command(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }
}

/// What the spawner observed for one attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpawnResult {
    Exited { code: Option<i32> },
    TimedOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Succeeded,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepOutcome {
    pub step_name: String,
    pub invocation: Invocation,
    pub status: StepStatus,
    pub exit_code: Option<i32>,
    pub attempts: u32,
    pub duration: Duration,
    pub allow_failure: bool,
    /// True when the last attempt was killed for exceeding its timeout.
    pub timed_out: bool,
    /// The OS error when the program could not be started at all, such as a
    /// tool missing from PATH.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spawn_error: Option<String>,
}

impl StepOutcome {
    pub fn skipped(step_name: String, invocation: Invocation, allow_failure: bool) -> Self {
        Self {
            step_name,
            invocation,
            status: StepStatus::Skipped,
            exit_code: None,
            attempts: 0,
            duration: Duration::ZERO,
            allow_failure,
            timed_out: false,
            spawn_error: None,
        }
    }

    /// A failed advisory step does not fail the run.
    pub fn blocks_pipeline(&self) -> bool {
        self.status == StepStatus::Failed && !self.allow_failure
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub pipeline_name: String,
    pub execution_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub success: bool,
    pub outcomes: Vec<StepOutcome>,
}

impl RunReport {
    pub fn first_failure(&self) -> Option<&StepOutcome> {
        self.outcomes.iter().find(|o| o.blocks_pipeline())
    }

    pub fn executed_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.status != StepStatus::Skipped)
            .count()
    }
}
