use crate::core::sequence::StepSequence;
use crate::domain::model::RunReport;
use crate::domain::ports::ReportSink;
use crate::utils::error::{Result, RunnerError};
use chrono::Utc;

/// Drives one pipeline run end to end: execute the sequence, summarize,
/// persist the report, and fold a failed run into a typed error.
pub struct RunnerEngine {
    pipeline_name: String,
    sequence: StepSequence,
    report_sink: Option<Box<dyn ReportSink>>,
}

impl RunnerEngine {
    pub fn new(pipeline_name: impl Into<String>, sequence: StepSequence) -> Self {
        Self {
            pipeline_name: pipeline_name.into(),
            sequence,
            report_sink: None,
        }
    }

    pub fn with_report_sink(mut self, sink: Box<dyn ReportSink>) -> Self {
        self.report_sink = Some(sink);
        self
    }

    pub async fn run(&mut self) -> Result<RunReport> {
        let started_at = Utc::now();
        tracing::info!("🚀 Starting pipeline: {}", self.pipeline_name);

        let context = self.sequence.execute_all().await?;
        let finished_at = Utc::now();

        let report = RunReport {
            pipeline_name: self.pipeline_name.clone(),
            execution_id: context.execution_id.clone(),
            started_at,
            finished_at,
            success: context.success(),
            outcomes: context.outcomes,
        };

        let summary = StepSequence::execution_summary(&report.outcomes);
        tracing::info!(
            "📊 Pipeline summary: {} steps, {} succeeded, {} failed, {} skipped ({}ms)",
            summary["total_steps"],
            summary["succeeded"],
            summary["failed"],
            summary["skipped"],
            summary["total_duration_ms"]
        );

        if let Some(sink) = &self.report_sink {
            match sink.write_report(&report).await {
                Ok(path) => tracing::info!("📁 Run report written to: {}", path),
                Err(e) => tracing::warn!("⚠️ Failed to write run report: {}", e),
            }
        }

        if report.success {
            Ok(report)
        } else {
            Err(Self::failure_error(&report))
        }
    }

    fn failure_error(report: &RunReport) -> RunnerError {
        match report.first_failure() {
            Some(outcome) if outcome.timed_out => RunnerError::StepTimeout {
                step: outcome.step_name.clone(),
                seconds: outcome.duration.as_secs(),
            },
            Some(outcome) => match (&outcome.spawn_error, outcome.exit_code) {
                (Some(message), _) => RunnerError::SpawnError {
                    step: outcome.step_name.clone(),
                    program: outcome.invocation.program.clone(),
                    message: message.clone(),
                },
                (None, Some(code)) => RunnerError::StepFailed {
                    step: outcome.step_name.clone(),
                    program: outcome.invocation.program.clone(),
                    code,
                },
                (None, None) => RunnerError::StepTerminated {
                    step: outcome.step_name.clone(),
                },
            },
            None => RunnerError::ConfigError {
                message: "pipeline reported failure without a failing step".to_string(),
            },
        }
    }
}
