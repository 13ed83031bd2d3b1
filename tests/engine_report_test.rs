use devpipe::utils::error::ErrorSeverity;
use devpipe::{
    CommandStep, LocalReportSink, RunReport, RunnerEngine, RunnerError, StepSequence, StepStatus,
    TokioSpawner,
};
use std::sync::Arc;
use tempfile::TempDir;

fn engine_for(steps: Vec<CommandStep>, root: std::path::PathBuf) -> RunnerEngine {
    let mut sequence = StepSequence::new(
        "report-test".to_string(),
        root,
        Arc::new(TokioSpawner::quiet()),
    );
    for step in steps {
        sequence.add_step(step);
    }
    RunnerEngine::new("python-dev", sequence)
}

#[tokio::test]
async fn test_successful_run_produces_a_readable_report_file() {
    let temp_dir = TempDir::new().unwrap();
    let reports_dir = temp_dir.path().join("reports");

    let steps = vec![
        CommandStep::new("install", "true"),
        CommandStep::new("test", "true"),
    ];
    let mut engine = engine_for(steps, temp_dir.path().to_path_buf())
        .with_report_sink(Box::new(LocalReportSink::new(reports_dir.clone())));

    let report = engine.run().await.unwrap();
    assert!(report.success);

    let report_file = reports_dir.join("report-test.json");
    assert!(report_file.exists());

    let content = std::fs::read_to_string(&report_file).unwrap();
    let parsed: RunReport = serde_json::from_str(&content).unwrap();
    assert_eq!(parsed.pipeline_name, "python-dev");
    assert_eq!(parsed.outcomes.len(), 2);
    assert!(parsed
        .outcomes
        .iter()
        .all(|o| o.status == StepStatus::Succeeded));
}

#[tokio::test]
async fn test_failed_run_still_writes_the_report_and_maps_severity() {
    let temp_dir = TempDir::new().unwrap();
    let reports_dir = temp_dir.path().join("reports");

    let steps = vec![
        CommandStep::new("install", "true"),
        CommandStep::new("lint", "sh").with_args(["-c", "exit 2"]),
        CommandStep::new("test", "true"),
    ];
    let mut engine = engine_for(steps, temp_dir.path().to_path_buf())
        .with_report_sink(Box::new(LocalReportSink::new(reports_dir.clone())));

    let err = engine.run().await.unwrap_err();

    match &err {
        RunnerError::StepFailed { step, code, .. } => {
            assert_eq!(step, "lint");
            assert_eq!(*code, 2);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(err.severity(), ErrorSeverity::High);

    let content = std::fs::read_to_string(reports_dir.join("report-test.json")).unwrap();
    let parsed: RunReport = serde_json::from_str(&content).unwrap();
    assert!(!parsed.success);
    assert_eq!(parsed.outcomes[1].status, StepStatus::Failed);
    assert_eq!(parsed.outcomes[2].status, StepStatus::Skipped);
    assert_eq!(parsed.first_failure().unwrap().step_name, "lint");
}

#[tokio::test]
async fn test_missing_tool_reports_spawn_error_not_signal_death() {
    let temp_dir = TempDir::new().unwrap();

    let steps = vec![CommandStep::new("install", "devpipe-no-such-tool")];
    let mut engine = engine_for(steps, temp_dir.path().to_path_buf());

    let err = engine.run().await.unwrap_err();

    match &err {
        RunnerError::SpawnError { step, program, .. } => {
            assert_eq!(step, "install");
            assert_eq!(program, "devpipe-no-such-tool");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    // the user is pointed at the missing tool, not at a phantom signal
    assert!(err
        .recovery_suggestion()
        .contains("'devpipe-no-such-tool' is installed and on PATH"));
}
