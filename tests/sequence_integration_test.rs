use devpipe::{CommandStep, StepSequence, StepStatus, TokioSpawner};
use std::sync::Arc;
use tempfile::TempDir;

fn sequence(root: std::path::PathBuf) -> StepSequence {
    StepSequence::new(
        "integration-test".to_string(),
        root,
        Arc::new(TokioSpawner::quiet()),
    )
}

#[tokio::test]
async fn test_real_processes_run_in_order_and_in_their_directories() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().to_path_buf();
    std::fs::create_dir(root.join("test-plugin")).unwrap();

    // mirrors the canonical workflow shape: a step at the root, one inside
    // the nested plugin directory, then back at the root
    let mut seq = sequence(root.clone());
    seq.add_step(CommandStep::new("first", "sh").with_args(["-c", "echo first >> trace.log"]));
    seq.add_step(
        CommandStep::new("nested", "sh")
            .with_args(["-c", "pwd >> ../trace.log"])
            .with_workdir("test-plugin"),
    );
    seq.add_step(CommandStep::new("last", "sh").with_args(["-c", "echo last >> trace.log"]));

    let context = seq.execute_all().await.unwrap();

    assert!(context.success());
    assert!(context
        .outcomes
        .iter()
        .all(|o| o.status == StepStatus::Succeeded));

    let log = std::fs::read_to_string(root.join("trace.log")).unwrap();
    let lines: Vec<&str> = log.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], "first");
    assert!(lines[1].ends_with("test-plugin"));
    assert_eq!(lines[2], "last");

    // the recorded trace shows the same working-directory sequence
    assert_eq!(context.trace[0].cwd, root);
    assert_eq!(context.trace[1].cwd, root.join("test-plugin"));
    assert_eq!(context.trace[2].cwd, root);
}

#[tokio::test]
async fn test_exit_codes_are_captured_per_step() {
    let temp_dir = TempDir::new().unwrap();

    let mut seq = sequence(temp_dir.path().to_path_buf());
    seq.add_step(CommandStep::new("ok", "true"));
    seq.add_step(CommandStep::new("specific-code", "sh").with_args(["-c", "exit 7"]));

    let context = seq.execute_all().await.unwrap();

    assert_eq!(context.outcomes[0].exit_code, Some(0));
    assert_eq!(context.outcomes[1].exit_code, Some(7));
    assert_eq!(context.outcomes[1].status, StepStatus::Failed);
}

#[tokio::test]
async fn test_step_environment_reaches_the_child() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().to_path_buf();

    let mut env = std::collections::HashMap::new();
    env.insert("DEVPIPE_MARKER".to_string(), "plugged-in".to_string());

    let mut seq = sequence(root.clone());
    seq.add_step(
        CommandStep::new("env-probe", "sh")
            .with_args(["-c", "echo $DEVPIPE_MARKER > marker.txt"])
            .with_env(env),
    );

    let context = seq.execute_all().await.unwrap();
    assert!(context.success());

    let marker = std::fs::read_to_string(root.join("marker.txt")).unwrap();
    assert_eq!(marker.trim(), "plugged-in");
}

#[tokio::test]
async fn test_timeout_fails_a_slow_step() {
    let temp_dir = TempDir::new().unwrap();

    let mut seq = sequence(temp_dir.path().to_path_buf());
    seq.add_step(
        CommandStep::new("slow", "sleep")
            .with_args(["30"])
            .with_timeout(std::time::Duration::from_millis(100)),
    );

    let context = seq.execute_all().await.unwrap();

    assert!(!context.success());
    assert_eq!(context.outcomes[0].status, StepStatus::Failed);
    assert_eq!(context.outcomes[0].exit_code, None);
    assert!(context.outcomes[0].timed_out);
}
