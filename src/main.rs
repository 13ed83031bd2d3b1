use chrono::Utc;
use clap::Parser;
use devpipe::config::pipeline::{self, ErrorHandlingConfig, PipelineConfig};
use devpipe::utils::{logger, validation::Validate};
use devpipe::{
    CliConfig, CommandStep, LocalReportSink, RunnerEngine, StepSequence, TokioSpawner,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliConfig::parse();

    if args.log_json {
        logger::init_ci_logger();
    } else {
        logger::init_cli_logger(args.verbose);
    }

    tracing::info!("🚀 Starting devpipe");

    if let Err(e) = args.validate() {
        tracing::error!("❌ Argument validation failed: {}", e);
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    let mut config = load_pipeline(&args);

    // command-line overrides
    if args.continue_on_error {
        config.error_handling = Some(ErrorHandlingConfig {
            on_failure: Some("continue".to_string()),
        });
        tracing::info!("🔧 Failure mode overridden to: continue");
    }

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    tracing::info!("✅ Pipeline '{}' loaded and validated", config.pipeline.name);

    let steps = config.to_steps();
    let steps = if args.only.is_empty() {
        steps
    } else {
        match pipeline::select_steps(steps, &args.only) {
            Ok(steps) => steps,
            Err(e) => {
                eprintln!("❌ {}", e.user_friendly_message());
                eprintln!("💡 {}", e.recovery_suggestion());
                std::process::exit(1);
            }
        }
    };

    display_pipeline_summary(&config, &steps, &args);

    if args.list {
        return Ok(());
    }

    let root = PathBuf::from(&args.root);
    let execution_id = format!(
        "{}-{}",
        config.pipeline.name,
        Utc::now().format("%Y%m%d-%H%M%S")
    );

    let monitor_enabled = args.monitor.unwrap_or_else(|| config.monitoring_enabled());
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    let mut sequence = StepSequence::new(execution_id, root, Arc::new(TokioSpawner::new()))
        .with_failure_mode(config.failure_mode())
        .with_monitoring(monitor_enabled);
    for step in steps {
        sequence.add_step(step);
    }

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - no process will be spawned");
        print_invocation_trace(&sequence);
        return Ok(());
    }

    let mut engine = RunnerEngine::new(config.pipeline.name.clone(), sequence);
    if args.report_path.is_some() || config.report_enabled() {
        let report_path = args
            .report_path
            .clone()
            .unwrap_or_else(|| config.report_path().to_string());
        engine = engine.with_report_sink(Box::new(LocalReportSink::new(report_path)));
    }

    match engine.run().await {
        Ok(report) => {
            tracing::info!("✅ Pipeline completed successfully!");
            println!("✅ Pipeline '{}' completed successfully!", report.pipeline_name);
            println!("📋 Steps executed: {}", report.executed_count());
        }
        Err(e) => {
            tracing::error!(
                "❌ Pipeline failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());

            let exit_code = match e.severity() {
                devpipe::utils::error::ErrorSeverity::Low => 0,
                devpipe::utils::error::ErrorSeverity::Medium => 2,
                devpipe::utils::error::ErrorSeverity::High => 1,
                devpipe::utils::error::ErrorSeverity::Critical => 3,
            };

            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}

/// Prefer the config file; fall back to the built-in python-dev pipeline
/// when it does not exist and a package was named.
fn load_pipeline(args: &CliConfig) -> PipelineConfig {
    if Path::new(&args.config).exists() {
        tracing::info!("📁 Loading pipeline from: {}", args.config);
        match PipelineConfig::from_file(&args.config) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("❌ Failed to load config file '{}': {}", args.config, e);
                eprintln!("💡 Make sure the file is valid TOML");
                std::process::exit(1);
            }
        }
    } else if let Some(package) = &args.package {
        tracing::info!(
            "📦 No config file at '{}', using built-in python-dev pipeline for '{}'",
            args.config,
            package
        );
        PipelineConfig::python_project_default(package, args.plugin_dir.as_deref())
    } else {
        eprintln!("❌ No pipeline found: '{}' does not exist", args.config);
        eprintln!("💡 Create a pipeline TOML or pass --package to use the built-in workflow");
        std::process::exit(1);
    }
}

fn display_pipeline_summary(config: &PipelineConfig, steps: &[CommandStep], args: &CliConfig) {
    println!("📋 Pipeline Summary:");
    println!(
        "  Pipeline: {} v{}",
        config.pipeline.name, config.pipeline.version
    );
    println!("  Root: {}", args.root);
    println!("  Failure mode: {:?}", config.failure_mode());
    println!("  Steps: {}", steps.len());

    for (index, step) in steps.iter().enumerate() {
        let workdir = step
            .workdir
            .as_ref()
            .map(|d| format!(" (in {})", d.display()))
            .unwrap_or_default();
        let advisory = if step.allow_failure { " [advisory]" } else { "" };
        println!(
            "    {}. {}: {}{}{}",
            index + 1,
            step.name,
            step.display_command(),
            workdir,
            advisory
        );
    }

    if args.dry_run {
        println!("  🔍 DRY RUN MODE ENABLED");
    }

    println!();
}

fn print_invocation_trace(sequence: &StepSequence) {
    println!("🔍 Invocation trace:");
    for (index, invocation) in sequence.plan().iter().enumerate() {
        println!(
            "  {}. [{}] {}",
            index + 1,
            invocation.cwd.display(),
            invocation.display_command()
        );
    }
    println!();
    println!("✅ Dry run complete. Re-run without --dry-run to execute.");
}
