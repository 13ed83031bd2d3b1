use crate::core::step::CommandStep;
use crate::core::sequence::FailureMode;
use crate::utils::error::{Result, RunnerError};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub pipeline: PipelineInfo,
    pub steps: Vec<StepConfig>,
    pub error_handling: Option<ErrorHandlingConfig>,
    pub monitoring: Option<MonitoringConfig>,
    pub report: Option<ReportConfig>,
    pub environment: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineInfo {
    pub name: String,
    pub description: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepConfig {
    pub name: String,
    pub program: String,
    pub args: Option<Vec<String>>,
    pub workdir: Option<String>,
    pub timeout_seconds: Option<u64>,
    pub retry_attempts: Option<u32>,
    pub retry_delay_seconds: Option<u64>,
    pub allow_failure: Option<bool>,
    pub env: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorHandlingConfig {
    /// "halt" (default) or "continue"
    pub on_failure: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    pub enabled: Option<bool>,
    pub output_path: Option<String>,
}

impl PipelineConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(RunnerError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| RunnerError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR_NAME}` with the environment value; unknown variables
    /// are left intact.
    fn substitute_env_vars(content: &str) -> String {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").expect("static pattern");

        re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .to_string()
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_non_empty_string("pipeline.name", &self.pipeline.name)?;

        if self.steps.is_empty() {
            return Err(RunnerError::ConfigValidationError {
                field: "steps".to_string(),
                message: "A pipeline must define at least one step".to_string(),
            });
        }

        let names: Vec<String> = self.steps.iter().map(|s| s.name.clone()).collect();
        validation::validate_unique_names("steps", &names)?;

        for step in &self.steps {
            validation::validate_non_empty_string("steps.name", &step.name)?;
            validation::validate_program_name("steps.program", &step.program)?;

            if let Some(workdir) = &step.workdir {
                validation::validate_path("steps.workdir", workdir)?;
            }
            if let Some(timeout) = step.timeout_seconds {
                validation::validate_positive_number("steps.timeout_seconds", timeout, 1)?;
            }
            if let Some(delay) = step.retry_delay_seconds {
                validation::validate_positive_number("steps.retry_delay_seconds", delay, 1)?;
            }
        }

        if let Some(handling) = &self.error_handling {
            if let Some(mode) = &handling.on_failure {
                if mode != "halt" && mode != "continue" {
                    return Err(RunnerError::InvalidConfigValueError {
                        field: "error_handling.on_failure".to_string(),
                        value: mode.clone(),
                        reason: "Valid modes: halt, continue".to_string(),
                    });
                }
            }
        }

        if let Some(report) = &self.report {
            if let Some(path) = &report.output_path {
                validation::validate_path("report.output_path", path)?;
            }
        }

        Ok(())
    }

    pub fn failure_mode(&self) -> FailureMode {
        match self
            .error_handling
            .as_ref()
            .and_then(|h| h.on_failure.as_deref())
        {
            Some("continue") => FailureMode::Continue,
            _ => FailureMode::Halt,
        }
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }

    pub fn report_enabled(&self) -> bool {
        self.report
            .as_ref()
            .and_then(|r| r.enabled)
            .unwrap_or(false)
    }

    pub fn report_path(&self) -> &str {
        self.report
            .as_ref()
            .and_then(|r| r.output_path.as_deref())
            .unwrap_or("./reports")
    }

    /// Lowers the config into executable steps. The pipeline-wide
    /// `[environment]` table applies to every step; a step's own `env`
    /// entries win on conflict.
    pub fn to_steps(&self) -> Vec<CommandStep> {
        self.steps
            .iter()
            .map(|s| {
                let mut env = self.environment.clone().unwrap_or_default();
                if let Some(step_env) = &s.env {
                    env.extend(step_env.clone());
                }

                let mut step = CommandStep::new(&s.name, &s.program)
                    .with_args(s.args.clone().unwrap_or_default())
                    .with_env(env)
                    .with_allow_failure(s.allow_failure.unwrap_or(false));

                if let Some(workdir) = &s.workdir {
                    step = step.with_workdir(workdir);
                }
                if let Some(timeout) = s.timeout_seconds {
                    step = step.with_timeout(Duration::from_secs(timeout));
                }
                if let Some(attempts) = s.retry_attempts {
                    let delay = Duration::from_secs(s.retry_delay_seconds.unwrap_or(1));
                    step = step.with_retries(attempts, delay);
                }

                step
            })
            .collect()
    }

    /// The canonical Python-project workflow: editable install of the
    /// project and its nested test plugin, wheel build, style/lint/packaging
    /// checks, coverage test run, distribution checks, and the two sphinx
    /// passes (HTML and linkcheck).
    pub fn python_project_default(package: &str, plugin_dir: Option<&str>) -> Self {
        let mut steps = vec![StepConfig {
            name: "install".to_string(),
            program: "pip".to_string(),
            args: Some(vec!["install".into(), "-e".into(), ".".into()]),
            workdir: None,
            timeout_seconds: None,
            retry_attempts: None,
            retry_delay_seconds: None,
            allow_failure: None,
            env: None,
        }];

        if let Some(plugin_dir) = plugin_dir {
            steps.push(StepConfig {
                name: "install-test-plugin".to_string(),
                program: "pip".to_string(),
                args: Some(vec!["install".into(), "-e".into(), ".".into()]),
                workdir: Some(plugin_dir.to_string()),
                timeout_seconds: None,
                retry_attempts: None,
                retry_delay_seconds: None,
                allow_failure: None,
                env: None,
            });
        }

        let fixed: Vec<(&str, &str, Vec<String>)> = vec![
            (
                "build-wheel",
                "python",
                vec![
                    "setup.py".into(),
                    "clean".into(),
                    "--all".into(),
                    "bdist_wheel".into(),
                ],
            ),
            ("style-check", "flake8", vec![package.to_string()]),
            (
                "lint",
                "pylint",
                vec!["--rcfile=.pylintrc".into(), package.to_string()],
            ),
            ("packaging-audit", "pyroma", vec![".".into()]),
            (
                "test",
                "pytest",
                vec![
                    format!("--cov={}", package),
                    "--cov-report".into(),
                    "xml".into(),
                    "--cov-report".into(),
                    "html".into(),
                ],
            ),
            (
                "packaging-self-check",
                "python",
                vec!["setup.py".into(), "check".into()],
            ),
            ("dist-check", "twine", vec!["check".into(), "dist/*".into()]),
            (
                "docs-html",
                "sphinx-build",
                vec![
                    "-b".into(),
                    "html".into(),
                    "-j".into(),
                    "auto".into(),
                    "-E".into(),
                    "-a".into(),
                    "doc".into(),
                    "doc/_build/html".into(),
                ],
            ),
            (
                "docs-linkcheck",
                "sphinx-build",
                vec![
                    "-b".into(),
                    "linkcheck".into(),
                    "doc".into(),
                    "doc/_build/linkcheck".into(),
                ],
            ),
        ];

        steps.extend(fixed.into_iter().map(|(name, program, args)| StepConfig {
            name: name.to_string(),
            program: program.to_string(),
            args: Some(args),
            workdir: None,
            timeout_seconds: None,
            retry_attempts: None,
            retry_delay_seconds: None,
            allow_failure: None,
            env: None,
        }));

        Self {
            pipeline: PipelineInfo {
                name: "python-dev".to_string(),
                description: "Install, build, check, test and document a Python project"
                    .to_string(),
                version: "1.0".to_string(),
            },
            steps,
            error_handling: None,
            monitoring: None,
            report: None,
            environment: None,
        }
    }
}

/// Keeps only the named steps, preserving pipeline order regardless of the
/// order the names were given in.
pub fn select_steps(steps: Vec<CommandStep>, only: &[String]) -> Result<Vec<CommandStep>> {
    for name in only {
        if !steps.iter().any(|s| &s.name == name) {
            return Err(RunnerError::UnknownStep { name: name.clone() });
        }
    }

    Ok(steps
        .into_iter()
        .filter(|s| only.iter().any(|n| n == &s.name))
        .collect())
}

impl Validate for PipelineConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const BASIC_CONFIG: &str = r#"
[pipeline]
name = "python-dev"
description = "Developer workflow"
version = "1.0"

[[steps]]
name = "install"
program = "pip"
args = ["install", "-e", "."]

[[steps]]
name = "install-test-plugin"
program = "pip"
args = ["install", "-e", "."]
workdir = "test-plugin"

[[steps]]
name = "style-check"
program = "flake8"
args = ["unidown"]
allow_failure = true
"#;

    #[test]
    fn test_parse_basic_pipeline() {
        let config = PipelineConfig::from_toml_str(BASIC_CONFIG).unwrap();

        assert_eq!(config.pipeline.name, "python-dev");
        assert_eq!(config.steps.len(), 3);
        assert_eq!(config.steps[1].workdir.as_deref(), Some("test-plugin"));
        assert_eq!(config.failure_mode(), FailureMode::Halt);
        assert!(config.validate().is_ok());

        let steps = config.to_steps();
        assert_eq!(steps[0].display_command(), "pip install -e .");
        assert!(steps[2].allow_failure);
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("DEVPIPE_TEST_PKG", "unidown");

        let toml_content = r#"
[pipeline]
name = "subst"
description = "test"
version = "1.0"

[[steps]]
name = "style-check"
program = "flake8"
args = ["${DEVPIPE_TEST_PKG}"]
"#;

        let config = PipelineConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.steps[0].args.as_ref().unwrap()[0], "unidown");

        std::env::remove_var("DEVPIPE_TEST_PKG");
    }

    #[test]
    fn test_unknown_env_var_left_intact() {
        let toml_content = r#"
[pipeline]
name = "subst"
description = "test"
version = "1.0"

[[steps]]
name = "echo"
program = "echo"
args = ["${DEVPIPE_DOES_NOT_EXIST}"]
"#;

        let config = PipelineConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(
            config.steps[0].args.as_ref().unwrap()[0],
            "${DEVPIPE_DOES_NOT_EXIST}"
        );
    }

    #[test]
    fn test_pipeline_environment_merges_into_every_step() {
        let toml_content = r#"
[pipeline]
name = "env-merge"
description = "test"
version = "1.0"

[environment]
PIP_DISABLE_PIP_VERSION_CHECK = "1"
COVERAGE_FILE = ".coverage"

[[steps]]
name = "install"
program = "pip"

[[steps]]
name = "test"
program = "pytest"

[steps.env]
COVERAGE_FILE = ".coverage.pytest"
"#;

        let config = PipelineConfig::from_toml_str(toml_content).unwrap();
        let steps = config.to_steps();

        // pipeline-wide entries reach steps with no env of their own
        assert_eq!(
            steps[0].env.get("PIP_DISABLE_PIP_VERSION_CHECK"),
            Some(&"1".to_string())
        );
        assert_eq!(steps[0].env.get("COVERAGE_FILE"), Some(&".coverage".to_string()));

        // a step's own entry wins on conflict, the rest still propagate
        assert_eq!(
            steps[1].env.get("COVERAGE_FILE"),
            Some(&".coverage.pytest".to_string())
        );
        assert_eq!(
            steps[1].env.get("PIP_DISABLE_PIP_VERSION_CHECK"),
            Some(&"1".to_string())
        );
    }

    #[test]
    fn test_zero_retry_delay_rejected() {
        let toml_content = r#"
[pipeline]
name = "bad"
description = "test"
version = "1.0"

[[steps]]
name = "install"
program = "pip"
retry_attempts = 2
retry_delay_seconds = 0
"#;

        let config = PipelineConfig::from_toml_str(toml_content).unwrap();
        assert!(config.validate().is_err());

        // zero retry_attempts stays legal: it just means no retries
        let no_retries = r#"
[pipeline]
name = "ok"
description = "test"
version = "1.0"

[[steps]]
name = "install"
program = "pip"
retry_attempts = 0
"#;
        let config = PipelineConfig::from_toml_str(no_retries).unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_on_failure_mode_rejected() {
        let toml_content = r#"
[pipeline]
name = "bad"
description = "test"
version = "1.0"

[[steps]]
name = "install"
program = "pip"

[error_handling]
on_failure = "retry-forever"
"#;

        let config = PipelineConfig::from_toml_str(toml_content).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_duplicate_step_names_rejected() {
        let toml_content = r#"
[pipeline]
name = "dup"
description = "test"
version = "1.0"

[[steps]]
name = "install"
program = "pip"

[[steps]]
name = "install"
program = "pip"
"#;

        let config = PipelineConfig::from_toml_str(toml_content).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_program_with_whitespace_rejected() {
        let toml_content = r#"
[pipeline]
name = "bad"
description = "test"
version = "1.0"

[[steps]]
name = "install"
program = "pip install"
"#;

        let config = PipelineConfig::from_toml_str(toml_content).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(BASIC_CONFIG.as_bytes()).unwrap();

        let config = PipelineConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.pipeline.name, "python-dev");
    }

    #[test]
    fn test_python_project_default_shape() {
        let config = PipelineConfig::python_project_default("unidown", Some("test-plugin"));
        assert!(config.validate().is_ok());

        let names: Vec<&str> = config.steps.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "install",
                "install-test-plugin",
                "build-wheel",
                "style-check",
                "lint",
                "packaging-audit",
                "test",
                "packaging-self-check",
                "dist-check",
                "docs-html",
                "docs-linkcheck",
            ]
        );

        // the plugin install runs inside the nested directory, then the
        // pipeline returns to the project root for the wheel build
        assert_eq!(config.steps[1].workdir.as_deref(), Some("test-plugin"));
        assert!(config.steps[2].workdir.is_none());

        let without_plugin = PipelineConfig::python_project_default("unidown", None);
        assert_eq!(without_plugin.steps.len(), 10);
        assert_eq!(without_plugin.steps[1].name, "build-wheel");
    }

    #[test]
    fn test_select_steps_preserves_pipeline_order() {
        let config = PipelineConfig::python_project_default("unidown", Some("test-plugin"));
        let steps = config.to_steps();

        let only = vec!["test".to_string(), "style-check".to_string()];
        let selected = select_steps(steps, &only).unwrap();

        // pipeline order, not request order
        assert_eq!(selected.len(), 2);
        assert_eq!(selected[0].name, "style-check");
        assert_eq!(selected[1].name, "test");
    }

    #[test]
    fn test_select_steps_rejects_unknown_name() {
        let config = PipelineConfig::python_project_default("unidown", None);
        let err = select_steps(config.to_steps(), &["deploy".to_string()]).unwrap_err();
        assert!(matches!(err, RunnerError::UnknownStep { .. }));
    }
}
