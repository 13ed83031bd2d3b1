use thiserror::Error;

#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value for {field}: '{value}' ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration field: {field}")]
    MissingConfigError { field: String },

    #[error("Failed to spawn '{program}' for step '{step}': {message}")]
    SpawnError {
        step: String,
        program: String,
        message: String,
    },

    #[error("Step '{step}' failed: '{program}' exited with code {code}")]
    StepFailed {
        step: String,
        program: String,
        code: i32,
    },

    #[error("Step '{step}' was terminated by a signal")]
    StepTerminated { step: String },

    #[error("Step '{step}' timed out after {seconds}s")]
    StepTimeout { step: String, seconds: u64 },

    #[error("Unknown step requested: {name}")]
    UnknownStep { name: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Config,
    Execution,
    Io,
}

impl RunnerError {
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            RunnerError::ConfigError { .. }
            | RunnerError::ConfigValidationError { .. }
            | RunnerError::InvalidConfigValueError { .. }
            | RunnerError::MissingConfigError { .. }
            | RunnerError::UnknownStep { .. } => ErrorSeverity::Critical,
            RunnerError::StepTimeout { .. } => ErrorSeverity::Medium,
            RunnerError::StepFailed { .. }
            | RunnerError::StepTerminated { .. }
            | RunnerError::SpawnError { .. } => ErrorSeverity::High,
            RunnerError::IoError(_) | RunnerError::SerializationError(_) => ErrorSeverity::Critical,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            RunnerError::ConfigError { .. }
            | RunnerError::ConfigValidationError { .. }
            | RunnerError::InvalidConfigValueError { .. }
            | RunnerError::MissingConfigError { .. }
            | RunnerError::UnknownStep { .. } => ErrorCategory::Config,
            RunnerError::SpawnError { .. }
            | RunnerError::StepFailed { .. }
            | RunnerError::StepTerminated { .. }
            | RunnerError::StepTimeout { .. } => ErrorCategory::Execution,
            RunnerError::IoError(_) | RunnerError::SerializationError(_) => ErrorCategory::Io,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            RunnerError::ConfigError { .. } | RunnerError::ConfigValidationError { .. } => {
                "Check the pipeline TOML file for syntax errors or missing sections".to_string()
            }
            RunnerError::InvalidConfigValueError { field, .. } => {
                format!("Fix the value of '{}' in the pipeline configuration", field)
            }
            RunnerError::MissingConfigError { field } => {
                format!("Provide '{}' via the config file or command line", field)
            }
            RunnerError::UnknownStep { name } => format!(
                "'{}' is not a step in this pipeline; use --list to see step names",
                name
            ),
            RunnerError::SpawnError { program, .. } => {
                format!("Make sure '{}' is installed and on PATH", program)
            }
            RunnerError::StepFailed { step, .. } => format!(
                "Inspect the output of step '{}' above and fix the underlying tool failure",
                step
            ),
            RunnerError::StepTerminated { step } => {
                format!("Step '{}' was killed externally; re-run the pipeline", step)
            }
            RunnerError::StepTimeout { step, .. } => {
                format!("Increase timeout_seconds for step '{}' or speed up the tool", step)
            }
            RunnerError::IoError(_) => {
                "Check filesystem permissions and available disk space".to_string()
            }
            RunnerError::SerializationError(_) => {
                "The run report could not be encoded; re-run with --verbose for details".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            RunnerError::StepFailed {
                step,
                program,
                code,
            } => format!(
                "Pipeline stopped: step '{}' ({}) exited with code {}",
                step, program, code
            ),
            RunnerError::StepTimeout { step, seconds } => {
                format!("Pipeline stopped: step '{}' ran longer than {}s", step, seconds)
            }
            RunnerError::SpawnError { step, program, .. } => format!(
                "Pipeline stopped: could not start '{}' for step '{}'",
                program, step
            ),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RunnerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_mapping() {
        let failed = RunnerError::StepFailed {
            step: "lint".to_string(),
            program: "pylint".to_string(),
            code: 2,
        };
        assert_eq!(failed.severity(), ErrorSeverity::High);
        assert_eq!(failed.category(), ErrorCategory::Execution);

        let timeout = RunnerError::StepTimeout {
            step: "test".to_string(),
            seconds: 60,
        };
        assert_eq!(timeout.severity(), ErrorSeverity::Medium);

        let missing = RunnerError::MissingConfigError {
            field: "package".to_string(),
        };
        assert_eq!(missing.severity(), ErrorSeverity::Critical);
        assert_eq!(missing.category(), ErrorCategory::Config);
    }

    #[test]
    fn test_user_friendly_message_for_step_failure() {
        let err = RunnerError::StepFailed {
            step: "style-check".to_string(),
            program: "flake8".to_string(),
            code: 1,
        };
        let msg = err.user_friendly_message();
        assert!(msg.contains("style-check"));
        assert!(msg.contains("flake8"));
        assert!(msg.contains('1'));
    }
}
