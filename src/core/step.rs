use crate::domain::model::Invocation;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// One step of a pipeline: a single external program invocation with a fixed
/// argument vector. Steps never consume each other's output and no argument
/// is templated on an earlier result.
#[derive(Debug, Clone)]
pub struct CommandStep {
    pub name: String,
    pub program: String,
    pub args: Vec<String>,
    /// Resolved against the pipeline root; `None` means the root itself.
    pub workdir: Option<PathBuf>,
    pub env: HashMap<String, String>,
    pub timeout: Option<Duration>,
    pub retry_attempts: u32,
    pub retry_delay: Duration,
    /// Advisory steps report their failure but do not halt the pipeline.
    pub allow_failure: bool,
}

impl CommandStep {
    pub fn new(name: impl Into<String>, program: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            args: Vec::new(),
            workdir: None,
            env: HashMap::new(),
            timeout: None,
            retry_attempts: 0,
            retry_delay: Duration::from_secs(1),
            allow_failure: false,
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_workdir(mut self, workdir: impl Into<PathBuf>) -> Self {
        self.workdir = Some(workdir.into());
        self
    }

    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env = env;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_retries(mut self, attempts: u32, delay: Duration) -> Self {
        self.retry_attempts = attempts;
        self.retry_delay = delay;
        self
    }

    pub fn with_allow_failure(mut self, allow: bool) -> Self {
        self.allow_failure = allow;
        self
    }

    /// Resolves the step against the pipeline root into a spawnable
    /// invocation. A relative workdir is joined onto the root; an absolute
    /// workdir is taken as-is.
    pub fn resolve(&self, root: &Path) -> Invocation {
        let cwd = match &self.workdir {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => root.join(dir),
            None => root.to_path_buf(),
        };

        Invocation {
            program: self.program.clone(),
            args: self.args.clone(),
            cwd,
            env: self.env.clone(),
        }
    }

    pub fn display_command(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }
}
