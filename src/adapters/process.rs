use crate::domain::model::{Invocation, SpawnResult};
use crate::domain::ports::Spawner;
use crate::utils::error::Result;
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Production spawner: real child processes via tokio. Tool stdout/stderr is
/// inherited unmediated, matching what a shell script would show.
#[derive(Debug, Clone, Default)]
pub struct TokioSpawner {
    quiet: bool,
}

impl TokioSpawner {
    pub fn new() -> Self {
        Self { quiet: false }
    }

    /// Discards child output. Used by tests and anything embedding the
    /// runner that handles reporting itself.
    pub fn quiet() -> Self {
        Self { quiet: true }
    }
}

#[async_trait]
impl Spawner for TokioSpawner {
    async fn run(&self, invocation: &Invocation, timeout: Option<Duration>) -> Result<SpawnResult> {
        let mut command = Command::new(&invocation.program);
        command
            .args(&invocation.args)
            .current_dir(&invocation.cwd)
            .envs(&invocation.env)
            .kill_on_drop(true);

        if self.quiet {
            command.stdout(Stdio::null()).stderr(Stdio::null());
        }

        let mut child = command.spawn()?;

        match timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
                Ok(status) => Ok(SpawnResult::Exited {
                    code: status?.code(),
                }),
                Err(_) => {
                    let _ = child.kill().await;
                    Ok(SpawnResult::TimedOut)
                }
            },
            None => {
                let status = child.wait().await?;
                Ok(SpawnResult::Exited {
                    code: status.code(),
                })
            }
        }
    }
}
