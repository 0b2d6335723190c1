//! Functions run as child processes.
//!
//! The event is written to stdin as JSON, the result is read from stdout as
//! JSON. A non-zero exit status is a raised error; stderr is kept for the log.
//! One process per invocation.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::functions::{FunctionError, LambdaFunction};

pub struct CommandFunction {
    program: String,
    args: Vec<String>,
    cwd: Option<PathBuf>,
    env: BTreeMap<String, String>,
    name: String,
}

impl CommandFunction {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        let program = program.into();
        let name = Path::new(&program)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| program.clone());
        Self {
            program,
            args,
            cwd: None,
            env: BTreeMap::new(),
            name,
        }
    }

    pub fn current_dir(mut self, cwd: Option<PathBuf>) -> Self {
        self.cwd = cwd;
        self
    }

    /// Extra environment variables for the child process.
    pub fn envs(mut self, env: BTreeMap<String, String>) -> Self {
        self.env = env;
        self
    }
}

#[async_trait]
impl LambdaFunction for CommandFunction {
    async fn invoke(&self, payload: Value) -> Result<Value, FunctionError> {
        let input = serde_json::to_vec(&payload)?;

        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .envs(&self.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(cwd) = &self.cwd {
            command.current_dir(cwd);
        }

        tracing::debug!(function = %self.name, program = %self.program, "Spawning function process");
        let mut child = command.spawn().map_err(FunctionError::Process)?;

        let stdin = child.stdin.take();
        let write = async move {
            if let Some(mut stdin) = stdin {
                stdin.write_all(&input).await?;
                stdin.shutdown().await?;
            }
            Ok::<_, std::io::Error>(())
        };
        let (written, output) = tokio::join!(write, child.wait_with_output());
        let output = output.map_err(FunctionError::Process)?;

        if let Err(e) = written {
            // The child may exit without reading its input.
            tracing::debug!(function = %self.name, error = %e, "Function did not consume stdin");
        }

        if !output.status.success() {
            return Err(FunctionError::Exit {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(serde_json::from_slice(&output.stdout)?)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
