//! Script execution engine.
//!
//! [`ExecutionEngine::execute`] turns a descriptor and caller-supplied
//! parameters into an environment, optionally serializes on the script's
//! lock, runs the script, and returns its captured output.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::descriptor::ScriptDescriptor;
use super::subprocess::{self, SpawnOptions};
use crate::error::ScriptError;

/// Default per-stream capture cap (10 MiB).
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 10 * 1024 * 1024;

/// Engine-wide execution settings.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Kill the script once this much wall-clock time has passed.
    /// `None` lets it run until it exits on its own.
    pub timeout: Option<Duration>,
    /// Start children with the server's environment instead of an empty one.
    /// Declared parameters are layered on top either way.
    pub inherit_env: bool,
    /// Bytes kept per captured stream; the rest is drained and dropped.
    pub max_output_bytes: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            timeout: None,
            inherit_env: false,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
        }
    }
}

/// Outcome of one script run. A non-zero `exit_code` is still a result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub exit_code: i32,
    pub stdout: Vec<String>,
    /// Empty when the script's output mode is combined.
    pub stderr: Vec<String>,
    pub duration_ms: u64,
    /// Taken right before spawning, after any lock was acquired.
    pub started_at: DateTime<Utc>,
    /// Taken once the process exited and every stream hit EOF.
    pub finished_at: DateTime<Utc>,
}

/// Runs scripts described by [`ScriptDescriptor`]s.
#[derive(Debug, Clone, Default)]
pub struct ExecutionEngine {
    config: EngineConfig,
}

impl ExecutionEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run `descriptor` with `params`.
    ///
    /// When the script needs a lock, concurrent calls for the same script
    /// queue on it and run one at a time. Fails with
    /// [`ScriptError::Spawn`] if the process could not be created.
    ///
    /// The run lives on its own task: dropping the returned future stops
    /// the wait, not the script, which still finishes and releases its lock.
    pub async fn execute(
        &self,
        descriptor: &ScriptDescriptor,
        params: &HashMap<String, String>,
    ) -> Result<ExecutionResult, ScriptError> {
        tracing::info!(
            script = %descriptor.name,
            filename = %descriptor.filename.display(),
            params = ?descriptor.redact_params(params),
            "Executing script"
        );

        let engine = self.clone();
        let descriptor = descriptor.clone();
        let env = descriptor.build_env(params);

        tokio::spawn(async move { engine.run_to_completion(&descriptor, &env).await })
            .await
            .map_err(|err| ScriptError::Io(std::io::Error::other(err)))?
    }

    async fn run_to_completion(
        &self,
        descriptor: &ScriptDescriptor,
        env: &[(String, String)],
    ) -> Result<ExecutionResult, ScriptError> {
        if descriptor.needs_lock {
            let _guard = descriptor.execution_lock().lock().await;
            self.run(descriptor, env).await
        } else {
            self.run(descriptor, env).await
        }
    }

    async fn run(
        &self,
        descriptor: &ScriptDescriptor,
        env: &[(String, String)],
    ) -> Result<ExecutionResult, ScriptError> {
        let options = SpawnOptions {
            env,
            inherit_env: self.config.inherit_env,
            output_mode: descriptor.output_mode,
            timeout: self.config.timeout,
            max_output_bytes: self.config.max_output_bytes,
        };

        let started_at = Utc::now();
        let start = Instant::now();

        let output = match subprocess::run(&descriptor.filename, options).await {
            Ok(output) => output,
            Err(err) => {
                tracing::error!(script = %descriptor.name, error = %err, "Script execution failed");
                return Err(err);
            }
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        tracing::info!(
            script = %descriptor.name,
            exit_code = output.exit_code,
            duration_ms,
            "Script finished"
        );

        Ok(ExecutionResult {
            exit_code: output.exit_code,
            stdout: subprocess::into_lines(&output.stdout),
            stderr: subprocess::into_lines(&output.stderr),
            duration_ms,
            started_at,
            finished_at: Utc::now(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
