//! Child process spawning and output capture.
//!
//! The script file itself is the program; no shell sits in between. Exit
//! and end-of-stream on every captured pipe are awaited together, and the
//! output is only handed back once all of them have settled.

use std::os::fd::OwnedFd;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::net::unix::pipe;
use tokio::process::{Child, Command};

use super::descriptor::OutputMode;
use crate::error::ScriptError;

type Stream = Box<dyn AsyncRead + Unpin + Send>;

/// Raw bytes and exit code of a finished child.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedOutput {
    /// `-1` when the process was terminated by a signal.
    pub exit_code: i32,
    pub stdout: Vec<u8>,
    /// Always empty in combined mode.
    pub stderr: Vec<u8>,
}

/// How a child is launched and captured.
#[derive(Debug, Clone)]
pub struct SpawnOptions<'a> {
    pub env: &'a [(String, String)],
    pub inherit_env: bool,
    pub output_mode: OutputMode,
    pub timeout: Option<Duration>,
    pub max_output_bytes: usize,
}

/// Run `program` to completion and capture its output.
pub async fn run(program: &Path, options: SpawnOptions<'_>) -> Result<CapturedOutput, ScriptError> {
    let start = Instant::now();
    let (mut child, stdout, stderr) = spawn(program, &options)?;

    let limit = options.max_output_bytes;
    let settle = async {
        let (status, stdout, stderr) = tokio::join!(
            child.wait(),
            read_stream(stdout, limit, program),
            read_stream(stderr, limit, program),
        );
        Ok::<(ExitStatus, Vec<u8>, Vec<u8>), std::io::Error>((status?, stdout?, stderr?))
    };

    let outcome = match options.timeout {
        Some(timeout) => tokio::time::timeout(timeout, settle).await.ok(),
        None => Some(settle.await),
    };

    let Some(settled) = outcome else {
        if let Err(err) = child.start_kill() {
            tracing::warn!(path = %program.display(), error = %err, "Failed to kill timed out script");
        }
        // Reap so the killed child does not linger as a zombie.
        if let Err(err) = child.wait().await {
            tracing::warn!(path = %program.display(), error = %err, "Failed to reap timed out script");
        }
        return Err(ScriptError::Timeout {
            elapsed_ms: start.elapsed().as_millis() as u64,
        });
    };

    let (status, stdout, stderr) = settled?;
    Ok(CapturedOutput {
        exit_code: status.code().unwrap_or(-1),
        stdout,
        stderr,
    })
}

/// Spawn the child with pipes wired for the requested output mode.
fn spawn(
    program: &Path,
    options: &SpawnOptions<'_>,
) -> Result<(Child, Option<Stream>, Option<Stream>), ScriptError> {
    let spawn_error = |source: std::io::Error| ScriptError::Spawn {
        path: program.to_path_buf(),
        source,
    };

    // The command owns the parent's copies of any pipe write ends; it must
    // be dropped right after spawning or the reader never sees EOF.
    let mut cmd = Command::new(program);
    // No `kill_on_drop`: only the engine timeout above may cut a run short.
    cmd.stdin(Stdio::null());

    if !options.inherit_env {
        cmd.env_clear();
    }
    cmd.envs(options.env.iter().map(|(key, value)| (key, value)));

    match options.output_mode {
        OutputMode::Split => {
            cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
            let mut child = cmd.spawn().map_err(spawn_error)?;
            drop(cmd);

            let stdout = child.stdout.take().map(|s| Box::new(s) as Stream);
            let stderr = child.stderr.take().map(|s| Box::new(s) as Stream);
            Ok((child, stdout, stderr))
        }
        OutputMode::Combined => {
            let (reader, writer) = std::io::pipe()?;
            let stderr_writer = writer.try_clone()?;
            cmd.stdout(writer).stderr(stderr_writer);

            let child = cmd.spawn().map_err(spawn_error)?;
            drop(cmd);

            let receiver = pipe::Receiver::from_owned_fd(OwnedFd::from(reader))?;
            Ok((child, Some(Box::new(receiver) as Stream), None))
        }
    }
}

/// Drain a stream to EOF, keeping at most `limit` bytes.
///
/// Bytes past the limit are read and discarded so the child never blocks
/// on a full pipe.
async fn read_stream(
    handle: Option<Stream>,
    limit: usize,
    program: &Path,
) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    let Some(mut reader) = handle else {
        return Ok(buf);
    };

    let mut chunk = [0u8; 8192];
    let mut discarded = 0usize;
    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        let room = limit.saturating_sub(buf.len());
        let keep = n.min(room);
        buf.extend_from_slice(&chunk[..keep]);
        discarded += n - keep;
    }

    if discarded > 0 {
        tracing::warn!(
            path = %program.display(),
            limit,
            discarded,
            "Script output exceeded capture limit, truncated"
        );
    }
    Ok(buf)
}

/// Split captured bytes into lines, decoding lossily.
pub fn into_lines(bytes: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(bytes)
        .lines()
        .map(str::to_string)
        .collect()
}
