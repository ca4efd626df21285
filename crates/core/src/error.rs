use std::path::PathBuf;

/// Per-file failure while turning a script into a descriptor.
///
/// All of these are soft: the registry logs them and keeps scanning.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("{} is not executable", path.display())]
    NotExecutable { path: PathBuf },

    #[error("{} opens a jojo block that is never closed", path.display())]
    UnterminatedBlock { path: PathBuf },

    #[error("{} does not yield a usable script name", path.display())]
    InvalidName { path: PathBuf },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors surfaced to callers of the registry and execution engine.
///
/// A non-zero exit code is not an error; it is reported inside
/// [`ExecutionResult`](crate::scripting::executor::ExecutionResult).
#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    #[error("Script with name '{0}' not found")]
    NotFound(String),

    #[error("failed to spawn {}: {source}", path.display())]
    Spawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Script timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
