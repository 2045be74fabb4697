use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Fatal configuration problems; reported before any file processing starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("configuration contains an empty task list")]
    NoTasks,
}

/// Problems with a single task's merged settings. Fatal in single-task mode,
/// skip-and-continue in batch mode.
#[derive(Debug, Error)]
pub enum TaskValidationError {
    #[error("input directory is not set")]
    MissingInputDirectory,

    #[error("output directory is not set")]
    MissingOutputDirectory,

    #[error("input directory {path} does not exist")]
    InputDirectoryNotFound { path: PathBuf },

    #[error("input path {path} is not a directory")]
    InputNotADirectory { path: PathBuf },
}

/// Per-file conversion failures. Never propagate past the task loop.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("ffmpeg exited with status {}{}", display_code(.code), display_stderr(.stderr))]
    Tool { code: Option<i32>, stderr: String },

    #[error("conversion timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("ffmpeg exited successfully but produced no output file")]
    MissingOutput,

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

fn display_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => String::from("<killed by signal>"),
    }
}

fn display_stderr(stderr: &str) -> String {
    if stderr.is_empty() {
        String::new()
    } else {
        format!(": {stderr}")
    }
}
