use std::ffi::OsString;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use tracing::warn;

use crate::error::ConvertError;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug)]
pub enum ConvertOutcome {
    Converted,
    Skipped,
    Failed(ConvertError),
    Cancelled,
}

#[derive(Clone, Debug)]
pub struct ConverterOptions {
    pub bitrate: String,
    pub timeout: Option<Duration>,
}

/// Converts single files by invoking ffmpeg. Writes directly to the final
/// destination path; any non-success leaves nothing behind at that path.
pub struct FFmpegConverter {
    program: PathBuf,
    options: ConverterOptions,
    stop: Arc<AtomicBool>,
}

impl FFmpegConverter {
    pub fn new(program: &Path, options: ConverterOptions, stop: Arc<AtomicBool>) -> Self {
        FFmpegConverter {
            program: program.to_path_buf(),
            options,
            stop,
        }
    }

    /// One conversion attempt. A destination that already exists short-circuits
    /// to `Skipped` without invoking the tool; every `Failed` and `Cancelled`
    /// path removes whatever partial file the tool left at the destination.
    pub fn convert(&self, source: &Path, destination: &Path) -> ConvertOutcome {
        let outcome = match self.run_tool(source, destination) {
            Ok(outcome) => outcome,
            Err(err) => ConvertOutcome::Failed(err),
        };

        match outcome {
            ConvertOutcome::Failed(_) | ConvertOutcome::Cancelled => {
                remove_partial_output(destination);
            },
            ConvertOutcome::Converted | ConvertOutcome::Skipped => (),
        }

        outcome
    }

    fn run_tool(&self, source: &Path, destination: &Path) -> Result<ConvertOutcome, ConvertError> {
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)?;
        }

        if destination.exists() {
            return Ok(ConvertOutcome::Skipped);
        }

        let mut child = Command::new(&self.program)
            .args(self.build_args(source, destination))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()?;

        let deadline = self.options.timeout.map(|timeout| Instant::now() + timeout);
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if self.stop.load(Ordering::Relaxed) {
                kill_and_reap(&mut child);
                return Ok(ConvertOutcome::Cancelled);
            }
            if let Some(deadline) = deadline {
                if Instant::now() >= deadline {
                    kill_and_reap(&mut child);
                    return Err(ConvertError::Timeout(self.options.timeout.unwrap_or_default()));
                }
            }
            thread::sleep(POLL_INTERVAL);
        };

        if status.success() {
            if destination.exists() {
                Ok(ConvertOutcome::Converted)
            } else {
                Err(ConvertError::MissingOutput)
            }
        } else {
            Err(ConvertError::Tool {
                code: status.code(),
                stderr: read_stderr_to_end(&mut child),
            })
        }
    }

    // strip video, audio only, fixed template shared with the tests
    fn build_args(&self, source: &Path, destination: &Path) -> Vec<OsString> {
        vec![
            OsString::from("-i"),
            OsString::from(source),
            OsString::from("-vn"),
            OsString::from("-c:a"),
            OsString::from("libmp3lame"),
            OsString::from("-b:a"),
            OsString::from(&self.options.bitrate),
            OsString::from("-loglevel"),
            OsString::from("error"),
            OsString::from("-y"),
            OsString::from(destination),
        ]
    }
}

fn kill_and_reap(child: &mut Child) {
    if let Err(err) = child.kill() {
        warn!(pid = child.id(), error = %err, "could not kill ffmpeg process");
    }
    let _ = child.wait();
}

fn read_stderr_to_end(child: &mut Child) -> String {
    let mut buf = Vec::new();
    if let Some(mut stream) = child.stderr.take() {
        let _ = stream.read_to_end(&mut buf);
    }
    String::from_utf8_lossy(&buf).trim().to_string()
}

fn remove_partial_output(destination: &Path) {
    if destination.exists() {
        match fs::remove_file(destination) {
            Ok(()) => warn!(path = %destination.display(), "removed incomplete output file"),
            Err(err) => {
                warn!(path = %destination.display(), error = %err, "could not remove incomplete output file");
            },
        }
    }
}
