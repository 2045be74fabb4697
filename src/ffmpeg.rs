use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

pub mod converter;

use converter::{ConverterOptions, FFmpegConverter};

/// Handle on the external ffmpeg binary.
pub struct FFmpeg {
    program: PathBuf,
}

impl FFmpeg {
    pub fn new() -> Self {
        FFmpeg::with_program(Path::new("ffmpeg"))
    }

    /// Points the handle at a specific executable instead of resolving
    /// "ffmpeg" on PATH.
    pub fn with_program(program: &Path) -> Self {
        FFmpeg {
            program: program.to_path_buf(),
        }
    }

    pub fn is_installed(&self) -> bool {
        let cmd = Command::new(&self.program)
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
        match cmd {
            Ok(status) => status.success(),
            Err(_) => false,
        }
    }

    pub fn converter(&self, options: ConverterOptions, stop: Arc<AtomicBool>) -> FFmpegConverter {
        FFmpegConverter::new(&self.program, options, stop)
    }
}

impl Default for FFmpeg {
    fn default() -> Self {
        FFmpeg::new()
    }
}
