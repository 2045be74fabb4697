use std::fs;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use human_repr::HumanCount;
use tracing::{debug, error, info};

use crate::config::TaskSettings;
use crate::ffmpeg::FFmpeg;
use crate::ffmpeg::converter::{ConvertOutcome, ConverterOptions};
use crate::filescanner::FileScanner;
use crate::naming::output_path;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunCounters {
    pub found: u64,
    pub converted: u64,
    pub skipped: u64,
    pub failed: u64,
}

impl RunCounters {
    pub fn absorb(&mut self, other: &RunCounters) {
        self.found += other.found;
        self.converted += other.converted;
        self.skipped += other.skipped;
        self.failed += other.failed;
    }
}

/// Runs one task: discovers candidate files under the input directory and
/// converts each in turn. Per-file failures are counted and never abort the
/// loop; only the stop flag ends it early.
pub struct TaskRunner<'a> {
    settings: &'a TaskSettings,
    ffmpeg: &'a FFmpeg,
    stop: Arc<AtomicBool>,
}

impl<'a> TaskRunner<'a> {
    pub fn new(settings: &'a TaskSettings, ffmpeg: &'a FFmpeg, stop: Arc<AtomicBool>) -> Self {
        TaskRunner {
            settings,
            ffmpeg,
            stop,
        }
    }

    pub fn run(&self) -> RunCounters {
        let settings = self.settings;
        info!(
            input = %settings.input_directory.display(),
            output = %settings.output_directory.display(),
            recursive = settings.recursive_search,
            bitrate = %settings.bitrate,
            append_extension = settings.append_source_extension,
            "starting conversion"
        );

        let mut counters = RunCounters::default();
        let converter = self.ffmpeg.converter(
            ConverterOptions {
                bitrate: settings.bitrate.clone(),
                timeout: settings.tool_timeout,
            },
            Arc::clone(&self.stop),
        );

        let scanner = FileScanner::new(&settings.input_directory, settings.recursive_search);
        for source in scanner {
            if self.stop.load(Ordering::Relaxed) {
                info!("interrupted, stopping before the next file");
                break;
            }

            counters.found += 1;

            let destination = match output_path(
                &source,
                &settings.input_directory,
                &settings.output_directory,
                settings.append_source_extension,
            ) {
                Ok(destination) => destination,
                Err(err) => {
                    counters.failed += 1;
                    error!(source = %source.display(), error = %err, "could not derive output path");
                    continue;
                },
            };

            match converter.convert(&source, &destination) {
                ConvertOutcome::Converted => {
                    counters.converted += 1;
                    let size = fs::metadata(&destination).map(|m| m.len()).unwrap_or(0);
                    info!(
                        source = %source.display(),
                        destination = %destination.display(),
                        size = %size.human_count_bytes(),
                        "converted"
                    );
                },
                ConvertOutcome::Skipped => {
                    counters.skipped += 1;
                    debug!(destination = %destination.display(), "skipping, output already exists");
                },
                ConvertOutcome::Failed(err) => {
                    counters.failed += 1;
                    error!(source = %source.display(), error = %err, "conversion failed");
                },
                ConvertOutcome::Cancelled => {
                    info!(source = %source.display(), "conversion interrupted");
                    break;
                },
            }
        }

        info!(
            found = counters.found,
            converted = counters.converted,
            skipped = counters.skipped,
            failed = counters.failed,
            "task finished"
        );
        counters
    }
}
