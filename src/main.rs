pub mod batch;
pub mod config;
pub mod error;
pub mod ffmpeg;
pub mod filescanner;
pub mod fstools;
pub mod naming;
pub mod task;

use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use rustop::opts;
use signal_hook::consts::{SIGINT, SIGTERM};
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

use config::SettingsPatch;
use error::ConfigError;
use ffmpeg::FFmpeg;

fn main() -> ExitCode {
    let (args, _rest) = opts! {
        synopsis "Batch convert video files to mp3 audio.";
        opt config:Option<String>, desc:"Path to a JSON configuration file.";
        opt input:Option<String>, desc:"Source video directory.";
        opt output:Option<String>, desc:"Destination mp3 directory.";
        opt recursive:bool=false, desc:"Recursively search for videos.";
        opt bitrate:Option<String>, desc:"Audio bitrate, e.g. 192k.";
        opt logfile:Option<String>, desc:"Append log output to this file instead of the console.";
        opt no_append_extension:bool=false, desc:"Do not append the source extension to the mp3 filename.";
        opt timeout:Option<u64>, desc:"Give up on a single conversion after this many seconds.";
    }
    .parse_or_exit();

    let cli = SettingsPatch {
        name: None,
        input_directory: args.input.map(PathBuf::from),
        output_directory: args.output.map(PathBuf::from),
        recursive_search: args.recursive.then_some(true),
        bitrate: args.bitrate,
        log_file: args.logfile.map(PathBuf::from),
        append_source_extension: args.no_append_extension.then_some(false),
        tool_timeout_seconds: args.timeout,
    };

    // config file problems are fatal, and the log sink is not up yet
    let config_file = match args.config.as_deref() {
        Some(path) => match config::load(Path::new(path)) {
            Ok(config_file) => Some(config_file),
            Err(err) => {
                eprintln!("{err}");
                return ExitCode::FAILURE;
            },
        },
        None => None,
    };

    let global_settings = config_file
        .as_ref()
        .map(|c| c.global_settings.clone())
        .unwrap_or_default();

    let log_file = cli
        .log_file
        .clone()
        .or_else(|| global_settings.log_file.clone());
    if let Err(err) = init_logging(log_file.as_deref()) {
        eprintln!("could not set up logging: {err}");
        return ExitCode::FAILURE;
    }

    let ffmpeg = FFmpeg::new();
    if !ffmpeg.is_installed() {
        error!("ffmpeg not found on PATH; install it before running");
        return ExitCode::FAILURE;
    }

    let tasks: Vec<SettingsPatch> = match config_file.as_ref().and_then(|c| c.tasks.as_ref()) {
        Some(tasks) => {
            if tasks.is_empty() {
                error!("{}", ConfigError::NoTasks);
                return ExitCode::FAILURE;
            }
            if !cli.is_empty() {
                warn!("command line conversion flags are ignored when the configuration defines tasks");
            }
            tasks.clone()
        },
        None => {
            // single-task mode: the command line is the top settings layer,
            // and an invalid task is fatal rather than skipped
            if let Err(err) = config::resolve(&[&global_settings, &cli]) {
                error!(error = %err, "invalid task settings");
                return ExitCode::FAILURE;
            }
            vec![cli.clone()]
        },
    };

    let stop = Arc::new(AtomicBool::new(false));
    for signal in [SIGINT, SIGTERM] {
        if let Err(err) = signal_hook::flag::register(signal, Arc::clone(&stop)) {
            error!(signal, error = %err, "could not register signal handler");
            return ExitCode::FAILURE;
        }
    }

    batch::run_batch(&tasks, &global_settings, &ffmpeg, &stop);
    ExitCode::SUCCESS
}

/// Configures the process-wide log sink exactly once: an append-mode file
/// when one is configured, the console otherwise. `RUST_LOG` overrides the
/// default `info` filter.
fn init_logging(log_file: Option<&Path>) -> std::io::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match log_file {
        Some(path) => {
            let dir = match path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent,
                _ => Path::new("."),
            };
            fs::create_dir_all(dir)?;
            let file_name = path.file_name().unwrap_or(OsStr::new("vid2mp3.log"));
            let appender = tracing_appender::rolling::never(dir, file_name);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(appender)
                .with_ansi(false)
                .init();
        },
        None => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        },
    }
    Ok(())
}
