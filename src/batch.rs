use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{info, warn};

use crate::config::{self, SettingsPatch};
use crate::ffmpeg::FFmpeg;
use crate::task::{RunCounters, TaskRunner};

#[derive(Debug, Default)]
pub struct BatchSummary {
    pub tasks_run: usize,
    pub tasks_skipped: usize,
    pub totals: RunCounters,
    pub cancelled: bool,
}

/// Runs the tasks in declared order, one at a time. A task whose merged
/// settings do not validate is skipped; the batch always proceeds to the next
/// task. The stop flag ends the batch between tasks.
pub fn run_batch(
    tasks: &[SettingsPatch],
    global_settings: &SettingsPatch,
    ffmpeg: &FFmpeg,
    stop: &Arc<AtomicBool>,
) -> BatchSummary {
    let mut summary = BatchSummary::default();

    for (index, task) in tasks.iter().enumerate() {
        if stop.load(Ordering::Relaxed) {
            summary.cancelled = true;
            break;
        }

        let label = task
            .name
            .clone()
            .unwrap_or_else(|| format!("task {}", index + 1));

        match config::resolve(&[global_settings, task]) {
            Err(err) => {
                warn!(task = %label, error = %err, "skipping invalid task");
                summary.tasks_skipped += 1;
            },
            Ok(settings) => {
                info!(task = %label, "starting task");
                let counters = TaskRunner::new(&settings, ffmpeg, Arc::clone(stop)).run();
                summary.totals.absorb(&counters);
                summary.tasks_run += 1;
            },
        }
    }

    if stop.load(Ordering::Relaxed) {
        summary.cancelled = true;
        info!("batch interrupted, remaining tasks not started");
    }

    info!(
        tasks_run = summary.tasks_run,
        tasks_skipped = summary.tasks_skipped,
        found = summary.totals.found,
        converted = summary.totals.converted,
        skipped = summary.totals.skipped,
        failed = summary.totals.failed,
        "batch finished"
    );
    summary
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;
    use std::path::{Path, PathBuf};

    fn fake_tool(dir: &Path, name: &str, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join(name);
        let script = format!("#!/bin/sh\nfor last; do :; done\n{body}\n");
        fs::write(&path, script).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn task_patch(input: &Path, output: &Path) -> SettingsPatch {
        SettingsPatch {
            input_directory: Some(input.to_path_buf()),
            output_directory: Some(output.to_path_buf()),
            ..SettingsPatch::default()
        }
    }

    fn stop_flag() -> Arc<AtomicBool> {
        Arc::new(AtomicBool::new(false))
    }

    #[test]
    fn test_invalid_task_is_skipped_and_the_batch_continues() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in");
        let output = dir.path().join("out");
        fs::create_dir_all(&input).unwrap();
        fs::write(input.join("clip.mp4"), b"video").unwrap();

        let tool = fake_tool(dir.path(), "ok.sh", "echo audio > \"$last\"");
        let ffmpeg = FFmpeg::with_program(&tool);

        let tasks = vec![
            task_patch(&dir.path().join("does-not-exist"), &output),
            task_patch(&input, &output),
        ];
        let summary = run_batch(&tasks, &SettingsPatch::default(), &ffmpeg, &stop_flag());

        assert_eq!(summary.tasks_skipped, 1);
        assert_eq!(summary.tasks_run, 1);
        assert_eq!(summary.totals.converted, 1);
        assert!(!summary.cancelled);
        assert!(output.join("clip_mp4.mp3").exists());
    }

    #[test]
    fn test_global_settings_apply_to_every_task() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in");
        let output = dir.path().join("out");
        fs::create_dir_all(input.join("nested")).unwrap();
        fs::write(input.join("nested/clip.mp4"), b"video").unwrap();

        let tool = fake_tool(dir.path(), "ok.sh", "echo audio > \"$last\"");
        let ffmpeg = FFmpeg::with_program(&tool);

        let global = SettingsPatch {
            recursive_search: Some(true),
            ..SettingsPatch::default()
        };
        let tasks = vec![task_patch(&input, &output)];
        let summary = run_batch(&tasks, &global, &ffmpeg, &stop_flag());

        assert_eq!(summary.totals.converted, 1);
        assert!(output.join("nested/clip_mp4.mp3").exists());
    }

    #[test]
    fn test_tasks_run_in_declared_order() {
        let dir = tempfile::tempdir().unwrap();
        let input_a = dir.path().join("a");
        let input_b = dir.path().join("b");
        let output = dir.path().join("out");
        fs::create_dir_all(&input_a).unwrap();
        fs::create_dir_all(&input_b).unwrap();
        fs::write(input_a.join("first.mp4"), b"video").unwrap();
        fs::write(input_b.join("second.mp4"), b"video").unwrap();

        // appends each converted destination to a ledger as it runs
        let ledger = dir.path().join("ledger");
        let tool = fake_tool(
            dir.path(),
            "ok.sh",
            &format!("echo audio > \"$last\"\necho \"$last\" >> {}", ledger.display()),
        );
        let ffmpeg = FFmpeg::with_program(&tool);

        let tasks = vec![task_patch(&input_a, &output), task_patch(&input_b, &output)];
        let summary = run_batch(&tasks, &SettingsPatch::default(), &ffmpeg, &stop_flag());

        assert_eq!(summary.tasks_run, 2);
        let order = fs::read_to_string(&ledger).unwrap();
        let lines: Vec<&str> = order.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("first_mp4.mp3"));
        assert!(lines[1].ends_with("second_mp4.mp3"));
    }

    #[test]
    fn test_stop_flag_prevents_further_tasks() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in");
        let output = dir.path().join("out");
        fs::create_dir_all(&input).unwrap();
        fs::write(input.join("clip.mp4"), b"video").unwrap();

        let tool = fake_tool(dir.path(), "ok.sh", "echo audio > \"$last\"");
        let ffmpeg = FFmpeg::with_program(&tool);

        let stop = Arc::new(AtomicBool::new(true));
        let tasks = vec![task_patch(&input, &output)];
        let summary = run_batch(&tasks, &SettingsPatch::default(), &ffmpeg, &stop);

        assert!(summary.cancelled);
        assert_eq!(summary.tasks_run, 0);
        assert!(!output.join("clip_mp4.mp3").exists());
    }
}
