use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::warn;

pub const SUPPORTED_EXTENSIONS: [&str; 7] = ["mp4", "mov", "mkv", "avi", "m4v", "flv", "webm"];

/// Lazily yields the video files under a root directory, one at a time.
/// Entries within a directory are sorted so that repeated runs see the same
/// order. Directories that cannot be read are skipped, not fatal.
pub struct FileScanner {
    recursive: bool,
    pending_dirs: Vec<PathBuf>,
    pending_files: VecDeque<PathBuf>,
}

impl FileScanner {
    pub fn new(root: &Path, recursive: bool) -> Self {
        FileScanner {
            recursive,
            pending_dirs: vec![root.to_path_buf()],
            pending_files: VecDeque::new(),
        }
    }

    fn scan_dir(&mut self, dir: &Path) {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(err) => {
                warn!(directory = %dir.display(), error = %err, "skipping unreadable directory");
                return;
            },
        };

        let mut paths: Vec<PathBuf> = entries.filter_map(|e| e.ok()).map(|e| e.path()).collect();
        paths.sort();

        for path in paths {
            if path.is_file() {
                if has_supported_extension(&path) {
                    self.pending_files.push_back(path);
                }
            } else if self.recursive && path.is_dir() && !path.is_symlink() {
                self.pending_dirs.push(path);
            }
        }
    }
}

impl Iterator for FileScanner {
    type Item = PathBuf;

    fn next(&mut self) -> Option<PathBuf> {
        loop {
            if let Some(file) = self.pending_files.pop_front() {
                return Some(file);
            }
            let dir = self.pending_dirs.pop()?;
            self.scan_dir(&dir);
        }
    }
}

fn has_supported_extension(path: &Path) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => SUPPORTED_EXTENSIONS.contains(&ext.to_lowercase().as_str()),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"").unwrap();
    }

    #[test]
    fn test_yields_only_supported_extensions() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("a.mp4"));
        touch(&dir.path().join("b.MKV"));
        touch(&dir.path().join("c.txt"));
        touch(&dir.path().join("noextension"));

        let found: Vec<PathBuf> = FileScanner::new(dir.path(), false).collect();
        assert_eq!(found, vec![dir.path().join("a.mp4"), dir.path().join("b.MKV")]);
    }

    #[test]
    fn test_non_recursive_ignores_subdirectories() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("top.mp4"));
        touch(&dir.path().join("nested/below.mp4"));

        let found: Vec<PathBuf> = FileScanner::new(dir.path(), false).collect();
        assert_eq!(found, vec![dir.path().join("top.mp4")]);
    }

    #[test]
    fn test_recursive_descends_subdirectories() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("top.mp4"));
        touch(&dir.path().join("nested/below.webm"));
        touch(&dir.path().join("nested/deeper/bottom.avi"));

        let mut found: Vec<PathBuf> = FileScanner::new(dir.path(), true).collect();
        found.sort();
        assert_eq!(
            found,
            vec![
                dir.path().join("nested/below.webm"),
                dir.path().join("nested/deeper/bottom.avi"),
                dir.path().join("top.mp4"),
            ]
        );
    }

    #[test]
    fn test_directory_entries_come_out_sorted() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("zebra.mp4"));
        touch(&dir.path().join("alpha.mp4"));
        touch(&dir.path().join("middle.mp4"));

        let found: Vec<PathBuf> = FileScanner::new(dir.path(), false).collect();
        assert_eq!(
            found,
            vec![
                dir.path().join("alpha.mp4"),
                dir.path().join("middle.mp4"),
                dir.path().join("zebra.mp4"),
            ]
        );
    }

    #[test]
    fn test_missing_root_yields_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let found: Vec<PathBuf> = FileScanner::new(&dir.path().join("absent"), true).collect();
        assert!(found.is_empty());
    }
}
