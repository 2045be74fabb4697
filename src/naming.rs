use std::path::{Path, PathBuf, StripPrefixError};
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

static RESOLUTION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)_r(720|480|360|240)P$").unwrap());

/// Strips a trailing resolution tag (e.g. `_r720P`) from a base name.
/// Single pass; names without a recognized tag are returned unchanged.
pub fn clean_filename(base_name: &str) -> String {
    let cleaned = RESOLUTION_PATTERN.replace(base_name, "");
    if cleaned != base_name {
        debug!(original = base_name, cleaned = %cleaned, "cleaned filename");
    }
    cleaned.into_owned()
}

/// Derives the destination mp3 path for a source file: the source's directory
/// relative to `source_root` is mirrored under `output_root`, and the filename
/// becomes `{cleaned_stem}_{lowercased_extension}.mp3` (or without the
/// extension part when `append_extension` is false). Deterministic; the
/// existence of a file at the returned path is the sole skip signal.
pub fn output_path(
    source: &Path,
    source_root: &Path,
    output_root: &Path,
    append_extension: bool,
) -> Result<PathBuf, StripPrefixError> {
    let relative_dir = source
        .parent()
        .unwrap_or(Path::new(""))
        .strip_prefix(source_root)?;

    let stem = match source.file_stem() {
        Some(stem) => stem.to_string_lossy(),
        None => source.as_os_str().to_string_lossy(),
    };
    let cleaned = clean_filename(&stem);

    let filename = match source.extension() {
        Some(ext) if append_extension => {
            format!("{}_{}.mp3", cleaned, ext.to_string_lossy().to_lowercase())
        },
        _ => format!("{cleaned}.mp3"),
    };

    Ok(output_root.join(relative_dir).join(filename))
}
