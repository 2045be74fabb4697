use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{ConfigError, TaskValidationError};
use crate::fstools::{DirEntryCategory, classify_file};

pub const DEFAULT_BITRATE: &str = "192k";

/// One configuration layer. Every field is optional; an absent field means
/// "inherit from the layer below". Unrecognized fields in the JSON document
/// are ignored.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct SettingsPatch {
    pub name: Option<String>,
    pub input_directory: Option<PathBuf>,
    pub output_directory: Option<PathBuf>,
    pub recursive_search: Option<bool>,
    pub bitrate: Option<String>,
    pub log_file: Option<PathBuf>,
    pub append_source_extension: Option<bool>,
    pub tool_timeout_seconds: Option<u64>,
}

impl SettingsPatch {
    /// Returns a copy of `self` with every field that is present in `higher`
    /// replaced by the higher layer's value.
    pub fn overlay(&self, higher: &SettingsPatch) -> SettingsPatch {
        SettingsPatch {
            name: higher.name.clone().or_else(|| self.name.clone()),
            input_directory: higher
                .input_directory
                .clone()
                .or_else(|| self.input_directory.clone()),
            output_directory: higher
                .output_directory
                .clone()
                .or_else(|| self.output_directory.clone()),
            recursive_search: higher.recursive_search.or(self.recursive_search),
            bitrate: higher.bitrate.clone().or_else(|| self.bitrate.clone()),
            log_file: higher.log_file.clone().or_else(|| self.log_file.clone()),
            append_source_extension: higher
                .append_source_extension
                .or(self.append_source_extension),
            tool_timeout_seconds: higher.tool_timeout_seconds.or(self.tool_timeout_seconds),
        }
    }

    /// True when no conversion-relevant field is set. `log_file` does not
    /// count; it is process-wide, not per-task.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.input_directory.is_none()
            && self.output_directory.is_none()
            && self.recursive_search.is_none()
            && self.bitrate.is_none()
            && self.append_source_extension.is_none()
            && self.tool_timeout_seconds.is_none()
    }
}

/// Fully resolved, validated settings for one task.
#[derive(Clone, Debug)]
pub struct TaskSettings {
    pub name: Option<String>,
    pub input_directory: PathBuf,
    pub output_directory: PathBuf,
    pub recursive_search: bool,
    pub bitrate: String,
    pub append_source_extension: bool,
    pub tool_timeout: Option<Duration>,
}

/// Merges configuration layers, lowest precedence first, and validates the
/// result. Built-in defaults sit below the given layers.
pub fn resolve(layers: &[&SettingsPatch]) -> Result<TaskSettings, TaskValidationError> {
    let merged = layers
        .iter()
        .fold(SettingsPatch::default(), |acc, layer| acc.overlay(layer));

    let input_directory = merged
        .input_directory
        .filter(|p| !p.as_os_str().is_empty())
        .ok_or(TaskValidationError::MissingInputDirectory)?;
    let output_directory = merged
        .output_directory
        .filter(|p| !p.as_os_str().is_empty())
        .ok_or(TaskValidationError::MissingOutputDirectory)?;

    match classify_file(&input_directory) {
        DirEntryCategory::Directory => (),
        DirEntryCategory::DoesNotExist => {
            return Err(TaskValidationError::InputDirectoryNotFound {
                path: input_directory,
            });
        },
        _ => {
            return Err(TaskValidationError::InputNotADirectory {
                path: input_directory,
            });
        },
    }

    Ok(TaskSettings {
        name: merged.name,
        input_directory,
        output_directory,
        recursive_search: merged.recursive_search.unwrap_or(false),
        bitrate: merged.bitrate.unwrap_or_else(|| String::from(DEFAULT_BITRATE)),
        append_source_extension: merged.append_source_extension.unwrap_or(true),
        tool_timeout: merged.tool_timeout_seconds.map(Duration::from_secs),
    })
}

/// The on-disk configuration document: shared defaults plus an ordered list
/// of task records.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub global_settings: SettingsPatch,
    pub tasks: Option<Vec<SettingsPatch>>,
}

pub fn load(path: &Path) -> Result<ConfigFile, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
