//! Tool settings, read from `dictgen.json` or the file given with `--config`.
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::path_de::{from_str_with_path, PathError};

pub const CONFIG_FILE_NAME: &str = "dictgen.json";

static INCLUDE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?m)^\s*#\s*include\s*[<"]([^>"]+)[>"]"#).unwrap());

/// What to do when a source with annotated declarations never includes its
/// generated file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingInclude {
    Ignore,
    #[default]
    Warn,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct Config {
    /// Appended to the input stem to name the generated file.
    pub output_suffix: String,
    pub missing_include: MissingInclude,
    /// Leave an output file untouched when its content would not change.
    pub skip_unchanged: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_suffix: "_codegen.cpp".into(),
            missing_include: MissingInclude::default(),
            skip_unchanged: true,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Invalid {
        path: PathBuf,
        #[source]
        source: PathError,
    },
}

impl Config {
    /// `explicit` must exist; otherwise `./dictgen.json` is used when present.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let fallback = PathBuf::from(CONFIG_FILE_NAME);
                if !fallback.is_file() {
                    tracing::debug!("no config file, using defaults");
                    return Ok(Self::default());
                }
                fallback
            }
        };
        let text = std::fs::read_to_string(&path)
            .map_err(|source| ConfigError::Io { path: path.clone(), source })?;
        let config = Self::from_json(&text).map_err(|source| ConfigError::Invalid { path: path.clone(), source })?;
        tracing::debug!(path = %path.display(), ?config, "loaded config");
        Ok(config)
    }

    pub fn from_json(text: &str) -> Result<Self, PathError> {
        from_str_with_path(text)
    }

    /// `dir/stem<suffix>`, next to the input unless `out_dir` is given.
    pub fn output_path(&self, input: &Path, out_dir: Option<&Path>) -> PathBuf {
        let stem = input.file_stem().map(|s| s.to_string_lossy()).unwrap_or_default();
        let file_name = format!("{stem}{}", self.output_suffix);
        match out_dir.or_else(|| input.parent()) {
            Some(dir) => dir.join(file_name),
            None => PathBuf::from(file_name),
        }
    }
}

/// Whether `text` has an `#include` whose target ends with `file_name`.
pub fn includes_generated(text: &str, file_name: &str) -> bool {
    INCLUDE.captures_iter(text).any(|caps| {
        let target = &caps[1];
        target == file_name || target.ends_with(&format!("/{file_name}"))
    })
}
