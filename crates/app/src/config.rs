use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

const DEFAULT_CONFIG_FILE: &str = "courseware.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub course_file: Option<PathBuf>,
    pub api_url: Option<String>,
    pub api_token: Option<String>,
    pub log: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            course_file: None,
            api_url: None,
            api_token: None,
            log: "info".into(),
        }
    }
}

/// Shape of `courseware.toml`; every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileSettings {
    course_file: Option<PathBuf>,
    api_url: Option<String>,
    api_token: Option<String>,
    log: Option<String>,
}

impl Settings {
    fn apply_file(&mut self, file: FileSettings) {
        if let Some(v) = file.course_file {
            self.course_file = Some(v);
        }
        if let Some(v) = file.api_url {
            self.api_url = Some(v);
        }
        if let Some(v) = file.api_token {
            self.api_token = Some(v);
        }
        if let Some(v) = file.log {
            self.log = v;
        }
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        let lookup = |key: &str| var(key).filter(|v| !v.trim().is_empty());
        if let Some(v) = lookup("COURSEWARE_COURSE_FILE") {
            self.course_file = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("COURSEWARE_API_URL") {
            self.api_url = Some(v);
        }
        if let Some(v) = lookup("COURSEWARE_API_TOKEN") {
            self.api_token = Some(v);
        }
        if let Some(v) = lookup("COURSEWARE_LOG") {
            self.log = v;
        }
    }
}

/// Defaults, then the config file, then `COURSEWARE_*` variables.
///
/// An explicit `path` must exist; the default `courseware.toml` is optional.
pub fn load_settings(path: Option<&Path>) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    let (path, required) = match path {
        Some(path) => (path, true),
        None => (Path::new(DEFAULT_CONFIG_FILE), false),
    };
    match fs::read_to_string(path) {
        Ok(raw) => {
            let file: FileSettings = toml::from_str(&raw)
                .with_context(|| format!("invalid config file {}", path.display()))?;
            settings.apply_file(file);
        }
        Err(err) if err.kind() == ErrorKind::NotFound && !required => {}
        Err(err) => {
            return Err(err).with_context(|| format!("cannot read config file {}", path.display()));
        }
    }

    settings.apply_env(|key| std::env::var(key).ok());
    Ok(settings)
}
