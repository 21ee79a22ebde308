use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::Deserialize;

use crate::backend::AudioBackend;

pub const DEFAULT_PROGRAM: &str = "demucs";

pub const ENV_CONFIG: &str = "DEMUCS_WRAPPER_CONFIG";
pub const ENV_PROGRAM: &str = "DEMUCS_WRAPPER_PROGRAM";
pub const ENV_AUDIO_BACKEND: &str = "DEMUCS_WRAPPER_AUDIO_BACKEND";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    #[default]
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Directive string for an `EnvFilter`.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwarderConfig {
    /// Executable to forward to, looked up on `PATH` unless it contains a path separator.
    pub program: String,
    pub audio_backend: AudioBackend,
    pub log_level: LogLevel,
}

impl Default for ForwarderConfig {
    fn default() -> Self {
        Self {
            program: DEFAULT_PROGRAM.to_string(),
            audio_backend: AudioBackend::default(),
            log_level: LogLevel::default(),
        }
    }
}

/// On-disk form; every field is optional and falls back to the default.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    program: Option<String>,
    audio_backend: Option<AudioBackend>,
    log_level: Option<LogLevel>,
}

/// A resolved config plus the problems found while resolving it.
///
/// Warnings are held back because logging is configured from the result.
#[derive(Debug)]
pub struct LoadedConfig {
    pub config: ForwarderConfig,
    pub source: Option<PathBuf>,
    pub warnings: Vec<String>,
}

impl ForwarderConfig {
    /// Defaults, then the config file, then environment overrides.
    pub fn load() -> LoadedConfig {
        let env = |key: &str| std::env::var(key).ok();
        Self::load_from(config_path(env), env)
    }

    pub fn load_from<F>(path: Option<PathBuf>, env: F) -> LoadedConfig
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = ForwarderConfig::default();
        let mut warnings = Vec::new();
        let mut source = None;

        if let Some(path) = path {
            match read_config_file(&path) {
                Ok(Some(file)) => {
                    config.apply_file(file, &mut warnings);
                    source = Some(path);
                }
                Ok(None) => {}
                Err(e) => warnings.push(format!("ignoring config file: {:#}", e)),
            }
        }

        config.apply_env(env, &mut warnings);

        LoadedConfig {
            config,
            source,
            warnings,
        }
    }

    fn apply_file(&mut self, file: FileConfig, warnings: &mut Vec<String>) {
        if let Some(program) = file.program {
            match non_empty(&program) {
                Some(program) => self.program = program,
                None => warnings.push("config file: empty 'program' ignored".to_string()),
            }
        }
        if let Some(backend) = file.audio_backend {
            self.audio_backend = backend;
        }
        if let Some(level) = file.log_level {
            self.log_level = level;
        }
    }

    fn apply_env<F>(&mut self, env: F, warnings: &mut Vec<String>)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(program) = env(ENV_PROGRAM) {
            match non_empty(&program) {
                Some(program) => self.program = program,
                None => warnings.push(format!("{}: empty value ignored", ENV_PROGRAM)),
            }
        }
        if let Some(value) = env(ENV_AUDIO_BACKEND) {
            match value.parse::<AudioBackend>() {
                Ok(backend) => self.audio_backend = backend,
                Err(e) => warnings.push(format!("{}: {}", ENV_AUDIO_BACKEND, e)),
            }
        }
    }
}

/// Explicit override first, otherwise `config.json` in the platform config directory.
pub fn config_path<F>(env: F) -> Option<PathBuf>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(path) = env(ENV_CONFIG).filter(|p| !p.trim().is_empty()) {
        return Some(PathBuf::from(path));
    }
    ProjectDirs::from("", "", "demucs-wrapper").map(|dirs| dirs.config_dir().join("config.json"))
}

/// `Ok(None)` when the file simply doesn't exist.
fn read_config_file(path: &Path) -> Result<Option<FileConfig>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(e).with_context(|| format!("failed to read {}", path.display()));
        }
    };
    let file = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(Some(file))
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
