use crate::api::config::DEFAULT_BASE_URL;
use crate::errors::AppError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::{env, fs};

/// Overrides the location of `config.toml`.
pub const CONFIG_ENV: &str = "TRELLIS_CONFIG";

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Code,
    Content,
}

impl std::str::FromStr for Mode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "code" => Ok(Mode::Code),
            "content" => Ok(Mode::Content),
            other => Err(AppError::InvalidInput(format!(
                "Unknown mode '{}' (expected code or content)",
                other
            ))),
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Code => write!(f, "code"),
            Mode::Content => write!(f, "content"),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Config {
    pub backend_url: String,
    pub api_key: Option<String>,
    pub log_level: String,
    pub output_directory: String,
    /// Extra instructions placed before the mode's built-in prompt.
    pub system_prompt: String,
    pub mode: Mode,
    pub stream: bool,
    pub retries: u32,
    pub session_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            log_level: "off".to_string(),
            output_directory: "./".to_string(),
            system_prompt: String::new(),
            mode: Mode::Code,
            stream: true,
            retries: 3,
            session_file: "trellis.session.json".to_string(),
        }
    }
}

pub fn get_config_path() -> Result<PathBuf, AppError> {
    if let Ok(path) = env::var(CONFIG_ENV) {
        return Ok(PathBuf::from(path));
    }
    let mut path = get_executable_dir()?;
    path.push("config.toml");
    Ok(path)
}

/// Validate config to prevent obviously wrong or missing values.
pub fn validate_config(config: &Config) -> Result<(), AppError> {
    if !config.backend_url.starts_with("http://") && !config.backend_url.starts_with("https://") {
        return Err(AppError::InvalidInput(format!(
            "Backend URL must start with http:// or https://: {}",
            config.backend_url
        )));
    }
    if !["off", "debug", "info", "warn", "error", "trace"].contains(&config.log_level.as_str()) {
        return Err(AppError::InvalidInput(format!(
            "Unknown log level: {}",
            config.log_level
        )));
    }
    if config.session_file.trim().is_empty() {
        return Err(AppError::InvalidInput(
            "Session file cannot be empty".to_string(),
        ));
    }
    if !Path::new(&config.output_directory).is_dir() {
        return Err(AppError::InvalidInput(format!(
            "Output directory does not exist: {}",
            config.output_directory
        )));
    }
    Ok(())
}

/// Read config from file, and create a default config if none exists.
pub fn read_config() -> Result<Config, AppError> {
    read_config_from(&get_config_path()?)
}

pub fn read_config_from(path: &Path) -> Result<Config, AppError> {
    if !path.exists() {
        write_config_to(path, &Config::default())?;
    }
    let config_str = fs::read_to_string(path)?;
    let config: Config = toml::from_str(&config_str)?;
    validate_config(&config)?;
    Ok(config)
}

pub fn write_config(config: &Config) -> Result<(), AppError> {
    write_config_to(&get_config_path()?, config)
}

pub fn write_config_to(path: &Path, config: &Config) -> Result<(), AppError> {
    let config_str = toml::to_string(config)
        .map_err(|e| AppError::InvalidInput(format!("Failed to serialize config: {}", e)))?;
    fs::write(path, config_str)?;
    Ok(())
}

/// Resolves the session file relative to the output directory.
pub fn session_path(config: &Config) -> PathBuf {
    let session = Path::new(&config.session_file);
    if session.is_absolute() {
        session.to_path_buf()
    } else {
        Path::new(&config.output_directory).join(session)
    }
}

fn get_executable_dir() -> Result<PathBuf, AppError> {
    let exe = env::current_exe()?;
    exe.parent().map(Path::to_path_buf).ok_or_else(|| {
        AppError::InvalidInput("Failed to get the executable directory".to_string())
    })
}
