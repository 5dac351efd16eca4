use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Csv,
    Json,
    Xml,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnMalformed {
    #[default]
    Abort,
    Skip,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceSpec {
    pub format: SourceFormat,
    pub path: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReportConfig {
    #[serde(default = "default_report_path")]
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    #[serde(default)]
    pub on_malformed: OnMalformed,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    #[serde(default = "default_sources")]
    pub sources: Vec<SourceSpec>,
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            path: default_report_path(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            on_malformed: OnMalformed::Abort,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            sources: default_sources(),
            report: ReportConfig::default(),
            pipeline: PipelineConfig::default(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_report_path() -> String {
    "final-report.csv".to_string()
}

fn default_sources() -> Vec<SourceSpec> {
    vec![
        SourceSpec {
            format: SourceFormat::Csv,
            path: "data/reports.csv".to_string(),
            enabled: true,
        },
        SourceSpec {
            format: SourceFormat::Json,
            path: "data/reports.json".to_string(),
            enabled: true,
        },
        SourceSpec {
            format: SourceFormat::Xml,
            path: "data/reports.xml".to_string(),
            enabled: true,
        },
    ]
}

pub fn expand_path(path: &str) -> String {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            return format!("{}/{}", home.to_string_lossy(), stripped);
        }
    }
    path.to_string()
}

fn home_config_path() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .map(|home| PathBuf::from(home).join(".usagemerge").join("config.toml"))
}

fn repo_default_config_path() -> PathBuf {
    PathBuf::from("config/usagemerge.toml")
}

fn resolve_config_path_with_overrides(
    raw_path: Option<PathBuf>,
    env_keys: &[&str],
    home_path: Option<PathBuf>,
    repo_default: PathBuf,
) -> PathBuf {
    if let Some(path) = raw_path {
        return path;
    }

    for key in env_keys {
        if let Ok(value) = std::env::var(key) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return PathBuf::from(trimmed);
            }
        }
    }

    if let Some(path) = home_path {
        if path.exists() {
            return path;
        }
    }

    if repo_default.exists() {
        return repo_default;
    }

    home_config_path().unwrap_or(repo_default)
}

pub fn resolve_config_path(raw_path: Option<PathBuf>) -> PathBuf {
    resolve_config_path_with_overrides(
        raw_path,
        &["USAGEMERGE_CONFIG"],
        home_config_path(),
        repo_default_config_path(),
    )
}

fn normalize_config(mut cfg: AppConfig) -> AppConfig {
    for source in &mut cfg.sources {
        source.path = expand_path(&source.path);
    }
    cfg.report.path = expand_path(&cfg.report.path);
    cfg
}

pub fn load_config(path: impl AsRef<Path>) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path.as_ref())
        .with_context(|| format!("failed to read config {}", path.as_ref().display()))?;
    let cfg: AppConfig = toml::from_str(&content).context("failed to parse TOML config")?;
    Ok(normalize_config(cfg))
}

/// A missing config file is not an error: the tool runs with its built-in
/// wiring (three sources under `data/`, report at `final-report.csv`).
pub fn load_config_or_default(path: impl AsRef<Path>) -> Result<AppConfig> {
    if !path.as_ref().exists() {
        return Ok(normalize_config(AppConfig::default()));
    }
    load_config(path)
}
