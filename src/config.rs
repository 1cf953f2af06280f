use crate::error::{Error, Result};
use crate::execution::ExecutionMethod;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// No write operations happen while this is set.
    pub dry_run: bool,
    pub doc_types: Vec<String>,
    pub remove_props: Vec<String>,
    /// 5 = debug (most verbose) .. 1 = critical only
    pub debug_level: u8,
    pub execution_methods: Vec<ExecutionMethod>,
    pub postgres_url: Option<String>,
    pub snapshot: Option<PathBuf>,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub to_file: bool,
    pub dir: PathBuf,
    pub rotation: String,
    /// Rotated files kept on disk; older ones are deleted.
    pub max_log_files: Option<usize>,
    pub history_lines: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dry_run: true,
            doc_types: Vec::new(),
            remove_props: Vec::new(),
            debug_level: 5,
            execution_methods: vec![ExecutionMethod::Intool],
            postgres_url: None,
            snapshot: None,
            log: LogConfig::default(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            to_file: false,
            dir: PathBuf::from("log"),
            rotation: "daily".to_string(),
            max_log_files: Some(30),
            history_lines: 50,
        }
    }
}

impl Config {
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        // Priority: explicit file (--config or DOCTYPE_PRUNE_CONFIG) or ./doctype-prune.toml → env → defaults
        let explicit = explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os("DOCTYPE_PRUNE_CONFIG").map(PathBuf::from));
        let path = explicit.clone().unwrap_or_else(|| PathBuf::from("doctype-prune.toml"));
        let mut cfg = match fs::read_to_string(&path) {
            Ok(contents) => Self::from_toml_str(&contents)
                .map_err(|e| Error::Msg(format!("Failed to parse {}: {}", path.display(), e)))?,
            Err(e) if explicit.is_some() => {
                return Err(Error::Msg(format!("Failed to read {}: {}", path.display(), e)));
            }
            Err(_) => Config::default(),
        };
        cfg.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(cfg)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str::<Config>(contents).map_err(|e| Error::Msg(e.to_string()))
    }

    pub fn apply_overrides(&mut self, get: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(pg) = get("DOCTYPE_PRUNE_POSTGRES_URL") {
            self.postgres_url = Some(pg);
        }
        if let Some(path) = get("DOCTYPE_PRUNE_SNAPSHOT") {
            self.snapshot = Some(PathBuf::from(path));
        }
        if let Some(v) = get("DOCTYPE_PRUNE_DRY_RUN") {
            self.dry_run = parse_bool(&v)
                .ok_or_else(|| Error::Msg(format!("DOCTYPE_PRUNE_DRY_RUN: not a boolean: {v}")))?;
        }
        if let Some(v) = get("DOCTYPE_PRUNE_DEBUG_LEVEL") {
            self.debug_level = v
                .trim()
                .parse()
                .map_err(|_| Error::Msg(format!("DOCTYPE_PRUNE_DEBUG_LEVEL: not a level: {v}")))?;
        }
        Ok(())
    }

    pub fn level(&self) -> tracing::Level {
        match self.debug_level {
            0..=2 => tracing::Level::ERROR,
            3 => tracing::Level::WARN,
            4 => tracing::Level::INFO,
            _ => tracing::Level::DEBUG,
        }
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
