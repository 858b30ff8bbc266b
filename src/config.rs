use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

const DEFAULT_ENV_PREFIX: &str = "BLOGTUI";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub ui: UIConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    /// Root of the blog deployment; empty means offline demo mode.
    #[serde(default)]
    pub base_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Netscape-format cookie jar holding the session and token cookies.
    #[serde(default = "default_cookie_file")]
    pub cookie_file: Option<PathBuf>,
    /// Name of the cookie carrying the anti-forgery token.
    #[serde(default = "default_csrf_cookie")]
    pub csrf_cookie: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            user_agent: default_user_agent(),
            cookie_file: default_cookie_file(),
            csrf_cookie: default_csrf_cookie(),
        }
    }
}

fn default_user_agent() -> String {
    "blog-tui/0.1 (+https://github.com/blog-tui/blog-tui)".to_string()
}

fn default_cookie_file() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("blog-tui").join("cookies.txt"))
}

fn default_csrf_cookie() -> String {
    "csrftoken".into()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UIConfig {
    #[serde(default = "default_theme")]
    pub theme: String,
    /// How long non-sticky alerts stay on screen.
    #[serde(default = "default_toast_timeout", with = "humantime_serde")]
    pub toast_timeout: Duration,
    /// Quiet interval before live validation fires while typing.
    #[serde(default = "default_debounce", with = "humantime_serde")]
    pub debounce: Duration,
}

impl Default for UIConfig {
    fn default() -> Self {
        Self {
            theme: default_theme(),
            toast_timeout: default_toast_timeout(),
            debounce: default_debounce(),
        }
    }
}

fn default_theme() -> String {
    "default".into()
}

fn default_toast_timeout() -> Duration {
    Duration::from_secs(4)
}

fn default_debounce() -> Duration {
    Duration::from_millis(300)
}

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub config_file: Option<PathBuf>,
    pub env_prefix: Option<String>,
}

pub fn load(options: LoadOptions) -> Result<Config> {
    let mut cfg = Config::default();

    if let Some(path) = options.config_file.as_ref() {
        if path.exists() {
            let from_file = read_config_file(path)?;
            cfg = merge_config(cfg, from_file);
        }
    } else if let Some(default_path) = default_config_path() {
        if default_path.exists() {
            let from_file = read_config_file(&default_path)?;
            cfg = merge_config(cfg, from_file);
        }
    }

    let prefix = options.env_prefix.as_deref().unwrap_or(DEFAULT_ENV_PREFIX);
    cfg = merge_config(cfg, load_env(prefix)?);

    Ok(cfg)
}

fn read_config_file(path: &Path) -> Result<Config> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file at {}", path.display()))?;
    let config: Config = serde_yaml::from_str(&data)
        .with_context(|| format!("Failed to parse config file at {}", path.display()))?;
    Ok(config)
}

fn merge_config(mut base: Config, other: Config) -> Config {
    if !other.server.base_url.is_empty() {
        base.server.base_url = other.server.base_url;
    }
    if !other.server.user_agent.is_empty() {
        base.server.user_agent = other.server.user_agent;
    }
    if other.server.cookie_file.is_some() {
        base.server.cookie_file = other.server.cookie_file;
    }
    if !other.server.csrf_cookie.is_empty() {
        base.server.csrf_cookie = other.server.csrf_cookie;
    }

    if !other.ui.theme.is_empty() {
        base.ui.theme = other.ui.theme;
    }
    if other.ui.toast_timeout != Duration::ZERO {
        base.ui.toast_timeout = other.ui.toast_timeout;
    }
    if other.ui.debounce != Duration::ZERO {
        base.ui.debounce = other.ui.debounce;
    }

    base
}

fn load_env(prefix: &str) -> Result<Config> {
    let mut map: HashMap<String, String> = HashMap::new();
    let upper_prefix = format!("{}_", prefix.to_uppercase());

    for (key, value) in env::vars() {
        if let Some(stripped) = key.strip_prefix(&upper_prefix) {
            let normalized = stripped.to_ascii_lowercase().replace("__", ".");
            map.insert(normalized, value);
        }
    }

    // Sparse: only fields named in the environment survive the merge.
    let mut cfg = sparse_config();

    for (key, value) in map {
        apply_env_value(&mut cfg, &key, value);
    }

    Ok(cfg)
}

/// A config where every field reads as "unset" to `merge_config`.
fn sparse_config() -> Config {
    Config {
        server: ServerConfig {
            base_url: String::new(),
            user_agent: String::new(),
            cookie_file: None,
            csrf_cookie: String::new(),
        },
        ui: UIConfig {
            theme: String::new(),
            toast_timeout: Duration::ZERO,
            debounce: Duration::ZERO,
        },
    }
}

fn apply_env_value(cfg: &mut Config, key: &str, value: String) {
    match key {
        "server.base_url" => cfg.server.base_url = value,
        "server.user_agent" => cfg.server.user_agent = value,
        "server.cookie_file" => cfg.server.cookie_file = Some(PathBuf::from(value)),
        "server.csrf_cookie" => cfg.server.csrf_cookie = value,
        "ui.theme" => cfg.ui.theme = value,
        "ui.toast_timeout" => {
            if let Ok(duration) = humantime::parse_duration(&value) {
                cfg.ui.toast_timeout = duration;
            }
        }
        "ui.debounce" => {
            if let Ok(duration) = humantime::parse_duration(&value) {
                cfg.ui.debounce = duration;
            }
        }
        _ => {}
    }
}

pub fn default_path() -> Option<PathBuf> {
    default_config_path()
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("blog-tui").join("config.yaml"))
}
