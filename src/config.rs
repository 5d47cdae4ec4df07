use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::error;

const DEFAULT_PORT: u16 = 4400;
const DEFAULT_MENTOR_BASE_URL: &str = "https://api.groq.com/openai/v1";
const DEFAULT_MENTOR_MODEL: &str = "llama3-8b-8192";
const DEFAULT_MENTOR_API_KEY_ENV: &str = "GROQ_API_KEY";

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

// ─── MentorConfig ────────────────────────────────────────────────────────────

/// AI mentor vendor configuration (`[mentor]` in config.toml).
///
/// The API key itself never lives in the file — `api_key_env` names the
/// environment variable to read it from.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MentorConfig {
    /// OpenAI-compatible completions base URL (default: Groq).
    pub base_url: String,
    /// Model name requested from the vendor.
    pub model: String,
    /// Environment variable holding the vendor API key.
    pub api_key_env: String,
}

impl Default for MentorConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_MENTOR_BASE_URL.to_string(),
            model: DEFAULT_MENTOR_MODEL.to_string(),
            api_key_env: DEFAULT_MENTOR_API_KEY_ENV.to_string(),
        }
    }
}

// ─── ServiceConfig ───────────────────────────────────────────────────────────

/// Resolved service configuration shared through `AppContext`.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub port: u16,
    pub bind_address: String,
    pub data_dir: PathBuf,
    /// Log level filter string, e.g. "debug", "info,makond=trace".
    pub log: String,
    /// Emit JSON log lines instead of the compact human format.
    pub log_json: bool,
    /// Slow-query WARN threshold in milliseconds; 0 disables it.
    pub slow_query_ms: u64,
    pub mentor: MentorConfig,
}

impl ServiceConfig {
    /// Build config from CLI/env args + optional TOML file.
    ///
    /// Priority (highest to lowest):
    ///   1. CLI / env — passed as `Some(value)` from clap
    ///   2. TOML file at `{data_dir}/config.toml`
    ///   3. Built-in defaults
    pub fn new(
        port: Option<u16>,
        data_dir: Option<PathBuf>,
        log: Option<String>,
        bind_address: Option<String>,
        log_json: bool,
    ) -> Self {
        let data_dir = data_dir.unwrap_or_else(default_data_dir);

        // Load TOML as the lowest-priority override layer
        let toml = load_toml(&data_dir).unwrap_or_default();

        let port = port.or(toml.port).unwrap_or(DEFAULT_PORT);
        let log = log.or(toml.log).unwrap_or_else(|| "info".to_string());
        let bind_address = bind_address
            .or(toml.bind_address)
            .unwrap_or_else(default_bind_address);
        let slow_query_ms = toml.slow_query_ms.unwrap_or(0);
        let mentor = toml.mentor.unwrap_or_default();

        Self {
            port,
            bind_address,
            data_dir,
            log,
            log_json,
            slow_query_ms,
            mentor,
        }
    }
}

/// `{data_dir}/config.toml` — all fields are optional overrides.
/// Priority: CLI / env var  >  TOML  >  built-in default.
#[derive(Deserialize, Default)]
struct TomlConfig {
    /// REST server port (default: 4400).
    port: Option<u16>,
    /// Log level filter string (default: "info").
    log: Option<String>,
    /// Bind address (default: "127.0.0.1"; use "0.0.0.0" for LAN access).
    bind_address: Option<String>,
    /// Slow-query WARN threshold in milliseconds (default: 0 = disabled).
    slow_query_ms: Option<u64>,
    /// AI mentor vendor configuration (`[mentor]`).
    mentor: Option<MentorConfig>,
}

fn load_toml(data_dir: &Path) -> Option<TomlConfig> {
    let path = data_dir.join("config.toml");
    let contents = std::fs::read_to_string(&path).ok()?;
    match toml::from_str::<TomlConfig>(&contents) {
        Ok(cfg) => Some(cfg),
        Err(e) => {
            error!(path = %path.display(), err = %e, "failed to parse config.toml — using defaults");
            None
        }
    }
}

fn default_data_dir() -> PathBuf {
    #[cfg(target_os = "macos")]
    {
        // ~/Library/Application Support/makond
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home)
                .join("Library")
                .join("Application Support")
                .join("makond");
        }
    }
    #[cfg(target_os = "linux")]
    {
        // $XDG_DATA_HOME/makond or ~/.local/share/makond
        if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
            if !xdg.is_empty() {
                return PathBuf::from(xdg).join("makond");
            }
        }
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(".local").join("share").join("makond");
        }
    }
    #[cfg(target_os = "windows")]
    {
        // %APPDATA%\makond
        if let Ok(appdata) = std::env::var("APPDATA") {
            return PathBuf::from(appdata).join("makond");
        }
    }
    PathBuf::from(".makond")
}
