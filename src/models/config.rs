//! Configuration models for the SDK.
//!
//! All I^R (resolvable ignorance) is parameterized here.
//! Configuration is read once, at startup, and passed down explicitly.

use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Fixed API version segment prepended to every request path.
pub const API_BASE_PATH: &str = "/api/v1";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Tenant-scoped chatbot client (signed requests)
    #[serde(default)]
    pub chatbot: ChatbotConfig,

    /// Account-level admin client (bearer token)
    #[serde(default)]
    pub admin: AdminConfig,

    /// Training convergence polling
    #[serde(default)]
    pub training: TrainingConfig,

    /// Log verbosity
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Chatbot client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatbotConfig {
    /// Client id (can also be set via BOT_CLIENT_ID env var)
    #[serde(default)]
    pub client_id: Option<String>,

    /// Client secret (can also be set via BOT_CLIENT_SECRET env var)
    #[serde(default)]
    pub client_secret: Option<String>,

    /// Environment variable name for the client id
    #[serde(default = "default_client_id_env")]
    pub client_id_env: String,

    /// Environment variable name for the client secret
    #[serde(default = "default_client_secret_env")]
    pub client_secret_env: String,

    /// Platform URL; only scheme, host and port are used
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_client_id_env() -> String {
    "BOT_CLIENT_ID".to_string()
}

fn default_client_secret_env() -> String {
    "BOT_CLIENT_SECRET".to_string()
}

fn default_base_url() -> String {
    "https://bot.chatopera.com".to_string()
}

fn default_timeout() -> u64 {
    60
}

impl Default for ChatbotConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            client_id_env: default_client_id_env(),
            client_secret_env: default_client_secret_env(),
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
        }
    }
}

/// Admin client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminConfig {
    /// Access token (can also be set via BOT_ACCESS_TOKEN env var)
    #[serde(default)]
    pub access_token: Option<String>,

    /// Environment variable name for the access token
    #[serde(default = "default_access_token_env")]
    pub access_token_env: String,
}

fn default_access_token_env() -> String {
    "BOT_ACCESS_TOKEN".to_string()
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            access_token: None,
            access_token_env: default_access_token_env(),
        }
    }
}

/// Polling configuration for training convergence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Initial delay between status reads
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Multiplier applied to the delay after each unconverged read (1.0 = fixed)
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,

    /// Upper bound for the delay
    #[serde(default = "default_max_interval")]
    pub max_interval_secs: u64,

    /// Give up after this many seconds (unset = wait until converged or cancelled)
    #[serde(default)]
    pub deadline_secs: Option<u64>,
}

fn default_poll_interval() -> u64 {
    10
}

fn default_backoff_factor() -> f64 {
    1.0
}

fn default_max_interval() -> u64 {
    60
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            backoff_factor: default_backoff_factor(),
            max_interval_secs: default_max_interval(),
            deadline_secs: None,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Emit per-request trace logs (also CHATOPERA_SDK_LOG_TRACE=on)
    #[serde(default)]
    pub trace: bool,
}

/// Client credentials. Never serialized.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    client_id: String,
    client_secret: String,
}

impl Credentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn client_secret(&self) -> &str {
        &self.client_secret
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// B_i(file exists) → Result
    /// B_i(file is valid TOML) → Result
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_owned(),
            source: e,
        })?;

        let mut config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_owned(),
            source: e,
        })?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Build configuration from defaults and environment variables only.
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    fn apply_env_overrides(&mut self) {
        if let Some(provider) = non_blank_env("BOT_PROVIDER") {
            self.chatbot.base_url = provider;
        }
        if let Some(flag) = non_blank_env("CHATOPERA_SDK_LOG_TRACE") {
            self.logging.trace = flag.eq_ignore_ascii_case("on");
        }
    }

    /// Resolve credentials from config or environment.
    ///
    /// Missing or blank id/secret is not an error: requests go out unauthenticated.
    pub fn resolve_credentials(&self) -> Option<Credentials> {
        let id = resolve_value(&self.chatbot.client_id, &self.chatbot.client_id_env)?;
        let secret = resolve_value(&self.chatbot.client_secret, &self.chatbot.client_secret_env)?;
        Some(Credentials::new(id, secret))
    }

    /// Resolve the admin access token from config or environment.
    pub fn resolve_access_token(&self) -> Result<String, ConfigError> {
        resolve_value(&self.admin.access_token, &self.admin.access_token_env).ok_or_else(|| {
            ConfigError::MissingAccessToken {
                env_var: self.admin.access_token_env.clone(),
            }
        })
    }

    /// Resolve the client id alone; needed for path scoping even without a secret.
    pub fn resolve_client_id(&self) -> Result<String, ConfigError> {
        resolve_value(&self.chatbot.client_id, &self.chatbot.client_id_env).ok_or_else(|| {
            ConfigError::MissingClientId {
                env_var: self.chatbot.client_id_env.clone(),
            }
        })
    }

    /// Platform origin: `<scheme>://<host>[:port]`.
    pub fn origin(&self) -> Result<String, ConfigError> {
        origin(&self.chatbot.base_url)
    }

    /// Request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.chatbot.timeout_secs)
    }
}

/// API base URL: `<scheme>://<host>[:port]/api/v1`.
pub fn api_base_url(base_url: &str) -> Result<String, ConfigError> {
    Ok(format!("{}{}", origin(base_url)?, API_BASE_PATH))
}

/// Reduce a platform URL to scheme, host and port.
pub fn origin(base_url: &str) -> Result<String, ConfigError> {
    let trimmed = base_url.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::InvalidBaseUrl {
            url: base_url.to_string(),
            reason: "empty".to_string(),
        });
    }

    let url = Url::parse(trimmed).map_err(|e| ConfigError::InvalidBaseUrl {
        url: base_url.to_string(),
        reason: e.to_string(),
    })?;

    let host = url.host_str().ok_or_else(|| ConfigError::InvalidBaseUrl {
        url: base_url.to_string(),
        reason: "missing host".to_string(),
    })?;

    Ok(match url.port() {
        Some(port) => format!("{}://{}:{}", url.scheme(), host, port),
        None => format!("{}://{}", url.scheme(), host),
    })
}

fn resolve_value(explicit: &Option<String>, env_var: &str) -> Option<String> {
    if let Some(value) = explicit {
        let value = expand_env_vars(value).trim().to_string();
        if !value.is_empty() {
            return Some(value);
        }
    }
    non_blank_env(env_var)
}

fn non_blank_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Expand environment variables in a string.
///
/// Supports ${VAR_NAME} syntax.
/// If the variable is not set, the placeholder is left unchanged.
pub fn expand_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    let re = match regex::Regex::new(r"\$\{([^}]+)\}") {
        Ok(re) => re,
        Err(_) => return result,
    };

    for cap in re.captures_iter(s) {
        let var_name = &cap[1];
        if let Ok(value) = std::env::var(var_name) {
            result = result.replace(&cap[0], &value);
        }
    }

    result
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Missing access token: set {env_var} env var or admin.access_token in config")]
    MissingAccessToken { env_var: String },

    #[error("Missing client id: set {env_var} env var or chatbot.client_id in config")]
    MissingClientId { env_var: String },

    #[error("Invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_api_base_url_drops_path_and_keeps_port() {
        assert_eq!(
            api_base_url("https://bot.chatopera.com").unwrap(),
            "https://bot.chatopera.com/api/v1"
        );
        assert_eq!(
            api_base_url("http://localhost:8003/whatever/here").unwrap(),
            "http://localhost:8003/api/v1"
        );
        assert_eq!(origin("http://localhost:8003/x").unwrap(), "http://localhost:8003");
    }

    #[test]
    fn test_api_base_url_rejects_blank_and_garbage() {
        assert!(matches!(
            api_base_url("   "),
            Err(ConfigError::InvalidBaseUrl { .. })
        ));
        assert!(matches!(
            api_base_url("not a url"),
            Err(ConfigError::InvalidBaseUrl { .. })
        ));
    }

    #[test]
    fn test_from_file_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[chatbot]
client_id = "abc123"
client_secret = "s3cr3t"
client_id_env = "CHATOPERA_TEST_UNSET_ID"
client_secret_env = "CHATOPERA_TEST_UNSET_SECRET"

[training]
deadline_secs = 600
"#
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.training.poll_interval_secs, 10);
        assert_eq!(config.training.backoff_factor, 1.0);
        assert_eq!(config.training.deadline_secs, Some(600));
        assert_eq!(config.chatbot.timeout_secs, 60);

        let creds = config.resolve_credentials().unwrap();
        assert_eq!(creds.client_id(), "abc123");
        assert_eq!(creds.client_secret(), "s3cr3t");
    }

    #[test]
    fn test_blank_credentials_mean_anonymous() {
        let config = Config {
            chatbot: ChatbotConfig {
                client_id: Some("  ".to_string()),
                client_secret: Some("secret".to_string()),
                client_id_env: "CHATOPERA_TEST_UNSET_ID".to_string(),
                client_secret_env: "CHATOPERA_TEST_UNSET_SECRET".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(config.resolve_credentials().is_none());
    }

    #[test]
    fn test_missing_access_token() {
        let config = Config {
            admin: AdminConfig {
                access_token: None,
                access_token_env: "CHATOPERA_TEST_UNSET_TOKEN".to_string(),
            },
            ..Default::default()
        };
        assert!(matches!(
            config.resolve_access_token(),
            Err(ConfigError::MissingAccessToken { .. })
        ));
    }

    #[test]
    fn test_credentials_debug_redacts_secret() {
        let creds = Credentials::new("abc123", "s3cr3t");
        let shown = format!("{creds:?}");
        assert!(shown.contains("abc123"));
        assert!(!shown.contains("s3cr3t"));
    }

    #[test]
    fn test_parse_error_reports_path() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[chatbot\nbroken").unwrap();
        let err = Config::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
