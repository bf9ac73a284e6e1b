use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use url::Url;

// ---------------------------------------------------------------------------
// Environment override tracking
// ---------------------------------------------------------------------------

/// Tracks which configuration settings are overridden by environment variables.
#[derive(Debug, Clone, Default)]
pub struct EnvOverrides {
    overrides: HashMap<String, String>,
}

impl EnvOverrides {
    /// Check whether a setting key (e.g. "server.host") is overridden by an env var.
    pub fn is_overridden(&self, key: &str) -> bool {
        self.overrides.contains_key(key)
    }

    /// Get the env var name that overrides the given setting key.
    pub fn env_var_for(&self, key: &str) -> Option<&str> {
        self.overrides.get(key).map(String::as_str)
    }

    fn record(&mut self, key: &str, env_var: &str) {
        self.overrides.insert(key.to_string(), env_var.to_string());
    }
}

// ---------------------------------------------------------------------------
// Main configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub flickr: FlickrConfig,
    #[serde(default)]
    pub credentials: CredentialsConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Env var overrides are not serialized to TOML.
    #[serde(skip)]
    pub env_overrides: EnvOverrides,
    /// File this config was read from; `None` when running on defaults.
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Externally visible base URL, used to build the OAuth callback URL.
    /// Defaults to `http://{host}:{port}`.
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_url: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            public_url: None,
        }
    }
}

/// Flickr OAuth 1.0a endpoints and the permission scope requested.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FlickrConfig {
    #[serde(default = "default_request_token_url")]
    pub request_token_url: String,
    #[serde(default = "default_authorize_url")]
    pub authorize_url: String,
    #[serde(default = "default_access_token_url")]
    pub access_token_url: String,
    /// `read`, `write` or `delete`.
    #[serde(default = "default_perms")]
    pub perms: String,
}

impl Default for FlickrConfig {
    fn default() -> Self {
        Self {
            request_token_url: default_request_token_url(),
            authorize_url: default_authorize_url(),
            access_token_url: default_access_token_url(),
            perms: default_perms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CredentialsConfig {
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    /// Keychain service name holding the `key` and `secret` accounts.
    #[serde(default = "default_keyring_service")]
    pub keyring_service: String,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            keyring_service: default_keyring_service(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionConfig {
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    /// Only send the session cookie over HTTPS.
    #[serde(default = "default_true")]
    pub secure_cookies: bool,
    /// Cookie encryption key material (at least 64 bytes). A random key is
    /// generated per process when unset.
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_key: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: default_cookie_name(),
            secure_cookies: true,
            secret_key: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions
// ---------------------------------------------------------------------------

const fn default_port() -> u16 {
    5000
}
fn default_host() -> String {
    "127.0.0.1".to_string()
}
const fn default_true() -> bool {
    true
}
fn default_request_token_url() -> String {
    "https://www.flickr.com/services/oauth/request_token".to_string()
}
fn default_authorize_url() -> String {
    "https://www.flickr.com/services/oauth/authorize".to_string()
}
fn default_access_token_url() -> String {
    "https://www.flickr.com/services/oauth/access_token".to_string()
}
fn default_perms() -> String {
    "read".to_string()
}
fn default_keyring_service() -> String {
    "flickr_login_demo".to_string()
}
fn default_cookie_name() -> String {
    "session".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}

// ---------------------------------------------------------------------------
// Config loading and env overrides
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a TOML file, then apply environment variable
    /// overrides. Any setting prefixed with `FLICKR_LOGIN_` takes precedence
    /// over the file value and is tracked in `env_overrides`.
    ///
    /// A missing file is not an error. `source` stays `None` so the caller
    /// can report it once logging is up.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let mut config: Config = toml::from_str(&content)?;
            config.source = Some(path.to_path_buf());
            config
        } else {
            Self::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Base URL the browser uses to reach this app, without a trailing slash.
    pub fn public_url(&self) -> String {
        match &self.server.public_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("http://{}", self.listen_addr()),
        }
    }

    /// Absolute URL Flickr redirects back to after the user approves the app.
    pub fn callback_url(&self) -> Result<Url, url::ParseError> {
        Url::parse(&format!("{}/callback", self.public_url()))
    }

    /// Apply environment variable overrides to the configuration.
    fn apply_env_overrides(&mut self) {
        let mut ov = EnvOverrides::default();

        macro_rules! env_str {
            ($key:expr, $env:expr, $field:expr) => {
                if let Ok(val) = std::env::var($env) {
                    $field = val;
                    ov.record($key, $env);
                }
            };
        }
        macro_rules! env_bool {
            ($key:expr, $env:expr, $field:expr) => {
                if let Ok(val) = std::env::var($env) {
                    $field = matches!(val.to_lowercase().as_str(), "1" | "true" | "yes" | "on");
                    ov.record($key, $env);
                }
            };
        }
        macro_rules! env_parse {
            ($key:expr, $env:expr, $field:expr) => {
                if let Ok(val) = std::env::var($env) {
                    if let Ok(parsed) = val.parse() {
                        $field = parsed;
                        ov.record($key, $env);
                    }
                }
            };
        }
        macro_rules! env_opt_str {
            ($key:expr, $env:expr, $field:expr) => {
                if let Ok(val) = std::env::var($env) {
                    $field = if val.is_empty() { None } else { Some(val) };
                    ov.record($key, $env);
                }
            };
        }

        // -- Server --
        env_str!("server.host", "FLICKR_LOGIN_SERVER_HOST", self.server.host);
        env_parse!("server.port", "FLICKR_LOGIN_SERVER_PORT", self.server.port);
        env_opt_str!("server.public_url", "FLICKR_LOGIN_PUBLIC_URL", self.server.public_url);

        // -- Flickr --
        env_str!(
            "flickr.request_token_url",
            "FLICKR_LOGIN_REQUEST_TOKEN_URL",
            self.flickr.request_token_url
        );
        env_str!(
            "flickr.authorize_url",
            "FLICKR_LOGIN_AUTHORIZE_URL",
            self.flickr.authorize_url
        );
        env_str!(
            "flickr.access_token_url",
            "FLICKR_LOGIN_ACCESS_TOKEN_URL",
            self.flickr.access_token_url
        );
        env_str!("flickr.perms", "FLICKR_LOGIN_PERMS", self.flickr.perms);

        // -- Credentials --
        env_opt_str!(
            "credentials.client_id",
            "FLICKR_LOGIN_CLIENT_ID",
            self.credentials.client_id
        );
        env_opt_str!(
            "credentials.client_secret",
            "FLICKR_LOGIN_CLIENT_SECRET",
            self.credentials.client_secret
        );
        env_str!(
            "credentials.keyring_service",
            "FLICKR_LOGIN_KEYRING_SERVICE",
            self.credentials.keyring_service
        );

        // -- Session --
        env_str!(
            "session.cookie_name",
            "FLICKR_LOGIN_COOKIE_NAME",
            self.session.cookie_name
        );
        env_bool!(
            "session.secure_cookies",
            "FLICKR_LOGIN_SECURE_COOKIES",
            self.session.secure_cookies
        );
        env_opt_str!(
            "session.secret_key",
            "FLICKR_LOGIN_SECRET_KEY",
            self.session.secret_key
        );

        // -- Logging --
        env_str!("logging.level", "FLICKR_LOGIN_LOG_LEVEL", self.logging.level);
        env_bool!("logging.json", "FLICKR_LOGIN_LOG_JSON", self.logging.json);

        self.env_overrides = ov;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
