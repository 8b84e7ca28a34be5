use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{QpxError, Result};
use crate::http::HttpClientConfig;
use super::source::{ConfigLoader, ConfigSource, RawConfig};

/// Main qpx configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "vendor-dir", default = "default_vendor_dir")]
    pub vendor_dir: PathBuf,

    /// Wall-clock limit in seconds for every VCS subprocess
    #[serde(rename = "process-timeout", default = "default_process_timeout")]
    pub process_timeout: u64,

    #[serde(rename = "registry-url", default = "default_registry_url")]
    pub registry_url: String,

    /// Base of the tarball endpoint, `<github-api-url>/<owner>/<repo>/tarball/<rev>`
    #[serde(rename = "github-api-url", default = "default_github_api_url")]
    pub github_api_url: String,

    #[serde(rename = "github-token", skip_serializing_if = "Option::is_none")]
    pub github_token: Option<String>,

    #[serde(rename = "git-binary", default = "default_git_binary")]
    pub git_binary: String,

    #[serde(rename = "hg-binary", default = "default_hg_binary")]
    pub hg_binary: String,

    /// Keyring directory; mirrors GNUPGHOME
    #[serde(rename = "gnupg-home", skip_serializing_if = "Option::is_none")]
    pub gnupg_home: Option<PathBuf>,

    #[serde(rename = "public-keyring", default = "default_public_keyring")]
    pub public_keyring: String,

    #[serde(rename = "secret-keyring", default = "default_secret_keyring")]
    pub secret_keyring: String,

    #[serde(rename = "http-timeout", default = "default_http_timeout")]
    pub http_timeout: u64,

    #[serde(rename = "http-retries", default = "default_http_retries")]
    pub http_retries: u32,

    /// Publishing token, only ever read from QPX_TOKEN
    #[serde(skip)]
    pub token: Option<String>,

    #[serde(skip)]
    base_dir: Option<PathBuf>,

    #[serde(skip)]
    sources: HashMap<String, ConfigSource>,
}

fn default_vendor_dir() -> PathBuf {
    PathBuf::from(crate::VENDOR_DIR)
}

fn default_process_timeout() -> u64 {
    300
}

fn default_registry_url() -> String {
    "https://pkg.qpm.io/api".to_string()
}

fn default_github_api_url() -> String {
    "https://api.github.com/repos".to_string()
}

fn default_git_binary() -> String {
    "git".to_string()
}

fn default_hg_binary() -> String {
    "hg".to_string()
}

fn default_public_keyring() -> String {
    "pubring.gpg".to_string()
}

fn default_secret_keyring() -> String {
    "secring.gpg".to_string()
}

fn default_http_timeout() -> u64 {
    30
}

fn default_http_retries() -> u32 {
    3
}

impl Default for Config {
    fn default() -> Self {
        Config {
            vendor_dir: default_vendor_dir(),
            process_timeout: default_process_timeout(),
            registry_url: default_registry_url(),
            github_api_url: default_github_api_url(),
            github_token: None,
            git_binary: default_git_binary(),
            hg_binary: default_hg_binary(),
            gnupg_home: None,
            public_keyring: default_public_keyring(),
            secret_keyring: default_secret_keyring(),
            http_timeout: default_http_timeout(),
            http_retries: default_http_retries(),
            token: None,
            base_dir: None,
            sources: HashMap::new(),
        }
    }
}

impl Config {
    /// Create a new Config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new Config with defaults and base directory
    pub fn with_base_dir<P: AsRef<Path>>(base_dir: P) -> Self {
        let mut config = Self::default();
        config.base_dir = Some(base_dir.as_ref().to_path_buf());
        config
    }

    /// Build configuration from all sources (defaults, global, env)
    pub fn build<P: AsRef<Path>>(project_dir: Option<P>, use_environment: bool) -> Result<Self> {
        let loader = ConfigLoader::new(use_environment);
        let mut config = Self::default();

        if let Some(ref dir) = project_dir {
            config.base_dir = Some(dir.as_ref().to_path_buf());
        }

        for key in Self::config_keys() {
            config.sources.insert(key.to_string(), ConfigSource::Default);
        }

        let global_config = loader.load_global_config()?;
        config.merge_raw_config(global_config, ConfigSource::Global)?;

        if use_environment {
            config.apply_env_overrides(&loader);
        }

        Ok(config)
    }

    pub fn set_base_dir<P: AsRef<Path>>(&mut self, base_dir: P) {
        self.base_dir = Some(base_dir.as_ref().to_path_buf());
    }

    pub fn base_dir(&self) -> Option<&Path> {
        self.base_dir.as_deref()
    }

    /// Get the source of a configuration value
    pub fn get_source(&self, key: &str) -> Option<&ConfigSource> {
        self.sources.get(key)
    }

    /// Get vendor directory (resolved against the base directory)
    pub fn get_vendor_dir(&self) -> PathBuf {
        self.resolve_path(&self.vendor_dir)
    }

    pub fn process_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.process_timeout)
    }

    /// Directory holding the keyrings
    pub fn gnupg_home(&self) -> Result<&Path> {
        self.gnupg_home
            .as_deref()
            .ok_or_else(|| QpxError::Config("GNUPGHOME is not set".to_string()))
    }

    pub fn public_keyring_path(&self) -> Result<PathBuf> {
        Ok(self.gnupg_home()?.join(&self.public_keyring))
    }

    pub fn secret_keyring_path(&self) -> Result<PathBuf> {
        Ok(self.gnupg_home()?.join(&self.secret_keyring))
    }

    /// HTTP client settings derived from this configuration
    pub fn http_client_config(&self) -> HttpClientConfig {
        let mut http = HttpClientConfig::new()
            .with_timeout(Duration::from_secs(self.http_timeout))
            .with_max_retries(self.http_retries);

        if let Some(ref token) = self.github_token {
            http = http.with_bearer_token("github.com", token.clone());
        }

        http
    }

    fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else if let Some(ref base) = self.base_dir {
            base.join(path)
        } else {
            path.to_path_buf()
        }
    }

    fn merge_raw_config(&mut self, raw: RawConfig, source: ConfigSource) -> Result<()> {
        if let Some(config_map) = raw.config {
            for (key, value) in config_map {
                self.merge_config_value(&key, value, source.clone())?;
            }
        }
        Ok(())
    }

    fn merge_config_value(
        &mut self,
        key: &str,
        value: serde_json::Value,
        source: ConfigSource,
    ) -> Result<()> {
        let invalid = |expected: &str| {
            QpxError::Config(format!("Config key \"{}\" must be {}", key, expected))
        };

        match key {
            "vendor-dir" => {
                let s = value.as_str().ok_or_else(|| invalid("a string"))?;
                self.vendor_dir = PathBuf::from(s);
            }
            "process-timeout" => {
                self.process_timeout = value.as_u64().ok_or_else(|| invalid("a number"))?;
            }
            "registry-url" => {
                self.registry_url = value.as_str().ok_or_else(|| invalid("a string"))?.to_string();
            }
            "github-api-url" => {
                self.github_api_url = value.as_str().ok_or_else(|| invalid("a string"))?.to_string();
            }
            "github-token" => {
                self.github_token = Some(value.as_str().ok_or_else(|| invalid("a string"))?.to_string());
            }
            "git-binary" => {
                self.git_binary = value.as_str().ok_or_else(|| invalid("a string"))?.to_string();
            }
            "hg-binary" => {
                self.hg_binary = value.as_str().ok_or_else(|| invalid("a string"))?.to_string();
            }
            "gnupg-home" => {
                let s = value.as_str().ok_or_else(|| invalid("a string"))?;
                self.gnupg_home = Some(PathBuf::from(s));
            }
            "public-keyring" => {
                self.public_keyring = value.as_str().ok_or_else(|| invalid("a string"))?.to_string();
            }
            "secret-keyring" => {
                self.secret_keyring = value.as_str().ok_or_else(|| invalid("a string"))?.to_string();
            }
            "http-timeout" => {
                self.http_timeout = value.as_u64().ok_or_else(|| invalid("a number"))?;
            }
            "http-retries" => {
                let retries = value.as_u64().ok_or_else(|| invalid("a number"))?;
                self.http_retries = u32::try_from(retries).map_err(|_| invalid("a small number"))?;
            }
            _ => {
                log::debug!("Ignoring unknown config key \"{}\"", key);
                return Ok(());
            }
        }

        self.sources.insert(key.to_string(), source);
        Ok(())
    }

    fn apply_env_overrides(&mut self, loader: &ConfigLoader) {
        let env_source = |key: &str| ConfigSource::Environment(ConfigLoader::env_var_name(key));

        if let Some(vendor_dir) = loader.get_env_path("vendor-dir") {
            self.vendor_dir = vendor_dir;
            self.sources.insert("vendor-dir".to_string(), env_source("vendor-dir"));
        }

        if let Some(timeout) = loader.get_env_u64("process-timeout") {
            self.process_timeout = timeout;
            self.sources.insert("process-timeout".to_string(), env_source("process-timeout"));
        }

        if let Some(url) = loader.get_env_config("registry-url") {
            self.registry_url = url;
            self.sources.insert("registry-url".to_string(), env_source("registry-url"));
        }

        if let Some(url) = loader.get_env_config("github-api-url") {
            self.github_api_url = url;
            self.sources.insert("github-api-url".to_string(), env_source("github-api-url"));
        }

        if let Some(token) = loader.get_env_config("github-token") {
            self.github_token = Some(token);
            self.sources.insert("github-token".to_string(), env_source("github-token"));
        }

        if let Some(token) = loader.get_env("QPX_TOKEN") {
            self.token = Some(token);
        }

        if let Some(home) = loader.get_env("GNUPGHOME") {
            self.gnupg_home = Some(PathBuf::from(home));
            self.sources.insert(
                "gnupg-home".to_string(),
                ConfigSource::Environment("GNUPGHOME".to_string()),
            );
        }
    }

    fn config_keys() -> &'static [&'static str] {
        &[
            "vendor-dir",
            "process-timeout",
            "registry-url",
            "github-api-url",
            "github-token",
            "git-binary",
            "hg-binary",
            "gnupg-home",
            "public-keyring",
            "secret-keyring",
            "http-timeout",
            "http-retries",
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.vendor_dir, PathBuf::from("vendor"));
        assert_eq!(config.process_timeout, 300);
        assert_eq!(config.git_binary, "git");
        assert_eq!(config.hg_binary, "hg");
        assert_eq!(config.public_keyring, "pubring.gpg");
        assert_eq!(config.secret_keyring, "secring.gpg");
        assert!(config.token.is_none());
    }

    #[test]
    fn test_config_with_base_dir() {
        let config = Config::with_base_dir("/project");
        assert_eq!(config.get_vendor_dir(), PathBuf::from("/project/vendor"));
    }

    #[test]
    fn test_gnupg_home_required() {
        let config = Config::default();
        assert!(matches!(config.gnupg_home(), Err(QpxError::Config(_))));
        assert!(config.public_keyring_path().is_err());
    }

    #[test]
    fn test_keyring_paths() {
        let mut config = Config::default();
        config.gnupg_home = Some(PathBuf::from("/keys"));
        config.secret_keyring = "custom.gpg".to_string();

        assert_eq!(config.public_keyring_path().unwrap(), PathBuf::from("/keys/pubring.gpg"));
        assert_eq!(config.secret_keyring_path().unwrap(), PathBuf::from("/keys/custom.gpg"));
    }

    #[test]
    fn test_merge_config_value() {
        let mut config = Config::default();
        config
            .merge_config_value("process-timeout", serde_json::json!(12), ConfigSource::Global)
            .unwrap();
        config
            .merge_config_value("hg-binary", serde_json::json!("chg"), ConfigSource::Global)
            .unwrap();

        assert_eq!(config.process_timeout, 12);
        assert_eq!(config.hg_binary, "chg");
        assert_eq!(config.get_source("hg-binary"), Some(&ConfigSource::Global));
    }

    #[test]
    fn test_merge_config_value_wrong_type() {
        let mut config = Config::default();
        let err = config
            .merge_config_value("process-timeout", serde_json::json!("soon"), ConfigSource::Global)
            .unwrap_err();
        assert!(matches!(err, QpxError::Config(_)));
    }

    #[test]
    fn test_http_client_config() {
        let mut config = Config::default();
        config.http_retries = 1;
        config.github_token = Some("abc".to_string());

        let http = config.http_client_config();
        assert_eq!(http.max_retries, 1);
        assert_eq!(http.bearer_tokens.get("github.com"), Some(&"abc".to_string()));
    }
}
