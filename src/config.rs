// Configuration module for artwork-resolver
// Handles the config directory and TOML configuration file

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::models::LanguagePreferences;
use crate::parser::DEFAULT_LIBRARY_FOLDERS;
use crate::services::identity::DEFAULT_TV_LIBRARY_TOKENS;

const APP_NAME: &str = "artwork-resolver";
const CONFIG_FILENAME: &str = "config.toml";

/// TOML configuration file structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    /// Server configuration
    pub server: ServerConfig,

    /// Metadata cache endpoints, in lookup priority order
    pub sources: Vec<SourceConfig>,

    /// Options shared by all record sources
    pub source_options: SourceOptions,

    /// Provider search / preferences endpoints
    pub providers: ProvidersConfig,

    /// Path parsing configuration
    pub parser: ParserConfig,

    /// Preferences used when no preferences endpoint is available
    pub preferences: LanguagePreferences,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server port (default: 8097)
    pub port: u16,

    /// Bind address (default: 0.0.0.0)
    pub bind_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8097,
            bind_address: "0.0.0.0".to_string(),
        }
    }
}

/// One metadata cache endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// Name used in logs and responses
    pub name: String,

    /// Endpoint returning a JSON array of records
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourceOptions {
    /// Per-request timeout in seconds (default: 10)
    pub timeout_secs: u64,
}

impl Default for SourceOptions {
    fn default() -> Self {
        Self { timeout_secs: 10 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    /// Provider search endpoint (required for candidate lookups)
    pub search_url: Option<String>,

    /// Preferences endpoint (optional, falls back to [preferences])
    pub preferences_url: Option<String>,

    /// Per-request timeout in seconds (default: 30)
    pub timeout_secs: u64,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            search_url: None,
            preferences_url: None,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Tokens that mark a path segment as a library folder
    pub library_folders: Vec<String>,

    /// Library name tokens that mark a TV library
    pub tv_library_tokens: Vec<String>,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            library_folders: DEFAULT_LIBRARY_FOLDERS.iter().map(|s| s.to_string()).collect(),
            tv_library_tokens: DEFAULT_TV_LIBRARY_TOKENS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Application configuration - combines TOML file with environment overrides
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Directory config.toml was looked up in
    pub config_dir: PathBuf,

    /// Server port
    pub port: u16,

    /// Bind address
    pub bind_address: String,

    /// Record sources in priority order
    pub sources: Vec<SourceConfig>,

    /// Record source request timeout
    pub source_timeout: Duration,

    /// Provider search endpoint
    pub search_url: Option<String>,

    /// Preferences endpoint
    pub preferences_url: Option<String>,

    /// Provider search / preferences request timeout
    pub provider_timeout: Duration,

    /// Path parsing configuration
    pub parser: ParserConfig,

    /// Fallback preferences
    pub preferences: LanguagePreferences,
}

impl AppConfig {
    /// Load configuration from TOML file and environment
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables
    /// 2. TOML config file
    /// 3. Default values
    pub fn load() -> Self {
        // Portable mode ignores the config file entirely
        let portable_mode = std::env::var("ARTWORK_RESOLVER_PORTABLE")
            .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
            .unwrap_or(false);

        if portable_mode {
            tracing::info!("Running in portable mode (using current directory)");
            let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
            return Self::from_file(cwd, ConfigFile::default());
        }

        let config_dir = Self::find_config_dir();
        let config_file = Self::load_config_file(&config_dir);

        Self::from_file(config_dir, config_file)
    }

    /// Find the config directory (for locating config.toml)
    fn find_config_dir() -> PathBuf {
        // Environment variable takes priority
        if let Ok(path) = std::env::var("ARTWORK_RESOLVER_CONFIG_DIR") {
            return PathBuf::from(path);
        }

        // Then XDG config dir
        if let Some(dir) = dirs::config_dir() {
            return dir.join(APP_NAME);
        }

        // Fallback to current directory
        std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
    }

    /// Load and parse the TOML config file
    fn load_config_file(config_dir: &std::path::Path) -> ConfigFile {
        let config_path = config_dir.join(CONFIG_FILENAME);

        if !config_path.exists() {
            tracing::debug!(
                "No config file found at {}, using defaults",
                config_path.display()
            );
            return ConfigFile::default();
        }

        match std::fs::read_to_string(&config_path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => {
                    tracing::info!("Loaded configuration from {}", config_path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!(
                        "Failed to parse config file {}: {}. Using defaults.",
                        config_path.display(),
                        e
                    );
                    ConfigFile::default()
                }
            },
            Err(e) => {
                tracing::warn!(
                    "Failed to read config file {}: {}. Using defaults.",
                    config_path.display(),
                    e
                );
                ConfigFile::default()
            }
        }
    }

    /// Build configuration from config file with environment overrides
    pub fn from_file(config_dir: PathBuf, config_file: ConfigFile) -> Self {
        // Port: env > config > default
        let port = Self::env_port().unwrap_or(config_file.server.port);

        // Bind address: env > config > default
        let bind_address = std::env::var("ARTWORK_RESOLVER_BIND_ADDRESS")
            .unwrap_or_else(|_| config_file.server.bind_address.clone());

        // Endpoints: env > config
        let search_url = std::env::var("ARTWORK_RESOLVER_SEARCH_URL")
            .ok()
            .or(config_file.providers.search_url);
        let preferences_url = std::env::var("ARTWORK_RESOLVER_PREFERENCES_URL")
            .ok()
            .or(config_file.providers.preferences_url);

        Self {
            config_dir,
            port,
            bind_address,
            sources: config_file.sources,
            source_timeout: Duration::from_secs(config_file.source_options.timeout_secs),
            search_url,
            preferences_url,
            provider_timeout: Duration::from_secs(config_file.providers.timeout_secs),
            parser: config_file.parser,
            preferences: config_file.preferences,
        }
    }

    fn env_port() -> Option<u16> {
        std::env::var("ARTWORK_RESOLVER_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
    }

    /// Log configuration status
    pub fn log_config(&self) {
        tracing::info!("Configuration directory: {}", self.config_dir.display());
        tracing::info!("Server listening on {}:{}", self.bind_address, self.port);

        if self.sources.is_empty() {
            tracing::info!("Record sources: none (identities come from paths only)");
        } else {
            let names: Vec<&str> = self.sources.iter().map(|s| s.name.as_str()).collect();
            tracing::info!("Record sources (priority order): {}", names.join(" > "));
        }

        match self.search_url {
            Some(ref url) => tracing::info!("Provider search: {}", url),
            None => {
                tracing::info!("Provider search: disabled");
                tracing::info!(
                    "Hint: Add search_url to [providers] or set ARTWORK_RESOLVER_SEARCH_URL"
                );
            }
        }

        match self.preferences_url {
            Some(ref url) => tracing::debug!("Preferences endpoint: {}", url),
            None => tracing::debug!("Preferences: using [preferences] from config"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AssetType, LanguageSetting};

    #[test]
    fn test_default_config_file() {
        let config = ConfigFile::default();
        assert_eq!(config.server.port, 8097);
        assert_eq!(config.server.bind_address, "0.0.0.0");
        assert!(config.sources.is_empty());
        assert!(config.providers.search_url.is_none());
        assert_eq!(config.providers.timeout_secs, 30);
        assert!(config.parser.library_folders.contains(&"4k".to_string()));
        assert!(config.parser.tv_library_tokens.contains(&"serien".to_string()));
    }

    #[test]
    fn test_parse_config_toml() {
        let toml_str = r#"
[server]
port = 9000
bind_address = "127.0.0.1"

[[sources]]
name = "image_choices"
url = "http://localhost:8000/api/imagechoices"

[[sources]]
name = "plex_export"
url = "http://localhost:8000/api/plexexport"

[source_options]
timeout_secs = 3

[providers]
search_url = "http://localhost:8000/api/search"

[parser]
library_folders = ["Filme", "4K"]

[preferences]
favored_provider = "fanart"
poster = ["de", "en", "xx"]
background = "xx"
"#;
        let config: ConfigFile = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.bind_address, "127.0.0.1");

        let names: Vec<&str> = config.sources.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["image_choices", "plex_export"]);
        assert_eq!(config.source_options.timeout_secs, 3);
        assert_eq!(
            config.providers.search_url.as_deref(),
            Some("http://localhost:8000/api/search")
        );
        assert_eq!(config.parser.library_folders, vec!["Filme", "4K"]);
        // Unset list keeps its default
        assert!(!config.parser.tv_library_tokens.is_empty());

        assert_eq!(config.preferences.favored_provider, "fanart");
        assert_eq!(
            config.preferences.background,
            LanguageSetting::Languages(vec!["xx".to_string()])
        );
        assert_eq!(config.preferences.season, LanguageSetting::InheritPoster);
        assert_eq!(
            config.preferences.resolve(AssetType::Titlecard).language_order,
            vec!["de", "en", "xx"]
        );
    }

    #[test]
    fn test_partial_config_toml() {
        // Test that partial configs work (only specify what you need)
        let toml_str = r#"
[providers]
preferences_url = "http://localhost:8000/api/preferences"
"#;
        let config: ConfigFile = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.port, 8097); // default
        assert_eq!(config.providers.timeout_secs, 30); // default
        assert!(config.providers.preferences_url.is_some()); // from file
        assert_eq!(config.preferences.favored_provider, "tmdb");
    }

    #[test]
    fn test_build_applies_file_values() {
        let mut file = ConfigFile::default();
        file.source_options.timeout_secs = 4;
        file.providers.timeout_secs = 12;

        let config = AppConfig::from_file(PathBuf::from("/tmp/cfg"), file);
        assert_eq!(config.source_timeout, Duration::from_secs(4));
        assert_eq!(config.provider_timeout, Duration::from_secs(12));
        assert_eq!(config.config_dir, PathBuf::from("/tmp/cfg"));
    }
}
