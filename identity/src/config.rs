//! Engine configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use veil_contacts::TrustLevelPolicy;
use veil_utils::LogFormat;

use crate::IdentityError;

/// Configuration of the trust engine.
///
/// Can be loaded from a TOML file via [`EngineConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Directory holding the LMDB environment and downloaded photos.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// LMDB map size in bytes.
    #[serde(default = "default_map_size")]
    pub map_size: usize,

    #[serde(default)]
    pub log_format: LogFormat,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// How long a freshly issued device pre-key stays valid.
    #[serde(default = "default_pre_key_validity_millis")]
    pub pre_key_validity_millis: u64,

    /// Keep-alive period of photos we uploaded.
    #[serde(default = "default_server_user_data_refresh_millis")]
    pub server_user_data_refresh_millis: u64,

    /// Trust contributed by each trust origin kind.
    #[serde(default)]
    pub trust_levels: TrustLevelPolicy,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_data_dir() -> PathBuf {
    PathBuf::from("./veil_data")
}

fn default_map_size() -> usize {
    1 << 30
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_pre_key_validity_millis() -> u64 {
    // one week
    7 * 24 * 3_600_000
}

fn default_server_user_data_refresh_millis() -> u64 {
    // thirty days
    30 * 24 * 3_600_000
}

// ── Impl ───────────────────────────────────────────────────────────────

impl EngineConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &str) -> Result<Self, IdentityError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| IdentityError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, IdentityError> {
        toml::from_str(s).map_err(|e| IdentityError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, IdentityError> {
        toml::to_string_pretty(self).map_err(|e| IdentityError::Config(e.to_string()))
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            map_size: default_map_size(),
            log_format: LogFormat::default(),
            log_level: default_log_level(),
            pre_key_validity_millis: default_pre_key_validity_millis(),
            server_user_data_refresh_millis: default_server_user_data_refresh_millis(),
            trust_levels: TrustLevelPolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use veil_types::TrustLevel;

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = EngineConfig::default();
        let toml_str = config.to_toml_string().unwrap();
        let parsed = EngineConfig::from_toml_str(&toml_str).expect("should parse");
        assert_eq!(parsed, config);
    }

    #[test]
    fn minimal_toml_uses_defaults() {
        let config = EngineConfig::from_toml_str("").expect("empty toml should use defaults");
        assert_eq!(config.log_level, "info");
        assert_eq!(config.log_format, LogFormat::Human);
        assert_eq!(config.trust_levels, TrustLevelPolicy::default());
    }

    #[test]
    fn trust_levels_are_tunable() {
        let toml = r#"
            log_format = "json"
            pre_key_validity_millis = 60000

            [trust_levels.identity_server]
            major = 2
            minor = 5
        "#;
        let config = EngineConfig::from_toml_str(toml).expect("should parse");
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.pre_key_validity_millis, 60_000);
        assert_eq!(config.trust_levels.identity_server, TrustLevel::new(2, 5));
        assert_eq!(config.trust_levels.direct, TrustLevel::new(4, 0)); // default
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "map_size = 4096").unwrap();
        let config = EngineConfig::from_toml_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.map_size, 4096);
    }

    #[test]
    fn missing_file_returns_config_error() {
        let result = EngineConfig::from_toml_file("/nonexistent/veil.toml");
        assert!(matches!(result, Err(IdentityError::Config(_))));
    }
}
