//! # Configuration Management
//!
//! Configuration is read from the environment once at startup, validated,
//! and shared read-only afterwards. Nothing reads the environment mid-request.
//!
//! `from_lookup` takes any key lookup so tests can supply a map instead of
//! mutating the process environment.

mod settings;

pub use settings::{
    AppConfig, ObservabilityConfig, PipelineConfig, ServerConfig, DEFAULT_DECRYPT_ARGS,
    DEFAULT_DECRYPT_PROGRAM,
};

use std::fmt::Display;
use std::str::FromStr;

use crate::errors::{Error, Result};
use crate::index::IndexConfig;
use crate::pipeline::DecryptCommand;
use crate::secrets::{SecretString, VaultConfig};
use crate::storage::StorageConfig;

impl AppConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary key lookup and validate it
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(&lookup);

        let server = ServerConfig {
            host: env.string_or("BACKUP_RELAY_BIND_ADDRESS", "0.0.0.0"),
            port: env.parse_or("BACKUP_RELAY_PORT", 8000)?,
        };

        let index = IndexConfig {
            url: env.required("ELASTICSEARCH_URL")?,
            username: env.optional("ELASTICSEARCH_USERNAME"),
            password: env.optional("ELASTICSEARCH_PASSWORD").map(SecretString::from),
            index: env.string_or("ELASTICSEARCH_INDEX", "backups-*"),
            timeout_seconds: env.parse_or("ELASTICSEARCH_TIMEOUT_SECONDS", 5)?,
            insecure_skip_verify: env.bool_or("ELASTICSEARCH_INSECURE_SKIP_VERIFY", false)?,
        };

        let vault = VaultConfig {
            address: env.required("VAULT_ADDR")?,
            token: SecretString::from(env.required("VAULT_TOKEN")?),
            namespace: env.optional("VAULT_NAMESPACE"),
        };

        let storage = StorageConfig {
            endpoint: env.required("STORAGE_URL")?,
            access_key: env.required("STORAGE_ACCESS_KEY")?,
            secret_key: SecretString::from(env.required("STORAGE_SECRET_KEY")?),
            session_token: env.optional("STORAGE_SESSION_TOKEN").map(SecretString::from),
            region: env.string_or("STORAGE_REGION", "us-east-1"),
        };

        let pipeline = PipelineConfig {
            backup_id: env.required("BACKUP_ID")?,
            passphrase_path: env.required("PASSPHRASE_SECRET_PATH")?,
            passphrase_key: env.required("PASSPHRASE_SECRET_KEY")?,
            decrypt_program: env.string_or("DECRYPT_COMMAND", DEFAULT_DECRYPT_PROGRAM),
            decrypt_args: DecryptCommand::parse_args(&env.string_or("DECRYPT_ARGS", DEFAULT_DECRYPT_ARGS)),
            chunk_size: env.parse_or("RELAY_CHUNK_SIZE", crate::pipeline::DEFAULT_CHUNK_SIZE)?,
            deadline_seconds: env.parse_or("PIPELINE_DEADLINE_SECONDS", 3600)?,
        };

        let observability = ObservabilityConfig {
            log_level: env.string_or("BACKUP_RELAY_LOG_LEVEL", "info"),
            json_logging: env.bool_or("BACKUP_RELAY_JSON_LOGS", false)?,
            metrics_port: env.parse_or("BACKUP_RELAY_METRICS_PORT", 0)?,
            ..Default::default()
        };

        let config = Self { server, index, vault, storage, pipeline, observability };
        config.validate()?;
        Ok(config)
    }
}

/// Typed accessors over a key lookup. Blank values count as unset.
struct Env<'a>(&'a dyn Fn(&str) -> Option<String>);

impl Env<'_> {
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
    }

    fn required(&self, key: &str) -> Result<String> {
        self.optional(key).ok_or_else(|| Error::config(format!("{} is required", key)))
    }

    fn string_or(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    fn parse_or<T>(&self, key: &str, default: T) -> Result<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        match self.optional(key) {
            Some(raw) => raw
                .parse()
                .map_err(|e| Error::config(format!("Invalid {} '{}': {}", key, raw, e))),
            None => Ok(default),
        }
    }

    fn bool_or(&self, key: &str, default: bool) -> Result<bool> {
        match self.optional(key).map(|v| v.to_ascii_lowercase()) {
            None => Ok(default),
            Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => Ok(true),
            Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => Ok(false),
            Some(v) => Err(Error::config(format!("Invalid {} '{}': expected a boolean", key, v))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn base_env() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("ELASTICSEARCH_URL", "https://search.internal:9200"),
            ("BACKUP_ID", "b1"),
            ("VAULT_ADDR", "https://vault.internal:8200"),
            ("VAULT_TOKEN", "s.token"),
            ("PASSPHRASE_SECRET_PATH", "secret/data/backups"),
            ("PASSPHRASE_SECRET_KEY", "passphrase"),
            ("STORAGE_URL", "minio.internal:9000"),
            ("STORAGE_ACCESS_KEY", "AKID"),
            ("STORAGE_SECRET_KEY", "storage-secret"),
        ])
    }

    fn load(env: &HashMap<&'static str, &'static str>) -> Result<AppConfig> {
        AppConfig::from_lookup(|key| env.get(key).map(|v| v.to_string()))
    }

    #[test]
    fn test_config_from_lookup_defaults() {
        let config = load(&base_env()).unwrap();
        assert_eq!(config.server.bind_address(), "0.0.0.0:8000");
        assert_eq!(config.index.index, "backups-*");
        assert_eq!(config.index.timeout_seconds, 5);
        assert!(!config.index.insecure_skip_verify);
        assert_eq!(config.storage.region, "us-east-1");
        assert!(config.storage.session_token.is_none());
        assert_eq!(config.pipeline.chunk_size, 1_000_000);
        assert_eq!(config.pipeline.decrypt_program, "gpg");
        assert_eq!(config.observability.metrics_port, 0);
    }

    #[test]
    fn test_config_from_lookup_overrides() {
        let mut env = base_env();
        env.insert("BACKUP_RELAY_PORT", "9000");
        env.insert("RELAY_CHUNK_SIZE", "4096");
        env.insert("PIPELINE_DEADLINE_SECONDS", "0");
        env.insert("DECRYPT_ARGS", "--decrypt --passphrase-fd 3");
        env.insert("ELASTICSEARCH_INSECURE_SKIP_VERIFY", "true");
        env.insert("STORAGE_SESSION_TOKEN", "session-token");

        let config = load(&env).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.pipeline.chunk_size, 4096);
        assert_eq!(config.pipeline.deadline(), None);
        assert_eq!(config.pipeline.decrypt_args, vec!["--decrypt", "--passphrase-fd", "3"]);
        assert!(config.index.insecure_skip_verify);
        assert_eq!(config.storage.session_token.as_ref().map(|t| t.expose_secret()), Some("session-token"));
    }

    #[test]
    fn test_missing_required_value() {
        let mut env = base_env();
        env.remove("BACKUP_ID");
        let err = load(&env).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("BACKUP_ID"));

        let mut env = base_env();
        env.insert("VAULT_TOKEN", "   ");
        assert!(load(&env).is_err());
    }

    #[test]
    fn test_invalid_values_rejected() {
        for (key, value) in [
            ("BACKUP_RELAY_PORT", "not-a-port"),
            ("RELAY_CHUNK_SIZE", "0"),
            ("RELAY_CHUNK_SIZE", "-5"),
            ("BACKUP_RELAY_JSON_LOGS", "maybe"),
        ] {
            let mut env = base_env();
            env.insert(key, value);
            assert!(matches!(load(&env), Err(Error::Config(_))), "{}={}", key, value);
        }
    }

    #[test]
    fn test_config_debug_redacts_credentials() {
        let config = load(&base_env()).unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("s.token"));
        assert!(!debug.contains("storage-secret"));
    }
}
