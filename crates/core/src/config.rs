//! Host configuration: defaults, optional TOML file, `FIREFLY_*` overrides.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::codec::DEFAULT_MAX_PAYLOAD_BYTES;
use crate::error::PinError;
use crate::record::Author;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse: {0}")]
    Toml(#[from] toml::de::Error),
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format `{other}`")),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct PinConfig {
    /// JSON-lines file the host persists the ledger to.
    pub ledger_path: Option<PathBuf>,
    /// Authenticated caller identity the host attributes invocations to.
    pub signer: Option<String>,
    /// Membership service provider the signer belongs to, if any.
    pub msp_id: Option<String>,
    /// Upper bound on `pinBatchData` payload blobs.
    pub max_payload_bytes: usize,
    pub log_format: LogFormat,
}

impl Default for PinConfig {
    fn default() -> Self {
        Self {
            ledger_path: None,
            signer: None,
            msp_id: None,
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
            log_format: LogFormat::default(),
        }
    }
}

/// An environment override that could not be parsed and was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedVar {
    pub key: &'static str,
    pub value: String,
    pub reason: String,
}

impl PinConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&raw)?)
    }

    /// Override fields from `FIREFLY_*` variables.
    ///
    /// Unparseable values leave the field untouched and are returned so the
    /// caller can report them once logging is up.
    pub fn apply_env(&mut self) -> Vec<RejectedVar> {
        self.apply_vars(|key| std::env::var(key).ok())
    }

    fn apply_vars(&mut self, var: impl Fn(&str) -> Option<String>) -> Vec<RejectedVar> {
        let mut rejected = Vec::new();
        if let Some(path) = var("FIREFLY_LEDGER_PATH") {
            if !path.trim().is_empty() {
                self.ledger_path = Some(PathBuf::from(path.trim()));
            }
        }
        if let Some(signer) = var("FIREFLY_SIGNER") {
            if !signer.trim().is_empty() {
                self.signer = Some(signer.trim().to_string());
            }
        }
        if let Some(msp_id) = var("FIREFLY_MSP_ID") {
            if !msp_id.trim().is_empty() {
                self.msp_id = Some(msp_id.trim().to_string());
            }
        }
        if let Some(limit) = var("FIREFLY_MAX_PAYLOAD_BYTES") {
            match limit.trim().parse::<usize>() {
                Ok(v) => self.max_payload_bytes = v,
                Err(e) => rejected.push(RejectedVar {
                    key: "FIREFLY_MAX_PAYLOAD_BYTES",
                    value: limit,
                    reason: e.to_string(),
                }),
            }
        }
        if let Some(format) = var("FIREFLY_LOG_FORMAT") {
            match format.parse() {
                Ok(v) => self.log_format = v,
                Err(reason) => rejected.push(RejectedVar {
                    key: "FIREFLY_LOG_FORMAT",
                    value: format,
                    reason,
                }),
            }
        }
        rejected
    }

    /// Caller identity resolved from `signer`, qualified by `msp_id` when set.
    pub fn identity(&self) -> Result<Option<Author>, PinError> {
        match (&self.signer, &self.msp_id) {
            (Some(signer), Some(msp_id)) => Author::from_msp(msp_id, signer).map(Some),
            (Some(signer), None) => Author::new(signer.as_str()).map(Some),
            (None, _) => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = PinConfig::default();
        assert_eq!(config.max_payload_bytes, 1024 * 1024);
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert!(config.signer.is_none());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: PinConfig = toml::from_str(
            r#"
            signer = "Org1MSP::alice"
            log_format = "json"
            "#,
        )
        .unwrap();
        assert_eq!(config.signer.as_deref(), Some("Org1MSP::alice"));
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.max_payload_bytes, DEFAULT_MAX_PAYLOAD_BYTES);
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("firefly.toml");
        std::fs::write(&path, "ledger_path = \"/tmp/pins.jsonl\"\nmax_payload_bytes = 64\n")
            .unwrap();

        let config = PinConfig::from_file(&path).unwrap();
        assert_eq!(config.ledger_path, Some(PathBuf::from("/tmp/pins.jsonl")));
        assert_eq!(config.max_payload_bytes, 64);

        assert!(matches!(
            PinConfig::from_file(&dir.path().join("missing.toml")),
            Err(ConfigError::Io { .. })
        ));
    }

    #[test]
    fn test_env_overrides_and_reports_garbage() {
        let vars: HashMap<&str, &str> = [
            ("FIREFLY_SIGNER", " tz1bob "),
            ("FIREFLY_MAX_PAYLOAD_BYTES", "not-a-number"),
            ("FIREFLY_LOG_FORMAT", "JSON"),
        ]
        .into_iter()
        .collect();

        let mut config = PinConfig::default();
        let rejected = config.apply_vars(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(config.signer.as_deref(), Some("tz1bob"));
        assert_eq!(config.max_payload_bytes, DEFAULT_MAX_PAYLOAD_BYTES);
        assert_eq!(config.log_format, LogFormat::Json);
        assert!(config.ledger_path.is_none());

        assert_eq!(rejected.len(), 1);
        assert_eq!(rejected[0].key, "FIREFLY_MAX_PAYLOAD_BYTES");
        assert_eq!(rejected[0].value, "not-a-number");
        assert!(!rejected[0].reason.is_empty());
    }

    #[test]
    fn test_bad_log_format_is_reported() {
        let mut config = PinConfig::default();
        let rejected = config.apply_vars(|k| (k == "FIREFLY_LOG_FORMAT").then(|| "yaml".to_string()));

        assert_eq!(config.log_format, LogFormat::Pretty);
        assert_eq!(
            rejected,
            vec![RejectedVar {
                key: "FIREFLY_LOG_FORMAT",
                value: "yaml".into(),
                reason: "unknown log format `yaml`".into(),
            }]
        );
    }

    #[test]
    fn test_clean_env_rejects_nothing() {
        let mut config = PinConfig::default();
        assert!(config.apply_vars(|_| None).is_empty());
        assert_eq!(config, PinConfig::default());
    }

    #[test]
    fn test_msp_qualifies_signer_from_any_source() {
        // Signer from the config file, MSP from the environment
        let mut config: PinConfig = toml::from_str("signer = \"alice\"").unwrap();
        config.apply_vars(|k| (k == "FIREFLY_MSP_ID").then(|| "Org1MSP".to_string()));
        assert_eq!(
            config.identity().unwrap().unwrap().as_str(),
            "Org1MSP::alice"
        );

        // Signer from the environment, MSP from the config file
        let mut config: PinConfig = toml::from_str("msp_id = \"Org2MSP\"").unwrap();
        config.apply_vars(|k| (k == "FIREFLY_SIGNER").then(|| "bob".to_string()));
        assert_eq!(config.identity().unwrap().unwrap().as_str(), "Org2MSP::bob");
    }

    #[test]
    fn test_identity_without_signer() {
        let config = PinConfig {
            msp_id: Some("Org1MSP".into()),
            ..PinConfig::default()
        };
        assert!(config.identity().unwrap().is_none());

        let config = PinConfig {
            signer: Some("carol".into()),
            ..PinConfig::default()
        };
        assert_eq!(config.identity().unwrap().unwrap().as_str(), "carol");
    }
}
