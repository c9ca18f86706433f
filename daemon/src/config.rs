//! Service configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use stakequiz_types::StakeParams;

use crate::DaemonError;

/// Configuration for the stakequiz service.
///
/// Can be loaded from a TOML file via [`ServiceConfig::from_toml_file`] or
/// built programmatically (e.g. for tests). CLI flags and environment
/// variables override file values.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Data directory for the LMDB environment.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// LMDB map size in megabytes.
    #[serde(default = "default_map_size_mb")]
    pub map_size_mb: usize,

    /// Port for the HTTP API.
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// Solana JSON-RPC endpoint.
    #[serde(default = "default_solana_rpc_url")]
    pub solana_rpc_url: String,

    /// Hard timeout for ledger reads, in seconds.
    #[serde(default = "default_ledger_timeout_secs")]
    pub ledger_timeout_secs: u64,

    /// Base URL of the QStash-compatible queue.
    #[serde(default = "default_queue_url")]
    pub queue_url: String,

    /// Bearer token for the queue API.
    #[serde(default)]
    pub queue_token: String,

    /// Publicly reachable URL of this service's `/jobs/verify` endpoint,
    /// where the queue delivers jobs.
    #[serde(default)]
    pub consumer_url: String,

    /// Delivery attempts after the first, before dead-lettering.
    #[serde(default = "default_queue_retries")]
    pub queue_retries: u32,

    /// Delay before the first delivery, in seconds.
    #[serde(default = "default_queue_initial_delay_secs")]
    pub queue_initial_delay_secs: u64,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Stake matching parameters.
    #[serde(default)]
    pub stake: StakeParams,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_data_dir() -> PathBuf {
    PathBuf::from("./stakequiz_data")
}

fn default_map_size_mb() -> usize {
    1024
}

fn default_http_port() -> u16 {
    8080
}

fn default_solana_rpc_url() -> String {
    "https://api.mainnet-beta.solana.com".to_string()
}

fn default_ledger_timeout_secs() -> u64 {
    15
}

fn default_queue_url() -> String {
    "https://qstash.upstash.io".to_string()
}

fn default_queue_retries() -> u32 {
    5
}

fn default_queue_initial_delay_secs() -> u64 {
    10
}

fn default_log_format() -> String {
    "human".to_string()
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            map_size_mb: default_map_size_mb(),
            http_port: default_http_port(),
            solana_rpc_url: default_solana_rpc_url(),
            ledger_timeout_secs: default_ledger_timeout_secs(),
            queue_url: default_queue_url(),
            queue_token: String::new(),
            consumer_url: String::new(),
            queue_retries: default_queue_retries(),
            queue_initial_delay_secs: default_queue_initial_delay_secs(),
            log_format: default_log_format(),
            stake: StakeParams::default(),
        }
    }
}

impl ServiceConfig {
    pub fn from_toml_file(path: &Path) -> Result<Self, DaemonError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| DaemonError::Config(format!("reading {}: {e}", path.display())))?;
        toml::from_str(&contents)
            .map_err(|e| DaemonError::Config(format!("parsing {}: {e}", path.display())))
    }

    pub fn map_size_bytes(&self) -> usize {
        self.map_size_mb * 1024 * 1024
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_defaults() {
        let config: ServiceConfig = toml::from_str("").unwrap();
        assert_eq!(config.http_port, 8080);
        assert_eq!(config.map_size_mb, 1024);
        assert!(config.stake.enforce_lockup);
    }

    #[test]
    fn partial_toml_overrides_selectively() {
        let config: ServiceConfig = toml::from_str(
            r#"
            http_port = 9999
            queue_token = "secret"

            [stake]
            validator_vote_account = "5ZWgXcyqrrNpQHCme5SdC5hCeYb2o3fEJhF7Gok3bTVN"
            lockup_custodian = "7Np41oeYqPefeNQEHSv1UDhYrehxin3NStELsSKCT4K2"
            enforce_lockup = false
            "#,
        )
        .unwrap();
        assert_eq!(config.http_port, 9999);
        assert_eq!(config.queue_token, "secret");
        assert!(!config.stake.enforce_lockup);
        assert_eq!(config.stake.questions_per_session, 5);
        // Untouched fields keep their defaults.
        assert_eq!(config.ledger_timeout_secs, 15);
    }

    #[test]
    fn from_toml_file_reports_missing_file() {
        let err = ServiceConfig::from_toml_file(Path::new("/nonexistent/config.toml"))
            .unwrap_err();
        assert!(err.to_string().contains("config"));
    }
}
