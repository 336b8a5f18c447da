//! Node configuration, persisted as versioned JSON.
//!
//! The on-disk document carries a `version` field; [`upgrade_json`] migrates
//! older documents in place before deserialization and is a fixed point on
//! current-version documents. Amounts are stored as decimal strings (JSON
//! numbers cannot carry 128 bits), accounts as hex strings.

use crate::error::NodeError;
use serde::{Deserialize, Serialize};
use serde_json::json;
use strand_types::{Account, Amount, NetworkId};

/// Current configuration schema version.
pub const CONFIG_VERSION: u32 = 2;

/// How often the node walks its peer list sending keepalives.
pub const KEEPALIVE_PERIOD_SECS: u64 = 60;
/// Peers silent for this long are purged.
pub const KEEPALIVE_CUTOFF_SECS: u64 = KEEPALIVE_PERIOD_SECS * 5;
/// Announcement sweeps per keepalive period.
pub const ANNOUNCE_SWEEPS_PER_PERIOD: u32 = 16;
/// Cooldown before a peer that failed a bootstrap is retried.
pub const BOOTSTRAP_FAILURE_COOLDOWN_SECS: u64 = 300;

/// Per-category logging toggles, persisted with the node configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub ledger_logging: bool,
    #[serde(default)]
    pub ledger_duplicate_logging: bool,
    #[serde(default)]
    pub vote_logging: bool,
    #[serde(default = "default_true")]
    pub network_logging: bool,
    #[serde(default)]
    pub network_message_logging: bool,
    #[serde(default)]
    pub network_publish_logging: bool,
    #[serde(default)]
    pub network_packet_logging: bool,
    #[serde(default)]
    pub network_keepalive_logging: bool,
    #[serde(default)]
    pub node_lifetime_tracing: bool,
    #[serde(default = "default_true")]
    pub insufficient_work_logging: bool,
    /// Maximum log file size in bytes before the sink rotates.
    #[serde(default = "default_log_max_size")]
    pub max_size: u64,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            ledger_logging: false,
            ledger_duplicate_logging: false,
            vote_logging: false,
            network_logging: true,
            network_message_logging: false,
            network_publish_logging: false,
            network_packet_logging: false,
            network_keepalive_logging: false,
            node_lifetime_tracing: false,
            insufficient_work_logging: true,
            max_size: default_log_max_size(),
        }
    }
}

/// Configuration for a strand node.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    #[serde(default = "default_version")]
    pub version: u32,

    /// Which network this node participates in.
    #[serde(default)]
    pub network: NetworkId,

    /// UDP port for peering.
    #[serde(default = "default_peering_port")]
    pub peering_port: u16,

    /// Worker threads servicing I/O completions.
    #[serde(default = "default_io_threads")]
    pub io_threads: u32,

    /// Threads reserved for work generation (consumed by the external work
    /// provider).
    #[serde(default = "default_io_threads")]
    pub work_threads: u32,

    /// Divisor of online supply for the gap-cache bootstrap threshold.
    #[serde(default = "default_bootstrap_fraction")]
    pub bootstrap_fraction_numerator: u64,

    /// Republish waves for newly observed blocks.
    #[serde(default = "default_creation_rebroadcast")]
    pub creation_rebroadcast: u32,

    /// Delay between republish waves.
    #[serde(default = "default_rebroadcast_delay_ms")]
    pub rebroadcast_delay_ms: u64,

    /// Pacing between outbound datagrams.
    #[serde(default = "default_packet_delay_us")]
    pub packet_delay_microseconds: u64,

    /// Smallest send amount the wallet auto-receives.
    #[serde(with = "amount_string", default = "default_receive_minimum")]
    pub receive_minimum: Amount,

    /// Floor applied to measured online supply when computing quorum.
    #[serde(with = "amount_string", default = "default_amount_zero")]
    pub inactive_supply: Amount,

    /// Wallet password fan-out (held for the wallet facility).
    #[serde(default = "default_password_fanout")]
    pub password_fanout: u32,

    /// Hostnames resolved and contacted at startup.
    #[serde(default)]
    pub preconfigured_peers: Vec<String>,

    /// Representatives whose weight counts toward online supply even while
    /// quiet.
    #[serde(with = "account_hex_vec", default)]
    pub preconfigured_representatives: Vec<Account>,

    /// Remote work providers, as `host:port`.
    #[serde(default)]
    pub work_peers: Vec<String>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_true() -> bool {
    true
}

fn default_log_max_size() -> u64 {
    16 * 1024 * 1024
}

fn default_version() -> u32 {
    CONFIG_VERSION
}

fn default_peering_port() -> u16 {
    NetworkId::Live.default_port()
}

fn default_io_threads() -> u32 {
    4
}

fn default_bootstrap_fraction() -> u64 {
    16
}

fn default_creation_rebroadcast() -> u32 {
    2
}

fn default_rebroadcast_delay_ms() -> u64 {
    50
}

fn default_packet_delay_us() -> u64 {
    5000
}

fn default_receive_minimum() -> Amount {
    Amount::new(1_000_000)
}

fn default_amount_zero() -> Amount {
    Amount::ZERO
}

fn default_password_fanout() -> u32 {
    1024
}

// ── Impl ───────────────────────────────────────────────────────────────

impl NodeConfig {
    /// Defaults for a network profile.
    pub fn new(network: NetworkId) -> Self {
        let mut config = Self {
            version: CONFIG_VERSION,
            network,
            peering_port: network.default_port(),
            io_threads: default_io_threads(),
            work_threads: default_io_threads(),
            bootstrap_fraction_numerator: default_bootstrap_fraction(),
            creation_rebroadcast: default_creation_rebroadcast(),
            rebroadcast_delay_ms: default_rebroadcast_delay_ms(),
            packet_delay_microseconds: default_packet_delay_us(),
            receive_minimum: default_receive_minimum(),
            inactive_supply: Amount::ZERO,
            password_fanout: default_password_fanout(),
            preconfigured_peers: Vec::new(),
            preconfigured_representatives: Vec::new(),
            work_peers: Vec::new(),
            logging: LoggingConfig::default(),
        };
        if network == NetworkId::Live {
            config.preconfigured_peers = vec!["peering.strand.network".to_string()];
        }
        config
    }

    /// Parse a persisted document, migrating older versions first. Returns
    /// the configuration and whether an upgrade was applied (so the caller
    /// can rewrite the file).
    pub fn from_json_str(s: &str) -> Result<(Self, bool), NodeError> {
        let mut value: serde_json::Value =
            serde_json::from_str(s).map_err(|e| NodeError::Config(e.to_string()))?;
        let upgraded = upgrade_json(&mut value);
        let config: Self =
            serde_json::from_value(value).map_err(|e| NodeError::Config(e.to_string()))?;
        Ok((config, upgraded))
    }

    pub fn to_json_string(&self) -> Result<String, NodeError> {
        serde_json::to_string_pretty(self).map_err(|e| NodeError::Config(e.to_string()))
    }

    pub fn from_json_file(path: &std::path::Path) -> Result<(Self, bool), NodeError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn save_json_file(&self, path: &std::path::Path) -> Result<(), NodeError> {
        std::fs::write(path, self.to_json_string()?)?;
        Ok(())
    }

    pub fn keepalive_period_secs(&self) -> u64 {
        KEEPALIVE_PERIOD_SECS
    }

    pub fn keepalive_cutoff_secs(&self) -> u64 {
        KEEPALIVE_CUTOFF_SECS
    }

    /// Interval between announcement sweeps (16 per keepalive period).
    pub fn announce_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(
            KEEPALIVE_PERIOD_SECS * 1000 / ANNOUNCE_SWEEPS_PER_PERIOD as u64,
        )
    }
}

/// Migrate an on-disk configuration document to [`CONFIG_VERSION`] in place.
/// Returns `true` iff the document changed; current-version documents are a
/// fixed point.
pub fn upgrade_json(value: &mut serde_json::Value) -> bool {
    let Some(object) = value.as_object_mut() else {
        return false;
    };
    let version = object
        .get("version")
        .and_then(|v| v.as_u64())
        .unwrap_or(1) as u32;
    if version >= CONFIG_VERSION {
        return false;
    }

    // Version 1 predates remote work providers and the per-category vote
    // logging toggle.
    if version < 2 {
        object.entry("work_peers").or_insert_with(|| json!([]));
        if let Some(logging) = object.get_mut("logging").and_then(|l| l.as_object_mut()) {
            logging.entry("vote_logging").or_insert(json!(false));
        }
    }

    object.insert("version".into(), json!(CONFIG_VERSION));
    true
}

// ── Serde codecs ───────────────────────────────────────────────────────

mod amount_string {
    use serde::{Deserialize, Deserializer, Serializer};
    use strand_types::Amount;

    pub fn serialize<S: Serializer>(amount: &Amount, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&amount.raw().to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Amount, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse::<u128>()
            .map(Amount::new)
            .map_err(serde::de::Error::custom)
    }
}

mod account_hex_vec {
    use serde::{Deserialize, Deserializer, Serializer};
    use strand_types::Account;

    pub fn serialize<S: Serializer>(
        accounts: &[Account],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(accounts.iter().map(|a| a.to_string()))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<Account>, D::Error> {
        let raw = Vec::<String>::deserialize(deserializer)?;
        raw.into_iter()
            .map(|s| s.parse::<Account>().map_err(serde::de::Error::custom))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_json() {
        let config = NodeConfig::new(NetworkId::Beta);
        let json = config.to_json_string().unwrap();
        let (parsed, upgraded) = NodeConfig::from_json_str(&json).unwrap();
        assert!(!upgraded);
        assert_eq!(parsed, config);
    }

    #[test]
    fn network_selects_port() {
        assert_eq!(NodeConfig::new(NetworkId::Live).peering_port, 7075);
        assert_eq!(NodeConfig::new(NetworkId::Beta).peering_port, 54000);
    }

    #[test]
    fn minimal_document_uses_defaults() {
        let (config, _) = NodeConfig::from_json_str("{}").unwrap();
        assert_eq!(config.bootstrap_fraction_numerator, 16);
        assert_eq!(config.creation_rebroadcast, 2);
        assert_eq!(config.io_threads, 4);
        assert_eq!(config.password_fanout, 1024);
        assert!(config.logging.network_logging);
    }

    #[test]
    fn amounts_persist_as_strings() {
        let mut config = NodeConfig::new(NetworkId::Test);
        config.inactive_supply = Amount::new(u128::MAX);
        let json = config.to_json_string().unwrap();
        assert!(json.contains(&u128::MAX.to_string()));
        let (parsed, _) = NodeConfig::from_json_str(&json).unwrap();
        assert_eq!(parsed.inactive_supply, Amount::new(u128::MAX));
    }

    #[test]
    fn representatives_persist_as_hex() {
        let mut config = NodeConfig::new(NetworkId::Test);
        config.preconfigured_representatives = vec![Account::new([0xAB; 32])];
        let json = config.to_json_string().unwrap();
        let (parsed, _) = NodeConfig::from_json_str(&json).unwrap();
        assert_eq!(parsed.preconfigured_representatives, vec![Account::new([0xAB; 32])]);
    }

    #[test]
    fn bad_representative_hex_is_an_error() {
        let json = r#"{ "preconfigured_representatives": ["zz"] }"#;
        assert!(NodeConfig::from_json_str(json).is_err());
    }

    #[test]
    fn version_1_documents_are_upgraded() {
        let v1 = r#"{
            "version": 1,
            "peering_port": 54000,
            "logging": { "network_logging": true }
        }"#;
        let (config, upgraded) = NodeConfig::from_json_str(v1).unwrap();
        assert!(upgraded);
        assert_eq!(config.version, CONFIG_VERSION);
        assert_eq!(config.peering_port, 54000);
        assert!(config.work_peers.is_empty());
        assert!(!config.logging.vote_logging);
    }

    #[test]
    fn upgrade_is_a_fixed_point() {
        let config = NodeConfig::new(NetworkId::Live);
        let mut value = serde_json::to_value(&config).unwrap();
        assert!(!upgrade_json(&mut value));
        let again = value.clone();
        upgrade_json(&mut value);
        assert_eq!(value, again);
    }

    #[test]
    fn announce_interval_is_a_sixteenth_of_the_period() {
        let config = NodeConfig::new(NetworkId::Test);
        assert_eq!(config.announce_interval().as_millis(), 3750);
    }

    proptest::proptest! {
        /// Any serialized current-version document is a fixed point of
        /// `upgrade_json` and survives the round trip unchanged.
        #[test]
        fn serialized_configs_are_upgrade_fixed_points(
            port in proptest::prelude::any::<u16>(),
            io_threads in 1u32..64,
            supply in proptest::prelude::any::<u128>(),
        ) {
            let mut config = NodeConfig::new(NetworkId::Test);
            config.peering_port = port;
            config.io_threads = io_threads;
            config.inactive_supply = Amount::new(supply);

            let json = config.to_json_string().unwrap();
            let mut value: serde_json::Value = serde_json::from_str(&json).unwrap();
            proptest::prop_assert!(!upgrade_json(&mut value));

            let (parsed, upgraded) = NodeConfig::from_json_str(&json).unwrap();
            proptest::prop_assert!(!upgraded);
            proptest::prop_assert_eq!(parsed, config);
        }
    }
}
