//! Configuration management for herakles-traffic-agent.
//!
//! This module handles loading and validating the agent configuration. The file
//! format is chosen by extension (YAML by default, JSON or TOML), deserialized
//! into raw structures and then converted into the validated [`Config`] that the
//! supervisor consumes. A target whose settings are malformed is skipped with a
//! warning; a missing API key, host or host id is fatal.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::counters;

// Default configuration constants
pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";
pub const DEFAULT_API_BASE: &str = "https://api.mackerelio.com/";
pub const DEFAULT_SNMP_PORT: u16 = 161;
pub const API_KEY_ENV: &str = "MACKEREL_APIKEY";
pub const API_BASE_ENV: &str = "MACKEREL_APIBASE";

const REDACTED: &str = "********";

static METRIC_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9._-]+$").expect("static metric name regex"));

/// Errors that abort loading a configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("x-api-key is needed")]
    MissingApiKey,

    #[error("collector[{index}]: {field} is needed")]
    MissingField { index: usize, field: &'static str },
}

/// Problems that make a single target unusable. The target is skipped.
#[derive(Debug, thiserror::Error)]
pub enum TargetError {
    #[error("community is needed")]
    MissingCommunity,

    #[error("invalid snmp protocol version (v2c, v3): {0}")]
    InvalidVersion(String),

    #[error("snmpv3 settings are needed for version v3")]
    MissingV3Settings,

    #[error("snmpv3 username is needed")]
    MissingUsername,

    #[error("invalid snmpv3 security level (noauth, auth, priv): {0}")]
    InvalidSecurityLevel(String),

    #[error("invalid snmpv3 auth protocol: {0}")]
    InvalidAuthProtocol(String),

    #[error("invalid snmpv3 privacy protocol: {0}")]
    InvalidPrivacyProtocol(String),

    #[error("interface.include and interface.exclude are exclusive")]
    ExclusiveInterfaceFilter,

    #[error("invalid interface pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("unknown counter: {0}")]
    UnknownCounter(String),

    #[error("metric-name is not valid: {0}")]
    InvalidMetricName(String),

    #[error("mib is not a valid OID: {0}")]
    InvalidOid(String),
}

// ---------------------------------------------------------------------------
// Raw file structures
// ---------------------------------------------------------------------------

/// Agent runtime settings. Every field has a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AgentSettings {
    /// Period of the metric poll per target (default: 60)
    #[serde(default = "default_poll_interval_seconds")]
    pub poll_interval_seconds: u64,

    /// Period of the interface inventory poll per target (default: 3h)
    #[serde(default = "default_metadata_interval_seconds")]
    pub metadata_interval_seconds: u64,

    /// Deadline for graceful shutdown, including queue drain (default: 60)
    #[serde(default = "default_shutdown_timeout_seconds")]
    pub shutdown_timeout_seconds: u64,

    /// Window over which worker startup is spread (default: 55)
    #[serde(default = "default_startup_settle_seconds")]
    pub startup_settle_seconds: u64,

    /// Smallest gap between two startup launches (default: 30ms)
    #[serde(default = "default_startup_min_interval_ms")]
    pub startup_min_interval_ms: u64,

    /// Largest gap between two startup launches (default: 300ms)
    #[serde(default = "default_startup_max_interval_ms")]
    pub startup_max_interval_ms: u64,

    /// Timeout of a single SNMP request (default: 10)
    #[serde(default = "default_snmp_timeout_seconds")]
    pub snmp_timeout_seconds: u64,

    /// Queue backlog (messages) at which a warning is logged (default: 1000)
    #[serde(default = "default_queue_warn_backlog")]
    pub queue_warn_backlog: usize,

    /// Queue backlog (messages) considered critical (default: 10000)
    #[serde(default = "default_queue_critical_backlog")]
    pub queue_critical_backlog: usize,
}

fn default_poll_interval_seconds() -> u64 {
    60
}
fn default_metadata_interval_seconds() -> u64 {
    3 * 60 * 60
}
fn default_shutdown_timeout_seconds() -> u64 {
    60
}
fn default_startup_settle_seconds() -> u64 {
    55
}
fn default_startup_min_interval_ms() -> u64 {
    30
}
fn default_startup_max_interval_ms() -> u64 {
    300
}
fn default_snmp_timeout_seconds() -> u64 {
    10
}
fn default_queue_warn_backlog() -> usize {
    1000
}
fn default_queue_critical_backlog() -> usize {
    10_000
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            poll_interval_seconds: default_poll_interval_seconds(),
            metadata_interval_seconds: default_metadata_interval_seconds(),
            shutdown_timeout_seconds: default_shutdown_timeout_seconds(),
            startup_settle_seconds: default_startup_settle_seconds(),
            startup_min_interval_ms: default_startup_min_interval_ms(),
            startup_max_interval_ms: default_startup_max_interval_ms(),
            snmp_timeout_seconds: default_snmp_timeout_seconds(),
            queue_warn_backlog: default_queue_warn_backlog(),
            queue_critical_backlog: default_queue_critical_backlog(),
        }
    }
}

impl AgentSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds.max(1))
    }

    pub fn metadata_interval(&self) -> Duration {
        Duration::from_secs(self.metadata_interval_seconds.max(1))
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_seconds)
    }

    pub fn startup_settle(&self) -> Duration {
        Duration::from_secs(self.startup_settle_seconds)
    }

    pub fn startup_min_interval(&self) -> Duration {
        Duration::from_millis(self.startup_min_interval_ms)
    }

    pub fn startup_max_interval(&self) -> Duration {
        Duration::from_millis(self.startup_max_interval_ms)
    }

    pub fn snmp_timeout(&self) -> Duration {
        Duration::from_secs(self.snmp_timeout_seconds.max(1))
    }
}

/// Configuration file as written by the operator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawConfig {
    #[serde(rename = "x-api-key", default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(rename = "api-base", default, skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,

    #[serde(default)]
    pub agent: AgentSettings,

    #[serde(default)]
    pub collector: Vec<RawTarget>,
}

/// One `collector` entry. Plain values precede nested tables so the structure
/// also serializes to TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RawTarget {
    #[serde(default)]
    pub host_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(default)]
    pub host: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub community: String,
    #[serde(default)]
    pub mibs: Vec<String>,
    #[serde(default)]
    pub skip_linkdown: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snmpv3: Option<RawSnmpV3>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interface: Option<RawInterfaceFilter>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub custom_mibs: Vec<RawCustomGroup>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RawSnmpV3 {
    /// noauth | auth | priv
    #[serde(default)]
    pub security: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub auth_protocol: String,
    #[serde(default)]
    pub auth_password: String,
    #[serde(default)]
    pub priv_protocol: String,
    #[serde(default)]
    pub priv_password: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawInterfaceFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RawCustomGroup {
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub mibs: Vec<RawCustomCounter>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RawCustomCounter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub metric_name: String,
    pub mib: String,
}

impl RawConfig {
    /// Copy of the configuration with every secret replaced, for display.
    pub fn redacted(&self) -> RawConfig {
        let mut out = self.clone();
        if out.api_key.is_some() {
            out.api_key = Some(REDACTED.into());
        }
        for target in &mut out.collector {
            if !target.community.is_empty() {
                target.community = REDACTED.into();
            }
            if let Some(v3) = target.snmpv3.as_mut() {
                if !v3.auth_password.is_empty() {
                    v3.auth_password = REDACTED.into();
                }
                if !v3.priv_password.is_empty() {
                    v3.priv_password = REDACTED.into();
                }
            }
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Validated structures
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityLevel {
    NoAuthNoPriv,
    AuthNoPriv,
    AuthPriv,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthProtocol {
    NoAuth,
    Md5,
    Sha,
    Sha224,
    Sha256,
    Sha384,
    Sha512,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrivacyProtocol {
    NoPriv,
    Des,
    Aes,
    Aes192,
    Aes256,
}

/// SNMPv3 user security parameters.
#[derive(Clone, PartialEq, Eq)]
pub struct V3Credentials {
    pub security: SecurityLevel,
    pub username: String,
    pub auth_protocol: AuthProtocol,
    pub auth_passphrase: String,
    pub privacy_protocol: PrivacyProtocol,
    pub privacy_passphrase: String,
}

impl fmt::Debug for V3Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("V3Credentials")
            .field("security", &self.security)
            .field("username", &self.username)
            .field("auth_protocol", &self.auth_protocol)
            .field("privacy_protocol", &self.privacy_protocol)
            .finish_non_exhaustive()
    }
}

/// The two mutually exclusive protocol-version credential forms.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    V2c { community: String },
    V3(V3Credentials),
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::V2c { .. } => f.write_str("V2c { community: \"********\" }"),
            Credentials::V3(v3) => f.debug_tuple("V3").field(v3).finish(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnmpConnection {
    pub host: String,
    pub port: u16,
    pub credentials: Credentials,
}

impl SnmpConnection {
    /// `host:port`, bracketing IPv6 literals. Also the connection lock key.
    pub fn address(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

/// Interface-name selection rule.
#[derive(Debug, Clone, Default)]
pub enum InterfaceFilter {
    #[default]
    All,
    Include(Regex),
    Exclude(Regex),
}

impl InterfaceFilter {
    pub fn admits(&self, name: &str) -> bool {
        match self {
            InterfaceFilter::All => true,
            InterfaceFilter::Include(re) => re.is_match(name),
            InterfaceFilter::Exclude(re) => !re.is_match(name),
        }
    }
}

/// One operator defined counter read by plain GET.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomCounter {
    /// Fully qualified metric name under which the value is posted.
    pub metric_name: String,
    pub oid: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphDefMetric {
    pub name: String,
    pub display_name: String,
    pub is_stacked: bool,
}

/// Graph definition pushed upstream for one custom counter group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphDef {
    pub name: String,
    pub display_name: String,
    pub unit: String,
    pub metrics: Vec<GraphDefMetric>,
}

/// A validated polling target. Immutable once built; reload replaces it.
#[derive(Debug, Clone)]
pub struct TargetConfig {
    pub host_id: String,
    pub hostname: Option<String>,
    pub connection: SnmpConnection,
    pub counters: Vec<String>,
    pub interface_filter: InterfaceFilter,
    pub skip_down_interfaces: bool,
    pub custom_counters: Vec<CustomCounter>,
    pub graph_defs: Vec<GraphDef>,
}

impl TargetConfig {
    /// Identity used to match targets across reloads.
    pub fn id(&self) -> String {
        target_id(&self.connection.host, self.connection.port, &self.host_id)
    }

    /// Name reported upstream for the host.
    pub fn display_hostname(&self) -> &str {
        self.hostname
            .as_deref()
            .filter(|h| !h.is_empty())
            .unwrap_or(&self.connection.host)
    }

    /// Mapping of posted metric name to OID for the custom counters.
    pub fn custom_metric_oids(&self) -> BTreeMap<String, String> {
        self.custom_counters
            .iter()
            .map(|c| (c.metric_name.clone(), c.oid.clone()))
            .collect()
    }
}

pub fn target_id(host: &str, port: u16, host_id: &str) -> String {
    format!("host={},port={},hostID={}", host, port, host_id)
}

/// Validated configuration.
#[derive(Clone)]
pub struct Config {
    pub api_key: String,
    pub api_base: String,
    pub agent: AgentSettings,
    pub targets: Vec<Arc<TargetConfig>>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &REDACTED)
            .field("api_base", &self.api_base)
            .field("agent", &self.agent)
            .field("targets", &self.targets)
            .finish()
    }
}

impl Config {
    /// Converts a raw file into a validated configuration.
    ///
    /// `env_api_key` / `env_api_base` take precedence over the file values.
    pub fn from_raw(
        raw: RawConfig,
        env_api_key: Option<String>,
        env_api_base: Option<String>,
    ) -> Result<Config, ConfigError> {
        let api_key = env_api_key
            .filter(|k| !k.is_empty())
            .or(raw.api_key)
            .filter(|k| !k.is_empty())
            .ok_or(ConfigError::MissingApiKey)?;

        let api_base = env_api_base
            .filter(|b| !b.is_empty())
            .or(raw.api_base)
            .filter(|b| !b.is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());

        let mut targets = Vec::with_capacity(raw.collector.len());
        for (index, target) in raw.collector.iter().enumerate() {
            if target.host.is_empty() {
                return Err(ConfigError::MissingField {
                    index,
                    field: "host",
                });
            }
            if target.host_id.is_empty() {
                return Err(ConfigError::MissingField {
                    index,
                    field: "host-id",
                });
            }
            match convert_target(target) {
                Ok(t) => targets.push(Arc::new(t)),
                Err(e) => {
                    warn!(
                        "Skipped collector[{}] ({}) because config is invalid: {}",
                        index, target.host, e
                    );
                }
            }
        }

        Ok(Config {
            api_key,
            api_base,
            agent: raw.agent,
            targets,
        })
    }
}

fn parse_security_level(v: &str) -> Result<SecurityLevel, TargetError> {
    match v.to_ascii_lowercase().as_str() {
        "noauth" => Ok(SecurityLevel::NoAuthNoPriv),
        "auth" => Ok(SecurityLevel::AuthNoPriv),
        "priv" => Ok(SecurityLevel::AuthPriv),
        _ => Err(TargetError::InvalidSecurityLevel(v.to_string())),
    }
}

fn parse_auth_protocol(v: &str) -> Result<AuthProtocol, TargetError> {
    match v.to_ascii_lowercase().as_str() {
        "" | "noauth" => Ok(AuthProtocol::NoAuth),
        "md5" => Ok(AuthProtocol::Md5),
        "sha" => Ok(AuthProtocol::Sha),
        "sha224" => Ok(AuthProtocol::Sha224),
        "sha256" => Ok(AuthProtocol::Sha256),
        "sha384" => Ok(AuthProtocol::Sha384),
        "sha512" => Ok(AuthProtocol::Sha512),
        _ => Err(TargetError::InvalidAuthProtocol(v.to_string())),
    }
}

fn parse_privacy_protocol(v: &str) -> Result<PrivacyProtocol, TargetError> {
    match v.to_ascii_lowercase().as_str() {
        "" | "nopriv" => Ok(PrivacyProtocol::NoPriv),
        "des" => Ok(PrivacyProtocol::Des),
        "aes" => Ok(PrivacyProtocol::Aes),
        "aes192" => Ok(PrivacyProtocol::Aes192),
        "aes256" => Ok(PrivacyProtocol::Aes256),
        _ => Err(TargetError::InvalidPrivacyProtocol(v.to_string())),
    }
}

fn convert_credentials(t: &RawTarget) -> Result<Credentials, TargetError> {
    match t.version.as_str() {
        "" | "v2c" => {
            if t.community.is_empty() {
                return Err(TargetError::MissingCommunity);
            }
            Ok(Credentials::V2c {
                community: t.community.clone(),
            })
        }
        "v3" => {
            let v3 = t.snmpv3.as_ref().ok_or(TargetError::MissingV3Settings)?;
            if v3.username.is_empty() {
                return Err(TargetError::MissingUsername);
            }
            Ok(Credentials::V3(V3Credentials {
                security: parse_security_level(&v3.security)?,
                username: v3.username.clone(),
                auth_protocol: parse_auth_protocol(&v3.auth_protocol)?,
                auth_passphrase: v3.auth_password.clone(),
                privacy_protocol: parse_privacy_protocol(&v3.priv_protocol)?,
                privacy_passphrase: v3.priv_password.clone(),
            }))
        }
        other => Err(TargetError::InvalidVersion(other.to_string())),
    }
}

fn convert_interface_filter(
    filter: Option<&RawInterfaceFilter>,
) -> Result<InterfaceFilter, TargetError> {
    let Some(filter) = filter else {
        return Ok(InterfaceFilter::All);
    };
    match (&filter.include, &filter.exclude) {
        (Some(_), Some(_)) => Err(TargetError::ExclusiveInterfaceFilter),
        (Some(include), None) => Ok(InterfaceFilter::Include(Regex::new(include)?)),
        (None, Some(exclude)) => Ok(InterfaceFilter::Exclude(Regex::new(exclude)?)),
        (None, None) => Ok(InterfaceFilter::All),
    }
}

/// Graph name for a custom counter group: `custom.custommibs.<md5(display-name)>`.
pub fn custom_graph_name(display_name: &str) -> String {
    format!("custom.custommibs.{:x}", md5::compute(display_name.as_bytes()))
}

/// Metric name of one counter inside a custom group.
pub fn custom_metric_name(display_name: &str, metric_name: &str) -> String {
    format!("{}.{}", custom_graph_name(display_name), metric_name)
}

/// Expands one custom counter group into its counters and graph definition.
pub fn convert_custom_group(
    group: &RawCustomGroup,
) -> Result<(Vec<CustomCounter>, GraphDef), TargetError> {
    let mut counters = Vec::with_capacity(group.mibs.len());
    let mut metrics = Vec::with_capacity(group.mibs.len());

    for entry in &group.mibs {
        if !METRIC_NAME_RE.is_match(&entry.metric_name) {
            return Err(TargetError::InvalidMetricName(entry.metric_name.clone()));
        }
        if !counters::is_valid_oid(&entry.mib) {
            return Err(TargetError::InvalidOid(entry.mib.clone()));
        }

        let name = custom_metric_name(&group.display_name, &entry.metric_name);
        metrics.push(GraphDefMetric {
            name: name.clone(),
            display_name: entry
                .display_name
                .clone()
                .filter(|d| !d.is_empty())
                .unwrap_or_else(|| entry.metric_name.clone()),
            is_stacked: false,
        });
        counters.push(CustomCounter {
            metric_name: name,
            oid: entry.mib.clone(),
        });
    }

    let graph = GraphDef {
        name: custom_graph_name(&group.display_name),
        display_name: group.display_name.clone(),
        unit: group.unit.clone(),
        metrics,
    };
    Ok((counters, graph))
}

fn convert_target(t: &RawTarget) -> Result<TargetConfig, TargetError> {
    let credentials = convert_credentials(t)?;
    let interface_filter = convert_interface_filter(t.interface.as_ref())?;
    // sorted so that an unchanged list compares equal across reloads
    let counters = counters::validate(&t.mibs).map_err(TargetError::UnknownCounter)?;

    let mut custom_counters = Vec::new();
    let mut graph_defs = Vec::new();
    for group in &t.custom_mibs {
        let (c, g) = convert_custom_group(group)?;
        custom_counters.extend(c);
        graph_defs.push(g);
    }

    Ok(TargetConfig {
        host_id: t.host_id.clone(),
        hostname: t.hostname.clone(),
        connection: SnmpConnection {
            host: t.host.clone(),
            port: t.port.filter(|p| *p != 0).unwrap_or(DEFAULT_SNMP_PORT),
            credentials,
        },
        counters,
        interface_filter,
        skip_down_interfaces: t.skip_linkdown,
        custom_counters,
        graph_defs,
    })
}

/// Reads and deserializes a configuration file, choosing the format by extension.
pub fn load_raw_config(path: &Path) -> Result<RawConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let raw = match path.extension().and_then(|s| s.to_str()) {
        Some("json") => serde_json::from_str(&content)?,
        Some("toml") => toml::from_str(&content)?,
        // Default to YAML
        _ => serde_yaml::from_str(&content)?,
    };
    Ok(raw)
}

/// Loads and validates the configuration at `path`, applying environment overrides.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let raw = load_raw_config(path)?;
    let config = Config::from_raw(
        raw,
        std::env::var(API_KEY_ENV).ok(),
        std::env::var(API_BASE_ENV).ok(),
    )?;
    info!(
        "Loaded configuration from {} ({} targets)",
        path.display(),
        config.targets.len()
    );
    Ok(config)
}

/// Source the supervisor re-reads on reload.
pub trait ConfigSource: Send + Sync {
    fn load(&self) -> Result<Config, ConfigError>;
}

/// Re-reads the original configuration file.
pub struct FileConfigSource {
    path: PathBuf,
}

impl FileConfigSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ConfigSource for FileConfigSource {
    fn load(&self) -> Result<Config, ConfigError> {
        load_config(&self.path)
    }
}
