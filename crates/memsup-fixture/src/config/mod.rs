//! Fixture configuration.
//!
//! A [`FixtureConfig`] is built once (defaults, then an optional YAML file,
//! then `MEMSUP_*` environment overrides), validated, and handed to the
//! supervisor by value. It is never mutated afterwards.

use anyhow::{Context, Result};
use memsup_common::{ConfigError, ConfigResult};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::OnceLock;
use std::time::Duration;

use crate::terminator::PortMatching;

pub mod validation;

/// Placeholder the legacy harness used for "no certificate folder".
const CERT_FOLDER_UNSET: &str = "not specified";

/// Everything the supervisor needs to know about the server under test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureConfig {
    /// Full path of the server binary.
    #[serde(default = "default_server_bin")]
    pub server_bin: String,

    /// Command name as shown by `ps -C`; used to find instances at teardown.
    #[serde(default = "default_server_name")]
    pub server_name: String,

    #[serde(default)]
    pub server_version: EngineVersion,

    #[serde(default)]
    pub server_type: ServerType,

    /// Folder holding `public.cert` and `private.cert`. TLS is on iff set.
    #[serde(
        default,
        deserialize_with = "deserialize_cert_folder",
        skip_serializing_if = "Option::is_none"
    )]
    pub cert_folder: Option<PathBuf>,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_ipv4_addr")]
    pub ipv4_addr: String,

    #[serde(default = "default_ipv6_addr")]
    pub ipv6_addr: String,

    #[serde(default)]
    pub test_type: TestType,

    #[serde(default)]
    pub client_mode: ClientMode,

    /// Value passed to the server's `-m` flag.
    #[serde(default = "default_memory_limit")]
    pub memory_limit: u32,

    /// How long to wait before inspecting a fresh server's stderr.
    #[serde(default = "default_startup_grace", with = "duration_serde")]
    pub startup_grace: Duration,

    #[serde(default)]
    pub port_matching: PortMatching,
}

impl Default for FixtureConfig {
    fn default() -> Self {
        Self {
            server_bin: default_server_bin(),
            server_name: default_server_name(),
            server_version: EngineVersion::default(),
            server_type: ServerType::default(),
            cert_folder: None,
            port: default_port(),
            ipv4_addr: default_ipv4_addr(),
            ipv6_addr: default_ipv6_addr(),
            test_type: TestType::default(),
            client_mode: ClientMode::default(),
            memory_limit: default_memory_limit(),
            startup_grace: default_startup_grace(),
            port_matching: PortMatching::default(),
        }
    }
}

impl FixtureConfig {
    /// Load configuration from a YAML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        Self::load_from_string(&content)
    }

    /// Load configuration from a YAML string
    pub fn load_from_string(content: &str) -> Result<Self> {
        let config: FixtureConfig =
            serde_yaml::from_str(content).context("Failed to parse YAML configuration")?;

        config.validate()?;
        Ok(config)
    }

    /// Defaults, then the optional file, then the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::load_from_file(path)?,
            None => Self::default(),
        };
        config
            .apply_overrides(|key| std::env::var(key).ok())
            .context("Invalid MEMSUP_* environment override")?;
        config.validate()?;
        Ok(config)
    }

    /// Applies `MEMSUP_*` overrides looked up through `lookup`.
    ///
    /// Taking the lookup as a function keeps tests away from the real
    /// process environment.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("MEMSUP_SERVER_BIN") {
            self.server_bin = v;
        }
        if let Some(v) = lookup("MEMSUP_SERVER_NAME") {
            self.server_name = v;
        }
        if let Some(v) = lookup("MEMSUP_SERVER_VERSION") {
            self.server_version = v.parse()?;
        }
        if let Some(v) = lookup("MEMSUP_SERVER_TYPE") {
            self.server_type = v.parse()?;
        }
        if let Some(v) = lookup("MEMSUP_CERT_FOLDER") {
            self.cert_folder = cert_folder_from(&v);
        }
        if let Some(v) = lookup("MEMSUP_PORT") {
            self.port = parse_number("MEMSUP_PORT", &v)?;
        }
        if let Some(v) = lookup("MEMSUP_ADDRESS_V4") {
            self.ipv4_addr = v;
        }
        if let Some(v) = lookup("MEMSUP_ADDRESS_V6") {
            self.ipv6_addr = v;
        }
        if let Some(v) = lookup("MEMSUP_TEST_TYPE") {
            self.test_type = v.parse()?;
        }
        if let Some(v) = lookup("MEMSUP_CLIENT_MODE") {
            self.client_mode = v.parse()?;
        }
        if let Some(v) = lookup("MEMSUP_MEMORY_LIMIT") {
            self.memory_limit = parse_number("MEMSUP_MEMORY_LIMIT", &v)?;
        }
        if let Some(v) = lookup("MEMSUP_STARTUP_GRACE") {
            self.startup_grace = duration_serde::parse_duration(&v)
                .map_err(|reason| ConfigError::invalid_value("MEMSUP_STARTUP_GRACE", &v, reason))?;
        }
        if let Some(v) = lookup("MEMSUP_PORT_MATCHING") {
            self.port_matching = v.parse()?;
        }
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }

    pub fn is_tls_mode(&self) -> bool {
        self.cert_folder.is_some()
    }

    /// Clients talk to fixtures by IP, so hostname checks are off under TLS.
    pub fn skip_tls_hostname_verification(&self) -> bool {
        self.is_tls_mode()
    }

    pub fn is_ci_test(&self) -> bool {
        self.test_type == TestType::Ci
    }

    pub fn is_elasticache(&self) -> bool {
        self.server_type == ServerType::ElastiCache
    }

    /// IPv6 address to use for the server.
    ///
    /// When only a non-loopback IPv4 address was configured, the IPv4-mapped
    /// form `::ffff:<ipv4>` is used so both address families reach the same
    /// host.
    pub fn resolved_ipv6_addr(&self) -> String {
        let loopback_v4 = self.ipv4_addr == "127.0.0.1" || self.ipv4_addr == "localhost";
        if !loopback_v4 && self.ipv6_addr == "::1" {
            format!("::ffff:{}", self.ipv4_addr)
        } else {
            self.ipv6_addr.clone()
        }
    }

    /// True when the IPv6 address is just the mapped IPv4 one.
    pub fn default_to_ipv4(&self) -> bool {
        self.resolved_ipv6_addr() == format!("::ffff:{}", self.ipv4_addr)
    }
}

fn parse_number<T: FromStr>(key: &str, value: &str) -> ConfigResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::invalid_value(key, value, "not a valid number"))
}

// ==============================================================================
// Enumerations
// ==============================================================================

/// Supported memcached engine versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum EngineVersion {
    #[default]
    V1_4_24,
    V1_4_14,
    V1_4_5,
    V1_5_10,
    V1_5_16,
}

impl EngineVersion {
    pub const ALL: [EngineVersion; 5] = [
        Self::V1_4_24,
        Self::V1_4_14,
        Self::V1_4_5,
        Self::V1_5_10,
        Self::V1_5_16,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::V1_4_24 => "1.4.24",
            Self::V1_4_14 => "1.4.14",
            Self::V1_4_5 => "1.4.5",
            Self::V1_5_10 => "1.5.10",
            Self::V1_5_16 => "1.5.16",
        }
    }

    /// Whether the engine understands `config set`.
    pub fn supports_set_config(&self) -> bool {
        !matches!(self, Self::V1_4_5)
    }
}

impl FromStr for EngineVersion {
    type Err = ConfigError;

    fn from_str(s: &str) -> ConfigResult<Self> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| ConfigError::unsupported_engine(s))
    }
}

impl TryFrom<String> for EngineVersion {
    type Error = ConfigError;

    fn try_from(s: String) -> ConfigResult<Self> {
        s.parse()
    }
}

impl From<EngineVersion> for String {
    fn from(v: EngineVersion) -> Self {
        v.as_str().to_string()
    }
}

impl fmt::Display for EngineVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Flavour of the server under test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerType {
    #[default]
    Oss,
    ElastiCache,
}

impl FromStr for ServerType {
    type Err = ConfigError;

    fn from_str(s: &str) -> ConfigResult<Self> {
        match s.trim().to_lowercase().as_str() {
            "oss" => Ok(Self::Oss),
            "elasticache" => Ok(Self::ElastiCache),
            _ => Err(ConfigError::invalid_value("server_type", s, "expected oss or elasticache")),
        }
    }
}

/// Which suite is running; CI runs get the slow tests too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestType {
    #[default]
    Unit,
    Ci,
}

impl FromStr for TestType {
    type Err = ConfigError;

    fn from_str(s: &str) -> ConfigResult<Self> {
        match s.trim().to_lowercase().as_str() {
            "unit" => Ok(Self::Unit),
            "ci" => Ok(Self::Ci),
            _ => Err(ConfigError::invalid_value("test_type", s, "expected unit or ci")),
        }
    }
}

/// How clients under test discover servers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientMode {
    #[default]
    Static,
    Dynamic,
}

impl FromStr for ClientMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> ConfigResult<Self> {
        match s.trim().to_lowercase().as_str() {
            "static" => Ok(Self::Static),
            "dynamic" => Ok(Self::Dynamic),
            _ => Err(ConfigError::invalid_value("client_mode", s, "expected static or dynamic")),
        }
    }
}

// ==============================================================================
// Once-only holder
// ==============================================================================

/// Holds the fixture configuration for a test run.
///
/// The harness owns the slot and passes it (or the config inside) to whoever
/// needs it. Initialising twice is reported, not silently ignored.
#[derive(Debug, Default)]
pub struct ConfigSlot {
    cell: OnceLock<FixtureConfig>,
}

impl ConfigSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `config`; fails with [`ConfigError::AlreadyConfigured`] if a
    /// configuration is already present.
    pub fn initialize(&self, config: FixtureConfig) -> ConfigResult<&FixtureConfig> {
        self.cell
            .set(config)
            .map_err(|_| ConfigError::AlreadyConfigured)?;
        self.cell.get().ok_or(ConfigError::AlreadyConfigured)
    }

    pub fn get(&self) -> Option<&FixtureConfig> {
        self.cell.get()
    }

    pub fn is_initialized(&self) -> bool {
        self.cell.get().is_some()
    }
}

// Default value functions
fn default_server_bin() -> String {
    "/usr/bin/memcached".to_string()
}

fn default_server_name() -> String {
    "memcached".to_string()
}

fn default_port() -> u16 {
    11211
}

fn default_ipv4_addr() -> String {
    "127.0.0.1".to_string()
}

fn default_ipv6_addr() -> String {
    "::1".to_string()
}

/// Blank or the legacy placeholder both mean "no certificate folder".
fn cert_folder_from(value: &str) -> Option<PathBuf> {
    let value = value.trim();
    if value.is_empty() || value == CERT_FOLDER_UNSET {
        None
    } else {
        Some(PathBuf::from(value))
    }
}

fn deserialize_cert_folder<'de, D>(deserializer: D) -> Result<Option<PathBuf>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.as_deref().and_then(cert_folder_from))
}

fn default_memory_limit() -> u32 {
    4
}

fn default_startup_grace() -> Duration {
    Duration::from_millis(200)
}

// Durations are written as "200ms", "2s" or "1m"
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("{}ms", duration.as_millis()))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_duration(&s).map_err(serde::de::Error::custom)
    }

    // Unit suffix and its length in milliseconds; "ms" must precede "s"
    const UNITS: &[(&str, u64)] = &[("ms", 1), ("s", 1_000), ("m", 60_000)];

    pub fn parse_duration(s: &str) -> Result<Duration, String> {
        let s = s.trim();
        let (amount, millis_per_unit) = UNITS
            .iter()
            .find_map(|&(suffix, millis)| s.strip_suffix(suffix).map(|amount| (amount, millis)))
            .ok_or_else(|| format!("Duration must end with 's', 'ms', or 'm': {}", s))?;

        amount
            .parse::<u64>()
            .ok()
            .and_then(|n| n.checked_mul(millis_per_unit))
            .map(Duration::from_millis)
            .ok_or_else(|| format!("Invalid duration: {}", s))
    }
}
