use clap::Parser;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::services::profile_analyzer::{AnalysisOptions, MAX_DEPTH_CEILING, ParseLimits};

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub analyzer: AnalyzerConfig,
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
}

/// Limits and defaults applied to every analysis
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Largest accepted profile (default: 10MB, accepts "512KB", "10MB")
    #[serde(deserialize_with = "deserialize_size_bytes")]
    pub max_input_bytes: usize,
    /// Deepest accepted component tree (default: 64)
    pub max_depth: usize,
    /// Most component nodes accepted per profile (default: 100000)
    pub max_nodes: usize,
    /// Slow shards returned when the request does not say (default: 10)
    pub default_top_n: usize,
    /// Entries in the slowest components listing (default: 10)
    pub slowest_components: usize,
}

/// Analysis result cache
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    /// Maximum cached analyses (default: 128)
    pub capacity: usize,
    /// Entry lifetime in seconds (default: 300, accepts "30s", "5m", "1h")
    #[serde(deserialize_with = "deserialize_duration_secs")]
    pub ttl_secs: u64,
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// Command line arguments for configuration overrides
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "search-profiler")]
#[command(version, about = "Search Profiler - search profile analysis service")]
pub struct CommandLineArgs {
    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    /// Analyze a profile file (or "-" for stdin), print the result as JSON and exit
    #[arg(long, value_name = "PATH")]
    pub analyze: Option<String>,

    /// Server host (overrides config file)
    #[arg(long, value_name = "HOST")]
    pub server_host: Option<String>,

    /// Server port (overrides config file)
    #[arg(long, value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Logging level (overrides config file, e.g., "info,search_profiler=debug")
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Largest accepted profile (overrides config file, e.g., "10MB")
    #[arg(long, value_name = "SIZE")]
    pub max_input_bytes: Option<String>,

    /// Slow shards to return by default (overrides config file)
    #[arg(long, value_name = "N")]
    pub top_n: Option<usize>,

    /// Enable/disable the analysis cache (overrides config file)
    #[arg(long, value_name = "BOOL")]
    pub cache_enabled: Option<bool>,

    /// Cache entry lifetime (overrides config file, e.g., "30s", "5m", "1h")
    #[arg(long, value_name = "DURATION")]
    pub cache_ttl: Option<String>,
}

impl Config {
    /// Load configuration with command line, environment variable, and file support
    ///
    /// Loading order (priority from highest to lowest):
    /// 1. Command line arguments
    /// 2. Environment variables (prefixed with APP_)
    /// 3. Configuration file (config.toml)
    /// 4. Default values
    pub fn load(cli_args: &CommandLineArgs) -> Result<Self, anyhow::Error> {
        let config_path = cli_args.config.clone().or_else(Self::find_config_file);
        let mut config = if let Some(config_path) = config_path {
            Self::from_toml(&config_path)?
        } else {
            tracing::warn!("Configuration file not found, using defaults");
            Config::default()
        };

        config.apply_env_overrides();
        config.apply_cli_overrides(cli_args);
        config.validate()?;

        Ok(config)
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - APP_SERVER_HOST: Server host (default: 0.0.0.0)
    /// - APP_SERVER_PORT: Server port (default: 8080)
    /// - APP_LOG_LEVEL: Logging level
    /// - APP_MAX_INPUT_BYTES: Largest accepted profile (accepts "10MB")
    /// - APP_MAX_DEPTH / APP_MAX_NODES: Component tree ceilings
    /// - APP_TOP_N: Default number of slow shards
    /// - APP_CACHE_ENABLED: Enable/disable the analysis cache (true/false)
    /// - APP_CACHE_TTL: Cache entry lifetime (accepts "30s", "5m", "1h")
    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("APP_SERVER_HOST") {
            self.server.host = host;
            tracing::info!("Override server.host from env: {}", self.server.host);
        }

        if let Ok(port) = std::env::var("APP_SERVER_PORT")
            && let Ok(port) = port.parse()
        {
            self.server.port = port;
            tracing::info!("Override server.port from env: {}", self.server.port);
        }

        if let Ok(level) = std::env::var("APP_LOG_LEVEL") {
            self.logging.level = level;
            tracing::info!("Override logging.level from env: {}", self.logging.level);
        }

        if let Ok(size) = std::env::var("APP_MAX_INPUT_BYTES") {
            match parse_size_to_bytes(&size) {
                Ok(val) => {
                    self.analyzer.max_input_bytes = val;
                    tracing::info!(
                        "Override analyzer.max_input_bytes from env: {}",
                        self.analyzer.max_input_bytes
                    );
                },
                Err(e) => tracing::warn!(
                    "Invalid APP_MAX_INPUT_BYTES '{}': {} (keep {})",
                    size,
                    e,
                    self.analyzer.max_input_bytes
                ),
            }
        }

        if let Ok(depth) = std::env::var("APP_MAX_DEPTH")
            && let Ok(depth) = depth.parse()
        {
            self.analyzer.max_depth = depth;
            tracing::info!("Override analyzer.max_depth from env: {}", self.analyzer.max_depth);
        }

        if let Ok(nodes) = std::env::var("APP_MAX_NODES")
            && let Ok(nodes) = nodes.parse()
        {
            self.analyzer.max_nodes = nodes;
            tracing::info!("Override analyzer.max_nodes from env: {}", self.analyzer.max_nodes);
        }

        if let Ok(top_n) = std::env::var("APP_TOP_N")
            && let Ok(top_n) = top_n.parse()
        {
            self.analyzer.default_top_n = top_n;
            tracing::info!(
                "Override analyzer.default_top_n from env: {}",
                self.analyzer.default_top_n
            );
        }

        if let Ok(enabled) = std::env::var("APP_CACHE_ENABLED")
            && let Ok(val) = enabled.parse()
        {
            self.cache.enabled = val;
            tracing::info!("Override cache.enabled from env: {}", self.cache.enabled);
        }

        if let Ok(ttl) = std::env::var("APP_CACHE_TTL") {
            match parse_duration_to_secs(&ttl) {
                Ok(val) => {
                    self.cache.ttl_secs = val;
                    tracing::info!("Override cache.ttl_secs from env: {}", self.cache.ttl_secs);
                },
                Err(e) => tracing::warn!(
                    "Invalid APP_CACHE_TTL '{}': {} (keep {})",
                    ttl,
                    e,
                    self.cache.ttl_secs
                ),
            }
        }
    }

    /// Apply command line argument overrides (highest priority)
    fn apply_cli_overrides(&mut self, args: &CommandLineArgs) {
        if let Some(host) = &args.server_host {
            self.server.host = host.clone();
            tracing::info!("Override server.host from CLI: {}", self.server.host);
        }

        if let Some(port) = args.server_port {
            self.server.port = port;
            tracing::info!("Override server.port from CLI: {}", self.server.port);
        }

        if let Some(level) = &args.log_level {
            self.logging.level = level.clone();
            tracing::info!("Override logging.level from CLI: {}", self.logging.level);
        }

        if let Some(size) = &args.max_input_bytes {
            match parse_size_to_bytes(size) {
                Ok(val) => {
                    self.analyzer.max_input_bytes = val;
                    tracing::info!(
                        "Override analyzer.max_input_bytes from CLI: {}",
                        self.analyzer.max_input_bytes
                    );
                },
                Err(e) => tracing::warn!(
                    "Invalid --max-input-bytes '{}': {} (keep {})",
                    size,
                    e,
                    self.analyzer.max_input_bytes
                ),
            }
        }

        if let Some(top_n) = args.top_n {
            self.analyzer.default_top_n = top_n;
            tracing::info!(
                "Override analyzer.default_top_n from CLI: {}",
                self.analyzer.default_top_n
            );
        }

        if let Some(enabled) = args.cache_enabled {
            self.cache.enabled = enabled;
            tracing::info!("Override cache.enabled from CLI: {}", self.cache.enabled);
        }

        if let Some(ttl) = &args.cache_ttl {
            match parse_duration_to_secs(ttl) {
                Ok(val) => {
                    self.cache.ttl_secs = val;
                    tracing::info!("Override cache.ttl_secs from CLI: {}", self.cache.ttl_secs);
                },
                Err(e) => tracing::warn!(
                    "Invalid --cache-ttl '{}': {} (keep {})",
                    ttl,
                    e,
                    self.cache.ttl_secs
                ),
            }
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.server.port == 0 {
            anyhow::bail!("Server port cannot be 0");
        }

        if self.analyzer.max_input_bytes == 0 {
            anyhow::bail!("analyzer.max_input_bytes must be > 0");
        }
        if self.analyzer.max_depth == 0 {
            anyhow::bail!("analyzer.max_depth must be > 0");
        }
        if self.analyzer.max_depth > MAX_DEPTH_CEILING {
            anyhow::bail!("analyzer.max_depth must be <= {}", MAX_DEPTH_CEILING);
        }
        if self.analyzer.max_nodes == 0 {
            anyhow::bail!("analyzer.max_nodes must be > 0");
        }
        if self.analyzer.default_top_n == 0 {
            anyhow::bail!("analyzer.default_top_n must be > 0");
        }

        if self.cache.enabled && self.cache.capacity == 0 {
            anyhow::bail!("cache.capacity must be > 0 when the cache is enabled");
        }

        Ok(())
    }

    /// Analysis options derived from the `analyzer` section
    pub fn to_analysis_options(&self) -> AnalysisOptions {
        AnalysisOptions {
            top_n: self.analyzer.default_top_n,
            slowest_components: self.analyzer.slowest_components,
            include_zero_breakdown: true,
            limits: ParseLimits {
                max_depth: self.analyzer.max_depth,
                max_nodes: self.analyzer.max_nodes,
            },
            max_input_bytes: self.analyzer.max_input_bytes,
        }
    }

    fn find_config_file() -> Option<String> {
        let possible_paths =
            ["conf/config.toml", "config.toml", "./conf/config.toml", "./config.toml"];

        for path in &possible_paths {
            if Path::new(path).exists() {
                return Some(path.to_string());
            }
        }
        None
    }

    fn from_toml(path: &str) -> Result<Self, anyhow::Error> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "0.0.0.0".to_string(), port: 8080 }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info,search_profiler=debug".to_string(), file: None }
    }
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        let defaults = AnalysisOptions::default();
        Self {
            max_input_bytes: defaults.max_input_bytes,
            max_depth: defaults.limits.max_depth,
            max_nodes: defaults.limits.max_nodes,
            default_top_n: defaults.top_n,
            slowest_components: defaults.slowest_components,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { enabled: true, capacity: 128, ttl_secs: 300 }
    }
}

// =========================
// Helpers for parsing values
// =========================

fn split_number_unit(input: &str) -> Result<(u64, String), String> {
    let s = input.trim().to_lowercase();
    let (num_str, unit) = s.split_at(s.chars().take_while(|c| c.is_ascii_digit()).count());
    if num_str.is_empty() || unit.is_empty() {
        return Err("missing number or unit".into());
    }
    let n: u64 = num_str.parse().map_err(|_| "invalid number".to_string())?;
    Ok((n, unit.trim().to_string()))
}

fn parse_duration_to_secs(input: &str) -> Result<u64, String> {
    // Accept plain numbers (treated as seconds)
    if let Ok(val) = input.parse::<u64>() {
        return Ok(val);
    }

    let (n, unit) = split_number_unit(input)?;
    match unit.as_str() {
        "s" | "sec" | "secs" | "second" | "seconds" => Ok(n),
        "m" | "min" | "mins" | "minute" | "minutes" => Ok(n * 60),
        "h" | "hr" | "hour" | "hours" => Ok(n * 60 * 60),
        "d" | "day" | "days" => Ok(n * 60 * 60 * 24),
        _ => Err(format!("unsupported unit: {}", unit)),
    }
}

fn parse_size_to_bytes(input: &str) -> Result<usize, String> {
    // Accept plain numbers (treated as bytes)
    if let Ok(val) = input.parse::<usize>() {
        return Ok(val);
    }

    let (n, unit) = split_number_unit(input)?;
    let multiplier: u64 = match unit.as_str() {
        "b" => 1,
        "k" | "kb" | "kib" => 1024,
        "m" | "mb" | "mib" => 1024 * 1024,
        "g" | "gb" | "gib" => 1024 * 1024 * 1024,
        _ => return Err(format!("unsupported unit: {}", unit)),
    };
    n.checked_mul(multiplier)
        .and_then(|bytes| usize::try_from(bytes).ok())
        .ok_or_else(|| "size too large".to_string())
}

// Custom serde deserializers to support numeric or human-friendly string values
fn deserialize_duration_secs<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    struct Visitor;
    impl<'de> serde::de::Visitor<'de> for Visitor {
        type Value = u64;
        fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
            write!(f, "a number of seconds or a string like '30s', '5m', '1h'")
        }
        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E> {
            Ok(v)
        }
        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            if v >= 0 { Ok(v as u64) } else { Err(E::custom("negative not allowed")) }
        }
        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            parse_duration_to_secs(v).map_err(E::custom)
        }
    }
    deserializer.deserialize_any(Visitor)
}

fn deserialize_size_bytes<'de, D>(deserializer: D) -> Result<usize, D::Error>
where
    D: serde::Deserializer<'de>,
{
    struct Visitor;
    impl<'de> serde::de::Visitor<'de> for Visitor {
        type Value = usize;
        fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
            write!(f, "a number of bytes or a string like '512KB', '10MB'")
        }
        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            usize::try_from(v).map_err(|_| E::custom("size too large"))
        }
        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            usize::try_from(v).map_err(|_| E::custom("negative not allowed"))
        }
        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            parse_size_to_bytes(v).map_err(E::custom)
        }
    }
    deserializer.deserialize_any(Visitor)
}
