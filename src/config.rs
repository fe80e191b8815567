//! Gateway configuration and table governance
//!
//! Operating limits and table visibility rules, loaded once at startup from an
//! optional TOML file and treated as immutable afterwards.

use {
    crate::error::ConfigError,
    regex::Regex,
    serde::Deserialize,
    serde_json::Value,
    std::{
        collections::BTreeSet,
        path::{Path, PathBuf},
        time::Duration,
    },
    tracing::{debug, info},
};

pub const CONFIG_PATH_ENV: &str = "MCP_SERVER_CONFIG";
pub const PROFILE_ENV: &str = "MCP_SERVER_ENV";
pub const DEFAULT_CONFIG_PATH: &str = "config/mcp_server.toml";
pub const DEFAULT_PROFILE: &str = "development";

/// Settings as they appear in the config file. Every key is optional.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Seconds a statement may wait on a locked database. Advisory only.
    pub query_timeout: u64,
    pub max_query_rows: usize,
    pub default_query_limit: usize,
    pub default_page_size: usize,
    pub max_page_size: usize,
    pub log_level: String,
    pub log_queries: bool,
    pub log_errors: bool,
    pub allowed_tables: Vec<String>,
    /// Anchored patterns; `%` and `*` match any run of characters.
    pub blocked_tables: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            query_timeout: 30,
            max_query_rows: 1000,
            default_query_limit: 100,
            default_page_size: 50,
            max_page_size: 500,
            log_level: "info".to_string(),
            log_queries: true,
            log_errors: true,
            allowed_tables: Vec::new(),
            blocked_tables: vec![
                "_prisma_migrations".to_string(),
                "pg_%".to_string(),
                "sqlite_%".to_string(),
            ],
        }
    }
}

/// Immutable runtime configuration with compiled block patterns.
#[derive(Debug, Clone)]
pub struct Configuration {
    pub query_timeout: Duration,
    pub max_query_rows: usize,
    pub default_query_limit: usize,
    pub default_page_size: usize,
    pub max_page_size: usize,
    pub log_level: String,
    pub log_queries: bool,
    pub log_errors: bool,
    pub allowed_tables: BTreeSet<String>,
    blocked_tables: Vec<String>,
    blocked_patterns: Vec<Regex>,
}

impl Default for Configuration {
    fn default() -> Self {
        // The built-in patterns are plain literals plus `%`, so they always compile
        Self::from_settings(Settings::default())
            .unwrap_or_else(|e| unreachable!("default block patterns are valid: {e}"))
    }
}

impl Configuration {
    pub fn from_settings(settings: Settings) -> Result<Self, ConfigError> {
        let blocked_patterns = settings
            .blocked_tables
            .iter()
            .map(|pattern| compile_pattern(pattern))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            query_timeout: Duration::from_secs(settings.query_timeout),
            max_query_rows: settings.max_query_rows,
            default_query_limit: settings.default_query_limit,
            default_page_size: settings.default_page_size,
            max_page_size: settings.max_page_size,
            log_level: settings.log_level,
            log_queries: settings.log_queries,
            log_errors: settings.log_errors,
            allowed_tables: settings.allowed_tables.into_iter().collect(),
            blocked_tables: settings.blocked_tables,
            blocked_patterns,
        })
    }

    /// Load configuration
    ///
    /// Looks for the file in:
    /// 1. `path`, when given
    /// 2. `MCP_SERVER_CONFIG` environment variable
    /// 3. `config/mcp_server.toml`
    ///
    /// A missing file yields the built-in defaults. The profile is `profile`,
    /// else `MCP_SERVER_ENV`, else `development`.
    pub fn load(path: Option<&Path>, profile: Option<&str>) -> Result<Self, ConfigError> {
        let config_path = match path {
            Some(path) => path.to_path_buf(),
            None => std::env::var(CONFIG_PATH_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH)),
        };
        let profile = profile
            .map(str::to_string)
            .or_else(|| std::env::var(PROFILE_ENV).ok())
            .unwrap_or_else(|| DEFAULT_PROFILE.to_string());

        if !config_path.exists() {
            info!(
                path = %config_path.display(),
                event = "config_defaults",
                "No configuration file found, using defaults"
            );
            return Self::from_settings(Settings::default());
        }

        let content = std::fs::read_to_string(&config_path).map_err(|source| ConfigError::Read {
            path: config_path.display().to_string(),
            source,
        })?;
        let settings = parse_settings(&content, &profile).map_err(|source| ConfigError::Parse {
            path: config_path.display().to_string(),
            source,
        })?;

        debug!(path = %config_path.display(), profile = %profile, "Loaded configuration");
        Self::from_settings(settings)
    }

    /// Check table visibility. Block patterns always win over the allow-list;
    /// an empty allow-list permits everything not blocked.
    pub fn table_allowed(&self, table_name: &str) -> bool {
        if self.blocked_patterns.iter().any(|re| re.is_match(table_name)) {
            return false;
        }
        if self.allowed_tables.is_empty() {
            return true;
        }
        self.allowed_tables.contains(table_name)
    }

    /// Clamp a requested row count to `max_query_rows`.
    pub fn validate_query_limit(&self, requested: &Value) -> usize {
        clamp_count(requested, self.max_query_rows)
    }

    /// Clamp a requested page size to `max_page_size`.
    pub fn validate_page_size(&self, requested: &Value) -> usize {
        clamp_count(requested, self.max_page_size)
    }

    pub fn blocked_tables(&self) -> &[String] {
        &self.blocked_tables
    }
}

/// Pick the active profile table, then `[default]`, then the top level.
fn parse_settings(content: &str, profile: &str) -> Result<Settings, toml::de::Error> {
    let document: toml::Table = toml::from_str(content)?;

    let section = [profile, "default"]
        .iter()
        .find_map(|name| match document.get(*name) {
            Some(toml::Value::Table(table)) => Some(table.clone()),
            _ => None,
        })
        .unwrap_or(document);

    Settings::deserialize(toml::Value::Table(section))
}

fn compile_pattern(pattern: &str) -> Result<Regex, ConfigError> {
    let mut source = String::with_capacity(pattern.len() + 8);
    source.push('^');
    for ch in pattern.chars() {
        match ch {
            '%' | '*' => source.push_str(".*"),
            _ => source.push_str(&regex::escape(ch.encode_utf8(&mut [0; 4]))),
        }
    }
    source.push('$');

    Regex::new(&source).map_err(|source| ConfigError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })
}

/// Best-effort conversion of a JSON value into a non-negative count.
///
/// Returns `None` when nothing numeric can be recovered.
pub fn coerce_count(value: &Value) -> Option<usize> {
    match value {
        Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                Some(usize::try_from(u).unwrap_or(usize::MAX))
            } else if let Some(i) = n.as_i64() {
                Some(if i < 0 { 0 } else { i as usize })
            } else {
                n.as_f64().map(|f| if f <= 0.0 { 0 } else { f as usize })
            }
        }
        Value::String(s) => leading_integer(s.trim()),
        _ => None,
    }
}

fn clamp_count(requested: &Value, max: usize) -> usize {
    coerce_count(requested).map_or(max, |n| n.min(max))
}

fn leading_integer(s: &str) -> Option<usize> {
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    if negative {
        return Some(0);
    }
    Some(digits[..end].parse::<usize>().unwrap_or(usize::MAX))
}
