//! Report configuration, read from `FINLEDGER_*` environment variables.

use std::path::PathBuf;

use thiserror::Error;
use tracing::warn;

use finledger_accounting::{
    DEFAULT_DEBT_SERIES_COLOR, DEFAULT_DEBT_SERIES_NAME, DEFAULT_PAGE_SIZE, DebtPolarity,
    NetWorthOptions, Pagination,
};
use finledger_observability::LogFormat;

pub const ENV_PAGE_SIZE: &str = "FINLEDGER_PAGE_SIZE";
pub const ENV_MAX_PAGE_SIZE: &str = "FINLEDGER_MAX_PAGE_SIZE";
pub const ENV_DEBT_POLARITY: &str = "FINLEDGER_DEBT_POLARITY";
pub const ENV_DEBT_SERIES_NAME: &str = "FINLEDGER_DEBT_SERIES_NAME";
pub const ENV_DEBT_SERIES_COLOR: &str = "FINLEDGER_DEBT_SERIES_COLOR";
pub const ENV_LOG_FORMAT: &str = "FINLEDGER_LOG_FORMAT";
pub const ENV_SNAPSHOT: &str = "FINLEDGER_SNAPSHOT";

pub const DEFAULT_MAX_PAGE_SIZE: u32 = 1000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{key}={value:?} is invalid: {reason}")]
pub struct ConfigError {
    pub key: &'static str,
    pub value: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportConfig {
    /// Page size used when a request does not name one.
    pub page_size: u32,
    /// Upper bound for any requested page size.
    pub max_page_size: u32,
    pub debt_polarity: DebtPolarity,
    pub debt_series_name: String,
    pub debt_series_color: String,
    pub log_format: LogFormat,
    pub snapshot_path: Option<PathBuf>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
            debt_polarity: DebtPolarity::default(),
            debt_series_name: DEFAULT_DEBT_SERIES_NAME.to_string(),
            debt_series_color: DEFAULT_DEBT_SERIES_COLOR.to_string(),
            log_format: LogFormat::default(),
            snapshot_path: None,
        }
    }
}

impl ReportConfig {
    /// Strict: the first invalid variable is an error.
    pub fn try_from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Lenient: invalid variables are logged and replaced by their defaults.
    pub fn from_env() -> Self {
        Self::from_lookup_lenient(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Self::load(&lookup, true)
    }

    pub fn from_lookup_lenient(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self::load(&lookup, false).unwrap_or_default()
    }

    fn load(lookup: &dyn Fn(&str) -> Option<String>, strict: bool) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let page_size = resolve(
            parse(lookup, ENV_PAGE_SIZE, parse_page_size),
            defaults.page_size,
            strict,
        )?;
        let max_page_size = resolve(
            parse(lookup, ENV_MAX_PAGE_SIZE, parse_page_size),
            defaults.max_page_size,
            strict,
        )?;
        let debt_polarity = resolve(
            parse(lookup, ENV_DEBT_POLARITY, parse_polarity),
            defaults.debt_polarity,
            strict,
        )?;
        let debt_series_name = resolve(
            parse(lookup, ENV_DEBT_SERIES_NAME, |v| Ok(v.to_string())),
            defaults.debt_series_name,
            strict,
        )?;
        let debt_series_color = resolve(
            parse(lookup, ENV_DEBT_SERIES_COLOR, parse_color),
            defaults.debt_series_color,
            strict,
        )?;
        let log_format = resolve(
            parse(lookup, ENV_LOG_FORMAT, |v| {
                v.parse::<LogFormat>().map_err(|e| e.to_string())
            }),
            defaults.log_format,
            strict,
        )?;
        let snapshot_path = parse(lookup, ENV_SNAPSHOT, |v| Ok(PathBuf::from(v)))?;

        Ok(Self {
            page_size: page_size.min(max_page_size),
            max_page_size,
            debt_polarity,
            debt_series_name,
            debt_series_color,
            log_format,
            snapshot_path,
        })
    }

    pub fn net_worth_options(&self) -> NetWorthOptions {
        NetWorthOptions {
            polarity: self.debt_polarity,
            debt_name: self.debt_series_name.clone(),
            debt_color: self.debt_series_color.clone(),
        }
    }

    pub fn default_pagination(&self) -> Pagination {
        Pagination {
            page: 0,
            page_size: self.page_size,
        }
    }
}

/// Read and parse one variable. Unset and blank values are `None`.
fn parse<T>(
    lookup: &dyn Fn(&str) -> Option<String>,
    key: &'static str,
    convert: impl FnOnce(&str) -> Result<T, String>,
) -> Result<Option<T>, ConfigError> {
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    let value = raw.trim();
    if value.is_empty() {
        return Ok(None);
    }
    convert(value).map(Some).map_err(|reason| ConfigError {
        key,
        value: value.to_string(),
        reason,
    })
}

fn resolve<T>(parsed: Result<Option<T>, ConfigError>, default: T, strict: bool) -> Result<T, ConfigError> {
    match parsed {
        Ok(value) => Ok(value.unwrap_or(default)),
        Err(err) if strict => Err(err),
        Err(err) => {
            warn!(key = err.key, error = %err, "invalid configuration value; using default");
            Ok(default)
        }
    }
}

fn parse_page_size(value: &str) -> Result<u32, String> {
    match value.parse::<u32>() {
        Ok(0) => Err("must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}

fn parse_polarity(value: &str) -> Result<DebtPolarity, String> {
    match value.to_ascii_lowercase().as_str() {
        "reduces" => Ok(DebtPolarity::DebtReducesNetPosition),
        "increases" => Ok(DebtPolarity::DebtIncreasesNetPosition),
        _ => Err("expected \"reduces\" or \"increases\"".to_string()),
    }
}

fn parse_color(value: &str) -> Result<String, String> {
    let hex = value
        .strip_prefix('#')
        .ok_or_else(|| "expected #rrggbb".to_string())?;
    if hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit()) {
        Ok(value.to_ascii_lowercase())
    } else {
        Err("expected #rrggbb".to_string())
    }
}
