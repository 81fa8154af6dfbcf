//! Environment-driven configuration

use crate::llm::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid value for {name}: {value:?}")]
pub struct ConfigError {
    pub name: &'static str,
    pub value: String,
}

/// Chat model settings
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

/// Supabase table holding the NPI registry
#[derive(Debug, Clone, Default)]
pub struct RegistryConfig {
    pub url: Option<String>,
    pub key: Option<String>,
    pub table: Option<String>,
}

/// Credentials and timeout for the data-fetch sources
#[derive(Debug, Clone)]
pub struct SourcesConfig {
    pub air_quality_key: Option<String>,
    pub geocode_key: Option<String>,
    pub registry: RegistryConfig,
    pub timeout: Duration,
}

/// Job retention
#[derive(Debug, Clone, Copy)]
pub struct JobsConfig {
    pub ttl: Duration,
    pub sweep_interval: Duration,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub max_hops: u32,
    pub llm: LlmConfig,
    pub sources: SourcesConfig,
    pub jobs: JobsConfig,
    pub archive_path: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable lookup; empty values count as unset
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let parse = |name: &'static str, default: u64| -> Result<u64, ConfigError> {
            parse_or(name, var(name), default)
        };

        let port = parse_or("HAPP_PORT", var("HAPP_PORT"), 8000)?;
        let max_hops = parse_or("HAPP_MAX_HOPS", var("HAPP_MAX_HOPS"), 10)?;

        Ok(Self {
            port,
            max_hops,
            llm: LlmConfig {
                api_key: var("OPENAI_API_KEY"),
                base_url: var("LLM_GATEWAY").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
                model: var("LLM_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
                timeout: Duration::from_secs(parse("HAPP_LLM_TIMEOUT_SECS", 60)?),
            },
            sources: SourcesConfig {
                air_quality_key: var("AIR_QUALITY_API_KEY"),
                geocode_key: var("GEOLOCATION_IQ_API_KEY"),
                registry: RegistryConfig {
                    url: var("SUPABASE_URL"),
                    key: var("SUPABASE_KEY"),
                    table: var("SUPABASE_TABLE"),
                },
                timeout: Duration::from_secs(parse("HAPP_FETCH_TIMEOUT_SECS", 10)?),
            },
            jobs: JobsConfig {
                ttl: Duration::from_secs(parse("JOB_TTL_SECS", 900)?),
                sweep_interval: Duration::from_secs(parse("JOB_SWEEP_SECS", 60)?.max(1)),
            },
            archive_path: var("HAPP_ARCHIVE_PATH").map(PathBuf::from),
        })
    }
}

fn parse_or<T: FromStr>(name: &'static str, value: Option<String>, default: T) -> Result<T, ConfigError> {
    match value {
        None => Ok(default),
        Some(v) => v.parse().map_err(|_| ConfigError { name, value: v }),
    }
}
