// src/config.rs
use crate::services::inference::DEFAULT_INFERENCE_URL;
use crate::services::model_directory::DirectorySettings;
use crate::services::poll::PollPolicy;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
#[error("Invalid value for {key}: {value:?}")]
pub struct ConfigError {
    pub key: &'static str,
    pub value: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_address: String,
    pub hf_token: Option<String>,
    pub inference_url: String,
    pub directory: DirectorySettings,
    pub poll_policy: PollPolicy,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let directory_defaults = DirectorySettings::default();
        let poll_defaults = PollPolicy::default();

        Ok(Self {
            bind_address: get("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:8080".to_string()),
            hf_token: get("HUGGINGFACE_API_TOKEN").or_else(|| get("HF_API_TOKEN")),
            inference_url: get("HF_INFERENCE_URL")
                .unwrap_or_else(|| DEFAULT_INFERENCE_URL.to_string()),
            directory: DirectorySettings {
                registry_url: get("HF_MODELS_URL").unwrap_or(directory_defaults.registry_url),
                pipeline_tag: get("VIDEO_PIPELINE_TAG").unwrap_or(directory_defaults.pipeline_tag),
                fallback_search: get("VIDEO_FALLBACK_SEARCH")
                    .unwrap_or(directory_defaults.fallback_search),
                recency_cutoff_year: parse_or(
                    &get,
                    "MODEL_RECENCY_YEAR",
                    directory_defaults.recency_cutoff_year,
                )?,
            },
            poll_policy: PollPolicy {
                max_retries: parse_or(&get, "INFERENCE_MAX_RETRIES", poll_defaults.max_retries)?,
                default_wait: seconds_or(
                    &get,
                    "INFERENCE_DEFAULT_WAIT_SECS",
                    poll_defaults.default_wait,
                )?,
                max_wait: seconds_or(&get, "INFERENCE_MAX_WAIT_SECS", poll_defaults.max_wait)?,
                max_total_wait: seconds_or(
                    &get,
                    "INFERENCE_MAX_TOTAL_WAIT_SECS",
                    poll_defaults.max_total_wait,
                )?,
            },
        })
    }
}

fn parse_or<T, G>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError { key, value }),
        None => Ok(default),
    }
}

fn seconds_or<G>(get: &G, key: &'static str, default: Duration) -> Result<Duration, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    parse_or(get, key, default.as_secs()).map(Duration::from_secs)
}
