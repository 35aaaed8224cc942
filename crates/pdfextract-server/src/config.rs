//! Server configuration, loaded from a YAML file.
//!
//! Follows the same `Yaml`/prepared split the teacher uses for its own
//! `config.yaml` (`Raw` deserialise struct with `#[serde(default)]` knobs,
//! then a `prepare()` step that resolves defaults and env lookups into a
//! plain runtime struct).

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";
const DEFAULT_L1_CAPACITY: usize = 256;
const DEFAULT_LLM_TIMEOUT_SECONDS: u64 = 60;
const DEFAULT_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Runtime configuration, resolved from [`YamlConfig`].
pub struct Config {
    pub bind_address: String,
    pub cache_dir: PathBuf,
    pub template_db_path: PathBuf,
    pub l1_capacity: usize,
    pub llm: LlmConfig,
}

pub struct LlmConfig {
    pub api_base_url: String,
    pub model: String,
    pub timeout_seconds: u64,
    /// The API key itself, read from `api_key_env` at load time. `None` if
    /// the variable is unset (useful for offline/dummy-client runs).
    pub api_key: Option<String>,
}

pub fn load_config(path: &Path) -> Result<Config> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading configuration file {path:?}"))?;
    let raw: YamlConfig =
        serde_yaml_ng::from_str(&text).with_context(|| "parsing configuration file")?;
    Ok(raw.prepare())
}

#[derive(Deserialize, Debug)]
struct YamlConfig {
    #[serde(default)]
    bind_address: Option<String>,
    cache_dir: PathBuf,
    template_db_path: PathBuf,
    #[serde(default)]
    l1_capacity: Option<usize>,
    llm: YamlLlmConfig,
}

#[derive(Deserialize, Debug)]
struct YamlLlmConfig {
    api_base_url: String,
    model: String,
    #[serde(default)]
    timeout_seconds: Option<u64>,
    #[serde(default = "default_api_key_env")]
    api_key_env: String,
}

fn default_api_key_env() -> String {
    DEFAULT_API_KEY_ENV.to_string()
}

impl YamlConfig {
    fn prepare(self) -> Config {
        Config {
            bind_address: self.bind_address.unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string()),
            cache_dir: self.cache_dir,
            template_db_path: self.template_db_path,
            l1_capacity: self.l1_capacity.unwrap_or(DEFAULT_L1_CAPACITY),
            llm: self.llm.prepare(),
        }
    }
}

impl YamlLlmConfig {
    fn prepare(self) -> LlmConfig {
        LlmConfig {
            api_base_url: self.api_base_url,
            model: self.model,
            timeout_seconds: self.timeout_seconds.unwrap_or(DEFAULT_LLM_TIMEOUT_SECONDS),
            api_key: std::env::var(&self.api_key_env).ok(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let yaml = "cache_dir: /tmp/cache\ntemplate_db_path: /tmp/templates.db\nllm:\n  api_base_url: https://api.openai.com/v1\n  model: gpt-4o-mini\n";
        let raw: YamlConfig = serde_yaml_ng::from_str(yaml).unwrap();
        let config = raw.prepare();
        assert_eq!(config.bind_address, DEFAULT_BIND_ADDRESS);
        assert_eq!(config.l1_capacity, DEFAULT_L1_CAPACITY);
        assert_eq!(config.llm.timeout_seconds, DEFAULT_LLM_TIMEOUT_SECONDS);
    }

    #[test]
    fn explicit_fields_override_defaults() {
        let yaml = "bind_address: 127.0.0.1:9999\ncache_dir: /tmp/cache\ntemplate_db_path: /tmp/templates.db\nl1_capacity: 10\nllm:\n  api_base_url: https://api.openai.com/v1\n  model: gpt-4o-mini\n  timeout_seconds: 5\n";
        let raw: YamlConfig = serde_yaml_ng::from_str(yaml).unwrap();
        let config = raw.prepare();
        assert_eq!(config.bind_address, "127.0.0.1:9999");
        assert_eq!(config.l1_capacity, 10);
        assert_eq!(config.llm.timeout_seconds, 5);
    }
}
