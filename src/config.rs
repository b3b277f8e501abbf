use std::path::Path;

use anyhow::{Result, bail};
use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::dispatch::DispatchMode;

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum IsolationMode {
    #[default]
    Thread,
    Process,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DispatchConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub mode: DispatchMode,
    #[serde(default)]
    pub endpoint: String,
    #[serde(default = "default_dispatch_timeout")]
    pub timeout_secs: u64,
}

fn default_dispatch_timeout() -> u64 {
    10
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub run_id: String,
    pub workers: usize,
    pub threads_per_worker: usize,
    pub keyword: String,
    #[serde(default)]
    pub isolation: IsolationMode,
    #[serde(default)]
    pub gather_timeout_secs: Option<u64>,
    #[serde(default)]
    pub workload_delay_ms: u64,
    pub dispatch: DispatchConfig,
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            bail!("workers must be at least 1");
        }
        if self.threads_per_worker == 0 {
            bail!("threads_per_worker must be at least 1");
        }
        if self.keyword.is_empty() {
            bail!("keyword must not be empty");
        }
        if self.gather_timeout_secs == Some(0) {
            bail!("gather_timeout_secs must be positive when set");
        }
        if self.dispatch.enabled {
            if self.dispatch.endpoint.trim().is_empty() {
                bail!("dispatch is enabled but no endpoint is configured");
            }
            if self.dispatch.timeout_secs == 0 {
                bail!("dispatch timeout_secs must be positive");
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: Config,
    pub config_hash: String,
}

pub fn load_config(path: Option<&Path>) -> Result<LoadedConfig> {
    let bytes: Vec<u8> = if let Some(p) = path {
        std::fs::read(p)?
    } else {
        include_bytes!("../config/default.yml").to_vec()
    };

    let mut config: Config = serde_yaml::from_slice(&bytes)?;
    if config.run_id.trim().is_empty() {
        config.run_id = generate_run_id();
    }
    if config.workers == 0 {
        config.workers = num_cpus::get();
    }

    let config_hash = hash_bytes(&bytes);

    Ok(LoadedConfig { config, config_hash })
}

fn hash_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    hex::encode(digest)
}

fn generate_run_id() -> String {
    let now = chrono::Utc::now();
    format!("{}_{:08x}", now.format("%Y%m%dT%H%M%SZ"), now.timestamp_subsec_nanos())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_loads() {
        let loaded = load_config(None).expect("config");
        let cfg = loaded.config;
        assert!(cfg.workers >= 1);
        assert_eq!(cfg.threads_per_worker, 4);
        assert_eq!(cfg.keyword, "Critical");
        assert_eq!(cfg.isolation, IsolationMode::Thread);
        assert_eq!(cfg.dispatch.mode, DispatchMode::Webhook);
        assert!(!cfg.dispatch.enabled);
        assert!(!cfg.run_id.is_empty());
        assert_eq!(loaded.config_hash.len(), 64);
        cfg.validate().expect("valid");
    }

    #[test]
    fn reads_config_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("cfg.yml");
        std::fs::write(
            &path,
            "run_id: fixed\nworkers: 3\nthreads_per_worker: 2\nkeyword: Timeout\nisolation: process\ndispatch:\n  enabled: true\n  mode: socket\n  endpoint: tcp://127.0.0.1:9000\n",
        )
        .expect("write");
        let cfg = load_config(Some(&path)).expect("config").config;
        assert_eq!(cfg.run_id, "fixed");
        assert_eq!(cfg.workers, 3);
        assert_eq!(cfg.isolation, IsolationMode::Process);
        assert_eq!(cfg.dispatch.mode, DispatchMode::Socket);
        assert_eq!(cfg.dispatch.timeout_secs, 10);
        assert_eq!(cfg.gather_timeout_secs, None);
        cfg.validate().expect("valid");
    }

    #[test]
    fn rejects_zero_threads_and_empty_keyword() {
        let mut cfg = load_config(None).expect("config").config;
        cfg.threads_per_worker = 0;
        assert!(cfg.validate().is_err());
        cfg.threads_per_worker = 1;
        cfg.keyword.clear();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn enabled_dispatch_needs_endpoint() {
        let mut cfg = load_config(None).expect("config").config;
        cfg.dispatch.enabled = true;
        cfg.dispatch.endpoint = "  ".into();
        assert!(cfg.validate().is_err());
    }
}
