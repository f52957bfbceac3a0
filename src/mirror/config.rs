use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::mirror::sync::{DEFAULT_PAGE_SIZE, SyncOptions};

const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub owner: String,
    pub repo: String,
    pub api_base: String,
    pub timeout_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            owner: "golang".to_string(),
            repo: "go".to_string(),
            api_base: "https://api.github.com".to_string(),
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub page_size: u32,
    pub idle_pages_before_stop: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            idle_pages_before_stop: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StoreConfig {
    pub dest: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AuthConfig {
    /// Defaults to `~/keys/github-mirror-go-issues`.
    pub token_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MirrorConfig {
    pub remote: RemoteConfig,
    pub sync: SyncConfig,
    pub store: StoreConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PartialMirrorConfig {
    remote: Option<RemoteConfig>,
    sync: Option<SyncConfig>,
    store: Option<StoreConfig>,
    auth: Option<AuthConfig>,
}

impl MirrorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.remote.timeout_secs)
    }

    pub fn token_file(&self) -> Result<PathBuf> {
        if let Some(path) = &self.auth.token_file {
            return Ok(path.clone());
        }
        let home = dirs::home_dir().ok_or_else(|| anyhow!("HOME directory could not be resolved"))?;
        Ok(home.join("keys").join("github-mirror-go-issues"))
    }

    pub fn sync_options(&self, reclean: bool) -> SyncOptions {
        SyncOptions {
            page_size: self.sync.page_size,
            idle_pages_before_stop: self.sync.idle_pages_before_stop,
            reclean,
        }
    }
}

fn non_empty(raw: Option<String>) -> Option<String> {
    raw.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn env_or_u64(lookup: &impl Fn(&str) -> Option<String>, var: &str, fallback: u64) -> u64 {
    non_empty(lookup(var))
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(fallback)
}

fn env_or_u32(lookup: &impl Fn(&str) -> Option<String>, var: &str, fallback: u32) -> u32 {
    non_empty(lookup(var))
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(fallback)
}

fn env_or_string(lookup: &impl Fn(&str) -> Option<String>, var: &str, fallback: &str) -> String {
    non_empty(lookup(var)).unwrap_or_else(|| fallback.to_string())
}

fn env_or_path(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &str,
    fallback: Option<PathBuf>,
) -> Option<PathBuf> {
    non_empty(lookup(var)).map(PathBuf::from).or(fallback)
}

fn apply_env(cfg: &mut MirrorConfig, lookup: impl Fn(&str) -> Option<String>) {
    cfg.remote.owner = env_or_string(&lookup, "MIRROR_OWNER", &cfg.remote.owner);
    cfg.remote.repo = env_or_string(&lookup, "MIRROR_REPO", &cfg.remote.repo);
    cfg.remote.api_base = env_or_string(&lookup, "MIRROR_API_BASE", &cfg.remote.api_base);
    cfg.remote.timeout_secs =
        env_or_u64(&lookup, "MIRROR_TIMEOUT_SECS", cfg.remote.timeout_secs);
    cfg.sync.page_size = env_or_u32(&lookup, "MIRROR_PAGE_SIZE", cfg.sync.page_size);
    cfg.sync.idle_pages_before_stop = env_or_u32(
        &lookup,
        "MIRROR_IDLE_PAGES",
        cfg.sync.idle_pages_before_stop,
    );
    cfg.store.dest = env_or_path(&lookup, "MIRROR_DEST", cfg.store.dest.take());
    cfg.auth.token_file = env_or_path(&lookup, "MIRROR_TOKEN_FILE", cfg.auth.token_file.take());
}

fn validate(cfg: &MirrorConfig) -> Result<()> {
    if cfg.remote.owner.trim().is_empty() || cfg.remote.repo.trim().is_empty() {
        return Err(anyhow!("invalid remote: owner and repo cannot be empty"));
    }
    if cfg.remote.api_base.trim().is_empty() {
        return Err(anyhow!("invalid remote api base: cannot be empty"));
    }
    if cfg.remote.timeout_secs == 0 {
        return Err(anyhow!("invalid remote timeout: must be >= 1 second"));
    }
    if !(1..=MAX_PAGE_SIZE).contains(&cfg.sync.page_size) {
        return Err(anyhow!(
            "invalid sync page size: require 1 <= page_size <= {MAX_PAGE_SIZE}"
        ));
    }
    if cfg.sync.idle_pages_before_stop == 0 {
        return Err(anyhow!("invalid sync idle pages: must be >= 1"));
    }
    Ok(())
}

fn resolve_config_path() -> Option<PathBuf> {
    if let Some(custom) = non_empty(env::var("MIRROR_CONFIG_PATH").ok()) {
        return Some(PathBuf::from(custom));
    }

    let home = dirs::home_dir()?;
    Some(home.join(".issue-mirror").join("config.toml"))
}

fn merge_toml(base: &mut MirrorConfig, raw: &str) -> Result<()> {
    let parsed: PartialMirrorConfig = toml::from_str(raw)?;
    if let Some(remote) = parsed.remote {
        base.remote = remote;
    }
    if let Some(sync) = parsed.sync {
        base.sync = sync;
    }
    if let Some(store) = parsed.store {
        base.store = store;
    }
    if let Some(auth) = parsed.auth {
        base.auth = auth;
    }
    Ok(())
}

fn merge_file_config(base: &mut MirrorConfig) -> Result<()> {
    let Some(path) = resolve_config_path() else {
        return Ok(());
    };
    if !path.exists() {
        return Ok(());
    }

    let raw = fs::read_to_string(&path)?;
    merge_toml(base, &raw)
        .map_err(|err| anyhow!("failed to parse mirror config {}: {err}", path.display()))
}

pub fn load_config() -> Result<MirrorConfig> {
    let mut cfg = MirrorConfig::default();
    merge_file_config(&mut cfg)?;
    apply_env(&mut cfg, |var| env::var(var).ok());
    validate(&cfg)?;
    Ok(cfg)
}
