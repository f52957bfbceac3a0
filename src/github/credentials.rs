use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::error::MirrorError;

#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub token: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("token", &"<redacted>")
            .finish()
    }
}

fn parse(raw: &str) -> Option<Credentials> {
    let (username, token) = raw.trim().split_once(':')?;
    if username.is_empty() || token.is_empty() {
        return None;
    }
    Some(Credentials {
        username: username.to_string(),
        token: token.to_string(),
    })
}

/// Reads a `<username>:<token>` file.
pub fn load(path: &Path) -> Result<Credentials> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read token file {}", path.display()))?;
    parse(&raw).ok_or_else(|| MirrorError::InvalidCredentials(path.to_path_buf()).into())
}
