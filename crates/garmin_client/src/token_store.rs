//! Persistence for the OAuth token pair.
//!
//! Tokens live in two places: `oauth2_token.json` inside the token directory,
//! and a base64-encoded copy of the same JSON in a single file (handy for
//! environments where mounting a directory is awkward). Both are opaque to
//! the rest of the workspace.

use std::path::Path;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::GarminError;
use crate::config::TokenPaths;

pub const TOKEN_FILE_NAME: &str = "oauth2_token.json";

/// Window before expiry in which a token is treated as already stale.
pub const EXPIRY_SKEW_SECS: i64 = 300;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct OAuth2Token {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    /// Unix timestamp after which the access token is invalid.
    pub expires_at: i64,
    /// Unix timestamp after which the refresh token is invalid.
    pub refresh_token_expires_at: i64,
    #[serde(default)]
    pub scope: String,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl OAuth2Token {
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.expires_at - EXPIRY_SKEW_SECS
    }

    pub fn refresh_expired(&self) -> bool {
        Utc::now().timestamp() >= self.refresh_token_expires_at - EXPIRY_SKEW_SECS
    }
}

/// Result of inspecting the persisted tokens without touching the network.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct TokenInfo {
    pub token_dir: String,
    pub base64_file: String,
    pub exists: bool,
    pub valid: bool,
    pub error: String,
}

#[derive(Clone, Debug)]
pub struct TokenStore {
    paths: TokenPaths,
}

impl TokenStore {
    pub fn new(paths: TokenPaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &TokenPaths {
        &self.paths
    }

    fn token_file(&self) -> std::path::PathBuf {
        self.paths.token_dir.join(TOKEN_FILE_NAME)
    }

    /// True when either persisted form is present.
    pub fn exists(&self) -> bool {
        self.token_file().exists() || self.paths.base64_file.exists()
    }

    /// Write both persisted forms, creating the token directory as needed.
    pub fn dump(&self, token: &OAuth2Token) -> Result<(), GarminError> {
        std::fs::create_dir_all(&self.paths.token_dir)?;
        let json = serde_json::to_string_pretty(token)?;
        std::fs::write(self.token_file(), &json)?;
        if let Some(parent) = self.paths.base64_file.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.paths.base64_file, STANDARD.encode(json.as_bytes()))?;
        Ok(())
    }

    /// Load tokens, preferring the token directory over the base64 file.
    pub fn load(&self) -> Result<OAuth2Token, GarminError> {
        let token_file = self.token_file();
        if token_file.exists() {
            let json = std::fs::read_to_string(token_file)?;
            return Ok(serde_json::from_str(&json)?);
        }
        if self.paths.base64_file.exists() {
            let encoded = std::fs::read_to_string(&self.paths.base64_file)?;
            let decoded = STANDARD
                .decode(encoded.trim())
                .map_err(|e| GarminError::Config(format!("decoding base64 token file: {e}")))?;
            return Ok(serde_json::from_slice(&decoded)?);
        }
        Err(GarminError::Config(format!(
            "no tokens found in {} or {}",
            self.paths.token_dir.display(),
            self.paths.base64_file.display()
        )))
    }

    /// Remove both persisted forms. Missing paths are not an error.
    pub fn remove(&self) -> Result<bool, GarminError> {
        let mut removed = false;
        if self.paths.token_dir.exists() {
            remove_path(&self.paths.token_dir)?;
            removed = true;
        }
        if self.paths.base64_file.exists() {
            std::fs::remove_file(&self.paths.base64_file)?;
            removed = true;
        }
        Ok(removed)
    }

    /// Inspect the persisted tokens: present, parseable, refresh not expired.
    pub fn info(&self) -> TokenInfo {
        let mut info = TokenInfo {
            token_dir: self.paths.token_dir.display().to_string(),
            base64_file: self.paths.base64_file.display().to_string(),
            exists: self.exists(),
            valid: false,
            error: String::new(),
        };
        if !info.exists {
            return info;
        }
        match self.load() {
            Ok(token) if token.refresh_expired() => {
                info.error = "refresh token expired; re-authentication required".into();
            }
            Ok(_) => info.valid = true,
            Err(e) => info.error = e.to_string(),
        }
        info
    }
}

fn remove_path(path: &Path) -> std::io::Result<()> {
    if path.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    }
}
