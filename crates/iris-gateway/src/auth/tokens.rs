// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! Bearer token generation and storage, generalised from the teacher's
//! single-operator-token file to one token per user id (§6: "Bearer tokens
//! are opaque to the core; it delegates to an `Authenticator` that maps
//! token → user id or fails").
//!
//! Raw tokens are never persisted — only their SHA-256 digest, alongside
//! the user id it authenticates as. Comparison is constant-time
//! ([`subtle::ConstantTimeEq`]) so a timing side channel can't narrow down
//! which entry, if any, is about to match.

use std::path::Path;

use anyhow::Context;
use async_trait::async_trait;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use tokio::sync::RwLock;

/// A raw bearer token — shown to the operator exactly once, at the moment
/// it's generated. Call [`StoredToken::hash`] immediately, then drop this.
#[derive(Debug)]
#[must_use = "display this token to the operator, then hash it for storage"]
pub struct RawToken(String);

impl RawToken {
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        OsRng.fill_bytes(&mut bytes);
        RawToken(base64url_encode(&bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RawToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The stored form of a bearer token: only the SHA-256 digest, plus the
/// user id it resolves to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredToken {
    pub user_id: String,
    #[serde(with = "hex_bytes")]
    digest: [u8; 32],
}

impl StoredToken {
    fn hash(user_id: impl Into<String>, raw: &str) -> Self {
        StoredToken { user_id: user_id.into(), digest: sha256(raw.as_bytes()) }
    }

    fn verify(&self, provided: &str) -> bool {
        bool::from(sha256(provided.as_bytes()).ct_eq(&self.digest))
    }
}

/// On-disk YAML format: a flat list of `{user_id, digest}` entries.
#[derive(Debug, Default, Serialize, Deserialize)]
struct TokenFile {
    #[serde(default)]
    tokens: Vec<StoredToken>,
}

/// Maps bearer tokens to user ids, backed by a YAML file on disk. The only
/// [`Authenticator`] implementation this crate ships; a deployment that
/// wants tokens issued from an external identity provider implements the
/// trait directly instead of using this type.
pub struct TokenStore {
    path: std::path::PathBuf,
    entries: RwLock<Vec<StoredToken>>,
}

impl TokenStore {
    /// Loads `path` if it exists, otherwise starts empty — `iris token
    /// regenerate <user>` is how the first token gets created.
    pub async fn load_or_empty(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = if path.exists() {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("reading token file {}", path.display()))?;
            let file: TokenFile = serde_yaml::from_str(&text)
                .with_context(|| format!("parsing token file {}", path.display()))?;
            file.tokens
        } else {
            Vec::new()
        };
        Ok(Self { path, entries: RwLock::new(entries) })
    }

    /// Generates a new token for `user_id`, replacing any token that user
    /// already held, persists the file, and returns the raw token so the
    /// caller can display it exactly once.
    pub async fn regenerate(&self, user_id: &str) -> anyhow::Result<RawToken> {
        let raw = RawToken::generate();
        let stored = StoredToken::hash(user_id, raw.as_str());

        let mut entries = self.entries.write().await;
        entries.retain(|e| e.user_id != user_id);
        entries.push(stored);
        self.persist(&entries)?;

        Ok(raw)
    }

    /// User ids with a token on file, for `iris token show`. Never returns
    /// the tokens or their hashes.
    pub async fn known_users(&self) -> Vec<String> {
        self.entries.read().await.iter().map(|e| e.user_id.clone()).collect()
    }

    fn persist(&self, entries: &[StoredToken]) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating token directory {}", parent.display()))?;
        }
        let file = TokenFile { tokens: entries.to_vec() };
        let yaml = serde_yaml::to_string(&file).context("serialising token file")?;
        write_secret_file(&self.path, yaml.as_bytes())
    }
}

#[async_trait]
impl super::Authenticator for TokenStore {
    async fn authenticate(&self, token: &str) -> Option<String> {
        self.entries
            .read()
            .await
            .iter()
            .find(|e| e.verify(token))
            .map(|e| e.user_id.clone())
    }
}

impl Clone for StoredToken {
    fn clone(&self) -> Self {
        StoredToken { user_id: self.user_id.clone(), digest: self.digest }
    }
}

fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

fn base64url_encode(bytes: &[u8]) -> String {
    use base64::Engine;
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// Write `data` to `path` with mode 0o600 on Unix (owner-read/write only).
fn write_secret_file(path: &Path, data: &[u8]) -> anyhow::Result<()> {
    #[cfg(unix)]
    {
        use std::io::Write;
        use std::os::unix::fs::OpenOptionsExt;
        let mut f = std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .with_context(|| format!("writing secret file {}", path.display()))?;
        f.write_all(data)?;
    }
    #[cfg(not(unix))]
    {
        std::fs::write(path, data)
            .with_context(|| format!("writing secret file {}", path.display()))?;
    }
    Ok(())
}

mod hex_bytes {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(v: &[u8; 32], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&hex::encode(v))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<[u8; 32], D::Error> {
        let s = String::deserialize(d)?;
        let bytes = hex::decode(&s).map_err(D::Error::custom)?;
        bytes.try_into().map_err(|_| D::Error::custom("expected 32-byte hex"))
    }
}
