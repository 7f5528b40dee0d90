//! Configuration loading and validation for the key ring.
//!
//! This is the collaborator side of the [`KeyProvider`](crate::keys::KeyProvider)
//! boundary: it turns environment variables into a [`KeyRing`]. The field codec
//! itself never reads configuration.
//!
//! | Variable                        | Meaning                                              |
//! |---------------------------------|------------------------------------------------------|
//! | `PHI_CODEC_ACTIVE_KEY_VERSION`  | Version id used for new encryptions. **Required.**   |
//! | `PHI_CODEC_KEYS`                | `<version>:<base64url key>` list, comma-separated. **Required.** |
//! | `PHI_CODEC_LOG_LEVEL`           | Tracing log level (default `info`).                  |

use std::collections::HashSet;

use anyhow::{Context, Result};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use common::KeyVersionId;
use serde::Deserialize;
use tracing::info;

use crate::keys::{InMemoryKeyProvider, KeyBytes, KeyRing, KeyStatus, KeyVersion};

/// Environment variable prefix for every setting.
pub const ENV_PREFIX: &str = "PHI_CODEC";

/// Validated key ring configuration.
#[derive(Clone, Deserialize)]
pub struct Config {
    /// Version id used for new encryptions. **Required.**
    pub active_key_version: u16,

    /// Comma-separated `<version>:<base64url-no-pad key>` entries. Every
    /// version other than the active one is loaded as retired. **Required.**
    pub keys: String,

    /// Tracing log level (e.g. `"info"`, `"debug"`).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".into()
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("active_key_version", &self.active_key_version)
            .field("keys", &"[REDACTED]")
            .field("log_level", &self.log_level)
            .finish()
    }
}

impl Config {
    /// Load and validate configuration from `PHI_CODEC_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if any required variable is absent or cannot be parsed.
    pub fn from_env() -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::with_prefix(ENV_PREFIX))
            .build()
            .context("failed to build configuration from environment")?;

        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise configuration")?;

        c.validate()?;
        Ok(c)
    }

    /// Build the [`KeyRing`] described by this configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if an entry is malformed, a key is not 32 bytes, a
    /// version repeats, or the active version is not listed.
    pub fn key_ring(&self) -> Result<KeyRing> {
        let active = KeyVersionId(self.active_key_version);
        let entries = parse_key_entries(&self.keys)?;

        if !entries.iter().any(|(id, _)| *id == active) {
            anyhow::bail!("PHI_CODEC_ACTIVE_KEY_VERSION {active} is not listed in PHI_CODEC_KEYS");
        }

        let versions = entries.into_iter().map(|(id, key)| KeyVersion {
            id,
            key,
            status: if id == active {
                KeyStatus::Active
            } else {
                KeyStatus::Retired
            },
        });
        KeyRing::from_versions(versions).context("invalid key ring configuration")
    }

    /// Build an [`InMemoryKeyProvider`] seeded with [`Config::key_ring`].
    ///
    /// # Errors
    ///
    /// Returns an error under the same conditions as [`Config::key_ring`].
    pub fn key_provider(&self) -> Result<InMemoryKeyProvider> {
        let ring = self.key_ring()?;
        info!(
            versions = ring.len(),
            active = self.active_key_version,
            "key ring loaded from configuration"
        );
        Ok(InMemoryKeyProvider::from_ring(ring))
    }

    /// Validate all fields, returning a descriptive error on the first failure.
    fn validate(&self) -> Result<()> {
        ensure_non_empty(&self.keys, "PHI_CODEC_KEYS")?;
        ensure_non_empty(&self.log_level, "PHI_CODEC_LOG_LEVEL")?;
        self.key_ring().map(|_| ())
    }
}

/// Parse `<version>:<base64url key>` entries, rejecting duplicate versions.
fn parse_key_entries(raw: &str) -> Result<Vec<(KeyVersionId, KeyBytes)>> {
    let mut seen = HashSet::new();
    let mut entries = Vec::new();

    for (index, entry) in raw.split(',').map(str::trim).enumerate() {
        if entry.is_empty() {
            continue;
        }
        let (id, encoded) = entry
            .split_once(':')
            .with_context(|| format!("PHI_CODEC_KEYS entry {index} must be <version>:<key>"))?;
        let id: u16 = id
            .trim()
            .parse()
            .with_context(|| format!("PHI_CODEC_KEYS entry {index} has an invalid version id"))?;
        let id = KeyVersionId(id);

        if !seen.insert(id) {
            anyhow::bail!("PHI_CODEC_KEYS lists key version {id} more than once");
        }

        let raw_key = URL_SAFE_NO_PAD
            .decode(encoded.trim())
            .with_context(|| format!("key version {id} is not valid base64url"))?;
        let key = KeyBytes::from_slice(&raw_key)
            .with_context(|| format!("key version {id} has invalid key material"))?;
        entries.push((id, key));
    }

    if entries.is_empty() {
        anyhow::bail!("PHI_CODEC_KEYS must list at least one key version");
    }
    Ok(entries)
}

fn ensure_non_empty(value: &str, name: &str) -> Result<()> {
    if value.trim().is_empty() {
        anyhow::bail!("{name} is required and must not be empty");
    }
    Ok(())
}
