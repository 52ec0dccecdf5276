//! Configuration storage: default suite and master key material

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use srtp_relay_crypto::{lookup_suite, CryptoParams, CryptoSuite};

/// Suite used when neither the command line nor the config names one.
pub const DEFAULT_SUITE: &str = "AES_CM_128_HMAC_SHA1_80";

/// Application configuration
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// SDES suite name, e.g. `AES_CM_128_HMAC_SHA1_80`
    pub default_suite: Option<String>,
    /// Master key material handed over by signaling
    pub keys: Option<KeyConfig>,
}

/// The `[keys]` table
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct KeyConfig {
    /// Base64 master key || master salt, optionally with an `inline:` prefix
    pub inline: Option<String>,
    #[serde(default)]
    pub mki: u64,
    /// MKI length in bytes, 0 for no MKI
    #[serde(default)]
    pub mki_len: usize,
    /// Crypto attribute tag
    #[serde(default)]
    pub tag: u32,
}

impl Config {
    /// Get config directory path
    fn config_dir() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "srtp-relay-crypto", "srtp-relay-crypto")
            .context("Could not determine config directory")?;
        Ok(proj_dirs.config_dir().to_path_buf())
    }

    /// Get config file path
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load configuration from the platform config directory
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from `path`; a missing file yields the defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&content).context("Failed to parse config file")
    }

    /// Save configuration to `path`
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content).context("Failed to write config file")?;

        // Set restrictive permissions on config file (contains master keys)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = fs::Permissions::from_mode(0o600);
            fs::set_permissions(path, perms).context("Failed to set config permissions")?;
        }

        Ok(())
    }

    /// Resolve the suite: explicit name first, then config, then the default
    pub fn suite(&self, name: Option<&str>) -> Result<&'static CryptoSuite> {
        let name = name
            .or(self.default_suite.as_deref())
            .unwrap_or(DEFAULT_SUITE);
        Ok(lookup_suite(name)?)
    }

    /// Build context parameters from an explicit inline key or the `[keys]` table
    pub fn params(&self, suite: &'static CryptoSuite, inline: Option<&str>) -> Result<CryptoParams> {
        let keys = self.keys.clone().unwrap_or_default();
        let inline = inline
            .or(keys.inline.as_deref())
            .context("No master key given (use --key or set [keys] inline in the config)")?;

        let params = CryptoParams::from_inline_key(suite, inline)
            .context("Invalid master key")?
            .with_mki(keys.mki, keys.mki_len)?
            .with_tag(keys.tag);
        Ok(params)
    }
}
