// src/settings.rs
//! Runtime configuration.
//!
//! Values are layered: built-in defaults, then an optional
//! `credential-trust.toml` (or any format `config` understands) in the working
//! directory, then `CREDENTIAL_TRUST_*` environment variables. A `.env` file is
//! loaded first, if present.

use crate::error::SettingsError;
use crate::models::credential_object::SELF_ASSERTED_PROVIDERS;
use config::{Config, Environment, File};
use dotenv::dotenv;
use serde::Deserialize;
use std::time::Duration;

/// Default JSON-RPC endpoint: a local node.
pub const DEFAULT_RPC_URL: &str = "http://localhost:8545";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    /// JSON-RPC endpoint of the chain holding the identity contracts
    pub rpc_url: String,

    /// Upper bound for one whole validation call, in seconds; 0 disables it
    pub rpc_timeout_secs: u64,

    /// Maximum age of a holder's nonce, in seconds
    pub nonce_window_secs: u64,

    /// Providers whose contents are self-asserted and never verified
    pub excluded_providers: Vec<String>,

    /// Claim type of organisation company-info claims
    pub company_info_claim_type: u64,
}

impl Settings {
    /// Loads settings from the default file name and environment.
    pub fn load() -> Result<Self, SettingsError> {
        Self::load_from("credential-trust")
    }

    /// Loads settings using `file` (without extension) as the optional file layer.
    pub fn load_from(file: &str) -> Result<Self, SettingsError> {
        dotenv().ok();

        let settings = Config::builder()
            .set_default("rpc_url", DEFAULT_RPC_URL)?
            .set_default("rpc_timeout_secs", 30_u64)?
            .set_default("nonce_window_secs", 300_u64)?
            .set_default(
                "excluded_providers",
                SELF_ASSERTED_PROVIDERS
                    .iter()
                    .map(|provider| provider.to_string())
                    .collect::<Vec<_>>(),
            )?
            .set_default("company_info_claim_type", 1_u64)?
            .add_source(File::with_name(file).required(false))
            .add_source(
                Environment::with_prefix("CREDENTIAL_TRUST")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("excluded_providers"),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Whole-call timeout, `None` when `rpc_timeout_secs` is 0.
    pub fn rpc_timeout(&self) -> Option<Duration> {
        (self.rpc_timeout_secs > 0).then(|| Duration::from_secs(self.rpc_timeout_secs))
    }

    pub fn nonce_window(&self) -> Duration {
        Duration::from_secs(self.nonce_window_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_file() {
        let settings = Settings::load_from("no-such-settings-file").unwrap();
        assert_eq!(settings.nonce_window(), Duration::from_secs(300));
        assert_eq!(settings.rpc_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(settings.excluded_providers, ["OWN", "ADDITIONAL_INFO", "SIGNATURE"]);
    }

    #[test]
    fn test_zero_timeout_disables_it() {
        let settings = Settings {
            rpc_timeout_secs: 0,
            ..Settings::load_from("no-such-settings-file").unwrap()
        };
        assert_eq!(settings.rpc_timeout(), None);
    }

    #[test]
    fn test_file_layer_overrides_defaults() -> anyhow::Result<()> {
        let dir = std::env::temp_dir().join(format!("credential-trust-settings-{}", std::process::id()));
        std::fs::create_dir_all(&dir)?;
        let file = dir.join("override.toml");
        std::fs::write(
            &file,
            "rpc_url = \"http://node.example:8545\"\nnonce_window_secs = 60\nexcluded_providers = [\"OWN\"]\n",
        )?;

        let settings = Settings::load_from(file.with_extension("").to_str().unwrap_or_default())?;
        assert_eq!(settings.rpc_url, "http://node.example:8545");
        assert_eq!(settings.nonce_window_secs, 60);
        assert_eq!(settings.excluded_providers, ["OWN"]);

        std::fs::remove_dir_all(&dir)?;
        Ok(())
    }
}
