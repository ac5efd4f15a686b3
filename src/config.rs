// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is loaded from the environment once at startup by
//! [`AppConfig::from_env`].
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `DATA_DIR` | Directory of the embedded database | `./data` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |
//! | `APP_ENV` | `development` or `production` | `development` |
//! | `SOLANA_URL` | Chain RPC endpoint | `http://127.0.0.1:8899` |
//! | `ASSET_API_URL` | Compressed-asset indexer endpoint | `SOLANA_URL` |
//! | `RPC_TIMEOUT_MS` | Per-call RPC timeout | `15000` |
//! | `KEY_RING` | JSON object `{ "<version>": "<64 hex chars>" }` | Required |
//! | `KEY_RING_CURRENT` | Version used for new encryptions | Highest version |
//! | `ENABLE_SOLANA` | Force the new-ledger signing domain | `false` |
//! | `SOLANA_STATUS_URL` | Migration status endpoint | Unset |
//! | `HNT_MINT`, `IOT_MINT`, `MOBILE_MINT` | Mint addresses | Required in ledger mode |
//! | `DC_MINT` | Data credit mint address | Mainnet DC mint |
//! | `ECC_VERIFIER` | ECC verifier signer address | Required in ledger mode |
//! | `ECC_VERIFY_ENDPOINT` | Remote verifier that co-signs mints | Unset |
//! | `INITIAL_SOL` | Balance to top new owners up to, in SOL | Unset |
//! | `BASE_PRIORITY_FEE_MICROLAMPORTS` | Compute-unit price floor | `1` |
//! | `ADDRESS_GATE_MIN_HOTSPOT_ID` | First record id that must match its gateway | `32951` |
//! | `TREE_HEADROOM` | Free leaves kept before a mint | `2` |
//!
//! Ledger mode is on when `ENABLE_SOLANA=true` or `SOLANA_STATUS_URL` is
//! set. Without it the service only co-signs in the legacy domain and the
//! new-ledger routes answer 503.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::blockchain::Pubkey;
use crate::custody::{CustodyError, KeyRing};
use crate::onboarding::ledger::LAMPORTS_PER_SOL;
use crate::onboarding::OnboardingPolicy;

/// Environment variable name for the embedded database directory.
pub const DATA_DIR_ENV: &str = "DATA_DIR";

/// File name of the database inside `DATA_DIR`.
pub const DATABASE_FILE: &str = "onboarding.redb";

pub const DEFAULT_DC_MINT: &str = "dcuc8Amr83Wz27ZkQ2K9NS6r8zRpf1J6cvArEBDZDmm";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },

    #[error("KEY_RING is invalid: {0}")]
    KeyRing(#[from] CustodyError),
}

fn invalid(name: &'static str, reason: impl fmt::Display) -> ConfigError {
    ConfigError::Invalid {
        name,
        reason: reason.to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    pub fn is_development(self) -> bool {
        self == AppEnv::Development
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Addresses needed to build new-ledger transactions.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    pub hnt_mint: Pubkey,
    pub iot_mint: Pubkey,
    pub mobile_mint: Pubkey,
    pub dc_mint: Pubkey,
    pub ecc_verifier: Pubkey,
    pub ecc_verify_endpoint: Option<String>,
    pub initial_lamports: Option<u64>,
    pub base_priority_fee: u64,
}

pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub log_format: LogFormat,
    pub app_env: AppEnv,
    pub solana_url: String,
    pub asset_api_url: String,
    pub rpc_timeout: Duration,
    pub key_ring: KeyRing,
    pub enable_solana: bool,
    pub solana_status_url: Option<String>,
    /// Present in ledger mode.
    pub ledger: Option<LedgerConfig>,
    pub policy: OnboardingPolicy,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load from an arbitrary variable source. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let host = var("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = parse_or(&var, "PORT", 8080u16)?;
        let data_dir = var(DATA_DIR_ENV).map_or_else(|| PathBuf::from("./data"), PathBuf::from);
        let log_format = match var("LOG_FORMAT").as_deref() {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };
        let app_env = match var("APP_ENV").as_deref() {
            None | Some("development") => AppEnv::Development,
            Some("production") => AppEnv::Production,
            Some(other) => return Err(invalid("APP_ENV", format!("unknown environment {other:?}"))),
        };

        let solana_url = endpoint(
            "SOLANA_URL",
            var("SOLANA_URL").unwrap_or_else(|| "http://127.0.0.1:8899".to_string()),
        )?;
        let asset_api_url = match var("ASSET_API_URL") {
            Some(url) => endpoint("ASSET_API_URL", url)?,
            None => solana_url.clone(),
        };
        let rpc_timeout = Duration::from_millis(parse_or(&var, "RPC_TIMEOUT_MS", 15_000u64)?);

        let raw_ring = var("KEY_RING").ok_or(ConfigError::Missing("KEY_RING"))?;
        let current = var("KEY_RING_CURRENT")
            .map(|v| v.parse::<u32>().map_err(|e| invalid("KEY_RING_CURRENT", e)))
            .transpose()?;
        let key_ring = KeyRing::from_json(&raw_ring, current)?;

        let enable_solana = match var("ENABLE_SOLANA").as_deref() {
            None => false,
            Some(v) => v
                .parse::<bool>()
                .map_err(|_| invalid("ENABLE_SOLANA", "expected true or false"))?,
        };
        let solana_status_url = var("SOLANA_STATUS_URL")
            .map(|url| endpoint("SOLANA_STATUS_URL", url))
            .transpose()?;

        let ledger = if enable_solana || solana_status_url.is_some() {
            Some(LedgerConfig {
                hnt_mint: required_pubkey(&var, "HNT_MINT")?,
                iot_mint: required_pubkey(&var, "IOT_MINT")?,
                mobile_mint: required_pubkey(&var, "MOBILE_MINT")?,
                dc_mint: pubkey(
                    "DC_MINT",
                    &var("DC_MINT").unwrap_or_else(|| DEFAULT_DC_MINT.to_string()),
                )?,
                ecc_verifier: required_pubkey(&var, "ECC_VERIFIER")?,
                ecc_verify_endpoint: var("ECC_VERIFY_ENDPOINT")
                    .map(|url| endpoint("ECC_VERIFY_ENDPOINT", url))
                    .transpose()?,
                initial_lamports: var("INITIAL_SOL").map(|v| sol_to_lamports(&v)).transpose()?,
                base_priority_fee: parse_or(&var, "BASE_PRIORITY_FEE_MICROLAMPORTS", 1u64)?,
            })
        } else {
            None
        };

        let defaults = OnboardingPolicy::default();
        let policy = OnboardingPolicy {
            address_gate_min_hotspot_id: parse_or(
                &var,
                "ADDRESS_GATE_MIN_HOTSPOT_ID",
                defaults.address_gate_min_hotspot_id,
            )?,
            tree_headroom: parse_or(&var, "TREE_HEADROOM", defaults.tree_headroom)?,
        };

        Ok(Self {
            host,
            port,
            data_dir,
            log_format,
            app_env,
            solana_url,
            asset_api_url,
            rpc_timeout,
            key_ring,
            enable_solana,
            solana_status_url,
            ledger,
            policy,
        })
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(DATABASE_FILE)
    }
}

fn parse_or<T>(var: &impl Fn(&str) -> Option<String>, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match var(name) {
        Some(v) => v.trim().parse().map_err(|e| invalid(name, e)),
        None => Ok(default),
    }
}

/// Reject values that are not absolute http(s) URLs.
fn endpoint(name: &'static str, value: String) -> Result<String, ConfigError> {
    let parsed = url::Url::parse(value.trim()).map_err(|e| invalid(name, e))?;
    match parsed.scheme() {
        "http" | "https" => Ok(value.trim().to_string()),
        other => Err(invalid(name, format!("unsupported scheme {other:?}"))),
    }
}

fn pubkey(name: &'static str, value: &str) -> Result<Pubkey, ConfigError> {
    value.trim().parse().map_err(|e| invalid(name, e))
}

fn required_pubkey(var: &impl Fn(&str) -> Option<String>, name: &'static str) -> Result<Pubkey, ConfigError> {
    let value = var(name).ok_or(ConfigError::Missing(name))?;
    pubkey(name, &value)
}

fn sol_to_lamports(value: &str) -> Result<u64, ConfigError> {
    let sol: f64 = value.trim().parse().map_err(|e| invalid("INITIAL_SOL", e))?;
    if !sol.is_finite() || sol < 0.0 {
        return Err(invalid("INITIAL_SOL", "must be a non-negative number"));
    }
    Ok((sol * LAMPORTS_PER_SOL as f64).round() as u64)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    const RING: &str = r#"{"1":"0909090909090909090909090909090909090909090909090909090909090909"}"#;
    const MINT: &str = "11111111111111111111111111111111";

    fn load(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        AppConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_apply() {
        let config = load(&[("KEY_RING", RING)]).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8080);
        assert_eq!(config.database_path(), PathBuf::from("./data").join(DATABASE_FILE));
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert!(config.app_env.is_development());
        assert_eq!(config.asset_api_url, config.solana_url);
        assert_eq!(config.rpc_timeout, Duration::from_millis(15_000));
        assert_eq!(config.policy.address_gate_min_hotspot_id, 32951);
        assert_eq!(config.policy.tree_headroom, 2);
        assert!(config.ledger.is_none());
    }

    #[test]
    fn key_ring_is_required() {
        assert!(matches!(load(&[]), Err(ConfigError::Missing("KEY_RING"))));
        assert!(matches!(
            load(&[("KEY_RING", "{}")]),
            Err(ConfigError::KeyRing(_))
        ));
    }

    #[test]
    fn ledger_mode_requires_mints() {
        let err = load(&[("KEY_RING", RING), ("ENABLE_SOLANA", "true")]).err();
        assert!(matches!(err, Some(ConfigError::Missing("HNT_MINT"))));
    }

    #[test]
    fn ledger_mode_loads_addresses() {
        let config = load(&[
            ("KEY_RING", RING),
            ("SOLANA_STATUS_URL", "http://status"),
            ("HNT_MINT", MINT),
            ("IOT_MINT", MINT),
            ("MOBILE_MINT", MINT),
            ("ECC_VERIFIER", MINT),
            ("INITIAL_SOL", "0.02"),
            ("BASE_PRIORITY_FEE_MICROLAMPORTS", "5"),
        ])
        .unwrap();
        let ledger = config.ledger.unwrap();
        assert_eq!(ledger.dc_mint.to_string(), DEFAULT_DC_MINT);
        assert_eq!(ledger.initial_lamports, Some(20_000_000));
        assert_eq!(ledger.base_priority_fee, 5);
        assert!(!config.enable_solana);
    }

    #[test]
    fn malformed_values_are_named() {
        let err = load(&[("KEY_RING", RING), ("PORT", "eighty")]).err().unwrap();
        assert!(err.to_string().starts_with("PORT is invalid"));

        let err = load(&[("KEY_RING", RING), ("APP_ENV", "staging")]).err().unwrap();
        assert!(err.to_string().starts_with("APP_ENV is invalid"));

        let err = load(&[("KEY_RING", RING), ("SOLANA_URL", "ftp://node")]).err().unwrap();
        assert!(err.to_string().starts_with("SOLANA_URL is invalid"));
    }
}
