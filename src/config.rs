use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Serialized},
};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use std::time::Duration;
use url::Url;

use crate::error::ShortenerError;

/// Key used to seal identity tokens when none is configured.
pub const DEFAULT_IDENTITY_KEY: &str = "2aa6a1fe40523a5441bf3e4cb518c74a";

/// Name of the cookie carrying the identity token.
pub const IDENTITY_COOKIE: &str = "UserTokenID";

/// Nominal lifetime of the identity cookie. The user row itself never expires.
pub const IDENTITY_COOKIE_TTL: time::Duration = time::Duration::hours(24);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server_address: String,
    pub database_url: String,
    pub base_url: Option<Url>,
    pub loglevel: String,
    /// 32 hex chars, one AES-128 block.
    pub identity_key: String,
    pub storage_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_address: "127.0.0.1:8080".to_string(),
            database_url: "sqlite:shortener.db".to_string(),
            base_url: None,
            loglevel: "info".to_string(),
            identity_key: DEFAULT_IDENTITY_KEY.to_string(),
            storage_timeout_secs: 5,
        }
    }
}

/// Command line overrides; they win over the environment.
#[derive(Debug, Default, Parser, Serialize)]
#[command(name = "shortener", about = "URL shortener with cookie identities")]
pub struct CliArgs {
    /// Address to listen on
    #[arg(short = 'a', long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_address: Option<String>,

    /// Database connection string
    #[arg(short = 'd', long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_url: Option<String>,

    /// Public base URL used when rendering short links
    #[arg(short = 'b', long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<Url>,
}

impl Config {
    /// Layer defaults, raw env vars and CLI flags, in that order.
    pub fn load(args: CliArgs) -> Result<Self, figment::Error> {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(
                Env::raw()
                    .only(&[
                        "SERVER_ADDRESS",
                        "DATABASE_DSN",
                        "BASE_URL",
                        "LOGLEVEL",
                        "IDENTITY_KEY",
                        "STORAGE_TIMEOUT_SECS",
                    ])
                    .map(|key| {
                        if key.as_str().eq_ignore_ascii_case("DATABASE_DSN") {
                            "database_url".into()
                        } else {
                            key.as_str().to_ascii_lowercase().into()
                        }
                    }),
            )
            .merge(Serialized::defaults(args))
            .extract()
    }

    pub fn storage_timeout(&self) -> Duration {
        Duration::from_secs(self.storage_timeout_secs)
    }

    /// Decode the configured identity key into one cipher block.
    pub fn identity_key_bytes(&self) -> Result<[u8; 16], ShortenerError> {
        let raw = hex::decode(self.identity_key.trim())
            .map_err(|e| ShortenerError::Config(format!("IDENTITY_KEY is not hex: {e}")))?;
        let actual = raw.len();
        raw.try_into().map_err(|_| {
            ShortenerError::Config(format!("IDENTITY_KEY must be 16 bytes, got {actual}"))
        })
    }
}

pub static CONFIG: LazyLock<Config> = LazyLock::new(|| {
    dotenvy::dotenv().ok();
    Config::load(CliArgs::parse()).unwrap_or_else(|e| {
        eprintln!("invalid configuration: {e}");
        std::process::exit(2);
    })
});
