use figment::{
    providers::{Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct MercadoPagoSettings {
    pub access_token: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_payment_expiry", with = "humantime_serde")]
    pub payment_expiry: Duration,
    #[serde(default = "default_payer_email")]
    pub payer_email: String,
    #[serde(default = "default_payer_first_name")]
    pub payer_first_name: String,
    #[serde(default = "default_payer_last_name")]
    pub payer_last_name: String,
}

impl Default for MercadoPagoSettings {
    fn default() -> Self {
        Self {
            access_token: String::new(),
            api_base: default_api_base(),
            timeout_ms: default_timeout_ms(),
            payment_expiry: default_payment_expiry(),
            payer_email: default_payer_email(),
            payer_first_name: default_payer_first_name(),
            payer_last_name: default_payer_last_name(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub mercadopago: MercadoPagoSettings,
    pub server_port: u16,
    pub public_dir: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mercadopago: MercadoPagoSettings::default(),
            server_port: 3000,
            public_dir: "public".to_string(),
        }
    }
}

impl Config {
    /// Load from config.toml (if present) and environment variables.
    /// Environment variables override file values.
    /// Supported env keys: MP_ACCESS_TOKEN, MP_API_BASE, MP_TIMEOUT_MS,
    /// MP_PAYMENT_EXPIRY, MP_PAYER_EMAIL, MP_PAYER_FIRST_NAME,
    /// MP_PAYER_LAST_NAME, SERVER_PORT, PUBLIC_DIR
    pub fn load() -> Self {
        // 1) Start with defaults + config.toml only if it exists
        let base: Config = Default::default();
        let mut fig = Figment::from(Serialized::defaults(base));
        if std::path::Path::new("config.toml").exists() {
            fig = fig.merge(Toml::file("config.toml"));
        }
        let mut cfg: Config = fig.extract().unwrap_or_default();

        // 2) Overlay environment variables explicitly
        if let Ok(v) = std::env::var("MP_ACCESS_TOKEN") {
            cfg.mercadopago.access_token = v;
        }
        if let Ok(v) = std::env::var("MP_API_BASE") {
            cfg.mercadopago.api_base = v;
        }
        if let Ok(v) = std::env::var("MP_TIMEOUT_MS") {
            cfg.mercadopago.timeout_ms = v.parse().unwrap_or(cfg.mercadopago.timeout_ms);
        }
        if let Ok(v) = std::env::var("MP_PAYMENT_EXPIRY") {
            cfg.mercadopago.payment_expiry =
                parse_duration_env(&v, cfg.mercadopago.payment_expiry);
        }
        if let Ok(v) = std::env::var("MP_PAYER_EMAIL") {
            cfg.mercadopago.payer_email = v;
        }
        if let Ok(v) = std::env::var("MP_PAYER_FIRST_NAME") {
            cfg.mercadopago.payer_first_name = v;
        }
        if let Ok(v) = std::env::var("MP_PAYER_LAST_NAME") {
            cfg.mercadopago.payer_last_name = v;
        }
        if let Ok(v) = std::env::var("SERVER_PORT") {
            cfg.server_port = v.parse().unwrap_or(cfg.server_port);
        }
        if let Ok(v) = std::env::var("PUBLIC_DIR") {
            cfg.public_dir = v;
        }

        cfg
    }

    pub fn from_env() -> Self {
        Self::load()
    }
}

fn parse_duration_env(value: &str, current: Duration) -> Duration {
    humantime::parse_duration(value).unwrap_or(current)
}

fn default_api_base() -> String {
    "https://api.mercadopago.com".to_string()
}

fn default_timeout_ms() -> u64 {
    15_000
}

fn default_payment_expiry() -> Duration {
    Duration::from_secs(7 * 60)
}

fn default_payer_email() -> String {
    "teste@email.com".to_string()
}

fn default_payer_first_name() -> String {
    "Fulano".to_string()
}

fn default_payer_last_name() -> String {
    "da Silva".to_string()
}
