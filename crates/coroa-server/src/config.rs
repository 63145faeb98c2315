use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};

use coroa_api::Settings;

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
];

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub jwt_secret: String,
    pub settings: Settings,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let jwt_secret = lookup("COROA_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("COROA_JWT_SECRET is unset or still a placeholder");
        }

        let webhook_secret = lookup("COROA_WEBHOOK_SECRET").unwrap_or_default();
        if webhook_secret.is_empty() {
            bail!("COROA_WEBHOOK_SECRET is unset");
        }

        let port: u16 = var("COROA_PORT", "3000")
            .parse()
            .context("COROA_PORT must be a port number")?;

        let reply_delay_ms: u64 = var("COROA_REPLY_DELAY_MS", "2000")
            .parse()
            .context("COROA_REPLY_DELAY_MS must be milliseconds")?;

        let like_threshold = match lookup("COROA_LIKE_THRESHOLD") {
            Some(raw) => {
                let t: u32 = raw.parse().context("COROA_LIKE_THRESHOLD must be a number")?;
                if !(1..=3).contains(&t) {
                    bail!("COROA_LIKE_THRESHOLD must be between 1 and 3");
                }
                Some(t)
            }
            None => None,
        };

        let defaults = Settings::default();
        Ok(Self {
            host: var("COROA_HOST", "0.0.0.0"),
            port,
            database_url: var("COROA_DATABASE_URL", "coroa.db"),
            jwt_secret,
            settings: Settings {
                public_url: var("COROA_PUBLIC_URL", &defaults.public_url),
                upload_dir: PathBuf::from(var("COROA_UPLOAD_DIR", "./uploads")),
                webhook_secret,
                checkout_url: var("COROA_CHECKOUT_URL", &defaults.checkout_url),
                reply_delay: Duration::from_millis(reply_delay_ms),
                like_threshold,
                reset_token_ttl: defaults.reset_token_ttl,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const REQUIRED: [(&str, &str); 2] = [
        ("COROA_JWT_SECRET", "a-real-secret"),
        ("COROA_WEBHOOK_SECRET", "hook"),
    ];

    #[test]
    fn defaults_apply() {
        let config = Config::from_lookup(lookup(&REQUIRED)).unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.database_url, "coroa.db");
        assert_eq!(config.settings.reply_delay, Duration::from_secs(2));
        assert_eq!(config.settings.like_threshold, None);
        assert_eq!(config.settings.webhook_secret, "hook");
    }

    #[test]
    fn placeholder_secret_is_fatal() {
        let vars = [
            ("COROA_JWT_SECRET", "dev-secret-change-me"),
            ("COROA_WEBHOOK_SECRET", "hook"),
        ];
        assert!(Config::from_lookup(lookup(&vars)).is_err());
        assert!(Config::from_lookup(lookup(&[("COROA_WEBHOOK_SECRET", "hook")])).is_err());
    }

    #[test]
    fn missing_webhook_secret_is_fatal() {
        assert!(Config::from_lookup(lookup(&[("COROA_JWT_SECRET", "a-real-secret")])).is_err());
    }

    #[test]
    fn overrides_are_parsed() {
        let mut vars = REQUIRED.to_vec();
        vars.extend([
            ("COROA_PORT", "8080"),
            ("COROA_REPLY_DELAY_MS", "0"),
            ("COROA_LIKE_THRESHOLD", "2"),
            ("COROA_PUBLIC_URL", "https://minhacoroa.app"),
        ]);
        let config = Config::from_lookup(lookup(&vars)).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.settings.reply_delay, Duration::ZERO);
        assert_eq!(config.settings.like_threshold, Some(2));
        assert_eq!(config.settings.public_url, "https://minhacoroa.app");
    }

    #[test]
    fn out_of_range_threshold_is_rejected() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("COROA_LIKE_THRESHOLD", "7"));
        assert!(Config::from_lookup(lookup(&vars)).is_err());
    }
}
