//! Runtime configuration loaded from the environment.
//!
//! `MAPS_API_KEY` and `GATEWAY_API_URL` have no defaults: a checkout page
//! without a map or without a gateway is broken, so startup fails instead.

use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use tracing::info;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_GEOCODING_API_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";
pub const DEFAULT_MAPS_SCRIPT_URL: &str = "https://maps.googleapis.com/maps/api/js";
pub const DEFAULT_PHONE_COUNTRY_CODE: &str = "251";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("required environment variable {0} is not set")]
    Missing(&'static str),

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    /// Base URL of the EasyDrop gateway, without the `/api/checkout` path.
    pub gateway_api_url: String,
    pub maps_api_key: String,
    pub maps_script_url: String,
    pub geocoding_api_url: String,
    /// Prepended to the 9-digit local phone number on submission.
    pub phone_country_code: String,
    pub gateway_timeout: Duration,
    pub geocode_timeout: Duration,
    /// Bound on the one-time maps script check.
    pub maps_timeout: Duration,
    /// Drop geocoding results that complete after a newer gesture was issued.
    pub discard_stale_geocodes: bool,
    /// Redirect with `delivery=success` whatever the submission outcome.
    pub uniform_success_redirect: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from any key/value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);

        let phone_country_code = env.or_default("PHONE_COUNTRY_CODE", DEFAULT_PHONE_COUNTRY_CODE);
        if phone_country_code.is_empty()
            || !phone_country_code.chars().all(|c| c.is_ascii_digit())
        {
            return Err(ConfigError::Invalid {
                key: "PHONE_COUNTRY_CODE",
                reason: format!("{phone_country_code:?} is not a digit string"),
            });
        }

        Ok(Self {
            bind_addr: env.or_default("BIND_ADDR", DEFAULT_BIND_ADDR),
            gateway_api_url: env.required("GATEWAY_API_URL")?,
            maps_api_key: env.required("MAPS_API_KEY")?,
            maps_script_url: env.or_default("MAPS_SCRIPT_URL", DEFAULT_MAPS_SCRIPT_URL),
            geocoding_api_url: env.or_default("GEOCODING_API_URL", DEFAULT_GEOCODING_API_URL),
            phone_country_code,
            gateway_timeout: Duration::from_secs(env.parse("GATEWAY_TIMEOUT_SECS", 15)?),
            geocode_timeout: Duration::from_secs(env.parse("GEOCODE_TIMEOUT_SECS", 10)?),
            maps_timeout: Duration::from_secs(env.parse("MAPS_TIMEOUT_SECS", 10)?),
            discard_stale_geocodes: env.parse("GEOCODE_DISCARD_STALE", false)?,
            uniform_success_redirect: env.parse("LEGACY_UNIFORM_REDIRECT", false)?,
        })
    }
}

struct Env<F>(F);

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn required(&self, key: &'static str) -> Result<String, ConfigError> {
        self.get(key).ok_or(ConfigError::Missing(key))
    }

    fn or_default(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
    }

    fn parse<T>(&self, key: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr + Display,
        T::Err: Display,
    {
        match self.get(key) {
            Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
                key,
                reason: e.to_string(),
            }),
            None => {
                info!("{key} not set, using default: {default}");
                Ok(default)
            }
        }
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
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn required_values_and_defaults() {
        let config = Config::from_lookup(lookup(&[
            ("GATEWAY_API_URL", "https://gateway.easydrop.example"),
            ("MAPS_API_KEY", "maps-key"),
        ]))
        .unwrap();

        assert_eq!(config.gateway_api_url, "https://gateway.easydrop.example");
        assert_eq!(config.maps_api_key, "maps-key");
        assert_eq!(config.bind_addr, DEFAULT_BIND_ADDR);
        assert_eq!(config.phone_country_code, "251");
        assert_eq!(config.gateway_timeout, Duration::from_secs(15));
        assert_eq!(config.maps_timeout, Duration::from_secs(10));
        assert!(!config.discard_stale_geocodes);
        assert!(!config.uniform_success_redirect);
    }

    #[test]
    fn missing_maps_key_fails_loudly() {
        let err = Config::from_lookup(lookup(&[("GATEWAY_API_URL", "http://gw")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("MAPS_API_KEY")));
    }

    #[test]
    fn blank_gateway_url_counts_as_missing() {
        let err = Config::from_lookup(lookup(&[("GATEWAY_API_URL", "  "), ("MAPS_API_KEY", "k")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Missing("GATEWAY_API_URL")));
    }

    #[test]
    fn unparseable_optional_value_is_rejected() {
        let err = Config::from_lookup(lookup(&[
            ("GATEWAY_API_URL", "http://gw"),
            ("MAPS_API_KEY", "k"),
            ("GEOCODE_DISCARD_STALE", "sometimes"),
        ]))
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                key: "GEOCODE_DISCARD_STALE",
                ..
            }
        ));
    }

    #[test]
    fn maps_timeout_is_separate_from_geocoding() {
        let config = Config::from_lookup(lookup(&[
            ("GATEWAY_API_URL", "http://gw"),
            ("MAPS_API_KEY", "k"),
            ("GEOCODE_TIMEOUT_SECS", "4"),
            ("MAPS_TIMEOUT_SECS", "30"),
        ]))
        .unwrap();
        assert_eq!(config.geocode_timeout, Duration::from_secs(4));
        assert_eq!(config.maps_timeout, Duration::from_secs(30));
    }

    #[test]
    fn country_code_must_be_digits() {
        let err = Config::from_lookup(lookup(&[
            ("GATEWAY_API_URL", "http://gw"),
            ("MAPS_API_KEY", "k"),
            ("PHONE_COUNTRY_CODE", "+251"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "PHONE_COUNTRY_CODE", .. }));
    }
}
