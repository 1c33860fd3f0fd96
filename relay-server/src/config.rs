use std::env;
use std::net::IpAddr;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub lease_ttl: Duration,
    pub sweep_interval: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            host: parse_var(&lookup, "HOST", IpAddr::from([127, 0, 0, 1]))?,
            port: parse_var(&lookup, "PORT", 3000)?,
            lease_ttl: parse_period(&lookup, "PRESENCE_LEASE_SECONDS", 15)?,
            sweep_interval: parse_period(&lookup, "PRESENCE_SWEEP_SECONDS", 5)?,
        })
    }
}

fn parse_var<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        None => Ok(default),
    }
}

fn parse_period<F>(lookup: &F, key: &'static str, default: u64) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match parse_var(lookup, key, default)? {
        0 => Err(ConfigError::Invalid {
            key,
            value: "0".to_string(),
        }),
        secs => Ok(Duration::from_secs(secs)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(|_| None).unwrap();
        assert_eq!(config.host.to_string(), "127.0.0.1");
        assert_eq!(config.port, 3000);
        assert_eq!(config.lease_ttl, Duration::from_secs(15));
        assert_eq!(config.sweep_interval, Duration::from_secs(5));
    }

    #[test]
    fn test_overrides_and_errors() {
        let config = Config::from_lookup(|key| match key {
            "HOST" => Some("0.0.0.0".to_string()),
            "PRESENCE_LEASE_SECONDS" => Some("60".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.host.to_string(), "0.0.0.0");
        assert_eq!(config.lease_ttl, Duration::from_secs(60));

        let err = Config::from_lookup(|key| (key == "PORT").then(|| "eighty".to_string())).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid {
                key: "PORT",
                value: "eighty".to_string()
            }
        );
    }

    #[test]
    fn test_zero_periods_are_rejected() {
        for key in ["PRESENCE_SWEEP_SECONDS", "PRESENCE_LEASE_SECONDS"] {
            let err = Config::from_lookup(|k| (k == key).then(|| "0".to_string())).unwrap_err();
            assert_eq!(
                err,
                ConfigError::Invalid {
                    key,
                    value: "0".to_string()
                }
            );
        }
    }
}
