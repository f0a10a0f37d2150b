use std::{fmt, net::SocketAddr, time::Duration};

use alloy::primitives::Address;

use crate::bootstrap::DEFAULT_STEP_TIMEOUT;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("missing environment variable: {0}")]
    MissingEnv(&'static str),

    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Clone)]
pub struct Config {
    /// Base URL of the node service exposing the poker application
    pub service_url: String,
    pub faucet_url: String,
    pub application_id: String,
    pub jwt_secret: String,
    /// Hex-encoded signing key; a fresh one is generated when absent
    pub private_key: Option<String>,
    pub bootstrap_timeout: Duration,
    pub bind_addr: SocketAddr,
    pub admin_wallets: Vec<Address>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("service_url", &self.service_url)
            .field("faucet_url", &self.faucet_url)
            .field("application_id", &self.application_id)
            .field("bootstrap_timeout", &self.bootstrap_timeout)
            .field("bind_addr", &self.bind_addr)
            .field("admin_wallets", &self.admin_wallets)
            .finish_non_exhaustive()
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |name: &'static str| {
            lookup(name)
                .filter(|value| !value.is_empty())
                .ok_or(ConfigError::MissingEnv(name))
        };

        let bootstrap_timeout = match lookup("POKERD_BOOTSTRAP_TIMEOUT_SECS") {
            Some(secs) => Duration::from_secs(secs.parse().map_err(|err: std::num::ParseIntError| {
                ConfigError::Invalid {
                    name: "POKERD_BOOTSTRAP_TIMEOUT_SECS",
                    reason: err.to_string(),
                }
            })?),
            None => DEFAULT_STEP_TIMEOUT,
        };
        let bind_addr = lookup("POKERD_BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse()
            .map_err(|err: std::net::AddrParseError| ConfigError::Invalid {
                name: "POKERD_BIND_ADDR",
                reason: err.to_string(),
            })?;
        let admin_wallets = lookup("POKERD_ADMIN_WALLETS")
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|wallet| !wallet.is_empty())
            .map(|wallet| {
                wallet.parse::<Address>().map_err(|err| ConfigError::Invalid {
                    name: "POKERD_ADMIN_WALLETS",
                    reason: err.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            service_url: required("POKERD_SERVICE_URL")?,
            faucet_url: required("POKERD_FAUCET_URL")?,
            application_id: required("POKERD_APPLICATION_ID")?,
            jwt_secret: required("JWT_SECRET")?,
            private_key: lookup("POKERD_PRIVATE_KEY").filter(|key| !key.is_empty()),
            bootstrap_timeout,
            bind_addr,
            admin_wallets,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    const REQUIRED: [(&str, &str); 4] = [
        ("POKERD_SERVICE_URL", "http://localhost:8080"),
        ("POKERD_FAUCET_URL", "http://localhost:8079"),
        ("POKERD_APPLICATION_ID", "e476"),
        ("JWT_SECRET", "hunter2"),
    ];

    #[test]
    fn defaults() {
        let config = Config::from_lookup(env(&REQUIRED)).unwrap();
        assert_eq!(config.bootstrap_timeout, Duration::from_secs(15));
        assert_eq!(config.bind_addr.port(), 3000);
        assert!(config.private_key.is_none());
        assert!(config.admin_wallets.is_empty());
        assert!(!format!("{config:?}").contains("hunter2"));
    }

    #[test]
    fn missing_required() {
        let err = Config::from_lookup(env(&REQUIRED[..3])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnv("JWT_SECRET")));
    }

    #[test]
    fn overrides() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("POKERD_BOOTSTRAP_TIMEOUT_SECS", "3"));
        pairs.push(("POKERD_BIND_ADDR", "127.0.0.1:4000"));
        pairs.push((
            "POKERD_ADMIN_WALLETS",
            "0x0000000000000000000000000000000000000001, 0x0000000000000000000000000000000000000002,",
        ));
        let config = Config::from_lookup(env(&pairs)).unwrap();
        assert_eq!(config.bootstrap_timeout, Duration::from_secs(3));
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:4000");
        assert_eq!(config.admin_wallets.len(), 2);

        pairs.push(("POKERD_BOOTSTRAP_TIMEOUT_SECS", "soon"));
        let lookup = env(&pairs);
        assert!(matches!(
            Config::from_lookup(lookup),
            Err(ConfigError::Invalid { .. })
        ));

        let mut pairs = REQUIRED.to_vec();
        pairs.push(("POKERD_ADMIN_WALLETS", "root"));
        assert!(matches!(
            Config::from_lookup(env(&pairs)),
            Err(ConfigError::Invalid { name: "POKERD_ADMIN_WALLETS", .. })
        ));
    }
}
