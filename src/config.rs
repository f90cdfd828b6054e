use std::env;
use std::str::FromStr;

use crate::error::ConfigError;

pub const LIVE_URI: &str = "https://api.vm.co.mz";
pub const SANDBOX_URI: &str = "https://api.sandbox.vm.co.mz";

pub const PUBLIC_KEY_VAR: &str = "MPESA_PUBLIC_KEY";
pub const API_KEY_VAR: &str = "MPESA_API_KEY";
pub const SERVICE_PROVIDER_CODE_VAR: &str = "MPESA_SERVICE_PROVIDER_CODE";
pub const ENV_VAR: &str = "MPESA_ENV";

/// Which gateway deployment requests go to. Unrecognized names are rejected
/// at parse time rather than silently routed to the sandbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Sandbox,
    Live,
}

impl Environment {
    pub fn base_uri(&self) -> &'static str {
        match self {
            Environment::Live => LIVE_URI,
            Environment::Sandbox => SANDBOX_URI,
        }
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, ConfigError> {
        match s {
            "live" => Ok(Environment::Live),
            "sandbox" | "test" => Ok(Environment::Sandbox),
            other => Err(ConfigError::UnknownEnvironment(other.to_owned())),
        }
    }
}

/// Fully-resolved client configuration. The client never reads the process
/// environment; resolve credentials here, in the outermost entry point.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base64 SPKI public key body as handed out by the developer portal.
    pub public_key: String,
    pub api_key: String,
    pub service_provider_code: String,
    pub environment: Environment,
}

impl Config {
    pub fn new(
        public_key: impl Into<String>,
        api_key: impl Into<String>,
        service_provider_code: impl Into<String>,
        environment: Environment,
    ) -> Result<Self, ConfigError> {
        Ok(Config {
            public_key: require("public key", public_key.into())?,
            api_key: require("api key", api_key.into())?,
            service_provider_code: require("service provider code", service_provider_code.into())?,
            environment,
        })
    }

    /// Resolve a config from `MPESA_*` environment variables. An unset
    /// `MPESA_ENV` means sandbox; an unrecognized one is an error.
    pub fn from_env() -> Result<Self, ConfigError> {
        let environment = match env::var(ENV_VAR) {
            Ok(v) => v.parse()?,
            Err(_) => Environment::Sandbox,
        };
        Config::new(
            env::var(PUBLIC_KEY_VAR).unwrap_or_default(),
            env::var(API_KEY_VAR).unwrap_or_default(),
            env::var(SERVICE_PROVIDER_CODE_VAR).unwrap_or_default(),
            environment,
        )
    }
}

fn require(name: &'static str, value: String) -> Result<String, ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::MissingCredential(name));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_rejects_empty_credentials() {
        for (public_key, api_key, code) in [
            ("", "api_key", "171717"),
            ("a_key", "", "171717"),
            ("a_key", "api_key", ""),
        ] {
            let res = Config::new(public_key, api_key, code, Environment::Sandbox);
            assert!(matches!(res, Err(ConfigError::MissingCredential(_))));
        }
    }

    #[test]
    fn config_accepts_complete_credentials() {
        let config = Config::new("a_key", "api_key", "171717", Environment::Live).unwrap();
        assert_eq!(config.service_provider_code, "171717");
        assert_eq!(config.environment, Environment::Live);
    }

    #[test]
    fn environment_parsing() {
        assert_eq!("live".parse::<Environment>().unwrap(), Environment::Live);
        assert_eq!("test".parse::<Environment>().unwrap(), Environment::Sandbox);
        assert_eq!("sandbox".parse::<Environment>().unwrap(), Environment::Sandbox);
        assert!(matches!(
            "staging".parse::<Environment>(),
            Err(ConfigError::UnknownEnvironment(_))
        ));
    }

    #[test]
    fn environment_hosts() {
        assert_eq!(Environment::Live.base_uri(), "https://api.vm.co.mz");
        assert_eq!(Environment::Sandbox.base_uri(), "https://api.sandbox.vm.co.mz");
    }
}
