use std::{env, io::Write, net::IpAddr};

use hpp_common::{
    helpers::{is_disabled_value, parse_boolean_flag},
    Secret,
};
use hpp_engine::config::GatewayConfig;
use log::*;
use serde_json::json;
use tempfile::NamedTempFile;

use crate::errors::ServerError;

const DEFAULT_HPP_HOST: &str = "127.0.0.1";
const DEFAULT_HPP_PORT: u16 = 8370;
const DEFAULT_DATABASE_URL: &str = "sqlite://data/hpp_store.db";
/// HS256 secrets shorter than this are rejected.
pub const MIN_JWT_SECRET_LENGTH: usize = 32;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub auth: AuthConfig,
    /// If true, the X-Forwarded-For header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_x_forwarded_for: bool,
    /// If true, the Forwarded header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_forwarded: bool,
    /// If supplied, requests against the gateway callback endpoint are only accepted from these addresses.
    pub gateway_whitelist: Option<Vec<IpAddr>>,
    /// Payment gateway credentials and URLs. Loaded once and shared read-only with the APIs.
    pub gateway: GatewayConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HPP_HOST.to_string(),
            port: DEFAULT_HPP_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            auth: AuthConfig::default(),
            use_x_forwarded_for: false,
            use_forwarded: false,
            gateway_whitelist: None,
            gateway: GatewayConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("HPP_HOST").ok().unwrap_or_else(|| DEFAULT_HPP_HOST.into());
        let port = env::var("HPP_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for HPP_PORT. {e} Using the default, {DEFAULT_HPP_PORT}, instead."
                    );
                    DEFAULT_HPP_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_HPP_PORT);
        let database_url = env::var("HPP_DATABASE_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ HPP_DATABASE_URL is not set. Using the default, {DEFAULT_DATABASE_URL}.");
            DEFAULT_DATABASE_URL.to_string()
        });
        let auth = AuthConfig::try_from_env().unwrap_or_else(|e| {
            warn!(
                "🪛️ Could not load the authentication configuration from environment variables. {e}. Reverting to the \
                 default configuration."
            );
            AuthConfig::default()
        });
        let use_x_forwarded_for = parse_boolean_flag(env::var("HPP_USE_X_FORWARDED_FOR").ok(), false);
        let use_forwarded = parse_boolean_flag(env::var("HPP_USE_FORWARDED").ok(), false);
        let gateway_whitelist = parse_whitelist(env::var("HPP_GATEWAY_IP_WHITELIST").ok());
        let gateway = GatewayConfig::new_from_env_or_default();
        Self { host, port, database_url, auth, use_x_forwarded_for, use_forwarded, gateway_whitelist, gateway }
    }
}

/// `None` disables the whitelist. An unset variable, or one of `none`, `false`, `0`, disables it.
fn parse_whitelist(value: Option<String>) -> Option<Vec<IpAddr>> {
    let whitelist = value.and_then(|s| {
        if is_disabled_value(&s) {
            info!(
                "🪛️ Gateway IP whitelist is disabled. If this is not what you want, set HPP_GATEWAY_IP_WHITELIST to a \
                 comma-separated list of IP addresses to enable it."
            );
            return None;
        }
        let ip_addrs = s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .filter_map(|s| {
                s.parse::<IpAddr>()
                    .map_err(|e| warn!("🪛️ Ignoring invalid IP address ({s}) in HPP_GATEWAY_IP_WHITELIST: {e}"))
                    .ok()
            })
            .collect::<Vec<IpAddr>>();
        Some(ip_addrs)
    });
    match &whitelist {
        Some(whitelist) if whitelist.is_empty() => {
            warn!(
                "🚨️ The gateway IP whitelist was configured, but is empty. The server will run, but won't accept any \
                 payment notifications."
            );
        },
        None => {
            info!("🪛️ No gateway IP whitelist is set. Only signature validation will be used.");
        },
        Some(v) => {
            let addrs = v.iter().map(|a| a.to_string()).collect::<Vec<_>>().join(", ");
            info!("🪛️ Gateway IP whitelist: {addrs}");
        },
    }
    whitelist
}

//-------------------------------------------------  AuthConfig  -------------------------------------------------------
#[derive(Clone, Debug)]
pub struct AuthConfig {
    /// The HS256 secret used to sign and verify admin access tokens.
    pub jwt_secret: Secret<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        let mut tmpfile = NamedTempFile::new().ok().and_then(|f| f.keep().ok());
        warn!(
            "🚨️🚨️🚨️ The JWT secret has not been set. I'm using a random value for this session. DO NOT operate on \
             production like this since every admin token will stop working when the server restarts. 🚨️🚨️🚨️"
        );
        let bytes: [u8; 32] = rand::random();
        let secret = bytes.iter().map(|b| format!("{b:02x}")).collect::<String>();
        match &mut tmpfile {
            Some((f, p)) => {
                let key_data = json!({ "jwt_secret": secret }).to_string();
                match writeln!(f, "{key_data}") {
                    Ok(()) => warn!(
                        "🚨️🚨️🚨️ The JWT secret for this session was written to {}. If this is a production instance, \
                         you are doing it wrong! Set the HPP_JWT_SECRET environment variable instead. 🚨️🚨️🚨️",
                        p.to_str().unwrap_or("???")
                    ),
                    Err(e) => warn!("🪛️ Could not write the JWT secret to the temporary file. {e}"),
                }
            },
            None => {
                warn!("🪛️ Could not create a temporary file to store the JWT secret.");
            },
        }
        Self { jwt_secret: Secret::new(secret) }
    }
}

impl AuthConfig {
    pub fn new<S: Into<String>>(secret: S) -> Result<Self, ServerError> {
        let secret = secret.into();
        if secret.trim().len() < MIN_JWT_SECRET_LENGTH {
            return Err(ServerError::ConfigurationError(format!(
                "The JWT secret must be at least {MIN_JWT_SECRET_LENGTH} characters long"
            )));
        }
        Ok(Self { jwt_secret: Secret::new(secret) })
    }

    pub fn try_from_env() -> Result<Self, ServerError> {
        let secret =
            env::var("HPP_JWT_SECRET").map_err(|e| ServerError::ConfigurationError(format!("{e} [HPP_JWT_SECRET]")))?;
        Self::new(secret)
    }
}

//-------------------------------------------------  ServerOptions  ----------------------------------------------------
/// A subset of the server configuration that is used to configure the server's behaviour. Generally we try to keep this
/// as small as possible, and exclude secrets to avoid passing sensitive information around the system.
#[derive(Clone, Copy, Debug, Default)]
pub struct ServerOptions {
    pub use_x_forwarded_for: bool,
    pub use_forwarded: bool,
}

impl ServerOptions {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self { use_x_forwarded_for: config.use_x_forwarded_for, use_forwarded: config.use_forwarded }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn whitelist_parsing() {
        assert_eq!(parse_whitelist(None), None);
        assert_eq!(parse_whitelist(Some("none".into())), None);
        let list = parse_whitelist(Some("10.0.0.1, bogus,::1".into())).unwrap();
        assert_eq!(list, vec!["10.0.0.1".parse::<IpAddr>().unwrap(), "::1".parse::<IpAddr>().unwrap()]);
        assert_eq!(parse_whitelist(Some(",".into())), Some(vec![]));
    }

    #[test]
    fn short_secrets_are_rejected() {
        assert!(matches!(AuthConfig::new("too-short"), Err(ServerError::ConfigurationError(_))));
        let config = AuthConfig::new("a".repeat(MIN_JWT_SECRET_LENGTH)).unwrap();
        assert_eq!(config.jwt_secret.reveal().len(), MIN_JWT_SECRET_LENGTH);
    }

    #[test]
    fn default_secret_is_random() {
        let a = AuthConfig::default();
        let b = AuthConfig::default();
        assert_eq!(a.jwt_secret.reveal().len(), 64);
        assert_ne!(a.jwt_secret, b.jwt_secret);
    }
}
