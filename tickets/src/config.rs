use std::env;

use anyhow::Context as _;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub mongo_uri: String,
    pub database: String,
    pub collection: String,
    pub jwt_secret: String,
    pub bind_address: String,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let required = |key: &str| lookup(key).with_context(|| format!("{} must be set", key));

        let port = match lookup("PORT") {
            Some(port) => port
                .parse()
                .with_context(|| format!("PORT must be a port number, got '{}'", port))?,
            None => 3020,
        };

        Ok(Self {
            mongo_uri: required("MONGOURI")?,
            database: lookup("TICKETS_DATABASE").unwrap_or_else(|| "tickets".to_string()),
            collection: lookup("TICKETS_COLLECTION").unwrap_or_else(|| "tickets".to_string()),
            jwt_secret: required("JWT_SECRET")?,
            bind_address: lookup("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
        })
    }
}
