use std::env;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0} must be set")]
pub struct MissingVariable(pub &'static str);

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl DatabaseConfig {
    /// Fails when `DATABASE_URL` is not set.
    pub fn from_env() -> Result<Self, MissingVariable> {
        let url = env::var("DATABASE_URL").map_err(|_| MissingVariable("DATABASE_URL"))?;

        Ok(Self {
            url,
            max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
        })
    }
}
