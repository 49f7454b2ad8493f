//! Tracing setup

use tracing_subscriber::EnvFilter;

use crate::{config::RepositoryConfig, error::Error, error::Result};

/// Install a JSON `tracing` subscriber filtered at the configured log level
///
/// An unparsable level falls back to `info`. Idempotent: when a global
/// subscriber is already installed (by an earlier call or by the embedding
/// application) this leaves it in place and returns `Ok`.
pub fn init_tracing(config: &RepositoryConfig) -> Result<()> {
    if tracing::dispatcher::has_been_set() {
        tracing::debug!("Global subscriber already installed, keeping it");
        return Ok(());
    }

    let log_level = config.log_level.clone();

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(EnvFilter::try_new(&log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .try_init()
        .map_err(|e| Error::Tracing(e.to_string()))?;

    tracing::info!(log_level = %log_level, "Tracing initialized for repository layer");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing_is_idempotent() {
        let config = RepositoryConfig {
            log_level: "not a [valid] filter".to_string(),
            ..RepositoryConfig::default()
        };
        assert!(init_tracing(&config).is_ok());
        assert!(init_tracing(&config).is_ok());
        assert!(tracing::dispatcher::has_been_set());
    }
}
