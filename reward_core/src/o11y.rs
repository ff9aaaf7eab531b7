use crate::config::{env_nonempty, parse_bool};
use crate::{Error, Result};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracingConfig {
    /// JSON lines instead of human-readable output.
    pub json: bool,
    /// Filter used when `RUST_LOG` is unset.
    pub default_filter: String,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            json: true,
            default_filter: "info".to_string(),
        }
    }
}

impl TracingConfig {
    /// Reads `REWARD_LOG_JSON` and `REWARD_LOG_FILTER`.
    pub fn from_env() -> Result<Self> {
        let mut cfg = Self::default();
        if let Some(v) = env_nonempty("REWARD_LOG_JSON") {
            cfg.json = parse_bool(&v)
                .ok_or_else(|| Error::InvalidConfig(format!("invalid REWARD_LOG_JSON: {v}")))?;
        }
        if let Some(v) = env_nonempty("REWARD_LOG_FILTER") {
            cfg.default_filter = v.trim().to_string();
        }
        Ok(cfg)
    }
}

/// Installs the global subscriber. Fails if one is already installed.
pub fn init_tracing(cfg: &TracingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cfg.default_filter))
        .map_err(|e| {
            Error::InvalidConfig(format!("invalid log filter {:?}: {e}", cfg.default_filter))
        })?;

    let registry = tracing_subscriber::registry().with(filter);
    let res = if cfg.json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .try_init()
    };
    res.map_err(|e| Error::Conflict(format!("tracing already initialized: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_is_a_conflict() {
        let cfg = TracingConfig {
            json: false,
            default_filter: "warn".to_string(),
        };
        // Another test may have installed a subscriber first; either way the
        // second call must fail without panicking.
        let _ = init_tracing(&cfg);
        assert!(matches!(init_tracing(&cfg), Err(Error::Conflict(_))));
    }
}
