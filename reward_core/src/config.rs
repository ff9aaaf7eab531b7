use crate::{Error, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardConfig {
    /// Samples logged per scorer over the manager's lifetime.
    pub num_examine: usize,
    /// Prompt/response characters kept when logging an example.
    pub max_log_chars: usize,
    /// Score samples on the rayon pool instead of the calling thread.
    pub parallel: bool,
    /// Size of a dedicated worker pool. `None` shares rayon's global pool.
    pub max_workers: Option<usize>,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            num_examine: 1,
            max_log_chars: 200,
            parallel: true,
            max_workers: None,
        }
    }
}

impl RewardConfig {
    /// Defaults overridden by `REWARD_NUM_EXAMINE`, `REWARD_MAX_LOG_CHARS`,
    /// `REWARD_PARALLEL` and `REWARD_MAX_WORKERS`.
    #[tracing::instrument(level = "debug")]
    pub fn from_env() -> Result<Self> {
        let mut cfg = Self::default();

        if let Some(v) = env_nonempty("REWARD_NUM_EXAMINE") {
            cfg.num_examine = parse_usize("REWARD_NUM_EXAMINE", &v)?;
        }
        if let Some(v) = env_nonempty("REWARD_MAX_LOG_CHARS") {
            cfg.max_log_chars = parse_usize("REWARD_MAX_LOG_CHARS", &v)?;
        }
        if let Some(v) = env_nonempty("REWARD_PARALLEL") {
            cfg.parallel = parse_bool(&v).ok_or_else(|| {
                Error::InvalidConfig(format!("invalid REWARD_PARALLEL: {v}"))
            })?;
        }
        if let Some(v) = env_nonempty("REWARD_MAX_WORKERS") {
            cfg.max_workers = Some(parse_usize("REWARD_MAX_WORKERS", &v)?);
        }

        cfg.validate()?;
        Ok(cfg)
    }

    #[tracing::instrument(level = "debug", skip(self))]
    pub fn validate(&self) -> Result<()> {
        if self.max_log_chars == 0 {
            return Err(Error::InvalidConfig(
                "max_log_chars must be > 0".to_string(),
            ));
        }
        if self.max_workers == Some(0) {
            return Err(Error::InvalidConfig(
                "max_workers must be > 0 when set".to_string(),
            ));
        }
        Ok(())
    }
}

pub(crate) fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .and_then(|v| (!v.trim().is_empty()).then_some(v))
}

pub(crate) fn parse_bool(v: &str) -> Option<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}

fn parse_usize(key: &str, v: &str) -> Result<usize> {
    v.trim()
        .parse()
        .map_err(|e| Error::InvalidConfig(format!("invalid {key}: {v} ({e})")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = RewardConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.num_examine, 1);
        assert_eq!(cfg.max_log_chars, 200);
    }

    #[test]
    fn rejects_zero_workers_and_zero_log_width() {
        let cfg = RewardConfig {
            max_workers: Some(0),
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(Error::InvalidConfig(_))));
        let cfg = RewardConfig {
            max_log_chars: 0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn parses_bool_spellings() {
        assert_eq!(parse_bool(" Yes "), Some(true));
        assert_eq!(parse_bool("off"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn parse_usize_reports_key() {
        let err = parse_usize("REWARD_NUM_EXAMINE", "many").unwrap_err();
        assert!(err.to_string().contains("REWARD_NUM_EXAMINE"));
    }
}
