//! Engine configuration and the guardrails that bound it.

use std::path::PathBuf;

use crate::errors::{SmellError, SmellResult};

pub const DEFAULT_CONTEXT_RADIUS: usize = 15;
pub const DEFAULT_MAX_WIDTH: usize = 80;
pub const DEFAULT_DB_PATH: &str = "smellsolver.db";

pub const MAX_CONTEXT_RADIUS: usize = 200;
pub const MIN_WRAP_WIDTH: usize = 20;
pub const MAX_WRAP_WIDTH: usize = 400;

const ENV_CONTEXT_RADIUS: &str = "SMELLSOLVER_CONTEXT_RADIUS";
const ENV_MAX_WIDTH: &str = "SMELLSOLVER_MAX_WIDTH";
const ENV_DB_PATH: &str = "SMELLSOLVER_DB_PATH";

pub fn clamp_radius(value: usize) -> usize {
    value.min(MAX_CONTEXT_RADIUS)
}

pub fn clamp_width(value: usize) -> usize {
    value.clamp(MIN_WRAP_WIDTH, MAX_WRAP_WIDTH)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    /// Lines of context kept above and below a comment.
    pub context_radius: usize,
    /// Column budget for rewritten comment blocks.
    pub max_width: usize,
    pub db_path: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            context_radius: DEFAULT_CONTEXT_RADIUS,
            max_width: DEFAULT_MAX_WIDTH,
            db_path: PathBuf::from(DEFAULT_DB_PATH),
        }
    }
}

impl EngineConfig {
    /// Defaults overridden by `SMELLSOLVER_*` environment variables.
    pub fn from_env() -> SmellResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable lookup.
    pub fn from_lookup<F>(lookup: F) -> SmellResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(raw) = lookup(ENV_CONTEXT_RADIUS) {
            config.context_radius = clamp_radius(parse_usize(ENV_CONTEXT_RADIUS, &raw)?);
        }
        if let Some(raw) = lookup(ENV_MAX_WIDTH) {
            config.max_width = clamp_width(parse_usize(ENV_MAX_WIDTH, &raw)?);
        }
        if let Some(raw) = lookup(ENV_DB_PATH) {
            let trimmed = raw.trim();
            if !trimmed.is_empty() {
                config.db_path = PathBuf::from(trimmed);
            }
        }
        Ok(config)
    }
}

fn parse_usize(key: &str, raw: &str) -> SmellResult<usize> {
    raw.trim()
        .parse::<usize>()
        .map_err(|e| SmellError::Config(format!("{key}={raw:?}: {e}")))
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
    fn defaults_without_overrides() {
        let config = EngineConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.context_radius, 15);
        assert_eq!(config.max_width, 80);
    }

    #[test]
    fn overrides_are_clamped() {
        let config = EngineConfig::from_lookup(lookup(&[
            (ENV_CONTEXT_RADIUS, "5000"),
            (ENV_MAX_WIDTH, "3"),
            (ENV_DB_PATH, " /tmp/ledger.db "),
        ]))
        .unwrap();
        assert_eq!(config.context_radius, MAX_CONTEXT_RADIUS);
        assert_eq!(config.max_width, MIN_WRAP_WIDTH);
        assert_eq!(config.db_path, PathBuf::from("/tmp/ledger.db"));
    }

    #[test]
    fn unparsable_value_is_config_error() {
        let err = EngineConfig::from_lookup(lookup(&[(ENV_MAX_WIDTH, "wide")])).unwrap_err();
        assert!(matches!(err, SmellError::Config(_)));
    }
}
