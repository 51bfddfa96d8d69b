use std::env;
use std::time::Duration;

use crate::ExecutionError;

const DEFAULT_ASYNC_TIMEOUT: Duration = Duration::from_secs(1);

/// Environment variable overriding the default async timeout, in milliseconds.
pub const ASYNC_TIMEOUT_ENV: &str = "SPEC_DEFAULT_ASYNC_TIMEOUT_MS";

/// Engine-wide knobs shared by every example.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecConfig {
    default_async_timeout: Duration,
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            default_async_timeout: DEFAULT_ASYNC_TIMEOUT,
        }
    }
}

impl ExecConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Timeout applied to async subjects that do not carry their own (defaults to 1s).
    pub fn with_default_async_timeout(mut self, timeout: Duration) -> Self {
        self.default_async_timeout = timeout;
        self
    }

    pub fn default_async_timeout(&self) -> Duration {
        self.default_async_timeout
    }

    /// Build a config from defaults overlaid with [`ASYNC_TIMEOUT_ENV`].
    pub fn from_env() -> Result<Self, ExecutionError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ExecutionError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(raw) = lookup(ASYNC_TIMEOUT_ENV) {
            let millis: u64 = raw
                .trim()
                .parse()
                .map_err(|source| ExecutionError::InvalidEnv {
                    name: ASYNC_TIMEOUT_ENV,
                    value: raw.clone(),
                    source,
                })?;
            config.default_async_timeout = Duration::from_millis(millis);
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_one_second() {
        assert_eq!(ExecConfig::default().default_async_timeout(), Duration::from_secs(1));
        let config = ExecConfig::new().with_default_async_timeout(Duration::from_millis(5));
        assert_eq!(config.default_async_timeout(), Duration::from_millis(5));
    }

    #[test]
    fn lookup_overrides_timeout() {
        let config = ExecConfig::from_lookup(|name| {
            (name == ASYNC_TIMEOUT_ENV).then(|| "250".to_string())
        })
        .expect("valid override");
        assert_eq!(config.default_async_timeout(), Duration::from_millis(250));

        let untouched = ExecConfig::from_lookup(|_| None).expect("no override");
        assert_eq!(untouched, ExecConfig::default());
    }

    #[test]
    fn lookup_rejects_garbage() {
        let err = ExecConfig::from_lookup(|_| Some("soon".to_string())).unwrap_err();
        match err {
            ExecutionError::InvalidEnv { name, value, .. } => {
                assert_eq!(name, ASYNC_TIMEOUT_ENV);
                assert_eq!(value, "soon");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
