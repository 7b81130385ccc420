use std::time::Duration;

use super::{ActivityError, WeekStart};

pub const DEFAULT_API_BASE: &str = "https://github-contributions-api.jogruber.de/v4";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityConfig {
    pub api_base: String,
    pub username: String,
    pub cache_ttl: Duration,
    pub fetch_timeout: Duration,
    pub fallback: bool,
    pub week_start: WeekStart,
}

impl Default for ActivityConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            username: "octocat".to_string(),
            cache_ttl: Duration::from_secs(60 * 60),
            fetch_timeout: Duration::from_secs(10),
            fallback: true,
            week_start: WeekStart::Sunday,
        }
    }
}

impl ActivityConfig {
    pub fn from_env() -> Result<Self, ActivityError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from any key lookup, falling back to defaults for unset keys.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ActivityError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(base) = lookup("ACTIVITY_API_BASE") {
            config.api_base = base.trim_end_matches('/').to_string();
        }
        if let Some(username) = lookup("ACTIVITY_USERNAME") {
            config.username = username;
        }
        if let Some(raw) = lookup("ACTIVITY_CACHE_TTL_SECS") {
            config.cache_ttl = parse_secs("ACTIVITY_CACHE_TTL_SECS", raw)?;
        }
        if let Some(raw) = lookup("ACTIVITY_FETCH_TIMEOUT_SECS") {
            let timeout = parse_secs("ACTIVITY_FETCH_TIMEOUT_SECS", raw.clone())?;
            if timeout.is_zero() {
                return Err(ActivityError::Config {
                    var: "ACTIVITY_FETCH_TIMEOUT_SECS",
                    value: raw,
                });
            }
            config.fetch_timeout = timeout;
        }
        if let Some(raw) = lookup("ACTIVITY_FALLBACK") {
            config.fallback = match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                _ => {
                    return Err(ActivityError::Config {
                        var: "ACTIVITY_FALLBACK",
                        value: raw,
                    })
                }
            };
        }
        if let Some(raw) = lookup("ACTIVITY_WEEK_START") {
            config.week_start = raw.parse().map_err(|_| ActivityError::Config {
                var: "ACTIVITY_WEEK_START",
                value: raw.clone(),
            })?;
        }
        Ok(config)
    }
}

fn parse_secs(var: &'static str, raw: String) -> Result<Duration, ActivityError> {
    raw.trim()
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|_| ActivityError::Config { var, value: raw })
}
