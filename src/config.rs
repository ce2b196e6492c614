use std::time::Duration;

/// Tunables for the dashboard store. Defaults match the live dashboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub tick_interval: Duration,
    pub new_marker_ttl: Duration,
    pub assistant_latency: Duration,
    pub page_size: usize,
    pub live_list_limit: usize,
    pub seed: Option<u64>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(10),
            new_marker_ttl: Duration::from_secs(5),
            assistant_latency: Duration::from_millis(1000),
            page_size: 10,
            live_list_limit: 20,
            seed: None,
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("environment variable {name} has invalid value {value:?}")]
pub struct ConfigError {
    pub name: &'static str,
    pub value: String,
}

impl StoreConfig {
    /// Reads overrides from `CITY_DASHBOARD_*` variables, keeping defaults for unset ones.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(secs) = parse_var::<u64, _>(&lookup, "CITY_DASHBOARD_TICK_SECS")? {
            config.tick_interval = Duration::from_secs(secs.max(1));
        }
        if let Some(secs) = parse_var::<u64, _>(&lookup, "CITY_DASHBOARD_NEW_TTL_SECS")? {
            config.new_marker_ttl = Duration::from_secs(secs);
        }
        if let Some(ms) = parse_var::<u64, _>(&lookup, "CITY_DASHBOARD_ASSISTANT_LATENCY_MS")? {
            config.assistant_latency = Duration::from_millis(ms);
        }
        if let Some(size) = parse_var::<usize, _>(&lookup, "CITY_DASHBOARD_PAGE_SIZE")? {
            config.page_size = size;
        }
        config.seed = parse_var::<u64, _>(&lookup, "CITY_DASHBOARD_SEED")?;

        Ok(config)
    }
}

fn parse_var<T, F>(lookup: &F, name: &'static str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(None),
        Some(value) if value.trim().is_empty() => Ok(None),
        Some(value) => value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError { name, value }),
    }
}
