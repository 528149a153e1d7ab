use crate::engine::timeline::DEFAULT_TIMELINE_LIMIT;

#[derive(Debug, Clone)]
pub struct Config {
    /// Interface the server binds to
    pub host: String,
    /// Port the server listens on
    pub port: u16,
    /// Events buffered per SSE subscriber before it starts lagging
    pub broadcast_capacity: usize,
    /// Raw events kept for the timeline view
    pub timeline_limit: usize,
    /// Send `Access-Control-Allow-Origin: *`
    pub cors_any: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            broadcast_capacity: 1024,
            timeline_limit: DEFAULT_TIMELINE_LIMIT,
            cors_any: true,
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        let broadcast_capacity: usize =
            env_parse("TRACE_VIZ_BROADCAST_CAPACITY", defaults.broadcast_capacity)?;
        if broadcast_capacity == 0 {
            anyhow::bail!("TRACE_VIZ_BROADCAST_CAPACITY must be greater than zero");
        }

        Ok(Self {
            host: env_str("TRACE_VIZ_HOST", &defaults.host),
            port: env_parse("TRACE_VIZ_PORT", defaults.port)?,
            broadcast_capacity,
            timeline_limit: env_parse("TRACE_VIZ_TIMELINE_LIMIT", defaults.timeline_limit)?,
            cors_any: env_flag("TRACE_VIZ_CORS_ANY", defaults.cors_any),
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn env_str(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> anyhow::Result<T>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(val) => val
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("Failed to parse env var {key}={val}: {e}")),
        Err(_) => Ok(default),
    }
}

fn env_flag(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|v| v != "0" && v.to_lowercase() != "false")
        .unwrap_or(default)
}
