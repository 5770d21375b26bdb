use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct SourceApiConfig {
    pub url: String,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProbeConfig {
    pub interval_secs: u64,
    pub max_wait_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub api: SourceApiConfig,
    pub probe: ProbeConfig,
    /// Directory for the run-unique transfer buffer; system temp dir if unset.
    pub buffer_dir: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let api = SourceApiConfig {
            url: std::env::var("USER_API_URL")
                .unwrap_or_else(|_| "https://randomuser.me/api".into()),
            request_timeout_secs: std::env::var("API_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(30),
        };
        let probe = ProbeConfig {
            interval_secs: std::env::var("PROBE_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(5),
            max_wait_secs: std::env::var("PROBE_MAX_WAIT_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(120),
        };
        let buffer_dir = std::env::var("BUFFER_DIR").ok();
        Ok(Self {
            database_url,
            api,
            probe,
            buffer_dir,
        })
    }
}
