use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Mail transport credentials resolved from environment variables.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub moralis_api_key: String,
    pub smtp: SmtpConfig,
    pub server_host: String,
    pub server_port: u16,
    /// Cadence of each background task. Policy values, independently tunable.
    pub ingest_interval: Duration,
    pub evaluate_interval: Duration,
    pub detect_interval: Duration,
    pub retention_interval: Duration,
    /// Relative increase (percent) that triggers a price-increase email.
    pub change_threshold_pct: f64,
    /// Recipient of the price-increase emails. Defaults to the sender
    /// address, i.e. the operator notifies themselves.
    pub change_notify_email: String,
    /// Lookback window for the change detector.
    pub change_window_secs: u64,
    /// Per-chain suppression period after a price-increase email fires.
    pub change_cooldown_secs: u64,
    /// Samples older than this many days are swept.
    pub retention_days: i64,
    pub quote_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        dotenv::dotenv().ok();

        let database_url = env::var("DATABASE_URL")?;
        let moralis_api_key = env::var("MORALIS_API_KEY")?;

        let smtp = SmtpConfig {
            host: env::var("SMTP_HOST")?,
            port: env_or("SMTP_PORT", 587)?,
            username: env::var("SMTP_USERNAME")?,
            password: env::var("SMTP_PASSWORD")?,
            from: env::var("SMTP_FROM")?,
        };

        let server_host = env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let server_port = env_or("SERVER_PORT", 8080)?;

        let change_notify_email =
            env::var("CHANGE_NOTIFY_EMAIL").unwrap_or_else(|_| smtp.from.clone());

        let config = Config {
            database_url,
            moralis_api_key,
            smtp,
            server_host,
            server_port,
            ingest_interval: Duration::from_secs(env_or("INGEST_INTERVAL_SECS", 30u64)?),
            evaluate_interval: Duration::from_secs(env_or("EVALUATE_INTERVAL_SECS", 60u64)?),
            detect_interval: Duration::from_secs(env_or("DETECT_INTERVAL_SECS", 60u64)?),
            // Weekly by default, matching the retention horizon's cadence.
            retention_interval: Duration::from_secs(env_or("RETENTION_INTERVAL_SECS", 604_800u64)?),
            change_threshold_pct: env_or("CHANGE_THRESHOLD_PCT", 3.0f64)?,
            change_notify_email,
            change_window_secs: env_or("CHANGE_WINDOW_SECS", 3600u64)?,
            change_cooldown_secs: env_or("CHANGE_COOLDOWN_SECS", 3600u64)?,
            retention_days: env_or("RETENTION_DAYS", 7i64)?,
            quote_timeout: Duration::from_secs(env_or("QUOTE_TIMEOUT_SECS", 10u64)?),
        };

        if config.change_threshold_pct < 0.0 {
            return Err("CHANGE_THRESHOLD_PCT must be non-negative".into());
        }
        if config.retention_days <= 0 {
            return Err("RETENTION_DAYS must be positive".into());
        }

        Ok(config)
    }
}

fn env_or<T>(key: &str, default: T) -> Result<T, Box<dyn std::error::Error>>
where
    T: FromStr,
    T::Err: std::error::Error + 'static,
{
    match env::var(key) {
        Ok(val) => val
            .parse::<T>()
            .map_err(|e| format!("{} is invalid: {}", key, e).into()),
        Err(_) => Ok(default),
    }
}
