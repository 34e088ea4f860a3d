use crate::bot::DEFAULT_SYNC_INTERVAL;
use crate::report::WeekHolidays;
use anyhow::{Context, Result};
use std::time::Duration;

/// Runtime settings read from the environment (and `.env`, if present).
#[derive(Debug, Clone)]
pub struct Config {
    pub homeserver_url: String,
    pub user_id: String,
    pub access_token: String,
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub sync_interval: Duration,
    pub auto_join: bool,
    pub week_holidays: WeekHolidays,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &str| get(key).with_context(|| format!("{} must be set", key));

        let sync_interval = match get("SYNC_INTERVAL_MS") {
            Some(ms) => Duration::from_millis(ms.parse().context("Invalid SYNC_INTERVAL_MS")?),
            None => DEFAULT_SYNC_INTERVAL,
        };

        let week_holidays = match get("WEEK_HOLIDAYS") {
            Some(list) => WeekHolidays::parse(&list).context("Invalid WEEK_HOLIDAYS")?,
            None => WeekHolidays::default(),
        };

        Ok(Self {
            homeserver_url: required("MATRIX_HOMESERVER_URL")?,
            user_id: required("MATRIX_USER_ID")?,
            access_token: required("MATRIX_ACCESS_TOKEN")?,
            database_url: get("DATABASE_URL")
                .unwrap_or_else(|| "sqlite://oncall.db?mode=rwc".to_string()),
            host: get("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: get("PORT")
                .unwrap_or_else(|| "3000".to_string())
                .parse::<u16>()
                .context("Invalid PORT")?,
            sync_interval,
            auto_join: get("AUTO_JOIN")
                .unwrap_or_else(|| "true".to_string())
                .parse::<bool>()
                .context("Invalid AUTO_JOIN")?,
            week_holidays,
        })
    }
}
