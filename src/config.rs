use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{FixedOffset, NaiveDate, Utc};
use dotenvy::dotenv;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,
    pub api_prefix: String,

    // Rate limiting
    pub rate_protected_per_min: u32,

    pub log_dir: String,
    pub log_level: String,
    pub run_migrations: bool,
    pub db_max_connections: u32,

    /// Push gateway; notifications are only logged when unset.
    pub push_endpoint: Option<String>,
    pub push_timeout: Duration,

    /// School-local offset from UTC, used to decide what "today" is.
    pub school_tz_offset_minutes: i32,
}

fn required(key: &str) -> Result<String> {
    env::var(key).with_context(|| format!("{key} must be set"))
}

fn or_default<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value: {raw}")),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let school_tz_offset_minutes: i32 = or_default("SCHOOL_TZ_OFFSET_MINUTES", 0)?;
        if school_tz_offset_minutes.abs() >= 24 * 60 {
            anyhow::bail!("SCHOOL_TZ_OFFSET_MINUTES must be within one day of UTC");
        }

        Ok(Self {
            server_addr: required("SERVER_ADDR")?,
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),

            rate_protected_per_min: or_default("RATE_PROTECTED_PER_MIN", 1000)?,

            log_dir: env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "debug".to_string()),
            run_migrations: or_default("RUN_MIGRATIONS", true)?,
            db_max_connections: or_default("DB_MAX_CONNECTIONS", 10)?,

            push_endpoint: env::var("PUSH_ENDPOINT").ok().filter(|v| !v.trim().is_empty()),
            push_timeout: Duration::from_secs(or_default("PUSH_TIMEOUT_SECS", 10)?),

            school_tz_offset_minutes,
        })
    }

    /// Calendar date at the school right now.
    pub fn today(&self) -> NaiveDate {
        FixedOffset::east_opt(self.school_tz_offset_minutes * 60)
            .map(|tz| Utc::now().with_timezone(&tz).date_naive())
            .unwrap_or_else(|| Utc::now().date_naive())
    }
}

#[cfg(test)]
impl Config {
    pub fn for_tests() -> Self {
        Self {
            database_url: String::new(),
            jwt_secret: crate::auth::jwt::testing::SECRET.to_string(),
            server_addr: "127.0.0.1:0".to_string(),
            api_prefix: "/api".to_string(),
            rate_protected_per_min: 1000,
            log_dir: "logs".to_string(),
            log_level: "debug".to_string(),
            run_migrations: false,
            db_max_connections: 1,
            push_endpoint: None,
            push_timeout: Duration::from_secs(1),
            school_tz_offset_minutes: 0,
        }
    }
}
