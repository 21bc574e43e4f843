//! Runtime configuration loaded from the environment.

use std::time::Duration;

use tracing::warn;

const DEFAULT_DATABASE_URL: &str = "sqlite:./data/lfg.db?mode=rwc";
const DEFAULT_JWT_SECRET: &str = "lfg-secret-key-change-in-production";
const DEFAULT_PORT: u16 = 9999;
const DEFAULT_PARTY_STALE_AFTER_SECS: u64 = 60 * 60;
const DEFAULT_PARTY_LIST_LIMIT: u32 = 100;
const DEFAULT_VOICE_EJECT_PERIOD_SECS: u64 = 5 * 60;

/// Immutable runtime configuration shared across the application.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub port: u16,
    /// Parties older than this are ignored by queries and subscriptions
    pub party_stale_after: Duration,
    /// Maximum parties returned by a lobby snapshot
    pub party_list_limit: u32,
    /// Period of the voice auto-eject monitor
    pub voice_eject_period: Duration,
}

impl Config {
    /// Read configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let db_path = std::env::var("DATABASE_URL")
            .or_else(|_| std::env::var("DB_PATH"))
            .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());

        let database_url = if db_path.starts_with("sqlite:") {
            db_path
        } else {
            format!("sqlite:{}?mode=rwc", db_path)
        };

        let jwt_secret = std::env::var("JWT_SECRET").unwrap_or_else(|_| {
            warn!("JWT_SECRET not set; using the development secret");
            DEFAULT_JWT_SECRET.to_string()
        });

        Self {
            database_url,
            jwt_secret,
            port: env_number("PORT", DEFAULT_PORT),
            party_stale_after: Duration::from_secs(env_number(
                "PARTY_STALE_AFTER_SECS",
                DEFAULT_PARTY_STALE_AFTER_SECS,
            )),
            party_list_limit: env_positive("PARTY_LIST_LIMIT", DEFAULT_PARTY_LIST_LIMIT),
            voice_eject_period: Duration::from_secs(env_positive(
                "VOICE_EJECT_PERIOD_SECS",
                DEFAULT_VOICE_EJECT_PERIOD_SECS,
            )),
        }
    }

    /// In-memory database and fixed secret, independent of the process environment.
    pub fn for_tests() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            jwt_secret: "test-secret-key".to_string(),
            ..Self::default()
        }
    }

    /// Parties created at or before this instant (ms) are stale
    pub fn stale_cutoff_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis() - self.party_stale_after.as_millis() as i64
    }

    pub fn is_in_memory_database(&self) -> bool {
        self.database_url.contains(":memory:") || self.database_url.contains("mode=memory")
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            jwt_secret: DEFAULT_JWT_SECRET.to_string(),
            port: DEFAULT_PORT,
            party_stale_after: Duration::from_secs(DEFAULT_PARTY_STALE_AFTER_SECS),
            party_list_limit: DEFAULT_PARTY_LIST_LIMIT,
            voice_eject_period: Duration::from_secs(DEFAULT_VOICE_EJECT_PERIOD_SECS),
        }
    }
}

fn env_number<T>(name: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    parse_number(name, std::env::var(name).ok().as_deref(), default)
}

/// Like `env_number`, but zero is rejected as well
fn env_positive<T>(name: &str, default: T) -> T
where
    T: std::str::FromStr + Copy + PartialOrd + Default,
{
    parse_positive(name, std::env::var(name).ok().as_deref(), default)
}

fn parse_number<T>(name: &str, raw: Option<&str>, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    match raw {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(var = name, value = %raw, "invalid number; using default");
            default
        }),
        None => default,
    }
}

fn parse_positive<T>(name: &str, raw: Option<&str>, default: T) -> T
where
    T: std::str::FromStr + Copy + PartialOrd + Default,
{
    let value = parse_number(name, raw, default);
    if value > T::default() {
        value
    } else {
        warn!(var = name, "must be positive; using default");
        default
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_uses_memory_database() {
        let config = Config::for_tests();
        assert!(config.is_in_memory_database());
        assert_eq!(config.party_list_limit, 100);
        assert_eq!(config.voice_eject_period, Duration::from_secs(300));
    }

    #[test]
    fn cutoff_trails_now_by_stale_window() {
        let config = Config::for_tests();
        let now = chrono::Utc::now().timestamp_millis();
        let cutoff = config.stale_cutoff_millis();
        let window = config.party_stale_after.as_millis() as i64;
        assert!(cutoff <= now - window);
        assert!(cutoff > now - window - 5_000);
    }

    #[test]
    fn numbers_fall_back_on_garbage() {
        assert_eq!(parse_number("PORT", Some(" 8080 "), 9999u16), 8080);
        assert_eq!(parse_number("PORT", Some("eighty"), 9999u16), 9999);
        assert_eq!(parse_number("PORT", None, 9999u16), 9999);
    }

    #[test]
    fn zero_periods_and_limits_use_the_default() {
        assert_eq!(parse_positive("VOICE_EJECT_PERIOD_SECS", Some("0"), 300u64), 300);
        assert_eq!(parse_positive("VOICE_EJECT_PERIOD_SECS", Some("45"), 300u64), 45);
        assert_eq!(parse_positive("PARTY_LIST_LIMIT", Some("0"), 100u32), 100);
        assert_eq!(parse_positive("PARTY_LIST_LIMIT", Some("-3"), 100u32), 100);
    }
}
