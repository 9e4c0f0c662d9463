use crate::error::AppError;
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Timing knobs for the minute-aligned reminder trigger.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub enabled: bool,
    /// Second of each minute at which the ticker wakes up (pre-tick moment).
    pub pre_tick_second: u32,
    /// How far ahead of the boundary processing is handed off.
    pub lead: Duration,
    /// Already this close to the boundary: skip the alignment sleep.
    pub skip_threshold: Duration,
    /// Upper bound on a single alignment sleep.
    pub max_alignment_sleep: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            pre_tick_second: 59,
            lead: Duration::from_millis(50),
            skip_threshold: Duration::from_millis(100),
            max_alignment_sleep: Duration::from_millis(900),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub port: u16,
    pub scheduler: SchedulerConfig,
}

fn parse_var<T: FromStr>(name: &str, default: T) -> Result<T, AppError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::Config(format!("{name} has an invalid value: {raw}"))),
        Err(_) => Ok(default),
    }
}

fn parse_flag(name: &str, default: bool) -> bool {
    env::var(name)
        .ok()
        .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        dotenv().ok();

        let database_url =
            env::var("DATABASE_URL").map_err(|_| AppError::Config("DATABASE_URL missing".into()))?;
        let database_max_connections = parse_var("DATABASE_MAX_CONNECTIONS", 10u32)?;
        let port = parse_var("PORT", 8080u16)?;

        let defaults = SchedulerConfig::default();
        let pre_tick_second = parse_var("REMINDER_PRE_TICK_SECOND", defaults.pre_tick_second)?;
        if pre_tick_second > 59 {
            return Err(AppError::Config(
                "REMINDER_PRE_TICK_SECOND must be between 0 and 59".into(),
            ));
        }

        let scheduler = SchedulerConfig {
            enabled: parse_flag("REMINDER_SCHEDULER_ENABLED", defaults.enabled),
            pre_tick_second,
            lead: Duration::from_millis(parse_var("REMINDER_LEAD_MS", 50u64)?),
            skip_threshold: Duration::from_millis(parse_var("REMINDER_SKIP_THRESHOLD_MS", 100u64)?),
            max_alignment_sleep: Duration::from_millis(parse_var("REMINDER_MAX_ALIGN_MS", 900u64)?),
        };

        Ok(Self {
            database_url,
            database_max_connections,
            port,
            scheduler,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for key in [
            "DATABASE_URL",
            "DATABASE_MAX_CONNECTIONS",
            "PORT",
            "REMINDER_SCHEDULER_ENABLED",
            "REMINDER_PRE_TICK_SECOND",
            "REMINDER_LEAD_MS",
            "REMINDER_SKIP_THRESHOLD_MS",
            "REMINDER_MAX_ALIGN_MS",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn defaults_apply_when_only_database_url_is_set() {
        clear_env();
        env::set_var("DATABASE_URL", "postgres://localhost/delivery");

        let cfg = Config::from_env().unwrap();
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.database_max_connections, 10);
        assert!(cfg.scheduler.enabled);
        assert_eq!(cfg.scheduler.pre_tick_second, 59);
        assert_eq!(cfg.scheduler.lead, Duration::from_millis(50));
        assert_eq!(cfg.scheduler.max_alignment_sleep, Duration::from_millis(900));
        clear_env();
    }

    #[test]
    #[serial]
    fn missing_database_url_is_a_config_error() {
        clear_env();
        assert!(matches!(Config::from_env(), Err(AppError::Config(_))));
    }

    #[test]
    #[serial]
    fn out_of_range_pre_tick_second_is_rejected() {
        clear_env();
        env::set_var("DATABASE_URL", "postgres://localhost/delivery");
        env::set_var("REMINDER_PRE_TICK_SECOND", "60");
        assert!(matches!(Config::from_env(), Err(AppError::Config(_))));
        clear_env();
    }

    #[test]
    #[serial]
    fn scheduler_can_be_disabled() {
        clear_env();
        env::set_var("DATABASE_URL", "postgres://localhost/delivery");
        env::set_var("REMINDER_SCHEDULER_ENABLED", "false");
        env::set_var("PORT", "9100");

        let cfg = Config::from_env().unwrap();
        assert!(!cfg.scheduler.enabled);
        assert_eq!(cfg.port, 9100);
        clear_env();
    }
}
