//! Study configuration loaded from the environment.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `RECALL_LEARNING_STEPS` | `1m,10m,30m,1d` |
//! | `RECALL_RELEARNING_STEPS` | `1m,10m,30m,1h,1d` |
//! | `RECALL_MAX_INTERVAL_DAYS` | `14` |
//! | `RECALL_ENABLE_FUZZ` | `true` |
//! | `RECALL_DESIRED_RETENTION` | `0.9` |
//! | `RECALL_CHUNK_TOKENS` | `2000` |
//! | `RECALL_RETRY_MAX_ATTEMPTS` | `3` |
//! | `RECALL_RETRY_DELAY_MS` | `500` |
//! | `RECALL_RETRY_BACKOFF` | `2.0` |
//! | `RECALL_GRADING_CONCURRENCY` | `4` |
//!
//! A malformed step ladder, or a step or maximum interval longer than
//! [`defaults::MAX_SCHEDULE_DAYS`], is rejected. Other values that fail to
//! parse fall back to their defaults.

use std::time::Duration as StdDuration;

use chrono::Duration;

use crate::defaults;
use crate::error::{Error, Result};
use crate::retry::RetryPolicy;
use crate::scheduling::SchedulerConfig;

pub const ENV_LEARNING_STEPS: &str = "RECALL_LEARNING_STEPS";
pub const ENV_RELEARNING_STEPS: &str = "RECALL_RELEARNING_STEPS";
pub const ENV_MAX_INTERVAL_DAYS: &str = "RECALL_MAX_INTERVAL_DAYS";
pub const ENV_ENABLE_FUZZ: &str = "RECALL_ENABLE_FUZZ";
pub const ENV_DESIRED_RETENTION: &str = "RECALL_DESIRED_RETENTION";
pub const ENV_CHUNK_TOKENS: &str = "RECALL_CHUNK_TOKENS";
pub const ENV_RETRY_MAX_ATTEMPTS: &str = "RECALL_RETRY_MAX_ATTEMPTS";
pub const ENV_RETRY_DELAY_MS: &str = "RECALL_RETRY_DELAY_MS";
pub const ENV_RETRY_BACKOFF: &str = "RECALL_RETRY_BACKOFF";
pub const ENV_GRADING_CONCURRENCY: &str = "RECALL_GRADING_CONCURRENCY";

/// Everything the study pipelines need besides their collaborators.
#[derive(Debug, Clone, PartialEq)]
pub struct StudyConfig {
    pub scheduler: SchedulerConfig,
    pub chunk_tokens: usize,
    pub retry: RetryPolicy,
    pub grading_concurrency: usize,
}

impl Default for StudyConfig {
    fn default() -> Self {
        Self {
            scheduler: SchedulerConfig::default(),
            chunk_tokens: defaults::CHUNK_TOKENS,
            retry: RetryPolicy::default(),
            grading_concurrency: defaults::GRADING_CONCURRENCY,
        }
    }
}

impl StudyConfig {
    /// Load from process environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let learning_steps = parse_steps(
            &lookup(ENV_LEARNING_STEPS).unwrap_or_else(|| defaults::LEARNING_STEPS.to_string()),
        )?;
        let relearning_steps = parse_steps(
            &lookup(ENV_RELEARNING_STEPS)
                .unwrap_or_else(|| defaults::RELEARNING_STEPS.to_string()),
        )?;

        let scheduler = SchedulerConfig {
            learning_steps,
            relearning_steps,
            maximum_interval_days: parse_max_interval(lookup(ENV_MAX_INTERVAL_DAYS))?,
            desired_retention: lookup(ENV_DESIRED_RETENTION)
                .and_then(|v| v.parse::<f64>().ok())
                .filter(|v| *v > 0.0 && *v < 1.0)
                .unwrap_or(defaults::DESIRED_RETENTION),
            enable_fuzzing: lookup(ENV_ENABLE_FUZZ)
                .and_then(|v| parse_bool(&v))
                .unwrap_or(defaults::ENABLE_FUZZ),
        };

        let defaults_retry = RetryPolicy::default();
        let retry = RetryPolicy {
            max_attempts: lookup(ENV_RETRY_MAX_ATTEMPTS)
                .and_then(|v| v.parse::<u32>().ok())
                .filter(|v| *v >= 1)
                .unwrap_or(defaults_retry.max_attempts),
            initial_delay: lookup(ENV_RETRY_DELAY_MS)
                .and_then(|v| v.parse::<u64>().ok())
                .map(StdDuration::from_millis)
                .unwrap_or(defaults_retry.initial_delay),
            backoff_factor: lookup(ENV_RETRY_BACKOFF)
                .and_then(|v| v.parse::<f64>().ok())
                .filter(|v| *v >= 1.0)
                .unwrap_or(defaults_retry.backoff_factor),
            max_delay: defaults_retry.max_delay,
        };

        Ok(Self {
            scheduler,
            chunk_tokens: lookup(ENV_CHUNK_TOKENS)
                .and_then(|v| v.parse::<usize>().ok())
                .filter(|v| *v > 0)
                .unwrap_or(defaults::CHUNK_TOKENS),
            retry,
            grading_concurrency: lookup(ENV_GRADING_CONCURRENCY)
                .and_then(|v| v.parse::<usize>().ok())
                .filter(|v| *v > 0)
                .unwrap_or(defaults::GRADING_CONCURRENCY),
        })
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a step ladder such as `1m,10m,30m,1d`.
///
/// Units are `s`, `m`, `h` and `d`. An empty string is an empty ladder.
pub fn parse_steps(spec: &str) -> Result<Vec<Duration>> {
    spec.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(parse_step)
        .collect()
}

fn parse_step(step: &str) -> Result<Duration> {
    let split = step.char_indices().last().map(|(i, _)| i).unwrap_or(0);
    let (amount, unit) = step.split_at(split);
    let amount: i64 = amount
        .parse()
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| Error::Config(format!("invalid step '{}': expected <n><s|m|h|d>", step)))?;
    let unit_secs: i64 = match unit {
        "s" => 1,
        "m" => 60,
        "h" => 3_600,
        "d" => 86_400,
        _ => {
            return Err(Error::Config(format!(
                "invalid step unit in '{}': expected s, m, h or d",
                step
            )))
        }
    };
    amount
        .checked_mul(unit_secs)
        .filter(|secs| *secs <= defaults::MAX_SCHEDULE_DAYS * 86_400)
        .map(Duration::seconds)
        .ok_or_else(|| {
            Error::Config(format!(
                "step '{}' exceeds {} days",
                step,
                defaults::MAX_SCHEDULE_DAYS
            ))
        })
}

fn parse_max_interval(value: Option<String>) -> Result<i64> {
    match value.and_then(|v| v.parse::<i64>().ok()).filter(|v| *v >= 1) {
        Some(days) if days > defaults::MAX_SCHEDULE_DAYS => Err(Error::Config(format!(
            "{} must be at most {} days",
            ENV_MAX_INTERVAL_DAYS,
            defaults::MAX_SCHEDULE_DAYS
        ))),
        Some(days) => Ok(days),
        None => Ok(defaults::MAX_INTERVAL_DAYS),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_env() {
        let config = StudyConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, StudyConfig::default());
        assert_eq!(config.scheduler.learning_steps.len(), 4);
        assert_eq!(config.scheduler.relearning_steps.len(), 5);
        assert_eq!(config.scheduler.maximum_interval_days, 14);
    }

    #[test]
    fn test_parse_steps() {
        let steps = parse_steps("30s, 5m,2h,1d").unwrap();
        assert_eq!(
            steps,
            vec![
                Duration::seconds(30),
                Duration::minutes(5),
                Duration::hours(2),
                Duration::days(1)
            ]
        );
        assert!(parse_steps("").unwrap().is_empty());
    }

    #[test]
    fn test_parse_steps_rejects_garbage() {
        assert!(matches!(parse_steps("10x"), Err(Error::Config(_))));
        assert!(matches!(parse_steps("m"), Err(Error::Config(_))));
        assert!(matches!(parse_steps("0m"), Err(Error::Config(_))));
        assert!(matches!(parse_steps("1m,ten"), Err(Error::Config(_))));
    }

    #[test]
    fn test_oversized_steps_are_config_errors() {
        assert!(matches!(parse_steps("9223372036854775807d"), Err(Error::Config(_))));
        assert!(matches!(parse_steps("9223372036854775807s"), Err(Error::Config(_))));
        assert!(matches!(parse_steps("36501d"), Err(Error::Config(_))));
        assert_eq!(parse_steps("36500d").unwrap(), vec![Duration::days(36_500)]);
    }

    #[test]
    fn test_oversized_max_interval_is_config_error() {
        let result = StudyConfig::from_lookup(lookup_from(&[(
            ENV_MAX_INTERVAL_DAYS,
            "9223372036854775807",
        )]));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_malformed_ladder_is_config_error() {
        let result = StudyConfig::from_lookup(lookup_from(&[(ENV_LEARNING_STEPS, "1m,oops")]));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_overrides_applied() {
        let config = StudyConfig::from_lookup(lookup_from(&[
            (ENV_MAX_INTERVAL_DAYS, "30"),
            (ENV_ENABLE_FUZZ, "false"),
            (ENV_CHUNK_TOKENS, "512"),
            (ENV_RETRY_MAX_ATTEMPTS, "5"),
            (ENV_RETRY_DELAY_MS, "10"),
            (ENV_GRADING_CONCURRENCY, "8"),
        ]))
        .unwrap();
        assert_eq!(config.scheduler.maximum_interval_days, 30);
        assert!(!config.scheduler.enable_fuzzing);
        assert_eq!(config.chunk_tokens, 512);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.initial_delay, StdDuration::from_millis(10));
        assert_eq!(config.grading_concurrency, 8);
    }

    #[test]
    fn test_bad_scalars_fall_back() {
        let config = StudyConfig::from_lookup(lookup_from(&[
            (ENV_MAX_INTERVAL_DAYS, "forever"),
            (ENV_DESIRED_RETENTION, "1.5"),
            (ENV_RETRY_MAX_ATTEMPTS, "0"),
        ]))
        .unwrap();
        assert_eq!(config.scheduler.maximum_interval_days, 14);
        assert_eq!(config.scheduler.desired_retention, 0.9);
        assert_eq!(config.retry.max_attempts, 3);
    }
}
