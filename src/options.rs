use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

/// Configures per-attempt deadline and retry behavior.
///
/// Fixed for the lifetime of an orchestrator once applied.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Maximum number of retries after the initial attempt.
    pub max_retries: usize,
    /// Deadline for a single attempt in milliseconds.
    pub attempt_timeout_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 1,
            attempt_timeout_ms: 1_000,
        }
    }
}

impl RetryPolicy {
    /// Per-attempt deadline as a [`Duration`].
    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.attempt_timeout_ms)
    }

    /// Upper bound on attempts for one call, the first one included.
    pub fn max_attempts(&self) -> usize {
        self.max_retries.saturating_add(1)
    }

    /// Applies overrides from the environment on top of the defaults.
    ///
    /// Reads:
    /// - `GAMELINK_MAX_RETRIES`
    /// - `GAMELINK_ATTEMPT_TIMEOUT_MS`
    ///
    /// Unset variables keep the default; set but unparsable ones are an error.
    pub fn from_env() -> std::result::Result<Self, String> {
        let mut policy = Self::default();
        if let Some(value) = read_env_number("GAMELINK_MAX_RETRIES")? {
            policy.max_retries = value;
        }
        if let Some(value) = read_env_number("GAMELINK_ATTEMPT_TIMEOUT_MS")? {
            policy.attempt_timeout_ms = value;
        }
        Ok(policy)
    }
}

fn read_env_number<N>(name: &str) -> std::result::Result<Option<N>, String>
where
    N: FromStr,
    N::Err: Display,
{
    match std::env::var(name) {
        Ok(raw) => parse_number(name, &raw).map(Some),
        Err(_) => Ok(None),
    }
}

fn parse_number<N>(name: &str, raw: &str) -> std::result::Result<N, String>
where
    N: FromStr,
    N::Err: Display,
{
    raw.trim()
        .parse::<N>()
        .map_err(|err| format!("{name} must be a non-negative integer: {err}"))
}

#[cfg(test)]
mod tests {
    use super::{parse_number, RetryPolicy};
    use std::time::Duration;

    #[test]
    fn defaults_allow_one_retry_of_one_second() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts(), 2);
        assert_eq!(policy.attempt_timeout(), Duration::from_secs(1));
    }

    #[test]
    fn deserializes_with_missing_fields_defaulted() {
        let policy: RetryPolicy =
            serde_json::from_str(r#"{"max_retries": 4}"#).expect("policy must parse");
        assert_eq!(policy.max_retries, 4);
        assert_eq!(policy.attempt_timeout_ms, 1_000);
    }

    #[test]
    fn parse_number_rejects_garbage() {
        assert_eq!(parse_number::<u64>("X", " 25 "), Ok(25));
        assert!(parse_number::<u64>("X", "soon").is_err());
    }

    #[test]
    fn retry_count_parses_as_usize_without_narrowing() {
        assert_eq!(parse_number::<usize>("GAMELINK_MAX_RETRIES", "3"), Ok(3usize));
        let err = parse_number::<usize>("GAMELINK_MAX_RETRIES", "18446744073709551616")
            .expect_err("value above usize::MAX must be rejected");
        assert!(err.starts_with("GAMELINK_MAX_RETRIES must be a non-negative integer"));
        assert!(parse_number::<usize>("GAMELINK_MAX_RETRIES", "-1").is_err());
    }
}
