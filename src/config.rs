use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::generator::BatchMode;
use crate::utils::draws_for_years;

pub const DEFAULT_FALLBACK_DRAW: u32 = 1124;
pub const DEFAULT_MAX_ATTEMPTS: u64 = 500_000;

#[derive(Debug, Clone)]
pub struct Config {
    pub store_path: PathBuf,
    pub history_years: u32,
    pub fetch_delay_ms: u64,
    pub max_attempts: u64,
    pub batch_size: usize,
    pub distinct_batch: bool,
    pub fallback_draw: u32,
    pub api_base: String,
    pub http_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from("data/lotto_combinations.json"),
            history_years: 2,
            fetch_delay_ms: 50,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            batch_size: 5,
            distinct_batch: false,
            fallback_draw: DEFAULT_FALLBACK_DRAW,
            api_base: "https://www.dhlottery.co.kr/common.do".to_string(),
            http_timeout_secs: 5,
        }
    }
}

impl Config {
    pub fn fallback_window_draws(&self) -> u32 {
        draws_for_years(self.history_years)
    }

    pub fn fetch_delay(&self) -> Duration {
        Duration::from_millis(self.fetch_delay_ms)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn batch_mode(&self) -> BatchMode {
        if self.distinct_batch {
            BatchMode::Distinct
        } else {
            BatchMode::AllowDuplicates
        }
    }
}

pub fn load() -> Result<Config> {
    load_from(|key| env::var(key).ok())
}

/// Builds the config from a variable lookup; unset variables keep defaults.
pub fn load_from<F>(lookup: F) -> Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    let defaults = Config::default();

    Ok(Config {
        store_path: lookup("LOTTO_STORE_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.store_path),
        history_years: parse_var(&lookup, "LOTTO_HISTORY_YEARS", defaults.history_years)?,
        fetch_delay_ms: parse_var(&lookup, "LOTTO_FETCH_DELAY_MS", defaults.fetch_delay_ms)?,
        max_attempts: parse_var(&lookup, "LOTTO_MAX_ATTEMPTS", defaults.max_attempts)?,
        batch_size: parse_var(&lookup, "LOTTO_BATCH_SIZE", defaults.batch_size)?,
        distinct_batch: parse_var(&lookup, "LOTTO_DISTINCT_BATCH", defaults.distinct_batch)?,
        fallback_draw: parse_var(&lookup, "LOTTO_FALLBACK_DRAW", defaults.fallback_draw)?,
        api_base: lookup("LOTTO_API_BASE").unwrap_or(defaults.api_base),
        http_timeout_secs: parse_var(
            &lookup,
            "LOTTO_HTTP_TIMEOUT_SECS",
            defaults.http_timeout_secs,
        )?,
    })
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid value for {}: {:?}", key, raw)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_in(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = load_from(lookup_in(&[])).unwrap();
        assert_eq!(config.store_path, PathBuf::from("data/lotto_combinations.json"));
        assert_eq!(config.fallback_window_draws(), 114);
        assert_eq!(config.fetch_delay(), Duration::from_millis(50));
        assert_eq!(config.max_attempts, 500_000);
        assert_eq!(config.batch_size, 5);
        assert_eq!(config.fallback_draw, 1124);
        assert_eq!(config.batch_mode(), BatchMode::AllowDuplicates);
    }

    #[test]
    fn overrides_are_applied() {
        let config = load_from(lookup_in(&[
            ("LOTTO_STORE_PATH", "/tmp/lotto.db"),
            ("LOTTO_HISTORY_YEARS", "5"),
            ("LOTTO_BATCH_SIZE", " 10 "),
            ("LOTTO_DISTINCT_BATCH", "true"),
        ]))
        .unwrap();

        assert_eq!(config.store_path, PathBuf::from("/tmp/lotto.db"));
        assert_eq!(config.fallback_window_draws(), 286);
        assert_eq!(config.batch_size, 10);
        assert_eq!(config.batch_mode(), BatchMode::Distinct);
    }

    #[test]
    fn bad_numbers_are_reported() {
        let err = load_from(lookup_in(&[("LOTTO_FETCH_DELAY_MS", "fast")])).unwrap_err();
        assert!(err.to_string().contains("LOTTO_FETCH_DELAY_MS"));
    }
}
