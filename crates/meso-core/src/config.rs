use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

use crate::{ExactMatcher, FuzzyMatcher, MesoError, NameMatcher, ReboundQuery};

/// What Module C does when money-flow data is missing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegradedPolicy {
    /// Return the top Module-A sectors unvalidated, flagged as such
    FallbackTopN,
    /// Fail the validation module with an empty golden list
    Fail,
}

impl FromStr for DegradedPolicy {
    type Err = MesoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fallback" | "fallback_top_n" => Ok(DegradedPolicy::FallbackTopN),
            "fail" => Ok(DegradedPolicy::Fail),
            other => Err(MesoError::InvalidConfig(format!(
                "unknown degraded policy '{}'",
                other
            ))),
        }
    }
}

/// Thresholds and limits for one meso scan.
///
/// Passed explicitly into every stage so a scan is a function of
/// (trade date, config, fetched data) only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    // Module A
    pub benchmark: String,                 // 000300.SH
    pub hot_concept_limit: usize,          // 80
    pub top_n: usize,                      // 20
    pub climax_alpha_floor: f64,           // 10.0 (%)
    pub climax_limit_up_floor: u32,        // 10

    // Module B
    pub rebound_universe_size: usize,      // 100
    pub decline_floor: f64,                // -5.0 (%)
    pub vol_ratio_floor: f64,              // 1.3
    pub crash_floor: f64,                  // -30.0 (%)

    // Module C
    pub money_flow_category: String,
    pub outflow_warning_floor: f64,        // -1e8
    pub golden_list_cap: usize,            // 10
    pub degraded_policy: DegradedPolicy,

    // Reconciliation
    pub fuzzy_match_threshold: Option<f64>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            benchmark: "000300.SH".to_string(),
            hot_concept_limit: 80,
            top_n: 20,
            climax_alpha_floor: 10.0,
            climax_limit_up_floor: 10,
            rebound_universe_size: 100,
            decline_floor: -5.0,
            vol_ratio_floor: 1.3,
            crash_floor: -30.0,
            money_flow_category: "concept".to_string(),
            outflow_warning_floor: -1e8,
            golden_list_cap: 10,
            degraded_policy: DegradedPolicy::FallbackTopN,
            fuzzy_match_threshold: None,
        }
    }
}

fn env_or<T>(key: &str, default: T) -> Result<T, MesoError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| MesoError::InvalidConfig(format!("{}: {}", key, e))),
        Err(_) => Ok(default),
    }
}

impl ScanConfig {
    /// Read overrides from `MESO_*` environment variables, then validate
    pub fn from_env() -> Result<Self, MesoError> {
        let defaults = Self::default();

        let fuzzy_match_threshold = match env::var("MESO_FUZZY_THRESHOLD") {
            Ok(raw) => Some(raw.trim().parse::<f64>().map_err(|e| {
                MesoError::InvalidConfig(format!("MESO_FUZZY_THRESHOLD: {}", e))
            })?),
            Err(_) => defaults.fuzzy_match_threshold,
        };

        let config = Self {
            benchmark: env::var("MESO_BENCHMARK").unwrap_or(defaults.benchmark),
            hot_concept_limit: env_or("MESO_HOT_CONCEPT_LIMIT", defaults.hot_concept_limit)?,
            top_n: env_or("MESO_TOP_N", defaults.top_n)?,
            climax_alpha_floor: env_or("MESO_CLIMAX_ALPHA", defaults.climax_alpha_floor)?,
            climax_limit_up_floor: env_or("MESO_CLIMAX_LIMIT_UP", defaults.climax_limit_up_floor)?,
            rebound_universe_size: env_or("MESO_REBOUND_UNIVERSE", defaults.rebound_universe_size)?,
            decline_floor: env_or("MESO_DECLINE_FLOOR", defaults.decline_floor)?,
            vol_ratio_floor: env_or("MESO_VOL_RATIO_FLOOR", defaults.vol_ratio_floor)?,
            crash_floor: env_or("MESO_CRASH_FLOOR", defaults.crash_floor)?,
            money_flow_category: env::var("MESO_FLOW_CATEGORY")
                .unwrap_or(defaults.money_flow_category),
            outflow_warning_floor: env_or("MESO_OUTFLOW_FLOOR", defaults.outflow_warning_floor)?,
            golden_list_cap: env_or("MESO_GOLDEN_CAP", defaults.golden_list_cap)?,
            degraded_policy: env_or("MESO_DEGRADED_POLICY", defaults.degraded_policy)?,
            fuzzy_match_threshold,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), MesoError> {
        let invalid = |msg: &str| Err(MesoError::InvalidConfig(msg.to_string()));

        if self.top_n == 0 {
            return invalid("top_n must be positive");
        }
        if self.hot_concept_limit == 0 {
            return invalid("hot_concept_limit must be positive");
        }
        if self.rebound_universe_size == 0 {
            return invalid("rebound_universe_size must be positive");
        }
        if self.golden_list_cap == 0 {
            return invalid("golden_list_cap must be positive");
        }
        if !(self.vol_ratio_floor >= 0.0) {
            return invalid("vol_ratio_floor must be non-negative");
        }
        if !(self.crash_floor < self.decline_floor) {
            return invalid("crash_floor must be below decline_floor");
        }
        if let Some(t) = self.fuzzy_match_threshold {
            if !(t > 0.0 && t <= 1.0) {
                return invalid("fuzzy_match_threshold must be in (0, 1]");
            }
        }
        Ok(())
    }

    pub fn rebound_query(&self) -> ReboundQuery {
        ReboundQuery {
            decline_floor: self.decline_floor,
            vol_ratio_floor: self.vol_ratio_floor,
            crash_floor: self.crash_floor,
        }
    }

    /// Matcher selected by `fuzzy_match_threshold`
    pub fn name_matcher(&self) -> Box<dyn NameMatcher> {
        match self.fuzzy_match_threshold {
            Some(threshold) => Box::new(FuzzyMatcher::new(threshold)),
            None => Box::new(ExactMatcher),
        }
    }
}
