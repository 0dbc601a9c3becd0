use anyhow::{Context, Result};
use chrono::NaiveDate;
use meso_core::{latest_trade_date, parse_trade_date, ScanConfig};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Text,
    Json,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "txt" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => anyhow::bail!("unknown output format '{}' (expected text or json)", other),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliConfig {
    pub snapshot_path: PathBuf,
    /// `None` means the latest trade date relative to today
    pub trade_date: Option<NaiveDate>,
    pub output: OutputFormat,
    pub cache_ttl_secs: i64,               // 300
    pub scan: ScanConfig,
}

impl CliConfig {
    pub fn from_env() -> Result<Self> {
        let snapshot_path = env::var("MESO_SNAPSHOT_PATH")
            .context("MESO_SNAPSHOT_PATH must point to a provider snapshot (JSON)")?;

        let trade_date = match env::var("MESO_TRADE_DATE") {
            Ok(raw) if !raw.trim().is_empty() => {
                Some(parse_trade_date(&raw).context("invalid MESO_TRADE_DATE")?)
            }
            _ => None,
        };

        let config = Self {
            snapshot_path: PathBuf::from(snapshot_path),
            trade_date,
            output: env::var("MESO_OUTPUT")
                .unwrap_or_else(|_| "text".to_string())
                .parse()?,
            cache_ttl_secs: env::var("MESO_CACHE_TTL_SECS")
                .unwrap_or_else(|_| "300".to_string())
                .parse()
                .context("invalid MESO_CACHE_TTL_SECS")?,
            scan: ScanConfig::from_env()?,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.cache_ttl_secs < 0 {
            anyhow::bail!("MESO_CACHE_TTL_SECS must not be negative");
        }
        self.scan.validate()?;
        Ok(())
    }

    /// Requested date, or the most recent weekday on or before `today`
    pub fn resolve_trade_date(&self, today: NaiveDate) -> NaiveDate {
        self.trade_date.unwrap_or_else(|| latest_trade_date(today))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(trade_date: Option<NaiveDate>) -> CliConfig {
        CliConfig {
            snapshot_path: PathBuf::from("snapshot.json"),
            trade_date,
            output: OutputFormat::Text,
            cache_ttl_secs: 300,
            scan: ScanConfig::default(),
        }
    }

    #[test]
    fn test_output_format_parse() {
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!(" text ".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert!("yaml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_resolve_trade_date() {
        // Sunday rolls back to Friday
        let sunday = NaiveDate::from_ymd_opt(2025, 12, 7).unwrap();
        let friday = NaiveDate::from_ymd_opt(2025, 12, 5).unwrap();
        assert_eq!(config(None).resolve_trade_date(sunday), friday);

        let pinned = NaiveDate::from_ymd_opt(2025, 12, 3).unwrap();
        assert_eq!(config(Some(pinned)).resolve_trade_date(sunday), pinned);
    }

    #[test]
    fn test_validate_rejects_negative_ttl() {
        let mut c = config(None);
        c.cache_ttl_secs = -1;
        assert!(c.validate().is_err());
    }
}
