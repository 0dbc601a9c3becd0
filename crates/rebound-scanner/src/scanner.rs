use chrono::NaiveDate;
use meso_core::{
    FetchOutcome, IssueKind, ModuleStatus, PipelineIssue, ReboundCandidate, ReboundQuery,
    ReboundResult, ScanConfig, SectorDataProvider, Stage,
};
use std::cmp::Ordering;
use std::collections::HashSet;
use tracing::{debug, info, warn};

const SOURCE_UNIVERSE: &str = "rebound universe";
const SOURCE_SCAN: &str = "volume anomaly scan";

/// Module B: oversold sectors with a volume spike
pub struct ReboundScanner {
    universe_size: usize,
    query: ReboundQuery,
}

impl ReboundScanner {
    pub fn new(config: &ScanConfig) -> Self {
        Self {
            universe_size: config.rebound_universe_size,
            query: config.rebound_query(),
        }
    }

    pub fn query(&self) -> &ReboundQuery {
        &self.query
    }

    /// Keep only candidates inside every bound, highest volume ratio first
    pub fn screen(&self, candidates: Vec<ReboundCandidate>) -> Vec<ReboundCandidate> {
        let total = candidates.len();

        let mut passed: Vec<ReboundCandidate> = candidates
            .into_iter()
            .filter(|c| {
                let ok = c.price_change_5d.is_finite()
                    && c.vol_ratio.is_finite()
                    && self.query.admits(c);
                if !ok {
                    debug!(
                        "Dropping {} ({}): 5d {:.2}%, vol ratio {:.2}",
                        c.code, c.name, c.price_change_5d, c.vol_ratio
                    );
                }
                ok
            })
            .collect();

        passed.sort_by(|a, b| {
            b.vol_ratio
                .partial_cmp(&a.vol_ratio)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.code.cmp(&b.code))
        });

        // One row per code, highest volume ratio wins
        let mut seen = HashSet::new();
        passed.retain(|c| {
            let first = seen.insert(c.code.clone());
            if !first {
                debug!("Dropping repeated rebound row for {}", c.code);
            }
            first
        });

        if passed.len() < total {
            info!("Rebound screen kept {}/{} rows from provider", passed.len(), total);
        }
        passed
    }

    pub async fn scan(&self, provider: &dyn SectorDataProvider, trade_date: NaiveDate) -> ReboundResult {
        info!(
            "Module B: scanning rebounds for {} (5d <= {:.1}%, vol ratio >= {:.2})",
            trade_date, self.query.decline_floor, self.query.vol_ratio_floor
        );

        let universe = FetchOutcome::primary(
            SOURCE_UNIVERSE,
            provider
                .discover_hot_concepts(trade_date, self.universe_size)
                .await,
        );
        let codes = match universe {
            FetchOutcome::Available(codes) => codes,
            other => return Self::fatal(SOURCE_UNIVERSE, other.reason()),
        };

        // An empty scan is a valid answer: nothing qualified today
        let rows = match provider
            .volume_anomaly_scan(&codes, trade_date, &self.query)
            .await
        {
            Ok(rows) => rows,
            Err(e) => {
                let reason = format!("{} failed: {}", SOURCE_SCAN, e);
                return Self::fatal(SOURCE_SCAN, Some(&reason));
            }
        };

        let rebounds = self.screen(rows);
        info!("Module B complete: {} rebound candidates", rebounds.len());

        ReboundResult {
            status: ModuleStatus::ok(),
            rebounds,
            issues: Vec::new(),
        }
    }

    fn fatal(source: &str, reason: Option<&str>) -> ReboundResult {
        let reason = reason.unwrap_or("unknown error").to_string();
        warn!("Module B failed: {}", reason);
        ReboundResult {
            status: ModuleStatus::failed(reason.clone()),
            rebounds: Vec::new(),
            issues: vec![PipelineIssue::new(
                Stage::Rebound,
                IssueKind::FatalFetch,
                source,
                reason,
            )],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meso_core::SnapshotProvider;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 12, 3).unwrap()
    }

    fn candidate(code: &str, change: f64, vol: f64) -> ReboundCandidate {
        ReboundCandidate {
            code: code.to_string(),
            name: format!("Sector {}", code),
            price_change_5d: change,
            vol_ratio: vol,
            turnover_rate: 3.5,
        }
    }

    fn provider(rows: Vec<ReboundCandidate>) -> SnapshotProvider {
        let codes = rows.iter().map(|r| r.code.clone()).collect();
        SnapshotProvider {
            hot_concepts: Some(codes),
            rebounds: Some(rows),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_requires_decline_and_volume() {
        let rows = vec![
            candidate("BK1", -8.0, 1.6),  // both
            candidate("BK2", -8.0, 1.0),  // down, no volume
            candidate("BK3", 2.0, 2.4),   // volume, not down
            candidate("BK4", -5.0, 1.3),  // exactly on both bounds
            candidate("BK5", -40.0, 3.0), // collapse, not a rebound
        ];
        let scanner = ReboundScanner::new(&ScanConfig::default());
        let result = scanner.scan(&provider(rows), date()).await;

        assert!(result.status.success);
        let codes: Vec<_> = result.rebounds.iter().map(|r| r.code.as_str()).collect();
        assert_eq!(codes, vec!["BK1", "BK4"]);

        let query = scanner.query();
        assert!(result
            .rebounds
            .iter()
            .all(|r| r.price_change_5d <= query.decline_floor && r.vol_ratio >= query.vol_ratio_floor));
    }

    #[test]
    fn test_sorted_by_volume_ratio() {
        let scanner = ReboundScanner::new(&ScanConfig::default());
        let screened = scanner.screen(vec![
            candidate("BK2", -6.0, 1.5),
            candidate("BK1", -7.0, 2.1),
            candidate("BK3", -9.0, 1.5),
        ]);

        let codes: Vec<_> = screened.iter().map(|r| r.code.as_str()).collect();
        assert_eq!(codes, vec!["BK1", "BK2", "BK3"]);
    }

    #[test]
    fn test_non_finite_rows_dropped() {
        let scanner = ReboundScanner::new(&ScanConfig::default());
        let screened = scanner.screen(vec![candidate("BK1", f64::NAN, 2.0)]);
        assert!(screened.is_empty());
    }

    #[tokio::test]
    async fn test_empty_scan_is_success() {
        let p = SnapshotProvider {
            hot_concepts: Some(vec!["BK1".into()]),
            rebounds: Some(vec![]),
            ..Default::default()
        };
        let result = ReboundScanner::new(&ScanConfig::default()).scan(&p, date()).await;
        assert!(result.status.success);
        assert!(result.rebounds.is_empty());
    }

    #[tokio::test]
    async fn test_scan_failure_is_fatal() {
        let p = SnapshotProvider {
            hot_concepts: Some(vec!["BK1".into()]),
            ..Default::default()
        };
        let result = ReboundScanner::new(&ScanConfig::default()).scan(&p, date()).await;

        assert!(!result.status.success);
        assert!(result.rebounds.is_empty());
        assert_eq!(result.issues[0].kind, IssueKind::FatalFetch);
        assert_eq!(result.issues[0].stage, Stage::Rebound);
    }

    #[tokio::test]
    async fn test_custom_thresholds() {
        let config = ScanConfig {
            decline_floor: -10.0,
            vol_ratio_floor: 2.0,
            ..ScanConfig::default()
        };
        let rows = vec![candidate("BK1", -8.0, 2.5), candidate("BK2", -12.0, 2.2)];
        let result = ReboundScanner::new(&config).scan(&provider(rows), date()).await;

        assert_eq!(result.rebounds.len(), 1);
        assert_eq!(result.rebounds[0].code, "BK2");
    }

    #[test]
    fn test_repeated_code_kept_once() {
        let scanner = ReboundScanner::new(&ScanConfig::default());
        let screened = scanner.screen(vec![
            candidate("BK1", -6.0, 1.5),
            candidate("BK2", -7.0, 1.8),
            candidate("BK1", -6.5, 2.2),
        ]);

        let codes: Vec<_> = screened.iter().map(|r| r.code.as_str()).collect();
        assert_eq!(codes, vec!["BK1", "BK2"]);
        assert_eq!(screened[0].vol_ratio, 2.2);
    }
}
