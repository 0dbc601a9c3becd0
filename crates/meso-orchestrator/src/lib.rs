use chrono::NaiveDate;
use flow_validator::MoneyFlowValidator;
use lifecycle_classifier::LifecycleClassifier;
use meso_core::{AnalysisReport, MesoError, NameMatcher, ScanConfig, SectorDataProvider};
use rebound_scanner::ReboundScanner;
use std::sync::Arc;

pub mod cache;
pub mod report;

pub use cache::CachedProvider;
pub use report::render_report;

/// Runs Module A and Module B concurrently, then validates both against
/// money flow in Module C.
pub struct MesoOrchestrator {
    provider: Arc<dyn SectorDataProvider>,
    config: ScanConfig,
    matcher: Box<dyn NameMatcher>,
    classifier: LifecycleClassifier,
    scanner: ReboundScanner,
    validator: MoneyFlowValidator,
}

impl MesoOrchestrator {
    pub fn new(provider: Arc<dyn SectorDataProvider>, config: ScanConfig) -> Result<Self, MesoError> {
        config.validate()?;

        Ok(Self {
            matcher: config.name_matcher(),
            classifier: LifecycleClassifier::new(&config),
            scanner: ReboundScanner::new(&config),
            validator: MoneyFlowValidator::new(&config),
            provider,
            config,
        })
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Full scan for one trade date. Stage failures are reported inside the
    /// returned report, never as an error.
    pub async fn run_meso_scan(&self, trade_date: NaiveDate) -> AnalysisReport {
        tracing::info!(
            "Starting meso scan for {} (benchmark {}, top {})",
            trade_date,
            self.config.benchmark,
            self.config.top_n
        );

        let provider = self.provider.as_ref();
        let matcher = self.matcher.as_ref();

        // A and B share no data, so they run side by side
        let (mainline, rebound) = tokio::join!(
            self.classifier.analyze(provider, trade_date, matcher),
            self.scanner.scan(provider, trade_date),
        );

        let validation = self
            .validator
            .validate(provider, trade_date, &mainline, &rebound, matcher)
            .await;

        let report = AnalysisReport::assemble(trade_date, mainline, rebound, validation);

        if report.is_complete() {
            tracing::info!(
                "Meso scan for {} complete: {} sectors, {} rebounds, {} golden, {} issues",
                trade_date,
                report.concepts.len(),
                report.rebounds.len(),
                report.golden_list.len(),
                report.issues.len()
            );
        } else {
            tracing::warn!(
                "Meso scan for {} finished with failures (A: {}, B: {}, C: {})",
                trade_date,
                report.mainline.success,
                report.rebound.success,
                report.validation.success
            );
        }
        if !report.flow_validated {
            tracing::warn!("Golden list for {} was not validated against money flow", trade_date);
        }

        report
    }
}

/// One-shot scan without keeping an orchestrator around
pub async fn run_meso_scan(
    provider: Arc<dyn SectorDataProvider>,
    trade_date: NaiveDate,
    config: ScanConfig,
) -> Result<AnalysisReport, MesoError> {
    let orchestrator = MesoOrchestrator::new(provider, config)?;
    Ok(orchestrator.run_meso_scan(trade_date).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use meso_core::{
        AlphaScore, DegradedPolicy, GoldenOrigin, IssueKind, JoinStatus, LifecyclePhase,
        LimitUpEntry, MoneyFlowRecord, ReboundCandidate, SnapshotProvider, Stage,
    };
    use std::collections::HashMap;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 12, 3).unwrap()
    }

    fn alpha(code: &str, name: &str, alpha: f64) -> AlphaScore {
        AlphaScore {
            code: code.to_string(),
            name: Some(name.to_string()),
            alpha,
        }
    }

    fn board(name: &str, count: u32) -> LimitUpEntry {
        LimitUpEntry {
            name: name.to_string(),
            limit_up_count: count,
        }
    }

    fn flow(name: &str, net_inflow: f64) -> MoneyFlowRecord {
        MoneyFlowRecord {
            name: name.to_string(),
            net_inflow: Some(net_inflow),
        }
    }

    /// Three ranked sectors plus one oversold sector outside the alpha list
    fn snapshot() -> SnapshotProvider {
        SnapshotProvider {
            trade_date: Some(date()),
            hot_concepts: Some(vec![
                "BK1".into(),
                "BK2".into(),
                "BK3".into(),
                "BK4".into(),
            ]),
            alpha: Some(vec![
                alpha("BK1", "机器人概念", 15.0),
                alpha("BK2", "光刻机", 8.0),
                alpha("BK3", "航运板块", -2.0),
            ]),
            rank_velocity: Some(HashMap::from([
                ("BK1".to_string(), 3),
                ("BK2".to_string(), -1),
                ("BK3".to_string(), 0),
            ])),
            limit_up_board: Some(vec![board("机器人", 20), board("光刻机", 2), board("航运", 0)]),
            rebounds: Some(vec![ReboundCandidate {
                code: "BK4".into(),
                name: "固态电池".into(),
                price_change_5d: -8.0,
                vol_ratio: 1.6,
                turnover_rate: 4.2,
            }]),
            money_flow: Some(vec![
                flow("机器人", -1.5e8),
                flow("光刻机", 5e7),
                flow("航运", -2e7),
                flow("固态电池", 3e7),
            ]),
        }
    }

    async fn scan(snapshot: SnapshotProvider, config: ScanConfig) -> AnalysisReport {
        run_meso_scan(Arc::new(snapshot), date(), config).await.unwrap()
    }

    #[tokio::test]
    async fn test_end_to_end_three_sectors() {
        let report = scan(snapshot(), ScanConfig::default()).await;

        assert!(report.is_complete());
        assert!(report.flow_validated);
        assert!(report.issues.is_empty(), "unexpected issues: {:?}", report.issues);

        let phases: Vec<_> = report.concepts.iter().map(|c| c.status).collect();
        assert_eq!(
            phases,
            vec![LifecyclePhase::Climax, LifecyclePhase::Divergence, LifecyclePhase::Fading]
        );
        assert!(report
            .concepts
            .iter()
            .all(|c| c.limit_up_join == JoinStatus::Matched));

        assert_eq!(report.rebounds.len(), 1);

        // Climax sector with heavy outflow is a warning, not golden
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].code, "BK1");

        let golden: Vec<_> = report.golden_list.iter().map(|g| g.code.as_str()).collect();
        assert_eq!(golden, vec!["BK2", "BK3", "BK4"]);
        assert_eq!(report.golden_list[2].origin, GoldenOrigin::Rebound);
    }

    #[tokio::test]
    async fn test_empty_flow_falls_back_to_top_n() {
        let mut snapshot = snapshot();
        snapshot.money_flow = Some(vec![]);
        let config = ScanConfig {
            golden_list_cap: 2,
            ..ScanConfig::default()
        };

        let report = scan(snapshot, config).await;

        assert!(report.validation.success);
        assert!(!report.flow_validated);
        assert!(report.warnings.is_empty());
        let golden: Vec<_> = report.golden_list.iter().map(|g| g.code.as_str()).collect();
        assert_eq!(golden, vec!["BK1", "BK2"]);
        assert!(report.golden_list.iter().all(|g| g.net_inflow.is_none()));

        let issues: Vec<_> = report.issues_for(Stage::Validation).collect();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].kind, IssueKind::DegradedFetch);
    }

    #[tokio::test]
    async fn test_flow_rows_without_values_fall_back() {
        let mut snapshot = snapshot();
        snapshot.money_flow = Some(vec![
            MoneyFlowRecord {
                name: "机器人".into(),
                net_inflow: None,
            },
            MoneyFlowRecord {
                name: "光刻机".into(),
                net_inflow: None,
            },
        ]);

        let report = scan(snapshot, ScanConfig::default()).await;

        assert!(!report.flow_validated);
        assert!(report.warnings.is_empty());
        assert!(report.golden_list.iter().all(|g| g.net_inflow.is_none()));
        assert!(report
            .issues_for(Stage::Validation)
            .any(|i| i.kind == IssueKind::DegradedFetch));
    }

    #[tokio::test]
    async fn test_missing_flow_with_fail_policy() {
        let mut snapshot = snapshot();
        snapshot.money_flow = None;
        let config = ScanConfig {
            degraded_policy: DegradedPolicy::Fail,
            ..ScanConfig::default()
        };

        let report = scan(snapshot, config).await;

        assert!(report.mainline.success);
        assert!(report.rebound.success);
        assert!(!report.validation.success);
        assert!(report.golden_list.is_empty());
        assert!(!report.is_complete());
    }

    #[tokio::test]
    async fn test_mainline_failure_leaves_rebound_intact() {
        let mut snapshot = snapshot();
        snapshot.alpha = None;

        let report = scan(snapshot, ScanConfig::default()).await;

        assert!(!report.mainline.success);
        assert!(report.concepts.is_empty());
        assert!(report.rebound.success);
        assert_eq!(report.rebounds.len(), 1);

        // Rebound still reaches the golden list through flow validation
        assert_eq!(report.golden_list.len(), 1);
        assert_eq!(report.golden_list[0].code, "BK4");
        assert_eq!(
            report.issues_for(Stage::Mainline).next().map(|i| i.kind),
            Some(IssueKind::FatalFetch)
        );
    }

    #[tokio::test]
    async fn test_wrong_date_fails_every_module() {
        let other = NaiveDate::from_ymd_opt(2025, 12, 4).unwrap();
        let report = run_meso_scan(Arc::new(snapshot()), other, ScanConfig::default())
            .await
            .unwrap();

        assert!(!report.mainline.success);
        assert!(!report.rebound.success);
        assert!(!report.flow_validated);
        assert!(report.golden_list.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_config_rejected() {
        let config = ScanConfig {
            top_n: 0,
            ..ScanConfig::default()
        };
        let result = MesoOrchestrator::new(Arc::new(snapshot()), config);
        assert!(matches!(result, Err(MesoError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_scan_through_cache_matches_direct() {
        let cached: Arc<dyn SectorDataProvider> = Arc::new(CachedProvider::new(snapshot()));
        let orchestrator = MesoOrchestrator::new(cached, ScanConfig::default()).unwrap();

        let first = orchestrator.run_meso_scan(date()).await;
        let second = orchestrator.run_meso_scan(date()).await;

        assert_eq!(first.concepts, second.concepts);
        assert_eq!(first.golden_list, second.golden_list);
        assert!(render_report(&second).contains("机器人概念"));
    }
}
