use chrono::NaiveDate;
use meso_core::{
    DegradedPolicy, FetchOutcome, FlowWarning, GoldenEntry, IssueKind, MainlineResult,
    ModuleStatus, MoneyFlowRecord, NameIndex, NameMatcher, PipelineIssue, ReboundResult,
    ScanConfig, SectorDataProvider, Stage, ValidationResult,
};
use std::cmp::Ordering;
use std::collections::HashSet;
use tracing::{debug, info, warn};

const SOURCE_FLOW: &str = "money flow";

/// Rules applied when joining flow data onto Module A and B output
#[derive(Debug, Clone, PartialEq)]
pub struct FlowRules {
    pub category: String,
    /// Net inflow below this flags an accumulating phase
    pub outflow_warning_floor: f64,
    pub golden_list_cap: usize,
    pub degraded_policy: DegradedPolicy,
}

impl FlowRules {
    pub fn from_config(config: &ScanConfig) -> Self {
        Self {
            category: config.money_flow_category.clone(),
            outflow_warning_floor: config.outflow_warning_floor,
            golden_list_cap: config.golden_list_cap,
            degraded_policy: config.degraded_policy,
        }
    }
}

/// Module C: validates mainline and rebound signals against capital flow
pub struct MoneyFlowValidator {
    rules: FlowRules,
}

impl MoneyFlowValidator {
    pub fn new(config: &ScanConfig) -> Self {
        Self {
            rules: FlowRules::from_config(config),
        }
    }

    pub async fn validate(
        &self,
        provider: &dyn SectorDataProvider,
        trade_date: NaiveDate,
        mainline: &MainlineResult,
        rebound: &ReboundResult,
        matcher: &dyn NameMatcher,
    ) -> ValidationResult {
        info!("Module C: validating against {} money flow for {}", self.rules.category, trade_date);

        let flows = FetchOutcome::secondary(
            SOURCE_FLOW,
            provider
                .money_flow_by_category(trade_date, &self.rules.category)
                .await,
        );

        match flows {
            FetchOutcome::Available(flows) => self.reconcile(&flows, mainline, rebound, matcher),
            other => self.degraded(mainline, other.reason().unwrap_or("no data")),
        }
    }

    /// Join flow rows onto both modules' output and build warnings and the
    /// golden list
    pub fn reconcile(
        &self,
        flows: &[MoneyFlowRecord],
        mainline: &MainlineResult,
        rebound: &ReboundResult,
        matcher: &dyn NameMatcher,
    ) -> ValidationResult {
        let index = NameIndex::build_with(
            matcher,
            flows.iter().filter_map(|r| r.net_inflow.map(|v| (r.name.as_str(), v))),
            |r| r.0,
            |r| r.1,
        );
        if index.is_empty() {
            return self.degraded(mainline, "money flow returned no usable net_inflow rows");
        }

        let mut warnings = Vec::new();
        let mut golden_list = Vec::new();
        let mut missed = Vec::new();

        for sector in &mainline.concepts {
            let net_inflow = index.lookup(&sector.name, matcher).copied();
            if net_inflow.is_none() {
                debug!("No money flow for mainline sector '{}'", sector.name);
                missed.push(sector.name.clone());
            }

            match net_inflow {
                Some(flow)
                    if sector.status.is_accumulating() && flow < self.rules.outflow_warning_floor =>
                {
                    warnings.push(FlowWarning {
                        code: sector.code.clone(),
                        sector: sector.name.clone(),
                        status: sector.status,
                        net_inflow: flow,
                        reason: format!(
                            "{} phase but net outflow {:.0} is below warning floor {:.0}",
                            sector.status.name(),
                            flow,
                            self.rules.outflow_warning_floor
                        ),
                    });
                }
                _ => golden_list.push(GoldenEntry::from_sector(sector, net_inflow)),
            }
        }

        for candidate in &rebound.rebounds {
            match index.lookup(&candidate.name, matcher).copied() {
                Some(flow) if flow > 0.0 => {
                    golden_list.push(GoldenEntry::from_rebound(candidate, flow));
                }
                Some(flow) => {
                    debug!("Rebound '{}' excluded: net inflow {:.0}", candidate.name, flow);
                }
                None => {
                    debug!("Rebound '{}' excluded: no money flow match", candidate.name);
                    missed.push(candidate.name.clone());
                }
            }
        }

        let golden_list = self.finalize(golden_list);

        let mut issues = Vec::new();
        if !missed.is_empty() {
            info!("Money flow join missed {} sectors", missed.len());
            issues.push(PipelineIssue::new(
                Stage::Validation,
                IssueKind::JoinMiss,
                SOURCE_FLOW,
                format!("{} sectors without flow data: {}", missed.len(), missed.join(", ")),
            ));
        }

        info!(
            "Module C complete: {} warnings, {} golden sectors",
            warnings.len(),
            golden_list.len()
        );

        ValidationResult {
            status: ModuleStatus::ok(),
            warnings,
            golden_list,
            flow_validated: true,
            issues,
        }
    }

    /// Result when no flow data is available, per the configured policy
    pub fn degraded(&self, mainline: &MainlineResult, reason: &str) -> ValidationResult {
        let issue = PipelineIssue::new(
            Stage::Validation,
            IssueKind::DegradedFetch,
            SOURCE_FLOW,
            format!("flow validation skipped: {}", reason),
        );

        match self.rules.degraded_policy {
            DegradedPolicy::Fail => {
                warn!("Money flow unavailable and validation is required: {}", reason);
                ValidationResult {
                    status: ModuleStatus::failed(format!("money flow unavailable: {}", reason)),
                    warnings: Vec::new(),
                    golden_list: Vec::new(),
                    flow_validated: false,
                    issues: vec![issue],
                }
            }
            DegradedPolicy::FallbackTopN => {
                warn!(
                    "Money flow unavailable, golden list is the unvalidated top {}: {}",
                    self.rules.golden_list_cap, reason
                );

                let mut ranked: Vec<_> = mainline.concepts.iter().collect();
                ranked.sort_by(|a, b| {
                    b.alpha
                        .partial_cmp(&a.alpha)
                        .unwrap_or(Ordering::Equal)
                        .then_with(|| a.code.cmp(&b.code))
                });

                let golden_list = ranked
                    .into_iter()
                    .take(self.rules.golden_list_cap)
                    .map(|s| GoldenEntry::from_sector(s, None))
                    .collect();

                ValidationResult {
                    status: ModuleStatus::ok(),
                    warnings: Vec::new(),
                    golden_list,
                    flow_validated: false,
                    issues: vec![issue],
                }
            }
        }
    }

    /// De-duplicate by code (first occurrence wins) and apply the cap
    fn finalize(&self, entries: Vec<GoldenEntry>) -> Vec<GoldenEntry> {
        let mut seen = HashSet::new();
        entries
            .into_iter()
            .filter(|e| seen.insert(e.code.clone()))
            .take(self.rules.golden_list_cap)
            .collect()
    }
}
