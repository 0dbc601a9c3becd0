use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Life-cycle phase of a concept sector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LifecyclePhase {
    /// Strong alpha, rank holding or rising, broad limit-up participation
    Climax,
    /// Positive alpha with an improving rank
    Launch,
    /// Positive alpha but the rank is stalling or falling
    Divergence,
    /// Everything else: negative or flat alpha
    Fading,
}

impl LifecyclePhase {
    /// Get human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            LifecyclePhase::Climax => "Climax",
            LifecyclePhase::Launch => "Launch",
            LifecyclePhase::Divergence => "Divergence",
            LifecyclePhase::Fading => "Fading",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            LifecyclePhase::Climax => "Rank rising with many limit-ups; consider taking profit",
            LifecyclePhase::Launch => "Rank rising with few limit-ups; worth watching",
            LifecyclePhase::Divergence => "Leaders still strong but the rank is slipping",
            LifecyclePhase::Fading => "Rank and breadth both weak; avoid",
        }
    }

    /// Phases that claim capital is accumulating in the sector
    pub fn is_accumulating(&self) -> bool {
        matches!(self, LifecyclePhase::Climax | LifecyclePhase::Launch)
    }
}

/// How a sector's limit-up count was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JoinStatus {
    /// Found on the limit-up board; the count is real data (zero included)
    Matched,
    /// Board was fetched but no entry reconciled to this sector
    Missed,
    /// Board could not be fetched at all
    SourceUnavailable,
}

/// A classified concept sector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectorRecord {
    pub code: String,
    pub name: String,
    pub clean_name: String,
    /// Relative strength vs. benchmark, in percent
    pub alpha: f64,
    /// Rank positions gained since the reference date; `None` when unknown
    pub rank_change: Option<i32>,
    pub limit_up_count: u32,
    pub limit_up_join: JoinStatus,
    pub status: LifecyclePhase,
}

/// Partial sector record as returned by the alpha ranking source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlphaScore {
    pub code: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Alpha in percent
    pub alpha: f64,
}

/// One row of the limit-up board
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimitUpEntry {
    pub name: String,
    pub limit_up_count: u32,
}

/// Oversold sector with a volume spike
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReboundCandidate {
    pub code: String,
    pub name: String,
    /// Trailing 5-session price change, in percent
    pub price_change_5d: f64,
    /// Today's volume divided by baseline volume
    pub vol_ratio: f64,
    pub turnover_rate: f64,
}

/// Thresholds handed to the volume anomaly scan
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReboundQuery {
    pub decline_floor: f64,
    pub vol_ratio_floor: f64,
    pub crash_floor: f64,
}

impl ReboundQuery {
    /// Whether a candidate satisfies every bound at once
    pub fn admits(&self, candidate: &ReboundCandidate) -> bool {
        candidate.price_change_5d <= self.decline_floor
            && candidate.price_change_5d >= self.crash_floor
            && candidate.vol_ratio >= self.vol_ratio_floor
    }
}

/// Net capital flow for one sector on a trade date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoneyFlowRecord {
    pub name: String,
    /// Signed currency amount, negative = outflow
    #[serde(default)]
    pub net_inflow: Option<f64>,
}

/// Phase/flow contradiction for an accumulating sector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowWarning {
    pub code: String,
    pub sector: String,
    pub status: LifecyclePhase,
    pub net_inflow: f64,
    pub reason: String,
}

/// Where a golden list entry came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GoldenOrigin {
    Mainline { status: LifecyclePhase },
    Rebound,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoldenEntry {
    pub code: String,
    pub name: String,
    pub origin: GoldenOrigin,
    pub alpha: Option<f64>,
    pub net_inflow: Option<f64>,
}

impl GoldenEntry {
    pub fn from_sector(sector: &SectorRecord, net_inflow: Option<f64>) -> Self {
        Self {
            code: sector.code.clone(),
            name: sector.name.clone(),
            origin: GoldenOrigin::Mainline { status: sector.status },
            alpha: Some(sector.alpha),
            net_inflow,
        }
    }

    pub fn from_rebound(candidate: &ReboundCandidate, net_inflow: f64) -> Self {
        Self {
            code: candidate.code.clone(),
            name: candidate.name.clone(),
            origin: GoldenOrigin::Rebound,
            alpha: None,
            net_inflow: Some(net_inflow),
        }
    }
}

/// Pipeline stage an issue or status belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Mainline,
    Rebound,
    Validation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// Primary source for a module was unreachable; the module failed
    FatalFetch,
    /// Confirmatory source was unreachable; a neutral substitute was used
    DegradedFetch,
    /// Records could not be reconciled across sources
    JoinMiss,
}

/// Audit entry for anything that reduced the precision of a report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineIssue {
    pub stage: Stage,
    pub kind: IssueKind,
    pub source: String,
    pub detail: String,
}

impl PipelineIssue {
    pub fn new(stage: Stage, kind: IssueKind, source: &str, detail: impl Into<String>) -> Self {
        Self {
            stage,
            kind,
            source: source.to_string(),
            detail: detail.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ModuleStatus {
    pub success: bool,
    pub error: Option<String>,
}

impl ModuleStatus {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Module A output
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MainlineResult {
    pub status: ModuleStatus,
    /// Sorted by descending alpha
    pub concepts: Vec<SectorRecord>,
    pub issues: Vec<PipelineIssue>,
}

/// Module B output
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ReboundResult {
    pub status: ModuleStatus,
    /// Sorted by descending volume ratio
    pub rebounds: Vec<ReboundCandidate>,
    pub issues: Vec<PipelineIssue>,
}

/// Module C output
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ValidationResult {
    pub status: ModuleStatus,
    pub warnings: Vec<FlowWarning>,
    pub golden_list: Vec<GoldenEntry>,
    /// False when the golden list was produced without money-flow data
    pub flow_validated: bool,
    pub issues: Vec<PipelineIssue>,
}

/// Combined result of one meso scan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub trade_date: NaiveDate,
    pub generated_at: DateTime<Utc>,
    pub mainline: ModuleStatus,
    pub rebound: ModuleStatus,
    pub validation: ModuleStatus,
    pub concepts: Vec<SectorRecord>,
    pub rebounds: Vec<ReboundCandidate>,
    pub warnings: Vec<FlowWarning>,
    pub golden_list: Vec<GoldenEntry>,
    pub flow_validated: bool,
    pub issues: Vec<PipelineIssue>,
}

impl AnalysisReport {
    pub fn assemble(
        trade_date: NaiveDate,
        mainline: MainlineResult,
        rebound: ReboundResult,
        validation: ValidationResult,
    ) -> Self {
        let mut issues = mainline.issues;
        issues.extend(rebound.issues);
        issues.extend(validation.issues);

        Self {
            trade_date,
            generated_at: Utc::now(),
            mainline: mainline.status,
            rebound: rebound.status,
            validation: validation.status,
            concepts: mainline.concepts,
            rebounds: rebound.rebounds,
            warnings: validation.warnings,
            golden_list: validation.golden_list,
            flow_validated: validation.flow_validated,
            issues,
        }
    }

    /// True when every module succeeded
    pub fn is_complete(&self) -> bool {
        self.mainline.success && self.rebound.success && self.validation.success
    }

    pub fn issues_for(&self, stage: Stage) -> impl Iterator<Item = &PipelineIssue> {
        self.issues.iter().filter(move |i| i.stage == stage)
    }
}
